use thiserror::Error;

/// Errors a remote call can end in.
///
/// `Network` and `Parse` are recovered where they occur and turned into a
/// negative result. `RateLimited` and `QueueStopped` always propagate: the
/// first trips the request scheduler's breaker, the second is what every task
/// sees afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport failure or timeout
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP 403 or an access-denied body
    #[error("Rate limited by remote service (HTTP {status})")]
    RateLimited { status: u16 },

    /// Malformed JSON or HTML
    #[error("Parse error: {0}")]
    Parse(String),

    /// The scheduler's breaker has already tripped
    #[error("Request queue stopped")]
    QueueStopped,
}

impl FetchError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Whether this error must propagate instead of being turned into a
    /// negative result.
    pub fn is_breaker(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::QueueStopped)
    }
}
