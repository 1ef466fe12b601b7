use thiserror::Error;

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Listing file could not be parsed
    #[error("Invalid listing file: {0}")]
    Listings(#[from] serde_json::Error),

    /// Settings file or environment override is invalid
    #[error("Config error: {0}")]
    Config(#[from] keyshelf_lib::SettingsError),

    /// Persistent store could not be opened or cleared
    #[error("Cache error: {0}")]
    Store(#[from] keyshelf_cache::StoreError),

    /// Remote call failed
    #[error("{0}")]
    Fetch(#[from] keyshelf_core::FetchError),

    /// Runtime creation or async error
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl CliError {
    pub(crate) fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }
}
