use std::collections::HashMap;
use std::future::Future;

use keyshelf_core::{CompatibilityTier, FetchError, LibrarySnapshot, ReviewSummary};

use crate::types::SearchHit;

/// The remote endpoints the resolver and enricher consume.
///
/// Each call is one request. Implementations report transport failures as
/// [`FetchError::Network`], unreadable bodies as [`FetchError::Parse`] and
/// rejections as [`FetchError::RateLimited`]; they never cache or retry.
pub trait SteamApi: Send + Sync + 'static {
    /// The signed-in user's owned, wishlisted and ignored apps.
    fn library_snapshot(&self) -> impl Future<Output = Result<LibrarySnapshot, FetchError>> + Send;

    /// First search result row for `term`, if any.
    fn search(&self, term: &str) -> impl Future<Output = Result<Option<SearchHit>, FetchError>> + Send;

    /// Review summary, `None` when the app has no reviews.
    fn review_summary(
        &self,
        app_id: u32,
    ) -> impl Future<Output = Result<Option<ReviewSummary>, FetchError>> + Send;

    /// Compatibility tier, `None` when the service has no report.
    fn compatibility_tier(
        &self,
        app_id: u32,
    ) -> impl Future<Output = Result<Option<CompatibilityTier>, FetchError>> + Send;

    /// The published normalized-name → app id dictionary.
    fn app_dictionary(&self) -> impl Future<Output = Result<HashMap<String, u32>, FetchError>> + Send;
}
