//! In-memory [`SteamApi`] for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use keyshelf_core::{CompatibilityTier, FetchError, LibrarySnapshot, ReviewSummary};

use crate::api::SteamApi;
use crate::types::SearchHit;

/// Endpoint selector for [`MockSteam::calls`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Library,
    Search,
    Reviews,
    Tier,
    Dictionary,
}

impl Endpoint {
    fn index(self) -> usize {
        self as usize
    }
}

/// Scripted remote. Unscripted lookups answer with an empty library, no
/// search hit, no reviews, no tier and an empty dictionary.
///
/// # Examples
///
/// ```
/// use keyshelf_core::FetchError;
/// use keyshelf_steam::SteamApi;
/// use keyshelf_steam::mock::{Endpoint, MockSteam};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let steam = MockSteam::default()
///     .with_search_error("portal", FetchError::RateLimited { status: 403 });
/// assert!(steam.search("portal").await.is_err());
/// assert_eq!(steam.calls(Endpoint::Search), 1);
/// # }
/// ```
#[derive(Default)]
pub struct MockSteam {
    library: Mutex<Option<Result<LibrarySnapshot, FetchError>>>,
    searches: Mutex<HashMap<String, Result<Option<SearchHit>, FetchError>>>,
    reviews: Mutex<HashMap<u32, Result<Option<ReviewSummary>, FetchError>>>,
    tiers: Mutex<HashMap<u32, Result<Option<CompatibilityTier>, FetchError>>>,
    dictionary: Mutex<Option<Result<HashMap<String, u32>, FetchError>>>,
    search_terms: Mutex<Vec<String>>,
    calls: [AtomicUsize; 5],
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockSteam {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library(self, snapshot: LibrarySnapshot) -> Self {
        self.set_library(Ok(snapshot));
        self
    }

    pub fn with_library_error(self, err: FetchError) -> Self {
        self.set_library(Err(err));
        self
    }

    /// Replace the library response for subsequent calls.
    pub fn set_library(&self, result: Result<LibrarySnapshot, FetchError>) {
        *lock(&self.library) = Some(result);
    }

    pub fn with_search_hit(self, term: impl Into<String>, hit: SearchHit) -> Self {
        lock(&self.searches).insert(term.into(), Ok(Some(hit)));
        self
    }

    pub fn with_search_error(self, term: impl Into<String>, err: FetchError) -> Self {
        lock(&self.searches).insert(term.into(), Err(err));
        self
    }

    pub fn with_review(self, app_id: u32, review: ReviewSummary) -> Self {
        lock(&self.reviews).insert(app_id, Ok(Some(review)));
        self
    }

    pub fn with_review_error(self, app_id: u32, err: FetchError) -> Self {
        lock(&self.reviews).insert(app_id, Err(err));
        self
    }

    pub fn with_tier(self, app_id: u32, tier: impl Into<String>) -> Self {
        lock(&self.tiers).insert(app_id, Ok(Some(CompatibilityTier(tier.into()))));
        self
    }

    pub fn with_tier_error(self, app_id: u32, err: FetchError) -> Self {
        lock(&self.tiers).insert(app_id, Err(err));
        self
    }

    pub fn with_dictionary(self, entries: impl IntoIterator<Item = (impl Into<String>, u32)>) -> Self {
        let map = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        *lock(&self.dictionary) = Some(Ok(map));
        self
    }

    pub fn with_dictionary_error(self, err: FetchError) -> Self {
        self.set_dictionary(Err(err));
        self
    }

    pub fn set_dictionary(&self, result: Result<HashMap<String, u32>, FetchError>) {
        *lock(&self.dictionary) = Some(result);
    }

    /// Number of calls made to `endpoint` so far.
    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.calls[endpoint.index()].load(Ordering::SeqCst)
    }

    /// Search terms in the order they were requested.
    pub fn search_terms(&self) -> Vec<String> {
        lock(&self.search_terms).clone()
    }

    fn count(&self, endpoint: Endpoint) {
        self.calls[endpoint.index()].fetch_add(1, Ordering::SeqCst);
    }
}

impl SteamApi for MockSteam {
    async fn library_snapshot(&self) -> Result<LibrarySnapshot, FetchError> {
        self.count(Endpoint::Library);
        lock(&self.library).clone().unwrap_or_else(|| Ok(LibrarySnapshot::default()))
    }

    async fn search(&self, term: &str) -> Result<Option<SearchHit>, FetchError> {
        self.count(Endpoint::Search);
        lock(&self.search_terms).push(term.to_string());
        lock(&self.searches).get(term).cloned().unwrap_or(Ok(None))
    }

    async fn review_summary(&self, app_id: u32) -> Result<Option<ReviewSummary>, FetchError> {
        self.count(Endpoint::Reviews);
        lock(&self.reviews).get(&app_id).cloned().unwrap_or(Ok(None))
    }

    async fn compatibility_tier(&self, app_id: u32) -> Result<Option<CompatibilityTier>, FetchError> {
        self.count(Endpoint::Tier);
        lock(&self.tiers).get(&app_id).cloned().unwrap_or(Ok(None))
    }

    async fn app_dictionary(&self) -> Result<HashMap<String, u32>, FetchError> {
        self.count(Endpoint::Dictionary);
        lock(&self.dictionary).clone().unwrap_or_else(|| Ok(HashMap::new()))
    }
}
