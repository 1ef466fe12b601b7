use std::sync::Arc;
use std::time::Duration;

use keyshelf_cache::Cache;
use keyshelf_core::{CompatibilityTier, EnrichedRecord, FetchError, Identity, LibrarySnapshot, ReviewSummary};
use keyshelf_steam::SteamApi;

use crate::scheduler::RequestScheduler;

pub const LIBRARY_KEY: &str = "steam_userdata";
pub const REVIEWS_KEY_PREFIX: &str = "steam_reviews_";
pub const TIER_KEY_PREFIX: &str = "proton_";

/// How long each kind of remote data is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub library: Duration,
    /// Reviews, compatibility tiers and search results.
    pub details: Duration,
    pub dictionary: Duration,
}

impl TtlPolicy {
    /// Library at `base`, everything per-title at seven times `base`.
    pub fn from_base(base: Duration) -> Self {
        Self {
            library: base,
            details: base * 7,
            dictionary: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::from_base(Duration::from_secs(15 * 60))
    }
}

/// Combines a resolved identity with library, review and compatibility data.
pub struct Enricher<S> {
    steam: Arc<S>,
    scheduler: RequestScheduler,
    cache: Cache,
    ttl: TtlPolicy,
    /// Single-flights library fetches so concurrent listings share one request.
    library_fetch: tokio::sync::Mutex<()>,
}

impl<S: SteamApi> Enricher<S> {
    pub fn new(steam: Arc<S>, scheduler: RequestScheduler, cache: Cache, ttl: TtlPolicy) -> Self {
        Self {
            steam,
            scheduler,
            cache,
            ttl,
            library_fetch: tokio::sync::Mutex::new(()),
        }
    }

    /// Fetch all three sources concurrently and classify. Review and tier
    /// failures leave those fields empty; only breaker errors fail the call.
    pub async fn enrich(&self, identity: Identity) -> Result<EnrichedRecord, FetchError> {
        let id = identity.id();
        let (library, review, tier) =
            tokio::join!(self.library(), self.review(id), self.compatibility_tier(id));
        let library = library?;

        Ok(EnrichedRecord {
            identity,
            status: library.status_of(id),
            review: review?,
            tier: tier?,
        })
    }

    /// The user's library. A non-empty snapshot is cached for the library
    /// TTL; an empty one is never cached, so the next call fetches again.
    pub async fn library(&self) -> Result<LibrarySnapshot, FetchError> {
        let _guard = self.library_fetch.lock().await;
        if let Some(snapshot) = self
            .cache
            .get_fresh::<LibrarySnapshot>(LIBRARY_KEY, self.ttl.library)
        {
            log::debug!(
                "Library cache hit (owned: {}, wishlisted: {})",
                snapshot.owned.len(),
                snapshot.wishlisted.len()
            );
            return Ok(snapshot);
        }

        let steam = self.steam.clone();
        let result = self
            .scheduler
            .submit(async move { steam.library_snapshot().await })
            .await;
        match result {
            Ok(snapshot) if snapshot.is_empty() => {
                log::warn!("Library is empty; not signed in or cookies blocked? Not caching it");
                Ok(snapshot)
            }
            Ok(snapshot) => {
                log::info!(
                    "Library loaded (owned: {}, wishlisted: {})",
                    snapshot.owned.len(),
                    snapshot.wishlisted.len()
                );
                self.cache.set_stamped(LIBRARY_KEY, &snapshot);
                Ok(snapshot)
            }
            Err(e) if e.is_breaker() => Err(e),
            Err(e) => {
                log::warn!("Library fetch failed: {}", e);
                Ok(LibrarySnapshot::default())
            }
        }
    }

    pub async fn review(&self, app_id: u32) -> Result<Option<ReviewSummary>, FetchError> {
        let key = format!("{REVIEWS_KEY_PREFIX}{app_id}");
        let steam = self.steam.clone();
        self.cached_detail(&key, async move { steam.review_summary(app_id).await })
            .await
    }

    pub async fn compatibility_tier(&self, app_id: u32) -> Result<Option<CompatibilityTier>, FetchError> {
        let key = format!("{TIER_KEY_PREFIX}{app_id}");
        let steam = self.steam.clone();
        self.cached_detail(&key, async move { steam.compatibility_tier(app_id).await })
            .await
    }

    /// Per-title lookup with negative caching: `None` results and recovered
    /// failures are cached for the details TTL like real values.
    async fn cached_detail<T, Fut>(&self, key: &str, fetch: Fut) -> Result<Option<T>, FetchError>
    where
        T: serde::Serialize + serde::de::DeserializeOwned + Send + 'static,
        Fut: std::future::Future<Output = Result<Option<T>, FetchError>> + Send + 'static,
    {
        if let Some(cached) = self.cache.get_fresh::<Option<T>>(key, self.ttl.details) {
            return Ok(cached);
        }

        let value = match self.scheduler.submit(fetch).await {
            Ok(value) => value,
            Err(e) if e.is_breaker() => return Err(e),
            Err(e) => {
                log::debug!("Fetch of '{}' failed: {}", key, e);
                None
            }
        };
        self.cache.set_stamped(key, &value);
        Ok(value)
    }
}

#[cfg(test)]
#[path = "tests/enricher_tests.rs"]
mod tests;
