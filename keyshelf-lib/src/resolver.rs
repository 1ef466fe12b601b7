use std::sync::{Arc, LazyLock};
use std::time::Duration;

use keyshelf_cache::Cache;
use keyshelf_core::{
    FetchError, Identity, IdentityKind, Listing, RawIdentity, SiteProfile, clean_title,
    normalize_title,
};
use keyshelf_steam::{SearchHit, SteamApi};
use regex::Regex;

use crate::appdb::OfflineDictionary;
use crate::interceptor::InterceptorMap;
use crate::scheduler::RequestScheduler;

static STORE_LINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/(app|sub|bundle)/(\d+)").unwrap());
static STORE_IMAGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/(apps|subs|bundles)/(\d+)").unwrap());

/// Cache key prefix for search results, followed by the normalized title.
pub const SEARCH_KEY_PREFIX: &str = "steam_search_";

/// How a listing was matched to an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMethod {
    /// Id embedded in the storefront's own markup
    DirectHint,
    /// Cover filename seen in a sniffed API response
    Interceptor,
    /// Store link or image inside the listing
    AssetScan,
    /// Offline name dictionary
    OfflineDictionary,
    /// Remote store search
    Search,
}

impl std::fmt::Display for ResolveMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveMethod::DirectHint => write!(f, "direct hint"),
            ResolveMethod::Interceptor => write!(f, "interceptor"),
            ResolveMethod::AssetScan => write!(f, "asset scan"),
            ResolveMethod::OfflineDictionary => write!(f, "offline dictionary"),
            ResolveMethod::Search => write!(f, "search"),
        }
    }
}

/// Outcome of resolving one listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved {
        identity: Identity,
        method: ResolveMethod,
        /// The search row that produced the match, for [`ResolveMethod::Search`].
        search_hit: Option<SearchHit>,
    },
    /// No strategy matched.
    Unresolved,
    /// A strategy matched but its id is not a positive integer.
    InvalidIdentity {
        method: ResolveMethod,
        raw: RawIdentity,
    },
}

impl Resolution {
    pub fn identity(&self) -> Option<Identity> {
        match self {
            Resolution::Resolved { identity, .. } => Some(*identity),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved { .. })
    }
}

struct Candidate {
    raw: RawIdentity,
    method: ResolveMethod,
    search_hit: Option<SearchHit>,
}

impl Candidate {
    fn new(raw: RawIdentity, method: ResolveMethod) -> Self {
        Self {
            raw,
            method,
            search_hit: None,
        }
    }

    fn into_resolution(self) -> Resolution {
        match self.raw.validate() {
            Some(identity) => Resolution::Resolved {
                identity,
                method: self.method,
                search_hit: self.search_hit,
            },
            None => Resolution::InvalidIdentity {
                method: self.method,
                raw: self.raw,
            },
        }
    }
}

/// Ordered strategy chain from a listing to a catalog identity.
///
/// Strategies, first match wins:
/// 1. the listing's direct hint, trusted as-is
/// 2. the interceptor map (only for sites that enable it)
/// 3. store links, then store images, among the listing's asset refs
/// 4. the offline dictionary
/// 5. a remote search through the scheduler, cached for `search_ttl`
pub struct Resolver<S> {
    profile: SiteProfile,
    steam: Arc<S>,
    scheduler: RequestScheduler,
    cache: Cache,
    interceptor: InterceptorMap,
    dictionary: Arc<OfflineDictionary<S>>,
    search_ttl: Duration,
}

impl<S: SteamApi> Resolver<S> {
    pub fn new(
        profile: SiteProfile,
        steam: Arc<S>,
        scheduler: RequestScheduler,
        cache: Cache,
        dictionary: Arc<OfflineDictionary<S>>,
        search_ttl: Duration,
    ) -> Self {
        Self {
            profile,
            steam,
            scheduler,
            cache,
            interceptor: InterceptorMap::new(),
            dictionary,
            search_ttl,
        }
    }

    /// Share an existing interceptor map instead of the resolver's own.
    pub fn with_interceptor(mut self, interceptor: InterceptorMap) -> Self {
        self.interceptor = interceptor;
        self
    }

    pub fn interceptor(&self) -> &InterceptorMap {
        &self.interceptor
    }

    pub fn profile(&self) -> SiteProfile {
        self.profile
    }

    /// Resolve a listing. Only breaker errors are returned as `Err`; every
    /// other failure ends in [`Resolution::Unresolved`].
    pub async fn resolve(&self, listing: &Listing) -> Result<Resolution, FetchError> {
        let candidate = match self.local_candidate(listing) {
            Some(candidate) => Some(candidate),
            None => self.remote_candidate(&listing.title).await?,
        };

        let resolution = match candidate {
            Some(candidate) => candidate.into_resolution(),
            None => Resolution::Unresolved,
        };
        match &resolution {
            Resolution::Resolved { identity, method, .. } => {
                log::debug!("\"{}\" -> {} (by {})", listing.title, identity, method)
            }
            Resolution::InvalidIdentity { method, raw } => log::warn!(
                "\"{}\" matched by {} but id '{}' is invalid",
                listing.title,
                method,
                raw.id
            ),
            Resolution::Unresolved => log::debug!("\"{}\" unresolved", listing.title),
        }
        Ok(resolution)
    }

    /// Strategies 1-3, which need no I/O.
    fn local_candidate(&self, listing: &Listing) -> Option<Candidate> {
        if let Some(hint) = &listing.direct_hint {
            return Some(Candidate::new(hint.clone(), ResolveMethod::DirectHint));
        }
        if self.profile.interceptor_enabled() {
            if let Some(raw) = self.interceptor.lookup_any(&listing.raw_asset_refs) {
                return Some(Candidate::new(raw, ResolveMethod::Interceptor));
            }
        }
        scan_assets(&listing.raw_asset_refs).map(|raw| Candidate::new(raw, ResolveMethod::AssetScan))
    }

    /// Strategies 4-5.
    async fn remote_candidate(&self, title: &str) -> Result<Option<Candidate>, FetchError> {
        let key = normalize_title(title);
        if key.is_empty() {
            return Ok(None);
        }

        if let Some(dict) = self.dictionary.get().await {
            if let Some(identity) = dict.get(&key) {
                return Ok(Some(Candidate::new(
                    identity.into(),
                    ResolveMethod::OfflineDictionary,
                )));
            }
        }

        let hit = self.search(title, &key).await?;
        Ok(hit.map(|hit| Candidate {
            raw: hit.identity.clone(),
            method: ResolveMethod::Search,
            search_hit: Some(hit),
        }))
    }

    async fn search(&self, title: &str, key: &str) -> Result<Option<SearchHit>, FetchError> {
        let cache_key = format!("{SEARCH_KEY_PREFIX}{key}");
        if let Some(cached) = self
            .cache
            .get_fresh::<Option<SearchHit>>(&cache_key, self.search_ttl)
        {
            log::debug!("Search cache hit for '{}'", key);
            return Ok(cached);
        }

        let term = clean_title(title);
        let steam = self.steam.clone();
        let request_term = term.clone();
        let result = self
            .scheduler
            .submit(async move { steam.search(&request_term).await })
            .await;

        let hit = match result {
            Ok(hit) => hit,
            Err(e) if e.is_breaker() => return Err(e),
            Err(e) => {
                log::warn!("Search for '{}' failed: {}", term, e);
                None
            }
        };
        if hit.is_none() {
            log::debug!("No search results for '{}'", term);
        }
        self.cache.set_stamped(&cache_key, &hit);
        Ok(hit)
    }
}

/// Find a store identity in link or image references. All links are checked
/// before any image.
pub fn scan_assets(refs: &[String]) -> Option<RawIdentity> {
    let scan = |re: &Regex| {
        refs.iter().find_map(|r| {
            let caps = re.captures(r)?;
            let kind = IdentityKind::from_segment(&caps[1])?;
            Some(RawIdentity::new(&caps[2], kind))
        })
    };
    scan(&STORE_LINK_REGEX).or_else(|| scan(&STORE_IMAGE_REGEX))
}

#[cfg(test)]
#[path = "tests/resolver_tests.rs"]
mod tests;
