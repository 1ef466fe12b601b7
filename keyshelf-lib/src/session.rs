//! Listing pipeline: key derivation, resolution, enrichment and counting,
//! for one storefront page or listing file.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::StreamExt;
use keyshelf_cache::Cache;
use keyshelf_core::{EnrichedRecord, FetchError, Identity, Listing, SiteProfile, Status};
use keyshelf_steam::{SearchHit, SteamApi};
use tokio::sync::mpsc;

use crate::appdb::OfflineDictionary;
use crate::enricher::{Enricher, TtlPolicy};
use crate::interceptor::InterceptorMap;
use crate::resolver::{ResolveMethod, Resolution, Resolver};
use crate::scheduler::{RequestScheduler, SchedulerConfig};
use crate::stats::{StatsAggregator, StatsCounters, derive_key};

/// Warning shown once the breaker has tripped. It stays up for the rest of
/// the session.
pub const HALT_MESSAGE: &str = "The store is rejecting requests (rate limited). \
     Lookups are stopped for this session; start a new session to try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub scheduler: SchedulerConfig,
    pub ttl: TtlPolicy,
    /// Listings processed at once by [`Session::process_all`].
    pub listing_concurrency: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            ttl: TtlPolicy::default(),
            listing_concurrency: 4,
        }
    }
}

/// Progress events emitted by [`Session::process_all`].
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A listing has started processing.
    Started { index: usize, title: String },
    /// A listing matched an identity; enrichment follows.
    Resolved {
        index: usize,
        title: String,
        identity: Identity,
        method: ResolveMethod,
    },
    /// A listing was fully enriched.
    Completed {
        index: usize,
        title: String,
        record: EnrichedRecord,
        search_hit: Option<SearchHit>,
    },
    /// No usable identity for a listing.
    NoData {
        index: usize,
        title: String,
        reason: String,
    },
    /// The breaker tripped. Emitted once; remaining listings are skipped.
    Halted { message: String },
    /// All listings handled.
    Done { stats: StatsCounters },
}

/// Result of processing one listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingOutcome {
    Enriched {
        key: String,
        record: EnrichedRecord,
        method: ResolveMethod,
        search_hit: Option<SearchHit>,
    },
    NoData {
        key: String,
        resolution: Resolution,
    },
    /// The listing's page never lists games; it was not counted.
    Skipped,
}

pub struct Session<S> {
    profile: SiteProfile,
    scheduler: RequestScheduler,
    resolver: Resolver<S>,
    enricher: Enricher<S>,
    stats: Mutex<StatsAggregator>,
    listing_concurrency: usize,
}

impl<S: SteamApi> Session<S> {
    /// Build a session with its own scheduler. Must be called from within a
    /// tokio runtime.
    pub fn new(profile: SiteProfile, steam: Arc<S>, cache: Cache, config: SessionConfig) -> Self {
        let scheduler = RequestScheduler::start(config.scheduler);
        let dictionary = Arc::new(OfflineDictionary::new(
            steam.clone(),
            cache.clone(),
            config.ttl.dictionary,
        ));
        let resolver = Resolver::new(
            profile,
            steam.clone(),
            scheduler.clone(),
            cache.clone(),
            dictionary,
            config.ttl.details,
        );
        let enricher = Enricher::new(steam, scheduler.clone(), cache, config.ttl);
        Self {
            profile,
            scheduler,
            resolver,
            enricher,
            stats: Mutex::new(StatsAggregator::new()),
            listing_concurrency: config.listing_concurrency.max(1),
        }
    }

    pub fn profile(&self) -> SiteProfile {
        self.profile
    }

    pub fn scheduler(&self) -> &RequestScheduler {
        &self.scheduler
    }

    pub fn resolver(&self) -> &Resolver<S> {
        &self.resolver
    }

    pub fn enricher(&self) -> &Enricher<S> {
        &self.enricher
    }

    /// The map the response-sniffing collaborator feeds.
    pub fn interceptor(&self) -> &InterceptorMap {
        self.resolver.interceptor()
    }

    /// Whether the breaker has tripped.
    pub fn is_halted(&self) -> bool {
        self.scheduler.is_stopped()
    }

    pub fn stats(&self) -> StatsCounters {
        self.lock_stats().counters()
    }

    pub fn write_report(&self, path: &Path) -> std::io::Result<()> {
        self.lock_stats().write_report_to_file(path, self.profile)
    }

    fn lock_stats(&self) -> MutexGuard<'_, StatsAggregator> {
        self.stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Process one listing. Only breaker errors are returned as `Err`, and
    /// those are not counted.
    pub async fn process(&self, listing: Listing) -> Result<ListingOutcome, FetchError> {
        self.process_with(listing, |_, _| {}).await
    }

    async fn process_with(
        &self,
        mut listing: Listing,
        on_resolved: impl FnOnce(Identity, ResolveMethod),
    ) -> Result<ListingOutcome, FetchError> {
        if listing
            .link
            .as_deref()
            .is_some_and(|link| self.profile.is_ignored_url(link))
        {
            log::debug!("Skipping \"{}\": ignored section", listing.title);
            return Ok(ListingOutcome::Skipped);
        }
        if self.is_halted() {
            return Err(FetchError::QueueStopped);
        }

        let key = derive_key(self.profile, &listing);
        if listing.direct_hint.is_none() {
            listing.direct_hint = self.profile.extract_direct_hint(&listing.raw_asset_refs);
        }

        match self.resolver.resolve(&listing).await? {
            Resolution::Resolved {
                identity,
                method,
                search_hit,
            } => {
                on_resolved(identity, method);
                let record = self.enricher.enrich(identity).await?;
                self.record(&key, Some(record.status));
                Ok(ListingOutcome::Enriched {
                    key,
                    record,
                    method,
                    search_hit,
                })
            }
            resolution => {
                self.record(&key, None);
                Ok(ListingOutcome::NoData { key, resolution })
            }
        }
    }

    fn record(&self, key: &str, status: Option<Status>) {
        if !self.lock_stats().record(key, status) {
            log::debug!("'{}' already counted", key);
        }
    }

    /// Process listings with bounded concurrency, reporting progress on
    /// `events`. Once the breaker trips, unstarted listings are skipped and a
    /// single [`SessionEvent::Halted`] is sent. Returns the final counters.
    pub async fn process_all(
        &self,
        listings: Vec<Listing>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> StatsCounters {
        let halt_sent = AtomicBool::new(false);
        let send_halt = || {
            if !halt_sent.swap(true, Ordering::SeqCst) {
                let _ = events.send(SessionEvent::Halted {
                    message: HALT_MESSAGE.to_string(),
                });
            }
        };

        futures::stream::iter(listings.into_iter().enumerate())
            .map(|(index, listing)| {
                let events = &events;
                let send_halt = &send_halt;
                async move {
                    if self.is_halted() {
                        return;
                    }
                    let title = listing.title.clone();
                    let _ = events.send(SessionEvent::Started {
                        index,
                        title: title.clone(),
                    });

                    let outcome = self
                        .process_with(listing, |identity, method| {
                            let _ = events.send(SessionEvent::Resolved {
                                index,
                                title: title.clone(),
                                identity,
                                method,
                            });
                        })
                        .await;

                    match outcome {
                        Ok(ListingOutcome::Enriched {
                            record, search_hit, ..
                        }) => {
                            let _ = events.send(SessionEvent::Completed {
                                index,
                                title,
                                record,
                                search_hit,
                            });
                        }
                        Ok(ListingOutcome::NoData { resolution, .. }) => {
                            let _ = events.send(SessionEvent::NoData {
                                index,
                                title,
                                reason: no_data_reason(&resolution),
                            });
                        }
                        Ok(ListingOutcome::Skipped) => {}
                        Err(e) => {
                            log::debug!("\"{}\" halted: {}", title, e);
                            send_halt();
                        }
                    }
                }
            })
            .buffer_unordered(self.listing_concurrency)
            .collect::<Vec<()>>()
            .await;

        if self.is_halted() {
            send_halt();
        }
        let stats = self.stats();
        let _ = events.send(SessionEvent::Done { stats });
        stats
    }
}

/// Short user-facing explanation of why a listing has no data.
pub fn no_data_reason(resolution: &Resolution) -> String {
    match resolution {
        Resolution::InvalidIdentity { method, raw } => {
            format!("invalid id '{}' from {}", raw.id, method)
        }
        _ => "no match".to_string(),
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
