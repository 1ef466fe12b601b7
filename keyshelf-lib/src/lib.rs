//! Listing resolution and enrichment for game storefronts.
//!
//! A [`Session`] ties together the pieces, leaves first:
//! - [`RequestScheduler`]: paced, circuit-breaking runner for remote calls
//! - [`Resolver`]: ordered strategy chain from a listing to an identity
//! - [`Enricher`]: library status, reviews and compatibility tier
//! - [`StatsAggregator`]: deduplicated counters

pub mod appdb;
pub mod async_util;
pub mod enricher;
pub mod error;
pub mod interceptor;
pub mod resolver;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod stats;

pub use appdb::{AppDictionary, OfflineDictionary};
pub use enricher::{Enricher, TtlPolicy};
pub use error::SettingsError;
pub use interceptor::InterceptorMap;
pub use resolver::{ResolveMethod, Resolution, Resolver};
pub use scheduler::{RequestScheduler, SchedulerConfig};
pub use session::{ListingOutcome, Session, SessionConfig, SessionEvent};
pub use settings::Settings;
pub use stats::{StatsAggregator, StatsCounters, derive_key};
