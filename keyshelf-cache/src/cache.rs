//! Versioned cache over a [`KeyValueStore`].
//!
//! Every record is written as `{version, payload}`. On read, a record whose
//! version differs from the cache's current version is treated as absent, so
//! bumping [`CACHE_VERSION`] invalidates everything at once.
//!
//! TTL is not enforced here. Callers that need freshness store a
//! [`Stamped`] payload and check it with [`Stamped::is_fresh`], or use
//! [`Cache::get_fresh`].

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::store::KeyValueStore;

/// Current schema version. Bump this to discard all persisted records.
pub const CACHE_VERSION: &str = "3";

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    version: String,
    payload: T,
}

/// A payload with the time it was written, in milliseconds since the epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamped<T> {
    pub data: T,
    pub timestamp: i64,
}

impl<T> Stamped<T> {
    pub fn new(data: T, timestamp: i64) -> Self {
        Self { data, timestamp }
    }

    /// Fresh while strictly younger than `ttl`; an entry exactly `ttl` old is
    /// stale.
    pub fn is_fresh(&self, ttl: Duration, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.timestamp) < ttl.as_millis() as i64
    }
}

/// Versioned cache handle. Cheap to clone; clones share the store and clock.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn KeyValueStore>,
    version: String,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl Cache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            version: CACHE_VERSION.to_string(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a different schema version than [`CACHE_VERSION`].
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Read `key`, returning `fallback` when it is missing, was written under
    /// another version, no longer deserializes as `T`, or the store failed.
    pub fn get<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return fallback,
            Err(e) => {
                log::debug!("Cache read of '{}' failed: {}", key, e);
                return fallback;
            }
        };

        let entry: CacheEntry<serde_json::Value> = match serde_json::from_value(raw) {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Cache entry '{}' is not a versioned record: {}", key, e);
                return fallback;
            }
        };
        if entry.version != self.version {
            log::debug!(
                "Cache entry '{}' has version {} (current {}), ignoring",
                key,
                entry.version,
                self.version
            );
            return fallback;
        }

        match serde_json::from_value(entry.payload) {
            Ok(value) => value,
            Err(e) => {
                log::debug!("Cache payload '{}' has unexpected shape: {}", key, e);
                fallback
            }
        }
    }

    /// Write `value` under the current version. Failures are logged and dropped.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = self.try_set(key, value) {
            log::debug!("Cache write of '{}' failed: {}", key, e);
        }
    }

    /// Like [`set`](Self::set), but reports a failed write.
    pub fn try_set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let entry = CacheEntry {
            version: self.version.clone(),
            payload: value,
        };
        let raw = serde_json::to_value(&entry)?;
        self.store.set(key, raw)
    }

    /// Read a stamped entry regardless of its age.
    pub fn get_stamped<T: DeserializeOwned>(&self, key: &str) -> Option<Stamped<T>> {
        self.get(key, None)
    }

    /// Read a stamped entry only if it is younger than `ttl`.
    pub fn get_fresh<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        let now = self.now_ms();
        self.get_stamped(key)
            .filter(|entry: &Stamped<T>| entry.is_fresh(ttl, now))
            .map(|entry| entry.data)
    }

    /// Write `data` stamped with the clock's current time.
    pub fn set_stamped<T: Serialize>(&self, key: &str, data: &T) {
        if let Err(e) = self.try_set_stamped(key, data) {
            log::debug!("Cache write of '{}' failed: {}", key, e);
        }
    }

    pub fn try_set_stamped<T: Serialize>(&self, key: &str, data: &T) -> Result<(), StoreError> {
        let stamped = Stamped {
            data,
            timestamp: self.now_ms(),
        };
        self.try_set(key, &stamped)
    }

    /// Remove every record from the underlying store.
    pub fn clear(&self) -> Result<usize, StoreError> {
        self.store.clear()
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
