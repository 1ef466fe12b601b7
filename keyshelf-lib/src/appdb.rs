//! Offline name → app id dictionary.
//!
//! The dictionary is a flat JSON object of normalized titles to app ids,
//! published as a static artifact and rebuilt from the store's full app list
//! by [`AppDictionary::from_app_list`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use keyshelf_cache::Cache;
use keyshelf_core::title::strip_non_alphanumeric;
use keyshelf_core::{Identity, normalize_title};
use keyshelf_steam::{AppListEntry, SteamApi};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

/// Cache key of the dictionary.
pub const APPDB_KEY: &str = "steam_apps_db";

/// Names shorter than this after normalization are too ambiguous to key on.
const MIN_KEY_LEN: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppDictionary {
    entries: HashMap<String, u32>,
}

impl AppDictionary {
    pub fn from_map(entries: HashMap<String, u32>) -> Self {
        Self { entries }
    }

    /// Build from the store's app list. Later entries win on key collisions.
    pub fn from_app_list(apps: &[AppListEntry]) -> Self {
        let mut entries = HashMap::with_capacity(apps.len());
        for app in apps {
            let key = strip_non_alphanumeric(&app.name);
            if key.len() < MIN_KEY_LEN || app.appid == 0 {
                continue;
            }
            entries.insert(key, app.appid);
        }
        Self { entries }
    }

    /// Look up a listing title after full normalization.
    pub fn lookup(&self, title: &str) -> Option<Identity> {
        let key = normalize_title(title);
        if key.is_empty() {
            return None;
        }
        self.get(&key)
    }

    /// Look up an already-normalized key.
    pub fn get(&self, key: &str) -> Option<Identity> {
        self.entries.get(key).copied().and_then(Identity::title)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write as compact JSON, the published artifact's format.
    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(&self.entries).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

/// Lazily loaded, session-wide handle to the dictionary.
///
/// The first [`get`](Self::get) reads the cache; when the cached copy is older
/// than `refresh` it downloads a new one, and if that fails falls back to the
/// stale copy. The outcome, including "no dictionary", is kept for the rest
/// of the session.
pub struct OfflineDictionary<S> {
    steam: Arc<S>,
    cache: Cache,
    refresh: Duration,
    loaded: OnceCell<Option<Arc<AppDictionary>>>,
}

impl<S: SteamApi> OfflineDictionary<S> {
    pub fn new(steam: Arc<S>, cache: Cache, refresh: Duration) -> Self {
        Self {
            steam,
            cache,
            refresh,
            loaded: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> Option<Arc<AppDictionary>> {
        self.loaded.get_or_init(|| self.load()).await.clone()
    }

    async fn load(&self) -> Option<Arc<AppDictionary>> {
        if let Some(dict) = self.cache.get_fresh::<AppDictionary>(APPDB_KEY, self.refresh) {
            log::debug!("Offline dictionary cache hit ({} apps)", dict.len());
            return Some(Arc::new(dict));
        }

        // Served from a CDN, not the store; not paced by the scheduler
        match self.steam.app_dictionary().await {
            Ok(entries) => {
                let dict = AppDictionary::from_map(entries);
                log::info!("Offline dictionary updated: {} apps", dict.len());
                self.cache.set_stamped(APPDB_KEY, &dict);
                Some(Arc::new(dict))
            }
            Err(e) => {
                let stale = self.cache.get_stamped::<AppDictionary>(APPDB_KEY);
                match stale {
                    Some(entry) => {
                        log::warn!(
                            "Offline dictionary refresh failed ({}); using stale copy ({} apps)",
                            e,
                            entry.data.len()
                        );
                        Some(Arc::new(entry.data))
                    }
                    None => {
                        log::warn!("Offline dictionary unavailable: {}", e);
                        None
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/appdb_tests.rs"]
mod tests;
