//! User settings: `~/.config/keyshelf/settings.toml`.
//!
//! Every field has a default, so a missing file or section is fine.
//! Environment variables override the file; CLI flags override both.

use std::path::{Path, PathBuf};
use std::time::Duration;

use keyshelf_steam::Endpoints;
use keyshelf_steam::client::DEFAULT_DICTIONARY_URL;
use serde::{Deserialize, Serialize};

use crate::enricher::TtlPolicy;
use crate::error::SettingsError;
use crate::scheduler::SchedulerConfig;
use crate::session::SessionConfig;

pub const ENV_MIN_INTERVAL_MS: &str = "KEYSHELF_MIN_INTERVAL_MS";
pub const ENV_CONCURRENCY: &str = "KEYSHELF_CONCURRENCY";
pub const ENV_DICTIONARY_URL: &str = "KEYSHELF_DICTIONARY_URL";

/// Canonical path to the settings file.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("keyshelf").join("settings.toml")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scheduler: SchedulerSettings,
    pub cache: CacheSettings,
    pub dictionary: DictionarySettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub min_interval_ms: u64,
    pub concurrency: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            min_interval_ms: 300,
            concurrency: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub base_ttl_minutes: u64,
    /// Cache directory, one JSON file per entry. Defaults to
    /// `<cache dir>/keyshelf/store`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            base_ttl_minutes: 15,
            store_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionarySettings {
    pub url: String,
    pub refresh_hours: u64,
}

impl Default for DictionarySettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_DICTIONARY_URL.to_string(),
            refresh_hours: 24,
        }
    }
}

impl Settings {
    /// Load from the default path and apply environment overrides.
    pub fn load() -> Result<Self, SettingsError> {
        let mut settings = Self::load_from(&settings_path())?;
        settings.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    /// Load from `path` without environment overrides. A missing file yields
    /// the defaults.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), SettingsError> {
        if let Some(value) = lookup(ENV_MIN_INTERVAL_MS) {
            self.scheduler.min_interval_ms = parse_env(ENV_MIN_INTERVAL_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_CONCURRENCY) {
            self.scheduler.concurrency = parse_env(ENV_CONCURRENCY, &value)?;
        }
        if let Some(value) = lookup(ENV_DICTIONARY_URL) {
            if !value.trim().is_empty() {
                self.dictionary.url = value.trim().to_string();
            }
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.scheduler.concurrency == 0 {
            return Err(SettingsError::config("scheduler.concurrency must be at least 1"));
        }
        if self.cache.base_ttl_minutes == 0 {
            return Err(SettingsError::config("cache.base_ttl_minutes must be at least 1"));
        }
        if self.dictionary.refresh_hours == 0 {
            return Err(SettingsError::config("dictionary.refresh_hours must be at least 1"));
        }
        Ok(())
    }

    /// Save to the default path.
    pub fn save(&self) -> Result<(), SettingsError> {
        self.save_to(&settings_path())
    }

    /// Write atomically to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let serialized = toml::to_string_pretty(self)?;
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, serialized)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            min_interval: Duration::from_millis(self.scheduler.min_interval_ms),
            concurrency: self.scheduler.concurrency,
        }
    }

    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy {
            dictionary: Duration::from_secs(self.dictionary.refresh_hours * 60 * 60),
            ..TtlPolicy::from_base(Duration::from_secs(self.cache.base_ttl_minutes * 60))
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            scheduler: self.scheduler_config(),
            ttl: self.ttl_policy(),
            ..SessionConfig::default()
        }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            dictionary: self.dictionary.url.clone(),
            ..Endpoints::default()
        }
    }

    /// Where the persistent cache lives.
    pub fn store_path(&self) -> PathBuf {
        self.cache.store_path.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("keyshelf")
                .join("store")
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, SettingsError> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::config(format!("{name} has invalid value '{value}'")))
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
