use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use keyshelf_cache::Cache;
use keyshelf_lib::appdb::APPDB_KEY;
use keyshelf_lib::{AppDictionary, Settings};
use keyshelf_steam::SteamClient;

use crate::error::CliError;

/// Read from the environment when present; the public list works without it.
const ENV_STEAM_API_KEY: &str = "STEAM_API_KEY";

/// Rebuild the offline dictionary from the store's full application list.
pub(crate) fn run_appdb_build(output: &Path, install: bool) -> Result<(), CliError> {
    let settings = Settings::load()?;
    let client = SteamClient::new(settings.endpoints())?;
    let api_key = std::env::var(ENV_STEAM_API_KEY)
        .ok()
        .filter(|key| !key.trim().is_empty());

    log::info!("Fetching application list...");
    let rt = super::runtime()?;
    let apps = rt.block_on(client.app_list(api_key.as_deref()))?;

    let dict = AppDictionary::from_app_list(&apps);
    log::info!(
        "{} apps in list, {} dictionary entries",
        apps.len(),
        dict.len()
    );

    dict.write_json(output)?;
    log::info!(
        "{} Dictionary written to {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        output.display().if_supports_color(Stdout, |t| t.cyan()),
    );

    if install {
        let cache = super::open_cache(&settings)?;
        self::install(&cache, &dict)?;
        log::info!(
            "{} Installed into cache at {}",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            settings.store_path().display(),
        );
    }
    Ok(())
}

/// Store `dict` where sessions look for the offline dictionary, failing if
/// the write did not reach the store.
fn install(cache: &Cache, dict: &AppDictionary) -> Result<(), CliError> {
    cache.try_set_stamped(APPDB_KEY, dict)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use keyshelf_cache::JsonFileStore;

    use super::*;

    fn dictionary() -> AppDictionary {
        AppDictionary::from_map(HashMap::from([("halflife2".to_string(), 220)]))
    }

    #[test]
    fn install_makes_dictionary_readable() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(Arc::new(JsonFileStore::open(dir.path()).unwrap()));

        install(&cache, &dictionary()).unwrap();

        let stored = cache.get_stamped::<AppDictionary>(APPDB_KEY).unwrap();
        assert_eq!(stored.data.get("halflife2").map(|id| id.id()), Some(220));
    }

    #[test]
    fn install_reports_unwritable_store() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        // The store's directory would have to live under a regular file
        let store = JsonFileStore::open(blocker.join("store")).unwrap();
        let cache = Cache::new(Arc::new(store));

        assert!(matches!(
            install(&cache, &dictionary()),
            Err(CliError::Store(_))
        ));
    }
}
