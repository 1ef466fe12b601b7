use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use keyshelf_lib::Settings;
use keyshelf_lib::settings::settings_path;

use crate::error::CliError;

/// Show the effective settings (file plus environment overrides).
pub(crate) fn run_config_show() -> Result<(), CliError> {
    let path = settings_path();
    let settings = Settings::load()?;

    log::info!(
        "{}",
        "keyshelf Configuration".if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!("");
    if path.exists() {
        log::info!(
            "  Settings file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(exists)".if_supports_color(Stdout, |t| t.green()),
        );
    } else {
        log::info!(
            "  Settings file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(not found, using defaults)".if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    log::info!(
        "  Cache file:    {}",
        settings.store_path().display().if_supports_color(Stdout, |t| t.cyan()),
    );
    log::info!("");
    log::info!(
        "  Request spacing: {} ms",
        settings.scheduler.min_interval_ms
    );
    log::info!("  Concurrency:     {}", settings.scheduler.concurrency);
    log::info!(
        "  Cache TTL:       {} min (reviews, tiers and searches: {} min)",
        settings.cache.base_ttl_minutes,
        settings.cache.base_ttl_minutes * 7,
    );
    log::info!("  Dictionary:      {}", settings.dictionary.url);
    log::info!(
        "  Dictionary refresh: every {} h",
        settings.dictionary.refresh_hours
    );
    Ok(())
}

/// Print the settings file path.
pub(crate) fn run_config_path() {
    println!("{}", settings_path().display());
}
