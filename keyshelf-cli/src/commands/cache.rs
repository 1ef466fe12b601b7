use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use keyshelf_lib::Settings;

use crate::error::CliError;

/// Remove every cached entry.
pub(crate) fn run_cache_clear() -> Result<(), CliError> {
    let settings = Settings::load()?;
    let cache = super::open_cache(&settings)?;
    let removed = cache.clear()?;
    log::info!(
        "{} Cache cleared ({} entries removed)",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        removed,
    );
    Ok(())
}

/// Print the cache file path.
pub(crate) fn run_cache_path() -> Result<(), CliError> {
    let settings = Settings::load()?;
    println!("{}", settings.store_path().display());
    Ok(())
}
