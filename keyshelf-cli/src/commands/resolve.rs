use std::sync::Arc;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use keyshelf_core::{Listing, SiteProfile};
use keyshelf_lib::session::no_data_reason;
use keyshelf_lib::{ListingOutcome, Session, Settings};

use crate::error::CliError;

/// Resolve and enrich a single title.
pub(crate) fn run_resolve(
    title: &str,
    site: SiteProfile,
    assets: Vec<String>,
) -> Result<(), CliError> {
    let settings = Settings::load()?;
    let cache = super::open_cache(&settings)?;
    let steam = Arc::new(super::steam_client(&settings)?);

    let mut listing = Listing::new(title);
    listing.raw_asset_refs = assets;

    let rt = super::runtime()?;
    let outcome = rt.block_on(async {
        let session = Session::new(site, steam, cache, settings.session_config());
        session.process(listing).await
    })?;

    match outcome {
        ListingOutcome::Enriched {
            record,
            method,
            search_hit,
            ..
        } => {
            log::info!(
                "{} {}",
                title.if_supports_color(Stdout, |t| t.bold()),
                format!("({} via {})", record.identity, method)
                    .if_supports_color(Stdout, |t| t.dimmed()),
            );
            if let Some(hit) = &search_hit {
                log::info!("  Matched: {}", hit.name);
            }
            log::info!("  {}", super::format_record(&record, search_hit.as_ref()));
        }
        ListingOutcome::NoData { resolution, .. } => {
            log::info!(
                "{} {}",
                title.if_supports_color(Stdout, |t| t.bold()),
                format!("[no data: {}]", no_data_reason(&resolution))
                    .if_supports_color(Stdout, |t| t.dimmed()),
            );
        }
        ListingOutcome::Skipped => {
            log::info!("{} is in a section {} never lists games", title, site);
        }
    }
    Ok(())
}
