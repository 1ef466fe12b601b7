pub(crate) mod appdb;
pub(crate) mod cache;
pub(crate) mod config;
pub(crate) mod resolve;
pub(crate) mod scan;

use std::sync::Arc;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use keyshelf_cache::{Cache, JsonFileStore};
use keyshelf_core::{EnrichedRecord, RatingBand, Status};
use keyshelf_lib::Settings;
use keyshelf_steam::{SearchHit, SteamClient};

use crate::error::CliError;

/// Store session cookie, required for library status.
pub(crate) const ENV_STEAM_COOKIE: &str = "STEAM_COOKIE";

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new().map_err(|e| CliError::runtime(e.to_string()))
}

pub(crate) fn open_cache(settings: &Settings) -> Result<Cache, CliError> {
    let store = JsonFileStore::open(settings.store_path())?;
    Ok(Cache::new(Arc::new(store)))
}

pub(crate) fn steam_client(settings: &Settings) -> Result<SteamClient, CliError> {
    let client = SteamClient::new(settings.endpoints())?;
    match std::env::var(ENV_STEAM_COOKIE) {
        Ok(cookie) if !cookie.trim().is_empty() => Ok(client.with_cookie(cookie.trim())),
        _ => {
            log::warn!(
                "{} {} not set; library status will show every title as missing",
                "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
                ENV_STEAM_COOKIE,
            );
            Ok(client)
        }
    }
}

/// One-line summary of an enriched record: status, review, tier and link.
pub(crate) fn format_record(record: &EnrichedRecord, search_hit: Option<&SearchHit>) -> String {
    let status = record.status.to_string();
    let status = match record.status {
        Status::Owned => status.if_supports_color(Stdout, |t| t.green()).to_string(),
        Status::Wishlisted => status.if_supports_color(Stdout, |t| t.cyan()).to_string(),
        Status::Ignored => status.if_supports_color(Stdout, |t| t.dimmed()).to_string(),
        Status::Missing => status.if_supports_color(Stdout, |t| t.yellow()).to_string(),
    };

    let mut line = format!("[{}]", status);
    if let Some(review) = &record.review {
        let text = format!(
            "{}% {} ({} reviews)",
            review.percent_positive, review.label, review.total_reviews
        );
        let text = match review.rating_band() {
            RatingBand::Positive => text.if_supports_color(Stdout, |t| t.green()).to_string(),
            RatingBand::Mixed => text.if_supports_color(Stdout, |t| t.yellow()).to_string(),
            RatingBand::Negative => text.if_supports_color(Stdout, |t| t.red()).to_string(),
        };
        line.push(' ');
        line.push_str(&text);
    }
    if let Some(tier) = &record.tier {
        line.push_str(&format!(
            " {}",
            format!("proton: {}", tier).if_supports_color(Stdout, |t| t.magenta())
        ));
    }
    if let Some(discount) = search_hit.and_then(|hit| hit.discount_percent) {
        line.push_str(&format!(" -{}%", discount));
    }
    line.push_str(&format!(
        " {}",
        record
            .identity
            .store_url()
            .if_supports_color(Stdout, |t| t.dimmed())
    ));
    line
}
