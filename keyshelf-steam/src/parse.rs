//! Pure parsers for endpoint bodies, kept apart from the transport so they
//! can be tested against captured responses.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use keyshelf_core::{
    CompatibilityTier, FetchError, IdentityKind, LibrarySnapshot, RawIdentity, ReviewSummary,
};
use scraper::{ElementRef, Html, Selector};

use crate::types::{
    AppListEntry, AppListResponse, DictionaryResponse, ReviewsResponse, SearchHit, TierResponse,
    UserDataResponse,
};

macro_rules! selector {
    ($name:ident, $css:expr) => {
        static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

selector!(RESULT_ROW_IN_LIST_SELECTOR, "#search_resultsRows a.search_result_row");
selector!(RESULT_ROW_SELECTOR, "a.search_result_row");
selector!(TITLE_SELECTOR, ".title");
selector!(DISCOUNT_SELECTOR, ".search_discount span");
selector!(DISCOUNT_PCT_SELECTOR, ".discount_pct");

const ACCESS_DENIED_MARKER: &str = "Access Denied";
/// Title of the edge block page, lowercased for comparison.
const ACCESS_DENIED_TITLE: &str = "<title>access denied</title>";

/// Reject a response the store served as a rate-limit block.
///
/// HTTP 403 always counts. An error status counts when the body mentions
/// "Access Denied" anywhere. A success status only counts when the body is
/// the block page itself, so store content that merely contains the phrase
/// (a game title, say) does not trip the breaker.
pub fn check_rate_limit(status: u16, body: &str) -> Result<(), FetchError> {
    let success = (200..300).contains(&status);
    let blocked = status == 403
        || (!success && body.contains(ACCESS_DENIED_MARKER))
        || (success && is_block_page(body));
    if blocked {
        return Err(FetchError::RateLimited { status });
    }
    Ok(())
}

fn is_block_page(body: &str) -> bool {
    // The marker sits in the head; never scan a full results page
    let head: String = body.chars().take(512).collect();
    head.to_ascii_lowercase().contains(ACCESS_DENIED_TITLE)
}

/// Parse the dynamic-store userdata document.
pub fn parse_library(body: &str, fetched_at: i64) -> Result<LibrarySnapshot, FetchError> {
    let data: UserDataResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::parse(format!("userdata: {e}")))?;

    let ignored = match data.ignored {
        serde_json::Value::Object(map) => map
            .into_iter()
            .filter_map(|(key, value)| {
                let id = key.parse::<u32>().ok()?;
                let flag = match value {
                    serde_json::Value::Bool(b) => b,
                    serde_json::Value::Number(n) => n.as_i64() != Some(0),
                    _ => true,
                };
                Some((id, flag))
            })
            .collect(),
        _ => HashMap::new(),
    };

    Ok(LibrarySnapshot {
        owned: data.owned.into_iter().collect(),
        wishlisted: data
            .wishlist
            .iter()
            .map(|entry| entry.app_id())
            .collect::<HashSet<_>>(),
        ignored,
        fetched_at,
    })
}

/// Extract the first result row of a search results page.
///
/// The id always comes from `data-ds-appid` (for package rows this is a
/// comma-separated list of the contained apps). The kind follows whichever
/// of the package or bundle attributes is present.
pub fn parse_search_results(html: &str) -> Option<SearchHit> {
    let document = Html::parse_document(html);
    let row = document
        .select(&RESULT_ROW_IN_LIST_SELECTOR)
        .next()
        .or_else(|| document.select(&RESULT_ROW_SELECTOR).next())?;

    let attrs = row.value();
    let kind = if attrs.attr("data-ds-packageid").is_some_and(|v| !v.is_empty()) {
        IdentityKind::Collection
    } else if attrs.attr("data-ds-bundleid").is_some_and(|v| !v.is_empty()) {
        IdentityKind::Bundle
    } else {
        IdentityKind::Title
    };
    let raw_id = attrs.attr("data-ds-appid").unwrap_or_default();

    let name = row
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| collect_text(&el))
        .unwrap_or_default();

    Some(SearchHit {
        identity: RawIdentity::new(raw_id, kind),
        name,
        discount_percent: parse_discount(&row),
    })
}

fn parse_discount(row: &ElementRef<'_>) -> Option<u8> {
    let el = row
        .select(&DISCOUNT_SELECTOR)
        .next()
        .or_else(|| row.select(&DISCOUNT_PCT_SELECTOR).next())?;
    let text = collect_text(&el);
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse::<u8>().ok().filter(|pct| *pct > 0 && *pct <= 100)
}

fn collect_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Parse an app-reviews response. No `query_summary`, or zero reviews, is
/// `None`.
pub fn parse_review_summary(body: &str) -> Result<Option<ReviewSummary>, FetchError> {
    let data: ReviewsResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::parse(format!("reviews: {e}")))?;
    Ok(data.query_summary.and_then(|summary| {
        ReviewSummary::from_counts(
            summary.total_reviews,
            summary.total_positive,
            summary.review_score_desc,
        )
    }))
}

/// Parse a compatibility report, preferring the trending tier.
pub fn parse_compatibility_tier(body: &str) -> Result<Option<CompatibilityTier>, FetchError> {
    let data: TierResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::parse(format!("compatibility tier: {e}")))?;
    Ok(data
        .trending_tier
        .filter(|t| !t.is_empty())
        .or(data.tier.filter(|t| !t.is_empty()))
        .map(CompatibilityTier))
}

/// Parse the published offline dictionary.
pub fn parse_app_dictionary(body: &str) -> Result<HashMap<String, u32>, FetchError> {
    serde_json::from_str::<DictionaryResponse>(body)
        .map_err(|e| FetchError::parse(format!("app dictionary: {e}")))
}

/// Parse the store's full application list.
pub fn parse_app_list(body: &str) -> Result<Vec<AppListEntry>, FetchError> {
    let data: AppListResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::parse(format!("app list: {e}")))?;
    Ok(data.applist.apps)
}

#[cfg(test)]
#[path = "tests/parse_tests.rs"]
mod tests;
