use std::collections::HashMap;

use keyshelf_core::RawIdentity;
use serde::{Deserialize, Serialize};

/// First row of a store search, as found in the markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Unvalidated id and kind taken from the row's data attributes.
    pub identity: RawIdentity,
    /// Display name of the row.
    pub name: String,
    /// Discount shown on the row, e.g. `75` for "-75%".
    #[serde(default)]
    pub discount_percent: Option<u8>,
}

/// One entry of the store's full application list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppListEntry {
    pub appid: u32,
    pub name: String,
}

// -- Wire shapes --

#[derive(Debug, Deserialize)]
pub(crate) struct UserDataResponse {
    #[serde(rename = "rgOwnedApps", default)]
    pub owned: Vec<u32>,
    #[serde(rename = "rgWishlist", default)]
    pub wishlist: Vec<WishlistEntry>,
    /// An object keyed by app id, or `[]` when empty.
    #[serde(rename = "rgIgnoredApps", default)]
    pub ignored: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WishlistEntry {
    Id(u32),
    Record { appid: u32 },
}

impl WishlistEntry {
    pub fn app_id(&self) -> u32 {
        match self {
            Self::Id(id) | Self::Record { appid: id } => *id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewsResponse {
    pub query_summary: Option<QuerySummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuerySummary {
    #[serde(default)]
    pub total_reviews: u32,
    #[serde(default)]
    pub total_positive: u32,
    #[serde(default)]
    pub review_score_desc: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TierResponse {
    #[serde(rename = "trendingTier")]
    pub trending_tier: Option<String>,
    pub tier: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppListResponse {
    pub applist: AppList,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppList {
    #[serde(default)]
    pub apps: Vec<AppListEntry>,
}

pub(crate) type DictionaryResponse = HashMap<String, u32>;
