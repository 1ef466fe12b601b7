use std::collections::HashMap;
use std::time::Duration;

use keyshelf_core::{CompatibilityTier, FetchError, LibrarySnapshot, ReviewSummary};

use crate::api::SteamApi;
use crate::parse;
use crate::types::{AppListEntry, SearchHit};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("keyshelf/", env!("CARGO_PKG_VERSION"));

/// Published offline dictionary artifact.
pub const DEFAULT_DICTIONARY_URL: &str =
    "https://cdn.jsdelivr.net/gh/gbzret4d/game-store-enhancer@main/data/steam_apps.min.json";

/// Base URLs of every endpoint the client calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub store: String,
    pub web_api: String,
    pub compatibility: String,
    pub dictionary: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            store: "https://store.steampowered.com".to_string(),
            web_api: "https://api.steampowered.com".to_string(),
            compatibility: "https://protondb.max-p.me/games".to_string(),
            dictionary: DEFAULT_DICTIONARY_URL.to_string(),
        }
    }
}

/// HTTP implementation of [`SteamApi`].
///
/// The client does no pacing of its own; callers route requests through the
/// request scheduler.
pub struct SteamClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    cookie: Option<String>,
}

impl SteamClient {
    pub fn new(endpoints: Endpoints) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::network(e.to_string()))?;
        Ok(Self {
            http,
            endpoints,
            cookie: None,
        })
    }

    /// Send a store session cookie with store requests. The library endpoint
    /// returns an empty document without one.
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Fetch the store's full application list, used to build the offline
    /// dictionary. Not part of [`SteamApi`]; only the dictionary builder
    /// needs it.
    pub async fn app_list(&self, api_key: Option<&str>) -> Result<Vec<AppListEntry>, FetchError> {
        let url = format!("{}/ISteamApps/GetAppList/v0002/", self.endpoints.web_api);
        let mut query = vec![("format", "json")];
        if let Some(key) = api_key {
            query.push(("key", key));
        }
        let (status, body) = self.get_text(&url, &query, false).await?;
        if !(200..300).contains(&status) {
            return Err(FetchError::network(format!("app list returned HTTP {status}")));
        }
        parse::parse_app_list(&body)
    }

    async fn get_text(
        &self,
        url: &str,
        query: &[(&str, &str)],
        with_cookie: bool,
    ) -> Result<(u16, String), FetchError> {
        let mut request = self.http.get(url).query(query);
        if with_cookie {
            if let Some(ref cookie) = self.cookie {
                request = request.header(reqwest::header::COOKIE, cookie);
            }
        }

        let resp = request
            .send()
            .await
            .map_err(|e| FetchError::network(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::network(e.to_string()))?;
        log::debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok((status, body))
    }

    /// GET a store URL, failing on rate-limit pages and non-success statuses.
    async fn get_store(&self, url: &str, query: &[(&str, &str)]) -> Result<String, FetchError> {
        let (status, body) = self.get_text(url, query, true).await?;
        parse::check_rate_limit(status, &body)?;
        if !(200..300).contains(&status) {
            return Err(FetchError::network(format!("{url} returned HTTP {status}")));
        }
        Ok(body)
    }
}

impl SteamApi for SteamClient {
    async fn library_snapshot(&self) -> Result<LibrarySnapshot, FetchError> {
        let url = format!("{}/dynamicstore/userdata/", self.endpoints.store);
        let body = self.get_store(&url, &[]).await?;
        parse::parse_library(&body, now_ms())
    }

    async fn search(&self, term: &str) -> Result<Option<SearchHit>, FetchError> {
        let url = format!("{}/search/results", self.endpoints.store);
        let body = self
            .get_store(&url, &[("term", term), ("ignore_preferences", "1")])
            .await?;
        Ok(parse::parse_search_results(&body))
    }

    async fn review_summary(&self, app_id: u32) -> Result<Option<ReviewSummary>, FetchError> {
        let url = format!("{}/appreviews/{}", self.endpoints.store, app_id);
        let body = self
            .get_store(
                &url,
                &[("json", "1"), ("num_per_page", "0"), ("purchase_type", "all")],
            )
            .await?;
        parse::parse_review_summary(&body)
    }

    async fn compatibility_tier(&self, app_id: u32) -> Result<Option<CompatibilityTier>, FetchError> {
        let url = format!("{}/{}", self.endpoints.compatibility, app_id);
        let (status, body) = self.get_text(&url, &[], false).await?;
        // No report for this app
        if status == 404 {
            return Ok(None);
        }
        if !(200..300).contains(&status) {
            return Err(FetchError::network(format!("{url} returned HTTP {status}")));
        }
        parse::parse_compatibility_tier(&body)
    }

    async fn app_dictionary(&self) -> Result<HashMap<String, u32>, FetchError> {
        let (status, body) = self.get_text(&self.endpoints.dictionary, &[], false).await?;
        if !(200..300).contains(&status) {
            return Err(FetchError::network(format!("dictionary returned HTTP {status}")));
        }
        parse::parse_app_dictionary(&body)
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
