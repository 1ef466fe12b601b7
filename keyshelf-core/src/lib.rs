use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

pub mod error;
pub mod site;
pub mod title;

pub use error::FetchError;
pub use site::{SiteParseError, SiteProfile};
pub use title::{clean_title, edit_distance, normalize_title, similarity};

/// Kind of catalog entry an identity names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IdentityKind {
    /// A single game or application ("app" in store URLs).
    #[default]
    Title,
    /// A package of several titles ("sub" in store URLs).
    Collection,
    /// A store-curated bundle ("bundle" in store URLs).
    Bundle,
}

impl IdentityKind {
    /// Path segment the store uses for this kind in links.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Title => "app",
            Self::Collection => "sub",
            Self::Bundle => "bundle",
        }
    }

    /// Map a URL segment to a kind. Accepts both the link form (`app`, `sub`,
    /// `bundle`) and the image CDN form (`apps`, `subs`, `bundles`),
    /// case-insensitively.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment.to_ascii_lowercase().as_str() {
            "app" | "apps" => Some(Self::Title),
            "sub" | "subs" => Some(Self::Collection),
            "bundle" | "bundles" => Some(Self::Bundle),
            _ => None,
        }
    }
}

impl std::fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Title => write!(f, "title"),
            Self::Collection => write!(f, "collection"),
            Self::Bundle => write!(f, "bundle"),
        }
    }
}

/// Canonical catalog identity. The id is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    id: u32,
    kind: IdentityKind,
}

impl Identity {
    /// Build an identity, rejecting a zero id.
    pub fn new(id: u32, kind: IdentityKind) -> Option<Self> {
        (id > 0).then_some(Self { id, kind })
    }

    pub fn title(id: u32) -> Option<Self> {
        Self::new(id, IdentityKind::Title)
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> IdentityKind {
        self.kind
    }

    /// Public store page for this identity.
    pub fn store_url(&self) -> String {
        format!(
            "https://store.steampowered.com/{}/{}/",
            self.kind.path_segment(),
            self.id
        )
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind.path_segment(), self.id)
    }
}

/// An identity exactly as found in markup or on the wire, before its id has
/// been validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawIdentity {
    pub id: String,
    #[serde(default)]
    pub kind: IdentityKind,
}

impl RawIdentity {
    pub fn new(id: impl Into<String>, kind: IdentityKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    /// Validate the raw id, returning `None` when it is not a positive integer.
    pub fn validate(&self) -> Option<Identity> {
        parse_identity_id(&self.id).and_then(|id| Identity::new(id, self.kind))
    }
}

impl From<Identity> for RawIdentity {
    fn from(identity: Identity) -> Self {
        Self::new(identity.id.to_string(), identity.kind)
    }
}

/// Parse a raw id string the lenient way store markup requires: surrounding
/// whitespace is ignored and the leading run of ASCII digits is used, so
/// `"220,380"` (a package row listing several apps) yields `220`.
///
/// Returns `None` for an empty digit run, zero, or overflow.
pub fn parse_identity_id(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let id = trimmed[..digits_end].parse::<u32>().ok()?;
    (id > 0).then_some(id)
}

/// One product listing as scraped from a storefront page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Title text as displayed by the storefront.
    pub title: String,

    /// Identity extracted from site markup or URL, trusted without verification.
    #[serde(default)]
    pub direct_hint: Option<RawIdentity>,

    /// Link hrefs and image srcs found inside the listing.
    #[serde(default)]
    pub raw_asset_refs: Vec<String>,

    /// Storefront-native product id, when the site exposes one.
    #[serde(default)]
    pub native_id: Option<String>,

    /// Primary link of the listing.
    #[serde(default)]
    pub link: Option<String>,
}

impl Listing {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_direct_hint(mut self, hint: impl Into<RawIdentity>) -> Self {
        self.direct_hint = Some(hint.into());
        self
    }

    pub fn with_asset_ref(mut self, asset: impl Into<String>) -> Self {
        self.raw_asset_refs.push(asset.into());
        self
    }

    pub fn with_native_id(mut self, id: impl Into<String>) -> Self {
        self.native_id = Some(id.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// Library relationship of the user to a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Owned,
    Wishlisted,
    Ignored,
    Missing,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owned => write!(f, "owned"),
            Self::Wishlisted => write!(f, "wishlisted"),
            Self::Ignored => write!(f, "ignored"),
            Self::Missing => write!(f, "missing"),
        }
    }
}

/// The user's library as reported by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySnapshot {
    pub owned: HashSet<u32>,
    pub wishlisted: HashSet<u32>,
    pub ignored: HashMap<u32, bool>,
    /// Milliseconds since the Unix epoch.
    pub fetched_at: i64,
}

impl LibrarySnapshot {
    /// An empty snapshot usually means the user is not signed in or cookies
    /// were blocked, not that the library is really empty.
    pub fn is_empty(&self) -> bool {
        self.owned.is_empty() && self.wishlisted.is_empty()
    }

    /// Classify an id. Precedence: owned, wishlisted, ignored, missing.
    pub fn status_of(&self, id: u32) -> Status {
        if self.owned.contains(&id) {
            Status::Owned
        } else if self.wishlisted.contains(&id) {
            Status::Wishlisted
        } else if self.ignored.contains_key(&id) {
            Status::Ignored
        } else {
            Status::Missing
        }
    }
}

/// Coarse review rating used for coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingBand {
    Positive,
    Mixed,
    Negative,
}

/// Aggregate user review score for a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSummary {
    /// 0-100, rounded down.
    pub percent_positive: u8,
    pub total_reviews: u32,
    /// Store label such as "Very Positive".
    pub label: String,
}

impl ReviewSummary {
    /// Build a summary from raw counts. Returns `None` when there are no reviews.
    pub fn from_counts(total: u32, positive: u32, label: impl Into<String>) -> Option<Self> {
        if total == 0 {
            return None;
        }
        let percent = (u64::from(positive.min(total)) * 100 / u64::from(total)) as u8;
        Some(Self {
            percent_positive: percent,
            total_reviews: total,
            label: label.into(),
        })
    }

    pub fn rating_band(&self) -> RatingBand {
        match self.percent_positive {
            70..=u8::MAX => RatingBand::Positive,
            40..=69 => RatingBand::Mixed,
            _ => RatingBand::Negative,
        }
    }
}

/// Opaque compatibility label (e.g. "platinum", "gold").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityTier(pub String);

impl std::fmt::Display for CompatibilityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resolved identity combined with library, review and compatibility data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    pub identity: Identity,
    pub status: Status,
    pub review: Option<ReviewSummary>,
    pub tier: Option<CompatibilityTier>,
}

#[cfg(test)]
#[path = "tests/model_tests.rs"]
mod tests;
