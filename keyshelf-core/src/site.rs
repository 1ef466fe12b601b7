use std::sync::LazyLock;

use regex::Regex;

use crate::{IdentityKind, RawIdentity};

/// Storefront identifiers for all supported sites.
///
/// This enum centralizes the selector-independent behavior of each storefront
/// (direct id extraction, interceptor support, ignored sections, stable keys).
/// DOM selector tables stay with the page-scanning collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteProfile {
    HumbleBundle,
    Fanatical,
    DailyIndieGame,
    Gog,
    IndieGala,
}

/// All site variants in registration order.
const ALL_SITES: &[SiteProfile] = &[
    SiteProfile::HumbleBundle,
    SiteProfile::Fanatical,
    SiteProfile::DailyIndieGame,
    SiteProfile::Gog,
    SiteProfile::IndieGala,
];

static GAMELISTING_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"site_gamelisting_(\d+)").unwrap());
static BUNDLE_IMAGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/bundle_games/(?:.*/)?(\d+)\.jpg").unwrap());
static STORE_APP_LINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"steampowered\.com/app/(\d+)").unwrap());

impl SiteProfile {
    /// Canonical short name used for CLI arguments and identifiers.
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::HumbleBundle => "humble",
            Self::Fanatical => "fanatical",
            Self::DailyIndieGame => "dig",
            Self::Gog => "gog",
            Self::IndieGala => "indiegala",
        }
    }

    /// Full display name for the site.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::HumbleBundle => "Humble Bundle",
            Self::Fanatical => "Fanatical",
            Self::DailyIndieGame => "DailyIndieGame",
            Self::Gog => "GOG",
            Self::IndieGala => "IndieGala",
        }
    }

    /// Registrable domain; subdomains (e.g. `freebies.indiegala.com`) match too.
    pub fn domain(&self) -> &'static str {
        match self {
            Self::HumbleBundle => "humblebundle.com",
            Self::Fanatical => "fanatical.com",
            Self::DailyIndieGame => "dailyindiegame.com",
            Self::Gog => "gog.com",
            Self::IndieGala => "indiegala.com",
        }
    }

    /// All accepted names for this site (case-insensitive matching).
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::HumbleBundle => &["humble", "humblebundle", "humble bundle"],
            Self::Fanatical => &["fanatical"],
            Self::DailyIndieGame => &["dig", "dailyindiegame", "daily indie game"],
            Self::Gog => &["gog", "gog.com"],
            Self::IndieGala => &["indiegala", "gala", "ig"],
        }
    }

    /// Whether the site's own API responses are sniffed for cover → identity
    /// pairs.
    pub fn interceptor_enabled(&self) -> bool {
        matches!(self, Self::Fanatical)
    }

    /// URL fragment marking pages that never list games.
    pub fn ignore_url_fragment(&self) -> Option<&'static str> {
        match self {
            Self::HumbleBundle => Some("/books/"),
            _ => None,
        }
    }

    pub fn is_ignored_url(&self, url: &str) -> bool {
        self.ignore_url_fragment()
            .is_some_and(|fragment| url.contains(fragment))
    }

    /// Prefix for stats keys built from the site's native product id. Only
    /// sites whose native ids are stable across page layouts have one.
    pub fn stable_key_prefix(&self) -> Option<&'static str> {
        match self {
            Self::Gog => Some("gog_"),
            _ => None,
        }
    }

    /// Extract an authoritative identity from the listing's links and images,
    /// for sites whose markup carries one.
    ///
    /// The result is unvalidated; the resolver decides whether its id is usable.
    pub fn extract_direct_hint(&self, refs: &[String]) -> Option<RawIdentity> {
        let capture = |re: &Regex| {
            refs.iter()
                .find_map(|r| re.captures(r).map(|c| c[1].to_string()))
        };
        let id = match self {
            Self::DailyIndieGame => capture(&GAMELISTING_REGEX),
            // Store item ids are IndieGala-internal; only bundle art and
            // native store links carry real catalog ids.
            Self::IndieGala => {
                capture(&BUNDLE_IMAGE_REGEX).or_else(|| capture(&STORE_APP_LINK_REGEX))
            }
            _ => None,
        }?;
        Some(RawIdentity::new(id, IdentityKind::Title))
    }

    /// Find the site serving `hostname`.
    pub fn from_hostname(hostname: &str) -> Option<Self> {
        let lower = hostname.to_lowercase();
        ALL_SITES
            .iter()
            .copied()
            .find(|site| lower.contains(site.domain()))
    }

    /// All supported sites.
    pub fn all() -> &'static [SiteProfile] {
        ALL_SITES
    }
}

impl std::fmt::Display for SiteProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Error returned when a string cannot be parsed into a `SiteProfile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteParseError(pub String);

impl std::fmt::Display for SiteParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown site: '{}'", self.0)
    }
}

impl std::error::Error for SiteParseError {}

impl std::str::FromStr for SiteProfile {
    type Err = SiteParseError;

    /// Parse a site from its short name, any alias, or a hostname.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        for &site in ALL_SITES {
            if site.short_name() == lower || site.aliases().contains(&lower.as_str()) {
                return Ok(site);
            }
        }
        Self::from_hostname(&lower).ok_or_else(|| SiteParseError(s.to_string()))
    }
}

#[cfg(test)]
#[path = "tests/site_tests.rs"]
mod tests;
