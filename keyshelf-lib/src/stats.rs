//! Deduplicated per-session counters.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use keyshelf_core::{Listing, SiteProfile, Status};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsCounters {
    pub total: u64,
    pub owned: u64,
    pub wishlisted: u64,
    pub ignored: u64,
    pub missing: u64,
    /// Listings that could not be resolved to a valid identity
    pub no_data: u64,
}

impl StatsCounters {
    fn bump(&mut self, status: Option<Status>) {
        self.total += 1;
        match status {
            Some(Status::Owned) => self.owned += 1,
            Some(Status::Wishlisted) => self.wishlisted += 1,
            Some(Status::Ignored) => self.ignored += 1,
            Some(Status::Missing) => self.missing += 1,
            None => self.no_data += 1,
        }
    }
}

impl std::fmt::Display for StatsCounters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} total: {} owned, {} wishlisted, {} ignored, {} missing, {} no data",
            self.total, self.owned, self.wishlisted, self.ignored, self.missing, self.no_data
        )
    }
}

/// Counts each listing key at most once.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    counters: StatsCounters,
    counted: HashSet<String>,
    entries: Vec<(String, Option<Status>)>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `key` under `status`, or under "no data" when `status` is
    /// `None`. A key that was already counted is ignored. Returns whether the
    /// call changed the counters.
    pub fn record(&mut self, key: impl Into<String>, status: Option<Status>) -> bool {
        let key = key.into();
        if self.counted.contains(&key) {
            return false;
        }
        self.counters.bump(status);
        self.counted.insert(key.clone());
        self.entries.push((key, status));
        true
    }

    pub fn counters(&self) -> StatsCounters {
        self.counters
    }

    pub fn is_counted(&self, key: &str) -> bool {
        self.counted.contains(key)
    }

    /// Counted keys in the order they were first recorded.
    pub fn entries(&self) -> &[(String, Option<Status>)] {
        &self.entries
    }

    /// Write a plain-text report: a summary, then one line per counted key.
    pub fn write_report(&self, out: &mut impl Write, site: SiteProfile) -> std::io::Result<()> {
        let c = &self.counters;
        writeln!(out, "=== Keyshelf Report ===")?;
        writeln!(out, "Site: {}", site)?;
        writeln!(out, "Date: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(out)?;
        writeln!(out, "--- Summary ---")?;
        writeln!(out, "Total: {}", c.total)?;
        writeln!(out, "Owned: {}", c.owned)?;
        writeln!(out, "Wishlisted: {}", c.wishlisted)?;
        writeln!(out, "Ignored: {}", c.ignored)?;
        writeln!(out, "Missing: {}", c.missing)?;
        writeln!(out, "No data: {}", c.no_data)?;
        writeln!(out)?;
        writeln!(out, "--- Details ---")?;
        for (key, status) in &self.entries {
            let tag = match status {
                Some(Status::Owned) => "OWNED",
                Some(Status::Wishlisted) => "WISHLIST",
                Some(Status::Ignored) => "IGNORED",
                Some(Status::Missing) => "MISSING",
                None => "NO DATA",
            };
            writeln!(out, "[{}] {}", tag, key)?;
        }
        Ok(())
    }

    pub fn write_report_to_file(&self, path: &Path, site: SiteProfile) -> std::io::Result<()> {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        self.write_report(&mut file, site)?;
        file.flush()
    }
}

/// Stable dedup key for a listing: the site's native id when the site has
/// stable ones, else the link without its query string, else the title.
pub fn derive_key(profile: SiteProfile, listing: &Listing) -> String {
    if let (Some(prefix), Some(native)) = (profile.stable_key_prefix(), listing.native_id.as_deref()) {
        if !native.is_empty() {
            return format!("{prefix}{native}");
        }
    }
    if let Some(link) = listing.link.as_deref().filter(|l| !l.is_empty()) {
        return link.split('?').next().unwrap_or(link).to_string();
    }
    listing.title.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_idempotent_per_key() {
        let mut stats = StatsAggregator::new();
        assert!(stats.record("a", Some(Status::Owned)));
        assert!(!stats.record("a", Some(Status::Owned)));
        // A different status for the same key is still a duplicate
        assert!(!stats.record("a", Some(Status::Missing)));

        let c = stats.counters();
        assert_eq!(c.total, 1);
        assert_eq!(c.owned, 1);
        assert_eq!(c.missing, 0);
    }

    #[test]
    fn none_counts_as_no_data() {
        let mut stats = StatsAggregator::new();
        stats.record("a", None);
        stats.record("b", Some(Status::Wishlisted));
        stats.record("c", Some(Status::Ignored));
        stats.record("d", Some(Status::Missing));

        assert_eq!(
            stats.counters(),
            StatsCounters {
                total: 4,
                owned: 0,
                wishlisted: 1,
                ignored: 1,
                missing: 1,
                no_data: 1,
            }
        );
        assert!(stats.is_counted("a"));
        assert!(!stats.is_counted("z"));
    }

    #[test]
    fn gog_uses_native_id() {
        let listing = Listing::new("Witcher 3")
            .with_native_id("1207664643")
            .with_link("https://www.gog.com/game/witcher_3?pp=1");
        assert_eq!(derive_key(SiteProfile::Gog, &listing), "gog_1207664643");
        // Other sites ignore native ids
        assert_eq!(
            derive_key(SiteProfile::HumbleBundle, &listing),
            "https://www.gog.com/game/witcher_3"
        );
    }

    #[test]
    fn falls_back_to_title() {
        let listing = Listing::new("  Portal  ").with_native_id("");
        assert_eq!(derive_key(SiteProfile::Gog, &listing), "Portal");
    }

    #[test]
    fn report_lists_summary_and_entries() {
        let mut stats = StatsAggregator::new();
        stats.record("https://www.humblebundle.com/store/portal", Some(Status::Owned));
        stats.record("Mystery Game", None);

        let mut out = Vec::new();
        stats.write_report(&mut out, SiteProfile::HumbleBundle).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Site: Humble Bundle"));
        assert!(text.contains("Total: 2"));
        assert!(text.contains("No data: 1"));
        assert!(text.contains("[OWNED] https://www.humblebundle.com/store/portal"));
        assert!(text.contains("[NO DATA] Mystery Game"));
    }
}
