//! Cover-filename → identity pairs sniffed from storefront API responses.
//!
//! Two roles share the map: the response-sniffing collaborator writes pairs
//! through [`InterceptorMap::ingest_payload`] or [`InterceptorMap::record`],
//! and the resolver only reads. Clones share the same map.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use keyshelf_core::{IdentityKind, RawIdentity};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct InterceptorMap {
    entries: Arc<RwLock<HashMap<String, RawIdentity>>>,
}

impl InterceptorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pair. `cover` may be a full URL; it is reduced to its
    /// filename first. Returns false when no filename could be derived.
    pub fn record(&self, cover: &str, identity: RawIdentity) -> bool {
        let Some(filename) = normalize_filename(cover) else {
            return false;
        };
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        entries.insert(filename, identity);
        true
    }

    /// Look up the identity for one asset reference.
    pub fn lookup(&self, asset: &str) -> Option<RawIdentity> {
        let filename = normalize_filename(asset)?;
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        entries.get(&filename).cloned()
    }

    /// First asset reference with a recorded identity.
    pub fn lookup_any(&self, assets: &[String]) -> Option<RawIdentity> {
        assets.iter().find_map(|asset| self.lookup(asset))
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pull every `{cover, steam: {id, type}}` item out of a storefront API
    /// response and record it. Returns the number of pairs recorded.
    ///
    /// Recognized shapes: `bundles[].games[]`, `products[]`, a single item at
    /// the top level, and `results[].hits[]`.
    pub fn ingest_payload(&self, payload: &Value) -> usize {
        let mut items: Vec<&Value> = Vec::new();

        if let Some(bundles) = payload.get("bundles").and_then(Value::as_array) {
            for bundle in bundles {
                if let Some(games) = bundle.get("games").and_then(Value::as_array) {
                    items.extend(games);
                }
            }
        }
        if let Some(products) = payload.get("products").and_then(Value::as_array) {
            items.extend(products);
        }
        if payload.get("cover").is_some() && payload.get("steam").is_some() {
            items.push(payload);
        }
        if let Some(results) = payload.get("results").and_then(Value::as_array) {
            for result in results {
                if let Some(hits) = result.get("hits").and_then(Value::as_array) {
                    items.extend(hits);
                }
            }
        }

        let mut recorded = 0;
        for (cover, identity) in items.into_iter().filter_map(item_pair) {
            if self.record(cover, identity) {
                recorded += 1;
            }
        }
        if recorded > 0 {
            log::debug!("Interceptor recorded {} cover mapping(s)", recorded);
        }
        recorded
    }
}

fn item_pair(item: &Value) -> Option<(&str, RawIdentity)> {
    let cover = item.get("cover")?.as_str()?;
    let steam = item.get("steam")?;
    let id = match steam.get("id")? {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let kind = match steam.get("type").and_then(Value::as_str) {
        Some("sub") => IdentityKind::Collection,
        Some("bundle") => IdentityKind::Bundle,
        _ => IdentityKind::Title,
    };
    Some((cover, RawIdentity::new(id, kind)))
}

/// Last path segment of a URL or path, with any query string or fragment
/// removed.
pub fn normalize_filename(asset: &str) -> Option<String> {
    let without_query = asset.split(['?', '#']).next().unwrap_or_default();
    let filename = without_query.rsplit('/').next().unwrap_or_default();
    (!filename.is_empty()).then(|| filename.to_string())
}
