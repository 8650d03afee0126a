//! Result cache.
//!
//! Stores fully assembled, un-windowed panels keyed by every request
//! parameter that shapes their content. The date window is deliberately not
//! part of the key: one entry serves every window.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use serde_json::json;

use crate::assemble::PanelDataset;
use crate::config::{PanelRequest, Vintage};
use crate::hash::cache_key_digest;
use crate::utils::canonical_tokens;

/// Canonical cache key of one request.
///
/// A compact JSON document of the normalized country tokens, level, vintage
/// marker, raw flag, local-cleaning flag, World Bank `[alias, code]` pairs
/// (in request order) and mobility URLs. JSON string escaping keeps user text
/// from ever reading as a field or list separator.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for `request` read at `vintage`.
    pub fn from_request(request: &PanelRequest, vintage: Vintage) -> Self {
        let indicators: Vec<[&str; 2]> = request
            .wb
            .iter()
            .map(|(alias, code)| [alias.as_str(), code.as_str()])
            .collect();
        let key = json!({
            "country": canonical_tokens(&request.country),
            "level": request.level.as_u8(),
            "vintage": vintage.marker(),
            "raw": request.raw,
            "clean_locally": request.clean_locally,
            "wb": indicators,
            "gmr": request.gmr,
            "amr": request.amr,
        });
        Self(key.to_string())
    }

    /// Canonical key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short digest for log correlation.
    pub fn digest(&self) -> u64 {
        cache_key_digest(&self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.digest())
    }
}

#[derive(Default)]
struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Thread-safe in-memory map from cache key to assembled panel.
///
/// Clones share storage. There is no eviction; concurrent writers of one key
/// race and the last write wins.
#[derive(Clone, Default)]
pub struct ResultCache {
    entries: Arc<RwLock<IndexMap<CacheKey, Arc<PanelDataset>>>>,
    stats: Arc<CacheStats>,
}

impl ResultCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored panel for `key`, counting the lookup as a hit or miss.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<PanelDataset>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let found = entries.get(key).cloned();
        let counter = if found.is_some() {
            &self.stats.hits
        } else {
            &self.stats.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store `dataset` under `key`, replacing any previous entry.
    pub fn insert(&self, key: CacheKey, dataset: PanelDataset) -> Arc<PanelDataset> {
        let dataset = Arc::new(dataset);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, Arc::clone(&dataset));
        dataset
    }

    /// Number of stored panels.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every stored panel. Hit and miss counters are kept.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Lookups that found an entry.
    pub fn hits(&self) -> u64 {
        self.stats.hits.load(Ordering::Relaxed)
    }

    /// Lookups that found nothing.
    pub fn misses(&self) -> u64 {
        self.stats.misses.load(Ordering::Relaxed)
    }
}
