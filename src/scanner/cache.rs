//! Explicit, explicitly-keyed cache for cointegration test results.
//!
//! Keyed by pair identity plus the panel's data version, so a cache can be
//! reused across repeated scans of the same panel but never serves stale
//! results after the data changes. Passed into the scanner by the caller;
//! there is no ambient global cache.

use super::PairStats;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    symbol_a: String,
    symbol_b: String,
    data_version: u64,
}

/// Outcome of one cached test: the statistics, or the reason it was
/// untestable.
#[derive(Debug, Clone)]
pub enum CachedTest {
    Tested(PairStats),
    Untestable(String),
}

/// Thread-safe test-result cache. Cheap to share across scan workers.
#[derive(Debug, Default)]
pub struct ScanCache {
    entries: Mutex<HashMap<CacheKey, CachedTest>>,
}

impl ScanCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol_a: &str, symbol_b: &str, data_version: u64) -> Option<CachedTest> {
        let key = CacheKey {
            symbol_a: symbol_a.to_string(),
            symbol_b: symbol_b.to_string(),
            data_version,
        };
        self.entries
            .lock()
            .expect("scan cache lock poisoned")
            .get(&key)
            .cloned()
    }

    pub fn insert(
        &self,
        symbol_a: &str,
        symbol_b: &str,
        data_version: u64,
        result: CachedTest,
    ) {
        let key = CacheKey {
            symbol_a: symbol_a.to_string(),
            symbol_b: symbol_b.to_string(),
            data_version,
        };
        self.entries
            .lock()
            .expect("scan cache lock poisoned")
            .insert(key, result);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("scan cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_roundtrip() {
        let cache = ScanCache::new();
        assert!(cache.get("A", "B", 1).is_none());

        cache.insert("A", "B", 1, CachedTest::Untestable("singular".into()));
        match cache.get("A", "B", 1) {
            Some(CachedTest::Untestable(reason)) => assert_eq!(reason, "singular"),
            other => panic!("unexpected cache entry: {:?}", other),
        }
    }

    #[test]
    fn test_cache_keyed_by_data_version() {
        let cache = ScanCache::new();
        cache.insert("A", "B", 1, CachedTest::Untestable("singular".into()));
        assert!(cache.get("A", "B", 2).is_none());
    }
}
