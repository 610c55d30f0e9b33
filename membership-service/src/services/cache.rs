//! TTL cache used for identity lookups.
//!
//! Purely an optimization: expired entries behave as misses and are removed
//! by the access that finds them, so no sweep is required for correctness.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Concurrent key-value cache with per-entry expiry.
#[derive(Clone)]
pub struct TtlCache<V> {
    entries: Arc<DashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub default_ttl_seconds: u64,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// A hit never returns an entry past its expiry.
    pub fn get(&self, key: &str) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            // Re-checked under the entry lock; a concurrent refresh wins.
            self.entries
                .remove_if(key, |_, entry| entry.expires_at <= Instant::now());
        }
        None
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Remove one entry; true when something was actually removed.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Entry count including not-yet-collected expired entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry; returns how many were dropped.
    pub fn clear(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    /// Drop all expired entries. Returns the eviction count.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            default_ttl_seconds: self.default_ttl.as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(ttl: Duration) -> TtlCache<String> {
        TtlCache::new(ttl)
    }

    #[test]
    fn set_then_get_within_ttl() {
        let cache = cache(Duration::from_secs(60));
        cache.set("k", "v".to_string());

        assert_eq!(cache.get("k").as_deref(), Some("v"));
        assert!(cache.contains("k"));
    }

    #[test]
    fn expired_entries_behave_as_misses_and_are_collected() {
        let cache = cache(Duration::from_millis(20));
        cache.set("k", "v".to_string());

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0, "access past expiry removes the entry");
    }

    #[test]
    fn per_entry_ttl_overrides_the_default() {
        let cache = cache(Duration::from_millis(10));
        cache.set_with_ttl("k", "v".to_string(), Duration::from_secs(60));

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn invalidate_removes_exactly_one_key() {
        let cache = cache(Duration::from_secs(60));
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());

        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"), "second invalidate finds nothing");
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b").as_deref(), Some("2"));
    }

    #[test]
    fn purge_expired_only_drops_stale_entries() {
        let cache = cache(Duration::from_secs(60));
        cache.set_with_ttl("stale", "x".to_string(), Duration::from_millis(10));
        cache.set("fresh", "y".to_string());

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_reports_the_dropped_count() {
        let cache = cache(Duration::from_secs(60));
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());

        assert_eq!(cache.clear(), 2);
        assert!(cache.is_empty());
    }
}
