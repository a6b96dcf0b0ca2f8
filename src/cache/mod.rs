//!
//! _Result cache_
//!
//! Bounded store of finished translations keyed by
//! `(source, target, normalized text)`.
//!

use std::{
    num::NonZeroUsize,
    time::{Duration, Instant},
};

use log::debug;
use lru::LruCache;
use parking_lot::Mutex;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    inserted_at: Instant,
}

/// Translation cache with optional expiry.
///
/// Reads never reorder entries, so eviction always drops the entry inserted
/// longest ago, which is also the oldest by timestamp. Writing an existing
/// key counts as a fresh insertion.
#[derive(Debug)]
pub struct ResultCache {
    inner: Mutex<LruCache<String, CacheEntry>>,
    ttl: Option<Duration>,
}

impl ResultCache {
    /// Cache holding at most `max_size` entries, each living for `ttl` if set
    pub fn new(max_size: NonZeroUsize, ttl: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(max_size)),
            ttl,
        }
    }

    /// Cached value for `key`, or `None` when missing or expired.
    /// Expired entries are dropped on the way out.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut cache = self.inner.lock();
        let entry = cache.peek(key)?;

        if self.is_expired(entry) {
            cache.pop(key);
            debug!("Cache entry expired: {key}");
            return None;
        }

        Some(entry.value.clone())
    }

    /// Store `value` under `key`, evicting the oldest entry when full
    pub fn set(&self, key: String, value: String) {
        let mut cache = self.inner.lock();
        // re-inserting must move the key to the young end
        cache.pop(&key);
        let entry = CacheEntry {
            value,
            inserted_at: Instant::now(),
        };
        if let Some((evicted, _)) = cache.push(key, entry) {
            debug!("Cache full, evicted: {evicted}");
        }
    }

    /// Number of stored entries, expired ones included until they are read
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the cache holds nothing
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.ttl.is_some_and(|ttl| entry.inserted_at.elapsed() >= ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn cache(max: usize, ttl: Option<Duration>) -> ResultCache {
        ResultCache::new(NonZeroUsize::new(max).unwrap(), ttl)
    }

    #[test]
    fn stores_and_reads_back() {
        let cache = cache(4, None);
        assert_eq!(cache.get("es|en|Hola"), None);
        cache.set("es|en|Hola".into(), "Hello".into());
        assert_eq!(cache.get("es|en|Hola"), Some("Hello".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn overflow_evicts_the_first_inserted_key() {
        let cache = cache(3, None);
        for i in 0..4 {
            cache.set(format!("k{i}"), format!("v{i}"));
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("k0"), None);
        assert_eq!(cache.get("k3"), Some("v3".to_string()));
    }

    #[test]
    fn reads_do_not_protect_from_eviction() {
        let cache = cache(2, None);
        cache.set("a".into(), "1".into());
        cache.set("b".into(), "2".into());
        assert!(cache.get("a").is_some());
        cache.set("c".into(), "3".into());
        assert_eq!(cache.get("a"), None);
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn rewrite_refreshes_insertion_order() {
        let cache = cache(2, None);
        cache.set("a".into(), "1".into());
        cache.set("b".into(), "2".into());
        cache.set("a".into(), "1b".into());
        cache.set("c".into(), "3".into());
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some("1b".to_string()));
    }

    #[test]
    fn expired_entries_are_absent_and_purged() {
        let cache = cache(4, Some(Duration::from_millis(20)));
        cache.set("a".into(), "1".into());
        assert!(cache.get("a").is_some());
        thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = cache(4, None);
        cache.set("a".into(), "1".into());
        cache.clear();
        assert!(cache.is_empty());
    }
}
