//! In-memory response cache for upstream JSON payloads.
//!
//! Keys are semantic strings built by the routes (`validate:<card>`,
//! `productstore:store-<code>-barcode-<barcode>`); lookups are exact matches.
//! The default policy keeps every entry forever. A TTL and an entry bound can
//! be switched on through [`CachePolicy`].
//!
//! The cache is a cheap-to-clone handle over a shared [`DashMap`], owned by
//! the application state and handed to handlers through axum `State`.

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::config::CacheConfig;

/// A cached upstream payload.
///
/// The value is wrapped in `Arc` so a hit never copies the JSON tree.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub value: Arc<Value>,
    pub cached_at: Instant,
}

/// Expiry and size limits. `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Option<Duration>,
    pub max_entries: Option<usize>,
}

impl From<&CacheConfig> for CachePolicy {
    fn from(cfg: &CacheConfig) -> Self {
        Self {
            ttl: cfg.ttl_secs.map(Duration::from_secs),
            max_entries: cfg.max_entries,
        }
    }
}

#[derive(Default)]
struct CacheInner {
    entries: DashMap<String, CacheEntry>,
    policy: CachePolicy,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Process-wide key to JSON store.
#[derive(Clone, Default)]
pub struct ResponseCache {
    inner: Arc<CacheInner>,
}

impl ResponseCache {
    /// Creates an unbounded cache whose entries never expire.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: CachePolicy) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                policy,
                ..CacheInner::default()
            }),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.inner.policy
    }

    /// Looks up `key`. Expired entries are removed and reported as absent.
    pub fn get(&self, key: &str) -> Option<Arc<Value>> {
        let found = match self.inner.entries.get(key) {
            Some(entry) if !self.is_expired(&entry) => Some(Arc::clone(&entry.value)),
            Some(entry) => {
                drop(entry);
                self.inner
                    .entries
                    .remove_if(key, |_, entry| self.is_expired(entry));
                tracing::debug!(key = %key, "cache entry expired");
                None
            }
            None => None,
        };

        match found {
            Some(value) => {
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                tracing::info!(key = %key, "Backend cache hit");
                Some(value)
            }
            None => {
                self.inner.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores `value` under `key`, replacing any previous entry, and returns
    /// the shared handle so it can be stored under alias keys too.
    pub fn set(&self, key: &str, value: Value) -> Arc<Value> {
        let value = Arc::new(value);
        self.set_shared(key, Arc::clone(&value));
        value
    }

    pub fn set_shared(&self, key: &str, value: Arc<Value>) {
        if let Some(max) = self.inner.policy.max_entries
            && !self.inner.entries.contains_key(key)
            && self.inner.entries.len() >= max
        {
            self.evict_oldest();
        }

        self.inner.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                cached_at: Instant::now(),
            },
        );
        tracing::info!(key = %key, "Backend cache set");
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    pub fn clear(&self) {
        self.inner.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            ttl_secs: self.inner.policy.ttl.map(|ttl| ttl.as_secs()),
            max_entries: self.inner.policy.max_entries,
        }
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.inner
            .policy
            .ttl
            .is_some_and(|ttl| entry.cached_at.elapsed() > ttl)
    }

    fn evict_oldest(&self) {
        let oldest = self
            .inner
            .entries
            .iter()
            .min_by_key(|entry| entry.value().cached_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            self.inner.entries.remove(&key);
            tracing::debug!(key = %key, "cache entry evicted");
        }
    }
}

/// Cache statistics, reported on the readiness endpoint.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub ttl_secs: Option<u64>,
    pub max_entries: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_returns_what_was_set() {
        let cache = ResponseCache::new();
        cache.set("validate:9710084009641420", json!({"valid": true}));

        let hit = cache.get("validate:9710084009641420").unwrap();
        assert_eq!(*hit, json!({"valid": true}));
        assert!(cache.get("validate:0000").is_none());
    }

    #[test]
    fn test_set_overwrites_existing_entry() {
        let cache = ResponseCache::new();
        cache.set("k", json!(1));
        cache.set("k", json!(2));

        assert_eq!(cache.len(), 1);
        assert_eq!(*cache.get("k").unwrap(), json!(2));
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = ResponseCache::new();
        let other = cache.clone();
        cache.set("k", json!("v"));

        assert_eq!(*other.get("k").unwrap(), json!("v"));
    }

    #[test]
    fn test_alias_keys_share_one_value() {
        let cache = ResponseCache::new();
        let shared = cache.set("a", json!({"products": []}));
        cache.set_shared("b", Arc::clone(&shared));

        assert!(Arc::ptr_eq(&cache.get("a").unwrap(), &cache.get("b").unwrap()));
    }

    #[test]
    fn test_default_policy_never_expires() {
        let cache = ResponseCache::new();
        assert_eq!(cache.policy(), CachePolicy::default());

        cache.set("k", json!(true));
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get("k").is_some());
    }

    #[test]
    fn test_ttl_expires_entries() {
        let cache = ResponseCache::with_policy(CachePolicy {
            ttl: Some(Duration::from_millis(10)),
            max_entries: None,
        });
        cache.set("k", json!(true));
        std::thread::sleep(Duration::from_millis(30));

        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_max_entries_evicts_oldest() {
        let cache = ResponseCache::with_policy(CachePolicy {
            ttl: None,
            max_entries: Some(2),
        });
        cache.set("first", json!(1));
        std::thread::sleep(Duration::from_millis(2));
        cache.set("second", json!(2));
        std::thread::sleep(Duration::from_millis(2));
        cache.set("third", json!(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("first").is_none());
        assert!(cache.get("second").is_some());
        assert!(cache.get("third").is_some());
    }

    #[test]
    fn test_overwrite_in_full_cache_does_not_evict() {
        let cache = ResponseCache::with_policy(CachePolicy {
            ttl: None,
            max_entries: Some(2),
        });
        cache.set("a", json!(1));
        cache.set("b", json!(2));
        cache.set("a", json!(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn test_stats_count_hits_and_misses() {
        let cache = ResponseCache::new();
        cache.set("k", json!(null));
        cache.get("k");
        cache.get("k");
        cache.get("missing");

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.ttl_secs, None);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_policy_from_config() {
        let policy = CachePolicy::from(&CacheConfig {
            ttl_secs: Some(60),
            max_entries: Some(500),
        });
        assert_eq!(policy.ttl, Some(Duration::from_secs(60)));
        assert_eq!(policy.max_entries, Some(500));
    }
}
