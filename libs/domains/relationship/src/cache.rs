//! TTL cache for query artifacts (responses and embeddings).
//!
//! Concurrent writers to the same key race benignly: both compute the
//! same logical answer and the last writer wins. Expiry is enforced on
//! read, so a cached entry is never served past its TTL.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use crate::models::{QueryOptions, RagResponse};

/// Cache hit/miss/eviction counters for one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
}

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, ttl: Duration) -> bool {
        !ttl.is_zero() && self.stored_at.elapsed() > ttl
    }
}

struct RegionInner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    eviction_queue: VecDeque<String>,
}

/// One TTL + max-entries cache region.
struct CacheRegion<V> {
    ttl: Duration,
    max_entries: usize,
    inner: Mutex<RegionInner<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<V: Clone> CacheRegion<V> {
    fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            inner: Mutex::new(RegionInner {
                entries: HashMap::new(),
                eviction_queue: VecDeque::new(),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        match inner.entries.get(key) {
            Some(entry) if !entry.is_expired(self.ttl) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            Some(_) => {
                inner.entries.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn put(&self, key: String, value: V) {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        inner.entries.insert(
            key.clone(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
        inner.eviction_queue.push_back(key);
        self.evict_if_necessary(&mut inner);
    }

    fn invalidate(&self, key: &str) {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        inner.entries.remove(key);
    }

    fn clear(&self) {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        inner.entries.clear();
        inner.eviction_queue.clear();
    }

    fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().expect("cache mutex poisoned");
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: inner.entries.len(),
        }
    }

    fn evict_if_necessary(&self, inner: &mut RegionInner<V>) {
        // Drop expired entries from the head, bounded per call
        for _ in 0..32 {
            let Some(key) = inner.eviction_queue.front().cloned() else {
                break;
            };
            match inner.entries.get(&key) {
                None => {
                    inner.eviction_queue.pop_front();
                }
                Some(entry) if entry.is_expired(self.ttl) => {
                    inner.eviction_queue.pop_front();
                    if inner.entries.remove(&key).is_some() {
                        self.evictions.fetch_add(1, Ordering::Relaxed);
                    }
                }
                Some(_) => break,
            }
        }

        // Enforce the size bound oldest-first
        while inner.entries.len() > self.max_entries {
            let Some(oldest) = inner.eviction_queue.pop_front() else {
                break;
            };
            if inner.entries.remove(&oldest).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Cache manager for relationship query artifacts.
pub struct QueryCache {
    enabled: bool,
    responses: CacheRegion<RagResponse>,
    embeddings: CacheRegion<Vec<f32>>,
}

impl QueryCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            enabled: true,
            responses: CacheRegion::new(ttl, max_entries),
            embeddings: CacheRegion::new(ttl, max_entries),
        }
    }

    /// A disabled cache never stores or returns anything.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            responses: CacheRegion::new(Duration::ZERO, 1),
            embeddings: CacheRegion::new(Duration::ZERO, 1),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get_response(&self, key: &str) -> Option<RagResponse> {
        if !self.enabled {
            return None;
        }
        self.responses.get(key)
    }

    pub fn put_response(&self, key: String, response: RagResponse) {
        if self.enabled {
            self.responses.put(key, response);
        }
    }

    pub fn get_embedding(&self, key: &str) -> Option<Vec<f32>> {
        if !self.enabled {
            return None;
        }
        self.embeddings.get(key)
    }

    pub fn put_embedding(&self, key: String, embedding: Vec<f32>) {
        if self.enabled {
            self.embeddings.put(key, embedding);
        }
    }

    pub fn invalidate_response(&self, key: &str) {
        self.responses.invalidate(key);
    }

    pub fn clear_all(&self) {
        self.responses.clear();
        self.embeddings.clear();
    }

    pub fn response_stats(&self) -> CacheStats {
        self.responses.stats()
    }

    pub fn embedding_stats(&self) -> CacheStats {
        self.embeddings.stats()
    }

    /// SHA-256 hex digest of an arbitrary string; `"empty"` for blank input.
    pub fn hash(value: &str) -> String {
        if value.trim().is_empty() {
            return "empty".to_string();
        }
        let digest = Sha256::digest(value.as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Canonical cache key for a query execution.
    pub fn response_key(query: &str, entity_types: &[String], options: &QueryOptions) -> String {
        let payload = format!(
            "{}::{}::limit={:?};threshold={:?};mode={:?}",
            query,
            entity_types.join(","),
            options.limit,
            options.similarity_threshold,
            options.return_mode,
        );
        Self::hash(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExecutionStage;

    fn response(query: &str) -> RagResponse {
        RagResponse::tagged(query, None, Vec::new(), ExecutionStage::Primary)
    }

    #[test]
    fn test_hash_is_stable_and_hex() {
        let a = QueryCache::hash("hello");
        let b = QueryCache::hash("hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_blank_is_empty_sentinel() {
        assert_eq!(QueryCache::hash(""), "empty");
        assert_eq!(QueryCache::hash("   "), "empty");
    }

    #[test]
    fn test_response_key_varies_with_options() {
        let types = vec!["document".to_string()];
        let base = QueryCache::response_key("q", &types, &QueryOptions::defaults());
        let limited =
            QueryCache::response_key("q", &types, &QueryOptions::defaults().with_limit(5));
        assert_ne!(base, limited);

        let same = QueryCache::response_key("q", &types, &QueryOptions::defaults());
        assert_eq!(base, same);
    }

    #[test]
    fn test_put_then_get_response() {
        let cache = QueryCache::new(Duration::from_secs(60), 10);
        cache.put_response("k".to_string(), response("q"));

        let hit = cache.get_response("k").unwrap();
        assert_eq!(hit.original_query, "q");

        let stats = cache.response_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_expired_entry_is_not_served() {
        let cache = QueryCache::new(Duration::from_millis(1), 10);
        cache.put_response("k".to_string(), response("q"));

        std::thread::sleep(Duration::from_millis(10));

        assert!(cache.get_response("k").is_none());
        assert_eq!(cache.response_stats().misses, 1);
    }

    #[test]
    fn test_size_bound_evicts_oldest() {
        let cache = QueryCache::new(Duration::from_secs(60), 2);
        cache.put_response("a".to_string(), response("a"));
        cache.put_response("b".to_string(), response("b"));
        cache.put_response("c".to_string(), response("c"));

        assert!(cache.get_response("a").is_none());
        assert!(cache.get_response("b").is_some());
        assert!(cache.get_response("c").is_some());
        assert!(cache.response_stats().evictions >= 1);
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache = QueryCache::disabled();
        cache.put_response("k".to_string(), response("q"));
        assert!(cache.get_response("k").is_none());
        cache.put_embedding("e".to_string(), vec![1.0]);
        assert!(cache.get_embedding("e").is_none());
    }

    #[test]
    fn test_embedding_region_round_trip() {
        let cache = QueryCache::new(Duration::from_secs(60), 10);
        cache.put_embedding("k".to_string(), vec![0.1, 0.2]);
        assert_eq!(cache.get_embedding("k"), Some(vec![0.1, 0.2]));
    }
}
