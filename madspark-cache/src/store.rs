//! In-memory response cache with TTL expiry and LRU eviction (C3, §4.3).
//!
//! Entry wrapper carries timestamps and an access counter, TTL is
//! checked on `get`, capacity is enforced on `insert`. No Redis,
//! multi-level, or compression layers — the pipeline only ever needs a
//! single bounded process-local cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use madspark_contracts::LlmResponseMeta;
use serde_json::Value;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, trace};

use crate::error::CacheError;

/// Default time a cached response remains valid (§4.3).
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default number of entries retained before LRU eviction kicks in.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// A cached agent response: the validated JSON record plus the metadata
/// describing how it was produced, so a cache hit can still report which
/// provider originally generated it.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub record: Value,
    pub meta: LlmResponseMeta,
    inserted_at: DateTime<Utc>,
    last_accessed: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.inserted_at);
        age.to_std().map(|age| age > ttl).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
    pub expirations: u64,
}

struct Inner {
    entries: HashMap<String, CacheEntry>,
    stats: CacheStats,
}

/// Per-key in-flight markers so two concurrent callers computing the same
/// key do not both hit the provider (§5: "at most one in-flight
/// computation per cache key").
struct InFlight {
    waiters: Mutex<HashMap<String, Arc<Notify>>>,
}

/// A bounded, TTL-expiring, content-addressed cache of agent responses.
pub struct InMemoryResponseCache {
    inner: Mutex<Inner>,
    in_flight: InFlight,
    ttl: Duration,
    capacity: usize,
}

impl InMemoryResponseCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                stats: CacheStats::default(),
            }),
            in_flight: InFlight {
                waiters: Mutex::new(HashMap::new()),
            },
            ttl,
            capacity,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }

    /// Looks up `key`, evicting it (and counting an expiration) if its TTL
    /// has elapsed. A hit bumps `last_accessed` for LRU purposes and sets
    /// `meta.cached = true` on the returned copy.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut inner = self.inner.lock().await;

        let expired = match inner.entries.get(key) {
            Some(entry) => entry.is_expired(self.ttl),
            None => {
                inner.stats.misses += 1;
                return None;
            }
        };

        if expired {
            inner.entries.remove(key);
            inner.stats.expirations += 1;
            inner.stats.misses += 1;
            trace!(key, "cache entry expired");
            return None;
        }

        inner.stats.hits += 1;
        let now = Utc::now();
        let entry = inner.entries.get_mut(key).expect("checked above");
        entry.last_accessed = now;
        let mut hit = entry.clone();
        hit.meta.cached = true;
        Some(hit)
    }

    /// Inserts `record`/`meta` under `key`, evicting the least-recently
    /// accessed entry first if the cache is at capacity.
    pub async fn insert(&self, key: String, record: Value, meta: LlmResponseMeta) {
        let mut inner = self.inner.lock().await;
        self.evict_if_full(&mut inner);

        let now = Utc::now();
        inner.entries.insert(
            key,
            CacheEntry {
                record,
                meta,
                inserted_at: now,
                last_accessed: now,
            },
        );
        inner.stats.insertions += 1;
    }

    fn evict_if_full(&self, inner: &mut Inner) {
        if inner.entries.len() < self.capacity {
            return;
        }
        if let Some(lru_key) = inner
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(key, _)| key.clone())
        {
            inner.entries.remove(&lru_key);
            inner.stats.evictions += 1;
            debug!(key = %lru_key, "evicted least-recently-used cache entry");
        }
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.lock().await.stats.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
    }

    /// Returns the cached entry for `key` if present and unexpired;
    /// otherwise runs `compute` to produce one, inserts it, and returns
    /// it. Concurrent callers for the same key that miss together all
    /// wait on the first caller's `compute` rather than duplicating work.
    pub async fn get_or_insert_with<F, Fut, E>(
        &self,
        key: &str,
        compute: F,
    ) -> Result<CacheEntry, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<(Value, LlmResponseMeta), E>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }

        let notify = {
            let mut waiters = self.in_flight.waiters.lock().await;
            if let Some(existing) = waiters.get(key).cloned() {
                Some(existing)
            } else {
                waiters.insert(key.to_string(), Arc::new(Notify::new()));
                None
            }
        };

        if let Some(existing) = notify {
            existing.notified().await;
            if let Some(hit) = self.get(key).await {
                return Ok(hit);
            }
            // The leader's compute failed; fall through and try ourselves.
        }

        let result = compute().await;

        let leader_notify = {
            let mut waiters = self.in_flight.waiters.lock().await;
            waiters.remove(key)
        };

        match result {
            Ok((record, meta)) => {
                self.insert(key.to_string(), record.clone(), meta.clone())
                    .await;
                if let Some(n) = leader_notify {
                    n.notify_waiters();
                }
                let mut entry_meta = meta;
                entry_meta.cached = false;
                Ok(CacheEntry {
                    record,
                    meta: entry_meta,
                    inserted_at: Utc::now(),
                    last_accessed: Utc::now(),
                })
            }
            Err(err) => {
                if let Some(n) = leader_notify {
                    n.notify_waiters();
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use madspark_contracts::LlmResponseMeta;

    fn meta() -> LlmResponseMeta {
        LlmResponseMeta {
            provider: "local".into(),
            model: "test-model".into(),
            tokens_used: 42,
            latency_millis: 10,
            cost: 0.0,
            cached: false,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn miss_then_hit_after_insert() {
        let cache = InMemoryResponseCache::with_defaults();
        assert!(cache.get("k1").await.is_none());
        cache
            .insert("k1".into(), serde_json::json!({"a": 1}), meta())
            .await;
        let hit = cache.get("k1").await.expect("should hit");
        assert!(hit.meta.cached);
        assert_eq!(hit.record["a"], 1);
    }

    #[tokio::test]
    async fn expired_entry_is_treated_as_miss() {
        let cache = InMemoryResponseCache::new(Duration::from_millis(1), DEFAULT_CAPACITY);
        cache
            .insert("k1".into(), serde_json::json!({}), meta())
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache.get("k1").await.is_none());
        assert_eq!(cache.stats().await.expirations, 1);
    }

    #[tokio::test]
    async fn capacity_overflow_evicts_least_recently_used() {
        let cache = InMemoryResponseCache::new(DEFAULT_TTL, 2);
        cache.insert("k1".into(), serde_json::json!(1), meta()).await;
        cache.insert("k2".into(), serde_json::json!(2), meta()).await;
        // touch k1 so k2 becomes least-recently-used
        cache.get("k1").await;
        cache.insert("k3".into(), serde_json::json!(3), meta()).await;

        assert!(cache.get("k2").await.is_none());
        assert!(cache.get("k1").await.is_some());
        assert!(cache.get("k3").await.is_some());
    }

    #[tokio::test]
    async fn get_or_insert_with_computes_only_once_on_miss() {
        let cache = InMemoryResponseCache::with_defaults();
        let entry = cache
            .get_or_insert_with::<_, _, std::convert::Infallible>("k1", || async {
                Ok((serde_json::json!({"computed": true}), meta()))
            })
            .await
            .unwrap();
        assert!(!entry.meta.cached);

        let second = cache
            .get_or_insert_with::<_, _, std::convert::Infallible>("k1", || async {
                panic!("should not recompute on a cache hit");
            })
            .await
            .unwrap();
        assert!(second.meta.cached);
    }
}
