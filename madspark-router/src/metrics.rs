//! Router metrics (§4.4 point 4, §8 "Router metrics" invariant).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Default, Clone)]
pub struct RouterMetricsSnapshot {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub per_provider_calls: HashMap<String, u64>,
    pub fallback_triggers: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub total_latency_millis: u64,
}

/// Atomics for scalar counters; a mutex-guarded map for the
/// per-provider breakdown, matching §5 "updated under a lock or with
/// atomic operations".
#[derive(Default)]
pub struct RouterMetrics {
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    fallback_triggers: AtomicU64,
    total_tokens: AtomicU64,
    total_cost_millionths: AtomicU64,
    total_latency_millis: AtomicU64,
    per_provider_calls: Mutex<HashMap<String, u64>>,
}

impl RouterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback_trigger(&self) {
        self.fallback_triggers.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn record_provider_call(&self, provider: &str, tokens: u64, cost: f64, latency_millis: u64) {
        self.total_tokens.fetch_add(tokens, Ordering::Relaxed);
        self.total_cost_millionths.fetch_add((cost * 1_000_000.0).round() as u64, Ordering::Relaxed);
        self.total_latency_millis.fetch_add(latency_millis, Ordering::Relaxed);
        let mut calls = self.per_provider_calls.lock().await;
        *calls.entry(provider.to_string()).or_insert(0) += 1;
    }

    pub async fn snapshot(&self) -> RouterMetricsSnapshot {
        RouterMetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            per_provider_calls: self.per_provider_calls.lock().await.clone(),
            fallback_triggers: self.fallback_triggers.load(Ordering::Relaxed),
            total_tokens: self.total_tokens.load(Ordering::Relaxed),
            total_cost: self.total_cost_millionths.load(Ordering::Relaxed) as f64 / 1_000_000.0,
            total_latency_millis: self.total_latency_millis.load(Ordering::Relaxed),
        }
    }
}
