//! Monotonic cache counters. Atomics only, so the hot lookup path never
//! takes a lock to account for itself.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time snapshot of the counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheMetrics {
    pub total_queries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub semantic_hits: u64,
    /// Hits over total queries, in [0, 1].
    pub hit_rate: f64,
    pub tokens_saved: u64,
    pub cost_saved: f64,
    pub evictions: u64,
    pub expired_removed: u64,
}

/// Cost is accumulated in millionths so it fits an atomic counter.
const COST_SCALE: f64 = 1_000_000.0;

#[derive(Debug, Default)]
pub struct CacheCounters {
    total_queries: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    semantic_hits: AtomicU64,
    tokens_saved: AtomicU64,
    cost_saved_micros: AtomicU64,
    evictions: AtomicU64,
    expired_removed: AtomicU64,
}

impl CacheCounters {
    pub fn record_query(&self) {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hit(&self, semantic: bool, tokens_saved: u64, cost_saved: f64) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        if semantic {
            self.semantic_hits.fetch_add(1, Ordering::Relaxed);
        }
        self.tokens_saved.fetch_add(tokens_saved, Ordering::Relaxed);
        self.cost_saved_micros
            .fetch_add((cost_saved * COST_SCALE) as u64, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_expired(&self, count: u64) {
        self.expired_removed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheMetrics {
        let total_queries = self.total_queries.load(Ordering::Relaxed);
        let cache_hits = self.hits.load(Ordering::Relaxed);
        let hit_rate = if total_queries > 0 {
            cache_hits as f64 / total_queries as f64
        } else {
            0.0
        };
        CacheMetrics {
            total_queries,
            cache_hits,
            cache_misses: self.misses.load(Ordering::Relaxed),
            semantic_hits: self.semantic_hits.load(Ordering::Relaxed),
            hit_rate,
            tokens_saved: self.tokens_saved.load(Ordering::Relaxed),
            cost_saved: self.cost_saved_micros.load(Ordering::Relaxed) as f64 / COST_SCALE,
            evictions: self.evictions.load(Ordering::Relaxed),
            expired_removed: self.expired_removed.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.total_queries.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.semantic_hits.store(0, Ordering::Relaxed);
        self.tokens_saved.store(0, Ordering::Relaxed);
        self.cost_saved_micros.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.expired_removed.store(0, Ordering::Relaxed);
    }
}
