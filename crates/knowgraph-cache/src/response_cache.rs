use crate::entry::{cache_key, CacheEntry, CacheHitInfo};
use crate::metrics::{CacheCounters, CacheMetrics};
use crate::patterns::LearnedPatterns;
use chrono::Utc;
use dashmap::DashMap;
use knowgraph_core::{overlap_coefficient, token_set, CacheStrategy, ResponseCacheConfig};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Live-entry distribution, bucketed by query type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub type_distribution: HashMap<String, usize>,
}

struct Hit {
    response: String,
    info: CacheHitInfo,
    cost_saved: f64,
}

/// Bounded query→answer cache with exact and semantic lookup.
///
/// Reads go through the sharded entry map and stay lock-free with respect
/// to each other; mutating operations (put, invalidate, clear, optimize)
/// share one write guard, and at most one eviction pass runs at a time.
pub struct ResponseCache {
    config: ResponseCacheConfig,
    store: DashMap<String, CacheEntry>,
    patterns: RwLock<LearnedPatterns>,
    counters: CacheCounters,
    write_guard: Mutex<()>,
    eviction_guard: Mutex<()>,
}

impl ResponseCache {
    pub fn new(config: ResponseCacheConfig) -> Self {
        Self {
            config,
            store: DashMap::new(),
            patterns: RwLock::new(LearnedPatterns::default()),
            counters: CacheCounters::default(),
            write_guard: Mutex::new(()),
            eviction_guard: Mutex::new(()),
        }
    }

    /// Looks up a previously stored answer. On hit the entry's access
    /// bookkeeping is refreshed; expired entries found along the way are
    /// treated as absent and removed.
    pub fn get(
        &self,
        query: &str,
        query_type: &str,
        prompt_template: &str,
        strategy: CacheStrategy,
    ) -> Option<(String, CacheHitInfo)> {
        self.counters.record_query();

        let hit = match strategy {
            CacheStrategy::ExactMatch => self.get_exact(query, query_type, prompt_template),
            CacheStrategy::SemanticMatch => self.get_semantic(query, query_type),
            CacheStrategy::Adaptive => self
                .get_exact(query, query_type, prompt_template)
                .or_else(|| self.get_semantic(query, query_type)),
        };

        match hit {
            Some(hit) => {
                self.counters.record_hit(
                    hit.info.cache_type == CacheStrategy::SemanticMatch,
                    hit.info.tokens_saved,
                    hit.cost_saved,
                );
                Some((hit.response, hit.info))
            }
            None => {
                self.counters.record_miss();
                None
            }
        }
    }

    fn get_exact(&self, query: &str, query_type: &str, prompt_template: &str) -> Option<Hit> {
        let key = cache_key(query, query_type, prompt_template);
        {
            let mut entry = self.store.get_mut(&key)?;
            if !entry.is_expired() {
                entry.touch();
                return Some(Hit {
                    response: entry.response.clone(),
                    info: CacheHitInfo {
                        cache_type: CacheStrategy::ExactMatch,
                        tokens_saved: entry.tokens_used,
                    },
                    cost_saved: entry.cost_estimate,
                });
            }
        }
        self.store.remove(&key);
        self.counters.record_expired(1);
        None
    }

    fn get_semantic(&self, query: &str, query_type: &str) -> Option<Hit> {
        let probe = token_set(query);
        if probe.is_empty() {
            return None;
        }

        let now = Utc::now();
        let mut expired: Vec<String> = Vec::new();
        let mut best: Option<(String, f64)> = None;
        for entry in self.store.iter() {
            if entry.query_type != query_type {
                continue;
            }
            if entry.is_expired_at(now) {
                expired.push(entry.key().clone());
                continue;
            }
            let stored = entry.keywords.iter().cloned().collect();
            let similarity = overlap_coefficient(&probe, &stored);
            if similarity >= self.config.similarity_threshold
                && best.as_ref().map_or(true, |(_, b)| similarity > *b)
            {
                best = Some((entry.key().clone(), similarity));
            }
        }

        if !expired.is_empty() {
            for key in &expired {
                self.store.remove(key);
            }
            self.counters.record_expired(expired.len() as u64);
        }

        let (key, similarity) = best?;
        let mut entry = self.store.get_mut(&key)?;
        entry.touch();
        debug!(
            "semantic hit for {query_type} query (similarity {similarity:.2}): {}",
            entry.query_text
        );
        Some(Hit {
            response: entry.response.clone(),
            info: CacheHitInfo {
                cache_type: CacheStrategy::SemanticMatch,
                tokens_saved: entry.tokens_used,
            },
            cost_saved: entry.cost_estimate,
        })
    }

    /// Stores an answer under the default TTL and feeds the learned
    /// pattern tables. Triggers an eviction pass when the store grows
    /// past its budget.
    pub fn put(
        &self,
        query: &str,
        response: &str,
        query_type: &str,
        prompt_template: &str,
        tokens_used: u64,
        cost_estimate: f64,
    ) {
        self.put_with_ttl(
            query,
            response,
            query_type,
            prompt_template,
            tokens_used,
            cost_estimate,
            None,
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn put_with_ttl(
        &self,
        query: &str,
        response: &str,
        query_type: &str,
        prompt_template: &str,
        tokens_used: u64,
        cost_estimate: f64,
        ttl: Option<Duration>,
    ) {
        {
            let _guard = self.write_guard.lock();
            if self.config.enable_pattern_learning {
                self.patterns.write().learn(query, query_type, response.len());
            }
            let entry = CacheEntry::new(
                query,
                response,
                query_type,
                prompt_template,
                tokens_used,
                cost_estimate,
                ttl.unwrap_or(self.config.default_ttl),
            );
            self.store.insert(entry.query_hash.clone(), entry);
        }

        if self.store.len() > self.config.max_size {
            self.optimize();
        }
    }

    /// Purges expired entries, then evicts the lowest-ranked survivors
    /// until the store is back within `max_size`. Only one pass runs at a
    /// time; a concurrent caller returns immediately.
    pub fn optimize(&self) {
        let Some(_pass) = self.eviction_guard.try_lock() else {
            return;
        };
        // Hold off concurrent puts for the whole pass so the counts taken
        // before and after each sweep describe the same store.
        let _guard = self.write_guard.lock();

        let now = Utc::now();
        let before = self.store.len();
        self.store.retain(|_, entry| !entry.is_expired_at(now));
        let purged = before.saturating_sub(self.store.len());
        if purged > 0 {
            self.counters.record_expired(purged as u64);
            debug!("purged {purged} expired cache entries");
        }

        let over = self.store.len().saturating_sub(self.config.max_size);
        if over == 0 {
            return;
        }

        let mut ranked: Vec<(String, f64)> = self
            .store
            .iter()
            .map(|entry| (entry.key().clone(), entry.eviction_score(now)))
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        for (key, _) in ranked.into_iter().take(over) {
            self.store.remove(&key);
        }
        self.counters.record_evictions(over as u64);
        info!("evicted {over} cache entries, {} live", self.store.len());

        if self.store.len() > self.config.max_size {
            warn!(
                "cache still over budget after optimization: {} > {}",
                self.store.len(),
                self.config.max_size
            );
        }
    }

    /// Removes entries of the given query type, or every entry when no
    /// type is given. Returns the number removed.
    pub fn invalidate(&self, query_type: Option<&str>) -> usize {
        let _guard = self.write_guard.lock();
        let before = self.store.len();
        match query_type {
            Some(query_type) => self.store.retain(|_, entry| entry.query_type != query_type),
            None => self.store.clear(),
        }
        let removed = before - self.store.len();
        info!(
            "invalidated {removed} cache entries (type: {})",
            query_type.unwrap_or("any")
        );
        removed
    }

    /// Empties the entry store and the learned pattern tables together.
    pub fn clear(&self) {
        let _guard = self.write_guard.lock();
        self.store.clear();
        self.patterns.write().clear();
        info!("cache cleared");
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn get_metrics(&self) -> CacheMetrics {
        self.counters.snapshot()
    }

    pub fn reset_metrics(&self) {
        self.counters.reset();
    }

    pub fn get_patterns(&self) -> LearnedPatterns {
        self.patterns.read().clone()
    }

    pub fn get_cache_stats(&self) -> CacheStats {
        let now = Utc::now();
        let mut stats = CacheStats {
            total_entries: self.store.len(),
            ..Default::default()
        };
        for entry in self.store.iter() {
            if entry.is_expired_at(now) {
                stats.expired_entries += 1;
            } else {
                *stats
                    .type_distribution
                    .entry(entry.query_type.clone())
                    .or_default() += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with(max_size: usize) -> ResponseCache {
        ResponseCache::new(ResponseCacheConfig {
            max_size,
            ..Default::default()
        })
    }

    #[test]
    fn put_then_exact_get_round_trips() {
        let cache = cache_with(10);
        cache.put(
            "how is the architecture structured",
            "it follows hexagonal ports and adapters",
            "architecture",
            "default",
            50,
            0.0001,
        );

        let (response, info) = cache
            .get(
                "how is the architecture structured",
                "architecture",
                "default",
                CacheStrategy::ExactMatch,
            )
            .unwrap();
        assert_eq!(response, "it follows hexagonal ports and adapters");
        assert_eq!(info.cache_type.to_string(), "exact_match");
        assert_eq!(info.tokens_saved, 50);
    }

    #[test]
    fn miss_is_none_and_counted() {
        let cache = cache_with(10);
        let result = cache.get("unknown query", "test", "default", CacheStrategy::Adaptive);
        assert!(result.is_none());
        let metrics = cache.get_metrics();
        assert_eq!(metrics.total_queries, 1);
        assert_eq!(metrics.cache_misses, 1);
        assert_eq!(metrics.cache_hits, 0);
    }

    #[test]
    fn expired_entries_are_never_returned() {
        let cache = cache_with(10);
        cache.put_with_ttl(
            "stale question",
            "stale answer",
            "test",
            "default",
            10,
            0.001,
            Some(Duration::ZERO),
        );

        for strategy in [
            CacheStrategy::ExactMatch,
            CacheStrategy::SemanticMatch,
            CacheStrategy::Adaptive,
        ] {
            assert!(
                cache
                    .get("stale question", "test", "default", strategy)
                    .is_none(),
                "{strategy} returned an expired entry"
            );
        }
        // The exact lookup removed it lazily.
        assert!(cache.is_empty());
    }

    #[test]
    fn semantic_match_finds_similar_query_of_same_type() {
        let cache = cache_with(10);
        cache.put(
            "hexagonal architecture ports adapters",
            "the layering is sound",
            "architecture",
            "default",
            80,
            0.0002,
        );

        let (response, info) = cache
            .get(
                "explain hexagonal architecture adapters",
                "architecture",
                "default",
                CacheStrategy::SemanticMatch,
            )
            .unwrap();
        assert_eq!(response, "the layering is sound");
        assert_eq!(info.cache_type.to_string(), "semantic_match");

        // Same words, different type bucket: no match.
        assert!(cache
            .get(
                "explain hexagonal architecture adapters",
                "code",
                "default",
                CacheStrategy::SemanticMatch,
            )
            .is_none());
    }

    #[test]
    fn adaptive_falls_back_to_semantic_on_exact_miss() {
        let cache = cache_with(10);
        cache.put(
            "event sourcing aggregate design",
            "aggregates emit events",
            "domain_concept",
            "default",
            60,
            0.0001,
        );

        let (_, info) = cache
            .get(
                "describe event sourcing aggregate patterns",
                "domain_concept",
                "default",
                CacheStrategy::Adaptive,
            )
            .unwrap();
        assert_eq!(info.cache_type, CacheStrategy::SemanticMatch);
        assert_eq!(cache.get_metrics().semantic_hits, 1);
    }

    #[test]
    fn eviction_keeps_the_store_within_budget() {
        let cache = cache_with(10);
        for i in 0..15 {
            cache.put(
                &format!("distinct question number {i}"),
                &format!("answer {i}"),
                "test",
                "default",
                10,
                0.001,
            );
        }
        assert!(cache.len() <= 10, "cache holds {} entries", cache.len());
        assert!(cache.get_metrics().evictions >= 5);
    }

    #[test]
    fn eviction_prefers_cold_entries() {
        let cache = cache_with(10);
        for i in 0..10 {
            cache.put(
                &format!("distinct question number {i}"),
                &format!("answer {i}"),
                "test",
                "default",
                10,
                0.001,
            );
        }
        // Heavily access entry 0 so its frequency dominates the rank.
        for _ in 0..5 {
            assert!(cache
                .get(
                    "distinct question number 0",
                    "test",
                    "default",
                    CacheStrategy::ExactMatch,
                )
                .is_some());
        }
        for i in 10..15 {
            cache.put(
                &format!("distinct question number {i}"),
                &format!("answer {i}"),
                "test",
                "default",
                10,
                0.001,
            );
        }

        assert!(cache.len() <= 10);
        assert!(
            cache
                .get(
                    "distinct question number 0",
                    "test",
                    "default",
                    CacheStrategy::ExactMatch,
                )
                .is_some(),
            "hot entry was evicted"
        );
    }

    #[test]
    fn concurrent_puts_and_optimization_stay_consistent() {
        use std::sync::Arc;

        let cache = Arc::new(cache_with(10));
        let workers: Vec<_> = (0..3)
            .map(|worker| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        cache.put(
                            &format!("worker {worker} question {i}"),
                            "answer",
                            "test",
                            "default",
                            10,
                            0.001,
                        );
                        cache.optimize();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert!(cache.len() <= 10, "cache holds {} entries", cache.len());
    }

    #[test]
    fn typed_invalidation_leaves_other_types_alone() {
        let cache = cache_with(10);
        cache.put("adr layering", "a1", "architecture", "default", 10, 0.001);
        cache.put("adr storage", "a2", "architecture", "default", 10, 0.001);
        cache.put("parser module", "c1", "code", "default", 10, 0.001);

        let removed = cache.invalidate(Some("architecture"));
        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 1);
        assert!(cache
            .get("parser module", "code", "default", CacheStrategy::ExactMatch)
            .is_some());
        assert!(cache
            .get("adr layering", "architecture", "default", CacheStrategy::ExactMatch)
            .is_none());
    }

    #[test]
    fn untyped_invalidation_removes_everything() {
        let cache = cache_with(10);
        cache.put("q1", "r1", "a", "default", 10, 0.001);
        cache.put("q2", "r2", "b", "default", 10, 0.001);
        assert_eq!(cache.invalidate(None), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_drops_entries_and_patterns_together() {
        let cache = cache_with(10);
        cache.put(
            "hexagonal architecture question",
            "answer",
            "architecture",
            "default",
            10,
            0.001,
        );
        assert!(!cache.get_patterns().query_patterns.is_empty());

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get_patterns().query_patterns.is_empty());
    }

    #[test]
    fn puts_feed_the_pattern_tables() {
        let cache = cache_with(10);
        cache.put(
            "hexagonal architecture basics",
            "answer one",
            "architecture",
            "default",
            10,
            0.001,
        );
        cache.put(
            "hexagonal architecture ports",
            "answer two",
            "architecture",
            "default",
            10,
            0.001,
        );

        let patterns = cache.get_patterns();
        assert_eq!(patterns.query_patterns["architecture"]["hexagonal"], 2);
        assert_eq!(patterns.response_patterns["architecture"].samples, 2);
    }

    #[test]
    fn cache_stats_bucket_live_entries_by_type() {
        let cache = cache_with(10);
        cache.put("q1", "r1", "architecture", "default", 10, 0.001);
        cache.put("q2", "r2", "code_review", "default", 10, 0.001);

        let stats = cache.get_cache_stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.type_distribution["architecture"], 1);
        assert_eq!(stats.type_distribution["code_review"], 1);
    }

    #[test]
    fn hits_accumulate_saved_tokens_and_cost() {
        let cache = cache_with(10);
        cache.put("the question", "the answer", "test", "default", 50, 0.0001);
        cache
            .get("the question", "test", "default", CacheStrategy::ExactMatch)
            .unwrap();
        cache
            .get("the question", "test", "default", CacheStrategy::ExactMatch)
            .unwrap();

        let metrics = cache.get_metrics();
        assert_eq!(metrics.cache_hits, 2);
        assert_eq!(metrics.tokens_saved, 100);
        assert!(metrics.cost_saved > 0.0);
        assert!((metrics.hit_rate - 1.0).abs() < f64::EPSILON);
    }
}
