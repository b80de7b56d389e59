use chrono::{DateTime, Utc};
use knowgraph_core::{sha256_hex, tokenize, CacheStrategy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Primary cache key: digest over query text, query type and prompt
/// template. Two queries differing in any of the three never collide.
pub fn cache_key(query: &str, query_type: &str, prompt_template: &str) -> String {
    sha256_hex(format!("{query}|{query_type}|{prompt_template}").as_bytes())
}

/// A single cached answer. Mutated in place on hit (`access_count`,
/// `last_accessed`); removed on expiry or eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub query_hash: String,
    pub query_text: String,
    pub response: String,
    pub query_type: String,
    pub prompt_template: String,
    pub tokens_used: u64,
    pub cost_estimate: f64,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u64,
    pub relevance_score: f64,
    pub ttl_seconds: u64,
    /// Significant tokens of the query text, for semantic lookup.
    pub keywords: Vec<String>,
}

impl CacheEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        query: &str,
        response: &str,
        query_type: &str,
        prompt_template: &str,
        tokens_used: u64,
        cost_estimate: f64,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            query_hash: cache_key(query, query_type, prompt_template),
            query_text: query.to_string(),
            response: response.to_string(),
            query_type: query_type.to_string(),
            prompt_template: prompt_template.to_string(),
            tokens_used,
            cost_estimate,
            created_at: now,
            last_accessed: now,
            access_count: 1,
            relevance_score: 1.0,
            ttl_seconds: ttl.as_secs(),
            keywords: tokenize(query),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.created_at + chrono::Duration::seconds(self.ttl_seconds as i64)
    }

    /// Register a hit.
    pub fn touch(&mut self) {
        self.access_count += 1;
        self.last_accessed = Utc::now();
    }

    /// Retention rank for eviction: a composite of access frequency,
    /// relevance and recency of last access. Lower scores are evicted
    /// first.
    pub fn eviction_score(&self, now: DateTime<Utc>) -> f64 {
        let idle_secs = (now - self.last_accessed).num_seconds().max(0) as f64;
        let recency = 1.0 / (1.0 + idle_secs / 3600.0);
        self.access_count as f64 * 0.4 + self.relevance_score * 0.3 + recency * 0.3
    }
}

/// Metadata returned alongside a cached response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheHitInfo {
    /// Which strategy produced the hit.
    pub cache_type: CacheStrategy,
    /// Tokens the caller did not have to spend on regeneration.
    pub tokens_saved: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_separates_query_type_and_template() {
        let base = cache_key("q", "architecture", "t");
        assert_ne!(base, cache_key("q2", "architecture", "t"));
        assert_ne!(base, cache_key("q", "code", "t"));
        assert_ne!(base, cache_key("q", "architecture", "t2"));
        assert_eq!(base, cache_key("q", "architecture", "t"));
    }

    #[test]
    fn zero_ttl_entries_are_born_expired() {
        let entry = CacheEntry::new("q", "r", "test", "t", 10, 0.001, Duration::ZERO);
        assert!(entry.is_expired());
        let entry = CacheEntry::new("q", "r", "test", "t", 10, 0.001, Duration::from_secs(3600));
        assert!(!entry.is_expired());
    }

    #[test]
    fn frequently_accessed_entries_rank_higher() {
        let mut hot = CacheEntry::new("hot", "r", "test", "t", 10, 0.001, Duration::from_secs(60));
        let cold = CacheEntry::new("cold", "r", "test", "t", 10, 0.001, Duration::from_secs(60));
        for _ in 0..5 {
            hot.touch();
        }
        let now = Utc::now();
        assert!(hot.eviction_score(now) > cold.eviction_score(now));
    }

    #[test]
    fn entry_round_trips_through_json() {
        let entry = CacheEntry::new("the query", "the answer", "test", "t", 42, 0.01, Duration::from_secs(60));
        let json = serde_json::to_string(&entry).unwrap();
        let back: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.query_hash, entry.query_hash);
        assert_eq!(back.response, entry.response);
        assert_eq!(back.keywords, entry.keywords);
    }
}
