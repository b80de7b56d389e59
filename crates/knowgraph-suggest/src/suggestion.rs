use chrono::{DateTime, Utc};
use knowgraph_cache::CacheMetrics;
use knowgraph_core::{ImpactLevel, SuggestionPriority, SuggestionType};
use serde::{Deserialize, Serialize};

/// One recorded query round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRecord {
    pub query: String,
    pub response_time_ms: f64,
    pub cache_hit: bool,
    pub query_type: String,
    pub tokens_used: u64,
    pub timestamp: DateTime<Utc>,
}

/// Timestamped cache-metrics sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatsRecord {
    pub metrics: CacheMetrics,
    pub timestamp: DateTime<Utc>,
}

/// A recurring (query type, keyword) pair. Monotonically updated, never
/// deleted within the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsagePattern {
    pub pattern_type: String,
    pub keyword: String,
    pub frequency: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl UsagePattern {
    pub fn new(pattern_type: &str, keyword: &str) -> Self {
        let now = Utc::now();
        Self {
            pattern_type: pattern_type.to_string(),
            keyword: keyword.to_string(),
            frequency: 1,
            first_seen: now,
            last_seen: now,
        }
    }

    pub fn record_occurrence(&mut self) {
        self.frequency += 1;
        self.last_seen = Utc::now();
    }
}

/// A ranked, human-actionable recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProactiveSuggestion {
    pub suggestion_type: SuggestionType,
    pub priority: SuggestionPriority,
    pub title: String,
    pub description: String,
    pub reasoning: String,
    pub actionable_items: Vec<String>,
    pub estimated_impact: ImpactLevel,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate view of recorded telemetry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageAnalytics {
    pub total_queries: usize,
    /// Queries within the last 24 hours.
    pub recent_queries: usize,
    pub avg_response_time_ms: f64,
    /// Observed hit fraction over the recent window, in [0, 1].
    pub cache_hit_rate: f64,
    /// Change events within the last 24 hours.
    pub recent_changes: usize,
    /// The five most frequent usage patterns.
    pub top_patterns: Vec<UsagePattern>,
    pub suggestions_generated: usize,
}
