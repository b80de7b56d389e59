use crate::suggestion::{
    CacheStatsRecord, ProactiveSuggestion, QueryRecord, UsageAnalytics, UsagePattern,
};
use chrono::{DateTime, Duration, Utc};
use knowgraph_cache::CacheMetrics;
use knowgraph_core::{
    significant_keywords, ImpactLevel, SuggestionPriority, SuggestionThresholds, SuggestionType,
};
use knowgraph_monitor::ChangeEvent;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::info;

const QUERY_HISTORY_CAP: usize = 1000;
const CACHE_STATS_CAP: usize = 100;
const CHANGE_HISTORY_CAP: usize = 100;
const SUGGESTIONS_PER_CYCLE: usize = 10;
const SUGGESTION_HISTORY_READ_CAP: usize = 50;

/// Wording that marks a query as asking for guidance rather than facts.
const HOW_TO_MARKERS: &[&str] = &["how to", "how do", "documentation", "docs", "guide"];
/// Wording that marks a query as architectural.
const ARCHITECTURE_MARKERS: &[&str] = &["architecture", "adr", "ddd", "hexagonal"];

#[derive(Default)]
struct EngineState {
    query_history: VecDeque<QueryRecord>,
    cache_stats_history: VecDeque<CacheStatsRecord>,
    change_history: VecDeque<ChangeEvent>,
    /// Keyed by (query type, keyword).
    usage_patterns: HashMap<(String, String), UsagePattern>,
    suggestion_history: Vec<ProactiveSuggestion>,
}

/// Mines recorded telemetry into ranked, prioritized suggestions.
///
/// Six independent heuristics each contribute zero or more candidates per
/// generation cycle; candidates are deduplicated, ranked by priority then
/// confidence, and capped.
pub struct SuggestionEngine {
    thresholds: SuggestionThresholds,
    state: Mutex<EngineState>,
}

impl Default for SuggestionEngine {
    fn default() -> Self {
        Self::new(SuggestionThresholds::default())
    }
}

impl SuggestionEngine {
    pub fn new(thresholds: SuggestionThresholds) -> Self {
        Self {
            thresholds,
            state: Mutex::new(EngineState::default()),
        }
    }

    /// Records one query round trip and updates the usage-pattern
    /// counters for its significant keywords.
    pub fn record_query(
        &self,
        query: &str,
        response_time_ms: f64,
        cache_hit: bool,
        query_type: &str,
        tokens_used: u64,
    ) {
        let mut state = self.state.lock();
        state.query_history.push_back(QueryRecord {
            query: query.to_string(),
            response_time_ms,
            cache_hit,
            query_type: query_type.to_string(),
            tokens_used,
            timestamp: Utc::now(),
        });
        while state.query_history.len() > QUERY_HISTORY_CAP {
            state.query_history.pop_front();
        }

        for keyword in significant_keywords(query) {
            let key = (query_type.to_string(), keyword.clone());
            state
                .usage_patterns
                .entry(key)
                .and_modify(UsagePattern::record_occurrence)
                .or_insert_with(|| UsagePattern::new(query_type, &keyword));
        }
    }

    pub fn record_cache_stats(&self, metrics: CacheMetrics) {
        let mut state = self.state.lock();
        state.cache_stats_history.push_back(CacheStatsRecord {
            metrics,
            timestamp: Utc::now(),
        });
        while state.cache_stats_history.len() > CACHE_STATS_CAP {
            state.cache_stats_history.pop_front();
        }
    }

    pub fn record_change_event(&self, event: ChangeEvent) {
        let mut state = self.state.lock();
        state.change_history.push_back(event);
        while state.change_history.len() > CHANGE_HISTORY_CAP {
            state.change_history.pop_front();
        }
    }

    /// Runs all detectors over the recorded telemetry and returns the
    /// top suggestions of this cycle.
    pub fn generate_suggestions(&self) -> Vec<ProactiveSuggestion> {
        let mut state = self.state.lock();
        let now = Utc::now();
        let window_start = now - Duration::hours(24);

        let mut candidates = Vec::new();
        candidates.extend(detect_performance(&state, &self.thresholds, window_start));
        candidates.extend(detect_documentation_gap(&state, &self.thresholds));
        candidates.extend(detect_architecture_focus(&state, &self.thresholds));
        candidates.extend(detect_cache_health(&state, &self.thresholds, window_start));
        candidates.extend(detect_knowledge_gaps(&state, window_start));
        candidates.extend(detect_frequent_patterns(&state, &self.thresholds));

        let suggestions = filter_and_rank(candidates);
        state.suggestion_history.extend(suggestions.iter().cloned());
        info!("generated {} proactive suggestions", suggestions.len());
        suggestions
    }

    /// The most recent suggestions, newest last, at most 50.
    pub fn get_suggestions_history(&self) -> Vec<ProactiveSuggestion> {
        let state = self.state.lock();
        let skip = state
            .suggestion_history
            .len()
            .saturating_sub(SUGGESTION_HISTORY_READ_CAP);
        state.suggestion_history.iter().skip(skip).cloned().collect()
    }

    pub fn get_usage_analytics(&self) -> UsageAnalytics {
        let state = self.state.lock();
        let window_start = Utc::now() - Duration::hours(24);

        let recent: Vec<&QueryRecord> = state
            .query_history
            .iter()
            .filter(|q| q.timestamp > window_start)
            .collect();
        let avg_response_time_ms = if recent.is_empty() {
            0.0
        } else {
            recent.iter().map(|q| q.response_time_ms).sum::<f64>() / recent.len() as f64
        };
        let cache_hit_rate = if recent.is_empty() {
            0.0
        } else {
            recent.iter().filter(|q| q.cache_hit).count() as f64 / recent.len() as f64
        };

        let mut top_patterns: Vec<UsagePattern> = state.usage_patterns.values().cloned().collect();
        top_patterns.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        top_patterns.truncate(5);

        UsageAnalytics {
            total_queries: state.query_history.len(),
            recent_queries: recent.len(),
            avg_response_time_ms,
            cache_hit_rate,
            recent_changes: state
                .change_history
                .iter()
                .filter(|e| e.timestamp > window_start)
                .count(),
            top_patterns,
            suggestions_generated: state.suggestion_history.len(),
        }
    }
}

fn detect_performance(
    state: &EngineState,
    thresholds: &SuggestionThresholds,
    window_start: DateTime<Utc>,
) -> Option<ProactiveSuggestion> {
    let recent: Vec<&QueryRecord> = state
        .query_history
        .iter()
        .filter(|q| q.timestamp > window_start)
        .collect();
    if recent.is_empty() {
        return None;
    }

    let avg = recent.iter().map(|q| q.response_time_ms).sum::<f64>() / recent.len() as f64;
    if avg <= thresholds.performance_threshold_ms {
        return None;
    }
    let slow = recent
        .iter()
        .filter(|q| q.response_time_ms > thresholds.performance_threshold_ms)
        .count();

    Some(ProactiveSuggestion {
        suggestion_type: SuggestionType::Performance,
        priority: SuggestionPriority::High,
        title: "slow query performance".into(),
        description: format!("average response time: {avg:.0}ms"),
        reasoning: format!("{slow} slow queries observed in the last 24h"),
        actionable_items: vec![
            "optimize prompts for frequent queries".into(),
            "cache more aggressively".into(),
            "profile the slowest query types".into(),
        ],
        estimated_impact: ImpactLevel::High,
        confidence: 0.8,
        timestamp: Utc::now(),
    })
}

fn detect_documentation_gap(
    state: &EngineState,
    thresholds: &SuggestionThresholds,
) -> Option<ProactiveSuggestion> {
    if state.query_history.is_empty() {
        return None;
    }

    let how_to = state
        .query_history
        .iter()
        .filter(|q| {
            let query = q.query.to_lowercase();
            HOW_TO_MARKERS.iter().any(|marker| query.contains(marker))
        })
        .count();
    let fraction = how_to as f64 / state.query_history.len() as f64;
    if fraction <= thresholds.documentation_gap_threshold {
        return None;
    }

    Some(ProactiveSuggestion {
        suggestion_type: SuggestionType::Documentation,
        priority: SuggestionPriority::Medium,
        title: "documentation gap detected".into(),
        description: format!("{how_to} guidance queries recorded"),
        reasoning: "a large share of queries ask how to do basic things".into(),
        actionable_items: vec![
            "write step-by-step usage guides".into(),
            "expand the decision-record documentation".into(),
            "add worked examples".into(),
        ],
        estimated_impact: ImpactLevel::Medium,
        confidence: 0.7,
        timestamp: Utc::now(),
    })
}

fn detect_architecture_focus(
    state: &EngineState,
    thresholds: &SuggestionThresholds,
) -> Option<ProactiveSuggestion> {
    let mut topic_counts: HashMap<String, u64> = HashMap::new();
    for record in &state.query_history {
        let query = record.query.to_lowercase();
        if !ARCHITECTURE_MARKERS.iter().any(|m| query.contains(m)) {
            continue;
        }
        for keyword in significant_keywords(&record.query) {
            *topic_counts.entry(keyword).or_default() += 1;
        }
    }

    let (topic, count) = topic_counts.into_iter().max_by_key(|(_, n)| *n)?;
    if count <= thresholds.frequent_query_threshold {
        return None;
    }

    Some(ProactiveSuggestion {
        suggestion_type: SuggestionType::Architecture,
        priority: SuggestionPriority::High,
        title: format!("architecture focus: {topic}"),
        description: format!("{count} queries about {topic}"),
        reasoning: "many queries target the same architectural aspect".into(),
        actionable_items: vec![
            format!("write a dedicated decision record about {topic}"),
            "improve the architecture documentation".into(),
            "review recurring decision patterns".into(),
        ],
        estimated_impact: ImpactLevel::High,
        confidence: 0.9,
        timestamp: Utc::now(),
    })
}

fn detect_cache_health(
    state: &EngineState,
    thresholds: &SuggestionThresholds,
    window_start: DateTime<Utc>,
) -> Option<ProactiveSuggestion> {
    let recent: Vec<&CacheStatsRecord> = state
        .cache_stats_history
        .iter()
        .filter(|s| s.timestamp > window_start)
        .collect();
    if recent.is_empty() {
        return None;
    }
    let avg_hit_rate =
        recent.iter().map(|s| s.metrics.hit_rate).sum::<f64>() / recent.len() as f64;

    if avg_hit_rate < thresholds.cache_hit_rate_low {
        Some(ProactiveSuggestion {
            suggestion_type: SuggestionType::CacheOptimization,
            priority: SuggestionPriority::Critical,
            title: "cache hit rate very low".into(),
            description: format!("average hit rate: {:.0}%", avg_hit_rate * 100.0),
            reasoning: "the cache is not effective".into(),
            actionable_items: vec![
                "tune the lookup strategies".into(),
                "analyze recurring query shapes".into(),
                "raise the similarity threshold tolerance".into(),
            ],
            estimated_impact: ImpactLevel::Critical,
            confidence: 0.9,
            timestamp: Utc::now(),
        })
    } else if avg_hit_rate < thresholds.cache_hit_rate_medium {
        Some(ProactiveSuggestion {
            suggestion_type: SuggestionType::CacheOptimization,
            priority: SuggestionPriority::Medium,
            title: "cache improvement opportunity".into(),
            description: format!("average hit rate: {:.0}%", avg_hit_rate * 100.0),
            reasoning: "the cache can be tuned further".into(),
            actionable_items: vec![
                "analyze frequent queries".into(),
                "identify cache-miss patterns".into(),
            ],
            estimated_impact: ImpactLevel::Medium,
            confidence: 0.7,
            timestamp: Utc::now(),
        })
    } else {
        None
    }
}

fn detect_knowledge_gaps(
    state: &EngineState,
    window_start: DateTime<Utc>,
) -> Option<ProactiveSuggestion> {
    let recent: Vec<&QueryRecord> = state
        .query_history
        .iter()
        .filter(|q| q.timestamp > window_start)
        .collect();
    if recent.len() <= 10 {
        return None;
    }

    let mut topic_counts: HashMap<String, u64> = HashMap::new();
    for record in &recent {
        for keyword in significant_keywords(&record.query) {
            *topic_counts.entry(keyword).or_default() += 1;
        }
    }
    let mut topics: Vec<(String, u64)> = topic_counts.into_iter().collect();
    topics.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let gaps: Vec<String> = topics
        .into_iter()
        .take(5)
        .filter(|(_, n)| *n > 2)
        .map(|(topic, _)| topic)
        .collect();
    if gaps.is_empty() {
        return None;
    }

    Some(ProactiveSuggestion {
        suggestion_type: SuggestionType::KnowledgeGap,
        priority: SuggestionPriority::Medium,
        title: "possible knowledge gap".into(),
        description: format!("frequent topics: {}", gaps[..gaps.len().min(3)].join(", ")),
        reasoning: "the same specific topics keep coming up".into(),
        actionable_items: vec![
            "expand documentation on the identified topics".into(),
            "write focused guides".into(),
        ],
        estimated_impact: ImpactLevel::Medium,
        confidence: 0.6,
        timestamp: Utc::now(),
    })
}

fn detect_frequent_patterns(
    state: &EngineState,
    thresholds: &SuggestionThresholds,
) -> Option<ProactiveSuggestion> {
    let top = state
        .usage_patterns
        .values()
        .filter(|p| p.frequency > thresholds.frequent_query_threshold)
        .max_by_key(|p| p.frequency)?;

    Some(ProactiveSuggestion {
        suggestion_type: SuggestionType::UsagePattern,
        priority: SuggestionPriority::Medium,
        title: format!("usage pattern detected: {}", top.keyword),
        description: format!("{} queries about {}", top.frequency, top.keyword),
        reasoning: "a consistent usage pattern was identified".into(),
        actionable_items: vec![
            format!("create a shortcut for queries about {}", top.keyword),
            "pre-warm answers for this pattern".into(),
        ],
        estimated_impact: ImpactLevel::Medium,
        confidence: 0.8,
        timestamp: Utc::now(),
    })
}

/// Deduplicates by (type, title), ranks by priority then confidence, and
/// caps the result.
fn filter_and_rank(candidates: Vec<ProactiveSuggestion>) -> Vec<ProactiveSuggestion> {
    let mut seen: HashSet<(SuggestionType, String)> = HashSet::new();
    let mut unique: Vec<ProactiveSuggestion> = candidates
        .into_iter()
        .filter(|s| seen.insert((s.suggestion_type, s.title.clone())))
        .collect();

    unique.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.confidence.total_cmp(&a.confidence))
    });
    unique.truncate(SUGGESTIONS_PER_CYCLE);
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use knowgraph_core::ChangeType;
    use std::path::PathBuf;

    fn default_metrics(hit_rate: f64) -> CacheMetrics {
        CacheMetrics {
            hit_rate,
            ..Default::default()
        }
    }

    #[test]
    fn query_history_is_bounded() {
        let engine = SuggestionEngine::default();
        for i in 0..1010 {
            engine.record_query(&format!("query number {i}"), 100.0, false, "test", 10);
        }
        assert_eq!(engine.get_usage_analytics().total_queries, 1000);
    }

    #[test]
    fn slow_queries_raise_a_performance_suggestion() {
        let engine = SuggestionEngine::default();
        for i in 0..5 {
            engine.record_query(&format!("heavy question {i}"), 3500.0, false, "test", 100);
        }

        let suggestions = engine.generate_suggestions();
        let perf = suggestions
            .iter()
            .find(|s| s.suggestion_type == SuggestionType::Performance)
            .expect("no performance suggestion");
        assert_eq!(perf.priority, SuggestionPriority::High);
        assert!(perf.reasoning.contains("5 slow queries"));
    }

    #[test]
    fn fast_queries_raise_nothing() {
        let engine = SuggestionEngine::default();
        for i in 0..5 {
            engine.record_query(&format!("light question {i}"), 50.0, true, "test", 10);
        }
        assert!(engine
            .generate_suggestions()
            .iter()
            .all(|s| s.suggestion_type != SuggestionType::Performance));
    }

    #[test]
    fn low_hit_rate_is_critical_and_mediocre_is_medium() {
        let engine = SuggestionEngine::default();
        engine.record_cache_stats(default_metrics(0.1));
        let suggestions = engine.generate_suggestions();
        let cache = suggestions
            .iter()
            .find(|s| s.suggestion_type == SuggestionType::CacheOptimization)
            .unwrap();
        assert_eq!(cache.priority, SuggestionPriority::Critical);

        let engine = SuggestionEngine::default();
        engine.record_cache_stats(default_metrics(0.4));
        let suggestions = engine.generate_suggestions();
        let cache = suggestions
            .iter()
            .find(|s| s.suggestion_type == SuggestionType::CacheOptimization)
            .unwrap();
        assert_eq!(cache.priority, SuggestionPriority::Medium);

        let engine = SuggestionEngine::default();
        engine.record_cache_stats(default_metrics(0.9));
        assert!(engine
            .generate_suggestions()
            .iter()
            .all(|s| s.suggestion_type != SuggestionType::CacheOptimization));
    }

    #[test]
    fn repeated_architecture_topic_is_flagged() {
        let engine = SuggestionEngine::default();
        for i in 0..7 {
            engine.record_query(
                &format!("architecture question about hexagonal layering {i}"),
                100.0,
                false,
                "architecture",
                50,
            );
        }

        let suggestions = engine.generate_suggestions();
        let arch = suggestions
            .iter()
            .find(|s| s.suggestion_type == SuggestionType::Architecture)
            .expect("no architecture suggestion");
        assert_eq!(arch.priority, SuggestionPriority::High);
        assert!(arch.title.starts_with("architecture focus:"));
    }

    #[test]
    fn frequent_usage_patterns_are_surfaced() {
        let engine = SuggestionEngine::default();
        for _ in 0..6 {
            engine.record_query("billing", 100.0, false, "domain_concept", 20);
        }

        let suggestions = engine.generate_suggestions();
        assert!(suggestions
            .iter()
            .any(|s| s.suggestion_type == SuggestionType::UsagePattern
                && s.title.contains("billing")));
    }

    #[test]
    fn suggestions_are_ranked_by_priority_then_confidence() {
        let engine = SuggestionEngine::default();
        // Critical cache health plus a medium usage pattern.
        engine.record_cache_stats(default_metrics(0.05));
        for _ in 0..6 {
            engine.record_query("billing invoices overview", 100.0, false, "domain_concept", 20);
        }

        let suggestions = engine.generate_suggestions();
        assert!(suggestions.len() >= 2);
        assert!(suggestions.len() <= 10);
        assert_eq!(suggestions[0].priority, SuggestionPriority::Critical);
        for pair in suggestions.windows(2) {
            assert!(pair[0].priority >= pair[1].priority);
        }
    }

    #[test]
    fn repeated_generation_deduplicates_within_a_cycle() {
        let engine = SuggestionEngine::default();
        engine.record_cache_stats(default_metrics(0.1));
        engine.record_cache_stats(default_metrics(0.1));

        let suggestions = engine.generate_suggestions();
        let cache_count = suggestions
            .iter()
            .filter(|s| s.suggestion_type == SuggestionType::CacheOptimization)
            .count();
        assert_eq!(cache_count, 1);
    }

    #[test]
    fn analytics_summarize_recorded_telemetry() {
        let engine = SuggestionEngine::default();
        engine.record_query("hexagonal architecture question", 100.0, true, "architecture", 50);
        engine.record_query("billing domain question", 300.0, false, "domain_concept", 30);
        engine.record_change_event(ChangeEvent::new(
            ChangeType::ContentChanged,
            PathBuf::from("docs/adr-0001.md"),
            Some("old".into()),
            Some("new".into()),
            ImpactLevel::High,
        ));

        let analytics = engine.get_usage_analytics();
        assert_eq!(analytics.total_queries, 2);
        assert_eq!(analytics.recent_queries, 2);
        assert_eq!(analytics.recent_changes, 1);
        assert_relative_eq!(analytics.avg_response_time_ms, 200.0);
        assert_relative_eq!(analytics.cache_hit_rate, 0.5);
        assert!(!analytics.top_patterns.is_empty());
    }

    #[test]
    fn suggestion_history_accumulates_across_cycles() {
        let engine = SuggestionEngine::default();
        engine.record_cache_stats(default_metrics(0.1));
        engine.generate_suggestions();
        engine.generate_suggestions();
        assert!(engine.get_suggestions_history().len() >= 2);
    }
}
