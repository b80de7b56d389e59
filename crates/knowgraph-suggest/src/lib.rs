//! Proactive suggestion engine: records query, cache and change telemetry
//! and mines it into ranked operational recommendations.

pub mod engine;
pub mod suggestion;

pub use engine::SuggestionEngine;
pub use suggestion::{
    CacheStatsRecord, ProactiveSuggestion, QueryRecord, UsageAnalytics, UsagePattern,
};
