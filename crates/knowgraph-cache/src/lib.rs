//! Bounded query→answer cache for the question-answering pipeline.
//!
//! Every query path calls `get` before invoking the external answer
//! generator and `put` after; the cache keeps those round trips cheap for
//! repeated and near-duplicate questions, within size and TTL budgets.

pub mod entry;
pub mod metrics;
pub mod patterns;
pub mod response_cache;

pub use entry::{cache_key, CacheEntry, CacheHitInfo};
pub use metrics::{CacheCounters, CacheMetrics};
pub use patterns::{LearnedPatterns, ResponsePattern};
pub use response_cache::{CacheStats, ResponseCache};
