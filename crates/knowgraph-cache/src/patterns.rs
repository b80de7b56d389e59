//! Learned query and response patterns, fed by `put` when pattern
//! learning is enabled.

use knowgraph_core::significant_keywords;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Running aggregate of response shapes for one query type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponsePattern {
    pub samples: u64,
    pub avg_length: f64,
}

/// Keyword-frequency tables per query type plus response-shape aggregates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnedPatterns {
    /// query type -> keyword -> occurrence count.
    pub query_patterns: HashMap<String, HashMap<String, u64>>,
    /// query type -> response length aggregate.
    pub response_patterns: HashMap<String, ResponsePattern>,
}

impl LearnedPatterns {
    pub fn learn(&mut self, query: &str, query_type: &str, response_len: usize) {
        let table = self
            .query_patterns
            .entry(query_type.to_string())
            .or_default();
        for keyword in significant_keywords(query) {
            *table.entry(keyword).or_default() += 1;
        }

        let pattern = self
            .response_patterns
            .entry(query_type.to_string())
            .or_default();
        pattern.samples += 1;
        pattern.avg_length += (response_len as f64 - pattern.avg_length) / pattern.samples as f64;
    }

    pub fn clear(&mut self) {
        self.query_patterns.clear();
        self.response_patterns.clear();
    }
}
