use crate::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Glob patterns ignored by both the change detector and the dependency
/// scanner: VCS metadata, build caches, editor droppings, temp extensions.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git",
    ".svn",
    "__pycache__",
    "node_modules",
    "target",
    ".DS_Store",
    "*.tmp",
    "*.log",
    "*.pyc",
    "*.cache",
];

/// Configuration for the change detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Root directories to walk and watch.
    pub roots: Vec<PathBuf>,
    /// Glob patterns for files and directories to skip.
    pub ignore_patterns: Vec<String>,
    /// Interval between background detection cycles.
    #[serde(with = "duration_secs")]
    pub poll_interval: Duration,
    /// Where to persist the snapshot document. `None` disables persistence.
    pub snapshot_path: Option<PathBuf>,
    /// Bound on the retained change-event history.
    pub history_limit: usize,
}

impl MonitorConfig {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            ..Default::default()
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            ignore_patterns: DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            poll_interval: Duration::from_secs(30),
            snapshot_path: None,
            history_limit: 100,
        }
    }
}

/// Configuration for the dependency graph builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    pub roots: Vec<PathBuf>,
    pub ignore_patterns: Vec<String>,
    /// Bound on the retained impact-analysis history.
    pub history_limit: usize,
}

impl GraphConfig {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            ..Default::default()
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            ignore_patterns: DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            history_limit: 50,
        }
    }
}

/// Configuration for the response cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseCacheConfig {
    /// Maximum number of live entries before eviction kicks in.
    pub max_size: usize,
    /// Default time-to-live applied to new entries.
    #[serde(with = "duration_secs")]
    pub default_ttl: Duration,
    /// Minimum token-overlap coefficient for a semantic hit.
    pub similarity_threshold: f64,
    /// Whether puts feed the per-type keyword frequency tables.
    pub enable_pattern_learning: bool,
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            default_ttl: Duration::from_secs(24 * 60 * 60),
            similarity_threshold: 0.6,
            enable_pattern_learning: true,
        }
    }
}

/// Heuristic thresholds used by the suggestion engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionThresholds {
    /// Rolling hit rate below this is critical.
    pub cache_hit_rate_low: f64,
    /// Rolling hit rate below this merits a medium suggestion.
    pub cache_hit_rate_medium: f64,
    /// A keyword repeated this often counts as a frequent pattern.
    pub frequent_query_threshold: u64,
    /// Average response time above this is a performance problem.
    pub performance_threshold_ms: f64,
    /// Fraction of how-to queries above this signals a documentation gap.
    pub documentation_gap_threshold: f64,
}

impl Default for SuggestionThresholds {
    fn default() -> Self {
        Self {
            cache_hit_rate_low: 0.3,
            cache_hit_rate_medium: 0.5,
            frequent_query_threshold: 5,
            performance_threshold_ms: 2000.0,
            documentation_gap_threshold: 0.2,
        }
    }
}

/// Compiled ignore rules shared by directory walkers.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    set: GlobSet,
}

impl IgnoreRules {
    pub fn compile(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern)?);
            // Bare names like ".git" must also match anywhere in a tree.
            if !pattern.contains('/') && !pattern.contains("**") {
                builder.add(Glob::new(&format!("**/{}", pattern))?);
                builder.add(Glob::new(&format!("**/{}/**", pattern))?);
            }
        }
        Ok(Self {
            set: builder.build()?,
        })
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.set.is_match(path) {
            return true;
        }
        path.file_name()
            .map(|n| self.set.is_match(Path::new(n)))
            .unwrap_or(false)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
