use chrono::{DateTime, Utc};
use knowgraph_core::{DependencyKind, ImpactLevel};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// A directed dependency between two knowledge artifacts. Multiple edges
/// between the same pair are allowed when the kinds differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source: PathBuf,
    pub target: PathBuf,
    pub kind: DependencyKind,
    /// 1-based line of the matched pattern, when known.
    pub line: Option<u32>,
    /// The matched text snippet.
    pub context: String,
    /// Tightness of the coupling, in [0, 1].
    pub strength: f64,
}

/// Result of scoring the blast radius of a single changed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactAnalysis {
    pub changed_file: PathBuf,
    pub impact_level: ImpactLevel,
    /// Always contains `changed_file` itself.
    pub affected_files: Vec<PathBuf>,
    /// Edges from and to the changed file.
    pub dependencies: Vec<DependencyEdge>,
    pub estimated_effort: ImpactLevel,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSummary {
    pub source: PathBuf,
    pub target: PathBuf,
    pub strength: f64,
}

/// Aggregate shape of the dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyStats {
    pub total_files: usize,
    pub total_edges: usize,
    /// The ten strongest edges by weight.
    pub strongest_edges: Vec<EdgeSummary>,
    /// The ten most-referenced files by reverse-edge count.
    pub most_referenced: Vec<(PathBuf, usize)>,
    /// Edge counts per dependency kind.
    pub kind_counts: HashMap<String, usize>,
}
