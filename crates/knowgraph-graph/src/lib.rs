//! Dependency-graph inference and change-impact analysis.
//!
//! The graph is inferred from textual patterns (markdown links, import
//! statements, extends/implements/depends-on wording) rather than language
//! parsers, which keeps it uniform across code and prose artifacts.

pub mod analyzer;
pub mod edge;
pub mod patterns;
pub mod scoring;

pub use analyzer::ImpactAnalyzer;
pub use edge::{DependencyEdge, DependencyStats, EdgeSummary, ImpactAnalysis};
pub use patterns::dependency_strength;
pub use scoring::{estimate_effort, recommendations, score_impact};
