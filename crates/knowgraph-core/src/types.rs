use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Classification of an observed filesystem delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,
    Modified,
    ContentChanged,
    Deleted,
    StructureChanged,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeType::Added => "file_added",
            ChangeType::Modified => "file_modified",
            ChangeType::ContentChanged => "content_changed",
            ChangeType::Deleted => "file_deleted",
            ChangeType::StructureChanged => "structure_changed",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file_added" => Ok(ChangeType::Added),
            "file_modified" => Ok(ChangeType::Modified),
            "content_changed" => Ok(ChangeType::ContentChanged),
            "file_deleted" => Ok(ChangeType::Deleted),
            "structure_changed" => Ok(ChangeType::StructureChanged),
            other => Err(format!("unknown change type: {}", other)),
        }
    }
}

/// Ordinal severity of a knowledge-base change's downstream effects.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImpactLevel::Low => "low",
            ImpactLevel::Medium => "medium",
            ImpactLevel::High => "high",
            ImpactLevel::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ImpactLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(ImpactLevel::Low),
            "medium" => Ok(ImpactLevel::Medium),
            "high" => Ok(ImpactLevel::High),
            "critical" => Ok(ImpactLevel::Critical),
            other => Err(format!("unknown impact level: {}", other)),
        }
    }
}

/// How one knowledge artifact depends on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    Reference,
    Imports,
    Extends,
    Implements,
    DependsOn,
}

impl DependencyKind {
    /// Base edge strength before context adjustment, in [0, 1].
    pub fn base_strength(&self) -> f64 {
        match self {
            DependencyKind::Reference => 0.3,
            DependencyKind::Imports => 0.8,
            DependencyKind::Extends => 0.9,
            DependencyKind::Implements => 0.9,
            DependencyKind::DependsOn => 0.7,
        }
    }

    pub const ALL: [DependencyKind; 5] = [
        DependencyKind::Reference,
        DependencyKind::Imports,
        DependencyKind::Extends,
        DependencyKind::Implements,
        DependencyKind::DependsOn,
    ];
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DependencyKind::Reference => "reference",
            DependencyKind::Imports => "imports",
            DependencyKind::Extends => "extends",
            DependencyKind::Implements => "implements",
            DependencyKind::DependsOn => "depends_on",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for DependencyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reference" => Ok(DependencyKind::Reference),
            "imports" => Ok(DependencyKind::Imports),
            "extends" => Ok(DependencyKind::Extends),
            "implements" => Ok(DependencyKind::Implements),
            "depends_on" => Ok(DependencyKind::DependsOn),
            other => Err(format!("unknown dependency kind: {}", other)),
        }
    }
}

/// Lookup strategy selectable per cache call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrategy {
    ExactMatch,
    SemanticMatch,
    #[default]
    Adaptive,
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CacheStrategy::ExactMatch => "exact_match",
            CacheStrategy::SemanticMatch => "semantic_match",
            CacheStrategy::Adaptive => "adaptive",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    Performance,
    Documentation,
    Architecture,
    CacheOptimization,
    KnowledgeGap,
    UsagePattern,
}

impl fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SuggestionType::Performance => "performance",
            SuggestionType::Documentation => "documentation",
            SuggestionType::Architecture => "architecture",
            SuggestionType::CacheOptimization => "cache_optimization",
            SuggestionType::KnowledgeGap => "knowledge_gap",
            SuggestionType::UsagePattern => "usage_pattern",
        };
        write!(f, "{}", s)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for SuggestionPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SuggestionPriority::Low => "low",
            SuggestionPriority::Medium => "medium",
            SuggestionPriority::High => "high",
            SuggestionPriority::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

/// Coarse artifact category inferred from a file name, used for impact
/// weighting and scoped cache invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Architecture,
    Domain,
    Code,
    Documentation,
    Other,
}

impl FileCategory {
    pub fn classify(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if name.contains("adr") || name.contains("architecture") {
            FileCategory::Architecture
        } else if name.contains("ddd") || name.contains("domain") {
            FileCategory::Domain
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("rs" | "py" | "kt" | "ts" | "js" | "go" | "java")
        ) {
            FileCategory::Code
        } else if matches!(path.extension().and_then(|e| e.to_str()), Some("md" | "txt")) {
            FileCategory::Documentation
        } else {
            FileCategory::Other
        }
    }

    /// Query-type bucket this category maps to for scoped invalidation.
    pub fn query_type(&self) -> Option<&'static str> {
        match self {
            FileCategory::Architecture => Some("architecture"),
            FileCategory::Domain => Some("domain_concept"),
            _ => None,
        }
    }
}
