//! Pure impact-scoring functions. Everything here is deterministic and
//! decoupled from I/O and graph traversal so it can be unit tested with
//! plain numbers.

use knowgraph_core::{FileCategory, ImpactLevel};

/// Bucketed contribution of the affected-file count.
pub fn affected_count_score(affected: usize) -> u32 {
    match affected {
        0..=2 => 1,
        3..=5 => 2,
        6..=10 => 3,
        _ => 4,
    }
}

/// Bonus for the changed file's category. Architecture decisions ripple
/// furthest, domain models next, code least.
pub fn category_bonus(category: FileCategory) -> u32 {
    match category {
        FileCategory::Architecture => 3,
        FileCategory::Domain => 2,
        FileCategory::Code => 1,
        FileCategory::Documentation | FileCategory::Other => 0,
    }
}

/// Bucketed contribution of the changed file's direct dependency count.
pub fn dependency_count_score(direct_deps: usize) -> u32 {
    match direct_deps {
        0..=2 => 1,
        3..=5 => 2,
        _ => 3,
    }
}

/// Maps the additive score onto an ordinal impact level.
pub fn impact_level_for_score(score: u32) -> ImpactLevel {
    match score {
        0..=3 => ImpactLevel::Low,
        4..=5 => ImpactLevel::Medium,
        6..=7 => ImpactLevel::High,
        _ => ImpactLevel::Critical,
    }
}

/// Complete impact computation from the three explicit inputs.
pub fn score_impact(
    affected: usize,
    category: FileCategory,
    direct_deps: usize,
) -> ImpactLevel {
    impact_level_for_score(
        affected_count_score(affected) + category_bonus(category) + dependency_count_score(direct_deps),
    )
}

/// Deterministic effort estimate from impact level and affected count.
pub fn estimate_effort(impact: ImpactLevel, affected: usize) -> ImpactLevel {
    if impact == ImpactLevel::Critical {
        ImpactLevel::Critical
    } else if impact == ImpactLevel::High || affected > 5 {
        ImpactLevel::High
    } else if impact == ImpactLevel::Medium || affected > 2 {
        ImpactLevel::Medium
    } else {
        ImpactLevel::Low
    }
}

/// Templated action list for the given impact level, with advisories
/// appended for wide blast radii.
pub fn recommendations(impact: ImpactLevel, affected: usize) -> Vec<String> {
    let mut items: Vec<String> = match impact {
        ImpactLevel::Critical => vec![
            "critical change: review all dependencies before proceeding".into(),
            "create a detailed migration plan".into(),
            "run the full test suite across all affected files".into(),
            "coordinate with the whole team before implementing".into(),
        ],
        ImpactLevel::High => vec![
            "high impact: verify the main dependencies".into(),
            "document the change in detail".into(),
            "test the most affected files".into(),
            "notify the team about the change".into(),
        ],
        ImpactLevel::Medium => vec![
            "medium impact: review local dependencies".into(),
            "update related documentation".into(),
            "test the affected functionality".into(),
        ],
        ImpactLevel::Low => vec![
            "low impact: localized change".into(),
            "update documentation if needed".into(),
        ],
    };

    if affected > 10 {
        items.push("many files affected: consider incremental refactoring".into());
    } else if affected > 5 {
        items.push("create a checklist of files to update".into());
    }

    items
}
