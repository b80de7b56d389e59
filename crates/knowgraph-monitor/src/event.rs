use chrono::{DateTime, Utc};
use knowgraph_core::{ChangeType, ImpactLevel};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An observed knowledge-base delta. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub change_type: ChangeType,
    /// Affected file. Empty for structure-wide events.
    pub path: PathBuf,
    pub old_hash: Option<String>,
    pub new_hash: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub impact: ImpactLevel,
}

impl ChangeEvent {
    pub fn new(
        change_type: ChangeType,
        path: PathBuf,
        old_hash: Option<String>,
        new_hash: Option<String>,
        impact: ImpactLevel,
    ) -> Self {
        let description = match change_type {
            ChangeType::Added => format!("new file: {}", path.display()),
            ChangeType::Modified => format!("file metadata changed: {}", path.display()),
            ChangeType::ContentChanged => format!("file content changed: {}", path.display()),
            ChangeType::Deleted => format!("file deleted: {}", path.display()),
            ChangeType::StructureChanged => "file structure changed".to_string(),
        };
        Self {
            change_type,
            path,
            old_hash,
            new_hash,
            timestamp: Utc::now(),
            description,
            impact,
        }
    }
}

/// Point-in-time monitoring statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStats {
    pub monitored_files: usize,
    pub roots: Vec<PathBuf>,
    pub poll_interval_secs: u64,
    pub running: bool,
    /// Total change events observed since construction; not reset when the
    /// bounded history rolls over.
    pub total_changes: u64,
    /// Events observed in the last hour.
    pub recent_changes: usize,
    pub structure_hash: String,
}
