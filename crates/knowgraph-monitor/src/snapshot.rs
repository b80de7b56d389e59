use chrono::{DateTime, Utc};
use knowgraph_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Persisted detector state. A missing or unreadable snapshot file is
/// treated as an empty snapshot, never as an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub last_update: Option<DateTime<Utc>>,
    /// Monitored path -> content hash.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    #[serde(default)]
    pub git: GitState,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitState {
    pub last_commit: Option<String>,
}

impl Snapshot {
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("corrupt snapshot at {}: {e}; starting empty", path.display());
                    Snapshot::default()
                }
            },
            Err(_) => Snapshot::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}
