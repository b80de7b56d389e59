use crate::config::IgnoreRules;
use crate::error::{KnowGraphError, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

/// All non-ignored files under the given roots. Unreadable entries and
/// missing roots are logged and skipped; only a total absence of readable
/// roots is a systemic failure.
pub fn walk_files(roots: &[PathBuf], ignore: &IgnoreRules) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut readable_roots = 0;
    for root in roots {
        if !root.exists() {
            warn!("root path does not exist: {}", root.display());
            continue;
        }
        readable_roots += 1;
        walk_dir(root, ignore, &mut files);
    }
    if !roots.is_empty() && readable_roots == 0 {
        return Err(KnowGraphError::Monitor(
            "no configured root path is readable".to_string(),
        ));
    }
    Ok(files)
}

fn walk_dir(dir: &Path, ignore: &IgnoreRules, out: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("cannot read directory {}: {e}", dir.display());
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if ignore.is_ignored(&path) {
            continue;
        }
        match entry.file_type() {
            Ok(ft) if ft.is_dir() => walk_dir(&path, ignore, out),
            Ok(ft) if ft.is_file() => out.push(path),
            Ok(_) => {}
            Err(e) => warn!("cannot stat {}: {e}", path.display()),
        }
    }
}
