use crate::event::{ChangeEvent, MonitorStats};
use crate::snapshot::{GitState, Snapshot};
use chrono::{Duration as ChronoDuration, Utc};
use knowgraph_core::{
    sha256_hex, walk_files, ChangeType, FileCategory, IgnoreRules, ImpactLevel, IndexInvalidator,
    MonitorConfig, Result,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How long `stop()` waits for an in-flight detection cycle to finish.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-file snapshot entry. Replaced wholesale whenever a change is observed.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Digest of size + mtime + ctime; cheap to recompute every cycle.
    pub metadata_hash: String,
    /// Digest of the full byte content; only recomputed when metadata moved.
    pub content_hash: String,
}

struct DetectorState {
    files: HashMap<PathBuf, FileRecord>,
    structure_hash: String,
    history: VecDeque<ChangeEvent>,
}

struct Inner {
    config: MonitorConfig,
    ignore: IgnoreRules,
    invalidator: Arc<dyn IndexInvalidator>,
    /// Guards the whole detect-and-dispatch sequence so the poll loop and
    /// `force_check` never process the same filesystem snapshot twice.
    state: tokio::sync::Mutex<DetectorState>,
    git: Mutex<GitState>,
    total_changes: AtomicU64,
    running: AtomicBool,
}

struct PollHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Maintains a hashed snapshot of the monitored knowledge base and
/// classifies deltas against it.
pub struct ChangeDetector {
    inner: Arc<Inner>,
    poll: Mutex<Option<PollHandle>>,
}

impl ChangeDetector {
    /// Walks the configured roots and records metadata and content hashes
    /// for every non-ignored file. Fails only if none of the configured
    /// roots can be read at all.
    pub fn new(config: MonitorConfig, invalidator: Arc<dyn IndexInvalidator>) -> Result<Self> {
        let ignore = IgnoreRules::compile(&config.ignore_patterns)?;

        let git = config
            .snapshot_path
            .as_deref()
            .map(|p| Snapshot::load(p).git)
            .unwrap_or_default();

        let mut files = HashMap::new();
        for path in walk_files(&config.roots, &ignore)? {
            if let Some(record) = hash_file(&path) {
                files.insert(path, record);
            }
        }
        let structure_hash = structure_hash(&config.roots, &files);
        info!("change detector initialized: {} files monitored", files.len());

        let inner = Arc::new(Inner {
            config,
            ignore,
            invalidator,
            state: tokio::sync::Mutex::new(DetectorState {
                files,
                structure_hash,
                history: VecDeque::new(),
            }),
            git: Mutex::new(git),
            total_changes: AtomicU64::new(0),
            running: AtomicBool::new(false),
        });
        let detector = Self {
            inner,
            poll: Mutex::new(None),
        };
        detector.inner.save_snapshot_blocking();
        Ok(detector)
    }

    /// Runs one classification cycle without dispatching invalidations.
    /// The snapshot and event history are still updated.
    pub async fn detect(&self) -> Result<Vec<ChangeEvent>> {
        self.inner.run_cycle(false).await
    }

    /// Runs one detection cycle synchronously with respect to the poll loop
    /// and dispatches the resulting events immediately.
    pub async fn force_check(&self) -> Result<Vec<ChangeEvent>> {
        self.inner.run_cycle(true).await
    }

    /// Spawns the background poll loop. A second call while running is a
    /// logged no-op.
    pub fn start(&self) {
        let mut poll = self.poll.lock();
        if poll.is_some() {
            warn!("change detector poll loop already running");
            return;
        }

        let token = CancellationToken::new();
        let inner = Arc::clone(&self.inner);
        let loop_token = token.clone();
        inner.running.store(true, Ordering::SeqCst);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.config.poll_interval);
            // The first tick fires immediately; skip it so start() does not
            // race the caller's own setup.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = loop_token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = inner.run_cycle(true).await {
                            error!("detection cycle failed: {e}");
                        }
                    }
                }
            }
        });

        *poll = Some(PollHandle { token, handle });
        info!("change detector poll loop started");
    }

    /// Cancels the poll loop and waits for any in-flight cycle to finish,
    /// bounded by a fixed timeout.
    pub async fn stop(&self) {
        let poll = self.poll.lock().take();
        if let Some(PollHandle { token, handle }) = poll {
            token.cancel();
            if tokio::time::timeout(STOP_TIMEOUT, handle).await.is_err() {
                warn!("poll loop did not stop within {STOP_TIMEOUT:?}");
            }
            self.inner.running.store(false, Ordering::SeqCst);
            info!("change detector poll loop stopped");
        }
    }

    /// The most recent change events, newest last.
    pub async fn get_history(&self, limit: usize) -> Vec<ChangeEvent> {
        let state = self.inner.state.lock().await;
        let skip = state.history.len().saturating_sub(limit);
        state.history.iter().skip(skip).cloned().collect()
    }

    pub async fn get_stats(&self) -> MonitorStats {
        let state = self.inner.state.lock().await;
        let hour_ago = Utc::now() - ChronoDuration::hours(1);
        MonitorStats {
            monitored_files: state.files.len(),
            roots: self.inner.config.roots.clone(),
            poll_interval_secs: self.inner.config.poll_interval.as_secs(),
            running: self.inner.running.load(Ordering::SeqCst),
            total_changes: self.inner.total_changes.load(Ordering::SeqCst),
            recent_changes: state
                .history
                .iter()
                .filter(|e| e.timestamp > hour_ago)
                .count(),
            structure_hash: state.structure_hash.clone(),
        }
    }

    /// Records the latest ingested commit so it survives restarts in the
    /// persisted snapshot.
    pub fn record_commit(&self, commit: impl Into<String>) {
        self.inner.git.lock().last_commit = Some(commit.into());
    }
}

impl Inner {
    async fn run_cycle(&self, dispatch: bool) -> Result<Vec<ChangeEvent>> {
        let mut state = self.state.lock().await;
        let events = self.detect_locked(&mut state)?;
        if !events.is_empty() {
            info!("detected {} knowledge-base changes", events.len());
            self.handle_changes(&mut state, &events, dispatch).await;
            self.save_snapshot(&state);
        }
        Ok(events)
    }

    /// Classifies deltas against the previous snapshot. Per-file I/O errors
    /// are logged and the file treated as unchanged for this cycle.
    fn detect_locked(&self, state: &mut DetectorState) -> Result<Vec<ChangeEvent>> {
        let mut events = Vec::new();

        let known: Vec<PathBuf> = state.files.keys().cloned().collect();
        for path in known {
            match std::fs::metadata(&path) {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    if let Some(record) = state.files.remove(&path) {
                        events.push(ChangeEvent::new(
                            ChangeType::Deleted,
                            path,
                            Some(record.metadata_hash),
                            None,
                            ImpactLevel::Medium,
                        ));
                    }
                }
                Err(e) => {
                    warn!("cannot stat {}: {e}; treating as unchanged", path.display());
                }
                Ok(meta) => {
                    let metadata_hash = metadata_hash(&meta);
                    let record = state.files[&path].clone();
                    if metadata_hash == record.metadata_hash {
                        continue;
                    }
                    match std::fs::read(&path) {
                        Ok(bytes) => {
                            let content_hash = sha256_hex(&bytes);
                            let change_type = if content_hash != record.content_hash {
                                ChangeType::ContentChanged
                            } else {
                                ChangeType::Modified
                            };
                            let impact = match change_type {
                                ChangeType::ContentChanged => ImpactLevel::High,
                                _ => ImpactLevel::Medium,
                            };
                            events.push(ChangeEvent::new(
                                change_type,
                                path.clone(),
                                Some(record.metadata_hash),
                                Some(metadata_hash.clone()),
                                impact,
                            ));
                            state.files.insert(
                                path,
                                FileRecord {
                                    metadata_hash,
                                    content_hash,
                                },
                            );
                        }
                        Err(e) => {
                            warn!("cannot read {}: {e}; treating as unchanged", path.display());
                        }
                    }
                }
            }
        }

        for path in walk_files(&self.config.roots, &self.ignore)? {
            if state.files.contains_key(&path) {
                continue;
            }
            if let Some(record) = hash_file(&path) {
                events.push(ChangeEvent::new(
                    ChangeType::Added,
                    path.clone(),
                    None,
                    Some(record.metadata_hash.clone()),
                    ImpactLevel::Medium,
                ));
                state.files.insert(path, record);
            }
        }

        let new_structure = structure_hash(&self.config.roots, &state.files);
        if new_structure != state.structure_hash {
            events.push(ChangeEvent::new(
                ChangeType::StructureChanged,
                PathBuf::new(),
                Some(state.structure_hash.clone()),
                Some(new_structure.clone()),
                ImpactLevel::High,
            ));
            state.structure_hash = new_structure;
        }

        Ok(events)
    }

    async fn handle_changes(&self, state: &mut DetectorState, events: &[ChangeEvent], dispatch: bool) {
        for event in events {
            debug!("change: {} ({})", event.description, event.change_type);
            state.history.push_back(event.clone());
            while state.history.len() > self.config.history_limit {
                state.history.pop_front();
            }
            self.total_changes.fetch_add(1, Ordering::SeqCst);
            if dispatch {
                self.dispatch_invalidation(event).await;
            }
        }
    }

    /// Maps each event type onto exactly one invalidation policy and
    /// delegates it to the collaborator. Collaborator failures are logged
    /// and never abort the cycle.
    async fn dispatch_invalidation(&self, event: &ChangeEvent) {
        let outcome = match event.change_type {
            ChangeType::ContentChanged | ChangeType::Added => {
                let scope = FileCategory::classify(&event.path).query_type();
                let res = self.invalidator.invalidate(scope).await;
                match res {
                    Ok(()) => self.invalidator.reindex().await,
                    err => err,
                }
            }
            ChangeType::Deleted => {
                let res = match FileCategory::classify(&event.path).query_type() {
                    Some(scope) => self.invalidator.invalidate(Some(scope)).await,
                    None => Ok(()),
                };
                match res {
                    Ok(()) => self.invalidator.reindex().await,
                    err => err,
                }
            }
            ChangeType::StructureChanged => match self.invalidator.clear().await {
                Ok(()) => self.invalidator.reindex().await,
                err => err,
            },
            // A metadata-only touch does not stale any cached answer.
            ChangeType::Modified => Ok(()),
        };
        if let Err(e) = outcome {
            warn!("invalidation hook failed for {}: {e}", event.change_type);
        }
    }

    fn save_snapshot(&self, state: &DetectorState) {
        let Some(path) = self.config.snapshot_path.as_deref() else {
            return;
        };
        let snapshot = Snapshot {
            last_update: Some(Utc::now()),
            files: state
                .files
                .iter()
                .map(|(p, r)| (p.to_string_lossy().into_owned(), r.content_hash.clone()))
                .collect(),
            git: self.git.lock().clone(),
        };
        if let Err(e) = snapshot.save(path) {
            warn!("failed to persist snapshot to {}: {e}", path.display());
        }
    }

    fn save_snapshot_blocking(&self) {
        if let Ok(state) = self.state.try_lock() {
            self.save_snapshot(&state);
        }
    }
}

/// Digest of size + modification time + inode change time, so metadata-only
/// updates such as permission changes are caught even when the content and
/// mtime stay put.
fn metadata_hash(meta: &Metadata) -> String {
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .unwrap_or_default();
    let (ctime_secs, ctime_nanos) = ctime_parts(meta);
    sha256_hex(
        format!(
            "{}_{}.{}_{}.{}",
            meta.len(),
            mtime.as_secs(),
            mtime.subsec_nanos(),
            ctime_secs,
            ctime_nanos
        )
        .as_bytes(),
    )
}

#[cfg(unix)]
fn ctime_parts(meta: &Metadata) -> (i64, i64) {
    use std::os::unix::fs::MetadataExt;
    (meta.ctime(), meta.ctime_nsec())
}

/// Platforms without a ctime fall back to mtime, which the digest already
/// carries, so this degrades to the size+mtime scheme.
#[cfg(not(unix))]
fn ctime_parts(_meta: &Metadata) -> (i64, i64) {
    (0, 0)
}

fn hash_file(path: &Path) -> Option<FileRecord> {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) => {
            warn!("cannot stat {}: {e}", path.display());
            return None;
        }
    };
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("cannot read {}: {e}", path.display());
            return None;
        }
    };
    Some(FileRecord {
        metadata_hash: metadata_hash(&meta),
        content_hash: sha256_hex(&bytes),
    })
}

/// Digest of the sorted list of all monitored root-relative paths. Detects
/// additions and removals as a whole.
fn structure_hash(roots: &[PathBuf], files: &HashMap<PathBuf, FileRecord>) -> String {
    let mut relative: Vec<String> = files
        .keys()
        .map(|path| {
            roots
                .iter()
                .find_map(|root| path.strip_prefix(root).ok())
                .unwrap_or(path)
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    relative.sort();
    sha256_hex(relative.join("|").as_bytes())
}
