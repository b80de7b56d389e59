use crate::edge::{DependencyEdge, DependencyStats, EdgeSummary, ImpactAnalysis};
use crate::patterns::{dependency_strength, DEPENDENCY_PATTERNS};
use crate::scoring::{estimate_effort, recommendations, score_impact};
use chrono::Utc;
use knowgraph_core::{walk_files, FileCategory, GraphConfig, IgnoreRules, Result};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Default)]
struct GraphInner {
    /// Source file -> outgoing edges.
    deps_by_source: HashMap<PathBuf, Vec<DependencyEdge>>,
    /// All scanned files, sorted for deterministic target resolution.
    files: Vec<PathBuf>,
}

/// Infers a weighted dependency graph from textual patterns and scores the
/// ripple effect of changes. The graph is built as a batch on construction
/// or explicit `rebuild`; impact queries are read-only traversals.
pub struct ImpactAnalyzer {
    config: GraphConfig,
    ignore: IgnoreRules,
    graph: RwLock<GraphInner>,
    history: Mutex<VecDeque<ImpactAnalysis>>,
}

impl ImpactAnalyzer {
    pub fn new(config: GraphConfig) -> Result<Self> {
        let ignore = IgnoreRules::compile(&config.ignore_patterns)?;
        let graph = build_graph(&config, &ignore)?;
        Ok(Self {
            config,
            ignore,
            graph: RwLock::new(graph),
            history: Mutex::new(VecDeque::new()),
        })
    }

    /// Rescans the roots and swaps in the fresh graph. Serialized against
    /// concurrent impact queries by the graph lock.
    pub fn rebuild(&self) -> Result<()> {
        let fresh = build_graph(&self.config, &self.ignore)?;
        *self.graph.write() = fresh;
        Ok(())
    }

    /// Scores the blast radius of a change to `changed`. The affected set
    /// is the transitive forward reachability of the file plus its direct
    /// reverse dependents, and always contains the file itself.
    pub fn analyze_impact(&self, changed: &Path) -> ImpactAnalysis {
        let analysis = {
            let graph = self.graph.read();
            let changed = changed.to_path_buf();

            let mut affected: BTreeSet<PathBuf> = BTreeSet::new();
            affected.insert(changed.clone());

            let mut visited: HashSet<PathBuf> = HashSet::from([changed.clone()]);
            let mut queue: VecDeque<PathBuf> = VecDeque::from([changed.clone()]);
            while let Some(node) = queue.pop_front() {
                if let Some(edges) = graph.deps_by_source.get(&node) {
                    for edge in edges {
                        if visited.insert(edge.target.clone()) {
                            affected.insert(edge.target.clone());
                            queue.push_back(edge.target.clone());
                        }
                    }
                }
            }

            let mut dependencies: Vec<DependencyEdge> = graph
                .deps_by_source
                .get(&changed)
                .cloned()
                .unwrap_or_default();
            for (source, edges) in &graph.deps_by_source {
                for edge in edges.iter().filter(|e| e.target == changed) {
                    affected.insert(source.clone());
                    dependencies.push(edge.clone());
                }
            }

            let direct_deps = graph.deps_by_source.get(&changed).map_or(0, Vec::len);
            let affected_files: Vec<PathBuf> = affected.into_iter().collect();
            let impact_level = score_impact(
                affected_files.len(),
                FileCategory::classify(&changed),
                direct_deps,
            );

            ImpactAnalysis {
                impact_level,
                estimated_effort: estimate_effort(impact_level, affected_files.len()),
                recommendations: recommendations(impact_level, affected_files.len()),
                changed_file: changed,
                affected_files,
                dependencies,
                timestamp: Utc::now(),
            }
        };

        info!(
            "impact of {}: {} ({} affected files)",
            analysis.changed_file.display(),
            analysis.impact_level,
            analysis.affected_files.len()
        );

        let mut history = self.history.lock();
        history.push_back(analysis.clone());
        while history.len() > self.config.history_limit {
            history.pop_front();
        }

        analysis
    }

    pub fn get_history(&self, limit: usize) -> Vec<ImpactAnalysis> {
        let history = self.history.lock();
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    pub fn get_stats(&self) -> DependencyStats {
        let graph = self.graph.read();

        let mut all_edges: Vec<&DependencyEdge> = Vec::new();
        let mut reverse_counts: HashMap<&PathBuf, usize> = HashMap::new();
        let mut kind_counts: HashMap<String, usize> = HashMap::new();

        for edges in graph.deps_by_source.values() {
            for edge in edges {
                *reverse_counts.entry(&edge.target).or_default() += 1;
                *kind_counts.entry(edge.kind.to_string()).or_default() += 1;
                all_edges.push(edge);
            }
        }

        all_edges.sort_by(|a, b| b.strength.total_cmp(&a.strength));
        let strongest_edges = all_edges
            .iter()
            .take(10)
            .map(|e| EdgeSummary {
                source: e.source.clone(),
                target: e.target.clone(),
                strength: e.strength,
            })
            .collect();

        let mut most_referenced: Vec<(PathBuf, usize)> = reverse_counts
            .into_iter()
            .map(|(p, n)| (p.clone(), n))
            .collect();
        most_referenced.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        most_referenced.truncate(10);

        DependencyStats {
            total_files: graph.files.len(),
            total_edges: all_edges.len(),
            strongest_edges,
            most_referenced,
            kind_counts,
        }
    }
}

fn build_graph(config: &GraphConfig, ignore: &IgnoreRules) -> Result<GraphInner> {
    let mut files = walk_files(&config.roots, ignore)?;
    files.sort();

    let mut deps_by_source: HashMap<PathBuf, Vec<DependencyEdge>> = HashMap::new();
    for file in &files {
        let content = match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                // Binary or unreadable artifacts carry no textual dependencies.
                debug!("skipping {}: {e}", file.display());
                continue;
            }
        };
        let edges = extract_dependencies(file, &content, &files);
        if !edges.is_empty() {
            deps_by_source.insert(file.clone(), edges);
        }
    }

    let total_edges: usize = deps_by_source.values().map(Vec::len).sum();
    info!(
        "dependency graph built: {} files scanned, {} edges",
        files.len(),
        total_edges
    );
    Ok(GraphInner {
        deps_by_source,
        files,
    })
}

fn extract_dependencies(source: &Path, content: &str, files: &[PathBuf]) -> Vec<DependencyEdge> {
    let mut edges = Vec::new();
    for family in DEPENDENCY_PATTERNS.iter() {
        for pattern in &family.patterns {
            for caps in pattern.captures_iter(content) {
                let Some(token) = caps.get(1) else { continue };
                let context = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
                let Some(target) = resolve_target(token.as_str(), source, files) else {
                    continue;
                };
                if target == source {
                    continue;
                }
                edges.push(DependencyEdge {
                    source: source.to_path_buf(),
                    target,
                    kind: family.kind,
                    line: line_number(content, token.start()),
                    context: context.to_string(),
                    strength: dependency_strength(family.kind, context),
                });
            }
        }
    }
    edges
}

/// Resolves a raw target token to a monitored file. First match wins:
/// relative path against the source's directory, then exact filename across
/// all roots, then case-insensitive prefix/substring fuzzy match.
/// Unresolved tokens yield `None` and are skipped silently.
fn resolve_target(token: &str, source: &Path, files: &[PathBuf]) -> Option<PathBuf> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    if token.starts_with("./") || token.starts_with("../") {
        let base = source.parent().unwrap_or_else(|| Path::new(""));
        let resolved = normalize(&base.join(token));
        if files.binary_search(&resolved).is_ok() {
            return Some(resolved);
        }
    }

    if let Some(exact) = files
        .iter()
        .find(|f| f.file_name() == Some(OsStr::new(token)))
    {
        return Some(exact.clone());
    }

    let lower = token.to_lowercase();
    files
        .iter()
        .find(|f| {
            f.file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .map(|name| name.starts_with(&lower) || name.contains(&lower))
                .unwrap_or(false)
        })
        .cloned()
}

/// Lexical normalization; `..` never escapes past the path start.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    warn!("relative target escapes its root: {}", path.display());
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn line_number(content: &str, offset: usize) -> Option<u32> {
    Some(content[..offset].bytes().filter(|&b| b == b'\n').count() as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowgraph_core::ImpactLevel;
    use tempfile::TempDir;

    fn analyzer_for(dir: &TempDir) -> ImpactAnalyzer {
        ImpactAnalyzer::new(GraphConfig::new(vec![dir.path().to_path_buf()])).unwrap()
    }

    #[test]
    fn analysis_always_includes_the_changed_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("lonely.md"), "no references here").unwrap();

        let analyzer = analyzer_for(&dir);
        let target = dir.path().join("lonely.md");
        let analysis = analyzer.analyze_impact(&target);
        assert!(analysis.affected_files.contains(&target));
        assert_eq!(analysis.impact_level, ImpactLevel::Low);
    }

    #[test]
    fn chain_impact_covers_dependents_and_dependencies() {
        let dir = TempDir::new().unwrap();
        // a.md imports the domain model; the domain model references c.md.
        std::fs::write(dir.path().join("a.md"), "import ddd_model").unwrap();
        std::fs::write(
            dir.path().join("ddd_model.md"),
            "background in [the context map](./c.md)",
        )
        .unwrap();
        std::fs::write(dir.path().join("c.md"), "terminal document").unwrap();

        let analyzer = analyzer_for(&dir);
        let changed = dir.path().join("ddd_model.md");
        let analysis = analyzer.analyze_impact(&changed);

        for expected in ["a.md", "ddd_model.md", "c.md"] {
            assert!(
                analysis.affected_files.contains(&dir.path().join(expected)),
                "{expected} missing from {:?}",
                analysis.affected_files
            );
        }
        assert!(analysis.impact_level >= ImpactLevel::Medium);
        assert!(!analysis.dependencies.is_empty());
        assert!(!analysis.recommendations.is_empty());
    }

    #[test]
    fn relative_targets_resolve_against_the_source_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/source.md"), "see [sibling](./sibling.md)").unwrap();
        std::fs::write(dir.path().join("docs/sibling.md"), "leaf").unwrap();

        let analyzer = analyzer_for(&dir);
        let analysis = analyzer.analyze_impact(&dir.path().join("docs/source.md"));
        assert!(analysis
            .affected_files
            .contains(&dir.path().join("docs/sibling.md")));
    }

    #[test]
    fn unresolved_and_self_references_are_dropped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("self.md"),
            "see [myself](./self.md) and [ghost](./missing.md)",
        )
        .unwrap();

        let analyzer = analyzer_for(&dir);
        let stats = analyzer.get_stats();
        assert_eq!(stats.total_edges, 0);
    }

    #[test]
    fn stats_expose_strongest_and_most_referenced() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("hub.md"), "shared definitions").unwrap();
        std::fs::write(dir.path().join("x.md"), "import hub").unwrap();
        std::fs::write(dir.path().join("y.md"), "see [hub](./hub.md)").unwrap();

        let analyzer = analyzer_for(&dir);
        let stats = analyzer.get_stats();
        assert_eq!(stats.total_edges, 2);
        assert_eq!(stats.most_referenced[0].0, dir.path().join("hub.md"));
        assert_eq!(stats.most_referenced[0].1, 2);
        // The import edge (0.8) outranks the reference edge (0.3).
        assert_eq!(stats.strongest_edges[0].source, dir.path().join("x.md"));
        assert_eq!(stats.kind_counts.get("imports"), Some(&1));
        assert_eq!(stats.kind_counts.get("reference"), Some(&1));
    }

    #[test]
    fn history_is_bounded_and_ordered() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("doc.md"), "plain").unwrap();

        let mut config = GraphConfig::new(vec![dir.path().to_path_buf()]);
        config.history_limit = 3;
        let analyzer = ImpactAnalyzer::new(config).unwrap();
        for _ in 0..5 {
            analyzer.analyze_impact(&dir.path().join("doc.md"));
        }
        assert_eq!(analyzer.get_history(10).len(), 3);
    }
}
