//! Change-coupling analysis: files that tend to change together, mined
//! from the commit→file-set relation in [`crate::git`].
//!
//! Per-file commit counts generalize here to pairwise co-change counts,
//! combined with the graph's own import-edge lookup to annotate whether
//! an existing import relationship already explains the coupling.

use crate::config::AnalysisConfig;
use crate::git::CommitFileSet;
use crate::types::KnowledgeGraph;
use serde::Serialize;
use std::collections::HashMap;

const DEFAULT_MAX_RESULTS: usize = 20;

#[derive(Debug, Clone)]
pub struct CouplingParams {
    pub min_strength: f64,
    pub min_shared_commits: u32,
    pub max_results: usize,
}

impl Default for CouplingParams {
    fn default() -> Self {
        Self {
            min_strength: 0.3,
            min_shared_commits: 2,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl CouplingParams {
    /// Build params from the project's `[analysis]` configuration:
    /// `coupling_min_similarity` and `coupling_min_cochanges` drive the
    /// two filters below; `max_results` isn't policy-configurable.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            min_strength: config.coupling_min_similarity,
            min_shared_commits: config.coupling_min_cochanges,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CoupledFile {
    pub file: String,
    pub strength: f64,
    pub shared_commits: u32,
    pub has_import_relationship: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CouplingReport {
    pub target: String,
    pub coupled: Vec<CoupledFile>,
    pub hidden_dependencies: Vec<CoupledFile>,
}

/// Commit-set membership counts, reused across multiple `coupling_for`
/// calls so a whole-graph coupling sweep doesn't re-scan history per file.
pub struct CoOccurrence<'a> {
    commit_sets: &'a [CommitFileSet],
    file_commit_counts: HashMap<&'a str, u32>,
}

impl<'a> CoOccurrence<'a> {
    pub fn new(commit_sets: &'a [CommitFileSet]) -> Self {
        let mut file_commit_counts: HashMap<&'a str, u32> = HashMap::new();
        for commit in commit_sets {
            for file in &commit.files {
                *file_commit_counts.entry(file.as_str()).or_insert(0) += 1;
            }
        }
        Self {
            commit_sets,
            file_commit_counts,
        }
    }

    /// Jaccard strength and shared-commit count between `target` and every
    /// other file that ever shares a commit with it.
    fn pairwise(&self, target: &str) -> Vec<(String, f64, u32)> {
        let mut shared: HashMap<&str, u32> = HashMap::new();
        for commit in self.commit_sets {
            if !commit.files.contains(target) {
                continue;
            }
            for file in &commit.files {
                if file != target {
                    *shared.entry(file.as_str()).or_insert(0) += 1;
                }
            }
        }

        let target_count = *self.file_commit_counts.get(target).unwrap_or(&0);
        shared
            .into_iter()
            .map(|(other, shared_commits)| {
                let other_count = *self.file_commit_counts.get(other).unwrap_or(&0);
                let union = target_count + other_count - shared_commits;
                let strength = if union == 0 {
                    0.0
                } else {
                    shared_commits as f64 / union as f64
                };
                (other.to_string(), strength, shared_commits)
            })
            .collect()
    }
}

/// Compute the change-coupling report for `target`, annotating each
/// coupled file with whether the graph already records an import
/// relationship between it and `target` (in either direction).
pub fn coupling_for(
    graph: &KnowledgeGraph,
    co_occurrence: &CoOccurrence,
    target: &str,
    params: &CouplingParams,
) -> CouplingReport {
    let has_import = |other: &str| -> bool {
        graph.direct_dependents(target).contains(&other)
            || graph.direct_dependencies(target).contains(&other)
            || graph.direct_dependents(other).contains(&target)
            || graph.direct_dependencies(other).contains(&target)
    };

    let mut all: Vec<(String, f64, u32)> = co_occurrence
        .pairwise(target)
        .into_iter()
        .filter(|(_, _, shared)| *shared >= params.min_shared_commits)
        .collect();
    all.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0)));

    let hidden_dependencies: Vec<CoupledFile> = all
        .iter()
        .filter(|(_, strength, _)| *strength >= 0.5)
        .filter(|(other, _, _)| !has_import(other))
        .map(|(other, strength, shared_commits)| CoupledFile {
            file: other.clone(),
            strength: *strength,
            shared_commits: *shared_commits,
            has_import_relationship: false,
        })
        .collect();

    let coupled: Vec<CoupledFile> = all
        .into_iter()
        .filter(|(_, strength, _)| *strength >= params.min_strength)
        .take(params.max_results)
        .map(|(other, strength, shared_commits)| {
            let has_import_relationship = has_import(&other);
            CoupledFile {
                file: other,
                strength,
                shared_commits,
                has_import_relationship,
            }
        })
        .collect();

    CouplingReport {
        target: target.to_string(),
        coupled,
        hidden_dependencies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Edge, EdgeType, Node};
    use std::collections::HashSet;

    fn commit(hash: &str, files: &[&str]) -> CommitFileSet {
        CommitFileSet {
            commit_hash: hash.to_string(),
            timestamp: 0,
            files: files.iter().map(|f| f.to_string()).collect::<HashSet<_>>(),
        }
    }

    fn empty_graph() -> KnowledgeGraph {
        let mut g = KnowledgeGraph::new("/repo");
        for f in ["a.rs", "b.rs", "c.rs"] {
            g.nodes.push(Node::new_file(f, f, 10));
        }
        g.canonicalize();
        g
    }

    #[test]
    fn strongly_coupled_pair_above_threshold() {
        let commits = vec![
            commit("1", &["a.rs", "b.rs"]),
            commit("2", &["a.rs", "b.rs"]),
            commit("3", &["a.rs", "b.rs"]),
            commit("4", &["a.rs"]),
        ];
        let graph = empty_graph();
        let co = CoOccurrence::new(&commits);
        let report = coupling_for(&graph, &co, "a.rs", &CouplingParams::default());

        assert_eq!(report.coupled.len(), 1);
        assert_eq!(report.coupled[0].file, "b.rs");
        assert_eq!(report.coupled[0].shared_commits, 3);
        // union = 4 (a) + 3 (b) - 3 (shared) = 4 -> strength 3/4
        assert!((report.coupled[0].strength - 0.75).abs() < 1e-9);
    }

    #[test]
    fn weak_pair_below_min_shared_commits_is_excluded() {
        let commits = vec![commit("1", &["a.rs", "c.rs"])];
        let graph = empty_graph();
        let co = CoOccurrence::new(&commits);
        let report = coupling_for(&graph, &co, "a.rs", &CouplingParams::default());
        assert!(report.coupled.is_empty());
    }

    #[test]
    fn hidden_dependency_has_no_import_edge() {
        let commits = vec![
            commit("1", &["a.rs", "c.rs"]),
            commit("2", &["a.rs", "c.rs"]),
        ];
        let graph = empty_graph();
        let co = CoOccurrence::new(&commits);
        let report = coupling_for(&graph, &co, "a.rs", &CouplingParams::default());
        assert_eq!(report.hidden_dependencies.len(), 1);
        assert_eq!(report.hidden_dependencies[0].file, "c.rs");
    }

    #[test]
    fn existing_import_relationship_is_not_reported_as_hidden() {
        let commits = vec![
            commit("1", &["a.rs", "b.rs"]),
            commit("2", &["a.rs", "b.rs"]),
        ];
        let mut graph = empty_graph();
        graph
            .edges
            .push(Edge::new("a.rs", "b.rs", EdgeType::Imports));
        let co = CoOccurrence::new(&commits);
        let report = coupling_for(&graph, &co, "a.rs", &CouplingParams::default());
        assert!(report.hidden_dependencies.is_empty());
        assert!(report.coupled[0].has_import_relationship);
    }
}
