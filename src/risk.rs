//! Multi-factor impact/risk scoring for a single file: how many other
//! files would be touched by changing it, how tightly it's historically
//! coupled to files the graph doesn't already know about, how complex it
//! is, and how often it churns.
//!
//! Grounded on `topology.rs`'s BFS-style traversal idiom (`compute_pagerank`
//! walks the dependency graph iteratively) generalized here to a bounded
//! depth-2 dependent walk, combined with [`crate::coupling`]'s Jaccard
//! output and the per-file git/complexity fields [`crate::graph`] already
//! merges onto file nodes.

use crate::coupling::CouplingReport;
use crate::types::{KnowledgeGraph, Node};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    fn for_score(score: f64) -> Self {
        if score < 25.0 {
            RiskLevel::Low
        } else if score < 50.0 {
            RiskLevel::Medium
        } else if score < 75.0 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskFactors {
    pub dependency_score: f64,
    pub coupling_score: f64,
    pub complexity_score: f64,
    pub churn_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskReport {
    pub file: String,
    pub direct_dependents: Vec<String>,
    pub indirect_dependents: Vec<String>,
    pub coupled_count: usize,
    pub hidden_dependency_count: usize,
    pub max_complexity: u32,
    pub modification_count: u32,
    pub contributor_count: u32,
    pub factors: RiskFactors,
    pub risk_score: f64,
    pub level: RiskLevel,
    pub recommendations: Vec<String>,
}

/// Direct dependents of `target`, plus the depth-2 BFS frontier beyond
/// them (excluding the target and anything already counted as direct).
/// Shared by [`assess`] and the CLI's standalone `impact` command, which
/// wants the dependency walk without the rest of the risk score.
pub fn dependents(graph: &KnowledgeGraph, target: &str) -> (Vec<String>, Vec<String>) {
    let direct: Vec<String> = graph
        .direct_dependents(target)
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut seen: HashSet<&str> = direct.iter().map(String::as_str).collect();
    seen.insert(target);
    let mut indirect = Vec::new();
    for dep in &direct {
        for next in graph.direct_dependents(dep) {
            if seen.insert(next) {
                indirect.push(next.to_string());
            }
        }
    }
    indirect.sort();

    (direct, indirect)
}

/// Assess risk for `target`, given the graph and a coupling report already
/// computed for that same file (callers typically run
/// [`crate::coupling::coupling_for`] once and pass the result in here).
pub fn assess(graph: &KnowledgeGraph, coupling: &CouplingReport, target: &str) -> RiskReport {
    let (direct, indirect) = dependents(graph, target);

    let max_complexity = graph
        .node(target)
        .map(|n| file_max_complexity(graph, n))
        .unwrap_or(0);
    let (modification_count, contributor_count) = graph
        .node(target)
        .map(|n| (n.modification_count.unwrap_or(0), n.contributors.len() as u32))
        .unwrap_or((0, 0));

    let dependency_score = dependency_score(direct.len(), indirect.len());
    let coupling_score = coupling_score(coupling.coupled.len(), coupling.hidden_dependencies.len());
    let complexity_score = complexity_score(max_complexity);
    let churn_score = churn_score(modification_count, contributor_count);

    let risk_score =
        0.35 * dependency_score + 0.25 * coupling_score + 0.25 * complexity_score + 0.15 * churn_score;
    let level = RiskLevel::for_score(risk_score);

    let mut recommendations = Vec::new();
    if dependency_score >= 60.0 {
        recommendations.push(format!(
            "{} has {} direct and {} indirect dependents; add test coverage before changing its public surface",
            target,
            direct.len(),
            indirect.len()
        ));
    }
    if complexity_score >= 70.0 {
        recommendations.push(format!(
            "max function complexity in {target} is {max_complexity}; consider breaking up the most complex function"
        ));
    }
    if churn_score >= 70.0 {
        recommendations.push(format!(
            "{target} has changed {modification_count} times across {contributor_count} contributors; consider stabilizing its interface"
        ));
    }
    if coupling_score >= 50.0 {
        recommendations.push(format!(
            "{target} is strongly coupled to {} other file(s), including {} with no declared import relationship; review for a missing abstraction",
            coupling.coupled.len(),
            coupling.hidden_dependencies.len()
        ));
    }

    RiskReport {
        file: target.to_string(),
        direct_dependents: direct,
        indirect_dependents: indirect,
        coupled_count: coupling.coupled.len(),
        hidden_dependency_count: coupling.hidden_dependencies.len(),
        max_complexity,
        modification_count,
        contributor_count,
        factors: RiskFactors {
            dependency_score,
            coupling_score,
            complexity_score,
            churn_score,
        },
        risk_score,
        level,
        recommendations,
    }
}

fn file_max_complexity(graph: &KnowledgeGraph, file: &Node) -> u32 {
    graph
        .symbol_nodes()
        .filter(|n| n.file_path == file.file_path)
        .filter_map(|n| n.complexity)
        .max()
        .unwrap_or(0)
}

fn dependency_score(direct: usize, indirect: usize) -> f64 {
    let weighted = direct as f64 + indirect as f64 * 0.3;
    if weighted <= 0.0 {
        0.0
    } else if weighted <= 2.0 {
        20.0
    } else if weighted <= 7.0 {
        40.0
    } else if weighted <= 12.0 {
        60.0
    } else if weighted <= 20.0 {
        80.0
    } else {
        100.0
    }
}

fn coupling_score(coupled: usize, hidden: usize) -> f64 {
    ((coupled as f64) * 10.0).min(50.0) + ((hidden as f64) * 20.0).min(50.0)
}

fn complexity_score(complexity: u32) -> f64 {
    let c = complexity as f64;
    let score = if c <= 5.0 {
        c * 4.0
    } else if c <= 10.0 {
        20.0 + (c - 5.0) * 4.0
    } else if c <= 15.0 {
        40.0 + (c - 10.0) * 6.0
    } else {
        70.0 + (c - 15.0) * 3.0
    };
    score.min(100.0)
}

fn churn_score(modifications: u32, contributors: u32) -> f64 {
    (modifications as f64 / 50.0).min(1.0) * 50.0 + (contributors as f64 / 5.0).min(1.0) * 50.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupling::CoupledFile;
    use crate::types::{Edge, EdgeType};

    fn empty_coupling(target: &str) -> CouplingReport {
        CouplingReport {
            target: target.to_string(),
            coupled: Vec::new(),
            hidden_dependencies: Vec::new(),
        }
    }

    #[test]
    fn low_risk_file_with_no_dependents_or_churn() {
        let mut graph = KnowledgeGraph::new("/repo");
        graph.nodes.push(Node::new_file("a.rs", "a.rs", 10));
        graph.canonicalize();

        let report = assess(&graph, &empty_coupling("a.rs"), "a.rs");
        assert_eq!(report.level, RiskLevel::Low);
        assert!(report.direct_dependents.is_empty());
    }

    #[test]
    fn complexity_bands_match_spec_piecewise_mapping() {
        assert_eq!(complexity_score(0), 0.0);
        assert_eq!(complexity_score(5), 20.0);
        assert_eq!(complexity_score(10), 40.0);
        assert_eq!(complexity_score(15), 70.0);
        assert!((complexity_score(25) - 100.0).abs() < 1e-9);
        assert_eq!(complexity_score(100), 100.0);
    }

    #[test]
    fn high_fan_in_drives_dependency_score_to_cap() {
        let mut graph = KnowledgeGraph::new("/repo");
        for f in ["target.rs", "a.rs", "b.rs", "c.rs"] {
            graph.nodes.push(Node::new_file(f, f, 10));
        }
        for dep in ["a.rs", "b.rs", "c.rs"] {
            graph
                .edges
                .push(Edge::new(dep, "target.rs", EdgeType::Imports));
        }
        graph.canonicalize();

        let report = assess(&graph, &empty_coupling("target.rs"), "target.rs");
        assert_eq!(report.direct_dependents.len(), 3);
        assert_eq!(report.factors.dependency_score, 40.0);
    }

    #[test]
    fn many_hidden_dependencies_push_coupling_score_over_recommendation_threshold() {
        let mut graph = KnowledgeGraph::new("/repo");
        graph.nodes.push(Node::new_file("a.rs", "a.rs", 10));
        graph.canonicalize();

        let hidden: Vec<CoupledFile> = ["b.rs", "c.rs", "d.rs"]
            .iter()
            .map(|f| CoupledFile {
                file: f.to_string(),
                strength: 0.6,
                shared_commits: 4,
                has_import_relationship: false,
            })
            .collect();
        let coupling = CouplingReport {
            target: "a.rs".to_string(),
            coupled: hidden.clone(),
            hidden_dependencies: hidden,
        };
        let report = assess(&graph, &coupling, "a.rs");
        // coupled: min(3*10,50)=30, hidden: min(3*20,50)=50 -> 80
        assert_eq!(report.factors.coupling_score, 80.0);
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.contains("coupled")));
    }
}
