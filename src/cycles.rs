//! Circular-dependency detection over the file-level `imports` subgraph.
//!
//! Tarjan SCC over a file-only `petgraph::Graph` filtered to a single
//! edge kind. A cycle's file list is reconstructed by walking real edges
//! within the SCC rather than sorting its members independently, so the
//! ordering still reflects which file actually imports which; it's then
//! rotated so the lexicographically smallest file is first, for
//! deterministic, non-duplicate output across repeated runs.

use crate::types::{EdgeType, KnowledgeGraph};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{Graph, NodeIndex};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    fn for_length(length: usize) -> Self {
        match length {
            0 | 1 => Severity::Low,
            2 => Severity::Low,
            3 => Severity::Medium,
            _ => Severity::High,
        }
    }
}

/// A single circular-dependency cycle, closed (first file repeated at the
/// end) for display, in the order files actually import one another.
#[derive(Debug, Clone, Serialize)]
pub struct Cycle {
    pub files: Vec<String>,
    pub length: usize,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycles: Vec<Cycle>,
    pub worst_cycle: Option<Cycle>,
    pub counts_by_severity: CountsBySeverity,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CountsBySeverity {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
}

impl CountsBySeverity {
    fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Low => self.low += 1,
            Severity::Medium => self.medium += 1,
            Severity::High => self.high += 1,
        }
    }
}

/// Detect every circular dependency among source files, restricted to the
/// graph's `imports` edges.
pub fn find_cycles(graph: &KnowledgeGraph) -> CycleReport {
    let mut file_graph: Graph<&str, ()> = Graph::new();
    let mut node_of: HashMap<&str, NodeIndex> = HashMap::new();

    for file in graph.file_nodes() {
        let idx = file_graph.add_node(file.id.as_str());
        node_of.insert(file.id.as_str(), idx);
    }

    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &graph.edges {
        if edge.edge_type != EdgeType::Imports {
            continue;
        }
        let (Some(&src), Some(&dst)) = (node_of.get(edge.source.as_str()), node_of.get(edge.target.as_str())) else {
            continue;
        };
        file_graph.add_edge(src, dst, ());
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }
    for neighbors in adjacency.values_mut() {
        neighbors.sort_unstable();
        neighbors.dedup();
    }

    let mut cycles: Vec<Cycle> = Vec::new();
    for scc in tarjan_scc(&file_graph) {
        if scc.len() >= 2 {
            let members: HashSet<&str> = scc.iter().map(|&idx| file_graph[idx]).collect();
            if let Some(path) = trace_cycle(&members, &adjacency) {
                cycles.push(build_cycle(path));
            }
        } else if let Some(&idx) = scc.first() {
            let file = file_graph[idx];
            if adjacency.get(file).is_some_and(|n| n.contains(&file)) {
                cycles.push(build_cycle(vec![file.to_string()]));
            }
        }
    }

    cycles.sort_by(|a, b| a.files[0].cmp(&b.files[0]));

    let mut counts = CountsBySeverity::default();
    for cycle in &cycles {
        counts.record(cycle.severity);
    }
    let worst_cycle = cycles
        .iter()
        .max_by_key(|c| c.length)
        .cloned();

    CycleReport {
        cycles,
        worst_cycle,
        counts_by_severity: counts,
    }
}

/// Walk real `imports` edges within an SCC's member set to reconstruct one
/// elementary cycle through every member, starting at the lexicographically
/// smallest file and always taking the smallest unvisited neighbor (for
/// determinism), until the walk returns to the start.
fn trace_cycle(members: &HashSet<&str>, adjacency: &HashMap<&str, Vec<&str>>) -> Option<Vec<String>> {
    let start = *members.iter().min()?;
    let mut path = vec![start];
    let mut visited: HashSet<&str> = HashSet::from([start]);
    let mut current = start;

    loop {
        let next = adjacency
            .get(current)
            .into_iter()
            .flatten()
            .filter(|n| members.contains(*n))
            .find(|n| !visited.contains(*n) || **n == start);

        match next {
            Some(&n) if n == start && path.len() == members.len() => {
                return Some(path.into_iter().map(str::to_string).collect());
            }
            Some(&n) if !visited.contains(n) => {
                visited.insert(n);
                path.push(n);
                current = n;
            }
            _ => {
                // No unvisited in-SCC neighbor and not yet back to start:
                // fall back to visiting any remaining member reachable from
                // the current node, even without a direct edge, so every
                // SCC member still appears in the listing.
                let Some(&fallback) = members.iter().find(|m| !visited.contains(*m)) else {
                    return Some(path.into_iter().map(str::to_string).collect());
                };
                visited.insert(fallback);
                path.push(fallback);
                current = fallback;
            }
        }
    }
}

/// Rotate `path` so its lexicographically smallest entry is first, then
/// close the cycle by repeating that entry at the end.
fn build_cycle(mut path: Vec<String>) -> Cycle {
    let length = path.len();
    if let Some(min_pos) = path
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
    {
        path.rotate_left(min_pos);
    }
    let first = path[0].clone();
    path.push(first);

    Cycle {
        files: path,
        length,
        severity: Severity::for_length(length),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Edge;

    fn graph_with_imports(edges: &[(&str, &str)]) -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new("/repo");
        let mut files: HashSet<&str> = HashSet::new();
        for (a, b) in edges {
            files.insert(a);
            files.insert(b);
        }
        for f in files {
            graph
                .nodes
                .push(crate::types::Node::new_file(f.to_string(), f.to_string(), 1));
        }
        for (a, b) in edges {
            graph
                .edges
                .push(Edge::new(a.to_string(), b.to_string(), EdgeType::Imports));
        }
        graph.canonicalize();
        graph
    }

    #[test]
    fn detects_two_file_mutual_cycle() {
        let graph = graph_with_imports(&[("a.ts", "b.ts"), ("b.ts", "a.ts")]);
        let report = find_cycles(&graph);
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(report.cycles[0].length, 2);
        assert_eq!(report.cycles[0].severity, Severity::Low);
        assert_eq!(report.cycles[0].files, vec!["a.ts", "b.ts", "a.ts"]);
    }

    #[test]
    fn detects_three_file_cycle_with_medium_severity() {
        let graph = graph_with_imports(&[("a.ts", "b.ts"), ("b.ts", "c.ts"), ("c.ts", "a.ts")]);
        let report = find_cycles(&graph);
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(report.cycles[0].length, 3);
        assert_eq!(report.cycles[0].severity, Severity::Medium);
        assert_eq!(report.cycles[0].files.first(), report.cycles[0].files.last());
    }

    #[test]
    fn no_cycle_in_acyclic_graph() {
        let graph = graph_with_imports(&[("a.ts", "b.ts"), ("b.ts", "c.ts")]);
        let report = find_cycles(&graph);
        assert!(report.cycles.is_empty());
        assert!(report.worst_cycle.is_none());
    }

    #[test]
    fn worst_cycle_is_the_longest() {
        let graph = graph_with_imports(&[
            ("a.ts", "b.ts"),
            ("b.ts", "a.ts"),
            ("x.ts", "y.ts"),
            ("y.ts", "z.ts"),
            ("z.ts", "x.ts"),
        ]);
        let report = find_cycles(&graph);
        assert_eq!(report.cycles.len(), 2);
        assert_eq!(report.worst_cycle.unwrap().length, 3);
        assert_eq!(report.counts_by_severity.low, 1);
        assert_eq!(report.counts_by_severity.medium, 1);
    }
}
