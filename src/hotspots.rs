//! Hotspot analysis: files that are both complex and frequently changed,
//! the classic "this is where bugs live" signal.
//!
//! Grounded on `topology.rs::compute_pagerank`'s normalization idiom (raw
//! per-node scores rescaled against the graph-wide min/max before they're
//! comparable) — applied here to each file's complexity and churn instead
//! of link-based centrality.

use crate::types::KnowledgeGraph;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    Healthy,
    Active,
    Legacy,
    Danger,
}

#[derive(Debug, Clone, Serialize)]
pub struct Hotspot {
    pub file: String,
    pub complexity: u32,
    pub churn: u32,
    pub normalized_complexity: f64,
    pub normalized_churn: f64,
    pub score: f64,
    pub quadrant: Quadrant,
}

#[derive(Debug, Clone, Serialize)]
pub struct HotspotReport {
    pub hotspots: Vec<Hotspot>,
}

/// Rank the top `limit` hotspots across every file node in the graph with
/// at least `min_commits` modifications; files below that floor haven't
/// changed enough for their churn signal to be meaningful and are
/// excluded from consideration (and from the normalization scale).
pub fn analyze(graph: &KnowledgeGraph, limit: usize, min_commits: u32) -> HotspotReport {
    let raw: Vec<(&str, u32, u32)> = graph
        .file_nodes()
        .map(|n| {
            (
                n.id.as_str(),
                n.complexity.unwrap_or(0),
                n.modification_count.unwrap_or(0),
            )
        })
        .filter(|(_, _, churn)| *churn >= min_commits)
        .collect();

    if raw.is_empty() {
        return HotspotReport { hotspots: Vec::new() };
    }

    let max_complexity = raw.iter().map(|(_, c, _)| *c).max().unwrap_or(0).max(1) as f64;
    let max_churn = raw.iter().map(|(_, _, h)| *h).max().unwrap_or(0).max(1) as f64;

    let mut hotspots: Vec<Hotspot> = raw
        .into_iter()
        .map(|(file, complexity, churn)| {
            let normalized_complexity = complexity as f64 / max_complexity;
            let normalized_churn = churn as f64 / max_churn;
            let denom = normalized_complexity + normalized_churn;
            let score = if denom == 0.0 {
                0.0
            } else {
                2.0 * normalized_complexity * normalized_churn / denom
            };
            let quadrant = classify(normalized_complexity, normalized_churn);
            Hotspot {
                file: file.to_string(),
                complexity,
                churn,
                normalized_complexity,
                normalized_churn,
                score,
                quadrant,
            }
        })
        .collect();

    hotspots.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.file.cmp(&b.file))
    });
    hotspots.truncate(limit);

    HotspotReport { hotspots }
}

/// Quadrant boundary fixed at the normalized midpoint (0.5), consistent
/// with "low"/"high" meaning below/above the project's own median scale
/// rather than an absolute threshold.
fn classify(complexity: f64, churn: f64) -> Quadrant {
    match (complexity >= 0.5, churn >= 0.5) {
        (false, false) => Quadrant::Healthy,
        (false, true) => Quadrant::Active,
        (true, false) => Quadrant::Legacy,
        (true, true) => Quadrant::Danger,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Node;

    fn file(id: &str, complexity: u32, churn: u32) -> Node {
        let mut n = Node::new_file(id, id, 10);
        n.complexity = Some(complexity);
        n.modification_count = Some(churn);
        n
    }

    #[test]
    fn high_complexity_high_churn_is_danger_quadrant() {
        let mut graph = KnowledgeGraph::new("/repo");
        graph.nodes.push(file("danger.rs", 20, 50));
        graph.nodes.push(file("healthy.rs", 1, 1));
        graph.canonicalize();

        let report = analyze(&graph, 10, 0);
        let danger = report.hotspots.iter().find(|h| h.file == "danger.rs").unwrap();
        assert_eq!(danger.quadrant, Quadrant::Danger);
        assert_eq!(danger.normalized_complexity, 1.0);
        assert_eq!(danger.normalized_churn, 1.0);
    }

    #[test]
    fn results_are_ranked_highest_score_first_and_truncated() {
        let mut graph = KnowledgeGraph::new("/repo");
        graph.nodes.push(file("a.rs", 20, 20));
        graph.nodes.push(file("b.rs", 5, 5));
        graph.nodes.push(file("c.rs", 1, 1));
        graph.canonicalize();

        let report = analyze(&graph, 2, 0);
        assert_eq!(report.hotspots.len(), 2);
        assert_eq!(report.hotspots[0].file, "a.rs");
    }

    #[test]
    fn empty_graph_returns_no_hotspots() {
        let graph = KnowledgeGraph::new("/repo");
        let report = analyze(&graph, 10, 0);
        assert!(report.hotspots.is_empty());
    }

    #[test]
    fn files_below_min_commits_are_excluded() {
        let mut graph = KnowledgeGraph::new("/repo");
        graph.nodes.push(file("churned.rs", 10, 5));
        graph.nodes.push(file("quiet.rs", 10, 1));
        graph.canonicalize();

        let report = analyze(&graph, 10, 3);
        assert_eq!(report.hotspots.len(), 1);
        assert_eq!(report.hotspots[0].file, "churned.rs");
    }
}
