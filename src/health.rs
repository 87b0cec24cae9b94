//! Overall codebase health score: the single composite number `status`/
//! `health`/`scan` all report, and what snapshots track over time for the
//! trend/velocity/trajectory analyzers in [`crate::trends`].
//!
//! Combines three signals the other analytical modules already produce —
//! hotspot danger ratio, bus-factor band, and cycle count — the same way
//! [`crate::risk`] combines its four factors into one weighted score,
//! rather than inventing a fifth independent formula. See DESIGN.md for
//! the exact weighting rationale.

use crate::cycles::CycleReport;
use crate::hotspots::{HotspotReport, Quadrant};
use crate::ownership::OwnershipReport;
use crate::types::KnowledgeGraph;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub score: f64,
    pub file_count: u32,
    pub total_lines: u64,
    pub avg_complexity: f64,
    pub hotspot_count: u32,
    pub danger_ratio: f64,
    pub overall_bus_factor: f64,
    pub cycle_count: usize,
}

/// Weighted penalty composition: a project with no danger-quadrant
/// hotspots, a healthy bus factor, and no cycles scores 100; each signal
/// degrades the score independently and the floor is 0.
pub fn compute(graph: &KnowledgeGraph, hotspots: &HotspotReport, ownership: &OwnershipReport, cycles: &CycleReport) -> HealthReport {
    let file_count = graph.metadata.file_count;
    let total_lines = graph.metadata.total_lines;

    let complexities: Vec<u32> = graph.file_nodes().filter_map(|n| n.complexity).collect();
    let avg_complexity = if complexities.is_empty() {
        0.0
    } else {
        complexities.iter().sum::<u32>() as f64 / complexities.len() as f64
    };

    let hotspot_count = hotspots.hotspots.len() as u32;
    let danger_count = hotspots
        .hotspots
        .iter()
        .filter(|h| h.quadrant == Quadrant::Danger)
        .count();
    let danger_ratio = if hotspots.hotspots.is_empty() {
        0.0
    } else {
        danger_count as f64 / hotspots.hotspots.len() as f64
    };

    let bus_factor_penalty = (3.0 - ownership.overall_bus_factor.min(3.0)).max(0.0) / 3.0 * 35.0;
    let danger_penalty = danger_ratio * 40.0;
    let cycle_penalty = (cycles.cycles.len() as f64 * 5.0).min(25.0);

    let score = (100.0 - bus_factor_penalty - danger_penalty - cycle_penalty).clamp(0.0, 100.0);

    HealthReport {
        score,
        file_count,
        total_lines,
        avg_complexity,
        hotspot_count,
        danger_ratio,
        overall_bus_factor: ownership.overall_bus_factor,
        cycle_count: cycles.cycles.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycles::CountsBySeverity;
    use crate::ownership::OwnershipLevel;

    fn empty_graph() -> KnowledgeGraph {
        let mut g = KnowledgeGraph::new("/repo");
        g.canonicalize();
        g
    }

    fn empty_ownership(bus_factor: f64) -> OwnershipReport {
        OwnershipReport {
            files: Vec::new(),
            overall_bus_factor: bus_factor,
            level: OwnershipLevel::Healthy,
            solo_owned_files: Vec::new(),
            at_risk_files: Vec::new(),
            lines_at_risk: 0,
            top_owners: Vec::new(),
            risk_areas: Vec::new(),
        }
    }

    fn empty_cycles() -> CycleReport {
        CycleReport {
            cycles: Vec::new(),
            worst_cycle: None,
            counts_by_severity: CountsBySeverity::default(),
        }
    }

    #[test]
    fn clean_project_scores_one_hundred() {
        let graph = empty_graph();
        let hotspots = HotspotReport { hotspots: Vec::new() };
        let ownership = empty_ownership(3.0);
        let cycles = empty_cycles();
        let report = compute(&graph, &hotspots, &ownership, &cycles);
        assert_eq!(report.score, 100.0);
    }

    #[test]
    fn low_bus_factor_and_cycles_reduce_score() {
        let graph = empty_graph();
        let hotspots = HotspotReport { hotspots: Vec::new() };
        let ownership = empty_ownership(1.0);
        let mut cycles = empty_cycles();
        cycles.cycles.push(crate::cycles::Cycle {
            files: vec!["a.rs".to_string(), "b.rs".to_string(), "a.rs".to_string()],
            length: 2,
            severity: crate::cycles::Severity::Low,
        });
        let report = compute(&graph, &hotspots, &ownership, &cycles);
        assert!(report.score < 100.0);
        assert_eq!(report.cycle_count, 1);
    }
}
