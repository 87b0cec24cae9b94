//! Bus-factor / ownership analysis over per-file git authorship.
//!
//! Turns [`crate::git`]'s raw per-file author-commit distribution
//! (`FileStats::author_commits`) into the bus-factor metric and the
//! solo-owner/risk-area rollups: one pass over the per-file data, one
//! aggregation pass for the directory-level rollup.

use crate::git::FileStats;
use crate::types::KnowledgeGraph;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipLevel {
    Critical,
    Dangerous,
    Concerning,
    Healthy,
}

impl OwnershipLevel {
    fn for_bus_factor(bus_factor: f64) -> Self {
        if bus_factor < 1.5 {
            OwnershipLevel::Critical
        } else if bus_factor < 2.0 {
            OwnershipLevel::Dangerous
        } else if bus_factor < 3.0 {
            OwnershipLevel::Concerning
        } else {
            OwnershipLevel::Healthy
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOwnership {
    pub file: String,
    pub bus_factor: u32,
    pub top_owner: Option<String>,
    pub top_owner_share: f64,
    pub contributors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskArea {
    pub directory: String,
    pub avg_bus_factor: f64,
    pub file_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnershipReport {
    pub files: Vec<FileOwnership>,
    pub overall_bus_factor: f64,
    pub level: OwnershipLevel,
    pub solo_owned_files: Vec<String>,
    /// Files whose bus factor is below the configured
    /// `bus_factor_threshold`, a wider net than `solo_owned_files` when
    /// the threshold is set above 1.
    pub at_risk_files: Vec<String>,
    pub lines_at_risk: u64,
    pub top_owners: Vec<(String, u32)>,
    pub risk_areas: Vec<RiskArea>,
}

/// Per-file bus factor: the number of contributors holding at least a 20%
/// share of that file's commits, floored at 1 (a file with any history has
/// at least its sole author).
fn bus_factor_for(stats: &FileStats) -> u32 {
    let total: u32 = stats.author_commits.values().sum();
    if total == 0 {
        return 1;
    }
    let significant = stats
        .author_commits
        .values()
        .filter(|&&count| count as f64 / total as f64 >= 0.20)
        .count() as u32;
    significant.max(1)
}

/// Build the full ownership report. `significant_files` selects which
/// files feed the overall weighted average — the graph's file nodes whose
/// `modification_count` or `complexity` put them in the top churn/
/// complexity band; callers pass in that pre-filtered set of relative
/// paths, along with each file's total line count for the lines-at-risk
/// rollup. `bus_factor_threshold` is the configured floor below which a
/// file's bus factor is surfaced in `at_risk_files`.
pub fn analyze(
    graph: &KnowledgeGraph,
    file_stats: &HashMap<String, FileStats>,
    significant_files: &[String],
    bus_factor_threshold: u32,
) -> OwnershipReport {
    let mut files: Vec<FileOwnership> = file_stats
        .iter()
        .map(|(path, stats)| {
            let contributors = stats.ordered_contributors();
            let total: u32 = stats.author_commits.values().sum();
            let top_owner = contributors.first().cloned();
            let top_owner_share = top_owner
                .as_ref()
                .and_then(|name| stats.author_commits.get(name))
                .map(|&count| if total == 0 { 0.0 } else { count as f64 / total as f64 })
                .unwrap_or(0.0);
            FileOwnership {
                file: path.clone(),
                bus_factor: bus_factor_for(stats),
                top_owner,
                top_owner_share,
                contributors,
            }
        })
        .collect();
    files.sort_by(|a, b| a.file.cmp(&b.file));

    let solo_owned_files: Vec<String> = files
        .iter()
        .filter(|f| f.bus_factor == 1)
        .map(|f| f.file.clone())
        .collect();

    let at_risk_files: Vec<String> = files
        .iter()
        .filter(|f| f.bus_factor < bus_factor_threshold)
        .map(|f| f.file.clone())
        .collect();

    let lines_at_risk: u64 = solo_owned_files
        .iter()
        .filter_map(|path| graph.node(path))
        .filter_map(|n| n.line_count)
        .map(|c| c as u64)
        .sum();

    let mut owner_totals: HashMap<String, u32> = HashMap::new();
    for stats in file_stats.values() {
        for (author, count) in &stats.author_commits {
            *owner_totals.entry(author.clone()).or_insert(0) += count;
        }
    }
    let mut top_owners: Vec<(String, u32)> = owner_totals.into_iter().collect();
    top_owners.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_owners.truncate(10);

    let significant: Vec<&FileOwnership> = files
        .iter()
        .filter(|f| significant_files.iter().any(|s| s == &f.file))
        .collect();
    let overall_bus_factor = if significant.is_empty() {
        if files.is_empty() {
            3.0
        } else {
            files.iter().map(|f| f.bus_factor as f64).sum::<f64>() / files.len() as f64
        }
    } else {
        significant.iter().map(|f| f.bus_factor as f64).sum::<f64>() / significant.len() as f64
    };
    let level = OwnershipLevel::for_bus_factor(overall_bus_factor);

    let risk_areas = directory_risk_areas(&files);

    OwnershipReport {
        files,
        overall_bus_factor,
        level,
        solo_owned_files,
        at_risk_files,
        lines_at_risk,
        top_owners,
        risk_areas,
    }
}

/// Group files by their parent directory and flag directories whose
/// average bus factor is below the "concerning" band.
fn directory_risk_areas(files: &[FileOwnership]) -> Vec<RiskArea> {
    let mut by_dir: HashMap<String, Vec<u32>> = HashMap::new();
    for file in files {
        let dir = Path::new(&file.file)
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
        by_dir.entry(dir).or_default().push(file.bus_factor);
    }

    let mut areas: Vec<RiskArea> = by_dir
        .into_iter()
        .map(|(directory, factors)| {
            let avg = factors.iter().sum::<u32>() as f64 / factors.len() as f64;
            RiskArea {
                directory,
                avg_bus_factor: avg,
                file_count: factors.len() as u32,
            }
        })
        .filter(|area| area.avg_bus_factor < 3.0)
        .collect();
    areas.sort_by(|a, b| {
        a.avg_bus_factor
            .partial_cmp(&b.avg_bus_factor)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.directory.cmp(&b.directory))
    });
    areas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Node;

    fn stats(authors: &[(&str, u32)]) -> FileStats {
        let mut s = FileStats::default();
        for (name, count) in authors {
            s.author_commits.insert(name.to_string(), *count);
        }
        s
    }

    #[test]
    fn solo_author_has_bus_factor_one() {
        let stats = stats(&[("Ada", 10)]);
        assert_eq!(bus_factor_for(&stats), 1);
    }

    #[test]
    fn two_even_contributors_have_bus_factor_two() {
        let stats = stats(&[("Ada", 5), ("Grace", 5)]);
        assert_eq!(bus_factor_for(&stats), 2);
    }

    #[test]
    fn minor_contributor_below_twenty_percent_does_not_count() {
        let stats = stats(&[("Ada", 95), ("Grace", 5)]);
        assert_eq!(bus_factor_for(&stats), 1);
    }

    #[test]
    fn solo_owned_files_contribute_to_lines_at_risk() {
        let mut graph = KnowledgeGraph::new("/repo");
        graph.nodes.push(Node::new_file("a.rs", "a.rs", 100));
        graph.canonicalize();

        let mut file_stats = HashMap::new();
        file_stats.insert("a.rs".to_string(), stats(&[("Ada", 10)]));

        let report = analyze(&graph, &file_stats, &["a.rs".to_string()], 2);
        assert_eq!(report.solo_owned_files, vec!["a.rs".to_string()]);
        assert_eq!(report.at_risk_files, vec!["a.rs".to_string()]);
        assert_eq!(report.lines_at_risk, 100);
        assert_eq!(report.level, OwnershipLevel::Critical);
    }

    #[test]
    fn at_risk_files_widen_with_a_higher_threshold() {
        let mut file_stats = HashMap::new();
        file_stats.insert("a.rs".to_string(), stats(&[("Ada", 5), ("Grace", 5)]));
        let graph = KnowledgeGraph::new("/repo");

        let low_threshold = analyze(&graph, &file_stats, &[], 1);
        assert!(low_threshold.at_risk_files.is_empty());

        let high_threshold = analyze(&graph, &file_stats, &[], 3);
        assert_eq!(high_threshold.at_risk_files, vec!["a.rs".to_string()]);
    }

    #[test]
    fn directory_risk_areas_flag_low_average_bus_factor() {
        let mut file_stats = HashMap::new();
        file_stats.insert("src/a.rs".to_string(), stats(&[("Ada", 10)]));
        file_stats.insert("src/b.rs".to_string(), stats(&[("Ada", 10)]));
        let graph = KnowledgeGraph::new("/repo");

        let report = analyze(&graph, &file_stats, &[], 2);
        assert_eq!(report.risk_areas.len(), 1);
        assert_eq!(report.risk_areas[0].directory, "src");
        assert_eq!(report.risk_areas[0].avg_bus_factor, 1.0);
    }
}
