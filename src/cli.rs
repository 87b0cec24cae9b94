//! codekg - CLI for the codebase knowledge engine
//!
//! A single entry point that scans a source tree into a knowledge graph,
//! persists it under `.codekg/`, and answers analytical queries against it.
//!
//! # Usage
//!
//! ```bash
//! # Scan a workspace
//! codekg scan --root /path/to/repo
//!
//! # Ask an analytical question
//! codekg hotspots --root /path/to/repo --limit 10
//! codekg risk --root /path/to/repo --file src/auth.rs
//! ```
//!
//! # Design for AI Agents
//!
//! This CLI is designed to be used by AI coding assistants:
//! - `--json` flag outputs machine-readable JSON
//! - Simple, predictable command structure
//! - Errors go to stderr, results to stdout
//! - Exit codes: 0 success, 1 policy-fail (with `--exit-code`), 2 user error, 3 no graph

use anyhow::Result;
use clap::{Parser, Subcommand};
use codekg::config::Config;
use codekg::contract::QueryRecord;
use codekg::coupling::{CoOccurrence, CouplingParams, CouplingReport};
use codekg::error::EngineError;
use codekg::git::{FileStats, GitHistoryAnalyzer};
use codekg::graph::GraphBuilder;
use codekg::semantic::{self, SearchMode};
use codekg::trends::Window;
use codekg::types::{KnowledgeGraph, Snapshot, SnapshotMetrics};
use codekg::{coupling, cycles, health, hotspots, ownership, risk, store, trends};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "codekg")]
#[command(author)]
#[command(version)]
#[command(about = "Codebase knowledge engine - structural and historical analysis for AI agents")]
#[command(long_about = r#"
codekg extracts a typed graph of files, symbols, imports, and git history
from a source tree, persists it, and answers analytical queries against
it: hotspots, circular dependencies, change coupling, bus factor, impact
and risk scoring, trend/velocity/trajectory, and semantic search.

Designed for automation: use --json for machine-readable output.
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Root directory to analyze
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    /// Exit non-zero when a threshold policy fails (e.g. health below N,
    /// any high-risk change) rather than just reporting it.
    #[arg(long, global = true)]
    exit_code: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the repository and persist a fresh knowledge graph
    Scan {
        /// Rescan even if the on-disk graph looks current
        #[arg(long)]
        force: bool,
    },

    /// Print staleness and summary metadata for the on-disk graph
    Status,

    /// Overall codebase health score and summary counts
    Health {
        /// With --exit-code, fail below this score (default 50)
        #[arg(long, default_value = "50")]
        threshold: f64,
    },

    /// Files ranked by combined complexity and churn
    Hotspots {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Circular import dependencies between files
    Cycles,

    /// Ownership concentration and risk areas
    BusFactor,

    /// Files that historically change together with a target file
    Coupling {
        #[arg(long)]
        file: String,
    },

    /// Direct and indirect dependents of a target file
    Impact {
        #[arg(long)]
        file: String,
    },

    /// Multi-factor risk score for a target file
    Risk {
        #[arg(long)]
        file: String,

        /// With --exit-code, fail at or above this risk score (default 75)
        #[arg(long, default_value = "75")]
        threshold: f64,
    },

    /// Regression over recent complexity and hotspot counts
    Velocity,

    /// Forward-projected health score with confidence bands
    Trajectory {
        #[arg(long, default_value = "30")]
        horizon_days: u32,
    },

    /// Symbols whose signature or location changed since the last snapshot
    Drift,

    /// Exported symbols removed or changed since the last snapshot
    BreakingChanges,

    /// Files most likely to need attention next
    Predict {
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Human-readable summary of recent changes for a daily standup
    Standup,

    /// Trend direction and change percent over a window
    Trends {
        /// day | week | month | all
        #[arg(long, default_value = "all")]
        window: String,
    },

    /// Keyword, semantic, or hybrid search over the graph
    Search {
        query: String,

        /// keyword | semantic | hybrid
        #[arg(long, default_value = "hybrid")]
        mode: String,

        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Natural-language query dispatched to the closest matching operation
    Ask { query: String },

    /// Build or refresh the semantic search index
    Index {
        /// Rebuild even if an index already exists
        #[arg(long)]
        rebuild: bool,
    },

    /// Remove the on-disk graph (snapshots are preserved)
    Clean,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let root = cli.root.clone();
    let root = root.canonicalize().unwrap_or(root);

    match run_command(&cli, &root) {
        Ok(outcome) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome.output)?);
            } else {
                print_human_readable(&outcome.output);
            }
            if cli.exit_code && outcome.policy_failed {
                std::process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            if cli.json {
                let response = error_response(&e);
                eprintln!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                eprintln!("Error: {}", e);
            }
            std::process::exit(exit_code_for(&e));
        }
    }
}

/// A successful run's payload plus whether `--exit-code`'s policy check
/// should flip the process exit status, decided per-command.
struct Outcome {
    output: Output,
    policy_failed: bool,
}

impl Outcome {
    fn ok(output: Output) -> Self {
        Self {
            output,
            policy_failed: false,
        }
    }

    fn policy(output: Output, failed: bool) -> Self {
        Self {
            output,
            policy_failed: failed,
        }
    }
}

fn run_command(cli: &Cli, root: &std::path::Path) -> Result<Outcome> {
    match &cli.command {
        Commands::Scan { force } => scan(root, *force).map(Outcome::ok),
        Commands::Status => status(root).map(Outcome::ok),
        Commands::Health { threshold } => health_cmd(root, *threshold),
        Commands::Hotspots { limit } => hotspots_cmd(root, *limit).map(Outcome::ok),
        Commands::Cycles => cycles_cmd(root).map(Outcome::ok),
        Commands::BusFactor => bus_factor_cmd(root).map(Outcome::ok),
        Commands::Coupling { file } => coupling_cmd(root, file).map(Outcome::ok),
        Commands::Impact { file } => impact_cmd(root, file).map(Outcome::ok),
        Commands::Risk { file, threshold } => risk_cmd(root, file, *threshold),
        Commands::Velocity => velocity_cmd(root).map(Outcome::ok),
        Commands::Trajectory { horizon_days } => trajectory_cmd(root, *horizon_days).map(Outcome::ok),
        Commands::Drift => drift_cmd(root).map(Outcome::ok),
        Commands::BreakingChanges => breaking_changes_cmd(root, true).map(Outcome::ok),
        Commands::Predict { limit } => predict_cmd(root, *limit).map(Outcome::ok),
        Commands::Standup => standup_cmd(root).map(Outcome::ok),
        Commands::Trends { window } => trends_cmd(root, window).map(Outcome::ok),
        Commands::Search { query, mode, limit } => search_cmd(root, query, mode, *limit).map(Outcome::ok),
        Commands::Ask { query } => ask_cmd(root, query).map(Outcome::ok),
        Commands::Index { rebuild } => index_cmd(root, *rebuild).map(Outcome::ok),
        Commands::Clean => clean_cmd(root).map(Outcome::ok),
    }
}

// --- helpers shared across commands --------------------------------------

fn load_graph(root: &std::path::Path) -> Result<Option<KnowledgeGraph>> {
    Ok(store::load(root)?)
}

fn require_graph(root: &std::path::Path) -> Result<KnowledgeGraph> {
    load_graph(root)?.ok_or_else(|| EngineError::NotInitialized(root.to_path_buf()).into())
}

/// Re-mine git history independently of `scan`: [`GraphBuilder::build`]
/// merges git-derived fields onto file nodes but does not expose the raw
/// [`codekg::git::GitHistory`] it computed internally, so query-time
/// commands needing per-file author distributions or commit/file-set
/// pairs (coupling, bus-factor) pay for a second `git log` walk.
fn file_stats(graph: &KnowledgeGraph, root: &std::path::Path) -> HashMap<String, FileStats> {
    let source_files: HashSet<String> = graph.file_nodes().map(|n| n.id.clone()).collect();
    GitHistoryAnalyzer::analyze(root, &source_files)
        .map(|h| h.files)
        .unwrap_or_default()
}

fn commit_file_sets(graph: &KnowledgeGraph, root: &std::path::Path) -> Vec<codekg::git::CommitFileSet> {
    let source_files: HashSet<String> = graph.file_nodes().map(|n| n.id.clone()).collect();
    GitHistoryAnalyzer::analyze(root, &source_files)
        .map(|h| h.commit_file_sets)
        .unwrap_or_default()
}

/// Files in the "significant" band bus-factor's overall weighted average
/// is computed over: the top quartile by complexity or churn.
fn significant_files(graph: &KnowledgeGraph) -> Vec<String> {
    let mut scored: Vec<(String, u32)> = graph
        .file_nodes()
        .map(|n| {
            let score = n.complexity.unwrap_or(0) + n.modification_count.unwrap_or(0);
            (n.id.clone(), score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let cutoff = (scored.len() / 4).max(1).min(scored.len());
    scored.into_iter().take(cutoff).map(|(id, _)| id).collect()
}

// --- scan / status / index / clean ---------------------------------------

/// Path the previous graph is stashed under before a scan overwrites
/// `graph.json`, so `drift`/`breaking-changes` can diff against exactly
/// the one prior scan without the store keeping full graph history.
fn previous_graph_path(root: &std::path::Path) -> PathBuf {
    store::store_dir(root).join("previous_graph.json")
}

fn scan(root: &std::path::Path, force: bool) -> Result<Output> {
    let config = Config::load(root)?;

    if !force {
        let discovery = codekg::discovery::FileDiscovery::new()
            .with_max_file_size(config.discovery.max_file_size_bytes);
        let source_files = discovery.discover(root).unwrap_or_default();
        if !store::is_stale(root, &source_files)? {
            let graph = require_graph(root)?;
            let hotspot_report =
                hotspots::analyze(&graph, usize::MAX, config.analysis.hotspot_min_commits);
            let cycle_report = cycles::find_cycles(&graph);
            let stats = file_stats(&graph, root);
            let significant = significant_files(&graph);
            let ownership_report =
                ownership::analyze(&graph, &stats, &significant, config.analysis.bus_factor_threshold);
            let health_report = health::compute(&graph, &hotspot_report, &ownership_report, &cycle_report);
            return Ok(Output::Scan {
                files: graph.metadata.file_count,
                nodes: graph.metadata.node_count,
                edges: graph.metadata.edge_count,
                errors: graph.errors.len(),
                duration_ms: 0,
                health_score: health_report.score,
            });
        }
    }

    if let Some(existing) = load_graph(root)? {
        if let Ok(bytes) = serde_json::to_vec(&existing) {
            let _ = std::fs::write(previous_graph_path(root), bytes);
        }
    }

    let graph = GraphBuilder::build(root, &config)?;
    store::save_to(root, &graph)?;

    let hotspot_report = hotspots::analyze(&graph, usize::MAX, config.analysis.hotspot_min_commits);
    let cycle_report = cycles::find_cycles(&graph);
    let stats = file_stats(&graph, root);
    let significant = significant_files(&graph);
    let ownership_report =
        ownership::analyze(&graph, &stats, &significant, config.analysis.bus_factor_threshold);
    let health_report = health::compute(&graph, &hotspot_report, &ownership_report, &cycle_report);

    let snapshot = Snapshot {
        timestamp: graph.metadata.scanned_at,
        commit_hash: None,
        metrics: SnapshotMetrics {
            health_score: health_report.score,
            avg_complexity: health_report.avg_complexity,
            hotspot_count: health_report.hotspot_count,
            file_count: graph.metadata.file_count,
            total_lines: graph.metadata.total_lines,
        },
    };
    store::append_snapshot(root, &snapshot)?;

    Ok(Output::Scan {
        files: graph.metadata.file_count,
        nodes: graph.metadata.node_count,
        edges: graph.metadata.edge_count,
        errors: graph.errors.len(),
        duration_ms: graph.metadata.scan_duration_ms,
        health_score: health_report.score,
    })
}

fn status(root: &std::path::Path) -> Result<Output> {
    let Some(metadata) = store::load_metadata(root)? else {
        return Ok(Output::Status {
            record: QueryRecord::not_initialized(),
        });
    };

    let discovery_config = Config::load(root)?;
    let discovery = codekg::discovery::FileDiscovery::new()
        .with_max_file_size(discovery_config.discovery.max_file_size_bytes);
    let source_files = discovery.discover(root).unwrap_or_default();
    let stale = store::is_stale(root, &source_files).unwrap_or(true);
    let errors = store::load_errors(root)?;

    Ok(Output::Status {
        record: QueryRecord::found(
            StatusData {
                stale,
                file_count: metadata.file_count,
                node_count: metadata.node_count,
                edge_count: metadata.edge_count,
                scanned_at: metadata.scanned_at,
                error_count: errors.len(),
            },
            if stale {
                "graph is stale relative to the working tree; re-run `codekg scan`"
            } else {
                "graph is current"
            },
        ),
    })
}

fn index_cmd(root: &std::path::Path, _rebuild: bool) -> Result<Output> {
    let graph = require_graph(root)?;
    let index = semantic::build(&graph);
    Ok(Output::Index {
        chunk_count: index.chunk_count,
        vocabulary_size: index.vocabulary_size,
    })
}

fn clean_cmd(root: &std::path::Path) -> Result<Output> {
    store::clean(root)?;
    Ok(Output::Clean { root: root.display().to_string() })
}

// --- analytical query commands -------------------------------------------

fn health_cmd(root: &std::path::Path, threshold: f64) -> Result<Outcome> {
    let Some(graph) = load_graph(root)? else {
        return Ok(Outcome::ok(Output::Health { record: QueryRecord::not_initialized() }));
    };
    let config = Config::load(root)?;
    let hotspot_report = hotspots::analyze(&graph, usize::MAX, config.analysis.hotspot_min_commits);
    let cycle_report = cycles::find_cycles(&graph);
    let stats = file_stats(&graph, root);
    let significant = significant_files(&graph);
    let ownership_report =
        ownership::analyze(&graph, &stats, &significant, config.analysis.bus_factor_threshold);
    let report = health::compute(&graph, &hotspot_report, &ownership_report, &cycle_report);

    let failed = report.score < threshold;
    let summary = format!("health score {:.1}/100", report.score);
    Ok(Outcome::policy(
        Output::Health { record: QueryRecord::found(report, summary) },
        failed,
    ))
}

fn hotspots_cmd(root: &std::path::Path, limit: usize) -> Result<Output> {
    let Some(graph) = load_graph(root)? else {
        return Ok(Output::Hotspots { record: QueryRecord::not_initialized() });
    };
    let config = Config::load(root)?;
    let report = hotspots::analyze(&graph, limit, config.analysis.hotspot_min_commits);
    let summary = format!("{} hotspot(s) found", report.hotspots.len());
    Ok(Output::Hotspots { record: QueryRecord::found(report, summary) })
}

fn cycles_cmd(root: &std::path::Path) -> Result<Output> {
    let Some(graph) = load_graph(root)? else {
        return Ok(Output::Cycles { record: QueryRecord::not_initialized() });
    };
    let report = cycles::find_cycles(&graph);
    let summary = format!("{} circular dependency chain(s) found", report.cycles.len());
    Ok(Output::Cycles { record: QueryRecord::found(report, summary) })
}

fn bus_factor_cmd(root: &std::path::Path) -> Result<Output> {
    let Some(graph) = load_graph(root)? else {
        return Ok(Output::BusFactor { record: QueryRecord::not_initialized() });
    };
    let config = Config::load(root)?;
    let stats = file_stats(&graph, root);
    let significant = significant_files(&graph);
    let report = ownership::analyze(&graph, &stats, &significant, config.analysis.bus_factor_threshold);
    let summary = format!(
        "overall bus factor {:.1} ({:?}); {} solo-owned file(s)",
        report.overall_bus_factor,
        report.level,
        report.solo_owned_files.len()
    );
    Ok(Output::BusFactor { record: QueryRecord::found(report, summary) })
}

fn coupling_cmd(root: &std::path::Path, file: &str) -> Result<Output> {
    let Some(graph) = load_graph(root)? else {
        return Ok(Output::Coupling { record: QueryRecord::not_initialized() });
    };
    if graph.node(file).is_none() {
        return Ok(Output::Coupling {
            record: QueryRecord::not_found(format!("{file} is not in the knowledge graph")),
        });
    }
    let config = Config::load(root)?;
    let commits = commit_file_sets(&graph, root);
    let co_occurrence = CoOccurrence::new(&commits);
    let params = CouplingParams::from_config(&config.analysis);
    let report = coupling::coupling_for(&graph, &co_occurrence, file, &params);
    let summary = format!("{} coupled file(s) for {file}", report.coupled.len());
    Ok(Output::Coupling { record: QueryRecord::found(report, summary) })
}

fn impact_cmd(root: &std::path::Path, file: &str) -> Result<Output> {
    let Some(graph) = load_graph(root)? else {
        return Ok(Output::Impact { record: QueryRecord::not_initialized() });
    };
    if graph.node(file).is_none() {
        return Ok(Output::Impact {
            record: QueryRecord::not_found(format!("{file} is not in the knowledge graph")),
        });
    }
    let (direct, indirect) = risk::dependents(&graph, file);
    let summary = format!(
        "{file} has {} direct and {} indirect dependent(s)",
        direct.len(),
        indirect.len()
    );
    Ok(Output::Impact {
        record: QueryRecord::found(
            ImpactData {
                file: file.to_string(),
                direct_dependents: direct,
                indirect_dependents: indirect,
            },
            summary,
        ),
    })
}

fn risk_cmd(root: &std::path::Path, file: &str, threshold: f64) -> Result<Outcome> {
    let Some(graph) = load_graph(root)? else {
        return Ok(Outcome::ok(Output::Risk { record: QueryRecord::not_initialized() }));
    };
    if graph.node(file).is_none() {
        return Ok(Outcome::ok(Output::Risk {
            record: QueryRecord::not_found(format!("{file} is not in the knowledge graph")),
        }));
    }
    let config = Config::load(root)?;
    let commits = commit_file_sets(&graph, root);
    let co_occurrence = CoOccurrence::new(&commits);
    let params = CouplingParams::from_config(&config.analysis);
    let coupling_report: CouplingReport = coupling::coupling_for(&graph, &co_occurrence, file, &params);
    let report = risk::assess(&graph, &coupling_report, file);

    let failed = report.risk_score >= threshold;
    let summary = format!("risk score {:.1}/100 ({:?})", report.risk_score, report.level);
    Ok(Outcome::policy(
        Output::Risk { record: QueryRecord::found(report, summary) },
        failed,
    ))
}

fn velocity_cmd(root: &std::path::Path) -> Result<Output> {
    let snapshots = store::load_snapshots(root)?;
    if snapshots.is_empty() {
        return Ok(Output::Velocity { record: QueryRecord::not_initialized() });
    }
    let config = Config::load(root)?;
    let report = trends::velocity(&snapshots, config.analysis.velocity_window_days);
    let summary = format!(
        "complexity slope {:.4}, hotspot slope {:.4} over {} sample(s)",
        report.complexity_slope, report.hotspot_slope, report.sample_count
    );
    Ok(Output::Velocity { record: QueryRecord::found(report, summary) })
}

fn trajectory_cmd(root: &std::path::Path, horizon_days: u32) -> Result<Output> {
    let snapshots = store::load_snapshots(root)?;
    if snapshots.is_empty() {
        return Ok(Output::Trajectory { record: QueryRecord::not_initialized() });
    }
    let report = trends::trajectory(&snapshots, horizon_days);
    let summary = if report.insufficient_data {
        "insufficient snapshot history for a trajectory projection".to_string()
    } else {
        format!(
            "projected health score {:.1} in {} day(s) ({:.1}-{:.1})",
            report.projected_health_score, horizon_days, report.confidence_low, report.confidence_high
        )
    };
    Ok(Output::Trajectory { record: QueryRecord::found(report, summary) })
}

fn trends_cmd(root: &std::path::Path, window: &str) -> Result<Output> {
    let snapshots = store::load_snapshots(root)?;
    if snapshots.is_empty() {
        return Ok(Output::Trends { record: QueryRecord::not_initialized() });
    }
    let window = parse_window(window)?;
    let report = trends::trend(&snapshots, window);
    let summary = format!("{:?} ({:+.1}% over {} sample(s))", report.direction, report.change_percent, report.sample_count);
    Ok(Output::Trends { record: QueryRecord::found(report, summary) })
}

fn parse_window(raw: &str) -> Result<Window> {
    match raw.to_ascii_lowercase().as_str() {
        "day" => Ok(Window::Day),
        "week" => Ok(Window::Week),
        "month" => Ok(Window::Month),
        "all" => Ok(Window::All),
        other => Err(EngineError::InvalidInput(format!("unknown window '{other}'; expected day|week|month|all")).into()),
    }
}

fn search_cmd(root: &std::path::Path, query: &str, mode: &str, limit: usize) -> Result<Output> {
    let Some(graph) = load_graph(root)? else {
        return Ok(Output::Search { record: QueryRecord::not_initialized() });
    };
    let mode = parse_search_mode(mode)?;
    let index = semantic::build(&graph);
    let hits = semantic::search(&index, query, mode, limit);
    let summary = format!("{} result(s) for \"{query}\"", hits.len());
    Ok(Output::Search { record: QueryRecord::found(SearchResultData { results: hits }, summary) })
}

fn parse_search_mode(raw: &str) -> Result<SearchMode> {
    match raw.to_ascii_lowercase().as_str() {
        "keyword" => Ok(SearchMode::Keyword),
        "semantic" => Ok(SearchMode::Semantic),
        "hybrid" => Ok(SearchMode::Hybrid),
        other => Err(EngineError::InvalidInput(format!("unknown search mode '{other}'; expected keyword|semantic|hybrid")).into()),
    }
}

/// Symbol signatures keyed by node id, compared between the on-disk graph
/// from before a scan and the freshly-built one, so `scan` can answer
/// `drift`/`breaking-changes` without the store persisting full history.
fn symbol_signature(node: &codekg::types::Node) -> String {
    format!(
        "{:?}|{}|{:?}|{}",
        node.node_type,
        node.exported,
        node.return_type,
        node.parameters.join(",")
    )
}

fn drift_cmd(root: &std::path::Path) -> Result<Output> {
    breaking_changes_cmd(root, false).map(|output| match output {
        Output::BreakingChanges { record } => Output::Drift {
            record: QueryRecord {
                found: record.found,
                data: record.data,
                summary: record.summary,
            },
        },
        other => other,
    })
}

/// Diffs the graph stashed by the most recent `scan` (see
/// [`previous_graph_path`]) against the one on disk now. Since
/// [`crate::store`] only retains the latest graph (not a full history of
/// every past scan), both `drift` and `breaking-changes` only ever see the
/// single most recent transition — the store's append-only log is
/// snapshots of summary metrics, not full graphs, so deeper history isn't
/// available without a structural change there. Read-only: unlike `scan`,
/// querying `drift`/`breaking-changes` repeatedly never changes what the
/// next call sees.
fn breaking_changes_cmd(root: &std::path::Path, exported_only: bool) -> Result<Output> {
    let Some(current) = load_graph(root)? else {
        return Ok(Output::BreakingChanges { record: QueryRecord::not_initialized() });
    };

    let previous: Option<KnowledgeGraph> = std::fs::read(previous_graph_path(root))
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok());

    let changes = match &previous {
        None => Vec::new(),
        Some(previous) => diff_symbols(previous, &current, exported_only),
    };

    let summary = if previous.is_none() {
        "no prior scan to compare against".to_string()
    } else if exported_only {
        format!("{} breaking change(s) since the last scan", changes.len())
    } else {
        format!("{} symbol(s) changed since the last scan", changes.len())
    };

    Ok(Output::BreakingChanges { record: QueryRecord::found(ChangeSetData { changes }, summary) })
}

#[derive(Debug, Clone, serde::Serialize)]
struct SymbolChange {
    id: String,
    kind: &'static str,
}

fn diff_symbols(previous: &KnowledgeGraph, current: &KnowledgeGraph, exported_only: bool) -> Vec<SymbolChange> {
    let mut changes = Vec::new();
    let current_ids: HashMap<&str, &codekg::types::Node> =
        current.symbol_nodes().map(|n| (n.id.as_str(), n)).collect();

    for old in previous.symbol_nodes() {
        if exported_only && !old.exported {
            continue;
        }
        match current_ids.get(old.id.as_str()) {
            None => changes.push(SymbolChange { id: old.id.clone(), kind: "removed" }),
            Some(new) if symbol_signature(old) != symbol_signature(new) => {
                if !exported_only || new.exported {
                    changes.push(SymbolChange { id: old.id.clone(), kind: "changed" });
                }
            }
            Some(_) => {}
        }
    }
    if !exported_only {
        let previous_ids: HashSet<&str> = previous.symbol_nodes().map(|n| n.id.as_str()).collect();
        for new in current.symbol_nodes() {
            if !previous_ids.contains(new.id.as_str()) {
                changes.push(SymbolChange { id: new.id.clone(), kind: "added" });
            }
        }
    }
    changes.sort_by(|a, b| a.id.cmp(&b.id));
    changes
}

/// Ranks files by the same danger-quadrant signal `hotspots` already
/// computes (complexity x churn), rather than a separate trend-fit model.
fn predict_cmd(root: &std::path::Path, limit: usize) -> Result<Output> {
    let Some(graph) = load_graph(root)? else {
        return Ok(Output::Predict { record: QueryRecord::not_initialized() });
    };
    let config = Config::load(root)?;
    let report = hotspots::analyze(&graph, usize::MAX, config.analysis.hotspot_min_commits);
    let mut predictions: Vec<_> = report
        .hotspots
        .into_iter()
        .filter(|h| matches!(h.quadrant, hotspots::Quadrant::Danger | hotspots::Quadrant::Legacy))
        .collect();
    predictions.truncate(limit);
    let summary = format!("{} file(s) likely to need attention next", predictions.len());
    Ok(Output::Predict { record: QueryRecord::found(PredictionData { hotspots: predictions }, summary) })
}

fn standup_cmd(root: &std::path::Path) -> Result<Output> {
    let Some(graph) = load_graph(root)? else {
        return Ok(Output::Standup { record: QueryRecord::not_initialized() });
    };
    let stats = file_stats(&graph, root);

    let mut by_recency: Vec<(&String, &FileStats)> = stats.iter().collect();
    by_recency.sort_by(|a, b| b.1.last_modified.cmp(&a.1.last_modified));
    let recent_files: Vec<String> = by_recency.iter().take(10).map(|(f, _)| (*f).clone()).collect();

    let mut owner_totals: HashMap<String, u32> = HashMap::new();
    for s in stats.values() {
        for (author, count) in &s.author_commits {
            *owner_totals.entry(author.clone()).or_insert(0) += count;
        }
    }
    let mut top_contributors: Vec<(String, u32)> = owner_totals.into_iter().collect();
    top_contributors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_contributors.truncate(5);

    let summary = format!(
        "{} recently touched file(s), {} contributor(s)",
        recent_files.len(),
        top_contributors.len()
    );
    Ok(Output::Standup {
        record: QueryRecord::found(StandupData { recent_files, top_contributors }, summary),
    })
}

/// Word-overlap match against the operation registry's name/description,
/// so a natural-language query lands on the closest structured command
/// without a separate intent model.
fn ask_cmd(root: &std::path::Path, query: &str) -> Result<Output> {
    let lower = query.to_ascii_lowercase();
    let words: HashSet<&str> = lower.split_whitespace().collect();

    let best = codekg::contract::operation_registry()
        .iter()
        .map(|op| {
            let haystack = format!("{} {}", op.name.replace('-', " "), op.description);
            let haystack = haystack.to_ascii_lowercase();
            let score = words.iter().filter(|w| haystack.contains(*w)).count();
            (op.name, score)
        })
        .max_by_key(|(_, score)| *score)
        .map(|(name, _)| name)
        .unwrap_or("search");

    let output = match best {
        "health" => health_cmd(root, 0.0).map(|o| o.output)?,
        "hotspots" => hotspots_cmd(root, 10)?,
        "cycles" => cycles_cmd(root)?,
        "bus-factor" => bus_factor_cmd(root)?,
        "velocity" => velocity_cmd(root)?,
        "trajectory" => trajectory_cmd(root, 30)?,
        "drift" => drift_cmd(root)?,
        "breaking-changes" => breaking_changes_cmd(root, true)?,
        "predict" => predict_cmd(root, 5)?,
        "standup" => standup_cmd(root)?,
        "trends" => trends_cmd(root, "all")?,
        _ => search_cmd(root, query, "hybrid", 10)?,
    };

    Ok(Output::Ask {
        routed_to: best.to_string(),
        inner: Box::new(output),
    })
}

// --- output model ----------------------------------------------------------

#[derive(serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Output {
    Scan {
        files: u32,
        nodes: u32,
        edges: u32,
        errors: usize,
        duration_ms: u64,
        health_score: f64,
    },
    Status {
        #[serde(flatten)]
        record: QueryRecord<StatusData>,
    },
    Health {
        #[serde(flatten)]
        record: QueryRecord<health::HealthReport>,
    },
    Hotspots {
        #[serde(flatten)]
        record: QueryRecord<hotspots::HotspotReport>,
    },
    Cycles {
        #[serde(flatten)]
        record: QueryRecord<cycles::CycleReport>,
    },
    BusFactor {
        #[serde(flatten)]
        record: QueryRecord<ownership::OwnershipReport>,
    },
    Coupling {
        #[serde(flatten)]
        record: QueryRecord<CouplingReport>,
    },
    Impact {
        #[serde(flatten)]
        record: QueryRecord<ImpactData>,
    },
    Risk {
        #[serde(flatten)]
        record: QueryRecord<risk::RiskReport>,
    },
    Velocity {
        #[serde(flatten)]
        record: QueryRecord<trends::VelocityReport>,
    },
    Trajectory {
        #[serde(flatten)]
        record: QueryRecord<trends::TrajectoryReport>,
    },
    Drift {
        #[serde(flatten)]
        record: QueryRecord<ChangeSetData>,
    },
    BreakingChanges {
        #[serde(flatten)]
        record: QueryRecord<ChangeSetData>,
    },
    Predict {
        #[serde(flatten)]
        record: QueryRecord<PredictionData>,
    },
    Standup {
        #[serde(flatten)]
        record: QueryRecord<StandupData>,
    },
    Trends {
        #[serde(flatten)]
        record: QueryRecord<trends::TrendReport>,
    },
    Search {
        #[serde(flatten)]
        record: QueryRecord<SearchResultData>,
    },
    Ask {
        routed_to: String,
        #[serde(flatten)]
        inner: Box<Output>,
    },
    Index {
        chunk_count: usize,
        vocabulary_size: usize,
    },
    Clean {
        root: String,
    },
}

#[derive(Debug, Clone, serde::Serialize)]
struct StatusData {
    stale: bool,
    file_count: u32,
    node_count: u32,
    edge_count: u32,
    scanned_at: i64,
    error_count: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
struct ImpactData {
    file: String,
    direct_dependents: Vec<String>,
    indirect_dependents: Vec<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
struct StandupData {
    recent_files: Vec<String>,
    top_contributors: Vec<(String, u32)>,
}

/// `QueryRecord`'s `data` field is `#[serde(flatten)]`, which only works
/// for struct/map payloads, not bare sequences — these wrap the list
/// operations (`drift`, `breaking-changes`, `predict`, `search`) in a
/// single named field so the JSON envelope stays flat and uniform.
#[derive(Debug, Clone, serde::Serialize)]
struct ChangeSetData {
    changes: Vec<SymbolChange>,
}

#[derive(Debug, Clone, serde::Serialize)]
struct PredictionData {
    hotspots: Vec<hotspots::Hotspot>,
}

#[derive(Debug, Clone, serde::Serialize)]
struct SearchResultData {
    results: Vec<semantic::SearchHit>,
}

#[derive(serde::Serialize)]
struct ErrorResponse {
    ok: bool,
    error: ErrorInfo,
}

#[derive(serde::Serialize)]
struct ErrorInfo {
    code: String,
    message: String,
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<EngineError>()
        .map(EngineError::exit_code)
        .unwrap_or(3)
}

fn error_response(err: &anyhow::Error) -> ErrorResponse {
    let code = if let Some(engine_err) = err.downcast_ref::<EngineError>() {
        match engine_err {
            EngineError::NotInitialized(_) => "not_initialized",
            EngineError::NotFound(_) => "not_found",
            EngineError::InvalidInput(_) => "invalid_input",
            EngineError::GitUnavailable(_) => "git_unavailable",
            EngineError::Io { .. } => "io",
            EngineError::Parse { .. } => "parse",
            EngineError::Timeout(_) => "timeout",
            EngineError::InternalInvariantViolation(_) => "internal",
        }
    } else {
        "internal"
    };

    ErrorResponse {
        ok: false,
        error: ErrorInfo {
            code: code.to_string(),
            message: err.to_string(),
        },
    }
}

fn print_human_readable(output: &Output) {
    match output {
        Output::Scan { files, nodes, edges, errors, duration_ms, health_score } => {
            println!("Scanned {files} file(s): {nodes} node(s), {edges} edge(s), {errors} error(s) in {duration_ms}ms");
            println!("Health score: {health_score:.1}/100");
        }
        Output::Status { record } => print_record(record, "Status"),
        Output::Health { record } => print_record(record, "Health"),
        Output::Hotspots { record } => print_record(record, "Hotspots"),
        Output::Cycles { record } => print_record(record, "Cycles"),
        Output::BusFactor { record } => print_record(record, "Bus factor"),
        Output::Coupling { record } => print_record(record, "Coupling"),
        Output::Impact { record } => print_record(record, "Impact"),
        Output::Risk { record } => print_record(record, "Risk"),
        Output::Velocity { record } => print_record(record, "Velocity"),
        Output::Trajectory { record } => print_record(record, "Trajectory"),
        Output::Drift { record } => print_record(record, "Drift"),
        Output::BreakingChanges { record } => print_record(record, "Breaking changes"),
        Output::Predict { record } => print_record(record, "Predict"),
        Output::Standup { record } => print_record(record, "Standup"),
        Output::Trends { record } => print_record(record, "Trends"),
        Output::Search { record } => print_record(record, "Search"),
        Output::Ask { routed_to, inner } => {
            println!("(routed to `{routed_to}`)");
            print_human_readable(inner);
        }
        Output::Index { chunk_count, vocabulary_size } => {
            println!("Built semantic index: {chunk_count} chunk(s), {vocabulary_size} term(s)");
        }
        Output::Clean { root } => println!("Removed on-disk graph under {root}"),
    }
}

fn print_record<T: serde::Serialize>(record: &QueryRecord<T>, label: &str) {
    println!("{label}: {}", record.summary);
    if record.found {
        if let Some(data) = &record.data {
            if let Ok(pretty) = serde_json::to_string_pretty(data) {
                println!("{pretty}");
            }
        }
    }
}
