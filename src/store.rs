//! On-disk persistence for the knowledge graph: atomic save/load, a
//! header-only metadata sidecar for fast staleness checks, an append-only
//! snapshot log, and the last-scan error list.
//!
//! Everything lives under a `.codekg` directory. The atomic-write step
//! (temp file + rename) uses an explicit temp path rather than relying on
//! `fs::write` alone, since the graph document can be large enough that a
//! partial write under concurrent readers would matter.

use crate::error::{EngineError, Result};
use crate::types::{GraphMetadata, KnowledgeGraph, ScanError, Snapshot};
use std::fs;
use std::path::{Path, PathBuf};

pub const STORE_DIR: &str = ".codekg";
pub const GRAPH_FILE: &str = "graph.json";
pub const META_FILE: &str = "meta.json";
pub const SNAPSHOTS_FILE: &str = "snapshots.jsonl";
pub const ERRORS_FILE: &str = "errors.json";
pub const EMBEDDINGS_DIR: &str = "embeddings";

pub fn store_dir(root: &Path) -> PathBuf {
    root.join(STORE_DIR)
}

fn graph_path(root: &Path) -> PathBuf {
    store_dir(root).join(GRAPH_FILE)
}

fn meta_path(root: &Path) -> PathBuf {
    store_dir(root).join(META_FILE)
}

fn snapshots_path(root: &Path) -> PathBuf {
    store_dir(root).join(SNAPSHOTS_FILE)
}

fn errors_path(root: &Path) -> PathBuf {
    store_dir(root).join(ERRORS_FILE)
}

pub fn embeddings_dir(root: &Path) -> PathBuf {
    store_dir(root).join(EMBEDDINGS_DIR)
}

fn ensure_store_dir(root: &Path) -> Result<PathBuf> {
    let dir = store_dir(root);
    fs::create_dir_all(&dir).map_err(|e| EngineError::io(dir.clone(), e))?;
    Ok(dir)
}

/// Write `graph` to `<root>/.codekg/graph.json` (temp file + rename, so
/// concurrent readers only ever see a complete file), refresh the
/// header-only `meta.json` sidecar, and replace `errors.json` with the
/// current run's per-file failures. Snapshotting is a separate step
/// ([`append_snapshot`]) left to the caller, since the policy of *when*
/// to snapshot (every scan vs. on material change) lives above this layer.
pub fn save_to(root: &Path, graph: &KnowledgeGraph) -> Result<()> {
    let dir = ensure_store_dir(root)?;

    let path = graph_path(root);
    let tmp = dir.join(format!("{GRAPH_FILE}.tmp"));
    let data = serde_json::to_vec_pretty(graph)
        .map_err(|e| EngineError::parse(path.clone(), e.to_string()))?;
    fs::write(&tmp, &data).map_err(|e| EngineError::io(tmp.clone(), e))?;
    fs::rename(&tmp, &path).map_err(|e| EngineError::io(path.clone(), e))?;

    save_metadata(root, &graph.metadata)?;
    save_errors(root, &graph.errors)?;

    Ok(())
}

fn save_metadata(root: &Path, metadata: &GraphMetadata) -> Result<()> {
    let path = meta_path(root);
    let tmp = store_dir(root).join(format!("{META_FILE}.tmp"));
    let data = serde_json::to_vec_pretty(metadata)
        .map_err(|e| EngineError::parse(path.clone(), e.to_string()))?;
    fs::write(&tmp, &data).map_err(|e| EngineError::io(tmp.clone(), e))?;
    fs::rename(&tmp, &path).map_err(|e| EngineError::io(path.clone(), e))?;
    Ok(())
}

fn save_errors(root: &Path, errors: &[ScanError]) -> Result<()> {
    let path = errors_path(root);
    let data =
        serde_json::to_vec_pretty(errors).map_err(|e| EngineError::parse(path.clone(), e.to_string()))?;
    fs::write(&path, data).map_err(|e| EngineError::io(path, e))?;
    Ok(())
}

/// Load the full graph, or `None` if no graph has been saved yet.
pub fn load(root: &Path) -> Result<Option<KnowledgeGraph>> {
    let path = graph_path(root);
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read(&path).map_err(|e| EngineError::io(path.clone(), e))?;
    let graph: KnowledgeGraph =
        serde_json::from_slice(&data).map_err(|e| EngineError::parse(path, e.to_string()))?;
    Ok(Some(graph))
}

/// Load just the header, for fast staleness/status checks that don't need
/// the full node/edge payload.
pub fn load_metadata(root: &Path) -> Result<Option<GraphMetadata>> {
    let path = meta_path(root);
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read(&path).map_err(|e| EngineError::io(path.clone(), e))?;
    let metadata: GraphMetadata =
        serde_json::from_slice(&data).map_err(|e| EngineError::parse(path, e.to_string()))?;
    Ok(Some(metadata))
}

pub fn load_errors(root: &Path) -> Result<Vec<ScanError>> {
    let path = errors_path(root);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = fs::read(&path).map_err(|e| EngineError::io(path.clone(), e))?;
    serde_json::from_slice(&data).map_err(|e| EngineError::parse(path, e.to_string()))
}

/// `true` when the newest discoverable source file's mtime is newer than
/// the graph's `scannedAt`. Considers only discoverable source files, not
/// arbitrary project config.
pub fn is_stale(root: &Path, source_files: &[PathBuf]) -> Result<bool> {
    let Some(metadata) = load_metadata(root)? else {
        return Ok(true);
    };
    let mut newest = 0i64;
    for file in source_files {
        if let Ok(meta) = fs::metadata(file) {
            if let Ok(modified) = meta.modified() {
                if let Ok(secs) = modified.duration_since(std::time::UNIX_EPOCH) {
                    newest = newest.max(secs.as_secs() as i64);
                }
            }
        }
    }
    Ok(newest > metadata.scanned_at)
}

/// Append a snapshot to the on-disk log. Snapshots are immutable once
/// written — this never rewrites an existing line.
pub fn append_snapshot(root: &Path, snapshot: &Snapshot) -> Result<()> {
    use std::io::Write;

    ensure_store_dir(root)?;
    let path = snapshots_path(root);
    let line = serde_json::to_string(snapshot)
        .map_err(|e| EngineError::parse(path.clone(), e.to_string()))?;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| EngineError::io(path.clone(), e))?;
    writeln!(file, "{line}").map_err(|e| EngineError::io(path, e))?;
    Ok(())
}

/// Read every snapshot, oldest-first in file order; callers that want
/// newest-first should reverse.
pub fn load_snapshots(root: &Path) -> Result<Vec<Snapshot>> {
    let path = snapshots_path(root);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(&path).map_err(|e| EngineError::io(path.clone(), e))?;
    let mut snapshots = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let snapshot: Snapshot = serde_json::from_str(line)
            .map_err(|e| EngineError::parse(path.clone(), format!("line {}: {}", i + 1, e)))?;
        snapshots.push(snapshot);
    }
    Ok(snapshots)
}

/// Drop the cached graph, metadata, and error list. Snapshots are
/// preserved, per spec.
pub fn clean(root: &Path) -> Result<()> {
    for path in [graph_path(root), meta_path(root), errors_path(root)] {
        if path.exists() {
            fs::remove_file(&path).map_err(|e| EngineError::io(path, e))?;
        }
    }
    let embeddings = embeddings_dir(root);
    if embeddings.exists() {
        fs::remove_dir_all(&embeddings).map_err(|e| EngineError::io(embeddings, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SnapshotMetrics;
    use tempfile::TempDir;

    fn sample_graph(root: &Path) -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new(root.display().to_string());
        graph.metadata.scanned_at = 1_000;
        graph.canonicalize();
        graph
    }

    #[test]
    fn round_trips_graph_and_metadata() {
        let dir = TempDir::new().unwrap();
        let graph = sample_graph(dir.path());
        save_to(dir.path(), &graph).unwrap();

        let loaded = load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.metadata.scanned_at, graph.metadata.scanned_at);

        let metadata = load_metadata(dir.path()).unwrap().unwrap();
        assert_eq!(metadata.scanned_at, 1_000);
    }

    #[test]
    fn missing_graph_loads_as_none() {
        let dir = TempDir::new().unwrap();
        assert!(load(dir.path()).unwrap().is_none());
        assert!(load_metadata(dir.path()).unwrap().is_none());
    }

    #[test]
    fn staleness_compares_against_newest_source_mtime() {
        let dir = TempDir::new().unwrap();
        let graph = sample_graph(dir.path());
        save_to(dir.path(), &graph).unwrap();

        let file = dir.path().join("fresh.rs");
        fs::write(&file, "fn main() {}\n").unwrap();
        // The written file's mtime is "now", well after scanned_at = 1_000.
        assert!(is_stale(dir.path(), &[file]).unwrap());
    }

    #[test]
    fn no_graph_is_always_stale() {
        let dir = TempDir::new().unwrap();
        assert!(is_stale(dir.path(), &[]).unwrap());
    }

    #[test]
    fn snapshots_are_appended_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let snap = |score: f64| Snapshot {
            timestamp: 1,
            commit_hash: None,
            metrics: SnapshotMetrics {
                health_score: score,
                avg_complexity: 1.0,
                hotspot_count: 0,
                file_count: 1,
                total_lines: 10,
            },
        };
        append_snapshot(dir.path(), &snap(60.0)).unwrap();
        append_snapshot(dir.path(), &snap(65.0)).unwrap();

        let snapshots = load_snapshots(dir.path()).unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].metrics.health_score, 60.0);
        assert_eq!(snapshots[1].metrics.health_score, 65.0);
    }

    #[test]
    fn clean_preserves_snapshots() {
        let dir = TempDir::new().unwrap();
        let graph = sample_graph(dir.path());
        save_to(dir.path(), &graph).unwrap();
        append_snapshot(
            dir.path(),
            &Snapshot {
                timestamp: 1,
                commit_hash: None,
                metrics: SnapshotMetrics {
                    health_score: 60.0,
                    avg_complexity: 1.0,
                    hotspot_count: 0,
                    file_count: 1,
                    total_lines: 10,
                },
            },
        )
        .unwrap();

        clean(dir.path()).unwrap();

        assert!(load(dir.path()).unwrap().is_none());
        assert_eq!(load_snapshots(dir.path()).unwrap().len(), 1);
    }
}
