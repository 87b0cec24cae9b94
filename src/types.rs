//! Core data model for the knowledge graph.
//!
//! This defines the typed node/edge graph extracted from a source tree:
//! files, symbols, and their relations (imports, calls, containment), plus
//! the metadata block and snapshot record used for staleness checks and
//! temporal trend analysis.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Discriminator for a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    File,
    Function,
    Class,
    Interface,
    Type,
    Variable,
    Enum,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Function => "function",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Type => "type",
            Self::Variable => "variable",
            Self::Enum => "enum",
        }
    }
}

/// A node in the knowledge graph.
///
/// `id` is a stable string, injective across a single scan: file nodes are
/// keyed by normalized relative path, symbol nodes by `"{file}::{name}"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: String,
    pub file_path: String,
    pub line_start: usize,
    pub line_end: usize,
    pub exported: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_async: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u32>,

    // File-only fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contributors: Vec<String>,

    /// Catch-all for fields unknown to this schema version, preserved
    /// verbatim on load-then-save round trips.
    #[serde(flatten, default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Node {
    pub fn new_file(id: impl Into<String>, file_path: impl Into<String>, line_count: usize) -> Self {
        let file_path = file_path.into();
        Self {
            id: id.into(),
            node_type: NodeType::File,
            name: file_path.clone(),
            file_path,
            line_start: 1,
            line_end: line_count.max(1),
            exported: true,
            complexity: None,
            documentation: None,
            parameters: Vec::new(),
            return_type: None,
            is_async: None,
            extends: None,
            member_count: None,
            line_count: Some(line_count),
            import_count: None,
            export_count: None,
            language: None,
            last_modified: None,
            modification_count: None,
            contributors: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn new_symbol(
        id: impl Into<String>,
        node_type: NodeType,
        name: impl Into<String>,
        file_path: impl Into<String>,
        line_start: usize,
        line_end: usize,
    ) -> Self {
        Self {
            id: id.into(),
            node_type,
            name: name.into(),
            file_path: file_path.into(),
            line_start,
            line_end,
            exported: false,
            complexity: None,
            documentation: None,
            parameters: Vec::new(),
            return_type: None,
            is_async: None,
            extends: None,
            member_count: None,
            line_count: None,
            import_count: None,
            export_count: None,
            language: None,
            last_modified: None,
            modification_count: None,
            contributors: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.node_type == NodeType::File
    }
}

/// Discriminator for a graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Imports,
    Calls,
    Extends,
    Contains,
    Defines,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Imports => "imports",
            Self::Calls => "calls",
            Self::Extends => "extends",
            Self::Contains => "contains",
            Self::Defines => "defines",
        }
    }
}

/// Metadata attached to an `imports` edge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportMetadata {
    /// Imported symbol names; for `use foo as bar` the alias (`bar`) is
    /// what's recorded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub is_dynamic: bool,
}

/// An edge in the knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImportMetadata>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, edge_type: EdgeType) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            edge_type,
            metadata: None,
        }
    }

    pub fn with_import_metadata(mut self, metadata: ImportMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Sort key used to canonicalize edge ordering: `(source, type, target)`.
    pub fn sort_key(&self) -> (&str, &'static str, &str) {
        (&self.source, self.edge_type.as_str(), &self.target)
    }
}

/// Scan-level metadata for the whole graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub root_dir: String,
    /// Unix timestamp (seconds) at which the scan completed.
    pub scanned_at: i64,
    pub file_count: u32,
    pub total_lines: u64,
    pub node_count: u32,
    pub edge_count: u32,
    #[serde(default)]
    pub scan_duration_ms: u64,
    #[serde(default)]
    pub files_by_language: HashMap<String, u32>,
}

/// A single parse or I/O failure recorded during a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanError {
    pub file_path: String,
    pub kind: String,
    pub message: String,
}

/// The canonical serialized graph document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub schema_version: u32,
    pub metadata: GraphMetadata,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub errors: Vec<ScanError>,
}

pub const SCHEMA_VERSION: u32 = 1;

impl KnowledgeGraph {
    pub fn new(root_dir: impl Into<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            metadata: GraphMetadata {
                root_dir: root_dir.into(),
                scanned_at: 0,
                file_count: 0,
                total_lines: 0,
                node_count: 0,
                edge_count: 0,
                scan_duration_ms: 0,
                files_by_language: HashMap::new(),
            },
            nodes: Vec::new(),
            edges: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Canonicalize node/edge ordering: nodes by id, edges by
    /// `(source, type, target)`. Also recomputes the summary counters in
    /// `metadata` so callers never need to keep them in sync by hand.
    pub fn canonicalize(&mut self) {
        self.nodes.sort_by(|a, b| a.id.cmp(&b.id));
        self.edges.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self.metadata.file_count = self.nodes.iter().filter(|n| n.is_file()).count() as u32;
        self.metadata.node_count = self.nodes.len() as u32;
        self.metadata.edge_count = self.edges.len() as u32;
    }

    pub fn file_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_file())
    }

    pub fn symbol_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| !n.is_file())
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn imports_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| e.edge_type == EdgeType::Imports)
    }

    /// Direct importers of `target_id` (files with an `imports` edge into it).
    pub fn direct_dependents(&self, target_id: &str) -> Vec<&str> {
        self.imports_edges()
            .filter(|e| e.target == target_id)
            .map(|e| e.source.as_str())
            .collect()
    }

    /// Direct imports of `source_id`.
    pub fn direct_dependencies(&self, source_id: &str) -> Vec<&str> {
        self.imports_edges()
            .filter(|e| e.source == source_id)
            .map(|e| e.target.as_str())
            .collect()
    }
}

/// Headline metrics captured in a snapshot, used by the trend/velocity
/// analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetrics {
    pub health_score: f64,
    pub avg_complexity: f64,
    pub hotspot_count: u32,
    pub file_count: u32,
    pub total_lines: u64,
}

/// An immutable, append-only snapshot record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
    pub metrics: SnapshotMetrics,
}

/// Per-file git-derived attributes, merged into file nodes during assembly
/// and also consumed directly by the bus-factor and coupling analyzers.
#[derive(Debug, Clone, Default)]
pub struct FileGitInfo {
    pub last_modified: Option<i64>,
    pub modification_count: u32,
    pub contributors: Vec<String>,
}

/// A deletion event recorded by the git history analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionEvent {
    pub path: String,
    pub date: i64,
    pub last_author: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_sorts_nodes_and_edges() {
        let mut g = KnowledgeGraph::new("/repo");
        g.nodes.push(Node::new_file("b.rs", "b.rs", 10));
        g.nodes.push(Node::new_file("a.rs", "a.rs", 5));
        g.edges.push(Edge::new("b.rs", "a.rs", EdgeType::Imports));
        g.edges.push(Edge::new("a.rs", "b.rs", EdgeType::Imports));
        g.canonicalize();
        assert_eq!(g.nodes[0].id, "a.rs");
        assert_eq!(g.nodes[1].id, "b.rs");
        assert_eq!(g.edges[0].source, "a.rs");
        assert_eq!(g.metadata.file_count, 2);
        assert_eq!(g.metadata.node_count, 2);
        assert_eq!(g.metadata.edge_count, 2);
    }

    #[test]
    fn direct_dependents_and_dependencies() {
        let mut g = KnowledgeGraph::new("/repo");
        g.edges.push(Edge::new("a.rs", "b.rs", EdgeType::Imports));
        g.edges.push(Edge::new("c.rs", "b.rs", EdgeType::Imports));
        let mut dependents = g.direct_dependents("b.rs");
        dependents.sort();
        assert_eq!(dependents, vec!["a.rs", "c.rs"]);
        assert_eq!(g.direct_dependencies("a.rs"), vec!["b.rs"]);
    }
}
