//! Knowledge graph assembly: merges file discovery, per-language parsing,
//! import resolution, and git history into one canonical [`KnowledgeGraph`].
//!
//! Discovers files, parses each with tree-sitter, wires import edges, and
//! additionally extracts symbols/calls and merges in git history, across
//! the full set of node and edge types the graph persists.

use crate::config::Config;
use crate::discovery::FileDiscovery;
use crate::error::{EngineError, Result};
use crate::git::GitHistoryAnalyzer;
use crate::parsing::{parser_for_file, CallEdge, ImportInfo, SymbolDef, SymbolKind, Visibility};
use crate::resolve::FileIndex;
use crate::types::{
    Edge, EdgeType, GraphMetadata, ImportMetadata, KnowledgeGraph, Node, NodeType, ScanError,
};
use lasso::ThreadedRodeo;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tree_sitter::Parser;

/// Builds a [`KnowledgeGraph`] for a source tree in one pass.
pub struct GraphBuilder;

/// Everything extracted from a single file, before it's merged into the
/// graph (needs every other file's output first, to resolve imports).
struct ParsedFile {
    rel_path: String,
    abs_path: PathBuf,
    language: Option<&'static str>,
    line_count: usize,
    symbols: Vec<SymbolDef>,
    calls: Vec<CallEdge>,
    imports: Vec<ImportInfo>,
    error: Option<ScanError>,
}

impl GraphBuilder {
    /// Run a full scan of `root` and return the assembled graph. Git
    /// history is merged in on a best-effort basis: an unavailable git
    /// repository does not fail the scan, per spec.
    pub fn build(root: &Path, config: &Config) -> Result<KnowledgeGraph> {
        let start = Instant::now();

        let mut discovery = FileDiscovery::new().with_max_file_size(config.discovery.max_file_size_bytes);
        for pattern in &config.discovery.include {
            discovery = discovery.with_include(pattern);
        }
        for pattern in &config.discovery.exclude {
            discovery = discovery.with_exclude(pattern);
        }
        if config.discovery.include_hidden {
            discovery = discovery.include_hidden();
        }

        let files = discovery
            .discover(root)
            .map_err(|e| EngineError::parse(root.to_path_buf(), e.to_string()))?;

        let interner = ThreadedRodeo::new();
        let parsed: Vec<ParsedFile> = files
            .par_iter()
            .map(|abs_path| parse_file(root, abs_path, &interner))
            .collect();

        let source_files: HashSet<String> = parsed
            .iter()
            .filter(|p| p.language.is_some())
            .map(|p| p.rel_path.clone())
            .collect();

        let git_history = GitHistoryAnalyzer::analyze(root, &source_files).ok();

        let file_pairs: Vec<(&str, &str)> = parsed
            .iter()
            .map(|p| (p.rel_path.as_str(), p.rel_path.as_str()))
            .collect();
        let file_index = FileIndex::new(root, file_pairs);

        let mut graph = KnowledgeGraph::new(root.display().to_string());
        let mut total_lines: u64 = 0;
        let mut files_by_language: HashMap<String, u32> = HashMap::new();

        // Pass 1: emit nodes (file + symbol) and the within-file structural
        // edges (defines/contains/extends), tracking enough bookkeeping to
        // wire cross-cutting edges (imports/calls) in pass 2.
        let mut caller_ids: HashMap<String, String> = HashMap::new(); // "rel::scoped" -> node id (same thing, kept for clarity)
        let mut name_index: HashMap<String, Vec<String>> = HashMap::new(); // simple name -> candidate function/method node ids

        for file in &parsed {
            total_lines += file.line_count as u64;
            if let Some(lang) = file.language {
                *files_by_language.entry(lang.to_string()).or_insert(0) += 1;
            }
            if let Some(err) = &file.error {
                graph.errors.push(err.clone());
            }

            let file_id = file.rel_path.clone();
            let mut file_node = Node::new_file(file_id.clone(), file_id.clone(), file.line_count);
            file_node.language = file.language.map(|s| s.to_string());
            file_node.import_count = Some(file.imports.len() as u32);

            if let Some(history) = &git_history {
                if let Some(stats) = history.files.get(&file_id) {
                    let info = stats.to_file_git_info();
                    file_node.last_modified = info.last_modified;
                    file_node.modification_count = Some(info.modification_count);
                    file_node.contributors = info.contributors;
                }
            }

            // name -> node id, scoped to this file, for parent/extends lookups.
            let mut type_ids: HashMap<String, String> = HashMap::new();
            let mut member_counts: HashMap<String, u32> = HashMap::new();
            let mut impl_extends: HashMap<String, String> = HashMap::new();

            for symbol in &file.symbols {
                let name = interner.resolve(&symbol.name).to_string();
                let scoped_name = interner.resolve(&symbol.scoped_name).to_string();

                if symbol.kind == SymbolKind::Impl {
                    if let Some(trait_name) = &symbol.extends {
                        impl_extends.entry(name.clone()).or_insert_with(|| trait_name.clone());
                    }
                    continue;
                }
                if symbol.kind == SymbolKind::Module {
                    continue;
                }

                let Some(node_type) = node_type_for(symbol.kind) else {
                    continue;
                };

                let node_id = format!("{file_id}::{scoped_name}");
                let (start, end) = line_range(symbol);
                let mut node = Node::new_symbol(node_id.clone(), node_type, name.clone(), file_id.clone(), start, end);
                node.exported = symbol.visibility == Visibility::Public;
                node.complexity = symbol.complexity;
                node.documentation = symbol.doc_comment.clone();
                node.extends = symbol.extends.clone();
                if let Some(sig) = &symbol.signature {
                    node.parameters = sig.params.clone();
                    node.return_type = sig.return_type.clone();
                    node.is_async = Some(sig.is_async);
                }

                if matches!(node_type, NodeType::Class | NodeType::Interface | NodeType::Enum) {
                    type_ids.insert(name.clone(), node_id.clone());
                }
                if matches!(symbol.kind, SymbolKind::Function | SymbolKind::Method) {
                    name_index.entry(name.clone()).or_default().push(node_id.clone());
                }

                caller_ids.insert(format!("{file_id}::{scoped_name}"), node_id.clone());

                if let Some(parent_name) = symbol.parent.map(|p| interner.resolve(&p).to_string()) {
                    *member_counts.entry(parent_name).or_insert(0) += 1;
                }

                graph.edges.push(Edge::new(file_id.clone(), node_id.clone(), EdgeType::Defines));
                graph.nodes.push(node);
            }

            // Wire parent -> member Contains edges and member_count, now that
            // every symbol in the file has a node id.
            for symbol in &file.symbols {
                let Some(parent_id) = symbol.parent else { continue };
                let parent_name = interner.resolve(&parent_id).to_string();
                let Some(parent_node_id) = type_ids.get(&parent_name) else { continue };
                let scoped_name = interner.resolve(&symbol.scoped_name).to_string();
                let child_id = format!("{file_id}::{scoped_name}");
                if graph.nodes.iter().any(|n| n.id == child_id) {
                    graph
                        .edges
                        .push(Edge::new(parent_node_id.clone(), child_id, EdgeType::Contains));
                }
            }

            for (type_name, node_id) in &type_ids {
                if let Some(count) = member_counts.get(type_name) {
                    if let Some(node) = graph.nodes.iter_mut().find(|n| &n.id == node_id) {
                        node.member_count = Some(*count);
                    }
                }
                if node_needs_extends(&graph, node_id) {
                    if let Some(trait_name) = impl_extends.get(type_name) {
                        if let Some(node) = graph.nodes.iter_mut().find(|n| &n.id == node_id) {
                            node.extends = Some(trait_name.clone());
                        }
                    }
                }
            }

            let export_count = file
                .symbols
                .iter()
                .filter(|s| s.visibility == Visibility::Public)
                .count() as u32;
            file_node.export_count = Some(export_count);
            let file_complexity = file.symbols.iter().filter_map(|s| s.complexity).max();
            file_node.complexity = file_complexity;

            graph.nodes.push(file_node);

            // Calls edges: caller is keyed by the same (file, scoped-name)
            // id other symbols in this file already use.
            for call in &file.calls {
                let caller_scoped = interner.resolve(&call.caller).to_string();
                let Some(caller_id) = caller_ids.get(&format!("{file_id}::{caller_scoped}")) else {
                    continue;
                };
                if let Some(target_id) = resolve_callee(&name_index, &file_id, &call.callee_name) {
                    graph
                        .edges
                        .push(Edge::new(caller_id.clone(), target_id, EdgeType::Calls));
                }
            }
        }

        // Pass 2: imports edges, now that every file node exists.
        for file in &parsed {
            for import in &file.imports {
                let target = if file.language == Some("rust") {
                    file_index.resolve_rust_path(&file.rel_path, &import.path)
                } else {
                    file_index.resolve_relative(&file.rel_path, &import.path)
                };
                let Some(target_id) = target else { continue };
                if target_id == file.rel_path {
                    continue;
                }
                let metadata = ImportMetadata {
                    symbols: vec![import.name.clone()],
                    is_dynamic: false,
                };
                graph.edges.push(
                    Edge::new(file.rel_path.clone(), target_id.to_string(), EdgeType::Imports)
                        .with_import_metadata(metadata),
                );
            }
        }

        graph.metadata = GraphMetadata {
            root_dir: root.display().to_string(),
            scanned_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs() as i64,
            file_count: 0,
            total_lines,
            node_count: 0,
            edge_count: 0,
            scan_duration_ms: start.elapsed().as_millis() as u64,
            files_by_language,
        };
        graph.canonicalize();

        Ok(graph)
    }
}

fn node_type_for(kind: SymbolKind) -> Option<NodeType> {
    match kind {
        SymbolKind::Function | SymbolKind::Method => Some(NodeType::Function),
        SymbolKind::Struct => Some(NodeType::Class),
        SymbolKind::Enum => Some(NodeType::Enum),
        SymbolKind::Trait | SymbolKind::Interface => Some(NodeType::Interface),
        SymbolKind::Const | SymbolKind::Static | SymbolKind::Variable => Some(NodeType::Variable),
        SymbolKind::TypeAlias => Some(NodeType::Type),
        SymbolKind::Module | SymbolKind::Impl => None,
    }
}

fn line_range(symbol: &SymbolDef) -> (usize, usize) {
    let start = symbol.location.start_line.max(1);
    let end = symbol.location.end_line.max(start);
    (start, end)
}

fn node_needs_extends(graph: &KnowledgeGraph, node_id: &str) -> bool {
    graph
        .nodes
        .iter()
        .find(|n| n.id == node_id)
        .map(|n| n.extends.is_none())
        .unwrap_or(false)
}

/// Resolve a call's callee name to a node id: prefer a same-file candidate,
/// otherwise fall back to a unique whole-graph candidate. Ambiguous names
/// (the same function name defined in multiple files) are left unresolved
/// rather than risk a spurious edge.
fn resolve_callee(
    name_index: &HashMap<String, Vec<String>>,
    file_id: &str,
    callee_name: &str,
) -> Option<String> {
    let candidates = name_index.get(callee_name)?;
    if let Some(same_file) = candidates.iter().find(|id| id.starts_with(&format!("{file_id}::"))) {
        return Some(same_file.clone());
    }
    if candidates.len() == 1 {
        return Some(candidates[0].clone());
    }
    None
}

fn parse_file(root: &Path, abs_path: &Path, interner: &ThreadedRodeo) -> ParsedFile {
    let rel_path = rel_path_string(root, abs_path);

    let source = match std::fs::read_to_string(abs_path) {
        Ok(s) => s,
        Err(e) => {
            return ParsedFile {
                rel_path: rel_path.clone(),
                abs_path: abs_path.to_path_buf(),
                language: None,
                line_count: 0,
                symbols: Vec::new(),
                calls: Vec::new(),
                imports: Vec::new(),
                error: Some(ScanError {
                    file_path: rel_path,
                    kind: "io".to_string(),
                    message: e.to_string(),
                }),
            };
        }
    };

    let line_count = bytecount::count(source.as_bytes(), b'\n') + usize::from(!source.ends_with('\n') && !source.is_empty());

    let Some(lang_parser) = parser_for_file(abs_path) else {
        return ParsedFile {
            rel_path: rel_path.clone(),
            abs_path: abs_path.to_path_buf(),
            language: None,
            line_count,
            symbols: Vec::new(),
            calls: Vec::new(),
            imports: Vec::new(),
            error: None,
        };
    };

    let mut parser = Parser::new();
    if parser.set_language(&lang_parser.language()).is_err() {
        return ParsedFile {
            rel_path: rel_path.clone(),
            abs_path: abs_path.to_path_buf(),
            language: Some(lang_parser.language_name()),
            line_count,
            symbols: Vec::new(),
            calls: Vec::new(),
            imports: Vec::new(),
            error: Some(ScanError {
                file_path: rel_path,
                kind: "parse".to_string(),
                message: "failed to initialize parser".to_string(),
            }),
        };
    };

    let Some(tree) = parser.parse(&source, None) else {
        return ParsedFile {
            rel_path: rel_path.clone(),
            abs_path: abs_path.to_path_buf(),
            language: Some(lang_parser.language_name()),
            line_count,
            symbols: Vec::new(),
            calls: Vec::new(),
            imports: Vec::new(),
            error: Some(ScanError {
                file_path: rel_path,
                kind: "parse".to_string(),
                message: "tree-sitter parse failed".to_string(),
            }),
        };
    };

    let symbols = lang_parser
        .extract_symbols(&tree, &source, abs_path, interner)
        .unwrap_or_default();
    let calls = lang_parser
        .extract_calls(&tree, &source, abs_path, interner)
        .unwrap_or_default();
    let imports = lang_parser
        .extract_imports(&tree, &source, abs_path)
        .unwrap_or_default();

    ParsedFile {
        rel_path,
        abs_path: abs_path.to_path_buf(),
        language: Some(lang_parser.language_name()),
        line_count,
        symbols,
        calls,
        imports,
        error: None,
    }
}

fn rel_path_string(root: &Path, abs_path: &Path) -> String {
    abs_path
        .strip_prefix(root)
        .unwrap_or(abs_path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn builds_file_and_symbol_nodes_with_defines_edges() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "src/lib.rs",
            "pub fn greet() -> String {\n    String::from(\"hi\")\n}\n",
        );

        let config = Config::default();
        let graph = GraphBuilder::build(dir.path(), &config).unwrap();

        let file_node = graph.node("src/lib.rs").unwrap();
        assert_eq!(file_node.node_type, NodeType::File);
        assert_eq!(file_node.language.as_deref(), Some("rust"));

        let greet = graph
            .nodes
            .iter()
            .find(|n| n.name == "greet")
            .expect("greet symbol node");
        assert_eq!(greet.node_type, NodeType::Function);
        assert!(greet.exported);

        assert!(graph
            .edges
            .iter()
            .any(|e| e.edge_type == EdgeType::Defines && e.source == "src/lib.rs" && e.target == greet.id));
    }

    #[test]
    fn wires_import_edges_between_rust_modules() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/lib.rs", "mod helper;\nfn main() { helper::run(); }\n");
        write(dir.path(), "src/helper.rs", "pub fn run() {}\n");

        let config = Config::default();
        let graph = GraphBuilder::build(dir.path(), &config).unwrap();

        assert!(graph.edges.iter().any(|e| {
            e.edge_type == EdgeType::Imports && e.source == "src/lib.rs" && e.target == "src/helper.rs"
        }));
    }

    #[test]
    fn records_parse_error_but_still_emits_file_node() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/weird.rs", "fn (\n");

        let config = Config::default();
        let graph = GraphBuilder::build(dir.path(), &config).unwrap();

        assert!(graph.node("src/weird.rs").is_some());
    }

    #[test]
    fn class_contains_methods_and_tracks_member_count() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "src/widget.ts",
            "export class Widget {\n    render(): void {}\n    hide(): void {}\n}\n",
        );

        let config = Config::default();
        let graph = GraphBuilder::build(dir.path(), &config).unwrap();

        let widget = graph
            .nodes
            .iter()
            .find(|n| n.name == "Widget")
            .expect("widget class node");
        assert_eq!(widget.member_count, Some(2));

        let render = graph.nodes.iter().find(|n| n.name == "render").unwrap();
        assert!(graph
            .edges
            .iter()
            .any(|e| e.edge_type == EdgeType::Contains && e.source == widget.id && e.target == render.id));
    }
}
