//! Deterministic semantic index: TF-IDF over per-symbol/per-file chunks,
//! with keyword, semantic (vector cosine), and hybrid search modes.
//!
//! Deliberately avoids ONNX embeddings and an HNSW nearest-neighbor index:
//! those are nondeterministic across model versions and depend on a model
//! download, which doesn't fit a reproducible knowledge graph. Instead
//! this builds an index once and queries it many times over a
//! deterministic sparse TF-IDF vector space, tokenized by
//! [`crate::search::tokenize`] (camelCase/snake_case splitting, reused
//! directly rather than re-implemented here).

use crate::search::tokenize;
use crate::types::KnowledgeGraph;
use serde::Serialize;
use std::collections::HashMap;

const MIN_TOKEN_LEN: usize = 2;
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "into", "are", "was", "were", "fn", "pub",
    "let", "mut", "impl", "use", "mod", "self",
];

/// Canonical term -> alternative spellings, expanded into the query vector
/// so e.g. "auth" also matches chunks mentioning "authentication".
const SYNONYMS: &[(&str, &[&str])] = &[
    ("auth", &["authentication", "authorization"]),
    ("config", &["configuration", "settings"]),
    ("err", &["error", "failure"]),
    ("db", &["database"]),
    ("init", &["initialize", "setup"]),
    ("ctx", &["context"]),
];

#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    pub id: String,
    pub file: String,
    pub name: String,
    pub is_file: bool,
    pub exported: bool,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SemanticIndex {
    pub chunks: Vec<Chunk>,
    /// term -> document frequency.
    pub vocabulary: HashMap<String, u32>,
    /// term -> IDF weight.
    pub idf: HashMap<String, f64>,
    /// chunk index -> sparse term -> TF-IDF weight.
    pub vectors: Vec<HashMap<String, f64>>,
    pub chunk_count: usize,
    pub vocabulary_size: usize,
}

fn tokenize_text(text: &str) -> Vec<String> {
    tokenize(text)
        .map(|t| t.to_ascii_lowercase())
        .filter(|t| t.len() >= MIN_TOKEN_LEN && !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

fn chunk_text(chunk: &Chunk) -> String {
    format!("{} {} {}", chunk.name, chunk.file, chunk.text)
}

/// Build the index from every file and symbol node in the graph: one
/// chunk per file, one per symbol, `text` combining name, documentation,
/// and file path as the surrounding textual neighborhood.
pub fn build(graph: &KnowledgeGraph) -> SemanticIndex {
    let mut chunks = Vec::new();
    for file in graph.file_nodes() {
        chunks.push(Chunk {
            id: file.id.clone(),
            file: file.file_path.clone(),
            name: file.name.clone(),
            is_file: true,
            exported: true,
            text: file.language.clone().unwrap_or_default(),
        });
    }
    for symbol in graph.symbol_nodes() {
        chunks.push(Chunk {
            id: symbol.id.clone(),
            file: symbol.file_path.clone(),
            name: symbol.name.clone(),
            is_file: false,
            exported: symbol.exported,
            text: symbol.documentation.clone().unwrap_or_default(),
        });
    }

    let tokenized: Vec<Vec<String>> = chunks.iter().map(|c| tokenize_text(&chunk_text(c))).collect();

    let mut vocabulary: HashMap<String, u32> = HashMap::new();
    for tokens in &tokenized {
        let mut seen = std::collections::HashSet::new();
        for term in tokens {
            if seen.insert(term.clone()) {
                *vocabulary.entry(term.clone()).or_insert(0) += 1;
            }
        }
    }

    let n = chunks.len() as f64;
    let idf: HashMap<String, f64> = vocabulary
        .iter()
        .map(|(term, df)| (term.clone(), ((n + 1.0) / (*df as f64 + 1.0)).ln() + 1.0))
        .collect();

    let vectors: Vec<HashMap<String, f64>> = tokenized
        .iter()
        .map(|tokens| {
            let mut tf: HashMap<String, f64> = HashMap::new();
            for term in tokens {
                *tf.entry(term.clone()).or_insert(0.0) += 1.0;
            }
            tf.into_iter()
                .map(|(term, count)| {
                    let weight = count * idf.get(&term).copied().unwrap_or(0.0);
                    (term, weight)
                })
                .collect()
        })
        .collect();

    let chunk_count = chunks.len();
    let vocabulary_size = vocabulary.len();

    SemanticIndex {
        chunks,
        vocabulary,
        idf,
        vectors,
        chunk_count,
        vocabulary_size,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Keyword,
    Semantic,
    Hybrid,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub chunk_id: String,
    pub file: String,
    pub name: String,
    pub relevance: f64,
    pub context: String,
    pub reason: String,
}

fn expand_query_tokens(tokens: &[String]) -> Vec<String> {
    let mut expanded = tokens.to_vec();
    for token in tokens {
        if let Some((_, alts)) = SYNONYMS.iter().find(|(term, _)| *term == token) {
            expanded.extend(alts.iter().map(|s| s.to_string()));
        }
    }
    expanded
}

fn cosine_similarity(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    let (smaller, larger) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = smaller
        .iter()
        .filter_map(|(term, weight)| larger.get(term).map(|other| weight * other))
        .sum();
    let norm_a = (a.values().map(|v| v * v).sum::<f64>()).sqrt();
    let norm_b = (b.values().map(|v| v * v).sum::<f64>()).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn keyword_hits(index: &SemanticIndex, query: &str, top_k: usize) -> Vec<SearchHit> {
    let tokens: Vec<String> = tokenize_text(query);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = index
        .chunks
        .iter()
        .filter_map(|chunk| {
            let haystack = format!("{} {}", chunk.name.to_ascii_lowercase(), chunk.file.to_ascii_lowercase());
            let matched = tokens.iter().filter(|t| haystack.contains(t.as_str())).count();
            if matched == 0 {
                return None;
            }
            let mut relevance = (matched as f64 / tokens.len() as f64) * 90.0;
            if chunk.exported {
                relevance += 10.0;
            }
            Some(SearchHit {
                chunk_id: chunk.id.clone(),
                file: chunk.file.clone(),
                name: chunk.name.clone(),
                relevance: relevance.min(100.0),
                context: chunk.name.clone(),
                reason: "keyword match on name/path".to_string(),
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    hits.truncate(top_k);
    hits
}

fn semantic_hits(index: &SemanticIndex, query: &str, top_k: usize) -> Vec<SearchHit> {
    let tokens = expand_query_tokens(&tokenize_text(query));
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut query_vector: HashMap<String, f64> = HashMap::new();
    for term in &tokens {
        let idf = index.idf.get(term).copied().unwrap_or(1.0);
        *query_vector.entry(term.clone()).or_insert(0.0) += idf;
    }

    let mut hits: Vec<SearchHit> = index
        .chunks
        .iter()
        .zip(&index.vectors)
        .filter_map(|(chunk, vector)| {
            let similarity = cosine_similarity(&query_vector, vector);
            if similarity <= 0.0 {
                return None;
            }
            Some(SearchHit {
                chunk_id: chunk.id.clone(),
                file: chunk.file.clone(),
                name: chunk.name.clone(),
                relevance: (similarity * 100.0).min(100.0),
                context: chunk.name.clone(),
                reason: "semantic vector similarity".to_string(),
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    hits.truncate(top_k);
    hits
}

/// Run a query against the index in the given mode.
pub fn search(index: &SemanticIndex, query: &str, mode: SearchMode, top_k: usize) -> Vec<SearchHit> {
    match mode {
        SearchMode::Keyword => keyword_hits(index, query, top_k),
        SearchMode::Semantic => semantic_hits(index, query, top_k),
        SearchMode::Hybrid => {
            let keyword = keyword_hits(index, query, top_k);
            let semantic = semantic_hits(index, query, top_k);

            let mut by_id: HashMap<String, SearchHit> = HashMap::new();
            for hit in keyword {
                by_id.insert(hit.chunk_id.clone(), hit);
            }
            for hit in semantic {
                by_id
                    .entry(hit.chunk_id.clone())
                    .and_modify(|existing| {
                        existing.relevance = (existing.relevance + 10.0).min(100.0);
                        existing.reason = "keyword and semantic match".to_string();
                    })
                    .or_insert(hit);
            }

            let mut hits: Vec<SearchHit> = by_id.into_values().collect();
            hits.sort_by(|a, b| {
                b.relevance
                    .partial_cmp(&a.relevance)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.chunk_id.cmp(&b.chunk_id))
            });
            hits.truncate(top_k);
            hits
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Node, NodeType};

    fn graph_with_symbol() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new("/repo");
        graph.nodes.push(Node::new_file("src/auth.rs", "src/auth.rs", 10));
        let mut symbol = Node::new_symbol(
            "src/auth.rs::login",
            NodeType::Function,
            "login",
            "src/auth.rs",
            1,
            5,
        );
        symbol.exported = true;
        symbol.documentation = Some("Handles user authentication".to_string());
        graph.nodes.push(symbol);
        graph.canonicalize();
        graph
    }

    #[test]
    fn builds_one_chunk_per_file_and_symbol() {
        let graph = graph_with_symbol();
        let index = build(&graph);
        assert_eq!(index.chunk_count, 2);
    }

    #[test]
    fn keyword_search_matches_on_name() {
        let graph = graph_with_symbol();
        let index = build(&graph);
        let hits = search(&index, "login", SearchMode::Keyword, 5);
        assert!(hits.iter().any(|h| h.name == "login"));
    }

    #[test]
    fn semantic_search_expands_synonyms() {
        let graph = graph_with_symbol();
        let index = build(&graph);
        let hits = search(&index, "auth", SearchMode::Semantic, 5);
        assert!(hits.iter().any(|h| h.name == "login"));
    }

    #[test]
    fn hybrid_search_boosts_dual_matches() {
        let graph = graph_with_symbol();
        let index = build(&graph);
        let keyword = search(&index, "login", SearchMode::Keyword, 5);
        let hybrid = search(&index, "login", SearchMode::Hybrid, 5);
        let keyword_score = keyword.iter().find(|h| h.name == "login").unwrap().relevance;
        let hybrid_score = hybrid.iter().find(|h| h.name == "login").unwrap().relevance;
        assert!(hybrid_score >= keyword_score);
    }
}
