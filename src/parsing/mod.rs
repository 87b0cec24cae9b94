//! Parsing module for extracting symbols from source code.
//!
//! Uses tree-sitter for incremental, error-tolerant parsing. The types here
//! are the language-layer's internal representation; [`crate::graph`]
//! translates them into the public [`crate::types::Node`]/[`crate::types::Edge`]
//! model that gets persisted.

pub mod rust;
pub mod typescript;

use anyhow::Result;
use lasso::{Spur, ThreadedRodeo};
use std::path::{Path, PathBuf};
use tree_sitter::{Language, Tree};

/// Interned string handle, used for symbol names during extraction so the
/// same identifier isn't heap-allocated once per occurrence.
pub type InternedString = Spur;

/// Location of a syntax element in a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: PathBuf,
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Location {
    pub fn new(file: PathBuf, start_byte: usize, end_byte: usize) -> Self {
        Self {
            file,
            start_byte,
            end_byte,
            start_line: 0,
            start_col: 0,
            end_line: 0,
            end_col: 0,
        }
    }

    pub fn with_positions(
        mut self,
        start_line: usize,
        start_col: usize,
        end_line: usize,
        end_col: usize,
    ) -> Self {
        self.start_line = start_line;
        self.start_col = start_col;
        self.end_line = end_line;
        self.end_col = end_col;
        self
    }
}

/// Kind of symbol extracted from source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Function,
    Method,
    Struct,
    Enum,
    Trait,
    Interface,
    Impl,
    Const,
    Static,
    Module,
    TypeAlias,
    Variable,
}

/// Visibility of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Private,
    Crate,
    Super,
    Restricted,
    Public,
}

/// Function/method signature information.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    pub params: Vec<String>,
    pub return_type: Option<String>,
    pub is_async: bool,
    pub is_unsafe: bool,
    pub is_const: bool,
    pub generics: Option<String>,
    pub where_clause: Option<String>,
}

/// A symbol definition extracted from a source file.
#[derive(Debug, Clone)]
pub struct SymbolDef {
    pub name: InternedString,
    pub scoped_name: InternedString,
    pub kind: SymbolKind,
    pub location: Location,
    pub signature: Option<Signature>,
    pub visibility: Visibility,
    pub attributes: Vec<String>,
    pub doc_comment: Option<String>,
    pub parent: Option<InternedString>,
    /// McCabe cyclomatic complexity of the symbol's body, for
    /// function/method kinds; `None` for non-callable symbols.
    pub complexity: Option<u32>,
    /// For class-like symbols (struct/class), the name of the base type or
    /// implemented trait/interface this symbol extends, if single/primary.
    pub extends: Option<String>,
}

/// A call edge in the call graph.
#[derive(Debug, Clone)]
pub struct CallEdge {
    pub caller: InternedString,
    pub callee_name: String,
    pub location: Location,
    pub is_method_call: bool,
}

/// Import information from `use`/`import` statements.
#[derive(Debug, Clone)]
pub struct ImportInfo {
    pub path: String,
    pub name: String,
    pub is_glob: bool,
    pub location: Location,
}

/// Trait for language-specific parsers.
pub trait LanguageParser: Send + Sync {
    fn language(&self) -> Language;

    fn extensions(&self) -> &[&str];

    fn language_name(&self) -> &'static str;

    fn extract_symbols(
        &self,
        tree: &Tree,
        source: &str,
        file: &Path,
        interner: &ThreadedRodeo,
    ) -> Result<Vec<SymbolDef>>;

    fn extract_calls(
        &self,
        tree: &Tree,
        source: &str,
        file: &Path,
        interner: &ThreadedRodeo,
    ) -> Result<Vec<CallEdge>>;

    fn extract_imports(&self, tree: &Tree, source: &str, file: &Path) -> Result<Vec<ImportInfo>>;
}

/// Get a parser for a file based on its extension, or `None` for an
/// unsupported/non-source file (the caller still records it as a bare
/// file node with no symbols).
pub fn parser_for_file(path: &Path) -> Option<Box<dyn LanguageParser>> {
    let ext = path.extension()?.to_str()?;
    match ext.to_lowercase().as_str() {
        "rs" => Some(Box::new(rust::RustParser::new())),
        "ts" | "mts" | "cts" => Some(Box::new(typescript::TypeScriptParser::new_typescript())),
        "tsx" => Some(Box::new(typescript::TypeScriptParser::new_tsx())),
        _ => None,
    }
}
