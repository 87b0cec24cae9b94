//! Import resolution: turns a raw `use`/`import` path into the id of the
//! file node it points at, when that target is part of the scanned tree.
//!
//! Two resolution strategies are implemented, one per language family:
//! - Rust `use` paths are resolved against the module tree rooted at the
//!   crate (`crate::`, `self::`, `super::`) by walking path segments onto
//!   directories/`mod.rs`/`<name>.rs` files, the same substring-free
//!   segment matching the topology builder used for crate module edges.
//! - TypeScript/JavaScript relative specifiers (`./x`, `../x`) are resolved
//!   by probing the usual extension/`index` candidates; bare package
//!   specifiers (`react`, `lodash/fp`) are left unresolved since they name
//!   an external dependency, not a file in this source tree.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Maps normalized relative file paths (as used for node ids) to the file's
/// node id, to answer "does this path exist in the scanned tree".
pub struct FileIndex<'a> {
    by_rel_path: HashMap<&'a str, &'a str>,
    root: &'a Path,
}

impl<'a> FileIndex<'a> {
    pub fn new(root: &'a Path, files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            by_rel_path: files.into_iter().collect(),
            root,
        }
    }

    fn lookup_candidates(&self, candidates: &[String]) -> Option<&'a str> {
        for candidate in candidates {
            if let Some(id) = self.by_rel_path.get(candidate.as_str()) {
                return Some(id);
            }
        }
        None
    }

    /// Resolve a TypeScript/JavaScript import specifier relative to the
    /// importing file's directory.
    pub fn resolve_relative(&self, from_file: &str, specifier: &str) -> Option<&'a str> {
        if !(specifier.starts_with("./") || specifier.starts_with("../")) {
            return None;
        }
        let from_dir = Path::new(from_file).parent().unwrap_or_else(|| Path::new(""));
        let joined = normalize(&from_dir.join(specifier));
        let mut candidates = Vec::new();
        const EXTS: [&str; 4] = ["ts", "tsx", "js", "jsx"];
        if joined.extension().is_some() {
            candidates.push(path_to_rel(&joined));
        }
        for ext in EXTS {
            candidates.push(path_to_rel(&joined.with_extension(ext)));
        }
        for ext in EXTS {
            candidates.push(path_to_rel(&joined.join(format!("index.{ext}"))));
        }
        let _ = self.root;
        self.lookup_candidates(&candidates)
    }

    /// Resolve a Rust `use` path (e.g. `crate::foo::Bar`, `super::baz`)
    /// against the module tree, given the importing file's own path.
    pub fn resolve_rust_path(&self, from_file: &str, use_path: &str) -> Option<&'a str> {
        let mut segments: Vec<&str> = use_path.split("::").filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return None;
        }

        let from_dir = module_dir_for(from_file);
        let mut base = from_dir;

        match segments[0] {
            "crate" => {
                base = PathBuf::from("src");
                segments.remove(0);
            }
            "self" => {
                segments.remove(0);
            }
            "super" => {
                while segments.first() == Some(&"super") {
                    base.pop();
                    segments.remove(0);
                }
            }
            _ => {
                // Could be an external crate name or a sibling module; try
                // resolving relative to the current module directory first.
            }
        }

        if segments.is_empty() {
            return self.lookup_candidates(&[
                path_to_rel(&base.join("mod.rs")),
                path_to_rel(&base.with_extension("rs")),
            ]);
        }

        // Walk all but the last segment as directories (nested modules);
        // the last segment may be the leaf module file or an item defined
        // inside the parent module file, so both are tried.
        let mut dir = base.clone();
        for (i, seg) in segments.iter().enumerate() {
            let is_last = i == segments.len() - 1;
            if is_last {
                let mut candidates = vec![
                    path_to_rel(&dir.join(format!("{seg}.rs"))),
                    path_to_rel(&dir.join(seg).join("mod.rs")),
                ];
                // The path may name an item inside the current directory's
                // module file rather than a file of its own.
                candidates.push(path_to_rel(&dir.join("mod.rs")));
                if let Some(id) = self.lookup_candidates(&candidates) {
                    return Some(id);
                }
                return None;
            } else {
                dir = dir.join(seg);
            }
        }
        None
    }
}

fn module_dir_for(file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.file_name().and_then(|f| f.to_str()) == Some("mod.rs")
        || path.file_name().and_then(|f| f.to_str()) == Some("lib.rs")
        || path.file_name().and_then(|f| f.to_str()) == Some("main.rs")
    {
        path.parent().map(|p| p.to_path_buf()).unwrap_or_default()
    } else {
        path.with_extension("")
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn path_to_rel(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_typescript_import_with_extension_probing() {
        let files = vec![("src/index.ts", "src/index.ts"), ("src/util.ts", "src/util.ts")];
        let index = FileIndex::new(Path::new("/repo"), files);
        assert_eq!(
            index.resolve_relative("src/index.ts", "./util"),
            Some("src/util.ts")
        );
    }

    #[test]
    fn resolves_relative_index_file() {
        let files = vec![
            ("src/index.ts", "src/index.ts"),
            ("src/lib/index.ts", "src/lib/index.ts"),
        ];
        let index = FileIndex::new(Path::new("/repo"), files);
        assert_eq!(
            index.resolve_relative("src/index.ts", "./lib"),
            Some("src/lib/index.ts")
        );
    }

    #[test]
    fn bare_specifier_is_unresolved() {
        let files = vec![("src/index.ts", "src/index.ts")];
        let index = FileIndex::new(Path::new("/repo"), files);
        assert_eq!(index.resolve_relative("src/index.ts", "react"), None);
    }

    #[test]
    fn resolves_rust_crate_path_to_module_file() {
        let files = vec![
            ("src/lib.rs", "src/lib.rs"),
            ("src/graph.rs", "src/graph.rs"),
        ];
        let index = FileIndex::new(Path::new("/repo"), files);
        assert_eq!(
            index.resolve_rust_path("src/lib.rs", "crate::graph"),
            Some("src/graph.rs")
        );
    }

    #[test]
    fn resolves_rust_nested_module_directory() {
        let files = vec![
            ("src/lib.rs", "src/lib.rs"),
            ("src/parsing/mod.rs", "src/parsing/mod.rs"),
            ("src/parsing/rust.rs", "src/parsing/rust.rs"),
        ];
        let index = FileIndex::new(Path::new("/repo"), files);
        assert_eq!(
            index.resolve_rust_path("src/lib.rs", "crate::parsing::rust"),
            Some("src/parsing/rust.rs")
        );
    }

    #[test]
    fn resolves_super_path_to_sibling_module() {
        let files = vec![
            ("src/lib.rs", "src/lib.rs"),
            ("src/parsing/mod.rs", "src/parsing/mod.rs"),
            ("src/parsing/rust.rs", "src/parsing/rust.rs"),
            ("src/parsing/typescript.rs", "src/parsing/typescript.rs"),
        ];
        let index = FileIndex::new(Path::new("/repo"), files);
        assert_eq!(
            index.resolve_rust_path("src/parsing/rust.rs", "super::typescript"),
            Some("src/parsing/typescript.rs")
        );
    }
}
