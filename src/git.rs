//! Git history analysis: per-file authorship and modification stats,
//! deletion events, and the commit -> file-set relation consumed by the
//! change-coupling engine.
//!
//! Shells out to `git log`/`git --numstat` via `std::process::Command`
//! rather than linking a git library: no native dependency, and it works
//! against whatever git binary the host already has. A missing or
//! non-git working tree is non-fatal: callers get
//! [`EngineError::GitUnavailable`] and the scan proceeds with git-derived
//! fields omitted.

use crate::error::{EngineError, Result};
use crate::types::{DeletionEvent, FileGitInfo};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::process::Command;

/// Unit separators unlikely to appear in author names or commit subjects,
/// used to delimit commit header fields in `--pretty` output.
const RECORD_SEP: char = '\u{1}';
const FIELD_SEP: char = '\u{2}';

/// Per-file commit authorship, used internally to build both the
/// [`FileGitInfo`] merged into graph nodes and the richer per-author counts
/// the bus-factor analyzer needs.
#[derive(Debug, Clone, Default)]
pub struct FileStats {
    pub last_modified: Option<i64>,
    pub modification_count: u32,
    /// Author name -> number of commits touching this file.
    pub author_commits: HashMap<String, u32>,
}

impl FileStats {
    /// Contributors ordered by commit count descending, ties broken by name,
    /// matching the node schema's "ordered list of author names".
    pub fn ordered_contributors(&self) -> Vec<String> {
        let mut authors: Vec<(&String, &u32)> = self.author_commits.iter().collect();
        authors.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        authors.into_iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn to_file_git_info(&self) -> FileGitInfo {
        FileGitInfo {
            last_modified: self.last_modified,
            modification_count: self.modification_count,
            contributors: self.ordered_contributors(),
        }
    }
}

/// A single commit's timestamp and the set of (repo-relative) source files
/// it touched, limited to paths the caller recognizes as source.
#[derive(Debug, Clone)]
pub struct CommitFileSet {
    pub commit_hash: String,
    pub timestamp: i64,
    pub files: HashSet<String>,
}

/// Full result of a history scan.
#[derive(Debug, Clone, Default)]
pub struct GitHistory {
    pub files: HashMap<String, FileStats>,
    pub deletions: Vec<DeletionEvent>,
    pub commit_file_sets: Vec<CommitFileSet>,
}

pub struct GitHistoryAnalyzer;

impl GitHistoryAnalyzer {
    /// Analyze the full commit history of `root`, restricting the
    /// commit-file-set relation to paths present in `source_files`
    /// (repo-relative, forward-slashed, as used for node ids).
    pub fn analyze(root: &Path, source_files: &HashSet<String>) -> Result<GitHistory> {
        if !Self::is_git_repo(root)? {
            return Err(EngineError::GitUnavailable(root.to_path_buf()));
        }

        let files = Self::file_stats(root)?;
        let deletions = Self::deletion_events(root)?;
        let commit_file_sets = Self::commit_file_sets(root, source_files)?;

        Ok(GitHistory {
            files,
            deletions,
            commit_file_sets,
        })
    }

    pub fn is_git_repo(root: &Path) -> Result<bool> {
        let output = Command::new("git")
            .args(["rev-parse", "--git-dir"])
            .current_dir(root)
            .output()
            .map_err(|e| EngineError::io(root.to_path_buf(), e))?;
        Ok(output.status.success())
    }

    fn run_git(root: &Path, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(root)
            .output()
            .map_err(|e| EngineError::io(root.to_path_buf(), e))?;
        if !output.status.success() {
            return Err(EngineError::GitUnavailable(root.to_path_buf()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Per-file `lastModified`/`modificationCount`/author-commit-counts over
    /// the whole history.
    fn file_stats(root: &Path) -> Result<HashMap<String, FileStats>> {
        let pretty = format!("--pretty=format:{RECORD_SEP}%H{FIELD_SEP}%an{FIELD_SEP}%at");
        let stdout = Self::run_git(root, &["log", &pretty, "--name-only"])?;

        let mut files: HashMap<String, FileStats> = HashMap::new();
        let mut current: Option<(String, i64)> = None;

        for line in stdout.lines() {
            if let Some(rest) = line.strip_prefix(RECORD_SEP) {
                let mut parts = rest.splitn(3, FIELD_SEP);
                let _hash = parts.next();
                let author = parts.next().unwrap_or("").to_string();
                let ts: i64 = parts.next().unwrap_or("0").trim().parse().unwrap_or(0);
                current = Some((author, ts));
                continue;
            }
            let path = line.trim();
            if path.is_empty() {
                continue;
            }
            if let Some((author, ts)) = &current {
                let entry = files.entry(normalize(path)).or_default();
                entry.modification_count += 1;
                *entry.author_commits.entry(author.clone()).or_insert(0) += 1;
                if entry.last_modified.is_none_or(|lm| *ts > lm) {
                    entry.last_modified = Some(*ts);
                }
            }
        }

        Ok(files)
    }

    /// Deletion events: for every commit that removed a tracked file,
    /// record the path, commit timestamp, and the committing author.
    fn deletion_events(root: &Path) -> Result<Vec<DeletionEvent>> {
        let pretty = format!("--pretty=format:{RECORD_SEP}%an{FIELD_SEP}%at");
        let stdout = Self::run_git(
            root,
            &["log", "--diff-filter=D", &pretty, "--name-only"],
        )?;

        let mut events = Vec::new();
        let mut current: Option<(String, i64)> = None;

        for line in stdout.lines() {
            if let Some(rest) = line.strip_prefix(RECORD_SEP) {
                let mut parts = rest.splitn(2, FIELD_SEP);
                let author = parts.next().unwrap_or("").to_string();
                let ts: i64 = parts.next().unwrap_or("0").trim().parse().unwrap_or(0);
                current = Some((author, ts));
                continue;
            }
            let path = line.trim();
            if path.is_empty() {
                continue;
            }
            if let Some((author, ts)) = &current {
                events.push(DeletionEvent {
                    path: normalize(path),
                    date: *ts,
                    last_author: author.clone(),
                });
            }
        }

        Ok(events)
    }

    /// Commit -> file-set relation, limited to `source_files`, for the
    /// change-coupling engine.
    fn commit_file_sets(root: &Path, source_files: &HashSet<String>) -> Result<Vec<CommitFileSet>> {
        let pretty = format!("--pretty=format:{RECORD_SEP}%H{FIELD_SEP}%at");
        let stdout = Self::run_git(root, &["log", &pretty, "--name-only"])?;

        let mut commits = Vec::new();
        let mut current: Option<(String, i64, HashSet<String>)> = None;

        for line in stdout.lines() {
            if let Some(rest) = line.strip_prefix(RECORD_SEP) {
                if let Some((commit_hash, timestamp, files)) = current.take() {
                    if !files.is_empty() {
                        commits.push(CommitFileSet {
                            commit_hash,
                            timestamp,
                            files,
                        });
                    }
                }
                let mut parts = rest.splitn(2, FIELD_SEP);
                let hash = parts.next().unwrap_or("").to_string();
                let ts: i64 = parts.next().unwrap_or("0").trim().parse().unwrap_or(0);
                current = Some((hash, ts, HashSet::new()));
                continue;
            }
            let path = normalize(line.trim());
            if path.is_empty() {
                continue;
            }
            if let Some((_, _, files)) = &mut current {
                if source_files.contains(&path) {
                    files.insert(path);
                }
            }
        }
        if let Some((commit_hash, timestamp, files)) = current {
            if !files.is_empty() {
                commits.push(CommitFileSet {
                    commit_hash,
                    timestamp,
                    files,
                });
            }
        }

        Ok(commits)
    }
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::process::Command;
    use tempfile::TempDir;

    fn git(repo: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(repo)
            .status()
            .unwrap();
        assert!(status.success(), "git {:?} failed", args);
    }

    fn init_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        git(dir.path(), &["init", "-q"]);
        git(dir.path(), &["config", "user.name", "Ada"]);
        git(dir.path(), &["config", "user.email", "ada@example.com"]);
        dir
    }

    fn commit_file(repo: &Path, name: &str, contents: &str, message: &str) {
        fs::write(repo.join(name), contents).unwrap();
        git(repo, &["add", name]);
        git(repo, &["commit", "-q", "-m", message]);
    }

    #[test]
    fn non_git_dir_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let result = GitHistoryAnalyzer::analyze(dir.path(), &HashSet::new());
        assert!(matches!(result, Err(EngineError::GitUnavailable(_))));
    }

    #[test]
    fn tracks_modification_count_and_contributors() {
        let repo = init_repo();
        commit_file(repo.path(), "a.rs", "fn a() {}\n", "add a");
        commit_file(repo.path(), "a.rs", "fn a() { 1; }\n", "tweak a");
        git(repo.path(), &["config", "user.name", "Grace"]);
        git(repo.path(), &["config", "user.email", "grace@example.com"]);
        commit_file(repo.path(), "a.rs", "fn a() { 2; }\n", "tweak a again");

        let mut sources = HashSet::new();
        sources.insert("a.rs".to_string());
        let history = GitHistoryAnalyzer::analyze(repo.path(), &sources).unwrap();

        let stats = history.files.get("a.rs").unwrap();
        assert_eq!(stats.modification_count, 3);
        let contributors = stats.ordered_contributors();
        assert_eq!(contributors.len(), 2);
        assert_eq!(contributors[0], "Grace");
    }

    #[test]
    fn records_deletion_events() {
        let repo = init_repo();
        commit_file(repo.path(), "gone.rs", "fn gone() {}\n", "add gone");
        fs::remove_file(repo.path().join("gone.rs")).unwrap();
        git(repo.path(), &["rm", "-q", "gone.rs"]);
        git(repo.path(), &["commit", "-q", "-m", "remove gone"]);

        let history = GitHistoryAnalyzer::analyze(repo.path(), &HashSet::new()).unwrap();
        assert_eq!(history.deletions.len(), 1);
        assert_eq!(history.deletions[0].path, "gone.rs");
        assert_eq!(history.deletions[0].last_author, "Ada");
    }

    #[test]
    fn commit_file_sets_limited_to_source_files() {
        let repo = init_repo();
        commit_file(repo.path(), "a.rs", "fn a() {}\n", "add a");
        fs::write(repo.path().join("README.md"), "notes").unwrap();
        git(repo.path(), &["add", "README.md"]);
        git(repo.path(), &["commit", "-q", "-m", "add readme"]);
        fs::write(repo.path().join("a.rs"), "fn a() { 1; }\n").unwrap();
        fs::write(repo.path().join("b.rs"), "fn b() {}\n").unwrap();
        git(repo.path(), &["add", "a.rs", "b.rs"]);
        git(repo.path(), &["commit", "-q", "-m", "touch a and b"]);

        let mut sources = HashSet::new();
        sources.insert("a.rs".to_string());
        sources.insert("b.rs".to_string());
        let history = GitHistoryAnalyzer::analyze(repo.path(), &sources).unwrap();

        assert_eq!(history.commit_file_sets.len(), 2);
        let coupled = history
            .commit_file_sets
            .iter()
            .find(|c| c.files.len() == 2)
            .unwrap();
        assert!(coupled.files.contains("a.rs"));
        assert!(coupled.files.contains("b.rs"));
        // The readme-only commit contributed no source files, so it's absent.
        assert!(history
            .commit_file_sets
            .iter()
            .all(|c| !c.files.contains("README.md")));
    }
}
