//! End-to-end tests against the `codekg` binary: scan a small synthetic
//! git repository, then exercise the analytical subcommands against it.

use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command as StdCommand;
use tempfile::TempDir;

fn git(repo: &Path, args: &[&str]) {
    let status = StdCommand::new("git")
        .args(args)
        .current_dir(repo)
        .status()
        .unwrap();
    assert!(status.success(), "git {:?} failed", args);
}

fn commit_file(repo: &Path, name: &str, contents: &str, message: &str) {
    if let Some(parent) = Path::new(name).parent() {
        fs::create_dir_all(repo.join(parent)).unwrap();
    }
    fs::write(repo.join(name), contents).unwrap();
    git(repo, &["add", name]);
    git(repo, &["commit", "-q", "-m", message]);
}

/// A two-file repo with an import edge and a few commits, so hotspot,
/// coupling, and risk queries all have something to report on.
fn fixture_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    git(root, &["init", "-q"]);
    git(root, &["config", "user.name", "Ada"]);
    git(root, &["config", "user.email", "ada@example.com"]);

    commit_file(
        root,
        "src/lib.rs",
        "mod util;\n\nfn main() {\n    util::helper();\n}\n",
        "add lib",
    );
    commit_file(
        root,
        "src/util.rs",
        "pub fn helper() {\n    if true {\n        if false {\n            println!(\"x\");\n        }\n    }\n}\n",
        "add util",
    );
    commit_file(
        root,
        "src/util.rs",
        "pub fn helper() {\n    if true {\n        if false {\n            if true {\n                println!(\"x\");\n            }\n        }\n    }\n}\n",
        "grow complexity in util",
    );
    dir
}

fn cli() -> Command {
    Command::cargo_bin("codekg").unwrap()
}

fn run_json(root: &Path, args: &[&str]) -> Value {
    let output = cli()
        .arg("--root")
        .arg(root)
        .arg("--json")
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "command {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn scan_reports_files_and_nodes() {
    let repo = fixture_repo();
    let value = run_json(repo.path(), &["scan"]);
    assert_eq!(value["type"], "scan");
    assert!(value["files"].as_u64().unwrap() >= 2);
    assert!(value["nodes"].as_u64().unwrap() > 0);
}

#[test]
fn status_reflects_a_completed_scan() {
    let repo = fixture_repo();
    let before = run_json(repo.path(), &["status"]);
    assert_eq!(before["found"], false);

    run_json(repo.path(), &["scan"]);
    let after = run_json(repo.path(), &["status"]);
    assert_eq!(after["type"], "status");
    assert_eq!(after["found"], true);
    assert!(after["file_count"].as_u64().unwrap() >= 2);
}

#[test]
fn health_without_a_prior_scan_degrades_to_a_not_found_record() {
    let repo = TempDir::new().unwrap();
    git(repo.path(), &["init", "-q"]);
    let value = run_json(repo.path(), &["health"]);
    assert_eq!(value["type"], "health");
    assert_eq!(value["found"], false);
}

#[test]
fn hotspots_ranks_the_more_complex_file_first() {
    let repo = fixture_repo();
    run_json(repo.path(), &["scan"]);
    let value = run_json(repo.path(), &["hotspots"]);
    let hotspots = value["hotspots"].as_array().unwrap();
    assert!(!hotspots.is_empty());
    assert_eq!(hotspots[0]["file"], "src/util.rs");
}

#[test]
fn risk_respects_the_exit_code_flag_on_threshold_breach() {
    let repo = fixture_repo();
    run_json(repo.path(), &["scan"]);
    let output = cli()
        .arg("--root")
        .arg(repo.path())
        .arg("--exit-code")
        .arg("risk")
        .arg("--file")
        .arg("src/util.rs")
        .arg("--threshold")
        .arg("0")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn search_finds_the_helper_symbol() {
    let repo = fixture_repo();
    run_json(repo.path(), &["scan"]);
    let value = run_json(repo.path(), &["search", "helper"]);
    let results = value["results"].as_array().unwrap();
    assert!(results.iter().any(|r| r["name"] == "helper"));
}

#[test]
fn ask_routes_a_hotspot_question_to_the_hotspots_operation() {
    let repo = fixture_repo();
    run_json(repo.path(), &["scan"]);
    let value = run_json(repo.path(), &["ask", "what are the complexity hotspots"]);
    assert_eq!(value["type"], "ask");
    assert_eq!(value["routed_to"], "hotspots");
}

#[test]
fn breaking_changes_is_empty_until_a_second_scan_removes_a_symbol() {
    let repo = fixture_repo();
    run_json(repo.path(), &["scan"]);

    let before = run_json(repo.path(), &["breaking-changes"]);
    assert!(before["changes"].as_array().unwrap().is_empty());

    fs::write(repo.path().join("src/util.rs"), "// helper removed\n").unwrap();
    git(repo.path(), &["add", "src/util.rs"]);
    git(repo.path(), &["commit", "-q", "-m", "remove helper"]);
    run_json(repo.path(), &["scan"]);

    let after = run_json(repo.path(), &["breaking-changes"]);
    let changes = after["changes"].as_array().unwrap();
    assert!(changes
        .iter()
        .any(|c| c["id"].as_str().unwrap_or_default().contains("helper")));
}

#[test]
fn breaking_changes_query_does_not_consume_the_comparison_baseline() {
    let repo = fixture_repo();
    run_json(repo.path(), &["scan"]);
    fs::write(repo.path().join("src/util.rs"), "// helper removed\n").unwrap();
    git(repo.path(), &["add", "src/util.rs"]);
    git(repo.path(), &["commit", "-q", "-m", "remove helper"]);
    run_json(repo.path(), &["scan"]);

    let first = run_json(repo.path(), &["breaking-changes"]);
    let second = run_json(repo.path(), &["breaking-changes"]);
    assert_eq!(first["changes"], second["changes"]);
}

#[test]
fn clean_removes_the_store_and_status_reports_uninitialized() {
    let repo = fixture_repo();
    run_json(repo.path(), &["scan"]);
    run_json(repo.path(), &["clean"]);
    let value = run_json(repo.path(), &["status"]);
    assert_eq!(value["found"], false);
}
