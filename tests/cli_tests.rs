//! Integration tests for CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn harvest_cmd(cwd: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("repo-harvest"));
    cmd.current_dir(cwd.path()).env_remove("GITHUB_TOKEN").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("repo-harvest"));
    cmd.arg("--version");
    cmd.assert().success().stdout(predicate::str::contains("repo-harvest"));
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("repo-harvest"));
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Search GitHub"))
        .stdout(predicate::str::contains("harvest"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn test_harvest_help_lists_options() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("repo-harvest"));
    cmd.args(["harvest", "--help"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--concurrency"))
        .stdout(predicate::str::contains("--backend"))
        .stdout(predicate::str::contains("--keep-work-dir"));
}

#[test]
fn test_completions_bash() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("repo-harvest"));
    cmd.args(["completions", "bash"]);
    cmd.assert().success().stdout(predicate::str::contains("repo-harvest"));
}

#[test]
fn test_harvest_requires_query_without_input() {
    let tmp = TempDir::new().unwrap();
    harvest_cmd(&tmp)
        .args(["harvest", "--no-input"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("A search query is required"));
}

#[test]
fn test_harvest_rejects_unknown_backend() {
    let tmp = TempDir::new().unwrap();
    harvest_cmd(&tmp)
        .args(["harvest", "rust", "--no-input", "--backend", "svn"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid clone backend"));
}

#[test]
fn test_harvest_rejects_zero_concurrency() {
    let tmp = TempDir::new().unwrap();
    harvest_cmd(&tmp)
        .args(["harvest", "rust", "--no-input", "-j", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrency"));
}

#[test]
fn test_harvest_reports_unreachable_search_api() {
    let tmp = TempDir::new().unwrap();
    harvest_cmd(&tmp)
        .args([
            "harvest",
            "rust",
            "--no-input",
            "--no-progress",
            "--api-url",
            "http://127.0.0.1:9",
            "-o",
            "out",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Harvest failed"));

    // Nothing is written when the search itself fails.
    let out = tmp.path().join("out");
    assert!(!out.exists() || fs::read_dir(&out).unwrap().next().is_none());
}

#[test]
fn test_harvest_reads_query_from_config_file() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("repo-harvest.toml"),
        "query = \"from config\"\napi_url = \"http://127.0.0.1:9\"\n",
    )
    .unwrap();

    // The query comes from the file, so the failure is the search, not the missing query.
    harvest_cmd(&tmp)
        .args(["harvest", "--no-input", "--no-progress"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Harvest failed"))
        .stderr(predicate::str::contains("A search query is required").not());
}

#[test]
fn test_explicit_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    harvest_cmd(&tmp)
        .args(["harvest", "rust", "--no-input", "--config", "nope.toml"])
        .assert()
        .failure();
}

#[test]
fn test_search_rejects_zero_count() {
    let tmp = TempDir::new().unwrap();
    harvest_cmd(&tmp)
        .args(["search", "rust", "-n", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--count must be between 1 and 1000"));
}
