use std::fs;
use std::path::{Path, PathBuf};
use assert_cmd::Command;

use predicates::str::contains;
use tempfile::TempDir;

fn rotalog_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("rotalog"))
}

fn write_config(dir: &TempDir, extra: &str) -> PathBuf {
    let logs = dir.path().join("logs");
    let config = dir.path().join("log.yaml");
    fs::write(&config, format!("path: {}\n{extra}", logs.display())).expect("write config");
    config
}

fn config_arg(path: &Path) -> [String; 2] {
    ["--config".to_owned(), path.display().to_string()]
}

#[test]
fn pipe_appends_stdin_to_the_chosen_stream() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(&dir, "");

    rotalog_cmd()
        .arg("pipe")
        .args(config_arg(&config))
        .args(["--stream", "slow"])
        .write_stdin("first\nsecond\n")
        .assert()
        .success();

    let slow = fs::read_to_string(dir.path().join("logs/slow.log")).expect("slow.log");
    let lines: Vec<&str> = slow.lines().collect();
    assert_eq!(lines.len(), 2, "got: {slow}");
    assert!(lines[0].starts_with("[SLOW] ") && lines[0].ends_with(" first"));
    assert!(lines[1].ends_with(" second"));
    assert_eq!(fs::read_to_string(dir.path().join("logs/access.log")).unwrap(), "");
}

#[test]
fn pipe_reports_info_diagnostics_on_stderr_by_default() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(&dir, "");

    rotalog_cmd()
        .env_remove("RUST_LOG")
        .arg("pipe")
        .args(config_arg(&config))
        .write_stdin("one\n")
        .assert()
        .success()
        .stdout("")
        .stderr(contains("stdin closed"));
}

#[test]
fn pipe_raw_skips_the_timestamp() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(&dir, "");

    rotalog_cmd()
        .arg("pipe")
        .args(config_arg(&config))
        .arg("--raw")
        .write_stdin("plain line\n")
        .assert()
        .success();

    let access = fs::read_to_string(dir.path().join("logs/access.log")).expect("access.log");
    assert_eq!(access, "[INFO] plain line\n");
}

#[test]
fn pipe_rejects_unknown_stream() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(&dir, "");

    rotalog_cmd()
        .arg("pipe")
        .args(config_arg(&config))
        .args(["--stream", "audit"])
        .assert()
        .failure()
        .stderr(contains("unknown stream 'audit'"));
}

#[test]
fn paths_json_lists_every_stream() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(&dir, "");

    let assert = rotalog_cmd()
        .arg("paths")
        .args(config_arg(&config))
        .arg("--json")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("stdout utf8");
    let rows: serde_json::Value = serde_json::from_str(&stdout).expect("json");
    let rows = rows.as_array().expect("array");

    let streams: Vec<&str> = rows.iter().map(|r| r["stream"].as_str().unwrap()).collect();
    assert_eq!(streams, ["info", "error", "slow", "stat"]);
    let access = PathBuf::from(rows[0]["path"].as_str().unwrap());
    assert_eq!(access, dir.path().join("logs").join("access.log"));
}

#[test]
fn prune_removes_backups_past_retention() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(&dir, "keep_days: 3\n");
    let logs = dir.path().join("logs");
    fs::create_dir_all(&logs).unwrap();
    fs::write(logs.join("error.log-2000-01-01"), "old").unwrap();
    fs::write(logs.join("error.log-2999-01-01"), "future").unwrap();

    rotalog_cmd()
        .arg("prune")
        .args(config_arg(&config))
        .assert()
        .success()
        .stdout(contains("error.log-2000-01-01"));

    assert!(!logs.join("error.log-2000-01-01").exists());
    assert!(logs.join("error.log-2999-01-01").exists());
}

#[test]
fn invalid_config_reports_the_file() {
    let dir = TempDir::new().expect("tempdir");
    let config = dir.path().join("log.yaml");
    fs::write(&config, "keep_days: [not, a, number]\n").unwrap();

    rotalog_cmd()
        .arg("paths")
        .args(config_arg(&config))
        .assert()
        .failure()
        .stderr(contains("failed to load config"));
}
