// Integration tests enforcing the `tally` shell contract: exit codes and
// the --json stdout channel.
//
// Run with: cargo test -p tally-cli --test cli_contract_tests -- --nocapture

use std::path::PathBuf;
use std::process::{Command, Output};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn tally() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tally"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env_remove("TALLY_CONFIG");
    cmd.env_remove("TALLY_DB");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run(args: &[&str]) -> Output {
    tally().args(args).output().expect("run tally")
}

fn config_arg() -> String {
    fixture("tally.toml").to_string_lossy().into_owned()
}

fn week_csv() -> String {
    fixture("week.csv").to_string_lossy().into_owned()
}

/// Assert stdout is a single, parseable JSON value with no extra lines.
fn assert_single_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let trimmed = stdout.trim();
    assert!(!trimmed.is_empty(), "stdout should not be empty");
    serde_json::from_str(trimmed).unwrap_or_else(|e| {
        panic!("stdout must be valid JSON.\nParse error: {}\nstdout:\n{}", e, trimmed)
    })
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ===========================================================================
// tally validate
// ===========================================================================

#[test]
fn validate_single_entity_json_object() {
    let output = run(&["validate", &week_csv(), "--domain", "nfl", "--entity", "buf-jax", "--config", &config_arg(), "--json"]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let val = assert_single_json(&output);
    assert_eq!(val["entity_id"], "buf-jax");
    assert_eq!(val["domain"], "nfl");
    assert_eq!(val["consensus"]["home_score"], 27.0);
    assert_eq!(val["fields"]["home_team"]["discrepancy"], "none");
    assert!((val["overall_confidence"].as_f64().unwrap() - 0.98).abs() < 1e-9);
    assert!(stderr(&output).contains("buf-jax: ok"));
}

#[test]
fn validate_batch_flags_anomaly_with_exit_7() {
    let output = run(&["validate", &week_csv(), "--domain", "nfl", "--config", &config_arg(), "--json"]);

    assert_eq!(output.status.code(), Some(7), "stderr: {}", stderr(&output));
    let val = assert_single_json(&output);
    let records = val.as_array().expect("batch output is an array");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["entity_id"], "buf-jax");
    assert_eq!(records[1]["entity_id"], "ne-hou");
    assert_eq!(records[1]["anomalies"].as_array().unwrap().len(), 1);
    assert!(stderr(&output).contains("1 of 2 record(s) need review"));
}

#[test]
fn validate_human_mode_keeps_stdout_empty() {
    let output = run(&["validate", &week_csv(), "--domain", "nfl", "--entity", "buf-jax", "--config", &config_arg()]);

    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
    assert!(stderr(&output).contains("confidence 0.98"));
}

#[test]
fn validate_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("result.json");
    let output = run(&[
        "validate", &week_csv(), "--domain", "nfl", "--entity", "buf-jax",
        "--config", &config_arg(), "--output", out.to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["entity_id"], "buf-jax");
}

#[test]
fn config_from_env_var() {
    let output = tally()
        .env("TALLY_CONFIG", fixture("tally.toml"))
        .args(["validate", &week_csv(), "--domain", "nfl", "--entity", "buf-jax"])
        .output()
        .expect("run tally");
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
}

// ===========================================================================
// Error exit codes
// ===========================================================================

#[test]
fn unsupported_extension_exit_2() {
    let output = run(&["validate", "games.xlsx", "--domain", "nfl", "--config", &config_arg()]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("hint:"));
}

#[test]
fn invalid_config_exit_3() {
    let broken = fixture("broken.toml");
    let output = run(&["validate", &week_csv(), "--domain", "nfl", "--config", broken.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("espn"));
}

#[test]
fn missing_config_exit_3() {
    let output = run(&["config", "check", "--config", "/nonexistent/tally.toml"]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn unknown_domain_exit_4() {
    let output = run(&["validate", &week_csv(), "--domain", "curling", "--config", &config_arg()]);
    assert_eq!(output.status.code(), Some(4));
    assert!(output.stdout.is_empty());
}

#[test]
fn unknown_entity_exit_5() {
    let output = run(&["validate", &week_csv(), "--domain", "nfl", "--entity", "nyj-mia", "--config", &config_arg()]);
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn missing_observation_file_exit_5() {
    let output = run(&["validate", "no-such-week.csv", "--domain", "nfl", "--config", &config_arg()]);
    assert_eq!(output.status.code(), Some(5));
}

// ===========================================================================
// tally report + store
// ===========================================================================

#[test]
fn save_then_report_json() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("nested").join("tally.db");
    let db_arg = db.to_str().unwrap();

    let saved = run(&["validate", &week_csv(), "--domain", "nfl", "--config", &config_arg(), "--save", "--db", db_arg]);
    // ne-hou is anomalous, but both records are still saved
    assert_eq!(saved.status.code(), Some(7), "stderr: {}", stderr(&saved));
    assert!(db.exists());

    let output = run(&["report", "--domain", "nfl", "--db", db_arg, "--json"]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let val = assert_single_json(&output);
    assert_eq!(val["domain"], "nfl");
    assert_eq!(val["count"], 2);
    assert_eq!(val["high_confidence_rate"], 1.0);
    assert_eq!(val["critical_error_count"], 0);

    let other = run(&["report", "--domain", "nba", "--db", db_arg, "--json"]);
    assert_eq!(assert_single_json(&other)["count"], 0);
}

#[test]
fn report_without_store_exit_6() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("absent.db");
    let output = run(&["report", "--domain", "nfl", "--db", db.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(6));
}

#[test]
fn report_rejects_inverted_range() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("tally.db");
    let output = run(&["report", "--domain", "nfl", "--db", db.to_str().unwrap(), "--from", "2026-02-01", "--to", "2026-01-01"]);
    assert_eq!(output.status.code(), Some(2));
}

// ===========================================================================
// tally config check
// ===========================================================================

#[test]
fn config_check_lists_domains() {
    let output = run(&["config", "check", "--config", &config_arg()]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("config ok: 3 source(s), 1 domain(s)"));
    assert!(stdout.contains("nfl: 4 field(s), baseline"));
}
