use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

const SECRET_VARS: [&str; 2] = ["NASA_API_KEY", "X_USER_TOKEN"];

fn cosmos_poster(dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("cosmos-poster");
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env(
            "COSMOS_POSTER__GENERAL__LEDGER_PATH",
            dir.path().join("posted_content.json"),
        );
    for var in SECRET_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn timestamp(days_ago: i64) -> String {
    (OffsetDateTime::now_utc() - Duration::days(days_ago))
        .format(&Rfc3339)
        .expect("format timestamp")
}

fn write_ledger(dir: &TempDir, entries: &[(&str, i64)]) {
    let ledger: serde_json::Map<String, Value> = entries
        .iter()
        .map(|(id, days_ago)| {
            (
                id.to_string(),
                serde_json::json!({ "timestamp": timestamp(*days_ago) }),
            )
        })
        .collect();
    fs::write(
        dir.path().join("posted_content.json"),
        serde_json::to_string_pretty(&ledger).expect("serialize ledger"),
    )
    .expect("write ledger");
}

fn read_ledger(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).expect("read ledger")).expect("valid json")
}

#[test]
fn config_init_writes_example_file() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");

    cosmos_poster(&dir)
        .args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config file"));

    let content = fs::read_to_string(&config_path).expect("read config");
    let value: toml::Value = toml::from_str(&content).expect("valid toml");
    assert_eq!(value["general"]["initial_source"].as_str(), Some("nasa"));
    assert_eq!(value["general"]["poll_interval_secs"].as_integer(), Some(60));
    assert_eq!(value["x"]["max_chars"].as_integer(), Some(280));
    assert_eq!(value["nasa"]["api_key_env"].as_str(), Some("NASA_API_KEY"));
}

#[test]
fn config_init_refuses_to_overwrite() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "# mine\n").expect("seed config");

    cosmos_poster(&dir)
        .args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&config_path).unwrap(), "# mine\n");
}

#[test]
fn run_fails_without_nasa_key() {
    let dir = TempDir::new().expect("temp dir");

    cosmos_poster(&dir)
        .args(["run", "--once", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NASA_API_KEY"));

    assert!(!dir.path().join("outbox.jsonl").exists());
}

#[test]
fn run_rejects_unknown_initial_source() {
    let dir = TempDir::new().expect("temp dir");

    cosmos_poster(&dir)
        .env("COSMOS_POSTER__GENERAL__INITIAL_SOURCE", "moon")
        .args(["run", "--once"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("initial_source"));
}

#[test]
fn doctor_reports_missing_secrets() {
    let dir = TempDir::new().expect("temp dir");

    let output = cosmos_poster(&dir)
        .args(["doctor", "--json"])
        .output()
        .expect("run doctor");

    assert!(!output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(report["config"]["status"], "ok");
    assert_eq!(report["nasa"]["status"], "error");
    assert_eq!(report["x"]["status"], "error");
    assert_eq!(report["overall"], "error");
}

#[test]
fn ledger_list_and_check() {
    let dir = TempDir::new().expect("temp dir");
    write_ledger(&dir, &[("arxiv_2401.01234v1", 2), ("nasa_mars_102693", 1)]);

    let output = cosmos_poster(&dir)
        .args(["ledger", "list", "--json"])
        .output()
        .expect("run ledger list");
    assert!(output.status.success());

    let entries: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    let ids: Vec<&str> = entries
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|e| e["content_id"].as_str())
        .collect();
    assert_eq!(ids, vec!["nasa_mars_102693", "arxiv_2401.01234v1"]);

    cosmos_poster(&dir)
        .args(["ledger", "check", "arxiv_2401.01234v1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("was posted at"));

    cosmos_poster(&dir)
        .args(["ledger", "check", "nasa_apod_2024-05-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("has not been posted"));
}

#[test]
fn ledger_list_does_not_rewrite_file() {
    let dir = TempDir::new().expect("temp dir");
    write_ledger(&dir, &[("arxiv_123", 40), ("nasa_mars_7", 1)]);
    let path = dir.path().join("posted_content.json");

    cosmos_poster(&dir)
        .args(["ledger", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nasa_mars_7"))
        .stdout(predicate::str::contains("arxiv_123").not());

    assert!(read_ledger(&path).get("arxiv_123").is_some());
}

#[test]
fn ledger_prune_drops_old_entries() {
    let dir = TempDir::new().expect("temp dir");
    write_ledger(&dir, &[("arxiv_123", 40), ("nasa_mars_7", 1)]);
    let path = dir.path().join("posted_content.json");

    cosmos_poster(&dir)
        .args(["ledger", "prune"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pruned 1 item(s)"));

    let ledger = read_ledger(&path);
    assert!(ledger.get("arxiv_123").is_none());
    assert!(ledger.get("nasa_mars_7").is_some());
}

#[test]
fn ledger_prune_with_custom_window() {
    let dir = TempDir::new().expect("temp dir");
    write_ledger(&dir, &[("arxiv_1", 10), ("arxiv_2", 3)]);

    cosmos_poster(&dir)
        .args(["ledger", "prune", "--retention-days", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 remaining"));
}

#[test]
fn preview_rejects_unknown_source() {
    let dir = TempDir::new().expect("temp dir");

    cosmos_poster(&dir)
        .args(["preview", "moon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown content source"));
}

#[test]
fn preview_nasa_requires_key() {
    let dir = TempDir::new().expect("temp dir");

    cosmos_poster(&dir)
        .args(["preview", "nasa"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NASA_API_KEY"));
}
