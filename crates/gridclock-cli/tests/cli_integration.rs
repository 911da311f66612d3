//! Integration tests for the gclk CLI.
//!
//! Run with: `cargo test --package gridclock-cli --test cli_integration`

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Run gclk with an isolated store and no user config.
fn run_gclk(store: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gclk"))
        .current_dir(store)
        .env("GCLK_STORE_DIR", store)
        .env_remove("GCLK_ENGINE_CONFIG")
        .args(args)
        .output()
        .expect("Failed to execute gclk command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    let output = run_gclk(dir.path(), &["--help"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("run"));
    assert!(text.contains("preset"));
}

#[test]
fn test_run_json_reports_and_edge() {
    let dir = TempDir::new().unwrap();
    let output = run_gclk(
        dir.path(),
        &["run", "--ticks", "12", "--edge", "3:and:2", "--format", "json"],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["ticks"], 12);
    assert_eq!(report["edits"][0]["accepted"], true);
    assert_eq!(report["rows"][3]["pattern_length"], 12);
    assert_eq!(report["rows"][3]["fire_count"], 1);
    assert_eq!(report["timeline"].as_array().unwrap().len(), 12);
}

#[test]
fn test_run_text_shows_rejection() {
    let dir = TempDir::new().unwrap();
    let output = run_gclk(
        dir.path(),
        &[
            "run", "--depth", "nested", "--edge", "0:and:1", "--edge", "1:and:2", "--edge",
            "2:and:0",
        ],
    );
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("rejected"));
    assert!(text.contains("cycle"));
}

#[test]
fn test_run_rejects_bad_arguments() {
    let dir = TempDir::new().unwrap();

    assert!(!run_gclk(dir.path(), &["run", "--edge", "3-and-2"]).status.success());
    assert!(!run_gclk(dir.path(), &["run", "--position", "2:3"]).status.success());
    assert!(!run_gclk(dir.path(), &["run", "--depth", "deep"]).status.success());
    assert!(!run_gclk(dir.path(), &["run", "--format", "yaml"]).status.success());
}

#[test]
fn test_preset_init_list_show() {
    let dir = TempDir::new().unwrap();

    let output = run_gclk(dir.path(), &["preset", "list"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("No presets"));

    let output = run_gclk(dir.path(), &["preset", "init"]);
    assert!(output.status.success());
    assert!(dir.path().join(".gridclock/presets/slot-0.json").exists());
    assert!(dir.path().join(".gridclock/active_slot.json").exists());

    let output = run_gclk(dir.path(), &["preset", "list"]);
    assert!(stdout(&output).contains("* slot 0"));

    let output = run_gclk(dir.path(), &["preset", "show", "0"]);
    assert!(output.status.success());
    let preset: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(preset["rows"].as_array().unwrap().len(), 8);
    assert_eq!(preset["rows"][7]["divisor"], 8);

    assert!(!run_gclk(dir.path(), &["preset", "show", "4"]).status.success());
    assert!(!run_gclk(dir.path(), &["preset", "show", "10"]).status.success());
}

#[test]
fn test_preset_store_flag_overrides_env() {
    let env_dir = TempDir::new().unwrap();
    let other = TempDir::new().unwrap();
    let other_path = other.path().to_str().unwrap();

    let output = run_gclk(env_dir.path(), &["preset", "init", "--store", other_path]);
    assert!(output.status.success());
    assert!(other.path().join(".gridclock/presets/slot-0.json").exists());
    assert!(!env_dir.path().join(".gridclock").exists());
}

#[test]
fn test_config_show_uses_env_store() {
    let dir = TempDir::new().unwrap();
    let output = run_gclk(dir.path(), &["config", "show"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains(&dir.path().display().to_string()));
    assert!(text.contains("Error blink:       333 ms"));
}
