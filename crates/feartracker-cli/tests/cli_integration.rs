//! CLI Integration Tests
//!
//! These tests verify the CLI commands work correctly end-to-end against a
//! temporary data directory.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// Create a CLI command with a temporary data directory
fn cli_cmd(data_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("feartracker").expect("Failed to find feartracker binary");
    cmd.arg("--data-dir").arg(data_dir.path());
    cmd
}

// ============================================================================
// Status
// ============================================================================

#[test]
fn test_status_on_fresh_data_dir() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Fear: 0 / 12"))
        .stdout(predicate::str::contains("Inactive pips: 12"))
        .stdout(predicate::str::contains("[○○○○○○○○○○○○]"));
}

#[test]
fn test_verbose_logs_go_to_stderr() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .env_remove("RUST_LOG")
        .args(["-vv", "status"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Opened settings stores"))
        .stdout(predicate::str::contains("Opened settings stores").not());
}

// ============================================================================
// Changing Fear
// ============================================================================

#[test]
fn test_add_persists_across_runs() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["add", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fear: 2 / 12"))
        .stdout(predicate::str::contains("Authority: 2"));

    cli_cmd(&data_dir)
        .arg("add")
        .assert()
        .success()
        .stdout(predicate::str::contains("Fear: 3 / 12"))
        .stdout(predicate::str::contains("[○○○○○○○○○●●●]"));

    cli_cmd(&data_dir)
        .args(["remove", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fear: 1 / 12"));
}

#[test]
fn test_player_cannot_add() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["--role", "player", "add"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Only the gamemaster"));
}

#[test]
fn test_set_authority_updates_mirror() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["set-authority", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fear: 5 / 12"))
        .stdout(predicate::str::contains("Inactive pips: 7"));
}

#[test]
fn test_set_authority_clamps() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["set-authority", "-5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fear: 0 / 12"));

    cli_cmd(&data_dir)
        .args(["set-authority", "999"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fear: 12 / 12"));
}

// ============================================================================
// Bounds
// ============================================================================

#[test]
fn test_set_max_number_and_json() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["set-max", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fear: 0 / 20"));

    cli_cmd(&data_dir)
        .args(["set-max", "{\"maxFear\": 8}"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fear: 0 / 8"));
}

#[test]
fn test_set_max_rejects_garbage() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["set-max", "lots"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a number or JSON"));
}

// ============================================================================
// Visibility and Position
// ============================================================================

#[test]
fn test_toggle_visibility() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .arg("toggle-visibility")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tracker is now hidden"));

    // A player sees the hidden flag; a gamemaster starting up forces it back on.
    cli_cmd(&data_dir)
        .args(["--role", "player", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Visible: no"));

    cli_cmd(&data_dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Visible: yes"));
}

#[test]
fn test_reset_position() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["reset-position", "--x", "40", "--y", "10%"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tracker moved to left: 40px, top: 10%"));

    cli_cmd(&data_dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Position: left: 40px, top: 10%"));
}

#[test]
fn test_config_file_is_read() {
    let data_dir = TempDir::new().unwrap();
    std::fs::write(
        data_dir.path().join("feartracker.json"),
        r#"{ "viewport_width": 1000 }"#,
    )
    .unwrap();

    // Gamemaster container: 700px slider plus three 36px controls
    cli_cmd(&data_dir)
        .arg("reset-position")
        .assert()
        .success()
        .stdout(predicate::str::contains("left: 96px, top: 100px"));
}

// ============================================================================
// Simulation
// ============================================================================

#[test]
fn test_simulate_default_steps() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["simulate", "--players", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("start (fear 0 / 12)"))
        .stdout(predicate::str::contains("Authority(5.0) (fear 5 / 12)"))
        .stdout(predicate::str::contains("Max(8) (fear 5 / 8)"))
        .stdout(predicate::str::contains("Remove(1) (fear 4 / 8)"))
        .stdout(predicate::str::contains("player 1"));
}

#[test]
fn test_simulate_rejects_unknown_step() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["simulate", "--steps", "jump"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown step"));
}
