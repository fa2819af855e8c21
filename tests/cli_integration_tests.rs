//! CLI Integration Tests
//!
//! Runs the `rooms` binary against a workbook in a temporary directory.

// Skip CLI tests during coverage builds
#![cfg(not(coverage))]
#![allow(deprecated)] // Command::cargo_bin deprecation - no stable replacement yet

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn rooms(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("rooms").unwrap();
    cmd.env_remove("ROOMS_CONFIG")
        .env_remove("ROOMS_DATA")
        .arg("--data")
        .arg(workbook(dir));
    cmd
}

fn workbook(dir: &TempDir) -> PathBuf {
    dir.path().join("rooms.xlsx")
}

fn seed(dir: &TempDir) {
    rooms(dir)
        .args(["rooms", "add", "HN", "3.17", "--capacity", "2"])
        .assert()
        .success();
    rooms(dir)
        .args([
            "occupants",
            "add",
            "Smith, Ann",
            "--building",
            "HN",
            "--office",
            "3.17",
            "--position",
            "Lecturer",
        ])
        .assert()
        .success();
}

// ═══════════════════════════════════════════════════════════════════════════
// HELP AND VERSION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("rooms").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("rooms"))
        .stdout(predicate::str::contains("COMMANDS"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("rooms").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rooms"));
}

#[test]
fn test_status_help_lists_availability_classes() {
    let mut cmd = Command::cargo_bin("rooms").unwrap();
    cmd.args(["status", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("has-space"));
}

// ═══════════════════════════════════════════════════════════════════════════
// WORKBOOK COMMANDS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_empty_workbook_status() {
    let dir = TempDir::new().unwrap();
    rooms(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No rooms match"));
    assert!(!workbook(&dir).exists());
}

#[test]
fn test_add_room_and_occupant() {
    let dir = TempDir::new().unwrap();
    seed(&dir);
    assert!(workbook(&dir).exists());
    assert!(dir.path().join("room_capacities.json").exists());

    rooms(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("3.17"))
        .stdout(predicate::str::contains("Has Space (1 available)"));

    rooms(&dir)
        .args(["occupants", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Smith, Ann"));
}

#[test]
fn test_second_save_creates_backup() {
    let dir = TempDir::new().unwrap();
    seed(&dir);
    let backups: Vec<_> = std::fs::read_dir(dir.path().join("backup"))
        .unwrap()
        .flatten()
        .collect();
    assert_eq!(backups.len(), 1);

    rooms(&dir)
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rooms_"));
}

#[test]
fn test_unassigned_current_occupant_blocks_save() {
    let dir = TempDir::new().unwrap();
    rooms(&dir)
        .args(["occupants", "add", "Nguyen, Tam"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing Building or Office"));
    assert!(!workbook(&dir).exists());

    rooms(&dir)
        .args(["occupants", "add", "Nguyen, Tam", "--ignore-warnings"])
        .assert()
        .success();
    assert!(workbook(&dir).exists());
}

#[test]
fn test_dry_run_leaves_workbook_alone() {
    let dir = TempDir::new().unwrap();
    rooms(&dir)
        .args(["rooms", "add", "HN", "1.01", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"));
    assert!(!workbook(&dir).exists());
}

#[test]
fn test_suggest_for_upcoming() {
    let dir = TempDir::new().unwrap();
    seed(&dir);
    rooms(&dir)
        .args(["rooms", "suggest", "--status", "upcoming"])
        .assert()
        .success()
        .stdout(predicate::str::contains("HN - 3.17 [Occupied (1/2, 1 available)]"));
}

#[test]
fn test_summary_and_reports() {
    let dir = TempDir::new().unwrap();
    seed(&dir);
    rooms(&dir)
        .arg("summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("Occupancy Rate"))
        .stdout(predicate::str::contains("50.0%"));
    rooms(&dir)
        .args(["report", "buildings"])
        .assert()
        .success()
        .stdout(predicate::str::contains("HN"));
    rooms(&dir).args(["report", "utilization"]).assert().success();
    rooms(&dir)
        .args(["report", "occupants"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Lecturer"));
}

#[test]
fn test_unknown_availability_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    rooms(&dir)
        .args(["status", "--availability", "roomy"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown availability"));
}

#[test]
fn test_status_hides_full_rooms_unless_all() {
    let dir = TempDir::new().unwrap();
    seed(&dir);
    rooms(&dir)
        .args(["rooms", "capacity", "HN", "3.17", "1"])
        .assert()
        .success();

    rooms(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No rooms match"));

    rooms(&dir)
        .args(["status", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3.17"));

    rooms(&dir)
        .args(["status", "--availability", "full"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3.17"));
}

#[test]
fn test_report_occupants_shows_status_distribution() {
    let dir = TempDir::new().unwrap();
    seed(&dir);
    rooms(&dir)
        .args(["report", "occupants"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status distribution"))
        .stdout(predicate::str::contains("Upcoming"));
}

#[test]
fn test_export_csv_building_summary() {
    let dir = TempDir::new().unwrap();
    seed(&dir);
    let out = dir.path().join("exports");
    rooms(&dir)
        .args(["export", "csv", "buildings", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("building_summary.csv"));
}

#[test]
fn test_export_csv() {
    let dir = TempDir::new().unwrap();
    seed(&dir);
    let out = dir.path().join("exports");
    rooms(&dir)
        .args(["export", "csv", "current", "rooms", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("current_occupants.csv"))
        .stdout(predicate::str::contains("room_utilization.csv"));
}

#[test]
fn test_init_writes_settings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rooms.yaml");
    let mut cmd = Command::cargo_bin("rooms").unwrap();
    cmd.arg("init")
        .arg(&path)
        .args(["--password", "s3cret"])
        .assert()
        .success();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("password_sha256"));
    assert!(content.contains("default_capacity: 2"));

    let mut again = Command::cargo_bin("rooms").unwrap();
    again.arg("init").arg(&path).assert().failure();
}
