//! Exit code contract: 0 ok, 1 failed, 2 config/infrastructure, 3 unstable.

#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

fn ecurun() -> Command {
    let mut cmd = Command::cargo_bin("ecurun").unwrap();
    cmd.env_remove("ECURUN_CONFIG").env("RUST_LOG", "error");
    cmd
}

// =============================================================================
// verdict
// =============================================================================

#[test]
fn contract_verdict_ok() {
    ecurun()
        .args(["verdict", "--passed", "10", "--failed", "0"])
        .assert()
        .code(0)
        .stdout("OK\n");
}

#[test]
fn contract_verdict_unstable() {
    // 1 of 10 failed = 10.0%, above 5 but not above 50
    ecurun()
        .args(["verdict", "--passed", "9", "--failed", "1"])
        .args(["--unstable-threshold", "5", "--failed-threshold", "50"])
        .assert()
        .code(3)
        .stdout("UNSTABLE\n");
}

#[test]
fn contract_verdict_failed() {
    ecurun()
        .args(["verdict", "--passed", "1", "--failed", "1"])
        .args(["--failed-threshold", "49.9"])
        .assert()
        .code(1)
        .stdout("FAILED\n");
}

#[test]
fn contract_verdict_threshold_is_exclusive() {
    ecurun()
        .args(["verdict", "--passed", "1", "--failed", "1"])
        .args(["--unstable-threshold", "50", "--failed-threshold", "50"])
        .assert()
        .code(0);
}

#[test]
fn contract_verdict_empty_results() {
    ecurun().args(["verdict"]).assert().code(1);
    ecurun()
        .args(["verdict", "--allow-missing"])
        .assert()
        .code(0)
        .stdout("OK\n");
}

#[test]
fn contract_verdict_huge_counts() {
    ecurun()
        .args(["verdict", "--passed", "18446744073709551615", "--failed", "1"])
        .assert()
        .code(0)
        .stdout("OK\n");
}

#[test]
fn contract_verdict_json() {
    let out = ecurun()
        .args(["verdict", "--passed", "2", "--failed", "1", "--skipped", "0", "--json"])
        .args(["--unstable-threshold", "10", "--failed-threshold", "90"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));
    let v: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["verdict"], "UNSTABLE");
    assert_eq!(v["failed_percentage"], 33.3);
    assert_eq!(v["counts"]["total"], 3);
}

// =============================================================================
// config and usage errors
// =============================================================================

#[test]
fn contract_help_lists_subcommands() {
    ecurun()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("archive"))
        .stdout(predicate::str::contains("upload"))
        .stdout(predicate::str::contains("unit"))
        .stdout(predicate::str::contains("verdict"));
}

#[test]
fn contract_unsupported_config_version() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("ci.yaml"), "version: 9\n").unwrap();
    ecurun()
        .current_dir(dir.path())
        .args(["archive", "reports", "--target", "out", "--config", "ci.yaml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unsupported config version"));
}

#[test]
fn contract_named_config_missing() {
    let dir = tempdir().unwrap();
    ecurun()
        .current_dir(dir.path())
        .args(["archive", "reports", "--target", "out", "--config", "missing.yaml"])
        .assert()
        .code(2);
}

#[test]
fn contract_run_rejects_unknown_test_file() {
    let dir = tempdir().unwrap();
    ecurun()
        .current_dir(dir.path())
        .args(["run", "notes.txt"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("expected a .pkg or .prj file"));
}

#[test]
fn contract_upload_without_service() {
    let dir = tempdir().unwrap();
    ecurun()
        .current_dir(dir.path())
        .args(["upload", "reports"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no reporting service configured"));
}

// =============================================================================
// archive (no tool needed)
// =============================================================================

#[test]
fn contract_archive_writes_index() {
    let dir = tempdir().unwrap();
    let report = dir.path().join("reports").join("Regression");
    fs::create_dir_all(report.join("Report Lights")).unwrap();
    fs::write(report.join("Regression.trf"), b"trf").unwrap();
    fs::write(report.join("Report Lights").join("Lights.trf"), b"trf").unwrap();

    ecurun()
        .current_dir(dir.path())
        .args(["archive", "reports/Regression", "--target", "archive"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("reports.json"));

    let index = fs::read_to_string(dir.path().join("archive").join("reports.json")).unwrap();
    let v: Value = serde_json::from_str(&index).unwrap();
    assert_eq!(v[0]["id"], 1);
    assert_eq!(v[0]["title"], "Regression");
    assert_eq!(v[0]["children"][0]["title"], "Lights");
    assert_eq!(v[0]["children"][0]["id"], 2);
    assert!(dir
        .path()
        .join("archive/Regression/Report Lights/Lights.trf")
        .exists());
}

#[test]
fn contract_archive_missing_report() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("reports").join("Empty")).unwrap();

    ecurun()
        .current_dir(dir.path())
        .args(["archive", "reports/Empty", "--target", "archive"])
        .assert()
        .code(1);

    ecurun()
        .current_dir(dir.path())
        .args(["archive", "reports/Empty", "--target", "archive", "--allow-missing"])
        .assert()
        .code(0);
}

#[test]
fn contract_archive_target_holding_reports() {
    let dir = tempdir().unwrap();
    let report = dir.path().join("reports").join("Smoke");
    fs::create_dir_all(&report).unwrap();
    fs::write(report.join("Smoke.trf"), b"trf").unwrap();

    ecurun()
        .current_dir(dir.path())
        .args(["archive", "reports/Smoke", "--target", "reports"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("contains report directory"));

    assert!(report.join("Smoke.trf").exists());
}
