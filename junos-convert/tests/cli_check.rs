use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

#[test]
fn check_lists_warnings_and_succeeds() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("junos-convert"));
    cmd.arg("check")
        .arg(fixture("fixtures/branch-srx.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("WARN hostname=branch-srx"))
        .stdout(predicate::str::contains("settings=embedded"))
        .stdout(predicate::str::contains("red_flags=1"))
        .stdout(predicate::str::contains(
            "[red-flag] missing_action: filter protect-edge term unfinished",
        ));
}

#[test]
fn check_strict_fails_on_warnings() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("junos-convert"));
    cmd.arg("check")
        .arg(fixture("fixtures/branch-srx.json"))
        .arg("--strict")
        .assert()
        .failure()
        .stderr(predicate::str::contains("check failed in strict mode"));
}

#[test]
fn check_fails_on_structural_error() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("junos-convert"));
    cmd.arg("check")
        .arg(fixture("fixtures/static-with-pools.toml"))
        .assert()
        .failure()
        .stdout(predicate::str::contains("FAIL hostname=bad-static"))
        .stderr(predicate::str::contains("check failed"))
        .stderr(predicate::str::contains("static NAT must not define pools"));
}

#[test]
fn check_reports_unreferenced_objects() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("junos-convert"));
    cmd.arg("check")
        .arg(fixture("fixtures/unused-objects.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("WARN hostname=lab-srx"))
        .stdout(predicate::str::contains("red_flags=1 unimplemented=0 pedantic=3"))
        .stdout(predicate::str::contains(
            "[pedantic] unused_firewall_filter: firewall filter old-edge is not referenced",
        ))
        .stdout(predicate::str::contains(
            "[red-flag] empty_prefix_list: prefix-list placeholder has no prefixes",
        ))
        .stdout(predicate::str::contains("prefix-list retired is not referenced"))
        .stdout(predicate::str::contains("prefix-list mgmt").not());
}

#[test]
fn check_reads_settings_file() {
    let dir = tempdir().expect("tempdir");
    let settings = dir.path().join("settings.toml");
    fs::write(&settings, "emit_trace_tags = false\n").expect("write settings");

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("junos-convert"));
    cmd.arg("check")
        .arg(fixture("fixtures/branch-srx.json"))
        .arg("--settings")
        .arg(path_as_str(&settings))
        .assert()
        .success()
        .stdout(predicate::str::contains("settings=file:"));
}

#[test]
fn check_rejects_inverted_pat_range() {
    let dir = tempdir().expect("tempdir");
    let settings = dir.path().join("settings.toml");
    fs::write(&settings, "pat_port_start = 9000\npat_port_end = 8000\n").expect("write settings");

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("junos-convert"));
    cmd.arg("check")
        .arg(fixture("fixtures/branch-srx.json"))
        .arg("--settings")
        .arg(path_as_str(&settings))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load settings"));
}

#[test]
fn check_json_reports_counts() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("junos-convert"));
    let output = cmd
        .arg("check")
        .arg(fixture("fixtures/branch-srx.json"))
        .arg("--format")
        .arg("json")
        .output()
        .expect("run");
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(report["hostname"], "branch-srx");
    assert_eq!(report["red_flags"], 1);
    assert!(report.get("error").is_none());
}

#[test]
fn check_reports_missing_input() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("junos-convert"));
    cmd.arg("check")
        .arg(fixture("fixtures/does-not-exist.json"))
        .assert()
        .failure()
        .stdout(predicate::str::contains("FAIL hostname=does-not-exist"));
}

fn path_as_str(path: &Path) -> &str {
    path.to_str().expect("utf8 path")
}
