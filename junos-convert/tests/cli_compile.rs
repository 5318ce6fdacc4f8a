use std::net::IpAddr;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use packet_model::{parse_file, Flow, LineAction};
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

fn ip(raw: &str) -> IpAddr {
    raw.parse().expect("ip")
}

#[test]
fn compile_writes_model_per_hostname() {
    let dir = tempdir().expect("tempdir");
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("junos-convert"));
    cmd.arg("compile")
        .arg(fixture("fixtures/branch-srx.json"))
        .arg("--output-dir")
        .arg(path_as_str(dir.path()))
        .assert()
        .success()
        .stdout(predicate::str::contains("hostname=branch-srx"))
        .stdout(predicate::str::contains("missing_action"));

    let compiled = parse_file(&dir.path().join("branch-srx.json")).expect("compiled model");
    assert!(compiled.dangling_acl_references().is_empty());

    let untrust = &compiled.interfaces["ge-0/0/1.0"];
    assert_eq!(untrust.zone.as_deref(), Some("untrust"));
    assert_eq!(
        untrust.incoming_filter.as_deref(),
        Some("~COMBINED_INCOMING_FILTER~ge-0/0/1.0")
    );
    assert_eq!(
        untrust.outgoing_filter.as_deref(),
        Some("~SECURITY_POLICY_TO~ge-0/0/1.0")
    );
    assert_eq!(
        compiled.interfaces["ge-0/0/0.0"].inbound_filter.as_deref(),
        Some("protect-re")
    );
    assert_eq!(
        compiled.ip_spaces.len(),
        3,
        "one registry entry per address-book entry"
    );

    let web = Flow::tcp("ge-0/0/0.0", ip("10.0.0.20"), 51000, ip("192.0.2.80"), 443);
    let telnet = Flow::tcp("ge-0/0/0.0", ip("10.0.0.20"), 51000, ip("192.0.2.80"), 23);
    let policy = "~SECURITY_POLICY_TO~ge-0/0/1.0";
    assert_eq!(compiled.filter(policy, &web).action, LineAction::Permit);
    assert_eq!(compiled.filter(policy, &telnet).action, LineAction::Deny);

    let ctx = compiled.eval_context();
    let published = Flow::tcp("ge-0/0/1.0", ip("203.0.113.9"), 40000, ip("198.51.100.80"), 80);
    let result = untrust
        .incoming_transformation
        .as_ref()
        .expect("destination NAT")
        .apply(&published, &ctx);
    assert_eq!(result.flow.dst_ip, ip("172.16.0.10"));
    assert_eq!(result.flow.dst_port, 8080);

    let outbound = Flow::tcp("ge-0/0/0.0", ip("10.0.0.20"), 51000, ip("192.0.2.80"), 443);
    let result = untrust
        .outgoing_transformation
        .as_ref()
        .expect("source NAT")
        .apply(&outbound, &ctx);
    assert_eq!(result.flow.src_ip, ip("198.51.100.2"));
}

#[test]
fn compile_reports_failures_without_blocking_other_inputs() {
    let dir = tempdir().expect("tempdir");
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("junos-convert"));
    cmd.arg("compile")
        .arg(fixture("fixtures/branch-srx.json"))
        .arg(fixture("fixtures/static-with-pools.toml"))
        .arg("--output-dir")
        .arg(path_as_str(dir.path()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("compile failed: 1 of 2 configurations"))
        .stdout(predicate::str::contains("static NAT must not define pools"));

    assert!(dir.path().join("branch-srx.json").exists());
    assert!(!dir.path().join("bad-static.json").exists());
}

#[test]
fn compile_strict_fails_on_warnings() {
    let dir = tempdir().expect("tempdir");
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("junos-convert"));
    cmd.arg("compile")
        .arg(fixture("fixtures/branch-srx.json"))
        .arg("--output-dir")
        .arg(path_as_str(dir.path()))
        .arg("--strict")
        .assert()
        .failure()
        .stderr(predicate::str::contains("strict mode"));
}

#[test]
fn compile_json_output_lists_reports() {
    let dir = tempdir().expect("tempdir");
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("junos-convert"));
    let output = cmd
        .arg("compile")
        .arg(fixture("fixtures/branch-srx.json"))
        .arg("--output-dir")
        .arg(path_as_str(dir.path()))
        .arg("--format")
        .arg("json")
        .output()
        .expect("run");
    assert!(output.status.success());
    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(reports[0]["hostname"], "branch-srx");
    assert_eq!(reports[0]["red_flags"], 1);
}

fn path_as_str(path: &Path) -> &str {
    path.to_str().expect("utf8 path")
}
