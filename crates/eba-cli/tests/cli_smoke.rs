use assert_cmd::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn fixture() -> PathBuf {
    let path = repo_root()
        .join("fixtures")
        .join("payloads")
        .join("recommended.json");
    assert!(path.exists(), "fixture missing: {}", path.display());
    path
}

#[test]
fn cli_renders_pdf_smoke() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("ana.pdf");

    let exe = assert_cmd::cargo_bin!("eba");
    Command::new(exe)
        .args([
            "render",
            "--no-charts",
            "--role",
            "Data Analyst",
            "--generated-at",
            "2025-03-14T09:30",
            "--out",
            out.to_string_lossy().as_ref(),
            fixture().to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let bytes = fs::read(&out).expect("read pdf");
    assert!(bytes.starts_with(b"%PDF-"), "output is not a PDF");
}

#[test]
fn cli_renders_pdf_with_default_out_path_for_file_input() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let tmp_fixture = tmp.path().join("ana.json");
    fs::copy(fixture(), &tmp_fixture).expect("copy fixture");

    let exe = assert_cmd::cargo_bin!("eba");
    Command::new(exe)
        .args(["render", "--no-charts", tmp_fixture.to_string_lossy().as_ref()])
        .assert()
        .success();

    let bytes = fs::read(tmp_fixture.with_extension("pdf")).expect("read pdf");
    assert!(bytes.starts_with(b"%PDF-"), "output is not a PDF");
}

#[test]
fn cli_validate_prints_competency_buckets() {
    let exe = assert_cmd::cargo_bin!("eba");
    let output = Command::new(exe)
        .args(["validate", fixture().to_string_lossy().as_ref()])
        .output()
        .expect("run eba");
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let names = |bucket: &str| -> Vec<String> {
        value["buckets"][bucket]
            .as_array()
            .expect("bucket array")
            .iter()
            .map(|c| c["name"].as_str().unwrap_or_default().to_string())
            .collect()
    };
    assert_eq!(names("strengths"), vec!["Communication"]);
    assert_eq!(names("critical"), vec!["Planning"]);
    assert_eq!(names("neutral"), vec!["Teamwork"]);
    assert_eq!(value["payload"]["decision"], "RECOMMENDED");
}

#[test]
fn cli_sanitize_reads_stdin() {
    let exe = assert_cmd::cargo_bin!("eba");
    let output = assert_cmd::Command::new(exe)
        .args(["sanitize", "--max-token", "8", "-"])
        .write_stdin("\u{201C}quoted\u{201D} abcdefghijkl")
        .output()
        .expect("run eba");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "\"quoted\" abcdefgh ijkl");
}

#[test]
fn cli_usage_errors_exit_with_status_2() {
    let exe = assert_cmd::cargo_bin!("eba");
    Command::new(exe).args(["--bogus"]).assert().code(2);
}

#[test]
fn cli_reports_malformed_payloads() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let bad = tmp.path().join("bad.json");
    fs::write(&bad, "{not json").expect("write");

    let exe = assert_cmd::cargo_bin!("eba");
    Command::new(exe)
        .args(["render", bad.to_string_lossy().as_ref()])
        .assert()
        .code(1);
}
