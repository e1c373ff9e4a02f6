use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn fixture(name: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn emits_generated_code_from_an_svd_file() {
    let mut cmd = Command::cargo_bin("perigen").unwrap();
    cmd.arg(fixture("dummy.svd"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("types {"))
        .stdout(predicate::str::contains("USART1 ="));
}

#[test]
fn emits_canonical_json_with_the_json_flag() {
    let mut cmd = Command::cargo_bin("perigen").unwrap();
    cmd.arg(fixture("dummy.svd")).arg("--json");
    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["types"]["peripherals"]["USART1"]["description"], "Universal synchronous/asynchronous receiver/transmitter");
}

#[test]
fn writes_to_an_output_path_creating_parent_directories() {
    let temp_dir = tempdir().unwrap();
    let output_path = temp_dir.path().join("nested/out.txt");

    let mut cmd = Command::cargo_bin("perigen").unwrap();
    cmd.arg(fixture("dummy.svd"))
        .arg("--output_path")
        .arg(&output_path);
    cmd.assert().success();

    let content = fs::read_to_string(&output_path).unwrap();
    assert!(content.contains("import mmio;"));
}

#[test]
fn explicit_schema_overrides_the_file_extension() {
    let mut cmd = Command::cargo_bin("perigen").unwrap();
    cmd.arg(fixture("dummy.svd")).arg("--schema").arg("svd");
    cmd.assert().success();
}

#[test]
fn missing_schema_on_stdin_input_is_an_explained_failure() {
    let mut cmd = Command::cargo_bin("perigen").unwrap();
    cmd.write_stdin("<device></device>");
    cmd.assert().code(1);
}

#[test]
fn an_unreadable_input_path_is_an_explained_failure() {
    let mut cmd = Command::cargo_bin("perigen").unwrap();
    cmd.arg(fixture("does-not-exist.svd"));
    cmd.assert().code(1);
}
