//! Config loading is validated before anything else starts (SPEC_FULL
//! §4.13): an invalid document must fail fast with a non-zero exit and an
//! error on stderr, never a partially-started daemon.

use assert_cmd::Command;
use std::io::Write;

#[test]
fn unknown_field_in_config_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("prox.yaml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    writeln!(file, "not_a_real_field: true").unwrap();
    drop(file);

    Command::cargo_bin("proxd").unwrap().arg("--config").arg(&config_path).assert().failure();
}

#[test]
fn missing_config_file_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist.yaml");

    Command::cargo_bin("proxd").unwrap().arg("--config").arg(&missing).assert().failure();
}
