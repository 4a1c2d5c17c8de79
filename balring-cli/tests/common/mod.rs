#![allow(dead_code)]

use assert_cmd::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

pub fn cli() -> Command {
    let mut cmd = Command::cargo_bin("balring-cli").expect("binary exists");
    cmd.env("RUST_LOG", "error");
    cmd
}

/// Writes `contents` to a temporary YAML file kept alive by the returned handle.
pub fn yaml_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

pub fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().expect("run balring-cli");
    assert!(output.status.success(), "command failed: {:?}", output);
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}
