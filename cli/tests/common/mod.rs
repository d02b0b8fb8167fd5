//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use expect_test::Expect;
use serde_json::Value;
use std::io::Write;

/// Create a new command for the formulate binary.
pub fn formulate() -> Command {
    Command::new(env!("CARGO_BIN_EXE_formulate"))
}

/// Create a temporary file with the given content and suffix.
pub fn temp_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

/// Path of a temp file as a command-line argument.
pub fn arg(file: &tempfile::NamedTempFile) -> String {
    file.path().to_str().unwrap().to_string()
}

/// Run a command and check that stdout matches the expected output.
pub fn check_stdout(args: &[&str], stdin: Option<&str>, expected: Expect) {
    let mut cmd = formulate();
    cmd.args(args);
    if let Some(input) = stdin {
        cmd.write_stdin(input);
    }
    let output = cmd.output().expect("failed to execute command");
    let stdout = String::from_utf8_lossy(&output.stdout);
    expected.assert_eq(&stdout);
}

/// Run a command and parse its stdout as JSON.
///
/// Returns the exit status alongside, since failed executions still print.
pub fn run_json(args: &[&str]) -> (bool, Value) {
    let output = formulate()
        .args(args)
        .output()
        .expect("failed to execute command");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json = serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("stdout is not JSON ({e}): {stdout}"));
    (output.status.success(), json)
}
