//! Integration tests for the `analyze` command.

mod common;

use common::{arg, formulate, run_json, temp_file};
use predicates::prelude::*;
use serde_json::json;

const SOURCE: &str = r#"
/// Monthly interest on a balance.
///
/// @tags ["finance"]
/// @param balance Outstanding balance @unit USD
/// @param rate Annual rate @default 0.2
/// @returns Interest for one month
pub fn monthly_interest(balance: f64, rate: f64) -> f64 {
    balance * rate / 12.0
}

fn helper() {}
"#;

#[test]
fn analyze_prints_definitions() {
    let file = temp_file(".rs", SOURCE);
    let (success, definitions) = run_json(&["analyze", &arg(&file)]);

    assert!(success);
    let definitions = definitions.as_array().unwrap();
    assert_eq!(definitions.len(), 1);
    let definition = &definitions[0];
    assert_eq!(definition["id"], json!("monthly_interest"));
    assert_eq!(definition["description"], json!("Monthly interest on a balance."));
    assert_eq!(definition["tags"], json!(["finance"]));
    assert_eq!(definition["inputs"][0]["unit"], json!("USD"));
    assert_eq!(definition["inputs"][1]["default"], json!(0.2));
    assert_eq!(definition["outputs"][0]["description"], json!("Interest for one month"));
}

#[test]
fn analyze_reads_stdin() {
    let (success, definitions) = {
        let output = formulate()
            .args(["analyze", "--compact", "-"])
            .write_stdin(SOURCE)
            .output()
            .unwrap();
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        assert_eq!(stdout.lines().count(), 1);
        (
            output.status.success(),
            serde_json::from_str::<serde_json::Value>(&stdout).unwrap(),
        )
    };
    assert!(success);
    assert_eq!(definitions[0]["id"], json!("monthly_interest"));
}

#[test]
fn analyze_unparseable_source_still_succeeds() {
    let file = temp_file(".rs", "pub fn broken(");
    formulate()
        .args(["analyze", &arg(&file)])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn analyze_missing_file() {
    formulate()
        .args(["analyze", "/nonexistent/formulas.rs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("/nonexistent/formulas.rs"));
}
