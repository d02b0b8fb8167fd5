//! Integration tests for the `cache` command.

mod common;

use common::{check_stdout, formulate};
use expect_test::expect;
use predicates::prelude::*;
use serde_json::json;

/// Write a bundle record the way the cache manager persists it.
fn seed(dir: &std::path::Path, formula_id: &str, version: &str, fetched_at: &str) {
    let text = format!("fn {formula_id}(x) {{ x }}");
    let record = json!({
        "id": format!("{formula_id}:{version}"),
        "formulaId": formula_id,
        "version": version,
        "sourceUrl": format!("http://bundles.test/{formula_id}/{version}.rhai"),
        "sourceText": text,
        "functionName": formula_id,
        "fetchedAt": fetched_at,
        "integrityHash": formulate::cache::integrity_hash(&text),
    });
    let file_name = format!("bundle%2F{formula_id}%3A{version}.json");
    std::fs::write(dir.join(file_name), record.to_string()).unwrap();
}

#[test]
fn stats_on_empty_cache() {
    let dir = tempfile::tempdir().unwrap();
    check_stdout(
        &["cache", "--cache-dir", dir.path().to_str().unwrap(), "stats"],
        None,
        expect![[r#"
            entries: 0
            total bytes: 0
        "#]],
    );
}

#[test]
fn prune_keeps_newest_versions() {
    let dir = tempfile::tempdir().unwrap();
    for (version, minute) in [("1", "01"), ("2", "02"), ("3", "03"), ("4", "04"), ("5", "05")] {
        seed(dir.path(), "npv", version, &format!("2026-01-01T00:{minute}:00Z"));
    }
    seed(dir.path(), "irr", "1", "2026-01-01T00:00:00Z");
    let cache_dir = dir.path().to_str().unwrap();

    check_stdout(
        &["cache", "--cache-dir", cache_dir, "prune", "npv", "--keep", "3"],
        None,
        expect![[r#"
            removed 2 version(s) of npv
        "#]],
    );

    formulate()
        .args(["cache", "--cache-dir", cache_dir, "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("entries: 4"))
        .stdout(predicate::str::contains("npv:5"))
        .stdout(predicate::str::contains("npv:1 ").not())
        .stdout(predicate::str::contains("irr:1"));
}

#[test]
fn prune_defaults_to_configured_keep_latest() {
    let dir = tempfile::tempdir().unwrap();
    for version in ["1", "2", "3"] {
        seed(dir.path(), "npv", version, &format!("2026-01-0{version}T00:00:00Z"));
    }
    let config = common::temp_file(".json", r#"{"cache": {"keepLatest": 1}}"#);

    check_stdout(
        &[
            "--config",
            config.path().to_str().unwrap(),
            "cache",
            "--cache-dir",
            dir.path().to_str().unwrap(),
            "prune",
            "npv",
        ],
        None,
        expect![[r#"
            removed 2 version(s) of npv
        "#]],
    );
}

#[test]
fn clear_removes_every_bundle() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), "npv", "1", "2026-01-01T00:00:00Z");
    seed(dir.path(), "irr", "1", "2026-01-01T00:00:00Z");
    std::fs::write(dir.path().join("formula%2Fnpv.json"), "{}").unwrap();
    let cache_dir = dir.path().to_str().unwrap();

    check_stdout(
        &["cache", "--cache-dir", cache_dir, "clear"],
        None,
        expect![[r#"
            removed 2 bundle(s)
        "#]],
    );
    assert!(dir.path().join("formula%2Fnpv.json").exists());
}
