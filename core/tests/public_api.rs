//! Integration tests for the public API.
//!
//! These tests go through the crate root only: analyze real source, store the
//! definitions, and execute them on each backend.

use formulate_core::model::{CreationKind, RemoteBundleInfo};
use formulate_core::{
    Backend, ErrorKind, FormulaDefinition, FormulaRepository, MemoryStore, Orchestrator,
    RecordStore, SourceUnit, StaticFetcher, analyze, stdlib,
};
use pretty_assertions::assert_eq;
use serde_json::{Map, Value, json};
use std::sync::Arc;

const DISCOUNT_SOURCE: &str = r#"
/// Price after a percentage discount.
///
/// @tags ["retail"]
/// @engineHint.default.rounding floor
/// @engineHint.default.scale 2
/// @param price List price @unit USD
/// @param percent Discount in percent @default 10
/// @returns Discounted price
pub fn discounted_price(price: f64, percent: f64) -> f64 {
    price * (1.0 - percent / 100.0)
}
"#;

fn inputs(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[test]
fn test_definition_record_shape() {
    let definitions = analyze(&[SourceUnit::new("discount.rs", DISCOUNT_SOURCE)]);
    assert_eq!(definitions.len(), 1);

    let record = serde_json::to_value(&definitions[0]).unwrap();
    assert_eq!(record["id"], json!("discounted_price"));
    assert_eq!(record["version"], json!("1.0.0"));
    assert_eq!(record["creationKind"], json!("imported"));
    assert_eq!(record["tags"], json!(["retail"]));
    assert_eq!(
        record["engineHints"]["default"],
        json!({"rounding": "floor", "scale": 2})
    );
    assert_eq!(record["inputs"][0]["key"], json!("price"));
    assert_eq!(record["inputs"][0]["baseType"], json!("number"));
    assert_eq!(record["inputs"][0]["unit"], json!("USD"));
    assert_eq!(record["inputs"][1]["default"], json!(10));
    assert_eq!(record["outputs"][0]["key"], json!("result"));
    assert!(record["sourceText"].as_str().unwrap().contains("pub fn discounted_price"));
    assert!(record.get("remoteBundleInfo").is_none());

    let restored: FormulaDefinition = serde_json::from_value(record).unwrap();
    assert_eq!(restored, definitions[0]);
}

#[test]
fn test_null_default_survives_round_trip() {
    let source = r#"
/// Label with an optional override.
///
/// @param label Display label @default null
pub fn labelled(label: Option<String>) -> String {
    label.unwrap_or_default()
}
"#;
    let definitions = analyze(&[SourceUnit::new("label.rs", source)]);
    assert_eq!(definitions[0].inputs[0].default, Some(Value::Null));

    let bytes = serde_json::to_vec(&definitions[0]).unwrap();
    let record: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(record["inputs"][0]["default"], Value::Null);
    assert!(record["inputs"][0].as_object().unwrap().contains_key("default"));

    let restored: FormulaDefinition = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(restored, definitions[0]);
}

#[tokio::test]
async fn test_repository_round_trip() {
    let store = Arc::new(MemoryStore::new());
    let repository = FormulaRepository::new(store.clone() as Arc<dyn RecordStore>);

    for definition in stdlib::definitions() {
        repository.save(&definition).await.unwrap();
    }
    let listed = repository.list().await.unwrap();
    assert_eq!(listed, stdlib::definitions());

    let loaded = repository.load("loan_payment").await.unwrap().unwrap();
    assert_eq!(loaded.creation_kind, CreationKind::Embedded);
    assert_eq!(repository.load("missing").await.unwrap(), None);

    repository.remove("loan_payment").await.unwrap();
    assert_eq!(repository.list().await.unwrap().len(), listed.len() - 1);
}

#[tokio::test]
async fn test_analyze_then_execute_embedded() {
    let definitions = analyze(&[SourceUnit::new("discount.rs", DISCOUNT_SOURCE)]);
    let mut natives = stdlib::natives();
    natives.register("discounted_price", |args| {
        let price = formulate_core::callable::number_arg("discounted_price", args, 0, "price")?;
        let percent = args.get(1).and_then(Value::as_f64).unwrap_or(10.0);
        Ok(json!(price * (1.0 - percent / 100.0)))
    });
    let orchestrator = Orchestrator::builder().natives(natives).build();

    let result = orchestrator
        .execute(
            &definitions[0],
            &inputs(json!({"price": 19.99, "percent": 15})),
            None,
        )
        .await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.backend, Backend::Embedded);
    // 16.9915 floored at two digits
    assert_eq!(result.result(), Some(&json!(16.99)));

    let record = serde_json::to_value(&result).unwrap();
    assert_eq!(record["success"], json!(true));
    assert_eq!(record["backend"], json!("embedded"));
    assert!(record["durationMs"].is_number());
    assert!(record.get("error").is_none());
}

#[tokio::test]
async fn test_remote_bundle_end_to_end() {
    let fetcher = Arc::new(StaticFetcher::new().with(
        "https://bundles.test/discount.rhai",
        "fn discounted_price(price, percent) { price * (1.0 - percent / 100.0) }",
    ));
    let orchestrator = Orchestrator::builder().fetcher(fetcher.clone()).build();

    let mut definition = analyze(&[SourceUnit::new("discount.rs", DISCOUNT_SOURCE)])
        .pop()
        .unwrap();
    definition.remote_bundle_info = Some(RemoteBundleInfo {
        enabled: true,
        url: "https://bundles.test/discount.rhai".to_string(),
        function_name: "discounted_price".to_string(),
        allowed_modules: None,
    });

    let args = inputs(json!({"price": 200.0, "percent": 12.5}));
    for _ in 0..2 {
        let result = orchestrator.execute(&definition, &args, None).await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.backend, Backend::Remote);
        assert_eq!(result.result(), Some(&json!(175.0)));
    }
    assert_eq!(fetcher.request_count(), 1);
    assert_eq!(orchestrator.cache().stats().await.unwrap().entries, 1);

    let embedded = orchestrator
        .execute(&definition, &args, Some(Backend::Embedded))
        .await;
    let failure = embedded.error.unwrap();
    assert_eq!(failure.kind, ErrorKind::Resolution);
}
