//! Tests for source analysis

use super::{SourceUnit, analyze};
use crate::model::{
    BaseType, CreationKind, EngineHint, FormulaDefinition, PropertySpec, Rounding, TypeModel,
};
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::json;

fn analyze_one(text: &str) -> Vec<FormulaDefinition> {
    analyze(&[SourceUnit::new("lib.rs", text)])
}

fn only(text: &str) -> FormulaDefinition {
    let mut defs = analyze_one(text);
    assert_eq!(defs.len(), 1, "expected exactly one definition");
    defs.remove(0)
}

#[test]
fn test_tags_hints_and_params() {
    let def = only(indoc! {r#"
        /// Net present value of a series of cash flows.
        ///
        /// @id npv
        /// @name Net Present Value
        /// @version 2.1.0
        /// @tags ["finance", "valuation"]
        /// @engineHint.static.rounding round
        /// @engineHint.static.scale 2
        /// @param rate Discount rate per period @unit % @default 0.05
        /// @param flows Cash flows, first one at t=0
        /// @returns Present value
        pub fn net_present_value(rate: f64, flows: Vec<f64>) -> f64 {
            flows
                .iter()
                .enumerate()
                .map(|(t, cf)| cf / (1.0 + rate).powi(t as i32))
                .sum()
        }
    "#});

    assert_eq!(def.id, "npv");
    assert_eq!(def.name, "Net Present Value");
    assert_eq!(def.version, "2.1.0");
    assert_eq!(
        def.description.as_deref(),
        Some("Net present value of a series of cash flows.")
    );
    assert_eq!(
        def.tags,
        Some(vec!["finance".to_string(), "valuation".to_string()])
    );
    assert_eq!(
        def.engine_hints.unwrap()["static"],
        EngineHint {
            rounding: Rounding::Round,
            scale: 2
        }
    );
    assert_eq!(def.creation_kind, CreationKind::Imported);

    let keys: Vec<_> = def.inputs.iter().map(|i| i.key.as_str()).collect();
    assert_eq!(keys, vec!["rate", "flows"]);

    let rate = &def.inputs[0];
    assert_eq!(rate.base_type, BaseType::Number);
    assert_eq!(rate.unit.as_deref(), Some("%"));
    assert_eq!(rate.default, Some(json!(0.05)));
    assert_eq!(rate.description.as_deref(), Some("Discount rate per period"));

    assert_eq!(def.inputs[1].type_model, TypeModel::number().array());

    assert_eq!(def.outputs.len(), 1);
    assert_eq!(def.outputs[0].key, "result");
    assert_eq!(def.outputs[0].description.as_deref(), Some("Present value"));
}

#[test]
fn test_defaults_without_tags() {
    let def = only(indoc! {r#"
        /// Adds two numbers.
        pub fn addTwo(a: f64, b: f64) -> f64 {
            a + b
        }
    "#});
    assert_eq!(def.id, "add_two");
    assert_eq!(def.name, "addTwo");
    assert_eq!(def.version, "1.0.0");
    assert_eq!(def.description.as_deref(), Some("Adds two numbers."));
    assert_eq!(def.tags, None);
    assert_eq!(def.engine_hints, None);
}

#[test]
fn test_source_text_spans_docs_and_body() {
    let text = indoc! {r#"
        use std::f64;

        /// Doubles the input.
        pub fn double(x: f64) -> f64 {
            x * 2.0
        }

        pub fn other() {}
    "#};
    let def = only(text);
    assert_eq!(
        def.source_text.as_deref(),
        Some("/// Doubles the input.\npub fn double(x: f64) -> f64 {\n    x * 2.0\n}")
    );
}

#[test]
fn test_skips_undocumented_and_private_functions() {
    let defs = analyze_one(indoc! {r#"
        pub fn undocumented(x: f64) -> f64 { x }

        /// Private helpers are never formulas.
        fn private(x: f64) -> f64 { x }

        pub mod nested {
            /// Found inside an inline module.
            pub fn inner(x: f64) -> f64 { x }
        }

        #[cfg(test)]
        mod tests {
            /// Test helpers are ignored.
            pub fn helper() {}
        }
    "#});
    let ids: Vec<_> = defs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["inner"]);
}

#[test]
fn test_bad_unit_is_skipped_but_feeds_fallback() {
    crate::test_utils::init_test_logging();
    let good = SourceUnit::new(
        "good.rs",
        indoc! {r#"
            /// Scores a borrower.
            pub fn score(profile: Profile) -> f64 { 0.0 }
        "#},
    );
    let broken = SourceUnit::new(
        "broken.rs",
        indoc! {r#"
            pub struct Profile {
                /// Yearly income
                pub income: f64,
                pub name: String,
                pub verified: bool,
            }

            /// Never seen: the file does not parse.
            pub fn lost( -> f64 {
        "#},
    );

    let defs = analyze(&[good, broken]);
    assert_eq!(defs.len(), 1);
    let profile = &defs[0].inputs[0].type_model;
    assert_eq!(
        profile,
        &TypeModel::object().with_properties(vec![
            PropertySpec::new("income", TypeModel::number()),
            PropertySpec::new("name", TypeModel::string()),
            PropertySpec::new("verified", TypeModel::boolean()),
        ])
    );
}

#[test]
fn test_unknown_type_without_literal_uses_name_patterns() {
    let def = only(indoc! {r#"
        /// Uses foreign types.
        pub fn foreign(a: BigDecimal, b: external::Widget) -> Uuid { todo!() }
    "#});
    assert_eq!(def.inputs[0].base_type, BaseType::Number);
    assert_eq!(def.inputs[1].base_type, BaseType::Object);
    assert_eq!(def.outputs[0].base_type, BaseType::String);
}

#[test]
fn test_array_of_objects_field() {
    let def = only(indoc! {r#"
        pub struct Holding {
            pub symbol: String,
            pub quantity: f64,
        }

        pub struct Portfolio {
            pub owner: String,
            pub holdings: Vec<Holding>,
        }

        /// Total portfolio value.
        pub fn portfolio_value(portfolio: &Portfolio) -> f64 { 0.0 }
    "#});
    let portfolio = &def.inputs[0].type_model;
    assert_eq!(portfolio.base_type, BaseType::Object);

    let holdings = &portfolio.property("holdings").unwrap().type_model;
    assert!(holdings.is_array);
    assert_eq!(holdings.base_type, BaseType::Object);
    assert_eq!(
        holdings.properties,
        Some(vec![
            PropertySpec::new("symbol", TypeModel::string()),
            PropertySpec::new("quantity", TypeModel::number()),
        ])
    );
}

#[test]
fn test_option_and_vec_parameters() {
    let def = only(indoc! {r#"
        /// Optional things.
        pub fn optional(cap: Option<f64>, labels: Option<Vec<String>>, ids: &[u64]) -> Option<f64> {
            cap
        }
    "#});
    assert_eq!(def.inputs[0].type_model, TypeModel::number().nullable());
    assert_eq!(
        def.inputs[1].type_model,
        TypeModel::string().array().nullable()
    );
    assert_eq!(def.inputs[2].type_model, TypeModel::number().array());
    assert_eq!(def.outputs[0].type_model, TypeModel::number().nullable());
}

#[test]
fn test_result_and_unit_outputs() {
    let defs = analyze_one(indoc! {r#"
        /// Fallible.
        pub fn fallible(x: f64) -> Result<f64, String> { Ok(x) }

        /// Returns nothing.
        pub fn nothing(x: f64) {}
    "#});
    assert_eq!(defs[0].outputs[0].type_model, TypeModel::number());
    assert_eq!(defs[1].outputs[0].type_model, TypeModel::object().nullable());
}

#[test]
fn test_string_enum() {
    let def = only(indoc! {r#"
        #[serde(rename_all = "lowercase")]
        pub enum Frequency {
            /// Once a year
            Annual,
            Monthly,
            #[serde(rename = "daily")]
            EveryDay,
            #[doc(hidden)]
            Hidden,
            #[serde(skip)]
            Skipped,
            __NonExhaustive,
        }

        /// Periods per year.
        pub fn periods(frequency: Frequency) -> u32 { 1 }
    "#});
    let model = &def.inputs[0].type_model;
    assert_eq!(model.base_type, BaseType::String);
    assert_eq!(
        model.constraints.as_ref().unwrap().enum_values,
        Some(vec![json!("annual"), json!("monthly"), json!("daily")])
    );
    let mut annual = PropertySpec::new("annual", TypeModel::string());
    annual.description = Some("Once a year".to_string());
    assert_eq!(
        model.properties,
        Some(vec![
            annual,
            PropertySpec::new("monthly", TypeModel::string()),
            PropertySpec::new("daily", TypeModel::string()),
        ])
    );
}

#[test]
fn test_numeric_enum() {
    let def = only(indoc! {r#"
        pub enum Compounding {
            Annual = 1,
            Quarterly = 4,
            Monthly = 12,
        }

        /// Effective rate.
        pub fn effective_rate(nominal: f64, compounding: Compounding) -> f64 { nominal }
    "#});
    let model = &def.inputs[1].type_model;
    assert_eq!(model.base_type, BaseType::Number);
    assert_eq!(
        model.constraints.as_ref().unwrap().enum_values,
        Some(vec![json!(1), json!(4), json!(12)])
    );
    assert_eq!(model.property("Quarterly").unwrap().type_model, TypeModel::number());
}

#[test]
fn test_union_enum_and_trait_types() {
    let def = only(indoc! {r#"
        pub enum Amount {
            Label(String),
            Value(f64),
            Flag(bool),
        }

        pub enum Switch {
            On(bool),
            Off(bool),
        }

        /// Unions.
        pub fn unions(
            amount: Amount,
            switch: Switch,
            text: impl AsRef<str>,
            other: Box<dyn std::any::Any>,
        ) -> f64 {
            0.0
        }
    "#});
    let bases: Vec<_> = def.inputs.iter().map(|i| i.base_type).collect();
    assert_eq!(
        bases,
        vec![
            BaseType::Number,
            BaseType::Boolean,
            BaseType::String,
            BaseType::Object
        ]
    );
}

#[test]
fn test_numeric_wrapper_has_no_properties() {
    let def = only(indoc! {r#"
        /// Decimal math.
        pub fn scaled(amount: rust_decimal::Decimal, ratio: OrderedFloat<f64>) -> Decimal {
            amount
        }
    "#});
    assert_eq!(def.inputs[0].type_model, TypeModel::number());
    assert_eq!(def.inputs[1].type_model, TypeModel::number());
    assert_eq!(def.outputs[0].type_model, TypeModel::number());
}

#[test]
fn test_duplicate_ids_keep_first() {
    let defs = analyze_one(indoc! {r#"
        /// First.
        /// @id rate
        pub fn first() -> f64 { 1.0 }

        /// Second.
        /// @id rate
        pub fn second() -> f64 { 2.0 }
    "#});
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].name, "first");
}
