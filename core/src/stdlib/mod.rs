//! Built-in formulas.
//!
//! - `finance`: interest, loans, discounting and percentages
//!
//! Each module is ordinary annotated Rust. [`register`] exposes the functions
//! to the embedded backend, and [`definitions`] derives their formula
//! definitions by analyzing the module's own source. Argument defaults are
//! read back from those definitions.

pub mod finance;

use crate::analyzer::{SourceUnit, analyze};
use crate::callable::number_arg;
use crate::error::{Error, Result};
use crate::model::{CreationKind, FormulaDefinition};
use crate::orchestrator::NativeTable;
use serde_json::{Value, json};

const FINANCE_SOURCE: &str = include_str!("finance.rs");

/// Register every built-in formula in `table`, keyed by formula id.
///
/// Omitted arguments fall back to the `@default` declared in the formula's
/// doc tags.
pub fn register(table: &mut NativeTable) {
    let definitions = definitions();
    let compound_rate = declared_number(&definitions, "compound_interest", "rate");
    let compound_periods = declared_count(&definitions, "compound_interest", "periods_per_year");
    let npv_rate = declared_number(&definitions, "net_present_value", "rate");

    table.register("compound_interest", move |args| {
        let f = "compound_interest";
        let principal = number_arg(f, args, 0, "principal")?;
        let rate = number_or(f, args, 1, "rate", compound_rate)?;
        let years = number_arg(f, args, 2, "years")?;
        let periods = count_or(f, args, 3, "periods_per_year", compound_periods)?;
        Ok(json!(finance::compound_interest(principal, rate, years, periods)))
    });
    table.register("loan_payment", |args| {
        let f = "loan_payment";
        let principal = number_arg(f, args, 0, "principal")?;
        let annual_rate = number_arg(f, args, 1, "annual_rate")?;
        let months = count_or(f, args, 2, "months", None).and_then(|months| {
            if months == 0 {
                Err(Error::runtime(f, "argument `months` must be a positive integer"))
            } else {
                Ok(months)
            }
        })?;
        Ok(json!(finance::loan_payment(principal, annual_rate, months)))
    });
    table.register("net_present_value", move |args| {
        let f = "net_present_value";
        let rate = number_or(f, args, 0, "rate", npv_rate)?;
        let cash_flows = number_list(f, args, 1, "cash_flows")?;
        Ok(json!(finance::net_present_value(rate, &cash_flows)))
    });
    table.register("percent_change", |args| {
        let f = "percent_change";
        let from = number_arg(f, args, 0, "from")?;
        let to = number_arg(f, args, 1, "to")?;
        Ok(finance::percent_change(from, to).map_or(Value::Null, |pct| json!(pct)))
    });
}

/// A table holding just the built-in formulas.
pub fn natives() -> NativeTable {
    let mut table = NativeTable::new();
    register(&mut table);
    table
}

/// Formula definitions of the built-in formulas.
pub fn definitions() -> Vec<FormulaDefinition> {
    let mut definitions = analyze(&[SourceUnit::new("stdlib/finance.rs", FINANCE_SOURCE)]);
    for definition in &mut definitions {
        definition.creation_kind = CreationKind::Embedded;
    }
    definitions
}

/// The `@default` of `param` in the definition of `formula`.
fn declared_default<'a>(
    definitions: &'a [FormulaDefinition],
    formula: &str,
    param: &str,
) -> Option<&'a Value> {
    definitions
        .iter()
        .find(|d| d.id == formula)?
        .inputs
        .iter()
        .find(|input| input.key == param)?
        .default
        .as_ref()
}

fn declared_number(definitions: &[FormulaDefinition], formula: &str, param: &str) -> Option<f64> {
    declared_default(definitions, formula, param).and_then(Value::as_f64)
}

fn declared_count(definitions: &[FormulaDefinition], formula: &str, param: &str) -> Option<u32> {
    declared_default(definitions, formula, param)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

/// A number argument that may be omitted when a default exists.
fn number_or(
    function: &str,
    args: &[Value],
    index: usize,
    param: &str,
    default: Option<f64>,
) -> Result<f64> {
    match (args.get(index), default) {
        (None | Some(Value::Null), Some(default)) => Ok(default),
        _ => number_arg(function, args, index, param),
    }
}

fn count_or(
    function: &str,
    args: &[Value],
    index: usize,
    param: &str,
    default: Option<u32>,
) -> Result<u32> {
    let invalid = || {
        Error::runtime(
            function,
            format!("argument `{}` (position {}) must be a non-negative integer", param, index),
        )
    };
    match args.get(index) {
        None | Some(Value::Null) => default.ok_or_else(invalid),
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(invalid),
    }
}

fn number_list(function: &str, args: &[Value], index: usize, param: &str) -> Result<Vec<f64>> {
    let invalid = || {
        Error::runtime(
            function,
            format!("argument `{}` (position {}) must be an array of numbers", param, index),
        )
    };
    args.get(index)
        .and_then(Value::as_array)
        .ok_or_else(invalid)?
        .iter()
        .map(|v| v.as_f64().ok_or_else(invalid))
        .collect()
}
