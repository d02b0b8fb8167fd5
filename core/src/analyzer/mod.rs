//! Source analysis: annotated Rust functions to formula definitions.
//!
//! Every documented `pub fn` becomes one [`FormulaDefinition`]. Parameter and
//! return types are classified into [`TypeModel`](crate::model::TypeModel)s
//! by resolving them against the structs, enums and aliases declared in all
//! parsed units, with a textual fallback for declarations the parser could
//! not see.

mod classify;
mod docs;
mod fallback;
mod index;
mod naming;

pub use naming::to_snake_case;

use crate::model::{CreationKind, DEFAULT_VERSION, FieldSpec, FormulaDefinition, TypeModel};
use classify::Classifier;
use docs::{DocBlock, ParamDoc, doc_lines, parse_tag_list};
use index::TypeIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use syn::ext::IdentExt;
use syn::{FnArg, Item, ItemFn, Pat, ReturnType, Visibility};
use tracing::{debug, warn};

/// One file of annotated source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub path: String,
    pub text: String,
}

impl SourceUnit {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// Derive formula definitions from every documented `pub fn` in `units`.
///
/// Units that fail to parse are skipped for function discovery, but their
/// text still feeds the textual type fallback. Later definitions whose id
/// repeats an earlier one are dropped.
pub fn analyze(units: &[SourceUnit]) -> Vec<FormulaDefinition> {
    let parsed: Vec<(&SourceUnit, syn::File)> = units
        .iter()
        .filter_map(|unit| match syn::parse_file(&unit.text) {
            Ok(file) => Some((unit, file)),
            Err(err) => {
                let start = err.span().start();
                warn!(
                    path = %unit.path,
                    line = start.line,
                    column = start.column + 1,
                    "failed to parse source unit: {}",
                    err
                );
                None
            }
        })
        .collect();

    let index = TypeIndex::build(
        parsed.iter().map(|(_, file)| file),
        units.iter().map(|unit| unit.text.as_str()),
    );
    let classifier = Classifier::new(&index);

    let mut seen = HashSet::new();
    let mut definitions = Vec::new();
    for (unit, file) in &parsed {
        let mut functions = Vec::new();
        collect_public_fns(&file.items, &mut functions);

        for func in functions {
            let Some(definition) = build_definition(unit, func, &classifier) else {
                continue;
            };
            if !seen.insert(definition.id.clone()) {
                warn!(
                    id = %definition.id,
                    path = %unit.path,
                    "duplicate formula id, dropping later definition"
                );
                continue;
            }
            definitions.push(definition);
        }
    }
    definitions
}

fn collect_public_fns<'a>(items: &'a [Item], out: &mut Vec<&'a ItemFn>) {
    for item in items {
        match item {
            Item::Fn(func) if matches!(func.vis, Visibility::Public(_)) => out.push(func),
            Item::Mod(module) if !is_cfg_test(&module.attrs) => {
                if let Some((_, items)) = &module.content {
                    collect_public_fns(items, out);
                }
            }
            _ => {}
        }
    }
}

fn is_cfg_test(attrs: &[syn::Attribute]) -> bool {
    attrs.iter().any(|attr| {
        attr.path().is_ident("cfg")
            && attr
                .parse_args::<syn::Ident>()
                .is_ok_and(|ident| ident == "test")
    })
}

fn build_definition(
    unit: &SourceUnit,
    func: &ItemFn,
    classifier: &Classifier,
) -> Option<FormulaDefinition> {
    let fn_name = func.sig.ident.unraw().to_string();
    let docs = DocBlock::parse(&doc_lines(&func.attrs));
    if docs.is_empty() {
        debug!(function = %fn_name, path = %unit.path, "skipping undocumented function");
        return None;
    }

    let params: BTreeMap<String, ParamDoc> = docs
        .tags_named("param")
        .filter_map(ParamDoc::parse)
        .map(|param| (param.name.clone(), param))
        .collect();

    let inputs = func
        .sig
        .inputs
        .iter()
        .enumerate()
        .filter_map(|(position, arg)| {
            let FnArg::Typed(arg) = arg else {
                return None;
            };
            let key = match arg.pat.as_ref() {
                Pat::Ident(pat) => pat.ident.unraw().to_string(),
                _ => format!("arg{}", position),
            };
            let mut spec = FieldSpec::new(key, classifier.classify(&arg.ty));
            if let Some(param) = params.get(&spec.key) {
                spec.description = param.description.clone();
                spec.unit = param.unit.clone();
                spec.default = param.default.clone();
            }
            Some(spec)
        })
        .collect();

    let output_model = match &func.sig.output {
        ReturnType::Default => TypeModel::object().nullable(),
        ReturnType::Type(_, ty) => classifier.classify(ty),
    };
    let mut output = FieldSpec::new("result", output_model);
    output.description = docs
        .tag("returns")
        .or_else(|| docs.tag("return"))
        .map(str::to_string);

    let description = docs
        .tag("description")
        .map(str::to_string)
        .or_else(|| (!docs.summary.is_empty()).then(|| docs.summary.clone()));

    Some(FormulaDefinition {
        id: docs
            .tag("id")
            .map_or_else(|| to_snake_case(&fn_name), str::to_string),
        name: docs.tag("name").unwrap_or(&fn_name).to_string(),
        version: docs.tag("version").unwrap_or(DEFAULT_VERSION).to_string(),
        description,
        tags: docs.tag("tags").map(parse_tag_list),
        engine_hints: docs.engine_hints(),
        inputs,
        outputs: vec![output],
        source_text: function_source(&unit.text, func),
        static_module_info: None,
        remote_bundle_info: None,
        creation_kind: CreationKind::Imported,
    })
}

/// The lines spanned by `func`, doc comments included.
fn function_source(text: &str, func: &ItemFn) -> Option<String> {
    let start = func
        .attrs
        .first()
        .map(|attr| attr.pound_token.spans[0].start().line)
        .unwrap_or_else(|| func.sig.fn_token.span.start().line)
        .min(func.sig.fn_token.span.start().line);
    let end = func.block.brace_token.span.close().end().line;
    if start == 0 || end < start {
        return None;
    }
    let lines: Vec<&str> = text.lines().skip(start - 1).take(end - start + 1).collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

#[cfg(test)]
#[path = "analyzer_test.rs"]
mod analyzer_test;
