//! The `run` command - execute one formula and print the result.

use std::process::ExitCode;
use std::sync::Arc;

use formulate::model::CreationKind;
use formulate::{
    FormulaDefinition, FormulateConfig, Orchestrator, RecordStore, Sandbox, ScriptModuleLoader,
    SourceUnit, analyze, stdlib,
};
use serde_json::{Map, Value};

use crate::cli::RunArgs;
use crate::common::file_store::FileStore;
use crate::common::http::HttpFetcher;
use crate::common::input::{inline_or_file, read_input};
use crate::common::{CliError, CliResult, block_on};

/// Run the run command.
pub fn run(args: RunArgs, config: FormulateConfig) -> CliResult<ExitCode> {
    let definitions = load_definitions(args.defs.as_deref())?;
    let mut formula = find_formula(definitions, &args.formula)?;

    if let Some(path) = &args.script {
        let (source, _) = read_input(path).map_err(CliError::Input)?;
        formula.creation_kind = CreationKind::UserAuthored;
        formula.source_text = Some(source);
    }

    let inputs = parse_inputs(&args.inputs)?;

    let sandbox = Arc::new(Sandbox::new(config.sandbox.clone()));
    let fetcher = Arc::new(HttpFetcher::new());
    let mut builder = Orchestrator::builder()
        .natives(stdlib::natives())
        .sandbox(sandbox.clone())
        .fetcher(fetcher.clone())
        .config(config);
    if let Some(dir) = &args.cache_dir {
        let store: Arc<dyn RecordStore> = Arc::new(FileStore::open(dir)?);
        builder = builder.store(store);
    }
    if let Some(template) = &args.modules {
        builder = builder.loader(Arc::new(ScriptModuleLoader::new(
            sandbox,
            fetcher,
            template.as_str(),
        )));
    }
    let orchestrator = builder.build();

    let backend = args.backend.map(Into::into);
    let result = block_on(orchestrator.execute(&formula, &inputs, backend))?;

    let json = serde_json::to_string_pretty(&result)
        .map_err(|e| CliError::Input(format!("failed to encode result: {}", e)))?;
    println!("{}", json);

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Definitions from `--defs`, or the built-in formulas.
///
/// A `.rs` file is analyzed. Anything else must be JSON holding one
/// definition or an array of them.
fn load_definitions(defs: Option<&str>) -> CliResult<Vec<FormulaDefinition>> {
    let Some(path) = defs else {
        return Ok(stdlib::definitions());
    };
    let (content, display_name) = read_input(path).map_err(CliError::Input)?;

    if display_name.ends_with(".rs") {
        return Ok(analyze(&[SourceUnit::new(display_name, content)]));
    }

    let value: Value = serde_json::from_str(&content)
        .map_err(|e| CliError::Input(format!("{}: invalid JSON: {}", display_name, e)))?;
    let parsed = match value {
        Value::Array(_) => serde_json::from_value(value),
        single => serde_json::from_value(single).map(|definition| vec![definition]),
    };
    parsed.map_err(|e| CliError::Input(format!("{}: invalid formula definition: {}", display_name, e)))
}

fn find_formula(definitions: Vec<FormulaDefinition>, id: &str) -> CliResult<FormulaDefinition> {
    let available: Vec<String> = definitions.iter().map(|d| d.id.clone()).collect();
    definitions
        .into_iter()
        .find(|d| d.id == id)
        .ok_or_else(|| {
            CliError::Input(format!(
                "formula `{}` not found (available: {})",
                id,
                available.join(", ")
            ))
        })
}

fn parse_inputs(arg: &str) -> CliResult<Map<String, Value>> {
    let text = inline_or_file(arg).map_err(CliError::Input)?;
    match serde_json::from_str(&text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CliError::Input("inputs must be a JSON object".to_string())),
        Err(e) => Err(CliError::Input(format!("invalid inputs: {}", e))),
    }
}
