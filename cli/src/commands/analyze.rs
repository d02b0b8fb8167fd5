//! The `analyze` command - derive formula definitions from Rust source.

use std::process::ExitCode;

use formulate::{SourceUnit, analyze};

use crate::cli::AnalyzeArgs;
use crate::common::input::read_input;
use crate::common::{CliError, CliResult};

/// Run the analyze command.
pub fn run(args: AnalyzeArgs) -> CliResult<ExitCode> {
    let units = args
        .files
        .iter()
        .map(|path| {
            let (content, display_name) = read_input(path).map_err(CliError::Input)?;
            Ok(SourceUnit::new(display_name, content))
        })
        .collect::<CliResult<Vec<_>>>()?;

    let definitions = analyze(&units);
    let json = if args.compact {
        serde_json::to_string(&definitions)
    } else {
        serde_json::to_string_pretty(&definitions)
    }
    .map_err(|e| CliError::Input(format!("failed to encode definitions: {}", e)))?;
    println!("{}", json);

    Ok(ExitCode::SUCCESS)
}
