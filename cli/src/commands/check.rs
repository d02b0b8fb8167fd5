//! The `check` command - compile scripts in the sandbox without running.

use std::process::ExitCode;

use formulate::{Error, FormulateConfig, RenderConfig, Sandbox, render_error_to};

use crate::cli::CheckArgs;
use crate::common::block_on;
use crate::common::input::read_input;
use crate::common::CliResult;

/// Run the check command.
pub fn run(args: CheckArgs, config: &FormulateConfig, no_color: bool) -> CliResult<ExitCode> {
    let sandbox = Sandbox::new(config.sandbox.clone());
    let mut has_errors = false;

    for file in &args.files {
        if !block_on(check_file(&sandbox, file, args.quiet, no_color))? {
            has_errors = true;
        }
    }

    Ok(if has_errors {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Check a single file. Returns true if OK, false if errors.
async fn check_file(sandbox: &Sandbox, path: &str, quiet: bool, no_color: bool) -> bool {
    let (content, display_name) = match read_input(path) {
        Ok(c) => c,
        Err(e) => {
            if !quiet {
                eprintln!("error: {}", e);
            }
            return false;
        }
    };

    let config = RenderConfig {
        color: !no_color,
        filename: Some(display_name.as_str()),
        ..Default::default()
    };
    let render_err = |e: &Error| {
        if !quiet {
            render_error_to(e, &content, &mut std::io::stderr(), &config).ok();
        }
    };

    match sandbox.compile(&content, Some(&display_name)).await {
        Ok(module) => {
            if !quiet {
                let functions = module.functions();
                if functions.is_empty() {
                    println!("{}: OK", display_name);
                } else {
                    println!("{}: OK ({})", display_name, functions.join(", "));
                }
            }
            true
        }
        Err(e) => {
            render_err(&e);
            false
        }
    }
}
