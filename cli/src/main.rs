//! Formulate CLI - analyze and execute annotated formulas.

mod cli;
mod commands;
mod common;

use clap::Parser;
use cli::{Cli, Command};
use std::process::ExitCode;

fn main() -> ExitCode {
    // Initialize logging subscriber
    use tracing_subscriber::{EnvFilter, fmt};

    // Use RUST_LOG environment variable to control log level
    // Default to WARN if not set
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    let config = match common::config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => common::error::render_and_exit(e, cli.no_color),
    };

    let result = match cli.command {
        Command::Analyze(args) => commands::analyze::run(args),
        Command::Check(args) => commands::check::run(args, &config, cli.no_color),
        Command::Run(args) => commands::run::run(args, config),
        Command::Cache(args) => commands::cache::run(args, config),
    };

    match result {
        Ok(code) => code,
        Err(e) => common::error::render_and_exit(e, cli.no_color),
    }
}
