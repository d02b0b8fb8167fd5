//! Command-line interface definitions.
//!
//! This module contains only clap struct definitions - no business logic.
//! All command implementations are in the `commands` module.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Formulate - analyze and execute annotated formulas
#[derive(Parser, Debug)]
#[command(name = "formulate", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON configuration file (sandbox limits and cache behavior)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Derive formula definitions from annotated Rust source
    Analyze(AnalyzeArgs),

    /// Compile scripts in the sandbox without running them
    Check(CheckArgs),

    /// Execute one formula and print the result as JSON
    Run(RunArgs),

    /// Inspect or maintain the bundle cache
    Cache(CacheArgs),
}

/// Arguments for the `analyze` command.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Rust source files to analyze (use - for stdin)
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Print compact JSON on one line
    #[arg(long)]
    pub compact: bool,
}

/// Arguments for the `check` command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Script files to check (use - for stdin)
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Only report errors, don't print success messages
    #[arg(long, short)]
    pub quiet: bool,
}

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Definitions: a JSON file (one definition or an array) or Rust source.
    /// Defaults to the built-in formulas.
    #[arg(long)]
    pub defs: Option<String>,

    /// Id of the formula to execute
    #[arg(long)]
    pub formula: String,

    /// Inputs as a JSON object, or @path to read them from a file
    #[arg(long, default_value = "{}")]
    pub inputs: String,

    /// Backend to use (defaults to static, then remote, then embedded)
    #[arg(long)]
    pub backend: Option<BackendArg>,

    /// Script implementing the formula, run in the sandbox on the embedded backend
    #[arg(long)]
    pub script: Option<String>,

    /// Location template for static modules, e.g. file:///srv/modules/{module}.rhai
    #[arg(long)]
    pub modules: Option<String>,

    /// Directory of the persistent bundle cache (in memory when omitted)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}

/// Arguments for the `cache` command.
#[derive(Args, Debug)]
pub struct CacheArgs {
    /// Directory of the persistent bundle cache
    #[arg(long, default_value = ".formulate-cache")]
    pub cache_dir: PathBuf,

    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show the number and total size of cached bundles
    Stats,

    /// Keep only the newest versions of one formula
    Prune {
        /// Formula id
        id: String,

        /// Versions to keep (defaults to the configured keep-latest)
        #[arg(long)]
        keep: Option<usize>,
    },

    /// Remove every cached bundle
    Clear,
}

/// Execution backend.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BackendArg {
    /// Native function table, or the sandbox with --script
    Embedded,
    /// Registered or loaded module
    Static,
    /// Fetched script bundle
    Remote,
}

impl From<BackendArg> for formulate::Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Embedded => formulate::Backend::Embedded,
            BackendArg::Static => formulate::Backend::Static,
            BackendArg::Remote => formulate::Backend::Remote,
        }
    }
}
