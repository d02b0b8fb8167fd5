//! Error handling utilities for the CLI.

use formulate::{Error, RenderConfig, render_error_to};

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Failure of a CLI command.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Bad arguments or unreadable input files.
    #[error("{0}")]
    Input(String),

    /// A library error, rendered with its category.
    #[error(transparent)]
    Formulate(#[from] Error),
}

/// Render an error to stderr and exit with code 1.
pub fn render_and_exit(error: CliError, no_color: bool) -> ! {
    match error {
        CliError::Input(message) => eprintln!("error: {}", message),
        CliError::Formulate(error) => {
            let config = RenderConfig {
                color: !no_color,
                ..Default::default()
            };
            render_error_to(&error, "", &mut std::io::stderr(), &config).ok();
        }
    }
    std::process::exit(1);
}
