//! Common utilities shared across CLI commands.

pub mod config;
pub mod error;
pub mod file_store;
pub mod http;
pub mod input;

pub use error::{CliError, CliResult};

/// Run `future` to completion on a fresh multi-threaded runtime.
pub fn block_on<F: std::future::Future>(future: F) -> CliResult<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Input(format!("failed to start async runtime: {}", e)))?;
    Ok(runtime.block_on(future))
}
