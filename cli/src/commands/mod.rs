//! Command implementations.
//!
//! Each subcommand has its own module with a `run` function.

pub mod analyze;
pub mod cache;
pub mod check;
pub mod run;
