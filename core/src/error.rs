//! Error types shared by every component.
//!
//! Each variant is one category of failure. The orchestrator converts all of
//! them (except [`Error::Integrity`], which never leaves the cache manager)
//! into an [`ExecutionFailure`](crate::model::ExecutionFailure) at its
//! boundary, so callers only ever see a structured result.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for formulate operations.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Public error type for all formulate operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A backend was requested that the formula does not configure or enable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A function, export or module could not be found.
    ///
    /// `available` lists what *was* there, so the failure can be diagnosed
    /// without re-running anything.
    #[error("resolution error: {message}{}", format_available(.available))]
    Resolution {
        message: String,
        available: Vec<String>,
    },

    /// Script source failed to compile.
    #[error("compilation error: {0}")]
    Compilation(CompileDiagnostic),

    /// A fetch failed or returned a non-2xx status.
    #[error("network error fetching {url}: {message}")]
    Network {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// A cached entry no longer matches its integrity hash.
    #[error("integrity mismatch for {key}: expected {expected}, computed {actual}")]
    Integrity {
        key: String,
        expected: String,
        actual: String,
    },

    /// The function itself failed while running.
    #[error("runtime error in `{function}`: {message}")]
    Runtime { function: String, message: String },

    /// The persistent store rejected an operation.
    #[error("storage error: {0}")]
    Storage(String),
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        " (nothing available)".to_string()
    } else {
        format!(" (available: {})", available.join(", "))
    }
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    pub fn resolution(message: impl Into<String>, available: Vec<String>) -> Self {
        Error::Resolution {
            message: message.into(),
            available,
        }
    }

    pub fn runtime(function: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::Runtime {
            function: function.into(),
            message: message.to_string(),
        }
    }

    pub fn storage(message: impl fmt::Display) -> Self {
        Error::Storage(message.to_string())
    }

    /// The category tag of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::Resolution { .. } => ErrorKind::Resolution,
            Error::Compilation(_) => ErrorKind::Compilation,
            Error::Network { .. } => ErrorKind::Network,
            Error::Integrity { .. } => ErrorKind::Integrity,
            Error::Runtime { .. } => ErrorKind::Runtime,
            Error::Storage(_) => ErrorKind::Storage,
        }
    }
}

/// Category tag carried by failed execution results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Configuration,
    Resolution,
    Compilation,
    Network,
    Integrity,
    Runtime,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Resolution => "ResolutionError",
            ErrorKind::Compilation => "CompilationError",
            ErrorKind::Network => "NetworkError",
            ErrorKind::Integrity => "IntegrityError",
            ErrorKind::Runtime => "RuntimeError",
            ErrorKind::Storage => "StorageError",
        };
        f.write_str(name)
    }
}

/// Location and context of a compilation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileDiagnostic {
    /// What the compiler reported.
    pub message: String,

    /// 1-based line, when the compiler reported one.
    pub line: Option<usize>,

    /// 1-based column, when the compiler reported one.
    pub column: Option<usize>,

    /// The offending source line.
    pub source_line: Option<String>,

    /// The cache key (usually `formula_id:version`) of the unit being compiled.
    pub unit: Option<String>,
}

impl fmt::Display for CompileDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(unit) = &self.unit {
            write!(f, "[{}] ", unit)?;
        }
        write!(f, "{}", self.message)?;
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, " at line {}, column {}", line, column)?,
            (Some(line), None) => write!(f, " at line {}", line)?,
            _ => {}
        }
        if let Some(source_line) = &self.source_line {
            write!(f, ": `{}`", source_line.trim())?;
        }
        Ok(())
    }
}
