//! Execution results and backend identifiers.

use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The three interchangeable execution strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Backend {
    /// Native function table, or the sandbox for user-authored source.
    Embedded,
    /// A pre-registered or loaded module, navigated by export path.
    Static,
    /// A fetched script bundle, served through the cache manager.
    Remote,
}

impl Backend {
    /// Identifier used as the key of engine hints.
    pub fn id(self) -> &'static str {
        match self {
            Backend::Embedded => "embedded",
            Backend::Static => "static",
            Backend::Remote => "remote",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "embedded" => Ok(Backend::Embedded),
            "static" => Ok(Backend::Static),
            "remote" => Ok(Backend::Remote),
            other => Err(format!(
                "unknown backend `{}` (expected embedded, static or remote)",
                other
            )),
        }
    }
}

/// Why an execution failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for ExecutionFailure {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Outcome of one `execute` call. Built once, never merged with another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionFailure>,
    pub duration_ms: f64,
    pub backend: Backend,
}

impl ExecutionResult {
    pub fn ok(
        outputs: BTreeMap<String, serde_json::Value>,
        backend: Backend,
        duration_ms: f64,
    ) -> Self {
        Self {
            success: true,
            outputs: Some(outputs),
            error: None,
            duration_ms,
            backend,
        }
    }

    pub fn err(error: &Error, backend: Backend, duration_ms: f64) -> Self {
        Self {
            success: false,
            outputs: None,
            error: Some(error.into()),
            duration_ms,
            backend,
        }
    }

    /// The single `result` output, if the call succeeded.
    pub fn result(&self) -> Option<&serde_json::Value> {
        self.outputs.as_ref()?.get("result")
    }
}
