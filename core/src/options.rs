//! Configuration for the sandbox and the bundle cache.
//!
//! Every field has a default, so a host can deserialize a partial document
//! (e.g. `{"sandbox": {"maxOperations": 1000}}`) and get sensible values for
//! the rest.

use serde::{Deserialize, Serialize};

/// Resource limits enforced on every sandboxed script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SandboxOptions {
    /// Maximum number of operations per call (0 = unlimited).
    pub max_operations: u64,
    /// Maximum function call nesting.
    pub max_call_levels: usize,
    /// Maximum expression nesting, at global level and inside functions.
    pub max_expr_depth: usize,
    /// Maximum string length in bytes (0 = unlimited).
    pub max_string_size: usize,
    /// Maximum array length (0 = unlimited).
    pub max_array_size: usize,
    /// Maximum object map size (0 = unlimited).
    pub max_map_size: usize,
    /// Maximum number of modules a script may import.
    pub max_modules: usize,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            max_operations: 1_000_000,
            max_call_levels: 64,
            max_expr_depth: 64,
            max_string_size: 1 << 20,
            max_array_size: 100_000,
            max_map_size: 10_000,
            max_modules: 16,
        }
    }
}

/// Behavior of the remote bundle cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheOptions {
    /// Write fetched bundles to the persistent store.
    pub persist: bool,
    /// Versions kept per formula when a host prunes without a count.
    pub keep_latest: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            persist: true,
            keep_latest: 3,
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormulateConfig {
    pub sandbox: SandboxOptions,
    pub cache: CacheOptions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_document_keeps_defaults() {
        let config: FormulateConfig =
            serde_json::from_str(r#"{"sandbox": {"maxOperations": 500}}"#).unwrap();
        assert_eq!(config.sandbox.max_operations, 500);
        assert_eq!(config.sandbox.max_call_levels, 64);
        assert_eq!(config.cache, CacheOptions::default());
    }
}
