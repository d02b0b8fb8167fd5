//! Native Rust implementations of formulas, by id.

use crate::callable::Callable;
use crate::error::Result;
use serde_json::Value;
use std::collections::BTreeMap;

/// Functions the embedded backend can call directly.
#[derive(Debug, Clone, Default)]
pub struct NativeTable {
    functions: BTreeMap<String, Callable>,
}

impl NativeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callable` under `id`, replacing any previous entry.
    pub fn insert(&mut self, id: impl Into<String>, callable: Callable) -> &mut Self {
        self.functions.insert(id.into(), callable);
        self
    }

    /// Register a closure under `id`.
    pub fn register<F>(&mut self, id: &str, f: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.insert(id, Callable::native(id, f))
    }

    pub fn get(&self, id: &str) -> Option<&Callable> {
        self.functions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.functions.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
