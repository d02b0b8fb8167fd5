//! Ready-to-call function handles shared by every backend.

use crate::error::Result;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Something that can be invoked with positional JSON arguments.
pub trait Invoke: Send + Sync {
    fn invoke(&self, args: &[Value]) -> Result<Value>;
}

/// A cheaply clonable, thread-safe function handle.
///
/// Native Rust functions, static module exports and sandboxed script
/// functions all end up behind this one type, so the orchestrator does not
/// care which backend produced it.
#[derive(Clone)]
pub struct Callable {
    name: Arc<str>,
    inner: Arc<dyn Invoke>,
}

impl Callable {
    pub fn new(name: impl Into<Arc<str>>, inner: impl Invoke + 'static) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(inner),
        }
    }

    /// Wrap a native Rust closure.
    pub fn native<F>(name: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self::new(name, NativeFn(f))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        self.inner.invoke(args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Callable").field("name", &self.name).finish()
    }
}

struct NativeFn<F>(F);

impl<F> Invoke for NativeFn<F>
where
    F: Fn(&[Value]) -> Result<Value> + Send + Sync,
{
    fn invoke(&self, args: &[Value]) -> Result<Value> {
        (self.0)(args)
    }
}

/// Read a numeric argument, treating `null`/absent as an error naming `param`.
pub fn number_arg(function: &str, args: &[Value], index: usize, param: &str) -> Result<f64> {
    args.get(index)
        .and_then(Value::as_f64)
        .ok_or_else(|| {
            crate::Error::runtime(
                function,
                format!("argument `{}` (position {}) must be a number", param, index),
            )
        })
}
