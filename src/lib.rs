//! Formulate - analyze annotated Rust functions into formula definitions and
//! run them on interchangeable backends
//!
//! # Overview
//!
//! A formula is an ordinary documented `pub fn`. The analyzer reads its doc
//! block (`@param`, `@returns`, `@tags`, `@engineHint.*`) and its signature,
//! and produces a [`FormulaDefinition`]. The [`Orchestrator`] then executes a
//! definition on one of three backends:
//!
//! - **embedded**: a native function table, or sandboxed user-authored script
//! - **static**: a pre-registered or lazily loaded module, navigated by export path
//! - **remote**: a fetched script bundle, verified and cached
//!
//! # Quick Start
//!
//! ```
//! use formulate::{Orchestrator, SourceUnit, analyze, stdlib};
//! use serde_json::{Map, json};
//!
//! let source = r#"
//! /// Doubles a number.
//! ///
//! /// @param x Input value
//! /// @returns Twice the input
//! pub fn double(x: f64) -> f64 { x * 2.0 }
//! "#;
//! let definitions = analyze(&[SourceUnit::new("double.rs", source)]);
//! assert_eq!(definitions[0].id, "double");
//!
//! let mut natives = stdlib::natives();
//! natives.register("double", |args| {
//!     let x = formulate::callable::number_arg("double", args, 0, "x")?;
//!     Ok(json!(x * 2.0))
//! });
//! let orchestrator = Orchestrator::builder().natives(natives).build();
//!
//! let mut inputs = Map::new();
//! inputs.insert("x".to_string(), json!(21));
//! let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! let result = runtime.block_on(orchestrator.execute(&definitions[0], &inputs, None));
//! assert_eq!(result.result(), Some(&json!(42.0)));
//! ```

// Error rendering utilities
pub mod error_renderer;
pub use error_renderer::{CharSet, RenderConfig, render_error, render_error_to};

pub use formulate_core::{
    analyzer, cache, callable, fetch, model, options, orchestrator, precision, sandbox, stdlib,
    store,
};

pub use formulate_core::{
    AllowedModules, Backend, BaseType, CacheManager, CacheOptions, CacheStats, Callable,
    CompileDiagnostic, CreationKind, EngineHint, Error, ErrorKind, ExecutionFailure,
    ExecutionResult, Export, FetchResponse, Fetcher, FieldSpec, FormulaDefinition,
    FormulaRepository, FormulateConfig, Invoke, MemoryStore, ModuleCatalog, ModuleLoader,
    NativeTable, Orchestrator, OrchestratorBuilder, RecordStore, RemoteBundleCacheEntry,
    RemoteBundleInfo, Result, Rounding, Sandbox, SandboxOptions, ScriptModuleLoader, SourceUnit,
    StaticFetcher, StaticModule, StaticModuleInfo, TypeModel, analyze,
};
