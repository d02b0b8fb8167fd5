//! Formula analysis and execution.
//!
//! - [`analyzer`] turns annotated Rust source into [`FormulaDefinition`]s.
//! - [`orchestrator`] runs a definition on one of three backends and returns
//!   an [`ExecutionResult`].
//! - [`sandbox`] compiles and instantiates untrusted scripts.
//! - [`cache`] fetches, verifies and persists remote bundles.

pub mod analyzer;
pub mod cache;
pub mod callable;
pub mod error;
pub mod fetch;
pub mod model;
pub mod options;
pub mod orchestrator;
pub mod precision;
pub mod sandbox;
pub mod stdlib;
pub mod store;

pub use analyzer::{SourceUnit, analyze};
pub use cache::{CacheManager, CacheStats, RemoteBundleCacheEntry};
pub use callable::{Callable, Invoke};
pub use error::{CompileDiagnostic, Error, ErrorKind, Result};
pub use fetch::{FetchResponse, Fetcher, StaticFetcher};
pub use model::{
    Backend, BaseType, CreationKind, EngineHint, ExecutionFailure, ExecutionResult, FieldSpec,
    FormulaDefinition, RemoteBundleInfo, Rounding, StaticModuleInfo, TypeModel,
};
pub use options::{CacheOptions, FormulateConfig, SandboxOptions};
pub use orchestrator::{
    Export, ModuleCatalog, ModuleLoader, NativeTable, Orchestrator, OrchestratorBuilder,
    ScriptModuleLoader, StaticModule,
};
pub use sandbox::{AllowedModules, Sandbox};
pub use store::{FormulaRepository, MemoryStore, RecordStore};
