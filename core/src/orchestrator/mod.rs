//! The execution orchestrator: the public entry point.
//!
//! ```ignore
//! let orchestrator = Orchestrator::builder()
//!     .natives(natives)
//!     .store(Arc::new(MemoryStore::new()))
//!     .fetcher(Arc::new(fetcher))
//!     .build();
//! let result = orchestrator.execute(&formula, &inputs, None).await;
//! ```
//!
//! [`Orchestrator::execute`] never fails: every error, panics in native
//! functions included, ends up in the returned [`ExecutionResult`].

mod backend;
mod modules;
mod natives;

pub use backend::{bind_arguments, default_backend};
pub use modules::{
    Export, ModuleCatalog, ModuleLoader, ModuleRegistry, ScriptModuleLoader, StaticModule,
};
pub use natives::NativeTable;

use crate::cache::CacheManager;
use crate::error::{Error, Result};
use crate::fetch::{Fetcher, StaticFetcher};
use crate::model::{Backend, ExecutionResult, FormulaDefinition};
use crate::options::FormulateConfig;
use crate::precision;
use crate::sandbox::Sandbox;
use crate::store::{MemoryStore, RecordStore};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Routes formula executions to a backend and normalizes the outcome.
///
/// `Send + Sync`; share it behind an `Arc`.
pub struct Orchestrator {
    natives: NativeTable,
    registry: ModuleRegistry,
    loader: Option<Arc<dyn ModuleLoader>>,
    catalog: ModuleCatalog,
    sandbox: Arc<Sandbox>,
    cache: CacheManager,
    config: FormulateConfig,
    loading: tokio::sync::Mutex<()>,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Execute `formula` with named `inputs`.
    ///
    /// Without an explicit `backend`, the static backend is used when
    /// configured, then the remote one, then the embedded one.
    pub async fn execute(
        &self,
        formula: &FormulaDefinition,
        inputs: &Map<String, Value>,
        backend: Option<Backend>,
    ) -> ExecutionResult {
        let started = Instant::now();
        let backend = backend.unwrap_or_else(|| default_backend(formula));
        let outcome = self.run(formula, inputs, backend).await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(value) => {
                debug!(formula = %formula.id, %backend, duration_ms, "formula executed");
                let outputs = BTreeMap::from([("result".to_string(), value)]);
                ExecutionResult::ok(outputs, backend, duration_ms)
            }
            Err(err) => {
                warn!(formula = %formula.id, %backend, error = %err, "formula execution failed");
                ExecutionResult::err(&err, backend, duration_ms)
            }
        }
    }

    async fn run(
        &self,
        formula: &FormulaDefinition,
        inputs: &Map<String, Value>,
        backend: Backend,
    ) -> Result<Value> {
        let callable = self.resolve(formula, backend).await?;
        let args = bind_arguments(formula, inputs);

        let raw = catch_unwind(AssertUnwindSafe(|| callable.call(&args))).unwrap_or_else(|panic| {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(Error::runtime(callable.name(), format!("panicked: {}", message)))
        })?;

        Ok(match formula.hint_for(backend.id()) {
            Some(hint) => precision::normalize(&raw, hint.scale, hint.rounding),
            None => raw,
        })
    }

    pub fn natives(&self) -> &NativeTable {
        &self.natives
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn sandbox(&self) -> &Arc<Sandbox> {
        &self.sandbox
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn config(&self) -> &FormulateConfig {
        &self.config
    }
}

/// Collects the collaborators of an [`Orchestrator`].
///
/// Everything is optional. The defaults are an empty native table, an
/// in-memory store, and a fetcher that knows no URLs.
#[derive(Default)]
pub struct OrchestratorBuilder {
    natives: NativeTable,
    registry: ModuleRegistry,
    loader: Option<Arc<dyn ModuleLoader>>,
    catalog: ModuleCatalog,
    sandbox: Option<Arc<Sandbox>>,
    store: Option<Arc<dyn RecordStore>>,
    fetcher: Option<Arc<dyn Fetcher>>,
    config: FormulateConfig,
}

impl OrchestratorBuilder {
    pub fn natives(mut self, natives: NativeTable) -> Self {
        self.natives = natives;
        self
    }

    pub fn module(self, module: StaticModule) -> Self {
        self.registry.register(module);
        self
    }

    pub fn loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn catalog(mut self, catalog: ModuleCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Share an existing sandbox instead of creating one from the config.
    pub fn sandbox(mut self, sandbox: Arc<Sandbox>) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn config(mut self, config: FormulateConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Orchestrator {
        let sandbox = self
            .sandbox
            .unwrap_or_else(|| Arc::new(Sandbox::new(self.config.sandbox.clone())));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(StaticFetcher::new()));
        let cache = CacheManager::new(store, fetcher, sandbox.clone(), self.config.cache.clone());

        Orchestrator {
            natives: self.natives,
            registry: self.registry,
            loader: self.loader,
            catalog: self.catalog,
            sandbox,
            cache,
            config: self.config,
            loading: tokio::sync::Mutex::new(()),
        }
    }
}
