//! Backend selection and resolution of the function to call.

use super::Orchestrator;
use super::modules::StaticModule;
use crate::callable::Callable;
use crate::error::{Error, Result};
use crate::model::{Backend, CreationKind, FormulaDefinition};
use crate::sandbox::AllowedModules;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// The backend used when the caller does not ask for one: static if
/// configured, else remote if configured, else embedded.
pub fn default_backend(formula: &FormulaDefinition) -> Backend {
    if formula.static_module().is_some() {
        Backend::Static
    } else if formula.remote_bundle().is_some() {
        Backend::Remote
    } else {
        Backend::Embedded
    }
}

/// Positional arguments in `formula.inputs` order. Missing keys bind `null`.
pub fn bind_arguments(formula: &FormulaDefinition, inputs: &Map<String, Value>) -> Vec<Value> {
    formula
        .inputs
        .iter()
        .map(|input| inputs.get(&input.key).cloned().unwrap_or(Value::Null))
        .collect()
}

impl Orchestrator {
    pub(super) async fn resolve(
        &self,
        formula: &FormulaDefinition,
        backend: Backend,
    ) -> Result<Callable> {
        match backend {
            Backend::Embedded => self.resolve_embedded(formula).await,
            Backend::Static => self.resolve_static(formula).await,
            Backend::Remote => self.resolve_remote(formula).await,
        }
    }

    async fn resolve_embedded(&self, formula: &FormulaDefinition) -> Result<Callable> {
        if formula.creation_kind == CreationKind::UserAuthored {
            if let Some(source) = &formula.source_text {
                let module = self
                    .sandbox
                    .compile(source, Some(&formula.cache_key()))
                    .await?;
                return self
                    .sandbox
                    .extract_function(&module, None, &AllowedModules::new())
                    .await;
            }
        }

        if let Some(callable) = self.natives.get(&formula.id) {
            return Ok(callable.clone());
        }

        let ids = self.natives.ids();
        if formula.static_module().is_none() && formula.remote_bundle().is_none() {
            Err(Error::configuration(format!(
                "formula `{}` has no embedded implementation and no enabled static or remote backend (embedded formulas: {})",
                formula.id,
                if ids.is_empty() { "none".to_string() } else { ids.join(", ") }
            )))
        } else {
            Err(Error::resolution(
                format!("no embedded implementation for formula `{}`", formula.id),
                ids,
            ))
        }
    }

    async fn resolve_static(&self, formula: &FormulaDefinition) -> Result<Callable> {
        let info = formula.static_module().ok_or_else(|| {
            Error::configuration(format!(
                "formula `{}` has no enabled static module configuration",
                formula.id
            ))
        })?;
        let module = self.static_module(&info.module).await?;
        module.resolve(&info.export_path)
    }

    async fn resolve_remote(&self, formula: &FormulaDefinition) -> Result<Callable> {
        let info = formula.remote_bundle().ok_or_else(|| {
            Error::configuration(format!(
                "formula `{}` has no enabled remote bundle configuration",
                formula.id
            ))
        })?;
        let allowed = self
            .catalog
            .resolve(info.allowed_modules.as_deref().unwrap_or_default())?;
        self.cache
            .get_or_load(
                &info.url,
                &info.function_name,
                &formula.id,
                &formula.version,
                &allowed,
            )
            .await
    }

    /// A registered module, else one loaded through the loader and kept.
    async fn static_module(&self, name: &str) -> Result<Arc<StaticModule>> {
        if let Some(module) = self.registry.get(name) {
            return Ok(module);
        }
        let Some(loader) = &self.loader else {
            return Err(Error::resolution(
                format!("module `{}` is not registered and no module loader is configured", name),
                self.registry.names(),
            ));
        };

        let _loading = self.loading.lock().await;
        // Another caller may have finished loading while we waited.
        if let Some(module) = self.registry.get(name) {
            return Ok(module);
        }
        debug!(module = name, "loading static module");
        let module = loader.load(name).await?;
        Ok(self.registry.insert(name, module))
    }
}
