//! Statically linked modules and the modules scripts may import.

use crate::callable::Callable;
use crate::error::{Error, Result};
use crate::fetch::{Fetcher, fetch_text};
use crate::sandbox::{AllowedModules, Sandbox, ScriptExport};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A named export of a [`StaticModule`].
#[derive(Debug, Clone)]
pub enum Export {
    Function(Callable),
    Namespace(BTreeMap<String, Export>),
}

impl Export {
    pub fn namespace<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = (S, Export)>,
        S: Into<String>,
    {
        Export::Namespace(
            members
                .into_iter()
                .map(|(name, export)| (name.into(), export))
                .collect(),
        )
    }

    fn member(&self, name: &str) -> Option<&Export> {
        match self {
            Export::Namespace(members) => members.get(name),
            Export::Function(_) => None,
        }
    }

    fn as_callable(&self) -> Option<&Callable> {
        match self {
            Export::Function(callable) => Some(callable),
            Export::Namespace(_) => None,
        }
    }
}

/// A module of ready-to-call functions, addressed by dotted export paths.
#[derive(Debug, Clone)]
pub struct StaticModule {
    name: String,
    exports: BTreeMap<String, Export>,
    default: Option<Export>,
}

impl StaticModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exports: BTreeMap::new(),
            default: None,
        }
    }

    pub fn with_export(mut self, name: impl Into<String>, export: Export) -> Self {
        self.exports.insert(name.into(), export);
        self
    }

    pub fn with_function(self, name: impl Into<String>, callable: Callable) -> Self {
        self.with_export(name, Export::Function(callable))
    }

    pub fn with_default(mut self, export: Export) -> Self {
        self.default = Some(export);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build a module from the exports of an instantiated script.
    ///
    /// Plain values are dropped. A script has no default export.
    pub fn from_script(name: impl Into<String>, exports: Vec<(String, ScriptExport)>) -> Self {
        let exports = exports
            .into_iter()
            .filter_map(|(name, export)| Some((name, script_export(export)?)))
            .collect();
        Self {
            name: name.into(),
            exports,
            default: None,
        }
    }

    /// Resolve `path` as a named export, then as a member of the default
    /// export, then as the bare default export.
    pub fn resolve(&self, path: &str) -> Result<Callable> {
        let named = walk(self.exports.get(first(path)), path);
        let in_default = self
            .default
            .as_ref()
            .and_then(|default| walk(default.member(first(path)), path));
        let bare_default = self.default.as_ref().and_then(Export::as_callable);

        named
            .or(in_default)
            .or(bare_default)
            .cloned()
            .ok_or_else(|| {
                Error::resolution(
                    format!(
                        "export `{}` not found in module `{}`",
                        path, self.name
                    ),
                    self.export_names(),
                )
            })
    }

    /// Top-level export names, then one level of nested names.
    pub fn export_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut nested = Vec::new();
        let named = self.exports.iter().map(|(name, e)| (name.as_str(), e));
        for (name, export) in named.chain(self.default.as_ref().map(|d| ("default", d))) {
            names.push(name.to_string());
            if let Export::Namespace(members) = export {
                nested.extend(members.keys().map(|member| format!("{}.{}", name, member)));
            }
        }
        names.extend(nested);
        names
    }
}

fn first(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

/// Follow the remaining segments of `path` from `start`.
fn walk<'a>(start: Option<&'a Export>, path: &str) -> Option<&'a Callable> {
    let mut current = start?;
    for segment in path.split('.').skip(1) {
        current = current.member(segment)?;
    }
    current.as_callable()
}

fn script_export(export: ScriptExport) -> Option<Export> {
    match export {
        ScriptExport::Function(callable) => Some(Export::Function(callable)),
        ScriptExport::Namespace(members) => Some(Export::Namespace(
            members
                .into_iter()
                .filter_map(|(name, member)| Some((name, script_export(member)?)))
                .collect(),
        )),
        ScriptExport::Value => None,
    }
}

/// Modules registered by the host before any execution.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: RwLock<HashMap<String, Arc<StaticModule>>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module` under its own name.
    pub fn register(&self, module: StaticModule) -> Arc<StaticModule> {
        let name = module.name().to_string();
        self.insert(name, module)
    }

    /// Register `module` under `name`, replacing any previous entry.
    pub fn insert(&self, name: impl Into<String>, module: StaticModule) -> Arc<StaticModule> {
        let module = Arc::new(module);
        self.modules.write().insert(name.into(), module.clone());
        module
    }

    pub fn get(&self, name: &str) -> Option<Arc<StaticModule>> {
        self.modules.read().get(name).cloned()
    }

    /// Registered module names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Loads modules that were not registered up front.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, name: &str) -> Result<StaticModule>;
}

/// Loads a module by fetching and instantiating a Rhai script.
///
/// The script location is `template` with `{module}` replaced by the module
/// name, e.g. `file:///srv/modules/{module}.rhai`.
pub struct ScriptModuleLoader {
    sandbox: Arc<Sandbox>,
    fetcher: Arc<dyn Fetcher>,
    template: String,
    allowed: AllowedModules,
}

impl ScriptModuleLoader {
    pub fn new(sandbox: Arc<Sandbox>, fetcher: Arc<dyn Fetcher>, template: impl Into<String>) -> Self {
        Self {
            sandbox,
            fetcher,
            template: template.into(),
            allowed: AllowedModules::new(),
        }
    }

    /// Modules the loaded scripts may themselves use.
    pub fn with_allowed_modules(mut self, allowed: AllowedModules) -> Self {
        self.allowed = allowed;
        self
    }

    pub fn location(&self, name: &str) -> String {
        self.template.replace("{module}", name)
    }
}

#[async_trait]
impl ModuleLoader for ScriptModuleLoader {
    async fn load(&self, name: &str) -> Result<StaticModule> {
        let url = self.location(name);
        let source = fetch_text(self.fetcher.as_ref(), &url).await?;
        let compiled = self
            .sandbox
            .compile(&source, Some(&format!("module:{}", name)))
            .await?;
        let exports = self.sandbox.exports(&compiled, &self.allowed).await?;
        Ok(StaticModule::from_script(name, exports.items))
    }
}

/// Host-provided Rhai modules that remote bundles may allow-list by name.
#[derive(Clone, Default)]
pub struct ModuleCatalog {
    modules: BTreeMap<String, Arc<rhai::Module>>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, name: impl Into<String>, module: rhai::Module) -> Self {
        self.insert(name, Arc::new(module));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, module: Arc<rhai::Module>) {
        self.modules.insert(name.into(), module);
    }

    pub fn names(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    /// The allow-list for `names`. Every name must be in the catalog.
    pub fn resolve(&self, names: &[String]) -> Result<AllowedModules> {
        names
            .iter()
            .map(|name| match self.modules.get(name) {
                Some(module) => Ok((name.clone(), module.clone())),
                None => Err(Error::configuration(format!(
                    "allowed module `{}` is not provided by the host (available: {})",
                    name,
                    self.names().join(", ")
                ))),
            })
            .collect()
    }
}
