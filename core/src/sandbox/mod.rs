//! Compilation and loading of untrusted Rhai script.
//!
//! ```ignore
//! let sandbox = Sandbox::new(SandboxOptions::default());
//! let module = sandbox.compile("fn double(x) { x * 2 }", Some("double:1.0.0")).await?;
//! let double = sandbox.extract_function(&module, None, &AllowedModules::new()).await?;
//! assert_eq!(double.call(&[json!(21)])?, json!(42));
//! ```
//!
//! Compilation only needs the base engine. Extraction instantiates the module
//! with an engine built for the caller's allow-list, so two callers with
//! different allow-lists get differently isolated functions from one compiled
//! module.

mod capabilities;
mod exports;

pub use capabilities::{AllowedModules, Capability, DENIED_GLOBALS, Fingerprint, fingerprint};
pub use exports::{ScriptExport, ScriptExports};

use crate::callable::Callable;
use crate::error::{CompileDiagnostic, Error, Result};
use crate::options::SandboxOptions;
use capabilities::build_engine;
use parking_lot::RwLock;
use regex::Regex;
use rhai::{AST, Engine, EvalAltResult, FnAccess, Module, ParseError, Scope};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::OnceCell;
use tracing::debug;

/// A compiled, not yet instantiated, script unit.
#[derive(Clone)]
pub struct CompiledModule {
    inner: Arc<CompiledInner>,
}

struct CompiledInner {
    ast: Arc<AST>,
    source: String,
    cache_key: Option<String>,
    /// Public script functions, in source order.
    functions: Vec<String>,
}

impl CompiledModule {
    pub fn cache_key(&self) -> Option<&str> {
        self.inner.cache_key.as_deref()
    }

    pub fn source(&self) -> &str {
        &self.inner.source
    }

    /// Public script function names, in source order.
    pub fn functions(&self) -> &[String] {
        &self.inner.functions
    }

    fn label(&self) -> String {
        match &self.inner.cache_key {
            Some(key) => format!("module `{}`", key),
            None => "script module".to_string(),
        }
    }
}

impl std::fmt::Debug for CompiledModule {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("CompiledModule")
            .field("cache_key", &self.inner.cache_key)
            .field("functions", &self.inner.functions)
            .finish()
    }
}

/// The script compiler and loader.
///
/// Cheap to share behind an `Arc`. All caches are internal and may be
/// dropped with [`Sandbox::reset`] at any time.
pub struct Sandbox {
    options: SandboxOptions,
    base: OnceCell<Arc<Engine>>,
    initializations: AtomicUsize,
    compilations: AtomicUsize,
    compiled: RwLock<HashMap<String, CompiledModule>>,
    engines: RwLock<HashMap<Fingerprint, Arc<Engine>>>,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new(SandboxOptions::default())
    }
}

impl Sandbox {
    pub fn new(options: SandboxOptions) -> Self {
        Self {
            options,
            base: OnceCell::new(),
            initializations: AtomicUsize::new(0),
            compilations: AtomicUsize::new(0),
            compiled: RwLock::new(HashMap::new()),
            engines: RwLock::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> &SandboxOptions {
        &self.options
    }

    /// The base engine, built on first use.
    ///
    /// Concurrent first callers all await the same initialization.
    pub async fn engine(&self) -> Arc<Engine> {
        self.base
            .get_or_init(|| async {
                self.initializations.fetch_add(1, Ordering::SeqCst);
                debug!("initializing sandbox engine");
                Arc::new(build_engine(&self.options, &AllowedModules::new()))
            })
            .await
            .clone()
    }

    /// How many times the base engine was built. At most one.
    pub fn initialization_count(&self) -> usize {
        self.initializations.load(Ordering::SeqCst)
    }

    /// How many sources were actually compiled, cache hits excluded.
    pub fn compilation_count(&self) -> usize {
        self.compilations.load(Ordering::SeqCst)
    }

    /// Compile `source`, reusing the cached unit for `cache_key` when its
    /// source is unchanged.
    pub async fn compile(&self, source: &str, cache_key: Option<&str>) -> Result<CompiledModule> {
        if let Some(key) = cache_key {
            if let Some(cached) = self.compiled.read().get(key) {
                if cached.inner.source == source {
                    debug!(key, "compile cache hit");
                    return Ok(cached.clone());
                }
                debug!(key, "source changed, recompiling");
            }
        }

        let engine = self.engine().await;
        let ast = engine
            .compile(source)
            .map_err(|err| Error::Compilation(diagnostic(&err, source, cache_key)))?;
        self.compilations.fetch_add(1, Ordering::SeqCst);

        let module = CompiledModule {
            inner: Arc::new(CompiledInner {
                functions: public_functions(&ast, source),
                ast: Arc::new(ast),
                source: source.to_string(),
                cache_key: cache_key.map(str::to_string),
            }),
        };

        if let Some(key) = cache_key {
            self.compiled.write().insert(key.to_string(), module.clone());
        }
        Ok(module)
    }

    /// Instantiate `module` with `allowed` and list its exports.
    pub async fn exports(
        &self,
        module: &CompiledModule,
        allowed: &AllowedModules,
    ) -> Result<ScriptExports> {
        let engine = self.engine_for(allowed).await;
        let instance = Module::eval_ast_as_new(Scope::new(), &module.inner.ast, &engine)
            .map_err(|err| instantiation_error(module, allowed, &err))?;
        Ok(exports::collect(
            &engine,
            &module.inner.ast,
            &instance,
            &module.inner.functions,
        ))
    }

    /// Resolve one callable export of `module`.
    ///
    /// With a name, that exact export (a dotted path for namespaced
    /// exports) must be callable. Without one, the first callable export is
    /// returned.
    pub async fn extract_function(
        &self,
        module: &CompiledModule,
        function_name: Option<&str>,
        allowed: &AllowedModules,
    ) -> Result<Callable> {
        let exports = self.exports(module, allowed).await?;

        match function_name {
            Some(name) => match exports.lookup(name).and_then(ScriptExport::as_callable) {
                Some(callable) => Ok(callable.clone()),
                None => {
                    let available = if name.contains('.') {
                        exports.names_with_nested()
                    } else {
                        exports.names()
                    };
                    Err(Error::resolution(
                        format!(
                            "function `{}` is not a callable export of {}",
                            name,
                            module.label()
                        ),
                        available,
                    ))
                }
            },
            None => exports.first_callable().cloned().ok_or_else(|| {
                Error::resolution(
                    format!("{} has no callable export", module.label()),
                    exports.names(),
                )
            }),
        }
    }

    /// Drop the compiled unit cached under `cache_key`, if any.
    pub fn forget(&self, cache_key: &str) {
        self.compiled.write().remove(cache_key);
    }

    /// Drop every cached compiled unit and allow-list engine.
    pub fn reset(&self) {
        self.compiled.write().clear();
        self.engines.write().clear();
    }

    async fn engine_for(&self, allowed: &AllowedModules) -> Arc<Engine> {
        if allowed.is_empty() {
            return self.engine().await;
        }
        let key = fingerprint(allowed);
        if let Some(engine) = self.engines.read().get(&key) {
            return engine.clone();
        }
        let engine = Arc::new(build_engine(&self.options, allowed));
        self.engines.write().insert(key, engine.clone());
        engine
    }
}

/// Public, named script functions ordered by where they are declared.
fn public_functions(ast: &AST, source: &str) -> Vec<String> {
    let mut functions: Vec<(usize, String)> = ast
        .iter_functions()
        .filter(|f| f.access != FnAccess::Private && !f.name.contains('$'))
        .map(|f| (declaration_offset(source, f.name), f.name.to_string()))
        .collect();
    functions.sort();
    functions.dedup_by(|a, b| a.1 == b.1);
    functions.into_iter().map(|(_, name)| name).collect()
}

fn declaration_offset(source: &str, name: &str) -> usize {
    Regex::new(&format!(r"\bfn\s+{}\s*\(", regex::escape(name)))
        .ok()
        .and_then(|re| re.find(source))
        .map_or(usize::MAX, |m| m.start())
}

fn diagnostic(err: &ParseError, source: &str, unit: Option<&str>) -> CompileDiagnostic {
    let position = err.position();
    let line = position.line();
    CompileDiagnostic {
        message: err.err_type().to_string(),
        line,
        column: position.position(),
        source_line: line.and_then(|l| source.lines().nth(l.saturating_sub(1)).map(str::to_string)),
        unit: unit.map(str::to_string),
    }
}

fn instantiation_error(
    module: &CompiledModule,
    allowed: &AllowedModules,
    err: &EvalAltResult,
) -> Error {
    match err {
        EvalAltResult::ErrorModuleNotFound(name, _) => Error::resolution(
            format!("{} imports `{}`, which is not allow-listed", module.label(), name),
            allowed.keys().cloned().collect(),
        ),
        other => Error::runtime(module.label(), other),
    }
}
