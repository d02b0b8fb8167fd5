//! The capability table and engine construction.
//!
//! A sandboxed script sees exactly the packages listed in [`Capability::ALL`],
//! the JSON helpers, and the modules its caller allow-listed. Nothing else is
//! registered: the engine starts from [`Engine::new_raw`].

use crate::options::SandboxOptions;
use rhai::packages::{
    ArithmeticPackage, BasicArrayPackage, BasicFnPackage, BasicIteratorPackage, BasicMapPackage,
    BasicMathPackage, BasicStringPackage, BasicTimePackage, LanguageCorePackage, LogicPackage,
    MoreStringPackage, Package,
};
use rhai::{Dynamic, Engine, EvalAltResult, Module, ModuleResolver, Position};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Host-provided modules a script may use, by name.
pub type AllowedModules = BTreeMap<String, Arc<Module>>;

/// Global names that always evaluate to `()` inside the sandbox.
pub const DENIED_GLOBALS: &[&str] = &[
    "fetch",
    "XMLHttpRequest",
    "WebSocket",
    "window",
    "document",
    "globalThis",
    "self",
    "localStorage",
    "sessionStorage",
    "indexedDB",
    "navigator",
    "location",
    "process",
    "require",
    "eval",
    "Function",
    "setTimeout",
    "setInterval",
    "postMessage",
    "importScripts",
];

/// One entry of the capability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Core language helpers: `type_of`, `print`, `debug`.
    Core,
    Arithmetic,
    Logic,
    /// `for` loops over ranges.
    Iteration,
    /// Function pointer helpers.
    Functions,
    /// Math functions and numeric parsing (`parse_int`, `parse_float`).
    Math,
    Strings,
    Arrays,
    Maps,
    /// `timestamp()` and elapsed time.
    Time,
    /// `parse_json` and `to_json`.
    Json,
}

impl Capability {
    pub const ALL: [Capability; 11] = [
        Capability::Core,
        Capability::Arithmetic,
        Capability::Logic,
        Capability::Iteration,
        Capability::Functions,
        Capability::Math,
        Capability::Strings,
        Capability::Arrays,
        Capability::Maps,
        Capability::Time,
        Capability::Json,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Capability::Core => "core",
            Capability::Arithmetic => "arithmetic",
            Capability::Logic => "logic",
            Capability::Iteration => "iteration",
            Capability::Functions => "functions",
            Capability::Math => "math",
            Capability::Strings => "strings",
            Capability::Arrays => "arrays",
            Capability::Maps => "maps",
            Capability::Time => "time",
            Capability::Json => "json",
        }
    }

    fn install(self, engine: &mut Engine) {
        match self {
            Capability::Core => {
                LanguageCorePackage::new().register_into_engine(engine);
            }
            Capability::Arithmetic => {
                ArithmeticPackage::new().register_into_engine(engine);
            }
            Capability::Logic => {
                LogicPackage::new().register_into_engine(engine);
            }
            Capability::Iteration => {
                BasicIteratorPackage::new().register_into_engine(engine);
            }
            Capability::Functions => {
                BasicFnPackage::new().register_into_engine(engine);
            }
            Capability::Math => {
                BasicMathPackage::new().register_into_engine(engine);
            }
            Capability::Strings => {
                BasicStringPackage::new().register_into_engine(engine);
                MoreStringPackage::new().register_into_engine(engine);
            }
            Capability::Arrays => {
                BasicArrayPackage::new().register_into_engine(engine);
            }
            Capability::Maps => {
                BasicMapPackage::new().register_into_engine(engine);
            }
            Capability::Time => {
                BasicTimePackage::new().register_into_engine(engine);
            }
            Capability::Json => register_json(engine),
        }
    }
}

fn register_json(engine: &mut Engine) {
    engine.register_fn(
        "parse_json",
        |text: &str| -> Result<Dynamic, Box<EvalAltResult>> {
            let value: serde_json::Value =
                serde_json::from_str(text).map_err(|err| format!("parse_json: {}", err))?;
            rhai::serde::to_dynamic(value)
        },
    );
    engine.register_fn(
        "to_json",
        |value: Dynamic| -> Result<String, Box<EvalAltResult>> {
            let json: serde_json::Value = rhai::serde::from_dynamic(&value)?;
            serde_json::to_string(&json).map_err(|err| format!("to_json: {}", err).into())
        },
    );
}

/// Resolves `import` paths against the allow-list only.
struct AllowListResolver {
    modules: AllowedModules,
}

impl ModuleResolver for AllowListResolver {
    fn resolve(
        &self,
        _engine: &Engine,
        _source: Option<&str>,
        path: &str,
        pos: Position,
    ) -> Result<Arc<Module>, Box<EvalAltResult>> {
        self.modules
            .get(path)
            .cloned()
            .ok_or_else(|| Box::new(EvalAltResult::ErrorModuleNotFound(path.to_string(), pos)))
    }
}

/// Whether `name` can be used as a `name::f()` namespace.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Build an isolated engine exposing the capability table and `allowed`.
pub(crate) fn build_engine(options: &SandboxOptions, allowed: &AllowedModules) -> Engine {
    let mut engine = Engine::new_raw();

    for capability in Capability::ALL {
        capability.install(&mut engine);
    }

    engine.disable_symbol("eval");
    engine.on_var(|name, _index, _context| {
        if DENIED_GLOBALS.contains(&name) {
            Ok(Some(Dynamic::UNIT))
        } else {
            Ok(None)
        }
    });
    engine.on_print(|text| info!(target: "formulate::script", "{}", text));
    engine.on_debug(|text, source, pos| {
        debug!(target: "formulate::script", source = source.unwrap_or(""), %pos, "{}", text)
    });

    engine.set_max_operations(options.max_operations);
    engine.set_max_call_levels(options.max_call_levels);
    engine.set_max_expr_depths(options.max_expr_depth, options.max_expr_depth);
    engine.set_max_string_size(options.max_string_size);
    engine.set_max_array_size(options.max_array_size);
    engine.set_max_map_size(options.max_map_size);
    engine.set_max_modules(options.max_modules);

    for (name, module) in allowed {
        if is_identifier(name) {
            engine.register_static_module(name.as_str(), module.clone());
        }
    }
    engine.set_module_resolver(AllowListResolver {
        modules: allowed.clone(),
    });

    engine
}

/// Identity of an allow-list: each granted name with the module behind it.
///
/// Two lists match only if they grant the same names to the same module
/// instances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Fingerprint(Vec<(String, usize)>);

impl Fingerprint {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }
}

pub fn fingerprint(allowed: &AllowedModules) -> Fingerprint {
    Fingerprint(
        allowed
            .iter()
            .map(|(name, module)| (name.clone(), Arc::as_ptr(module) as usize))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_and_paths() {
        assert!(is_identifier("finance"));
        assert!(is_identifier("_rates2"));
        assert!(!is_identifier("finance/rates"));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn fingerprint_tracks_names_and_modules() {
        let finance = Arc::new(Module::new());
        let tax = Arc::new(Module::new());

        let mut allowed = AllowedModules::new();
        allowed.insert("tax".to_string(), tax.clone());
        allowed.insert("finance".to_string(), finance.clone());
        assert_eq!(fingerprint(&allowed).names().collect::<Vec<_>>(), ["finance", "tax"]);
        assert_eq!(fingerprint(&allowed), fingerprint(&allowed.clone()));

        let mut replaced = allowed.clone();
        replaced.insert("tax".to_string(), Arc::new(Module::new()));
        assert_ne!(fingerprint(&allowed), fingerprint(&replaced));

        let mut joined = AllowedModules::new();
        joined.insert("finance,tax".to_string(), finance);
        assert_ne!(fingerprint(&allowed), fingerprint(&joined));
        assert_eq!(fingerprint(&AllowedModules::new()), Fingerprint::default());
    }
}
