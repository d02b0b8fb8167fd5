//! Exports of an instantiated script module.

use crate::callable::{Callable, Invoke};
use crate::error::{Error, Result};
use rhai::{CallFnOptions, Dynamic, Engine, FnPtr, Map, Module, Scope, AST};
use serde_json::Value;
use std::sync::Arc;

/// One named export of a script module.
#[derive(Debug, Clone)]
pub enum ScriptExport {
    Function(Callable),
    /// An exported map of function pointers, possibly nested.
    Namespace(Vec<(String, ScriptExport)>),
    /// Any other exported value. Not callable.
    Value,
}

impl ScriptExport {
    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            ScriptExport::Function(f) => Some(f),
            _ => None,
        }
    }
}

/// The ordered export list of a module.
#[derive(Debug, Clone, Default)]
pub struct ScriptExports {
    pub items: Vec<(String, ScriptExport)>,
}

impl ScriptExports {
    pub fn get(&self, name: &str) -> Option<&ScriptExport> {
        self.items.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    /// Follow a dotted path through nested namespaces.
    pub fn lookup(&self, path: &str) -> Option<&ScriptExport> {
        let mut segments = path.split('.');
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            let ScriptExport::Namespace(members) = current else {
                return None;
            };
            current = members.iter().find(|(n, _)| n == segment).map(|(_, e)| e)?;
        }
        Some(current)
    }

    /// First export that can be called, in export order.
    pub fn first_callable(&self) -> Option<&Callable> {
        self.items.iter().find_map(|(_, export)| export.as_callable())
    }

    pub fn names(&self) -> Vec<String> {
        self.items.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Top-level names followed by one level of `namespace.member` names.
    pub fn names_with_nested(&self) -> Vec<String> {
        let mut names = self.names();
        for (name, export) in &self.items {
            if let ScriptExport::Namespace(members) = export {
                names.extend(members.iter().map(|(member, _)| format!("{}.{}", name, member)));
            }
        }
        names
    }
}

/// Walk `instance` and the AST into an export list.
///
/// `functions` are the public script function names in source order.
pub(crate) fn collect(
    engine: &Arc<Engine>,
    ast: &Arc<AST>,
    instance: &Module,
    functions: &[String],
) -> ScriptExports {
    let mut items: Vec<(String, ScriptExport)> = functions
        .iter()
        .map(|name| {
            let target = Target::Named(name.clone());
            (name.clone(), script_callable(name, engine, ast, target))
        })
        .collect();

    for (name, value) in instance.iter_var() {
        if items.iter().any(|(existing, _)| existing == name) {
            continue;
        }
        items.push((name.to_string(), classify_value(name, value, engine, ast)));
    }

    ScriptExports { items }
}

fn classify_value(path: &str, value: &Dynamic, engine: &Arc<Engine>, ast: &Arc<AST>) -> ScriptExport {
    if let Some(ptr) = value.clone().try_cast::<FnPtr>() {
        return script_callable(path, engine, ast, Target::Pointer(ptr));
    }
    if let Some(map) = value.clone().try_cast::<Map>() {
        let members: Vec<(String, ScriptExport)> = map
            .iter()
            .map(|(key, member)| {
                let member_path = format!("{}.{}", path, key);
                (key.to_string(), classify_value(&member_path, member, engine, ast))
            })
            .collect();
        let has_functions = members
            .iter()
            .any(|(_, m)| !matches!(m, ScriptExport::Value));
        if has_functions {
            return ScriptExport::Namespace(members);
        }
    }
    ScriptExport::Value
}

fn script_callable(name: &str, engine: &Arc<Engine>, ast: &Arc<AST>, target: Target) -> ScriptExport {
    ScriptExport::Function(Callable::new(
        name,
        ScriptFunction {
            name: name.to_string(),
            engine: engine.clone(),
            ast: ast.clone(),
            target,
        },
    ))
}

enum Target {
    Named(String),
    Pointer(FnPtr),
}

/// A script function bound to the engine that instantiated it.
struct ScriptFunction {
    name: String,
    engine: Arc<Engine>,
    ast: Arc<AST>,
    target: Target,
}

impl Invoke for ScriptFunction {
    fn invoke(&self, args: &[Value]) -> Result<Value> {
        let args = args
            .iter()
            .map(|arg| rhai::serde::to_dynamic(arg).map_err(|err| Error::runtime(&self.name, err)))
            .collect::<Result<Vec<Dynamic>>>()?;

        let result = match &self.target {
            // Top-level statements run first so module-level imports are in
            // scope for the function body.
            Target::Named(name) => {
                let options = CallFnOptions::new().eval_ast(true).rewind_scope(true);
                self.engine.call_fn_with_options::<Dynamic>(
                    options,
                    &mut Scope::new(),
                    &self.ast,
                    name,
                    args,
                )
            }
            Target::Pointer(ptr) => ptr.call::<Dynamic>(&self.engine, &self.ast, args),
        }
        .map_err(|err| Error::runtime(&self.name, err))?;

        to_json(&self.name, &result)
    }
}

fn to_json(function: &str, value: &Dynamic) -> Result<Value> {
    if value.is_unit() {
        return Ok(Value::Null);
    }
    rhai::serde::from_dynamic::<Value>(value).map_err(|err| Error::runtime(function, err))
}
