//! Plain data records: formula definitions, type models and execution results.
//!
//! Every record here is storage-agnostic. Fields are primitives, strings or
//! nested records, and serialize with camelCase names.

pub mod formula;
pub mod result;
pub mod type_model;

pub use formula::{
    CreationKind, DEFAULT_HINT_KEY, DEFAULT_SCALE, DEFAULT_VERSION, EngineHint, FieldSpec, FormulaDefinition, InputSpec, OutputSpec,
    RemoteBundleInfo, Rounding, StaticModuleInfo,
};
pub use result::{Backend, ExecutionFailure, ExecutionResult};
pub use type_model::{BaseType, Constraints, PropertySpec, TypeModel};
