//! Formula definitions and their backend configuration blocks.

use super::type_model::{BaseType, TypeModel};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Version assigned to formulas that do not declare one.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Key of the engine hint used when no backend-specific hint exists.
pub const DEFAULT_HINT_KEY: &str = "default";

/// Structured schema of one annotated function.
///
/// `inputs` order is authoritative: the orchestrator binds arguments
/// positionally in this order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaDefinition {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_hints: Option<BTreeMap<String, EngineHint>>,
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
    #[serde(default)]
    pub outputs: Vec<OutputSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_module_info: Option<StaticModuleInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_bundle_info: Option<RemoteBundleInfo>,
    pub creation_kind: CreationKind,
}

/// Describes one input or output of a formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub key: String,
    pub base_type: BaseType,
    pub type_model: TypeModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// A declared `null` default is `Some(Value::Null)`, distinct from no default.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_value"
    )]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Any value that is present in the record, `null` included.
fn present_value<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<serde_json::Value>, D::Error> {
    serde_json::Value::deserialize(deserializer).map(Some)
}

pub type InputSpec = FieldSpec;
pub type OutputSpec = FieldSpec;

impl FieldSpec {
    /// Create a spec whose `base_type` mirrors the model's.
    pub fn new(key: impl Into<String>, type_model: TypeModel) -> Self {
        Self {
            key: key.into(),
            base_type: type_model.base_type,
            type_model,
            unit: None,
            default: None,
            description: None,
        }
    }
}

/// How a formula came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CreationKind {
    Embedded,
    Imported,
    Uploaded,
    UserAuthored,
    Placeholder,
}

/// Rounding strategy applied by the precision normalizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rounding {
    /// Nearest, ties away from zero.
    #[default]
    Round,
    Floor,
    Ceil,
    Trunc,
}

impl FromStr for Rounding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "round" => Ok(Rounding::Round),
            "floor" => Ok(Rounding::Floor),
            "ceil" => Ok(Rounding::Ceil),
            "trunc" => Ok(Rounding::Trunc),
            other => Err(format!("unknown rounding strategy `{}`", other)),
        }
    }
}

impl fmt::Display for Rounding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rounding::Round => write!(f, "round"),
            Rounding::Floor => write!(f, "floor"),
            Rounding::Ceil => write!(f, "ceil"),
            Rounding::Trunc => write!(f, "trunc"),
        }
    }
}

/// Per-backend rounding applied to numeric results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineHint {
    #[serde(default)]
    pub rounding: Rounding,
    #[serde(default = "default_scale")]
    pub scale: u32,
}

/// Scale used when a hint does not specify a parseable one.
pub const DEFAULT_SCALE: u32 = 8;

fn default_scale() -> u32 {
    DEFAULT_SCALE
}

impl Default for EngineHint {
    fn default() -> Self {
        Self {
            rounding: Rounding::Round,
            scale: DEFAULT_SCALE,
        }
    }
}

/// Configuration of the statically linked module backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticModuleInfo {
    #[serde(default)]
    pub enabled: bool,
    /// Name the module is registered (or loadable) under.
    pub module: String,
    /// Dotted path to the export, e.g. `rates.effective`.
    pub export_path: String,
}

/// Configuration of the remote bundle backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteBundleInfo {
    #[serde(default)]
    pub enabled: bool,
    pub url: String,
    pub function_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_modules: Option<Vec<String>>,
}

impl FormulaDefinition {
    /// A placeholder definition with no inputs, outputs or backends.
    pub fn placeholder(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            version: DEFAULT_VERSION.to_string(),
            description: None,
            tags: None,
            engine_hints: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            source_text: None,
            static_module_info: None,
            remote_bundle_info: None,
            creation_kind: CreationKind::Placeholder,
        }
    }

    /// `id:version`, the key used by the compile and bundle caches.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.id, self.version)
    }

    pub fn static_module(&self) -> Option<&StaticModuleInfo> {
        self.static_module_info.as_ref().filter(|info| info.enabled)
    }

    pub fn remote_bundle(&self) -> Option<&RemoteBundleInfo> {
        self.remote_bundle_info.as_ref().filter(|info| info.enabled)
    }

    /// Hint for `backend`, falling back to the `default` entry.
    pub fn hint_for(&self, backend: &str) -> Option<EngineHint> {
        let hints = self.engine_hints.as_ref()?;
        hints
            .get(backend)
            .or_else(|| hints.get(DEFAULT_HINT_KEY))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rounding_parses_case_insensitively() {
        assert_eq!("ROUND".parse::<Rounding>(), Ok(Rounding::Round));
        assert_eq!(" trunc ".parse::<Rounding>(), Ok(Rounding::Trunc));
        assert!("bankers".parse::<Rounding>().is_err());
    }

    #[test]
    fn hint_falls_back_to_default_entry() {
        let mut formula = FormulaDefinition::placeholder("npv");
        let mut hints = BTreeMap::new();
        hints.insert(
            "default".to_string(),
            EngineHint {
                rounding: Rounding::Floor,
                scale: 2,
            },
        );
        hints.insert(
            "static".to_string(),
            EngineHint {
                rounding: Rounding::Ceil,
                scale: 4,
            },
        );
        formula.engine_hints = Some(hints);

        assert_eq!(formula.hint_for("static").unwrap().rounding, Rounding::Ceil);
        assert_eq!(formula.hint_for("remote").unwrap().scale, 2);
        assert_eq!(FormulaDefinition::placeholder("x").hint_for("remote"), None);
    }

    #[test]
    fn disabled_backend_blocks_are_ignored() {
        let mut formula = FormulaDefinition::placeholder("npv");
        formula.remote_bundle_info = Some(RemoteBundleInfo {
            enabled: false,
            url: "http://example.test/npv.rhai".to_string(),
            function_name: "npv".to_string(),
            allowed_modules: None,
        });
        assert!(formula.remote_bundle().is_none());
        assert_eq!(formula.cache_key(), "npv:1.0.0");
    }

    #[test]
    fn null_default_differs_from_missing_default() {
        let declared: FieldSpec = serde_json::from_value(serde_json::json!({
            "key": "label",
            "baseType": "string",
            "typeModel": {"baseType": "string"},
            "default": null,
        }))
        .unwrap();
        assert_eq!(declared.default, Some(serde_json::Value::Null));

        let missing = FieldSpec::new("label", TypeModel::string());
        let record = serde_json::to_value(&missing).unwrap();
        assert!(record.get("default").is_none());
        let restored: FieldSpec = serde_json::from_value(record).unwrap();
        assert_eq!(restored.default, None);
    }
}
