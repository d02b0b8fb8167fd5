//! Recursive description of a value's shape.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification used to build input/output forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BaseType {
    Number,
    String,
    Boolean,
    Object,
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BaseType::Number => write!(f, "number"),
            BaseType::String => write!(f, "string"),
            BaseType::Boolean => write!(f, "boolean"),
            BaseType::Object => write!(f, "object"),
        }
    }
}

/// Optional validation constraints attached to a type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Shape of a value.
///
/// When `is_array` is set, `properties` describe the *element* type, never the
/// array wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeModel {
    pub base_type: BaseType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub is_array: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<PropertySpec>>,
}

/// One named member of an object or enum type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySpec {
    pub name: String,
    pub type_model: TypeModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TypeModel {
    pub fn new(base_type: BaseType) -> Self {
        Self {
            base_type,
            nullable: false,
            is_array: false,
            constraints: None,
            properties: None,
        }
    }

    pub fn number() -> Self {
        Self::new(BaseType::Number)
    }

    pub fn string() -> Self {
        Self::new(BaseType::String)
    }

    pub fn boolean() -> Self {
        Self::new(BaseType::Boolean)
    }

    pub fn object() -> Self {
        Self::new(BaseType::Object)
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark this model as an array of its current shape.
    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    pub fn with_properties(mut self, properties: Vec<PropertySpec>) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    /// Look up a property by name.
    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.as_deref()?.iter().find(|p| p.name == name)
    }
}

impl PropertySpec {
    pub fn new(name: impl Into<String>, type_model: TypeModel) -> Self {
        Self {
            name: name.into(),
            type_model,
            description: None,
        }
    }
}
