//! Resource registry: the callable API surface the dispatcher walks.
//!
//! Resource (trait) -> methods / accessors / properties
//! Signature + ParamSpec describe formal parameters (name, type, optionality, default).
//! Registry (trait) resolves root resources by name.
//!
//! Concrete resources come from the descriptor catalog (`catalog`), which
//! forwards planned requests to a `Transport`.

pub mod catalog;
pub mod transport;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub use catalog::{Catalog, CatalogRegistry};
pub use transport::DryRunTransport;

/// Declared type of a formal parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Array,
    String,
    Int,
    Float,
    Bool,
    #[default]
    Mixed,
}

impl ParamType {
    pub fn is_array(&self) -> bool {
        matches!(self, ParamType::Array)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::Array => "array",
            ParamType::String => "string",
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::Bool => "bool",
            ParamType::Mixed => "mixed",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One formal parameter of a method or accessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub ty: ParamType,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamSpec {
    #[cfg(test)]
    pub fn required(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            default: None,
        }
    }

    #[cfg(test)]
    pub fn optional(name: impl Into<String>, ty: ParamType, default: Value) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: true,
            default: Some(default),
        }
    }

    /// Value passed when the parameter is optional and nothing matched it.
    pub fn default_value(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }
}

/// Ordered formal parameter list of a callable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Signature {
    pub params: Vec<ParamSpec>,
}

impl Signature {
    pub fn new(params: Vec<ParamSpec>) -> Self {
        Self { params }
    }

    pub fn required_count(&self) -> usize {
        self.params.iter().filter(|p| !p.optional).count()
    }

    /// Compact `name:type` rendering, optional parameters bracketed.
    pub fn summary(&self) -> String {
        if self.params.is_empty() {
            return "-".to_string();
        }
        self.params
            .iter()
            .map(|p| {
                if p.optional {
                    format!("[{}:{}]", p.name, p.ty)
                } else {
                    format!("{}:{}", p.name, p.ty)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Static description of a resource, used by `list` / `describe`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceOutline {
    pub name: String,
    pub methods: Vec<(String, Signature)>,
    pub accessors: Vec<(String, Signature)>,
    pub properties: Vec<String>,
}

/// Capability interface every resource and sub-resource implements.
///
/// The walker and binder depend only on this trait, never on concrete types.
pub trait Resource {
    fn name(&self) -> &str;

    fn has_method(&self, method: &str) -> bool;

    /// Formal parameters of `method`. `None` for an existing method means
    /// the signature cannot be introspected and callers fall back to a
    /// positional call.
    fn signature(&self, method: &str) -> Option<Signature>;

    fn invoke(&self, method: &str, args: Vec<Value>) -> anyhow::Result<Value>;

    /// Signature of a sub-resource accessor method, if `name` is one.
    fn accessor(&self, name: &str) -> Option<Signature>;

    /// Call a sub-resource accessor with positional arguments.
    fn open(&self, name: &str, args: Vec<Value>) -> anyhow::Result<Box<dyn Resource>>;

    /// Plain (argument-free) accessor.
    fn property(&self, name: &str) -> Option<Box<dyn Resource>>;

    fn describe(&self) -> ResourceOutline;
}

/// Namespace of named root resources.
pub trait Registry {
    fn resolve(&self, root: &str) -> Option<Box<dyn Resource>>;

    fn roots(&self) -> Vec<String>;
}
