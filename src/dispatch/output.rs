//! Classify a returned value for the renderer.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `null`
    Empty,
    /// string, number or bool
    Scalar,
    /// non-empty array whose items are all objects -> table
    Records,
    /// single object -> definition list
    Record,
    /// any other array -> bullet list
    List,
}

impl Shape {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Shape::Empty,
            Value::Object(_) => Shape::Record,
            Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
                Shape::Records
            }
            Value::Array(_) => Shape::List,
            _ => Shape::Scalar,
        }
    }
}

/// Unwrap the common `{"data": [...]}` envelope so lists render as tables.
pub fn unwrap_envelope(value: &Value) -> &Value {
    match value.get("data") {
        Some(inner @ Value::Array(_)) if value.as_object().is_some_and(|m| m.len() <= 3) => inner,
        _ => value,
    }
}

/// One-line text for a scalar or nested value inside a table cell.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
