//! Minimal JSON-Schema checks for tool input and output.
//!
//! Only the subset tool descriptors use is understood: object schemas with
//! typed `properties` and a `required` list. Unknown keywords are ignored.

use serde_json::{Map, Value};
use thiserror::Error;

/// A schema check failure. Each variant names the offending property.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("expected {expected}, got {actual}")]
    WrongRootType {
        expected: String,
        actual: &'static str,
    },

    #[error("missing required property '{0}'")]
    MissingRequired(String),

    #[error("required property '{0}' is empty")]
    BlankRequired(String),

    #[error("property '{name}' must be {expected}, got {actual}")]
    WrongType {
        name: String,
        expected: String,
        actual: &'static str,
    },
}

impl SchemaError {
    /// The property at fault, if the failure concerns one.
    pub fn property(&self) -> Option<&str> {
        match self {
            Self::WrongRootType { .. } => None,
            Self::MissingRequired(name) | Self::BlankRequired(name) => Some(name),
            Self::WrongType { name, .. } => Some(name),
        }
    }
}

/// Validate `value` against an object `schema`.
///
/// Required string properties must be non-empty after trimming.
pub fn validate(schema: &Value, value: &Value) -> Result<(), SchemaError> {
    if let Some(ty) = schema.get("type").and_then(Value::as_str) {
        if !type_matches(ty, value) {
            return Err(SchemaError::WrongRootType {
                expected: ty.to_string(),
                actual: type_name(value),
            });
        }
    }

    let Some(obj) = value.as_object() else {
        return Ok(());
    };
    let empty = Map::new();
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    for name in required(schema) {
        match obj.get(name) {
            None | Some(Value::Null) => {
                return Err(SchemaError::MissingRequired(name.to_string()));
            }
            Some(Value::String(s)) if s.trim().is_empty() => {
                return Err(SchemaError::BlankRequired(name.to_string()));
            }
            Some(_) => {}
        }
    }

    for (name, prop) in properties {
        let Some(actual) = obj.get(name) else {
            continue;
        };
        if actual.is_null() {
            continue;
        }
        if let Some(ty) = prop.get("type").and_then(Value::as_str) {
            if !type_matches(ty, actual) {
                return Err(SchemaError::WrongType {
                    name: name.clone(),
                    expected: ty.to_string(),
                    actual: type_name(actual),
                });
            }
        }
    }

    Ok(())
}

fn required(schema: &Value) -> impl Iterator<Item = &str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

fn type_matches(ty: &str, value: &Value) -> bool {
    match ty {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
