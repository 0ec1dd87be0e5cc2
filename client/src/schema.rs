//! Shape check for ticket `state` against its type's JSON Schema.
//!
//! DESIGN
//! ======
//! Only the parts of JSON Schema that ticket types actually use are
//! honoured: `required`, `properties` and primitive `type` (a name or a list
//! of names). Nested object properties are checked recursively. Every other
//! keyword is ignored, so an unfamiliar schema never blocks a save.

#[cfg(test)]
#[path = "schema_test.rs"]
mod schema_test;

use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("state must be a JSON object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(String),
    #[error("field `{field}` must be {expected}, got {found}")]
    WrongType {
        field: String,
        expected: String,
        found: &'static str,
    },
}

/// Check `state` against `schema`, collecting every violation.
///
/// # Errors
///
/// The list of violations, in schema order.
pub fn validate_state(schema: &Value, state: &Value) -> Result<(), Vec<SchemaError>> {
    let mut errors = Vec::new();
    check_object(schema, state, "", &mut errors);
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn check_object(schema: &Value, state: &Value, prefix: &str, errors: &mut Vec<SchemaError>) {
    let Some(schema) = schema.as_object() else {
        return;
    };
    let constrained = schema.contains_key("properties") || schema.contains_key("required");
    let fields = match state {
        Value::Object(fields) => fields,
        Value::Null if prefix.is_empty() && !has_required(schema) => return,
        _ if constrained => {
            errors.push(SchemaError::NotAnObject);
            return;
        }
        _ => return,
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if fields.get(name).is_none_or(Value::is_null) {
                errors.push(SchemaError::MissingField(join(prefix, name)));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return;
    };
    for (name, property) in properties {
        let Some(value) = fields.get(name) else {
            continue;
        };
        let field = join(prefix, name);
        if let Some(expected) = property.get("type") {
            if !type_matches(expected, value) {
                errors.push(SchemaError::WrongType {
                    field,
                    expected: describe(expected),
                    found: type_name(value),
                });
                continue;
            }
        }
        if value.is_object() {
            check_object(property, value, &field, errors);
        }
    }
}

fn has_required(schema: &Map<String, Value>) -> bool {
    schema
        .get("required")
        .and_then(Value::as_array)
        .is_some_and(|r| !r.is_empty())
}

fn type_matches(expected: &Value, value: &Value) -> bool {
    match expected {
        Value::String(name) => primitive_matches(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| primitive_matches(name, value)),
        _ => true,
    }
}

fn primitive_matches(name: &str, value: &Value) -> bool {
    match name {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|f| f.fract() == 0.0),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn describe(expected: &Value) -> String {
    match expected {
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" or "),
        Value::String(name) => name.clone(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() { name.to_owned() } else { format!("{prefix}.{name}") }
}
