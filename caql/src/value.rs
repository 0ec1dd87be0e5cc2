//! Value semantics shared by operators and functions.
//!
//! DESIGN
//! ======
//! Values are plain `serde_json::Value`s. Every number is computed as `f64`
//! and converted back through [`number`], which yields an integer JSON
//! number when the result is integral so `1 + 2` produces `3`, not `3.0`.
//!
//! Ordering across types follows a fixed rank:
//! null < bool < number < string < array < object. Arrays compare element
//! by element and objects compare over the sorted union of their keys; a
//! missing element or member counts as `null`.

use std::cmp::Ordering;

use serde_json::{Map, Value};

/// Largest integer magnitude an `f64` represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Convert an `f64` into a JSON number. Non-finite values become `0`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn number(n: f64) -> Value {
    if !n.is_finite() {
        return Value::from(0);
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Value::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(Value::from(0), Value::Number)
}

/// Round to five decimals, the precision of `*` and `/`.
#[must_use]
pub fn round5(n: f64) -> f64 {
    (n * 100_000.0).round() / 100_000.0
}

// =============================================================================
// COERCION
// =============================================================================

#[must_use]
pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[must_use]
pub fn to_number(value: &Value) -> f64 {
    let n = match value {
        Value::Null | Value::Object(_) => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Array(items) => match items.as_slice() {
            [single] => to_number(single),
            _ => 0.0,
        },
    };
    if n.is_finite() { n } else { 0.0 }
}

/// String form used by `LIKE`, regex matching and string functions.
#[must_use]
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(_) => match number(to_number(value)) {
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        },
        other => other.to_string(),
    }
}

/// `[]` for null, the array itself for arrays, `[value]` otherwise.
#[must_use]
pub fn to_array(value: &Value) -> Vec<Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

#[must_use]
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// COMPARISON
// =============================================================================

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values.
#[must_use]
pub fn compare(a: &Value, b: &Value) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(_), Value::Number(_)) => to_number(a)
            .partial_cmp(&to_number(b))
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => compare_arrays(x, y),
        (Value::Object(x), Value::Object(y)) => compare_objects(x, y),
        _ => Ordering::Equal,
    }
}

fn compare_arrays(x: &[Value], y: &[Value]) -> Ordering {
    let len = x.len().max(y.len());
    for i in 0..len {
        let ord = compare(x.get(i).unwrap_or(&Value::Null), y.get(i).unwrap_or(&Value::Null));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn compare_objects(x: &Map<String, Value>, y: &Map<String, Value>) -> Ordering {
    let mut keys: Vec<&String> = x.keys().chain(y.keys()).collect();
    keys.sort();
    keys.dedup();
    for key in keys {
        let ord = compare(x.get(key).unwrap_or(&Value::Null), y.get(key).unwrap_or(&Value::Null));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[must_use]
pub fn equals(a: &Value, b: &Value) -> bool {
    compare(a, b) == Ordering::Equal
}

/// `needle IN haystack`. False unless `haystack` is an array.
#[must_use]
pub fn contains(needle: &Value, haystack: &Value) -> bool {
    match haystack {
        Value::Array(items) => items.iter().any(|item| equals(needle, item)),
        _ => false,
    }
}

// =============================================================================
// ARITHMETIC
// =============================================================================

#[must_use]
pub fn add(a: &Value, b: &Value) -> Value {
    number(to_number(a) + to_number(b))
}

#[must_use]
pub fn sub(a: &Value, b: &Value) -> Value {
    number(to_number(a) - to_number(b))
}

#[must_use]
pub fn mul(a: &Value, b: &Value) -> Value {
    number(round5(to_number(a) * to_number(b)))
}

/// Division by zero yields `0`.
#[must_use]
pub fn div(a: &Value, b: &Value) -> Value {
    let divisor = to_number(b);
    if divisor == 0.0 {
        return Value::from(0);
    }
    number(round5(to_number(a) / divisor))
}

/// Floating-point remainder. A zero divisor yields `0`.
#[must_use]
pub fn rem(a: &Value, b: &Value) -> Value {
    let divisor = to_number(b);
    if divisor == 0.0 {
        return Value::from(0);
    }
    number(to_number(a) % divisor)
}

#[cfg(test)]
#[path = "value_test.rs"]
mod value_test;
