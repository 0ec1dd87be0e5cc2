//! Built-in functions.
//!
//! Names are matched case-insensitively. Arguments are already evaluated;
//! most functions coerce rather than fail, mirroring the operators.

use std::cmp::Ordering;
use std::f64::consts::PI;

use serde_json::{Map, Value};

use crate::error::EvalError;
use crate::value::{
    compare, contains, equals, number, to_array, to_bool, to_number, to_text, type_name,
};

/// Upper bound on the number of elements a range may produce.
pub const MAX_RANGE_LEN: usize = 1_000_000;

/// Call the built-in `name` with `args`.
///
/// # Errors
///
/// Returns `EvalError::UnknownFunction` for names that are not built in and
/// `EvalError::Arity` when the argument count is wrong.
pub fn call(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let upper = name.to_ascii_uppercase();
    let f = Args { name: &upper, args };

    match upper.as_str() {
        // strings
        "LENGTH" => {
            f.arity(1, 1)?;
            Ok(length(f.arg(0)))
        }
        "CONCAT" => Ok(Value::String(
            args.iter()
                .flat_map(to_array)
                .map(|v| to_text(&v))
                .collect(),
        )),
        "LOWER" => {
            f.arity(1, 1)?;
            Ok(Value::String(to_text(f.arg(0)).to_lowercase()))
        }
        "UPPER" => {
            f.arity(1, 1)?;
            Ok(Value::String(to_text(f.arg(0)).to_uppercase()))
        }
        "TRIM" => {
            f.arity(1, 1)?;
            Ok(Value::String(to_text(f.arg(0)).trim().to_owned()))
        }
        "SUBSTRING" => {
            f.arity(2, 3)?;
            Ok(substring(&to_text(f.arg(0)), to_number(f.arg(1)), f.opt(2).map(to_number)))
        }
        "CONTAINS" => {
            f.arity(2, 3)?;
            let text = to_text(f.arg(0));
            let search = to_text(f.arg(1));
            let position = text
                .find(&search)
                .map(|byte| text[..byte].chars().count());
            if f.opt(2).is_some_and(to_bool) {
                Ok(position.map_or(Value::from(-1), Value::from))
            } else {
                Ok(Value::Bool(position.is_some()))
            }
        }
        "STARTS_WITH" => {
            f.arity(2, 2)?;
            Ok(Value::Bool(to_text(f.arg(0)).starts_with(&to_text(f.arg(1)))))
        }
        "SPLIT" => {
            f.arity(1, 3)?;
            Ok(split(&to_text(f.arg(0)), f.opt(1).map(to_text), f.opt(2).map(to_number)))
        }

        // numbers
        "ABS" => f.unary_math(f64::abs),
        "CEIL" => f.unary_math(f64::ceil),
        "FLOOR" => f.unary_math(f64::floor),
        "ROUND" => f.unary_math(f64::round),
        "SQRT" => {
            f.arity(1, 1)?;
            let n = to_number(f.arg(0));
            Ok(if n < 0.0 { Value::Null } else { number(n.sqrt()) })
        }
        "POW" => {
            f.arity(2, 2)?;
            Ok(number(to_number(f.arg(0)).powf(to_number(f.arg(1)))))
        }
        "PI" => {
            f.arity(0, 0)?;
            Ok(number(PI))
        }
        "SUM" => {
            f.arity(1, 1)?;
            Ok(number(numbers(f.arg(0)).iter().sum()))
        }
        "PRODUCT" => {
            f.arity(1, 1)?;
            Ok(number(numbers(f.arg(0)).iter().product()))
        }
        "AVERAGE" | "AVG" => {
            f.arity(1, 1)?;
            Ok(average(&numbers(f.arg(0))))
        }
        "MEDIAN" => {
            f.arity(1, 1)?;
            Ok(median(numbers(f.arg(0))))
        }
        "MIN" => {
            f.arity(1, 1)?;
            Ok(extreme(f.arg(0), Ordering::Less))
        }
        "MAX" => {
            f.arity(1, 1)?;
            Ok(extreme(f.arg(0), Ordering::Greater))
        }
        "RANGE" => {
            f.arity(2, 3)?;
            let step = f.opt(2).map_or(1.0, to_number);
            range(to_number(f.arg(0)), to_number(f.arg(1)), step)
        }

        // arrays
        "FIRST" => {
            f.arity(1, 1)?;
            Ok(to_array(f.arg(0)).into_iter().next().unwrap_or(Value::Null))
        }
        "LAST" => {
            f.arity(1, 1)?;
            Ok(to_array(f.arg(0)).pop().unwrap_or(Value::Null))
        }
        "NTH" => {
            f.arity(2, 2)?;
            let items = to_array(f.arg(0));
            Ok(resolve_index(items.len(), to_number(f.arg(1)))
                .and_then(|i| items.get(i).cloned())
                .unwrap_or(Value::Null))
        }
        "APPEND" => {
            f.arity(2, 3)?;
            let mut items = to_array(f.arg(0));
            let unique = f.opt(2).is_some_and(to_bool);
            for value in to_array(f.arg(1)) {
                push_value(&mut items, value, unique);
            }
            Ok(Value::Array(items))
        }
        "PUSH" => {
            f.arity(2, 3)?;
            let mut items = to_array(f.arg(0));
            push_value(&mut items, f.arg(1).clone(), f.opt(2).is_some_and(to_bool));
            Ok(Value::Array(items))
        }
        "UNSHIFT" => {
            f.arity(2, 3)?;
            let mut items = to_array(f.arg(0));
            let unique = f.opt(2).is_some_and(to_bool);
            if !(unique && items.iter().any(|v| equals(v, f.arg(1)))) {
                items.insert(0, f.arg(1).clone());
            }
            Ok(Value::Array(items))
        }
        "POP" => {
            f.arity(1, 1)?;
            let mut items = to_array(f.arg(0));
            items.pop();
            Ok(Value::Array(items))
        }
        "SHIFT" => {
            f.arity(1, 1)?;
            Ok(Value::Array(to_array(f.arg(0)).into_iter().skip(1).collect()))
        }
        "REVERSE" => {
            f.arity(1, 1)?;
            Ok(match f.arg(0) {
                Value::String(s) => Value::String(s.chars().rev().collect()),
                other => Value::Array(to_array(other).into_iter().rev().collect()),
            })
        }
        "UNIQUE" => {
            f.arity(1, 1)?;
            Ok(Value::Array(unique(to_array(f.arg(0)))))
        }
        "SORTED" => {
            f.arity(1, 1)?;
            let mut items = to_array(f.arg(0));
            items.sort_by(compare);
            Ok(Value::Array(items))
        }
        "SORTED_UNIQUE" => {
            f.arity(1, 1)?;
            let mut items = unique(to_array(f.arg(0)));
            items.sort_by(compare);
            Ok(Value::Array(items))
        }
        "COUNT_DISTINCT" => {
            f.arity(1, 1)?;
            Ok(Value::from(unique(to_array(f.arg(0))).len()))
        }
        "UNION" => {
            f.arity(1, usize::MAX)?;
            Ok(Value::Array(args.iter().flat_map(to_array).collect()))
        }
        "UNION_DISTINCT" => {
            f.arity(1, usize::MAX)?;
            Ok(Value::Array(unique(args.iter().flat_map(to_array).collect())))
        }
        "INTERSECTION" => {
            f.arity(1, usize::MAX)?;
            let mut result = unique(to_array(f.arg(0)));
            for other in &args[1..] {
                let other = Value::Array(to_array(other));
                result.retain(|v| contains(v, &other));
            }
            Ok(Value::Array(result))
        }
        "MINUS" => {
            f.arity(1, usize::MAX)?;
            let mut result = unique(to_array(f.arg(0)));
            for other in &args[1..] {
                let other = Value::Array(to_array(other));
                result.retain(|v| !contains(v, &other));
            }
            Ok(Value::Array(result))
        }
        "POSITION" | "CONTAINS_ARRAY" => {
            f.arity(2, 3)?;
            let items = to_array(f.arg(0));
            let position = items.iter().position(|v| equals(v, f.arg(1)));
            if f.opt(2).is_some_and(to_bool) {
                Ok(position.map_or(Value::from(-1), Value::from))
            } else {
                Ok(Value::Bool(position.is_some()))
            }
        }
        "FLATTEN" => {
            f.arity(1, 2)?;
            let depth = f.opt(1).map_or(1.0, to_number);
            let mut out = Vec::new();
            flatten_into(&mut out, to_array(f.arg(0)), depth);
            Ok(Value::Array(out))
        }

        // objects
        "HAS" => {
            f.arity(2, 2)?;
            Ok(Value::Bool(matches!(
                f.arg(0),
                Value::Object(map) if map.contains_key(&to_text(f.arg(1)))
            )))
        }
        "ATTRIBUTES" => {
            f.arity(1, 3)?;
            let Value::Object(map) = f.arg(0) else {
                return Ok(Value::Null);
            };
            let remove_internal = f.opt(1).is_some_and(to_bool);
            let mut keys: Vec<Value> = map
                .keys()
                .filter(|k| !(remove_internal && k.starts_with('_')))
                .map(|k| Value::String(k.clone()))
                .collect();
            if f.opt(2).is_some_and(to_bool) {
                keys.sort_by(compare);
            }
            Ok(Value::Array(keys))
        }
        "VALUES" => {
            f.arity(1, 2)?;
            let Value::Object(map) = f.arg(0) else {
                return Ok(Value::Null);
            };
            let remove_internal = f.opt(1).is_some_and(to_bool);
            Ok(Value::Array(
                map.iter()
                    .filter(|(k, _)| !(remove_internal && k.starts_with('_')))
                    .map(|(_, v)| v.clone())
                    .collect(),
            ))
        }
        "MERGE" => {
            f.arity(1, usize::MAX)?;
            let mut merged = Map::new();
            for arg in args.iter().flat_map(to_array) {
                if let Value::Object(map) = arg {
                    merged.extend(map);
                }
            }
            Ok(Value::Object(merged))
        }
        "UNSET" => {
            f.arity(1, usize::MAX)?;
            let Value::Object(map) = f.arg(0) else {
                return Ok(Value::Null);
            };
            let remove: Vec<String> = args[1..]
                .iter()
                .flat_map(to_array)
                .map(|v| to_text(&v))
                .collect();
            Ok(Value::Object(
                map.iter()
                    .filter(|(k, _)| !remove.contains(k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ))
        }

        // types
        "TO_BOOL" => {
            f.arity(1, 1)?;
            Ok(Value::Bool(to_bool(f.arg(0))))
        }
        "TO_NUMBER" => {
            f.arity(1, 1)?;
            Ok(number(to_number(f.arg(0))))
        }
        "TO_STRING" => {
            f.arity(1, 1)?;
            Ok(Value::String(to_text(f.arg(0))))
        }
        "TO_ARRAY" => {
            f.arity(1, 1)?;
            Ok(match f.arg(0) {
                Value::Object(map) => Value::Array(map.values().cloned().collect()),
                other => Value::Array(to_array(other)),
            })
        }
        "TYPENAME" => {
            f.arity(1, 1)?;
            Ok(Value::String(type_name(f.arg(0)).to_owned()))
        }

        _ => Err(EvalError::UnknownFunction(upper)),
    }
}

struct Args<'a> {
    name: &'a str,
    args: &'a [Value],
}

impl Args<'_> {
    fn arity(&self, min: usize, max: usize) -> Result<(), EvalError> {
        let got = self.args.len();
        if (min..=max).contains(&got) {
            return Ok(());
        }
        let expected = match (min, max) {
            (0, 0) => "0",
            (1, 1) => "1",
            (2, 2) => "2",
            (1, 2) => "1 to 2",
            (1, 3) => "1 to 3",
            (2, 3) => "2 to 3",
            (_, usize::MAX) => "1 or more",
            _ => "a different number of",
        };
        Err(EvalError::Arity {
            function: self.name.to_owned(),
            expected,
            got,
        })
    }

    fn arg(&self, i: usize) -> &Value {
        self.args.get(i).unwrap_or(&Value::Null)
    }

    fn opt(&self, i: usize) -> Option<&Value> {
        self.args.get(i)
    }

    fn unary_math(&self, op: fn(f64) -> f64) -> Result<Value, EvalError> {
        self.arity(1, 1)?;
        Ok(number(op(to_number(self.arg(0)))))
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn length(value: &Value) -> Value {
    let len = match value {
        Value::Null => 0,
        Value::Bool(b) => usize::from(*b),
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        Value::Number(_) => to_text(value).chars().count(),
    };
    Value::from(len)
}

/// Map a possibly negative index onto `0..len`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub(crate) fn resolve_index(len: usize, index: f64) -> Option<usize> {
    let index = index.trunc();
    let len_f = len as f64;
    let resolved = if index < 0.0 { len_f + index } else { index };
    if resolved < 0.0 || resolved >= len_f {
        None
    } else {
        Some(resolved as usize)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn substring(text: &str, offset: f64, length: Option<f64>) -> Value {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len() as f64;
    let start = if offset < 0.0 { (len + offset).max(0.0) } else { offset.min(len) };
    let end = length.map_or(len, |l| (start + l.max(0.0)).min(len));
    let (start, end) = (start as usize, end as usize);
    Value::String(chars[start..end.max(start)].iter().collect())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn split(text: &str, separator: Option<String>, limit: Option<f64>) -> Value {
    let parts: Vec<String> = match separator.as_deref() {
        None => vec![text.to_owned()],
        Some("") => text.chars().map(String::from).collect(),
        Some(sep) => text.split(sep).map(str::to_owned).collect(),
    };
    let limit = limit.filter(|l| *l > 0.0).map_or(parts.len(), |l| l as usize);
    Value::Array(parts.into_iter().take(limit).map(Value::String).collect())
}

/// Numeric members of an array, skipping nulls.
fn numbers(value: &Value) -> Vec<f64> {
    to_array(value)
        .iter()
        .filter(|v| !v.is_null())
        .map(to_number)
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn average(values: &[f64]) -> Value {
    if values.is_empty() {
        return Value::Null;
    }
    number(values.iter().sum::<f64>() / values.len() as f64)
}

fn median(mut values: Vec<f64>) -> Value {
    if values.is_empty() {
        return Value::Null;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        number(f64::midpoint(values[mid - 1], values[mid]))
    } else {
        number(values[mid])
    }
}

/// Smallest (`Less`) or largest (`Greater`) non-null member.
fn extreme(value: &Value, want: Ordering) -> Value {
    to_array(value)
        .into_iter()
        .filter(|v| !v.is_null())
        .reduce(|best, v| if compare(&v, &best) == want { v } else { best })
        .unwrap_or(Value::Null)
}

/// Inclusive numeric range from `start` towards `stop`.
///
/// # Errors
///
/// Returns `EvalError::RangeTooLarge` when the range would exceed
/// [`MAX_RANGE_LEN`] elements.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn range(start: f64, stop: f64, step: f64) -> Result<Value, EvalError> {
    let step = if step == 0.0 { 1.0 } else { step.abs() };
    let span = (stop - start).abs();
    let count = (span / step).floor() + 1.0;
    if count > MAX_RANGE_LEN as f64 {
        return Err(EvalError::RangeTooLarge(count as usize));
    }
    let step = if stop < start { -step } else { step };
    Ok(Value::Array(
        (0..count as usize)
            .map(|i| number(start + step * i as f64))
            .collect(),
    ))
}

fn push_value(items: &mut Vec<Value>, value: Value, unique: bool) {
    if unique && items.iter().any(|v| equals(v, &value)) {
        return;
    }
    items.push(value);
}

fn unique(items: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        push_value(&mut out, item, true);
    }
    out
}

fn flatten_into(out: &mut Vec<Value>, items: Vec<Value>, depth: f64) {
    for item in items {
        match item {
            Value::Array(inner) if depth >= 1.0 => flatten_into(out, inner, depth - 1.0),
            other => out.push(other),
        }
    }
}

#[cfg(test)]
#[path = "functions_test.rs"]
mod functions_test;
