//! Tree-walking evaluator.
//!
//! Variables resolve against the top-level members of a JSON object (a
//! ticket, for example). Evaluation never panics: type mismatches coerce,
//! and only undefined variables, unknown functions, bad regexes and oversize
//! ranges are errors.

use regex::Regex;
use serde_json::{Map, Value};

use crate::ast::{BinaryOp, Expr, ObjectKey, Quantifier, UnaryOp};
use crate::error::EvalError;
use crate::functions::{self, resolve_index};
use crate::like::like;
use crate::value::{self, compare, contains, equals, number, to_bool, to_number, to_text};

pub(crate) struct Evaluator<'a> {
    vars: &'a Map<String, Value>,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(vars: &'a Map<String, Value>) -> Self {
        Self { vars }
    }

    pub(crate) fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Number { value, .. } => Ok(number(*value)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Variable(name) => self
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
            Expr::Array(items) => Ok(Value::Array(
                items.iter().map(|e| self.eval(e)).collect::<Result<_, _>>()?,
            )),
            Expr::Object(entries) => {
                let mut map = Map::new();
                for entry in entries {
                    let key = match &entry.key {
                        ObjectKey::Name(name) | ObjectKey::Shorthand(name) | ObjectKey::Quoted(name) => {
                            name.clone()
                        }
                        ObjectKey::Computed(key) => to_text(&self.eval(key)?),
                    };
                    map.insert(key, self.eval(&entry.value)?);
                }
                Ok(Value::Object(map))
            }
            Expr::Call { name, args } => {
                let args = args
                    .iter()
                    .map(|e| self.eval(e))
                    .collect::<Result<Vec<_>, _>>()?;
                functions::call(name, &args)
            }
            Expr::Paren(inner) => self.eval(inner),
            Expr::Member { target, name } => Ok(match self.eval(target)? {
                Value::Object(mut map) => map.remove(name).unwrap_or(Value::Null),
                _ => Value::Null,
            }),
            Expr::Index { target, index } => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                Ok(index_value(target, &index))
            }
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Plus => number(to_number(&operand)),
                    UnaryOp::Minus => number(-to_number(&operand)),
                    UnaryOp::Not => Value::Bool(!to_bool(&operand)),
                })
            }
            Expr::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs),
            Expr::Quantified {
                quantifier,
                op,
                lhs,
                rhs,
            } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                quantified(*quantifier, *op, &lhs, &rhs)
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.eval(cond)?;
                if !to_bool(&cond) {
                    return self.eval(otherwise);
                }
                match then {
                    Some(then) => self.eval(then),
                    None => Ok(cond),
                }
            }
        }
    }

    fn binary(&self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<Value, EvalError> {
        let lhs = self.eval(lhs)?;
        // AND/OR return one of their operands and skip the right side when
        // the left decides the result.
        match op {
            BinaryOp::And if !to_bool(&lhs) => return Ok(lhs),
            BinaryOp::Or if to_bool(&lhs) => return Ok(lhs),
            BinaryOp::And | BinaryOp::Or => return self.eval(rhs),
            _ => {}
        }
        let rhs = self.eval(rhs)?;
        apply(op, &lhs, &rhs)
    }
}

/// Apply a non-short-circuit binary operator to evaluated operands.
fn apply(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let ord = || compare(lhs, rhs);
    Ok(match op {
        BinaryOp::Add => value::add(lhs, rhs),
        BinaryOp::Sub => value::sub(lhs, rhs),
        BinaryOp::Mul => value::mul(lhs, rhs),
        BinaryOp::Div => value::div(lhs, rhs),
        BinaryOp::Mod => value::rem(lhs, rhs),
        BinaryOp::Range => functions::range(to_number(lhs), to_number(rhs), 1.0)?,
        BinaryOp::Lt => Value::Bool(ord().is_lt()),
        BinaryOp::Gt => Value::Bool(ord().is_gt()),
        BinaryOp::Le => Value::Bool(ord().is_le()),
        BinaryOp::Ge => Value::Bool(ord().is_ge()),
        BinaryOp::Eq => Value::Bool(equals(lhs, rhs)),
        BinaryOp::Ne => Value::Bool(!equals(lhs, rhs)),
        BinaryOp::In => Value::Bool(contains(lhs, rhs)),
        BinaryOp::NotIn => Value::Bool(!contains(lhs, rhs)),
        BinaryOp::Like => Value::Bool(like(&to_text(lhs), &to_text(rhs))),
        BinaryOp::NotLike => Value::Bool(!like(&to_text(lhs), &to_text(rhs))),
        BinaryOp::Matches => Value::Bool(regex_match(lhs, rhs)?),
        BinaryOp::NotMatches => Value::Bool(!regex_match(lhs, rhs)?),
        BinaryOp::And => {
            if to_bool(lhs) {
                rhs.clone()
            } else {
                lhs.clone()
            }
        }
        BinaryOp::Or => {
            if to_bool(lhs) {
                lhs.clone()
            } else {
                rhs.clone()
            }
        }
    })
}

/// `lhs ALL|ANY|NONE op rhs`: apply `op` to each member of the `lhs` array.
fn quantified(
    quantifier: Quantifier,
    op: BinaryOp,
    lhs: &Value,
    rhs: &Value,
) -> Result<Value, EvalError> {
    let Value::Array(items) = lhs else {
        return Ok(Value::Bool(false));
    };
    let mut matched = 0;
    for item in items {
        if to_bool(&apply(op, item, rhs)?) {
            matched += 1;
        }
    }
    Ok(Value::Bool(match quantifier {
        Quantifier::All => matched == items.len(),
        Quantifier::Any => matched > 0,
        Quantifier::None => matched == 0,
    }))
}

fn index_value(target: Value, index: &Value) -> Value {
    match (target, index) {
        (Value::Array(mut items), Value::Number(_)) => resolve_index(items.len(), to_number(index))
            .map_or(Value::Null, |i| items.swap_remove(i)),
        (Value::Object(mut map), _) => map.remove(&to_text(index)).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn regex_match(text: &Value, pattern: &Value) -> Result<bool, EvalError> {
    let pattern = to_text(pattern);
    let regex = Regex::new(&pattern).map_err(|e| EvalError::InvalidRegex {
        message: e.to_string(),
        pattern: pattern.clone(),
    })?;
    Ok(regex.is_match(&to_text(text)))
}

#[cfg(test)]
#[path = "eval_test.rs"]
mod eval_test;
