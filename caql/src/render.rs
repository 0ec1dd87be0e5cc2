//! Canonical printing of parsed expressions.
//!
//! Printing normalises spelling (`&&` becomes `AND`, strings and quoted
//! object keys are double-quoted, function names upper-cased, unary `+` is dropped) but keeps
//! the author's parentheses, so the printed text parses back to the same tree.

use std::fmt::{self, Display, Formatter, Write};

use crate::ast::{BinaryOp, Expr, ObjectEntry, ObjectKey, UnaryOp};

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number { raw, .. } => f.write_str(raw),
            Self::String(s) => write_quoted(f, s),
            Self::Variable(name) => f.write_str(name),
            Self::Array(items) => {
                f.write_char('[')?;
                write_joined(f, items)?;
                f.write_char(']')
            }
            Self::Object(entries) => {
                f.write_char('{')?;
                write_joined(f, entries)?;
                f.write_char('}')
            }
            Self::Call { name, args } => {
                write!(f, "{}(", name.to_ascii_uppercase())?;
                write_joined(f, args)?;
                f.write_char(')')
            }
            Self::Paren(inner) => write!(f, "({inner})"),
            Self::Member { target, name } => write!(f, "{target}.{name}"),
            Self::Index { target, index } => write!(f, "{target}[{index}]"),
            Self::Unary { op, operand } => match op {
                UnaryOp::Plus => write!(f, "{operand}"),
                UnaryOp::Minus => write!(f, "-{operand}"),
                UnaryOp::Not => write!(f, "NOT {operand}"),
            },
            Self::Binary { op, lhs, rhs } => {
                if *op == BinaryOp::Range {
                    write!(f, "{lhs}..{rhs}")
                } else {
                    write!(f, "{lhs} {} {rhs}", op.as_str())
                }
            }
            Self::Quantified {
                quantifier,
                op,
                lhs,
                rhs,
            } => write!(f, "{lhs} {} {} {rhs}", quantifier.as_str(), op.as_str()),
            Self::Ternary {
                cond,
                then: Some(then),
                otherwise,
            } => write!(f, "{cond} ? {then} : {otherwise}"),
            Self::Ternary {
                cond,
                then: None,
                otherwise,
            } => write!(f, "{cond} ? : {otherwise}"),
        }
    }
}

impl Display for ObjectEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.key {
            ObjectKey::Name(name) => write!(f, "{name}: {}", self.value),
            ObjectKey::Quoted(name) => {
                write_quoted(f, name)?;
                write!(f, ": {}", self.value)
            }
            ObjectKey::Computed(key) => write!(f, "[{key}]: {}", self.value),
            ObjectKey::Shorthand(name) => f.write_str(name),
        }
    }
}

fn write_joined<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_quoted(f: &mut Formatter<'_>, s: &str) -> fmt::Result {
    match serde_json::to_string(s) {
        Ok(quoted) => f.write_str(&quoted),
        Err(_) => Err(fmt::Error),
    }
}
