//! CAQL: the ticket query language.
//!
//! SYSTEM CONTEXT
//! ==============
//! Ticket searches carry a CAQL filter such as
//! `status == "open" AND owner IN ["alice", "bob"]`. Clients validate the
//! filter before sending it so typing mistakes surface as a positioned
//! syntax error instead of a failed request; the same tree can be printed
//! back in canonical form or evaluated locally against a ticket.
//!
//! ```
//! let query = caql::parse("name LIKE 'inc%' && open")?;
//! assert_eq!(query.to_string(), "name LIKE \"inc%\" AND open");
//!
//! let ticket = serde_json::json!({"name": "incident-1", "open": true});
//! assert_eq!(query.eval_value(&ticket)?, serde_json::json!(true));
//!
//! let err = caql::validate("name, title");
//! assert!(matches!(err, Some(e) if e.line == 1 && e.column == 4 && e.symbol == ","));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod ast;
pub mod error;
mod eval;
pub mod functions;
pub mod lexer;
mod like;
mod parser;
mod render;
mod unquote;
pub mod value;

use std::fmt;

use serde_json::{Map, Value};

pub use ast::Expr;
pub use error::{EvalError, SyntaxError};
pub use like::like;
pub use parser::MAX_DEPTH;

/// A successfully parsed query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    expr: Expr,
}

impl Query {
    #[must_use]
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate against a map of variables.
    ///
    /// # Errors
    ///
    /// Returns an `EvalError` for undefined variables, unknown functions,
    /// invalid regular expressions and oversize ranges.
    pub fn eval(&self, vars: &Map<String, Value>) -> Result<Value, EvalError> {
        eval::Evaluator::new(vars).eval(&self.expr)
    }

    /// Evaluate against a JSON document. Non-object documents provide no
    /// variables.
    ///
    /// # Errors
    ///
    /// See [`Query::eval`].
    pub fn eval_value(&self, doc: &Value) -> Result<Value, EvalError> {
        match doc {
            Value::Object(vars) => self.eval(vars),
            _ => self.eval(&Map::new()),
        }
    }

    /// Evaluate and coerce the result to a boolean, as a filter does.
    ///
    /// # Errors
    ///
    /// See [`Query::eval`].
    pub fn matches(&self, doc: &Value) -> Result<bool, EvalError> {
        self.eval_value(doc).map(|v| value::to_bool(&v))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.expr.fmt(f)
    }
}

impl std::str::FromStr for Query {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parse a query.
///
/// # Errors
///
/// Returns the first `SyntaxError` in `input`.
pub fn parse(input: &str) -> Result<Query, SyntaxError> {
    parser::parse_expression(input).map(|expr| Query { expr })
}

/// Check a query for syntax errors. `None` means the query is valid.
#[must_use]
pub fn validate(input: &str) -> Option<SyntaxError> {
    parse(input).err()
}
