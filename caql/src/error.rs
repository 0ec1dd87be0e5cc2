//! Error types for parsing and evaluating CAQL.
//!
//! `SyntaxError` is also the validator's result shape: it serializes to the
//! `{symbol, line, column, message, payload}` object that query editors use
//! to underline the offending token.

use serde::{Deserialize, Serialize};

/// A syntax error at a single token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("line {line}:{column} {message}")]
pub struct SyntaxError {
    /// Text of the offending token, `<EOF>` at end of input.
    pub symbol: String,
    /// 1-based line of the offending token.
    pub line: usize,
    /// 0-based column (in characters) of the offending token.
    pub column: usize,
    pub message: String,
    /// Tokens the parser would have accepted instead.
    pub payload: Vec<String>,
}

/// Errors raised while evaluating a parsed query against a document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error("variable `{0}` is not defined")]
    UndefinedVariable(String),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("{function}() expects {expected} argument(s), got {got}")]
    Arity {
        function: String,
        expected: &'static str,
        got: usize,
    },
    #[error("invalid regular expression `{pattern}`: {message}")]
    InvalidRegex { pattern: String, message: String },
    #[error("range of {0} elements exceeds the limit")]
    RangeTooLarge(usize),
}
