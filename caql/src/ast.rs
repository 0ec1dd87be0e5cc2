//! Syntax tree for CAQL expressions.
//!
//! Parenthesised groups are kept as `Expr::Paren` so that printing a parsed
//! query reproduces the grouping the author wrote.

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    /// Numeric literal. `raw` is the source spelling (`0x10`, `.5`).
    Number { value: f64, raw: String },
    String(String),
    Variable(String),
    Array(Vec<Expr>),
    Object(Vec<ObjectEntry>),
    Call { name: String, args: Vec<Expr> },
    Paren(Box<Expr>),
    Member { target: Box<Expr>, name: String },
    Index { target: Box<Expr>, index: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    /// `lhs ALL == rhs`, `lhs ANY IN rhs`, ...
    Quantified {
        quantifier: Quantifier,
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `cond ? then : otherwise`; `then` is `None` for `cond ? : otherwise`.
    Ternary {
        cond: Box<Expr>,
        then: Option<Box<Expr>>,
        otherwise: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectEntry {
    pub key: ObjectKey,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKey {
    /// `{name: value}`
    Name(String),
    /// `{'name': value}`, holding the unquoted name.
    Quoted(String),
    /// `{[expr]: value}`
    Computed(Box<Expr>),
    /// `{name}`, short for `{name: name}`.
    Shorthand(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Range,
    Lt,
    Gt,
    Le,
    Ge,
    In,
    NotIn,
    Eq,
    Ne,
    Like,
    NotLike,
    Matches,
    NotMatches,
    And,
    Or,
}

impl BinaryOp {
    /// Canonical spelling used when printing.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Range => "..",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::Matches => "=~",
            Self::NotMatches => "!~",
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    All,
    Any,
    None,
}

impl Quantifier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Any => "ANY",
            Self::None => "NONE",
        }
    }
}
