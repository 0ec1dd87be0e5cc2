//! Precedence-climbing parser for CAQL expressions.
//!
//! DESIGN
//! ======
//! A query is a single expression followed by end of input. Binary operators
//! are grouped into levels (higher binds tighter) and are all
//! left-associative:
//!
//! ```text
//! 13  * / %              8  == !=                      3  OR ||
//! 12  + -                7  ALL|ANY|NONE <cmp>|IN      2  a ? b : c
//! 11  ..                 6  ALL|ANY|NONE NOT IN        1  a ? : c
//! 10  < > <= >=          5  [NOT] LIKE =~ !~
//!  9  [NOT] IN           4  AND &&
//! ```
//!
//! Unary `+`/`-` bind tighter than any binary operator. `NOT`/`!` takes an
//! operand down to level 5, so `NOT a LIKE b` negates the whole match while
//! `NOT a AND b` negates only `a`.
//!
//! Nesting is bounded by [`MAX_DEPTH`]. Every nested sub-expression and
//! every operator or accessor folded onto a chain spends one level, so the
//! depth of the resulting tree stays under the same bound and evaluating or
//! printing it cannot exhaust the stack.
//!
//! ERROR HANDLING
//! ==============
//! The first unexpected token aborts the parse with a `SyntaxError` naming
//! the token, its position and the tokens that would have been accepted.
//! Input nested past the budget fails the same way at the token where the
//! budget ran out.

use crate::ast::{BinaryOp, Expr, ObjectEntry, ObjectKey, Quantifier, UnaryOp};
use crate::error::SyntaxError;
use crate::lexer::{Keyword, Sym, Token, TokenKind, tokenize};
use crate::unquote::unquote;

const LEVEL_ELVIS: u8 = 1;
const LEVEL_TERNARY: u8 = 2;
const LEVEL_OR: u8 = 3;
const LEVEL_AND: u8 = 4;
const LEVEL_LIKE: u8 = 5;
const LEVEL_QUANTIFIED_NOT_IN: u8 = 6;
const LEVEL_QUANTIFIED: u8 = 7;
const LEVEL_EQUALITY: u8 = 8;
const LEVEL_IN: u8 = 9;
const LEVEL_RELATIONAL: u8 = 10;
const LEVEL_RANGE: u8 = 11;
const LEVEL_ADDITIVE: u8 = 12;
const LEVEL_MULTIPLICATIVE: u8 = 13;
const LEVEL_UNARY: u8 = 14;

/// Deepest expression tree a query may produce.
pub const MAX_DEPTH: usize = 128;

/// Tokens that can start an expression, reported when one is missing.
const EXPRESSION_START: &[&str] = &[
    "'+'",
    "'-'",
    "NOT",
    "'('",
    "'['",
    "'{'",
    "NULL",
    "TRUE",
    "FALSE",
    "<identifier>",
    "<int>",
    "<float>",
    "<string>",
];

/// Parse `input` into an expression tree.
///
/// # Errors
///
/// Returns the first syntax error found.
pub fn parse_expression(input: &str) -> Result<Expr, SyntaxError> {
    let mut parser = Parser {
        tokens: tokenize(input),
        pos: 0,
        depth: 0,
    };
    let expr = parser.expression(0)?;
    let trailing = parser.peek(0);
    if trailing.kind != TokenKind::Eof {
        return Err(parser.error_at(
            trailing,
            format!("extraneous input '{}' expecting <EOF>", trailing.text),
            &["<EOF>"],
        ));
    }
    Ok(expr)
}

/// An infix operator recognised at the current position.
#[derive(Debug, Clone, Copy)]
enum Infix {
    Binary(BinaryOp),
    Quantified(Quantifier, BinaryOp),
    Ternary,
    Elvis,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self, offset: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn kind(&self, offset: usize) -> TokenKind {
        self.peek(offset).kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek(0).clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat_sym(&mut self, sym: Sym) -> bool {
        if self.kind(0) == TokenKind::Sym(sym) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_sym(&mut self, sym: Sym) -> Result<(), SyntaxError> {
        if self.eat_sym(sym) {
            return Ok(());
        }
        let expected = format!("'{}'", sym.as_str());
        Err(self.mismatched(&[expected.as_str()]))
    }

    fn error_at(&self, token: &Token, message: String, expected: &[&str]) -> SyntaxError {
        SyntaxError {
            symbol: token.text.clone(),
            line: token.line,
            column: token.column,
            message,
            payload: expected.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    /// Spend one level of the nesting budget. Callers restore `depth` once
    /// the sub-tree is complete.
    fn descend(&mut self) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            let token = self.peek(0);
            return Err(self.error_at(
                token,
                format!("expression nested deeper than {MAX_DEPTH} levels at '{}'", token.text),
                &[],
            ));
        }
        Ok(())
    }

    fn mismatched(&self, expected: &[&str]) -> SyntaxError {
        let token = self.peek(0);
        let message = if token.kind == TokenKind::Unexpected {
            format!("token recognition error at: '{}'", token.text)
        } else {
            let wanted = match expected {
                [single] => (*single).to_owned(),
                many => format!("{{{}}}", many.join(", ")),
            };
            format!("mismatched input '{}' expecting {wanted}", token.text)
        };
        self.error_at(token, message, expected)
    }

    // =========================================================================
    // BINARY OPERATORS
    // =========================================================================

    fn expression(&mut self, min_level: u8) -> Result<Expr, SyntaxError> {
        let entry = self.depth;
        self.descend()?;
        let mut lhs = self.prefix()?;

        while let Some((level, infix, width)) = self.infix() {
            if level < min_level {
                break;
            }
            self.descend()?;
            self.pos += width;

            lhs = match infix {
                Infix::Binary(op) => {
                    let rhs = self.expression(level + 1)?;
                    Expr::Binary {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    }
                }
                Infix::Quantified(quantifier, op) => {
                    let rhs = self.expression(level + 1)?;
                    Expr::Quantified {
                        quantifier,
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    }
                }
                Infix::Ternary => {
                    let then = self.expression(0)?;
                    self.expect_sym(Sym::Colon)?;
                    let otherwise = self.expression(level + 1)?;
                    Expr::Ternary {
                        cond: Box::new(lhs),
                        then: Some(Box::new(then)),
                        otherwise: Box::new(otherwise),
                    }
                }
                Infix::Elvis => {
                    let otherwise = self.expression(level + 1)?;
                    Expr::Ternary {
                        cond: Box::new(lhs),
                        then: None,
                        otherwise: Box::new(otherwise),
                    }
                }
            };
        }

        self.depth = entry;
        Ok(lhs)
    }

    /// Recognise the infix operator at the cursor without consuming it.
    /// Returns its level, kind and width in tokens.
    fn infix(&self) -> Option<(u8, Infix, usize)> {
        let binary = |level, op| Some((level, Infix::Binary(op), 1));
        match self.kind(0) {
            TokenKind::Sym(sym) => match sym {
                Sym::Times => binary(LEVEL_MULTIPLICATIVE, BinaryOp::Mul),
                Sym::Div => binary(LEVEL_MULTIPLICATIVE, BinaryOp::Div),
                Sym::Mod => binary(LEVEL_MULTIPLICATIVE, BinaryOp::Mod),
                Sym::Plus => binary(LEVEL_ADDITIVE, BinaryOp::Add),
                Sym::Minus => binary(LEVEL_ADDITIVE, BinaryOp::Sub),
                Sym::Range => binary(LEVEL_RANGE, BinaryOp::Range),
                Sym::Lt => binary(LEVEL_RELATIONAL, BinaryOp::Lt),
                Sym::Gt => binary(LEVEL_RELATIONAL, BinaryOp::Gt),
                Sym::Le => binary(LEVEL_RELATIONAL, BinaryOp::Le),
                Sym::Ge => binary(LEVEL_RELATIONAL, BinaryOp::Ge),
                Sym::Eq => binary(LEVEL_EQUALITY, BinaryOp::Eq),
                Sym::Ne => binary(LEVEL_EQUALITY, BinaryOp::Ne),
                Sym::RegexMatch => binary(LEVEL_LIKE, BinaryOp::Matches),
                Sym::RegexNonMatch => binary(LEVEL_LIKE, BinaryOp::NotMatches),
                Sym::AndAnd => binary(LEVEL_AND, BinaryOp::And),
                Sym::OrOr => binary(LEVEL_OR, BinaryOp::Or),
                Sym::Question => {
                    if self.kind(1) == TokenKind::Sym(Sym::Colon) {
                        Some((LEVEL_ELVIS, Infix::Elvis, 2))
                    } else {
                        Some((LEVEL_TERNARY, Infix::Ternary, 1))
                    }
                }
                _ => None,
            },
            TokenKind::Keyword(kw) => match kw {
                Keyword::In => binary(LEVEL_IN, BinaryOp::In),
                Keyword::Like => binary(LEVEL_LIKE, BinaryOp::Like),
                Keyword::And => binary(LEVEL_AND, BinaryOp::And),
                Keyword::Or => binary(LEVEL_OR, BinaryOp::Or),
                Keyword::Not => match self.kind(1) {
                    TokenKind::Keyword(Keyword::In) => Some((LEVEL_IN, Infix::Binary(BinaryOp::NotIn), 2)),
                    TokenKind::Keyword(Keyword::Like) => {
                        Some((LEVEL_LIKE, Infix::Binary(BinaryOp::NotLike), 2))
                    }
                    TokenKind::Sym(Sym::RegexMatch) => {
                        Some((LEVEL_LIKE, Infix::Binary(BinaryOp::NotMatches), 2))
                    }
                    TokenKind::Sym(Sym::RegexNonMatch) => {
                        Some((LEVEL_LIKE, Infix::Binary(BinaryOp::Matches), 2))
                    }
                    _ => None,
                },
                Keyword::All | Keyword::Any | Keyword::None => self.quantified(kw),
                _ => None,
            },
            _ => None,
        }
    }

    fn quantified(&self, kw: Keyword) -> Option<(u8, Infix, usize)> {
        let quantifier = match kw {
            Keyword::All => Quantifier::All,
            Keyword::Any => Quantifier::Any,
            _ => Quantifier::None,
        };
        let op = match self.kind(1) {
            TokenKind::Sym(Sym::Eq) => BinaryOp::Eq,
            TokenKind::Sym(Sym::Ne) => BinaryOp::Ne,
            TokenKind::Sym(Sym::Lt) => BinaryOp::Lt,
            TokenKind::Sym(Sym::Gt) => BinaryOp::Gt,
            TokenKind::Sym(Sym::Le) => BinaryOp::Le,
            TokenKind::Sym(Sym::Ge) => BinaryOp::Ge,
            TokenKind::Keyword(Keyword::In) => BinaryOp::In,
            TokenKind::Keyword(Keyword::Not)
                if self.kind(2) == TokenKind::Keyword(Keyword::In) =>
            {
                return Some((
                    LEVEL_QUANTIFIED_NOT_IN,
                    Infix::Quantified(quantifier, BinaryOp::NotIn),
                    3,
                ));
            }
            _ => return None,
        };
        Some((LEVEL_QUANTIFIED, Infix::Quantified(quantifier, op), 2))
    }

    // =========================================================================
    // PREFIX AND PRIMARY
    // =========================================================================

    fn prefix(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.kind(0) {
            TokenKind::Sym(Sym::Plus) => UnaryOp::Plus,
            TokenKind::Sym(Sym::Minus) => UnaryOp::Minus,
            TokenKind::Sym(Sym::Bang) | TokenKind::Keyword(Keyword::Not) => UnaryOp::Not,
            _ => return self.postfix(),
        };
        self.pos += 1;
        let level = if op == UnaryOp::Not {
            LEVEL_LIKE
        } else {
            LEVEL_UNARY
        };
        let operand = self.expression(level)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    /// A primary followed by any number of `.name` / `[index]` accessors.
    /// Each accessor deepens the tree; the enclosing `expression` restores
    /// the budget.
    fn postfix(&mut self) -> Result<Expr, SyntaxError> {
        let (mut expr, is_reference) = self.primary()?;
        if !is_reference {
            return Ok(expr);
        }
        loop {
            if matches!(self.kind(0), TokenKind::Sym(Sym::Dot | Sym::LBracket)) {
                self.descend()?;
            }
            if self.eat_sym(Sym::Dot) {
                if self.kind(0) != TokenKind::Name {
                    return Err(self.mismatched(&["<identifier>"]));
                }
                let name = self.advance().text;
                expr = Expr::Member {
                    target: Box::new(expr),
                    name,
                };
            } else if self.eat_sym(Sym::LBracket) {
                let index = self.expression(0)?;
                self.expect_sym(Sym::RBracket)?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Parse a primary. The flag reports whether accessors may follow it;
    /// literals cannot be dereferenced.
    fn primary(&mut self) -> Result<(Expr, bool), SyntaxError> {
        let token = self.peek(0).clone();
        let literal = match token.kind {
            TokenKind::Int => Some(Expr::Number {
                value: parse_int(&token.text),
                raw: token.text.clone(),
            }),
            TokenKind::Float => Some(Expr::Number {
                value: parse_float(&token.text),
                raw: token.text.clone(),
            }),
            TokenKind::Str => Some(Expr::String(unquote(&token.text))),
            TokenKind::Keyword(Keyword::Null) => Some(Expr::Null),
            TokenKind::Keyword(Keyword::True) => Some(Expr::Bool(true)),
            TokenKind::Keyword(Keyword::False) => Some(Expr::Bool(false)),
            _ => None,
        };
        if let Some(literal) = literal {
            self.pos += 1;
            return Ok((literal, false));
        }

        let expr = match token.kind {
            TokenKind::Name => {
                self.pos += 1;
                if self.eat_sym(Sym::LParen) {
                    let args = self.list(Sym::RParen, Self::call_argument)?;
                    Expr::Call {
                        name: token.text,
                        args,
                    }
                } else {
                    Expr::Variable(token.text)
                }
            }
            TokenKind::Sym(Sym::LParen) => {
                self.pos += 1;
                let inner = self.expression(0)?;
                self.expect_sym(Sym::RParen)?;
                Expr::Paren(Box::new(inner))
            }
            TokenKind::Sym(Sym::LBracket) => {
                self.pos += 1;
                Expr::Array(self.list(Sym::RBracket, Self::call_argument)?)
            }
            TokenKind::Sym(Sym::LBrace) => {
                self.pos += 1;
                Expr::Object(self.list(Sym::RBrace, Self::object_entry)?)
            }
            _ => return Err(self.mismatched(EXPRESSION_START)),
        };
        Ok((expr, true))
    }

    fn call_argument(&mut self) -> Result<Expr, SyntaxError> {
        self.expression(0)
    }

    /// Comma-separated items up to `close`, allowing one trailing comma.
    fn list<T>(
        &mut self,
        close: Sym,
        mut item: impl FnMut(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<Vec<T>, SyntaxError> {
        let mut items = Vec::new();
        loop {
            if self.eat_sym(close) {
                return Ok(items);
            }
            items.push(item(self)?);
            if self.eat_sym(Sym::Comma) {
                continue;
            }
            self.expect_sym(close)?;
            return Ok(items);
        }
    }

    fn object_entry(&mut self) -> Result<ObjectEntry, SyntaxError> {
        let token = self.peek(0).clone();
        let key = match token.kind {
            TokenKind::Name => {
                self.pos += 1;
                if !self.eat_sym(Sym::Colon) {
                    return Ok(ObjectEntry {
                        key: ObjectKey::Shorthand(token.text.clone()),
                        value: Expr::Variable(token.text),
                    });
                }
                ObjectKey::Name(token.text)
            }
            TokenKind::Str => {
                self.pos += 1;
                self.expect_sym(Sym::Colon)?;
                ObjectKey::Quoted(unquote(&token.text))
            }
            TokenKind::Sym(Sym::LBracket) => {
                self.pos += 1;
                let computed = self.expression(0)?;
                self.expect_sym(Sym::RBracket)?;
                self.expect_sym(Sym::Colon)?;
                ObjectKey::Computed(Box::new(computed))
            }
            _ => return Err(self.mismatched(&["<identifier>", "<string>", "'['", "'}'"])),
        };
        let value = self.expression(0)?;
        Ok(ObjectEntry { key, value })
    }
}

// =============================================================================
// NUMERIC LITERALS
// =============================================================================

#[allow(clippy::cast_precision_loss)]
fn parse_int(text: &str) -> f64 {
    let (digits, radix) = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        (bin, 2)
    } else {
        (text, 10)
    };
    match u64::from_str_radix(digits, radix) {
        Ok(value) => value as f64,
        Err(_) if radix == 10 => parse_float(digits),
        Err(_) => digits
            .chars()
            .filter_map(|c| c.to_digit(radix))
            .fold(0.0, |acc, digit| acc * f64::from(radix) + f64::from(digit)),
    }
}

fn parse_float(text: &str) -> f64 {
    text.parse::<f64>().unwrap_or(0.0)
}

#[cfg(test)]
#[path = "parser_test.rs"]
mod parser_test;
