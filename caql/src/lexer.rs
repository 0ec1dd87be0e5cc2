//! Tokenizer for CAQL source text.
//!
//! DESIGN
//! ======
//! The lexer never fails. Characters that start no valid token become an
//! `Unexpected` token so the parser can report them with the same
//! `{symbol, line, column}` shape as every other syntax error. Whitespace and
//! comments are dropped here; the token stream always ends with `Eof`.
//!
//! Numbers follow the strict literal grammar: no leading zeros (`00`, `01`),
//! no trailing dot (`1.`), exponents only on floats.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Int,
    Float,
    /// Quoted string; `text` keeps the quotes.
    Str,
    Name,
    /// `@name` bind parameter.
    Param,
    Keyword(Keyword),
    Sym(Sym),
    Unexpected,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

// =============================================================================
// KEYWORDS
// =============================================================================

/// Reserved words. Matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Aggregate,
    All,
    And,
    Any,
    Asc,
    Collect,
    Count,
    Current,
    Desc,
    Distinct,
    False,
    Filter,
    For,
    Graph,
    In,
    Inbound,
    Insert,
    Into,
    Keep,
    KShortestPaths,
    Let,
    Like,
    Limit,
    New,
    None,
    Not,
    Null,
    Old,
    Options,
    Or,
    Outbound,
    Prune,
    Remove,
    Replace,
    Return,
    Search,
    ShortestPath,
    Sort,
    To,
    True,
    Update,
    Upsert,
    With,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("AGGREGATE", Keyword::Aggregate),
    ("ALL", Keyword::All),
    ("AND", Keyword::And),
    ("ANY", Keyword::Any),
    ("ASC", Keyword::Asc),
    ("COLLECT", Keyword::Collect),
    ("COUNT", Keyword::Count),
    ("CURRENT", Keyword::Current),
    ("DESC", Keyword::Desc),
    ("DISTINCT", Keyword::Distinct),
    ("FALSE", Keyword::False),
    ("FILTER", Keyword::Filter),
    ("FOR", Keyword::For),
    ("GRAPH", Keyword::Graph),
    ("IN", Keyword::In),
    ("INBOUND", Keyword::Inbound),
    ("INSERT", Keyword::Insert),
    ("INTO", Keyword::Into),
    ("KEEP", Keyword::Keep),
    ("K_SHORTEST_PATHS", Keyword::KShortestPaths),
    ("LET", Keyword::Let),
    ("LIKE", Keyword::Like),
    ("LIMIT", Keyword::Limit),
    ("NEW", Keyword::New),
    ("NONE", Keyword::None),
    ("NOT", Keyword::Not),
    ("NULL", Keyword::Null),
    ("OLD", Keyword::Old),
    ("OPTIONS", Keyword::Options),
    ("OR", Keyword::Or),
    ("OUTBOUND", Keyword::Outbound),
    ("PRUNE", Keyword::Prune),
    ("REMOVE", Keyword::Remove),
    ("REPLACE", Keyword::Replace),
    ("RETURN", Keyword::Return),
    ("SEARCH", Keyword::Search),
    ("SHORTEST_PATH", Keyword::ShortestPath),
    ("SORT", Keyword::Sort),
    ("TO", Keyword::To),
    ("TRUE", Keyword::True),
    ("UPDATE", Keyword::Update),
    ("UPSERT", Keyword::Upsert),
    ("WITH", Keyword::With),
];

impl Keyword {
    /// Look up a word, ignoring ASCII case.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(word))
            .map(|(_, kw)| *kw)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, kw)| *kw == self)
            .map_or("?", |(name, _)| *name)
    }
}

// =============================================================================
// SYMBOLS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sym {
    Dot,
    Range,
    Comma,
    Colon,
    Scope,
    Question,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Plus,
    Minus,
    Times,
    Div,
    Mod,
    Assign,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    RegexMatch,
    RegexNonMatch,
    AndAnd,
    OrOr,
    Bang,
}

impl Sym {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dot => ".",
            Self::Range => "..",
            Self::Comma => ",",
            Self::Colon => ":",
            Self::Scope => "::",
            Self::Question => "?",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Times => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Assign => "=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::RegexMatch => "=~",
            Self::RegexNonMatch => "!~",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Bang => "!",
        }
    }
}

/// Two-character symbols are tried before single characters.
const TWO_CHAR_SYMS: &[(&str, Sym)] = &[
    ("..", Sym::Range),
    ("::", Sym::Scope),
    ("==", Sym::Eq),
    ("!=", Sym::Ne),
    ("<=", Sym::Le),
    (">=", Sym::Ge),
    ("=~", Sym::RegexMatch),
    ("!~", Sym::RegexNonMatch),
    ("&&", Sym::AndAnd),
    ("||", Sym::OrOr),
];

fn single_char_sym(c: char) -> Option<Sym> {
    Some(match c {
        '.' => Sym::Dot,
        ',' => Sym::Comma,
        ':' => Sym::Colon,
        '?' => Sym::Question,
        '(' => Sym::LParen,
        ')' => Sym::RParen,
        '{' => Sym::LBrace,
        '}' => Sym::RBrace,
        '[' => Sym::LBracket,
        ']' => Sym::RBracket,
        '+' => Sym::Plus,
        '-' => Sym::Minus,
        '*' => Sym::Times,
        '/' => Sym::Div,
        '%' => Sym::Mod,
        '=' => Sym::Assign,
        '<' => Sym::Lt,
        '>' => Sym::Gt,
        '!' => Sym::Bang,
        _ => return None,
    })
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => f.write_str("<int>"),
            Self::Float => f.write_str("<float>"),
            Self::Str => f.write_str("<string>"),
            Self::Name => f.write_str("<identifier>"),
            Self::Param => f.write_str("<parameter>"),
            Self::Keyword(kw) => f.write_str(kw.as_str()),
            Self::Sym(sym) => write!(f, "'{}'", sym.as_str()),
            Self::Unexpected => f.write_str("<unexpected>"),
            Self::Eof => f.write_str("<EOF>"),
        }
    }
}

// =============================================================================
// SCANNER
// =============================================================================

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

/// Split `input` into tokens, ending with a single `Eof` token.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut scanner = Scanner {
        chars: input.chars().collect(),
        pos: 0,
        line: 1,
        column: 0,
        tokens: Vec::new(),
    };
    scanner.run();
    scanner.tokens
}

impl Scanner {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn run(&mut self) {
        loop {
            self.skip_trivia();
            let (line, column, start) = (self.line, self.column, self.pos);
            let Some(c) = self.peek(0) else {
                self.tokens.push(Token {
                    kind: TokenKind::Eof,
                    text: "<EOF>".to_owned(),
                    line,
                    column,
                });
                return;
            };

            let kind = self.scan(c);
            let text: String = self.chars[start..self.pos].iter().collect();
            self.tokens.push(Token {
                kind,
                text,
                line,
                column,
            });
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match (self.peek(0), self.peek(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek(0) {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    self.bump();
                    self.bump();
                    while self.peek(0).is_some() {
                        if self.peek(0) == Some('*') && self.peek(1) == Some('/') {
                            self.bump();
                            self.bump();
                            break;
                        }
                        self.bump();
                    }
                }
                _ => return,
            }
        }
    }

    fn scan(&mut self, c: char) -> TokenKind {
        if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|n| n.is_ascii_digit())) {
            return self.scan_number();
        }
        if c.is_ascii_alphabetic() || c == '_' {
            return self.scan_word();
        }
        if c == '@' && self.peek(1).is_some_and(|n| n.is_ascii_alphabetic() || n == '_') {
            self.bump();
            self.scan_word();
            return TokenKind::Param;
        }
        if matches!(c, '\'' | '"' | '`') {
            if let Some(kind) = self.scan_string(c) {
                return kind;
            }
        }

        let pair: String = [Some(c), self.peek(1)].iter().flatten().collect();
        if let Some((_, sym)) = TWO_CHAR_SYMS.iter().find(|(text, _)| *text == pair) {
            self.bump();
            self.bump();
            return TokenKind::Sym(*sym);
        }
        self.bump();
        single_char_sym(c).map_or(TokenKind::Unexpected, TokenKind::Sym)
    }

    fn scan_digits(&mut self, radix: u32) -> usize {
        let mut count = 0;
        while self.peek(0).is_some_and(|d| d.is_digit(radix)) {
            self.bump();
            count += 1;
        }
        count
    }

    fn scan_number(&mut self) -> TokenKind {
        if self.peek(0) == Some('0') {
            let radix = match self.peek(1) {
                Some('x' | 'X') => Some(16),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                if self.peek(2).is_some_and(|d| d.is_digit(radix)) {
                    self.bump();
                    self.bump();
                    self.scan_digits(radix);
                    return TokenKind::Int;
                }
            }
        }

        // Integer part: a lone `0`, or digits without a leading zero.
        match self.peek(0) {
            Some('0') => {
                self.bump();
            }
            Some(d) if d.is_ascii_digit() => {
                self.scan_digits(10);
            }
            _ => {}
        }

        let has_fraction =
            self.peek(0) == Some('.') && self.peek(1).is_some_and(|d| d.is_ascii_digit());
        if !has_fraction {
            return TokenKind::Int;
        }
        self.bump();
        self.scan_digits(10);

        if matches!(self.peek(0), Some('e' | 'E')) {
            let sign = usize::from(matches!(self.peek(1), Some('+' | '-')));
            if self.peek(1 + sign).is_some_and(|d| d.is_ascii_digit()) {
                for _ in 0..=sign {
                    self.bump();
                }
                self.scan_digits(10);
            }
        }
        TokenKind::Float
    }

    fn scan_word(&mut self) -> TokenKind {
        let start = self.pos;
        while self
            .peek(0)
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        Keyword::from_word(&word).map_or(TokenKind::Name, TokenKind::Keyword)
    }

    /// Scan a quoted string. Returns `None` (consuming nothing) when the
    /// string is unterminated.
    fn scan_string(&mut self, quote: char) -> Option<TokenKind> {
        let mut offset = 1;
        loop {
            match self.peek(offset)? {
                '\\' => offset += 2,
                c if c == quote => break,
                _ => offset += 1,
            }
        }
        for _ in 0..=offset {
            self.bump();
        }
        Some(TokenKind::Str)
    }
}

#[cfg(test)]
#[path = "lexer_test.rs"]
mod lexer_test;
