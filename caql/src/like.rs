//! `LIKE` wildcard matching.
//!
//! `%` matches any run of characters, `_` exactly one, and a backslash makes
//! the next character literal. Matching is case-sensitive and anchored at
//! both ends.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece {
    Any,
    One,
    Lit(char),
}

fn compile(pattern: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        pieces.push(match c {
            '%' => Piece::Any,
            '_' => Piece::One,
            '\\' => Piece::Lit(chars.next().unwrap_or('\\')),
            other => Piece::Lit(other),
        });
    }
    pieces
}

/// Match `text` against a LIKE `pattern`.
#[must_use]
pub fn like(text: &str, pattern: &str) -> bool {
    let pieces = compile(pattern);
    let text: Vec<char> = text.chars().collect();

    // reachable[j]: the first i pieces can consume exactly text[..j].
    let mut reachable = vec![false; text.len() + 1];
    reachable[0] = true;
    for piece in &pieces {
        let mut next = vec![false; text.len() + 1];
        match piece {
            Piece::Any => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= reachable[j];
                    next[j] = seen;
                }
            }
            Piece::One => {
                for j in 0..text.len() {
                    next[j + 1] = reachable[j];
                }
            }
            Piece::Lit(c) => {
                for j in 0..text.len() {
                    next[j + 1] = reachable[j] && text[j] == *c;
                }
            }
        }
        reachable = next;
    }
    reachable[text.len()]
}
