//! Decoding of quoted string literals.

/// Strip the surrounding quotes from `raw` and resolve backslash escapes.
///
/// Unknown escapes keep their backslash, so `"a\_b"` decodes to `a\_b`
/// and LIKE patterns can carry their own escapes.
#[must_use]
pub fn unquote(raw: &str) -> String {
    let mut chars = raw.chars();
    let quote = chars.next();
    let body: Vec<char> = chars.collect();
    let body = match (quote, body.split_last()) {
        (Some(q), Some((last, rest))) if *last == q => rest,
        _ => &body[..],
    };

    let mut out = String::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        let c = body[i];
        i += 1;
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(&next) = body.get(i) else {
            out.push('\\');
            break;
        };
        i += 1;
        match next {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            '\\' | '\'' | '"' | '`' | '/' => out.push(next),
            'u' => {
                let hex: String = body.iter().skip(i).take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16).map_or(None, char::from_u32);
                match decoded {
                    Some(decoded) if hex.len() == 4 => {
                        out.push(decoded);
                        i += 4;
                    }
                    _ => out.push_str("\\u"),
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}
