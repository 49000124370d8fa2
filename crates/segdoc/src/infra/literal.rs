//! Python string literal decoding and docstring text normalization.

/// Decode the value of a Python string literal.
///
/// Returns `None` for literals that never act as docstrings (bytes and
/// f-strings) or for text that is not a string literal at all.
pub fn decode(literal: &str) -> Option<String> {
    let quote_at = literal.find(['"', '\''])?;
    let prefix = literal[..quote_at].to_ascii_lowercase();
    if !prefix.chars().all(|c| matches!(c, 'r' | 'u' | 'b' | 'f' | 't')) {
        return None;
    }
    if prefix.contains(['b', 'f', 't']) {
        return None;
    }

    let quoted = &literal[quote_at..];
    let delimiter = ["\"\"\"", "'''", "\"", "'"]
        .into_iter()
        .find(|delim| quoted.len() >= delim.len() * 2 && quoted.starts_with(delim))?;
    let body = quoted.strip_prefix(delimiter)?.strip_suffix(delimiter)?;
    let body = body.replace("\r\n", "\n");

    if prefix.contains('r') {
        Some(body)
    } else {
        Some(unescape(&body))
    }
}

/// Resolve backslash escapes the way the Python tokenizer does for `str` literals.
///
/// Escapes that cannot be resolved here (`\N{...}`, malformed hex) are kept verbatim.
fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            None => out.push('\\'),
            Some('\n') => {}
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\x0b'),
            Some(first @ '0'..='7') => {
                let mut value = first.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.extend(char::from_u32(value));
            }
            Some(kind @ ('x' | 'u' | 'U')) => {
                let width = match kind {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars
                    .clone()
                    .take(width)
                    .take_while(char::is_ascii_hexdigit)
                    .collect();
                let decoded = (digits.len() == width)
                    .then(|| u32::from_str_radix(&digits, 16).ok())
                    .flatten()
                    .and_then(char::from_u32);
                match decoded {
                    Some(ch) => {
                        out.push(ch);
                        for _ in 0..width {
                            chars.next();
                        }
                    }
                    None => {
                        out.push('\\');
                        out.push(kind);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
        }
    }

    out
}

/// Normalize docstring text: expand tabs, drop the common indentation of
/// continuation lines and strip leading/trailing blank lines.
pub fn clean(text: &str) -> String {
    let expanded: Vec<String> = text.split('\n').map(expand_tabs).collect();

    let margin = expanded
        .iter()
        .skip(1)
        .filter(|line| !line.trim_start().is_empty())
        .map(|line| line.len() - line.trim_start_matches(' ').len())
        .min();

    let mut lines: Vec<&str> = Vec::with_capacity(expanded.len());
    for (idx, line) in expanded.iter().enumerate() {
        if idx == 0 {
            lines.push(line.trim_start());
        } else {
            let cut = margin.unwrap_or(0).min(leading_spaces(line));
            lines.push(&line[cut..]);
        }
    }

    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    let first_content = lines
        .iter()
        .position(|line| !line.is_empty())
        .unwrap_or(lines.len());

    lines[first_content..].join("\n")
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn expand_tabs(line: &str) -> String {
    if !line.contains('\t') {
        return line.to_owned();
    }
    let mut out = String::with_capacity(line.len() + 8);
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = 8 - column % 8;
            out.extend(std::iter::repeat_n(' ', pad));
            column += pad;
        } else {
            out.push(c);
            column += 1;
        }
    }
    out
}

/// Escape docstring text so that wrapping it in `"""` evaluates back to `text`.
pub fn escape(text: &str) -> String {
    let escape_quotes = text.contains("\"\"\"") || text.ends_with('"');
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' if escape_quotes => out.push_str("\\\""),
            '\n' | '\t' => out.push(c),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}
