//! Batch splitting and named parameter placeholders.
//!
//! A batch is split into statements at top-level semicolons so each one can
//! be prepared and described on its own. Queries reference parameters as
//! `@name`. Drivers bind positionally, so before execution each referenced
//! name is replaced by a numbered placeholder in the backend's syntax. Text
//! inside string literals, quoted identifiers and comments is left
//! untouched, as is any `@name` that does not match a binding in the
//! collection.

use super::types::{ParameterCollection, Value};

/// Positional placeholder syntax of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ... (PostgreSQL)
    Dollar,
    /// `?1`, `?2`, ... (SQLite)
    Question,
}

impl PlaceholderStyle {
    fn render(&self, position: usize) -> String {
        match self {
            Self::Dollar => format!("${position}"),
            Self::Question => format!("?{position}"),
        }
    }
}

/// A query rewritten for positional binding.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery<'a> {
    /// SQL text with positional placeholders.
    pub sql: String,
    /// Values to bind, in placeholder order.
    pub values: Vec<&'a Value>,
}

/// Rewrites `@name` references into positional placeholders.
///
/// Positions are assigned in order of first reference; a name referenced
/// several times reuses its position.
pub fn bind_named<'a>(
    sql: &str,
    parameters: &'a ParameterCollection,
    style: PlaceholderStyle,
) -> BoundQuery<'a> {
    let mut out = String::with_capacity(sql.len());
    let mut order: Vec<&str> = Vec::new();
    let mut values: Vec<&'a Value> = Vec::new();

    let chars: Vec<char> = sql.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(end) = skip_comment(&chars, i) {
            out.extend(&chars[i..end]);
            i = end;
            continue;
        }

        match c {
            '\'' | '"' => {
                let end = skip_quoted(&chars, i, c);
                out.extend(&chars[i..end]);
                i = end;
            }
            '$' => {
                let end = skip_dollar_quoted(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
            }
            '@' if i == 0 || chars[i - 1] != '@' => {
                let start = i + 1;
                let mut end = start;
                if chars.get(start).is_some_and(|ch| is_ident_start(*ch)) {
                    while chars.get(end).is_some_and(|ch| is_ident_char(*ch)) {
                        end += 1;
                    }
                }
                let name: String = chars[start..end].iter().collect();
                match parameters.parameters().iter().find(|p| p.name == name) {
                    Some(param) if end > start => {
                        let position = match order.iter().position(|n| *n == param.name) {
                            Some(existing) => existing + 1,
                            None => {
                                order.push(&param.name);
                                values.push(&param.value);
                                order.len()
                            }
                        };
                        out.push_str(&style.render(position));
                        i = end;
                    }
                    _ => {
                        out.push(c);
                        i += 1;
                    }
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    BoundQuery { sql: out, values }
}

/// Splits a batch into statements at top-level semicolons.
///
/// Semicolons inside literals, quoted identifiers, comments and
/// dollar-quoted bodies do not split, nor do those inside the
/// `BEGIN ... END` body of a `CREATE` statement (triggers, SQL-standard
/// function bodies). Statements holding only whitespace or comments are
/// dropped.
pub fn split_statements(sql: &str) -> Vec<String> {
    let chars: Vec<char> = sql.chars().collect();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut has_code = false;
    let mut first_word: Option<String> = None;
    let mut depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(end) = skip_comment(&chars, i) {
            current.extend(&chars[i..end]);
            i = end;
            continue;
        }

        match c {
            '\'' | '"' => {
                let end = skip_quoted(&chars, i, c);
                current.extend(&chars[i..end]);
                has_code = true;
                i = end;
            }
            '$' => {
                let end = skip_dollar_quoted(&chars, i);
                current.extend(&chars[i..end]);
                has_code = true;
                i = end;
            }
            ';' if depth == 0 => {
                if has_code {
                    statements.push(current.trim().to_string());
                }
                current.clear();
                has_code = false;
                first_word = None;
                i += 1;
            }
            c if is_ident_start(c) => {
                let start = i;
                while chars.get(i).is_some_and(|ch| is_ident_char(*ch)) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let upper = word.to_ascii_uppercase();
                if first_word.get_or_insert_with(|| upper.clone()) == "CREATE" {
                    match upper.as_str() {
                        "BEGIN" | "CASE" => depth += 1,
                        "END" => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                }
                current.push_str(&word);
                has_code = true;
            }
            _ => {
                has_code |= !c.is_whitespace();
                current.push(c);
                i += 1;
            }
        }
    }

    if has_code {
        statements.push(current.trim().to_string());
    }
    statements
}

/// Returns the index just past a `--` or `/* */` comment starting at `start`.
fn skip_comment(chars: &[char], start: usize) -> Option<usize> {
    match (chars.get(start), chars.get(start + 1)) {
        (Some('-'), Some('-')) => Some(
            chars[start..]
                .iter()
                .position(|&ch| ch == '\n')
                .map(|p| start + p)
                .unwrap_or(chars.len()),
        ),
        (Some('/'), Some('*')) => Some(
            find_seq(chars, start + 2, &['*', '/'])
                .map(|p| p + 2)
                .unwrap_or(chars.len()),
        ),
        _ => None,
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Returns the index just past a quoted run starting at `start`.
/// A doubled quote character is an escape.
fn skip_quoted(chars: &[char], start: usize, quote: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

/// Skips a PostgreSQL dollar-quoted string (`$$...$$`, `$tag$...$tag$`).
/// Anything else starting with `$` (such as `$1`) advances by one character.
fn skip_dollar_quoted(chars: &[char], start: usize) -> usize {
    let mut tag_end = start + 1;
    while chars.get(tag_end).is_some_and(|ch| is_ident_char(*ch) && !ch.is_ascii_digit()) {
        tag_end += 1;
    }
    if chars.get(tag_end) != Some(&'$') {
        return start + 1;
    }
    let tag = &chars[start..=tag_end];
    match find_seq(chars, tag_end + 1, tag) {
        Some(close) => close + tag.len(),
        None => chars.len(),
    }
}

fn find_seq(chars: &[char], from: usize, needle: &[char]) -> Option<usize> {
    if from > chars.len() || needle.is_empty() {
        return None;
    }
    chars[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| from + p)
}
