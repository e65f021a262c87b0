//! Scalar resolution, quoting and unquoting.
//!
//! Plain scalars are resolved with the YAML 1.2 core schema as implemented by
//! `serde_yaml`, so `yes` stays a string while `5`, `1.5`, `true` and `~` do not.

use super::node::{Style, Tag};

/// Resolves the tag of a plain scalar.
pub fn resolve_tag(text: &str) -> Tag {
    if text.is_empty() {
        return Tag::Null;
    }
    match serde_yaml::from_str::<serde_yaml::Value>(text) {
        Ok(serde_yaml::Value::Null) => Tag::Null,
        Ok(serde_yaml::Value::Bool(_)) => Tag::Bool,
        Ok(serde_yaml::Value::Number(n)) if n.is_f64() => Tag::Float,
        Ok(serde_yaml::Value::Number(_)) => Tag::Int,
        _ => Tag::Str,
    }
}

/// Resolves a plain scalar to its value.
pub fn resolve_plain(text: &str) -> serde_yaml::Value {
    match resolve_tag(text) {
        Tag::Str => serde_yaml::Value::String(text.to_string()),
        Tag::Null => serde_yaml::Value::Null,
        _ => serde_yaml::from_str(text).unwrap_or_else(|_| serde_yaml::Value::String(text.to_string())),
    }
}

/// Formats a float the way YAML writes it.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        ".nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { ".inf".to_string() } else { "-.inf".to_string() }
    } else if f.fract() == 0.0 {
        if f.abs() < 1e15 { format!("{:.1}", f) } else { format!("{:e}", f) }
    } else {
        f.to_string()
    }
}

/// Picks the style used to write a string value so that it reads back as the
/// same string.
pub fn string_style(s: &str) -> Style {
    let block_safe = s.chars().all(|c| c == '\n' || c == '\t' || !c.is_control());
    if s.contains('\n') && block_safe && !s.starts_with(' ') && !has_trailing_space_on_lines(s) {
        return Style::Literal;
    }
    if !needs_quotes(s, false) {
        Style::Plain
    } else if resolve_tag(s) != Tag::Str || s.chars().any(|c| c.is_control()) || s.contains('\'') {
        Style::DoubleQuoted
    } else {
        Style::SingleQuoted
    }
}

fn has_trailing_space_on_lines(s: &str) -> bool {
    s.lines().any(|line| line.ends_with(' ') || line.ends_with('\t'))
}

/// Returns true if a string cannot be written as a plain scalar.
pub fn needs_quotes(s: &str, flow: bool) -> bool {
    if s.is_empty() || resolve_tag(s) != Tag::Str {
        return true;
    }
    if s.starts_with(' ') || s.ends_with(' ') || s.starts_with('\t') || s.ends_with('\t') {
        return true;
    }
    if s.chars().any(|c| c.is_control()) {
        return true;
    }
    let first = s.chars().next().unwrap_or(' ');
    if matches!(
        first,
        '#' | '&' | '*' | '!' | '|' | '>' | '\'' | '"' | '%' | '@' | '`' | '[' | ']' | '{' | '}' | ','
    ) {
        return true;
    }
    if matches!(first, '-' | '?' | ':') {
        let second = s.chars().nth(1);
        if second.map_or(true, |c| c == ' ') {
            return true;
        }
    }
    if s == "---" || s == "..." || s.starts_with("--- ") {
        return true;
    }
    if s.contains(": ") || s.contains(" #") || s.ends_with(':') {
        return true;
    }
    if flow && s.chars().any(|c| matches!(c, ',' | '[' | ']' | '{' | '}')) {
        return true;
    }
    false
}

/// Writes a string as a double-quoted scalar.
pub fn double_quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s.replace('"', "\\\"")))
}

/// Writes a string as a single-quoted scalar.
pub fn single_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Decodes a quoted scalar (including its quotes) into its string value.
pub fn unquote(text: &str) -> Result<String, String> {
    serde_yaml::from_str::<String>(text).map_err(|e| e.to_string())
}

/// Returns the byte length of the quoted scalar at the start of `text`, or
/// None if the quote is not closed.
pub fn quoted_len(text: &str) -> Option<usize> {
    let mut chars = text.char_indices();
    let (_, quote) = chars.next()?;
    match quote {
        '\'' => {
            let bytes = text.as_bytes();
            let mut i = 1;
            while i < bytes.len() {
                if bytes[i] == b'\'' {
                    if bytes.get(i + 1) == Some(&b'\'') {
                        i += 2;
                        continue;
                    }
                    return Some(i + 1);
                }
                i += 1;
            }
            None
        }
        '"' => {
            let mut escaped = false;
            for (i, c) in chars {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    return Some(i + 1);
                }
            }
            None
        }
        _ => None,
    }
}
