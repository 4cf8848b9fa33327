//! YAML scalar formatting and style-preserving re-quoting.
//!
//! [`format_scalar`] is a pure function choosing the least intrusive YAML
//! representation for a string; [`requote`] additionally looks at the text
//! the scalar used to occupy and keeps its quoting family whenever that
//! family was a stylistic choice rather than a load-bearing one.
//!
//! Neither function goes through a YAML emitter: splicing needs byte-level
//! control of quoting and indentation that emitters normalize away.

use crate::error::{EditError, EditResult};

/// The implicit type a plain (unquoted) scalar would resolve to.
///
/// Resolution follows the YAML 1.1 boolean set (`yes`/`no`/`on`/`off`
/// included) on top of the core number forms; anything ambiguous resolves
/// away from `Str`, since over-quoting is always round-trip safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlainTag {
    Str,
    Int,
    Float,
    Bool,
    Null,
}

pub(crate) fn resolve_plain(s: &str) -> PlainTag {
    match s {
        "" | "~" | "null" | "Null" | "NULL" => return PlainTag::Null,
        "true" | "True" | "TRUE" | "false" | "False" | "FALSE" | "yes" | "Yes" | "YES" | "no"
        | "No" | "NO" | "on" | "On" | "ON" | "off" | "Off" | "OFF" => return PlainTag::Bool,
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" | "-.inf" | "-.Inf" | "-.INF"
        | ".nan" | ".NaN" | ".NAN" => return PlainTag::Float,
        _ => {}
    }
    if is_int(s) {
        return PlainTag::Int;
    }
    if is_float(s) {
        return PlainTag::Float;
    }
    PlainTag::Str
}

fn is_int(s: &str) -> bool {
    let cleaned = strip_underscores(s);
    let cleaned = cleaned.as_deref().unwrap_or(s);
    if cleaned.parse::<i64>().is_ok() || cleaned.parse::<u64>().is_ok() {
        return true;
    }
    let unsigned = cleaned
        .strip_prefix('-')
        .or_else(|| cleaned.strip_prefix('+'))
        .unwrap_or(cleaned);
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(digits) = unsigned.strip_prefix(prefix) {
            if !digits.is_empty() && i64::from_str_radix(digits, radix).is_ok() {
                return true;
            }
        }
    }
    false
}

fn is_float(s: &str) -> bool {
    let cleaned = strip_underscores(s);
    let cleaned = cleaned.as_deref().unwrap_or(s);
    // str::parse accepts "inf", "nan" and friends, which YAML also treats
    // specially enough to deserve quotes
    cleaned.parse::<f64>().is_ok()
}

fn strip_underscores(s: &str) -> Option<String> {
    if s.contains('_') && s.chars().any(|c| c.is_ascii_digit()) {
        Some(s.replace('_', ""))
    } else {
        None
    }
}

/// Characters that change the meaning of a scalar when they appear first.
const INDICATORS: &[char] = &[
    '@', '`', '%', '&', '*', '!', '|', '>', '\'', '"', '#', ',', '[', ']', '{', '}',
];

/// Whether `s` can be written as a plain scalar without changing how it
/// reads back. Type resolution is checked separately.
fn plain_safe(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    let mut chars = s.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    let second = chars.next();
    if INDICATORS.contains(&first) {
        return false;
    }
    // '-', '?' and ':' are indicators only when followed by a space or
    // ending the scalar
    if matches!(first, '-' | '?' | ':') && matches!(second, None | Some(' ')) {
        return false;
    }
    if s.starts_with(' ') || s.ends_with(' ') || s.starts_with('\t') || s.ends_with('\t') {
        return false;
    }
    if s.contains(" #") || s.contains(": ") || s.ends_with(':') {
        return false;
    }
    if s.chars().any(|c| c.is_control()) {
        return false;
    }
    true
}

fn single_quotable(s: &str) -> bool {
    !s.chars().any(|c| c.is_control())
}

fn single_quoted(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn double_quoted(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    result.push('"');
    for ch in s.chars() {
        match ch {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\0' => result.push_str("\\0"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\x08' => result.push_str("\\b"),
            '\x0C' => result.push_str("\\f"),
            c if c.is_control() => {
                if (c as u32) <= 0xff {
                    result.push_str(&format!("\\x{:02x}", c as u32));
                } else {
                    result.push_str(&format!("\\u{:04x}", c as u32));
                }
            }
            c => result.push(c),
        }
    }
    result.push('"');
    result
}

/// Whether a multi-line value can survive a literal block scalar. Lines
/// starting with extra whitespace would confuse indentation detection, and
/// carriage returns would be folded away.
fn block_representable(s: &str) -> bool {
    if s.contains('\r') {
        return false;
    }
    !s.split('\n')
        .any(|line| line.starts_with(' ') || line.starts_with('\t'))
}

/// Render `value` as a literal block scalar with its content at column
/// `indent`.
///
/// The emitted text carries no trailing newline: the splice destination
/// supplies the line break that follows the scalar, which is also why a
/// value ending in exactly one newline uses clip chomping with the last
/// content line left open.
fn block_literal(value: &str, indent: usize) -> String {
    if value == "\n" {
        // keep chomping with no content lines; the document's own line
        // break after the splice point becomes the kept break
        return "|+\n".to_string();
    }
    let trailing = value.len() - value.trim_end_matches('\n').len();
    let (header, body) = match trailing {
        0 => ("|-", value),
        1 => ("|", &value[..value.len() - 1]),
        _ => ("|+", &value[..value.len() - 1]),
    };
    let mut out = String::from(header);
    for line in body.split('\n') {
        out.push('\n');
        if !line.is_empty() {
            for _ in 0..indent {
                out.push(' ');
            }
            out.push_str(line);
        }
    }
    out
}

/// Format `value` as a standalone YAML scalar, choosing the least
/// intrusive style that round-trips.
///
/// `indent` is the column at which block-scalar content is placed; it is
/// ignored for single-line styles. The empty string formats as the empty
/// plain scalar, which reads back as null.
///
/// Style priority: plain, then double quotes when the plain form would be
/// retagged as a number, boolean or null, then single quotes when the
/// value merely starts with an indicator or carries awkward whitespace,
/// then a literal block for multi-line values.
pub fn format_scalar(value: &str, indent: usize) -> String {
    if value.is_empty() {
        return String::new();
    }
    if value.contains('\n') {
        if block_representable(value) {
            return block_literal(value, indent);
        }
        return double_quoted(value);
    }
    if resolve_plain(value) != PlainTag::Str {
        return double_quoted(value);
    }
    if !plain_safe(value) {
        if single_quotable(value) && !value.contains('\'') {
            return single_quoted(value);
        }
        return double_quoted(value);
    }
    value.to_string()
}

/// Format `value` preferring single quotes.
///
/// Falls back to [`format_scalar`]'s choice when the value spans lines
/// (block literal) or contains characters single quoting cannot carry.
pub fn try_single_quoted(value: &str, indent: usize) -> String {
    if value.contains('\n') {
        return format_scalar(value, indent);
    }
    if !single_quotable(value) {
        return double_quoted(value);
    }
    single_quoted(value)
}

/// Decode the content of a double-quoted YAML scalar.
fn unquote_double(text: &str) -> EditResult<String> {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .ok_or_else(|| EditError::Format("malformed double-quoted scalar".to_string()))?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let esc = chars
            .next()
            .ok_or_else(|| EditError::Format("trailing escape in double-quoted scalar".into()))?;
        match esc {
            '0' => out.push('\0'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            't' => out.push('\t'),
            'n' => out.push('\n'),
            'v' => out.push('\x0b'),
            'f' => out.push('\x0c'),
            'r' => out.push('\r'),
            'e' => out.push('\x1b'),
            ' ' => out.push(' '),
            '"' => out.push('"'),
            '/' => out.push('/'),
            '\\' => out.push('\\'),
            'N' => out.push('\u{85}'),
            '_' => out.push('\u{a0}'),
            'L' => out.push('\u{2028}'),
            'P' => out.push('\u{2029}'),
            'x' | 'u' | 'U' => {
                let len = match esc {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let mut code = 0u32;
                for _ in 0..len {
                    let d = chars.next().and_then(|c| c.to_digit(16)).ok_or_else(|| {
                        EditError::Format("malformed unicode escape".to_string())
                    })?;
                    code = code * 16 + d;
                }
                let c = char::from_u32(code).ok_or_else(|| {
                    EditError::Format("escape is not a unicode scalar value".to_string())
                })?;
                out.push(c);
            }
            other => {
                return Err(EditError::Format(format!(
                    "unknown escape '\\{}' in double-quoted scalar",
                    other
                )))
            }
        }
    }
    Ok(out)
}

/// Decode the content of a single-quoted YAML scalar.
fn unquote_single(text: &str) -> EditResult<String> {
    let inner = text
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .ok_or_else(|| EditError::Format("malformed single-quoted scalar".to_string()))?;
    Ok(inner.replace("''", "'"))
}

/// Column of the first non-empty content line of a block scalar's original
/// text, which starts at its `|` or `>` indicator.
fn block_content_indent(original: &str) -> Option<usize> {
    for line in original.split('\n').skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        return Some(line.chars().take_while(|c| *c == ' ').count());
    }
    None
}

/// Rewrite `new_value` as the YAML scalar text replacing `original`,
/// keeping the original's quoting family when possible.
///
/// `original` is the exact source text the scalar occupied, quotes and
/// block header included; `indent` is the 0-based column the scalar starts
/// at. A quoting family is kept only when it was a stylistic choice — when
/// the original's content would have been fine unquoted. Load-bearing
/// quoting (say `"1"`, where removing the quotes changes the parsed type)
/// makes no claim about the new value, which then gets the default
/// formatting. Multi-line replacements for block scalars re-indent to the
/// original block's content column so the visual nesting survives.
pub fn requote(new_value: &str, original: &str, indent: usize) -> EditResult<String> {
    let original = original.trim_start();
    let step = indent + 2;
    match original.chars().next() {
        Some('"') => {
            let old_value = unquote_double(original)?;
            if !new_value.contains('\n') && format_scalar(&old_value, step) == old_value {
                return Ok(double_quoted(new_value));
            }
            Ok(format_scalar(new_value, step))
        }
        Some('\'') => {
            let old_value = unquote_single(original)?;
            if !new_value.contains('\n') && format_scalar(&old_value, step) == old_value {
                return Ok(try_single_quoted(new_value, step));
            }
            Ok(format_scalar(new_value, step))
        }
        Some('|') | Some('>') => {
            if new_value.contains('\n') && block_representable(new_value) {
                let col = block_content_indent(original).unwrap_or(step).max(step);
                return Ok(block_literal(new_value, col));
            }
            Ok(format_scalar(new_value, step))
        }
        _ => {
            // plain original (or an empty scalar): keep the replacement
            // plain as long as it reads back with the same implicit tag
            if plain_safe(new_value) && resolve_plain(new_value) == resolve_plain(original.trim())
            {
                return Ok(new_value.to_string());
            }
            Ok(format_scalar(new_value, step))
        }
    }
}
