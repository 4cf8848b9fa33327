//! From parsed scalar nodes to splice operations.
//!
//! A parser reports where a scalar starts (1-based line and column, in
//! runes) and how it is quoted; everything else — the end of the token,
//! the text it occupies, the indentation context — is recovered from the
//! source here. The resulting [`Op`] carries a replacement already
//! re-quoted to fit the spot.

use crate::error::{EditError, EditResult};
use crate::parse::Node;
use crate::quote::requote;
use crate::span::{Op, Span};

/// Style of scalar representation in YAML
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Plain scalar (no quotes)
    Plain,
    /// Single-quoted scalar
    SingleQuoted,
    /// Double-quoted scalar
    DoubleQuoted,
    /// Literal scalar (|)
    Literal,
    /// Folded scalar (>)
    Folded,
}

/// Rune and byte offset of a 1-based `(line, column)` position.
fn position(source: &str, line: usize, column: usize) -> EditResult<(usize, usize)> {
    let oob = || {
        EditError::Parse(format!(
            "scalar position {}:{} outside the source",
            line, column
        ))
    };
    let mut rune = 0;
    let mut cur_line = 1;
    let mut chars = source.char_indices().peekable();
    while cur_line < line {
        match chars.next() {
            Some((_, c)) => {
                rune += 1;
                if c == '\n' {
                    cur_line += 1;
                }
            }
            None => return Err(oob()),
        }
    }
    for _ in 0..column.saturating_sub(1) {
        match chars.next() {
            Some((_, '\n')) | None => return Err(oob()),
            Some(_) => rune += 1,
        }
    }
    let byte = chars.peek().map(|(b, _)| *b).unwrap_or(source.len());
    Ok((rune, byte))
}

/// Rune and byte length of a plain scalar starting at the head of `rest`.
/// Ends at the line break or at a ` #` comment, with trailing blanks
/// excluded.
fn plain_len(rest: &str) -> (usize, usize) {
    let mut runes = 0;
    let mut end_runes = 0;
    let mut end_bytes = 0;
    let mut prev = None;
    for (b, c) in rest.char_indices() {
        if c == '\n' {
            break;
        }
        if c == '#' && matches!(prev, Some(' ') | Some('\t')) {
            break;
        }
        runes += 1;
        if c != ' ' && c != '\t' && c != '\r' {
            end_runes = runes;
            end_bytes = b + c.len_utf8();
        }
        prev = Some(c);
    }
    (end_runes, end_bytes)
}

fn single_quoted_len(rest: &str) -> EditResult<(usize, usize)> {
    let mut chars = rest.char_indices().peekable();
    if !matches!(chars.next(), Some((_, '\''))) {
        return Err(EditError::Parse(
            "single-quoted scalar does not start with a quote".to_string(),
        ));
    }
    let mut runes = 1;
    while let Some((b, c)) = chars.next() {
        runes += 1;
        if c == '\'' {
            if let Some((_, '\'')) = chars.peek() {
                chars.next();
                runes += 1;
                continue;
            }
            return Ok((runes, b + 1));
        }
    }
    Err(EditError::Parse(
        "unterminated single-quoted scalar".to_string(),
    ))
}

fn double_quoted_len(rest: &str) -> EditResult<(usize, usize)> {
    let mut chars = rest.char_indices();
    if !matches!(chars.next(), Some((_, '"'))) {
        return Err(EditError::Parse(
            "double-quoted scalar does not start with a quote".to_string(),
        ));
    }
    let mut runes = 1;
    while let Some((b, c)) = chars.next() {
        runes += 1;
        match c {
            '\\' => {
                if chars.next().is_none() {
                    break;
                }
                runes += 1;
            }
            '"' => return Ok((runes, b + 1)),
            _ => {}
        }
    }
    Err(EditError::Parse(
        "unterminated double-quoted scalar".to_string(),
    ))
}

/// Extent of a block scalar whose indicator sits at `rest`'s head.
///
/// Content lines are those indented deeper than the indicator's own line;
/// blank lines in between belong to the block, trailing blank lines only
/// under keep chomping. The reported end excludes the final line break.
fn block_len(rest: &str, line_indent: usize) -> EditResult<(usize, usize)> {
    if !matches!(rest.chars().next(), Some('|') | Some('>')) {
        return Err(EditError::Parse(
            "block scalar does not start with an indicator".to_string(),
        ));
    }
    let header_end = rest.find('\n').unwrap_or(rest.len());
    let header = &rest[..header_end];
    let keep = match header.find('#') {
        Some(i) => header[..i].contains('+'),
        None => header.contains('+'),
    };

    let mut byte_pos = header_end;
    let mut rune_pos = header.chars().count();
    let mut end = (rune_pos, byte_pos);
    while byte_pos < rest.len() {
        let line_start = byte_pos + 1;
        let line_end = rest[line_start..]
            .find('\n')
            .map(|i| line_start + i)
            .unwrap_or(rest.len());
        let line = &rest[line_start..line_end];
        let blank = line.trim().is_empty();
        if !blank && line.chars().take_while(|c| *c == ' ').count() <= line_indent {
            break;
        }
        byte_pos = line_end;
        rune_pos += 1 + line.chars().count();
        if !blank || keep {
            end = (rune_pos, byte_pos);
        }
    }
    Ok(end)
}

/// Leading spaces of the line containing byte offset `at`.
fn line_indent_at(source: &str, at: usize) -> usize {
    let line_start = source[..at].rfind('\n').map(|i| i + 1).unwrap_or(0);
    source[line_start..at]
        .chars()
        .take_while(|c| *c == ' ')
        .count()
}

/// Build the splice operation that replaces `node`'s scalar value with
/// `replacement` in `source`.
///
/// The span covers the scalar's original text, quotes and block header
/// included, in pre-edit rune positions; the attached replacement text is
/// produced by [`requote`] so the original quoting family survives where
/// it can. An empty scalar yields an insertion at the point where the
/// value would sit.
pub fn node_op(source: &str, node: &Node, replacement: &str) -> EditResult<Op> {
    let (value, style) = match node.scalar() {
        Some(pair) => pair,
        None => {
            return Err(EditError::TypeMismatch(
                "replacement target must be a scalar".to_string(),
            ))
        }
    };
    if node.in_flow() {
        return Err(EditError::UnsupportedStyle(
            "scalar inside a flow collection".to_string(),
        ));
    }
    let (start_rune, start_byte) = position(source, node.line(), node.column())?;
    let rest = &source[start_byte..];
    let line_indent = line_indent_at(source, start_byte);
    let ((rune_len, byte_len), indent) = match style {
        Style::Plain => {
            let len = if value.is_empty() { (0, 0) } else { plain_len(rest) };
            // a plain scalar spanning lines folds its breaks into spaces,
            // so the only reliable tell is the source not matching
            if &rest[..len.1] != value {
                return Err(EditError::UnsupportedStyle(
                    "multi-line plain scalar".to_string(),
                ));
            }
            (len, node.column() - 1)
        }
        Style::SingleQuoted => (single_quoted_len(rest)?, node.column() - 1),
        Style::DoubleQuoted => (double_quoted_len(rest)?, node.column() - 1),
        // a replacement block re-indents relative to the line, not to the
        // indicator's column
        Style::Literal | Style::Folded => (block_len(rest, line_indent)?, line_indent),
    };

    let original = &source[start_byte..start_byte + byte_len];
    let mut replacement_text = requote(replacement, original, indent)?;
    if rune_len == 0 && !replacement_text.is_empty() && source[..start_byte].ends_with(':') {
        // empty scalar right after the colon: keep the separator
        replacement_text.insert(0, ' ');
    }
    Ok(Span::new(start_rune, start_rune + rune_len).with(replacement_text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_counts_runes() {
        let src = "áb: c\nd: é\n";
        assert_eq!(position(src, 1, 1).unwrap(), (0, 0));
        assert_eq!(position(src, 1, 5).unwrap(), (4, 5));
        assert_eq!(position(src, 2, 4).unwrap(), (9, 10));
    }

    #[test]
    fn test_position_out_of_range() {
        assert!(position("a: b\n", 9, 1).is_err());
        assert!(position("a: b\n", 1, 9).is_err());
    }

    #[test]
    fn test_plain_len_stops_at_comment() {
        assert_eq!(plain_len("value  # note\n"), (5, 5));
        assert_eq!(plain_len("a#b\n"), (3, 3));
        assert_eq!(plain_len("value   \nnext"), (5, 5));
        assert_eq!(plain_len("\nnext"), (0, 0));
    }

    #[test]
    fn test_quoted_len() {
        assert_eq!(single_quoted_len("'a''b' rest").unwrap(), (6, 6));
        assert_eq!(double_quoted_len("\"a\\\"b\" rest").unwrap(), (6, 6));
        assert_eq!(double_quoted_len("\"á\"x").unwrap(), (3, 4));
        assert!(single_quoted_len("'oops").is_err());
        assert!(double_quoted_len("\"oops").is_err());
    }

    #[test]
    fn test_block_len_extent() {
        // "  foo: |" then two content lines then a sibling
        let rest = "|\n    a\n    b\nnext: x\n";
        let (runes, bytes) = block_len(rest, 2).unwrap();
        assert_eq!(&rest[..bytes], "|\n    a\n    b");
        assert_eq!(runes, 13);
    }

    #[test]
    fn test_block_len_interior_blank_lines() {
        let rest = "|\n    a\n\n    b\nnext: x\n";
        let (_, bytes) = block_len(rest, 2).unwrap();
        assert_eq!(&rest[..bytes], "|\n    a\n\n    b");
    }

    #[test]
    fn test_block_len_trailing_blanks_only_with_keep() {
        let clip = "|\n    a\n\nnext: x\n";
        let (_, bytes) = block_len(clip, 2).unwrap();
        assert_eq!(&clip[..bytes], "|\n    a");

        let keep = "|+\n    a\n\nnext: x\n";
        let (_, bytes) = block_len(keep, 2).unwrap();
        assert_eq!(&keep[..bytes], "|+\n    a\n");
    }

    #[test]
    fn test_block_len_header_comment_is_not_keep() {
        let rest = "| # + not a chomp\n    a\nnext: x\n";
        let (_, bytes) = block_len(rest, 2).unwrap();
        assert_eq!(&rest[..bytes], "| # + not a chomp\n    a");
    }

    #[test]
    fn test_line_indent_at() {
        let src = "a:\n  b: |\n";
        let at = src.find('|').unwrap();
        assert_eq!(line_indent_at(src, at), 2);
    }
}
