//! Parsed YAML documents and JSON-pointer navigation.
//!
//! Parsing is delegated to [`saphyr_parser`]; its event stream is folded
//! into a [`Node`] tree where every scalar records the 1-based rune
//! position of its first character, its quoting [`Style`] and its value.
//! Markers are normalized so that quoted scalars point at their opening
//! quote and block scalars at their `|`/`>` indicator, which is the
//! contract the span adapter in [`crate::node`] relies on.

use saphyr_parser::{Event, Parser, ScalarStyle, Span as EventSpan};

use crate::error::{EditError, EditResult};
use crate::node::{node_op, Style};
use crate::quote::{resolve_plain, PlainTag};
use crate::span::Op;
use crate::splice::{transform_bytes, transform_string, Splicer};

/// A node in a parsed YAML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    kind: NodeKind,
    line: usize,
    column: usize,
    in_flow: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Scalar { value: String, style: Style },
    Mapping(Vec<(Node, Node)>),
    Sequence(Vec<Node>),
    Alias(usize),
}

impl Node {
    /// 1-based line of the node's first character.
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based column, in runes, of the node's first character. For
    /// quoted scalars this is the opening quote; for block scalars the
    /// `|` or `>` indicator.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Whether the node sits inside a flow collection.
    pub fn in_flow(&self) -> bool {
        self.in_flow
    }

    /// The scalar value and style, if this node is a scalar.
    pub fn scalar(&self) -> Option<(&str, Style)> {
        match &self.kind {
            NodeKind::Scalar { value, style } => Some((value, *style)),
            _ => None,
        }
    }

    /// The scalar value, if this node is a scalar.
    pub fn value(&self) -> Option<&str> {
        self.scalar().map(|(v, _)| v)
    }

    /// The node's resolved tag. Collections report `!!map`/`!!seq`;
    /// non-plain scalars are always `!!str`, plain scalars resolve by the
    /// implicit rules.
    pub fn tag(&self) -> &'static str {
        match &self.kind {
            NodeKind::Mapping(_) => "!!map",
            NodeKind::Sequence(_) => "!!seq",
            NodeKind::Alias(_) => "!!alias",
            NodeKind::Scalar { value, style } => match style {
                Style::Plain => match resolve_plain(value) {
                    PlainTag::Str => "!!str",
                    PlainTag::Int => "!!int",
                    PlainTag::Float => "!!float",
                    PlainTag::Bool => "!!bool",
                    PlainTag::Null => "!!null",
                },
                _ => "!!str",
            },
        }
    }

    /// Mapping entries, if this node is a mapping.
    pub fn entries(&self) -> Option<&[(Node, Node)]> {
        match &self.kind {
            NodeKind::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Sequence items, if this node is a sequence.
    pub fn items(&self) -> Option<&[Node]> {
        match &self.kind {
            NodeKind::Sequence(items) => Some(items),
            _ => None,
        }
    }
}

/// A parsed YAML document that keeps its original source text, so nodes
/// can be turned into splice operations against it.
#[derive(Debug, Clone)]
pub struct Document {
    source: String,
    root: Option<Node>,
}

impl Document {
    /// Parse the first document in `source`.
    pub fn parse(source: &str) -> EditResult<Document> {
        let parser = Parser::new_from_str(source);
        let mut events = Vec::new();
        for result in parser {
            let (event, span) = result.map_err(|e| EditError::Parse(e.to_string()))?;
            events.push((event, span));
        }
        let mut builder = Builder::new(source, events);
        let root = builder.build_root()?;
        Ok(Document {
            source: source.to_string(),
            root,
        })
    }

    /// The original source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The document's root node, if the document is not empty.
    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    /// Resolve a JSON-pointer path (`/a/b/0`, with `~0`/`~1` escapes) to a
    /// node. The empty pointer addresses the root.
    pub fn find(&self, pointer: &str) -> EditResult<&Node> {
        let not_found = || EditError::PointerNotFound(pointer.to_string());
        let mut node = self.root.as_ref().ok_or_else(not_found)?;
        if pointer.is_empty() {
            return Ok(node);
        }
        let rest = pointer.strip_prefix('/').ok_or_else(not_found)?;
        for token in rest.split('/') {
            let token = token.replace("~1", "/").replace("~0", "~");
            node = match &node.kind {
                NodeKind::Mapping(entries) => entries
                    .iter()
                    .find(|(k, _)| k.value() == Some(token.as_str()))
                    .map(|(_, v)| v)
                    .ok_or_else(not_found)?,
                NodeKind::Sequence(items) => token
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get(i))
                    .ok_or_else(not_found)?,
                _ => return Err(not_found()),
            };
        }
        Ok(node)
    }

    /// Build the splice operation replacing the scalar at `pointer` with
    /// `value`, re-quoted to match the original's style where possible.
    pub fn replace(&self, pointer: &str, value: &str) -> EditResult<Op> {
        node_op(&self.source, self.find(pointer)?, value)
    }
}

/// Apply a batch of `(pointer, value)` edits to a YAML string in one
/// streaming pass. All positions are resolved against the original
/// source, so the edits do not shift each other.
pub fn edit_string(source: &str, edits: &[(&str, &str)]) -> EditResult<String> {
    let doc = Document::parse(source)?;
    let mut ops = Vec::with_capacity(edits.len());
    for (pointer, value) in edits {
        ops.push(doc.replace(pointer, value)?);
    }
    let mut splicer = Splicer::new(ops)?;
    Ok(transform_string(&mut splicer, source)?)
}

/// Byte-slice flavor of [`edit_string`].
pub fn edit_bytes(source: &[u8], edits: &[(&str, &str)]) -> EditResult<Vec<u8>> {
    let text = std::str::from_utf8(source)
        .map_err(|e| EditError::Parse(format!("source is not valid utf-8: {}", e)))?;
    let doc = Document::parse(text)?;
    let mut ops = Vec::with_capacity(edits.len());
    for (pointer, value) in edits {
        ops.push(doc.replace(pointer, value)?);
    }
    let mut splicer = Splicer::new(ops)?;
    Ok(transform_bytes(&mut splicer, source)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Scalar,
    SequenceStart,
    SequenceEnd,
    MappingStart,
    MappingEnd,
    Alias,
    StreamEnd,
    Other,
}

struct Builder<'a> {
    source: &'a str,
    lines: Vec<&'a str>,
    events: Vec<(Event<'a>, EventSpan)>,
    pos: usize,
    char_to_byte: Vec<usize>,
    flow_depth: usize,
}

impl<'a> Builder<'a> {
    fn new(source: &'a str, events: Vec<(Event<'a>, EventSpan)>) -> Builder<'a> {
        let mut char_to_byte: Vec<usize> = source.char_indices().map(|(b, _)| b).collect();
        char_to_byte.push(source.len());
        Builder {
            source,
            lines: source.lines().collect(),
            events,
            pos: 0,
            char_to_byte,
            flow_depth: 0,
        }
    }

    fn to_byte(&self, char_idx: usize) -> usize {
        if char_idx >= self.char_to_byte.len() {
            self.source.len()
        } else {
            self.char_to_byte[char_idx]
        }
    }

    fn char_at(&self, char_idx: usize) -> Option<char> {
        self.source[self.to_byte(char_idx)..].chars().next()
    }

    /// The event kind at the cursor, without holding a borrow on the
    /// event buffer.
    fn current_kind(&self) -> EventKind {
        match self.events.get(self.pos).map(|(event, _)| event) {
            Some(Event::Scalar(..)) => EventKind::Scalar,
            Some(Event::SequenceStart(..)) => EventKind::SequenceStart,
            Some(Event::MappingStart(..)) => EventKind::MappingStart,
            Some(Event::Alias(_)) => EventKind::Alias,
            Some(Event::SequenceEnd) => EventKind::SequenceEnd,
            Some(Event::MappingEnd) => EventKind::MappingEnd,
            Some(Event::StreamEnd) | None => EventKind::StreamEnd,
            Some(_) => EventKind::Other,
        }
    }

    /// Build the root node of the first document, skipping stream and
    /// document bookkeeping events.
    fn build_root(&mut self) -> EditResult<Option<Node>> {
        while self.pos < self.events.len() {
            match self.current_kind() {
                EventKind::Scalar
                | EventKind::SequenceStart
                | EventKind::MappingStart
                | EventKind::Alias => return self.build_node().map(Some),
                EventKind::StreamEnd => return Ok(None),
                _ => self.pos += 1,
            }
        }
        Ok(None)
    }

    fn build_node(&mut self) -> EditResult<Node> {
        match self.current_kind() {
            EventKind::Scalar => self.build_scalar(),
            EventKind::SequenceStart => self.build_sequence(),
            EventKind::MappingStart => self.build_mapping(),
            EventKind::Alias => self.build_alias(),
            _ => Err(EditError::Parse(
                "unexpected event while building node tree".to_string(),
            )),
        }
    }

    fn build_scalar(&mut self) -> EditResult<Node> {
        let (event, span) = &self.events[self.pos];
        let span = *span;
        let (value, style) = match event {
            Event::Scalar(v, s, _, _) => (v.to_string(), *s),
            _ => return Err(EditError::Parse("expected scalar event".to_string())),
        };
        self.pos += 1;

        let style = match style {
            ScalarStyle::Plain => Style::Plain,
            ScalarStyle::SingleQuoted => Style::SingleQuoted,
            ScalarStyle::DoubleQuoted => Style::DoubleQuoted,
            ScalarStyle::Literal => Style::Literal,
            ScalarStyle::Folded => Style::Folded,
        };

        let (line, column) = match style {
            Style::SingleQuoted | Style::DoubleQuoted => self.locate_quote(&span, style),
            Style::Literal | Style::Folded => self.locate_block_indicator(&span, style),
            Style::Plain => (span.start.line(), span.start.col() + 1),
        };

        Ok(Node {
            kind: NodeKind::Scalar { value, style },
            line,
            column,
            in_flow: self.flow_depth > 0,
        })
    }

    /// Position of the opening quote of a quoted scalar. Parsers may
    /// report the quote itself or the first content character; accept
    /// either.
    fn locate_quote(&self, span: &EventSpan, style: Style) -> (usize, usize) {
        let quote = if style == Style::DoubleQuoted { '"' } else { '\'' };
        let idx = span.start.index();
        let line = span.start.line();
        let col = span.start.col() + 1;
        if self.char_at(idx) == Some(quote) {
            return (line, col);
        }
        for back in 1..=3 {
            if idx < back || col <= back {
                break;
            }
            if self.char_at(idx - back) == Some(quote) {
                return (line, col - back);
            }
        }
        (line, col)
    }

    /// Position of the `|`/`>` indicator of a block scalar. Parsers tend
    /// to report the first content line, so walk up to the header.
    fn locate_block_indicator(&self, span: &EventSpan, style: Style) -> (usize, usize) {
        let ind = if style == Style::Literal { '|' } else { '>' };
        let start_line = span.start.line();
        if self.char_at(span.start.index()) == Some(ind) {
            return (start_line, span.start.col() + 1);
        }
        // nearest line above first; the content line itself only as a
        // last resort
        let mut candidates: Vec<usize> = (1..=4)
            .filter(|back| *back < start_line)
            .map(|back| start_line - back)
            .collect();
        candidates.push(start_line);
        for line_no in candidates {
            if let Some(col) = self.find_indicator_in_line(line_no, ind) {
                return (line_no, col);
            }
        }
        (start_line, span.start.col() + 1)
    }

    /// Rightmost occurrence of `ind` in the given 1-based line that looks
    /// like a block scalar header: preceded by a separator and followed
    /// only by chomping/indent indicators or a comment.
    fn find_indicator_in_line(&self, line_no: usize, ind: char) -> Option<usize> {
        let line = *self.lines.get(line_no.checked_sub(1)?)?;
        let positions: Vec<(usize, char)> = line.char_indices().collect();
        for (rune_idx, &(byte_idx, c)) in positions.iter().enumerate().rev() {
            if c != ind {
                continue;
            }
            let after = line[byte_idx + c.len_utf8()..].trim_start();
            let valid_after = after.is_empty()
                || after.starts_with('+')
                || after.starts_with('-')
                || after.starts_with('#')
                || after.starts_with(|ch: char| ch.is_ascii_digit());
            if !valid_after {
                continue;
            }
            let valid_before = rune_idx == 0
                || positions
                    .get(rune_idx - 1)
                    .map(|&(_, prev)| matches!(prev, ' ' | '\t' | ':' | '-'))
                    .unwrap_or(false);
            if valid_before {
                return Some(rune_idx + 1);
            }
        }
        None
    }

    fn build_sequence(&mut self) -> EditResult<Node> {
        let (_, span) = &self.events[self.pos];
        let span = *span;
        self.pos += 1;
        let flow = self.char_at(span.start.index()) == Some('[');
        let outer_flow = self.flow_depth > 0;
        if flow {
            self.flow_depth += 1;
        }
        let mut items = Vec::new();
        while self.pos < self.events.len() {
            if self.current_kind() == EventKind::SequenceEnd {
                self.pos += 1;
                break;
            }
            items.push(self.build_node()?);
        }
        if flow {
            self.flow_depth -= 1;
        }
        Ok(Node {
            kind: NodeKind::Sequence(items),
            line: span.start.line(),
            column: span.start.col() + 1,
            in_flow: outer_flow || flow,
        })
    }

    fn build_mapping(&mut self) -> EditResult<Node> {
        let (_, span) = &self.events[self.pos];
        let span = *span;
        self.pos += 1;
        let flow = self.char_at(span.start.index()) == Some('{');
        let outer_flow = self.flow_depth > 0;
        if flow {
            self.flow_depth += 1;
        }
        let mut entries = Vec::new();
        while self.pos < self.events.len() {
            if self.current_kind() == EventKind::MappingEnd {
                self.pos += 1;
                break;
            }
            let key_end = {
                let marker = self.events[self.pos].1.end;
                (marker.index(), marker.line(), marker.col())
            };
            let key = self.build_node()?;
            if self.current_kind() == EventKind::MappingEnd
                || self.current_kind() == EventKind::StreamEnd
            {
                return Err(EditError::Parse(
                    "mapping entry without a value".to_string(),
                ));
            }
            let mut value = self.build_node()?;
            if !flow && value.scalar() == Some(("", Style::Plain)) {
                self.reposition_empty_value(key_end, &mut value);
            }
            entries.push((key, value));
        }
        if flow {
            self.flow_depth -= 1;
        }
        Ok(Node {
            kind: NodeKind::Mapping(entries),
            line: span.start.line(),
            column: span.start.col() + 1,
            in_flow: outer_flow || flow,
        })
    }

    /// An omitted mapping value parses as an empty scalar whose reported
    /// position can point anywhere (often at the next token). Anchor the
    /// insertion point right after the key's `: ` instead.
    fn reposition_empty_value(&self, key_end: (usize, usize, usize), value: &mut Node) {
        let (end_index, end_line, end_col) = key_end;
        let mut idx = end_index;
        while matches!(self.char_at(idx), Some(' ') | Some('\t')) {
            idx += 1;
        }
        if self.char_at(idx) != Some(':') {
            return;
        }
        idx += 1;
        if self.char_at(idx) == Some(' ') {
            idx += 1;
        }
        value.line = end_line;
        value.column = end_col + 1 + (idx - end_index);
    }

    fn build_alias(&mut self) -> EditResult<Node> {
        let (event, span) = &self.events[self.pos];
        let span = *span;
        let id = match event {
            Event::Alias(id) => *id,
            _ => return Err(EditError::Parse("expected alias event".to_string())),
        };
        self.pos += 1;
        Ok(Node {
            kind: NodeKind::Alias(id),
            line: span.start.line(),
            column: span.start.col() + 1,
            in_flow: self.flow_depth > 0,
        })
    }
}
