//! Streaming multi-span substitution over a rune-indexed text stream.
//!
//! The [`Splicer`] applies a set of non-overlapping [`Op`]s to a UTF-8
//! stream, producing the edited output incrementally. All span positions
//! are interpreted against the original source: earlier replacements never
//! shift the positions of later ones. The caller drives the transform with
//! whatever source and destination chunks it has; the transformer reports
//! [`Status::ShortSrc`] and [`Status::ShortDst`] so it can compose with
//! chunked readers and writers without buffering the whole document.

use std::fmt;
use std::io::{self, Read};

use crate::span::{Op, Span};

/// Errors reported by the splice transformer
#[derive(Debug)]
pub enum SpliceError {
    /// Two spans in the op set overlap
    Overlap(Span, Span),
    /// A span has `end < start`
    Inverted(Span),
    /// A span extends past the end of the source
    OutOfRange(Span),
    /// The source is not valid UTF-8
    InvalidUtf8 {
        /// Byte offset of the offending byte in the source stream
        at: usize,
    },
    /// I/O error while reading the source
    Io(std::io::Error),
}

impl fmt::Display for SpliceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpliceError::Overlap(a, b) => write!(f, "overlapping spans: {} and {}", a, b),
            SpliceError::Inverted(span) => write!(f, "inverted span: {}", span),
            SpliceError::OutOfRange(span) => write!(f, "span out of range: {}", span),
            SpliceError::InvalidUtf8 { at } => write!(f, "invalid utf-8 in source at byte {}", at),
            SpliceError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for SpliceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SpliceError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SpliceError {
    fn from(err: std::io::Error) -> Self {
        SpliceError::Io(err)
    }
}

/// Progress state reported by an incremental [`Transform::transform`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Progress was made; call again with the remaining input
    Ok,
    /// More source bytes are needed to finish the current decision
    ShortSrc,
    /// The destination buffer lacks room for the next atomic write
    ShortDst,
    /// The whole source has been transformed
    Done,
}

/// The outcome of one incremental transform step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Bytes written to the destination buffer
    pub written: usize,
    /// Bytes consumed from the source buffer
    pub consumed: usize,
    /// What the transformer needs next
    pub status: Status,
}

/// An incremental byte-stream transformation.
///
/// Implementors consume source bytes and produce output bytes in bounded
/// chunks. `at_eof` tells the transformer that no source bytes exist past
/// the ones supplied; only then may it report [`Status::Done`]. The output
/// must be identical for any chunking of source and destination.
pub trait Transform {
    /// Transform as much of `src` into `dst` as possible.
    fn transform(&mut self, dst: &mut [u8], src: &[u8], at_eof: bool) -> Result<Step, SpliceError>;

    /// Reset internal state so the transformer can run another pass.
    fn reset(&mut self);
}

impl<T: Transform + ?Sized> Transform for &mut T {
    fn transform(&mut self, dst: &mut [u8], src: &[u8], at_eof: bool) -> Result<Step, SpliceError> {
        (**self).transform(dst, src, at_eof)
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}

pub(crate) enum Decoded {
    Char(char, usize),
    NeedMore,
    Invalid,
}

/// Decode the first rune of `src`. `NeedMore` covers both an empty slice
/// and a trailing incomplete sequence; the caller distinguishes them at
/// EOF.
pub(crate) fn decode_char(src: &[u8]) -> Decoded {
    if src.is_empty() {
        return Decoded::NeedMore;
    }
    let take = src.len().min(4);
    let window = match std::str::from_utf8(&src[..take]) {
        Ok(s) => s,
        Err(e) if e.valid_up_to() > 0 => match std::str::from_utf8(&src[..e.valid_up_to()]) {
            Ok(s) => s,
            Err(_) => return Decoded::Invalid,
        },
        Err(e) => {
            return match e.error_len() {
                None => Decoded::NeedMore,
                Some(_) => Decoded::Invalid,
            }
        }
    };
    match window.chars().next() {
        Some(c) => Decoded::Char(c, c.len_utf8()),
        None => Decoded::NeedMore,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Copying source runes through to the destination
    Copy,
    /// Writing out the current op's replacement bytes
    Emit,
    /// Discarding the source runes covered by the current op's span
    Skip,
}

/// Streaming splice transformer over a normalized set of [`Op`]s.
///
/// Construction sorts the ops by span start (stable, so insertions at the
/// same position keep their given order) and rejects inverted or
/// overlapping spans. One instance drives one pass; call
/// [`Transform::reset`] to run it again.
pub struct Splicer {
    ops: Vec<Op>,
    next: usize,
    pos: usize,
    byte_pos: usize,
    emitted: usize,
    mode: Mode,
    // trailing bytes of a copied rune that did not fit the destination
    pending: [u8; 4],
    pending_start: usize,
    pending_end: usize,
}

impl Splicer {
    /// Build a transformer from a set of edit operations.
    pub fn new(ops: impl IntoIterator<Item = Op>) -> Result<Splicer, SpliceError> {
        let mut ops: Vec<Op> = ops.into_iter().collect();
        for op in &ops {
            if op.span().end() < op.span().start() {
                return Err(SpliceError::Inverted(op.span()));
            }
        }
        ops.sort_by_key(|op| op.span().start());
        for pair in ops.windows(2) {
            if pair[0].span().end() > pair[1].span().start() {
                return Err(SpliceError::Overlap(pair[0].span(), pair[1].span()));
            }
        }
        Ok(Splicer {
            ops,
            next: 0,
            pos: 0,
            byte_pos: 0,
            emitted: 0,
            mode: Mode::Copy,
            pending: [0; 4],
            pending_start: 0,
            pending_end: 0,
        })
    }
}

impl Transform for Splicer {
    fn transform(&mut self, dst: &mut [u8], src: &[u8], at_eof: bool) -> Result<Step, SpliceError> {
        let mut written = 0;
        let mut consumed = 0;
        loop {
            if self.pending_start < self.pending_end {
                let rest = &self.pending[self.pending_start..self.pending_end];
                let n = rest.len().min(dst.len() - written);
                dst[written..written + n].copy_from_slice(&rest[..n]);
                written += n;
                self.pending_start += n;
                if self.pending_start < self.pending_end {
                    return Ok(Step {
                        written,
                        consumed,
                        status: Status::ShortDst,
                    });
                }
                self.pending_start = 0;
                self.pending_end = 0;
            }
            match self.mode {
                Mode::Emit => {
                    let rep = self.ops[self.next].replacement().as_bytes();
                    let rest = &rep[self.emitted..];
                    let n = rest.len().min(dst.len() - written);
                    dst[written..written + n].copy_from_slice(&rest[..n]);
                    written += n;
                    self.emitted += n;
                    if self.emitted < rep.len() {
                        return Ok(Step {
                            written,
                            consumed,
                            status: Status::ShortDst,
                        });
                    }
                    self.emitted = 0;
                    if self.ops[self.next].span().is_insertion() {
                        self.next += 1;
                        self.mode = Mode::Copy;
                    } else {
                        self.mode = Mode::Skip;
                    }
                }
                Mode::Skip => match decode_char(&src[consumed..]) {
                    Decoded::Char(_, n) => {
                        consumed += n;
                        self.byte_pos += n;
                        self.pos += 1;
                        if self.pos == self.ops[self.next].span().end() {
                            self.next += 1;
                            self.mode = Mode::Copy;
                        }
                    }
                    Decoded::NeedMore => {
                        if at_eof {
                            if consumed < src.len() {
                                return Err(SpliceError::InvalidUtf8 { at: self.byte_pos });
                            }
                            return Err(SpliceError::OutOfRange(self.ops[self.next].span()));
                        }
                        return Ok(Step {
                            written,
                            consumed,
                            status: Status::ShortSrc,
                        });
                    }
                    Decoded::Invalid => {
                        return Err(SpliceError::InvalidUtf8 { at: self.byte_pos })
                    }
                },
                Mode::Copy => {
                    if self.next < self.ops.len() && self.ops[self.next].span().start() == self.pos
                    {
                        self.mode = Mode::Emit;
                        continue;
                    }
                    match decode_char(&src[consumed..]) {
                        Decoded::Char(_, n) => {
                            let fits = n.min(dst.len() - written);
                            dst[written..written + fits]
                                .copy_from_slice(&src[consumed..consumed + fits]);
                            written += fits;
                            if fits < n {
                                // stash what did not fit; the rune is consumed
                                self.pending[..n - fits]
                                    .copy_from_slice(&src[consumed + fits..consumed + n]);
                                self.pending_start = 0;
                                self.pending_end = n - fits;
                            }
                            consumed += n;
                            self.byte_pos += n;
                            self.pos += 1;
                            if self.pending_end > 0 {
                                return Ok(Step {
                                    written,
                                    consumed,
                                    status: Status::ShortDst,
                                });
                            }
                        }
                        Decoded::NeedMore => {
                            if at_eof {
                                if consumed < src.len() {
                                    return Err(SpliceError::InvalidUtf8 { at: self.byte_pos });
                                }
                                if self.next < self.ops.len() {
                                    return Err(SpliceError::OutOfRange(
                                        self.ops[self.next].span(),
                                    ));
                                }
                                return Ok(Step {
                                    written,
                                    consumed,
                                    status: Status::Done,
                                });
                            }
                            return Ok(Step {
                                written,
                                consumed,
                                status: Status::ShortSrc,
                            });
                        }
                        Decoded::Invalid => {
                            return Err(SpliceError::InvalidUtf8 { at: self.byte_pos })
                        }
                    }
                }
            }
        }
    }

    fn reset(&mut self) {
        self.next = 0;
        self.pos = 0;
        self.byte_pos = 0;
        self.emitted = 0;
        self.mode = Mode::Copy;
        self.pending_start = 0;
        self.pending_end = 0;
    }
}

/// Apply a transform to an in-memory byte slice, driving the incremental
/// contract to completion.
pub fn transform_bytes<T: Transform + ?Sized>(
    t: &mut T,
    src: &[u8],
) -> Result<Vec<u8>, SpliceError> {
    let mut out = Vec::with_capacity(src.len() + 32);
    let mut buf = [0u8; 1024];
    let mut consumed = 0;
    loop {
        let step = t.transform(&mut buf, &src[consumed..], true)?;
        out.extend_from_slice(&buf[..step.written]);
        consumed += step.consumed;
        if step.status == Status::Done {
            return Ok(out);
        }
    }
}

/// Apply a transform to a string.
pub fn transform_string<T: Transform + ?Sized>(
    t: &mut T,
    src: &str,
) -> Result<String, SpliceError> {
    let out = transform_bytes(t, src.as_bytes())?;
    String::from_utf8(out).map_err(|e| SpliceError::InvalidUtf8 {
        at: e.utf8_error().valid_up_to(),
    })
}

const READER_BUF: usize = 8 * 1024;

/// A reader that pulls source bytes through a [`Transform`].
///
/// Wraps an inner reader and yields the transformed stream, keeping only a
/// bounded chunk of source in memory. Transform errors surface as
/// [`io::ErrorKind::InvalidData`].
pub struct TransformReader<R, T> {
    inner: R,
    transform: T,
    buf: Vec<u8>,
    start: usize,
    end: usize,
    eof: bool,
    done: bool,
}

impl<R: Read, T: Transform> TransformReader<R, T> {
    /// Wrap `inner`, transforming everything read from it.
    pub fn new(inner: R, transform: T) -> TransformReader<R, T> {
        TransformReader {
            inner,
            transform,
            buf: vec![0; READER_BUF],
            start: 0,
            end: 0,
            eof: false,
            done: false,
        }
    }

    /// Unwrap, returning the inner reader and the transform.
    pub fn into_inner(self) -> (R, T) {
        (self.inner, self.transform)
    }
}

impl<R: Read, T: Transform> Read for TransformReader<R, T> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() || self.done {
            return Ok(0);
        }
        loop {
            if self.start == self.end && !self.eof {
                self.start = 0;
                self.end = self.inner.read(&mut self.buf)?;
                if self.end == 0 {
                    self.eof = true;
                }
            }
            let step = self
                .transform
                .transform(out, &self.buf[self.start..self.end], self.eof)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            self.start += step.consumed;
            match step.status {
                Status::Done => {
                    self.done = true;
                    return Ok(step.written);
                }
                Status::ShortDst => return Ok(step.written),
                Status::Ok | Status::ShortSrc => {
                    if step.written > 0 {
                        return Ok(step.written);
                    }
                    if self.start < self.end && !self.eof {
                        // Incomplete trailing rune: keep it and refill behind it.
                        self.buf.copy_within(self.start..self.end, 0);
                        self.end -= self.start;
                        self.start = 0;
                        let n = self.inner.read(&mut self.buf[self.end..])?;
                        if n == 0 {
                            self.eof = true;
                        } else {
                            self.end += n;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splice(ops: Vec<Op>, src: &str) -> Result<String, SpliceError> {
        let mut t = Splicer::new(ops)?;
        transform_string(&mut t, src)
    }

    #[test]
    fn test_replace_middle() {
        let got = splice(vec![Span::new(1, 2).with("XYZ")], "abcd").unwrap();
        assert_eq!(got, "aXYZcd");
    }

    #[test]
    fn test_rune_positions_not_bytes() {
        let got = splice(vec![Span::new(1, 2).with("B")], "ábcd").unwrap();
        assert_eq!(got, "áBcd");
    }

    #[test]
    fn test_ops_table() {
        let cases: Vec<(&str, &str, Vec<Op>)> = vec![
            ("abcd", "abXcd", vec![Span::new(2, 2).with("X")]),
            ("abcd", "abd", vec![Span::new(2, 3).with("")]),
            ("abcd", "abYd", vec![Span::new(2, 3).with("Y")]),
            ("abcd", "ab x d", vec![Span::new(2, 3).with(" x ")]),
            ("ab x d", "abcd", vec![Span::new(2, 5).with("c")]),
            ("abcd", "abcd$", vec![Span::new(4, 4).with("$")]),
            ("abcd", "^abcd", vec![Span::new(0, 0).with("^")]),
            ("abcd", "", vec![Span::new(0, 4).with("")]),
            ("", "abcd", vec![Span::new(0, 0).with("abcd")]),
            (
                "abcd",
                "aBcD",
                vec![Span::new(1, 2).with("B"), Span::new(3, 4).with("D")],
            ),
            (
                "abcd",
                "aBaDa",
                vec![
                    Span::new(1, 2).with("Ba"),
                    Span::new(2, 3).with(""),
                    Span::new(3, 4).with("Da"),
                ],
            ),
        ];
        for (i, (src, want, ops)) in cases.into_iter().enumerate() {
            let got = splice(ops, src).unwrap();
            assert_eq!(got, want, "case {}", i);
        }
    }

    #[test]
    fn test_order_independence() {
        let a = splice(
            vec![Span::new(3, 4).with("D"), Span::new(1, 2).with("B")],
            "abcd",
        )
        .unwrap();
        assert_eq!(a, "aBcD");
    }

    #[test]
    fn test_adjacent_spans() {
        let got = splice(
            vec![Span::new(1, 2).with("X"), Span::new(2, 3).with("Y")],
            "abcd",
        )
        .unwrap();
        assert_eq!(got, "aXYd");
    }

    #[test]
    fn test_insertions_at_same_position_keep_order() {
        let got = splice(
            vec![Span::new(2, 2).with("X"), Span::new(2, 2).with("Y")],
            "abcd",
        )
        .unwrap();
        assert_eq!(got, "abXYcd");
    }

    #[test]
    fn test_empty_opset_is_identity() {
        let got = splice(vec![], "foo: bar\n# comment\n").unwrap();
        assert_eq!(got, "foo: bar\n# comment\n");
    }

    #[test]
    fn test_overlap_rejected() {
        let err = Splicer::new(vec![Span::new(1, 3).with("X"), Span::new(2, 4).with("Y")]);
        assert!(matches!(err, Err(SpliceError::Overlap(_, _))));
    }

    #[test]
    fn test_inverted_rejected() {
        let err = Splicer::new(vec![Span::new(3, 1).with("X")]);
        assert!(matches!(err, Err(SpliceError::Inverted(_))));
    }

    #[test]
    fn test_span_past_eof() {
        let err = splice(vec![Span::new(2, 9).with("X")], "abcd");
        assert!(matches!(err, Err(SpliceError::OutOfRange(_))));
        let err = splice(vec![Span::new(9, 9).with("X")], "abcd");
        assert!(matches!(err, Err(SpliceError::OutOfRange(_))));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut t = Splicer::new(vec![Span::new(1, 2).with("X")]).unwrap();
        let err = transform_bytes(&mut t, b"a\xffbc");
        assert!(matches!(err, Err(SpliceError::InvalidUtf8 { at: 1 })));
    }

    #[test]
    fn test_truncated_utf8_at_eof() {
        let mut t = Splicer::new(vec![]).unwrap();
        // first two bytes of a three-byte sequence
        let err = transform_bytes(&mut t, b"ab\xe2\x82");
        assert!(matches!(err, Err(SpliceError::InvalidUtf8 { .. })));
    }

    #[test]
    fn test_chunk_invariance() {
        let src = "aábécidofu";
        let ops = || {
            vec![
                Span::new(0, 0).with("^"),
                Span::new(2, 4).with("XY"),
                Span::new(7, 7).with("长"),
                Span::new(9, 10).with(""),
            ]
        };
        let mut t = Splicer::new(ops()).unwrap();
        let want = transform_string(&mut t, src).unwrap();

        let bytes = src.as_bytes();
        for src_chunk in 1..=bytes.len() {
            for dst_chunk in 1..=6 {
                let mut t = Splicer::new(ops()).unwrap();
                let mut out = Vec::new();
                let mut fed = 0;
                let mut buf = vec![0u8; dst_chunk];
                loop {
                    let limit = (fed + src_chunk).min(bytes.len());
                    let at_eof = limit == bytes.len();
                    let step = t.transform(&mut buf, &bytes[fed..limit], at_eof).unwrap();
                    out.extend_from_slice(&buf[..step.written]);
                    fed += step.consumed;
                    if step.status == Status::Done {
                        break;
                    }
                }
                assert_eq!(
                    String::from_utf8(out).unwrap(),
                    want,
                    "src chunk {} dst chunk {}",
                    src_chunk,
                    dst_chunk
                );
            }
        }
    }

    #[test]
    fn test_reset_allows_second_pass() {
        let mut t = Splicer::new(vec![Span::new(1, 2).with("B")]).unwrap();
        assert_eq!(transform_string(&mut t, "abcd").unwrap(), "aBcd");
        t.reset();
        assert_eq!(transform_string(&mut t, "axcd").unwrap(), "aBcd");
    }

    #[test]
    fn test_transform_reader() {
        let src = "abcdefgh";
        let t = Splicer::new(vec![Span::new(2, 4).with("XY"), Span::new(6, 6).with("!")])
            .unwrap();
        let mut reader = TransformReader::new(src.as_bytes(), t);
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "abXYef!gh");
    }
}
