//! Pre-edit preview of the text covered by a set of spans.

use std::io::Read;

use crate::span::Span;
use crate::splice::{decode_char, Decoded, SpliceError};

/// Read `reader` once and return, for each span, the original substring it
/// covers.
///
/// Results come back in the order the spans were given, not in source
/// order. Spans must not overlap; a zero-width span yields an empty
/// string. A span reaching past the end of the stream is an error.
pub fn peek<R: Read>(mut reader: R, spans: &[Span]) -> Result<Vec<String>, SpliceError> {
    for span in spans {
        if span.end() < span.start() {
            return Err(SpliceError::Inverted(*span));
        }
    }
    let mut order: Vec<usize> = (0..spans.len()).collect();
    order.sort_by_key(|&i| spans[i].start());
    for pair in order.windows(2) {
        let (a, b) = (spans[pair[0]], spans[pair[1]]);
        if a.end() > b.start() {
            return Err(SpliceError::Overlap(a, b));
        }
    }

    let mut results = vec![String::new(); spans.len()];
    let mut buf = [0u8; 8 * 1024];
    let mut carry_len = 0;
    let mut pos = 0; // rune position in the stream
    let mut byte_pos = 0;
    let mut idx = 0; // first span in `order` not yet fully collected

    loop {
        let n = reader.read(&mut buf[carry_len..])?;
        let at_eof = n == 0;
        let avail = carry_len + n;
        let mut off = 0;
        while off < avail {
            match decode_char(&buf[off..avail]) {
                Decoded::Char(c, w) => {
                    while idx < order.len() && spans[order[idx]].end() <= pos {
                        idx += 1;
                    }
                    if idx < order.len() && spans[order[idx]].start() <= pos {
                        results[order[idx]].push(c);
                    }
                    off += w;
                    byte_pos += w;
                    pos += 1;
                }
                Decoded::NeedMore => break,
                Decoded::Invalid => return Err(SpliceError::InvalidUtf8 { at: byte_pos }),
            }
        }
        carry_len = avail - off;
        if at_eof {
            if carry_len > 0 {
                return Err(SpliceError::InvalidUtf8 { at: byte_pos });
            }
            for span in spans {
                if span.end() > pos {
                    return Err(SpliceError::OutOfRange(*span));
                }
            }
            return Ok(results);
        }
        buf.copy_within(off..avail, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str, spans: &[Span]) -> Vec<String> {
        peek(src.as_bytes(), spans).unwrap()
    }

    #[test]
    fn test_peek_table() {
        assert_eq!(run("abcd", &[Span::new(1, 2)]), vec!["b"]);
        assert_eq!(
            run("abcd", &[Span::new(1, 2), Span::new(2, 3)]),
            vec!["b", "c"]
        );
        assert_eq!(run("abcd", &[Span::new(1, 3)]), vec!["bc"]);
        assert_eq!(run("abcd", &[Span::new(0, 4)]), vec!["abcd"]);
        assert_eq!(run("abcd", &[Span::new(3, 4)]), vec!["d"]);
        assert_eq!(run("abcd", &[Span::new(4, 4)]), vec![""]);
        assert_eq!(
            run("abcd", &[Span::new(1, 3), Span::new(3, 4)]),
            vec!["bc", "d"]
        );
    }

    #[test]
    fn test_peek_preserves_caller_order() {
        assert_eq!(
            run("abcd", &[Span::new(3, 4), Span::new(1, 3)]),
            vec!["d", "bc"]
        );
    }

    #[test]
    fn test_peek_unicode() {
        assert_eq!(run("ábécid", &[Span::new(2, 4)]), vec!["éc"]);
    }

    #[test]
    fn test_peek_out_of_range() {
        let err = peek("abcd".as_bytes(), &[Span::new(2, 9)]);
        assert!(matches!(err, Err(SpliceError::OutOfRange(_))));
    }

    #[test]
    fn test_peek_overlap_rejected() {
        let err = peek("abcd".as_bytes(), &[Span::new(0, 2), Span::new(1, 3)]);
        assert!(matches!(err, Err(SpliceError::Overlap(_, _))));
    }
}
