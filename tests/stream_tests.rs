//! Streaming behavior: short-source and short-destination paths through
//! chunked readers and tiny buffers.

use std::io::Read;

use yaml_splice::{
    edit_string, peek, transform_string, Document, Span, Splicer, Status, Transform,
    TransformReader,
};

/// A reader that hands out at most `chunk` bytes per call.
struct Trickle<'a> {
    data: &'a [u8],
    pos: usize,
    chunk: usize,
}

impl<'a> Trickle<'a> {
    fn new(data: &'a [u8], chunk: usize) -> Trickle<'a> {
        Trickle { data, pos: 0, chunk }
    }
}

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

fn long_src() -> String {
    format!(
        "out:\n  foo: abc\n  other:\n    bar: xy\nbaz: end\nxxx: {}\nyyy: {}\nwww:\n  y: {}\n",
        "a".repeat(67),
        "y".repeat(67),
        "z".repeat(67),
    )
}

#[test]
fn test_long_values_exercise_short_paths() {
    let src = long_src();
    let foo_new = "edit test";
    let bar_new = format!("long\n{}", "z".repeat(160));

    let doc = Document::parse(&src).unwrap();
    let ops = vec![
        doc.replace("/out/foo", foo_new).unwrap(),
        doc.replace("/out/other/bar", &bar_new).unwrap(),
    ];
    let splicer = Splicer::new(ops).unwrap();

    // pull through a reader that trickles 7 source bytes at a time
    let mut out = String::new();
    TransformReader::new(Trickle::new(src.as_bytes(), 7), splicer)
        .read_to_string(&mut out)
        .unwrap();

    let edited = Document::parse(&out).unwrap();
    assert_eq!(edited.find("/out/foo").unwrap().value(), Some(foo_new));
    assert_eq!(
        edited.find("/out/other/bar").unwrap().value(),
        Some(bar_new.as_str())
    );
}

#[test]
fn test_chunk_invariance_of_document_edit() {
    let src = "metadata:\n  name: \"foo\"\n  namespace: myns\nnote: ünïcödé\n";
    let doc = Document::parse(src).unwrap();
    let ops = || {
        vec![
            doc.replace("/metadata/name", "bar").unwrap(),
            doc.replace("/note", "done").unwrap(),
        ]
    };

    let mut single = Splicer::new(ops()).unwrap();
    let want = transform_string(&mut single, src).unwrap();

    for chunk in [1, 2, 3, 5, 8, 64] {
        for dst_size in [1, 3, 17] {
            let mut t = Splicer::new(ops()).unwrap();
            let bytes = src.as_bytes();
            let mut fed = 0;
            let mut buf = vec![0u8; dst_size];
            let mut out = Vec::new();
            loop {
                let limit = (fed + chunk).min(bytes.len());
                let step = t
                    .transform(&mut buf, &bytes[fed..limit], limit == bytes.len())
                    .unwrap();
                out.extend_from_slice(&buf[..step.written]);
                fed += step.consumed;
                if step.status == Status::Done {
                    break;
                }
            }
            assert_eq!(
                String::from_utf8(out).unwrap(),
                want,
                "chunk {} dst {}",
                chunk,
                dst_size
            );
        }
    }
}

#[test]
fn test_peek_over_trickling_reader() {
    let src = "abcdefgh";
    let got = peek(
        Trickle::new(src.as_bytes(), 3),
        &[Span::new(5, 8), Span::new(0, 2)],
    )
    .unwrap();
    assert_eq!(got, vec!["fgh", "ab"]);
}

#[test]
fn test_peek_previews_edit_targets() {
    let src = "metadata:\n  name: \"foo\"\n  namespace: myns\n";
    let doc = Document::parse(src).unwrap();
    let name = doc.replace("/metadata/name", "x").unwrap();
    let ns = doc.replace("/metadata/namespace", "x").unwrap();

    let got = peek(src.as_bytes(), &[name.span(), ns.span()]).unwrap();
    assert_eq!(got, vec!["\"foo\"", "myns"]);
}

#[test]
fn test_output_identical_between_string_and_reader_paths() {
    let src = "a: one\nb: \"two\"\nc: |\n  three\n";
    let edits: &[(&str, &str)] = &[("/a", "1"), ("/b", "2"), ("/c", "3\n4\n")];
    let via_string = edit_string(src, edits).unwrap();

    let doc = Document::parse(src).unwrap();
    let ops: Vec<_> = edits
        .iter()
        .map(|(p, v)| doc.replace(p, v).unwrap())
        .collect();
    let mut via_reader = String::new();
    TransformReader::new(Trickle::new(src.as_bytes(), 2), Splicer::new(ops).unwrap())
        .read_to_string(&mut via_reader)
        .unwrap();

    assert_eq!(via_string, via_reader);
}
