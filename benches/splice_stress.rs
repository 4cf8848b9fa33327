use criterion::{black_box, criterion_group, criterion_main, Criterion};
use yaml_splice::{edit_string, transform_string, Span, Splicer};

fn synthetic_doc(entries: usize) -> String {
    let mut doc = String::from("metadata:\n  name: \"stress\"\n");
    doc.push_str("spec:\n");
    for i in 0..entries {
        doc.push_str(&format!("  key{}: value{}  # comment {}\n", i, i, i));
    }
    doc.push_str("status: |\n  multi\n  line\n");
    doc
}

fn bench_raw_splice(c: &mut Criterion) {
    let src = "x".repeat(64 * 1024);
    c.bench_function("splice_64k_16_ops", |b| {
        b.iter(|| {
            let ops = (0..16).map(|i| Span::new(i * 4000, i * 4000 + 10).with("REPLACED"));
            let mut t = Splicer::new(ops).unwrap();
            black_box(transform_string(&mut t, black_box(&src)).unwrap())
        })
    });
}

fn bench_document_edit(c: &mut Criterion) {
    let src = synthetic_doc(200);
    c.bench_function("edit_200_entry_document", |b| {
        b.iter(|| {
            black_box(
                edit_string(
                    black_box(&src),
                    &[
                        ("/metadata/name", "renamed"),
                        ("/spec/key0", "first"),
                        ("/spec/key199", "last"),
                        ("/status", "re\nplaced\n"),
                    ],
                )
                .unwrap(),
            )
        })
    });
}

criterion_group!(benches, bench_raw_splice, bench_document_edit);
criterion_main!(benches);
