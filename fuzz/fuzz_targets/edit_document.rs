#![no_main]

use libfuzzer_sys::fuzz_target;
use yaml_splice::{edit_string, Document};

fuzz_target!(|data: &[u8]| {
    let Ok(src) = std::str::from_utf8(data) else {
        return;
    };
    if src.len() > 100_000 {
        return;
    }

    // Parsing must never panic, and editing the first top-level scalar
    // value must leave a document that still parses.
    let Ok(doc) = Document::parse(src) else {
        return;
    };
    let Some(entries) = doc.root().and_then(|root| root.entries()) else {
        return;
    };
    let Some(key) = entries
        .iter()
        .find(|(_, v)| v.scalar().is_some())
        .and_then(|(k, _)| k.value())
    else {
        return;
    };
    let pointer = format!("/{}", key.replace('~', "~0").replace('/', "~1"));
    if let Ok(out) = edit_string(src, &[(&pointer, "fuzzed")]) {
        Document::parse(&out).expect("edited document no longer parses");
    }
});
