#![no_main]

use libfuzzer_sys::fuzz_target;
use yaml_splice::{format_scalar, Document};

fuzz_target!(|data: &[u8]| {
    let Ok(value) = std::str::from_utf8(data) else {
        return;
    };
    if value.len() > 100_000 {
        return;
    }

    // Formatting any string must produce a document that parses back to
    // the same value (the empty string reads back as null).
    let formatted = format_scalar(value, 2);
    let doc = format!("k: {}\n", formatted);
    let parsed = match Document::parse(&doc) {
        Ok(parsed) => parsed,
        Err(e) => panic!("formatted scalar does not parse: {}\ninput: {:?}", e, value),
    };
    let node = parsed.find("/k").expect("formatted scalar vanished");
    if value.is_empty() {
        assert_eq!(node.tag(), "!!null");
    } else {
        assert_eq!(node.value(), Some(value), "formatted as {:?}", formatted);
        assert_eq!(node.tag(), "!!str");
    }
});
