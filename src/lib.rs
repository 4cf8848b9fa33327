#![deny(missing_docs)]
#![warn(clippy::unnecessary_to_owned)]
#![warn(clippy::redundant_clone)]
#![warn(clippy::inefficient_to_string)]
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

//! In-place YAML editing that preserves formatting.
//!
//! Edits are `(span, replacement)` pairs over rune positions in the
//! original source, applied by a streaming transformer; replacements for
//! YAML scalars are re-quoted so the original quoting style survives
//! wherever it can.

mod error;
mod file;
mod node;
mod parse;
mod peek;
mod quote;
mod span;
mod splice;

pub use error::{EditError, EditResult};
pub use file::{edit_file, transform_file};
pub use node::{node_op, Style};
pub use parse::{edit_bytes, edit_string, Document, Node};
pub use peek::peek;
pub use quote::{format_scalar, requote, try_single_quoted};
pub use span::{Op, Span};
pub use splice::{
    transform_bytes, transform_string, SpliceError, Splicer, Status, Step, Transform,
    TransformReader,
};
