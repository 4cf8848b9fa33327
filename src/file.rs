//! Atomic in-place file transformation.
//!
//! The transformed content is streamed into a temporary file in the same
//! directory as the target, so the final rename happens on one volume and
//! every other process sees either the old file or the new one, never a
//! half-written mix. The target is replaced only on clean completion; any
//! error leaves it untouched and removes the temporary file.

use std::fs::File;
use std::io;
use std::path::Path;

use crate::error::{EditError, EditResult};
use crate::parse::Document;
use crate::splice::{Splicer, Transform, TransformReader};

/// Stream `path` through `transform` and atomically replace it with the
/// result, preserving the file's permissions.
pub fn transform_file<T: Transform>(transform: T, path: impl AsRef<Path>) -> EditResult<()> {
    let path = path.as_ref();
    let src = File::open(path)?;
    let perm = src.metadata()?.permissions();

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix("~")
        .tempfile_in(dir.unwrap_or_else(|| Path::new(".")))?;

    let mut reader = TransformReader::new(io::BufReader::new(src), transform);
    io::copy(&mut reader, tmp.as_file_mut())?;
    tmp.as_file().set_permissions(perm)?;
    tmp.persist(path).map_err(|e| EditError::Io(e.error))?;
    Ok(())
}

/// Apply a batch of `(pointer, value)` edits to a YAML file in place.
///
/// The file is read once to resolve node positions, then streamed through
/// the splice transformer into the atomic replacement.
pub fn edit_file(path: impl AsRef<Path>, edits: &[(&str, &str)]) -> EditResult<()> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)?;
    let doc = Document::parse(&source)?;
    let mut ops = Vec::with_capacity(edits.len());
    for (pointer, value) in edits {
        ops.push(doc.replace(pointer, value)?);
    }
    let splicer = Splicer::new(ops)?;
    transform_file(splicer, path)
}
