//! Error types for yaml-splice

use std::fmt;

use crate::splice::SpliceError;

/// Errors that can occur when editing YAML documents
#[derive(Debug)]
pub enum EditError {
    /// An error reported by the splice transformer
    Splice(SpliceError),
    /// The YAML source could not be parsed, or a node position does not
    /// match the source text
    Parse(String),
    /// A JSON-pointer path did not resolve to a node
    PointerNotFound(String),
    /// The target node cannot be edited (flow collections, aliases,
    /// multi-line plain scalars)
    UnsupportedStyle(String),
    /// The target node has the wrong kind (e.g. a mapping where a scalar
    /// is required)
    TypeMismatch(String),
    /// A scalar value cannot be formatted in any supported style
    Format(String),
    /// I/O error when reading or writing files
    Io(std::io::Error),
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::Splice(err) => write!(f, "{}", err),
            EditError::Parse(msg) => write!(f, "parse error: {}", msg),
            EditError::PointerNotFound(ptr) => write!(f, "path not found: '{}'", ptr),
            EditError::UnsupportedStyle(msg) => write!(f, "unsupported scalar style: {}", msg),
            EditError::TypeMismatch(msg) => write!(f, "type mismatch: {}", msg),
            EditError::Format(msg) => write!(f, "cannot format scalar: {}", msg),
            EditError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for EditError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EditError::Splice(err) => Some(err),
            EditError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SpliceError> for EditError {
    fn from(err: SpliceError) -> Self {
        EditError::Splice(err)
    }
}

impl From<std::io::Error> for EditError {
    fn from(err: std::io::Error) -> Self {
        EditError::Io(err)
    }
}

/// Result type for yaml-splice operations
pub type EditResult<T> = Result<T, EditError>;
