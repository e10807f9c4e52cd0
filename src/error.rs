//! Error types for the rsal library.

use crate::value::ValueKind;
use thiserror::Error;

/// Result type alias for rsal operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while parsing, converting and exporting logs.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed JSON text. `position` is the byte offset where parsing stopped.
    #[error("{message} at position {position}{}", context_suffix(.context))]
    Parse {
        position: usize,
        message: String,
        context: Option<String>,
    },

    /// A value accessor was used on a value of a different shape.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: ValueKind, found: ValueKind },

    /// Error when a key is not present in an object.
    #[error("field '{field}' not found")]
    FieldNotFound { field: String },

    /// Array access past the last element.
    #[error("index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A field is present with the right shape but an unusable value.
    #[error("field '{field}' with value '{value}' is invalid: {reason}")]
    InvalidField {
        field: String,
        value: String,
        reason: String,
    },

    /// Input bytes are not valid UTF-8.
    #[error("input is not valid UTF-8: {source}")]
    Encoding {
        #[from]
        source: std::string::FromUtf8Error,
    },

    /// IO error when reading input files or writing exports.
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

fn context_suffix(context: &Option<String>) -> String {
    match context {
        Some(ctx) => format!(" (near '{}')", ctx),
        None => String::new(),
    }
}

impl Error {
    /// Create a new parse error without context.
    pub fn parse_error(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
            context: None,
        }
    }

    /// Create a new parse error carrying the offending text.
    pub fn parse_error_with_context(
        position: usize,
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::Parse {
            position,
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create a new type mismatch error.
    pub fn type_mismatch(expected: ValueKind, found: ValueKind) -> Self {
        Self::TypeMismatch { expected, found }
    }

    /// Create a new field not found error.
    pub fn field_not_found(field: impl Into<String>) -> Self {
        Self::FieldNotFound {
            field: field.into(),
        }
    }

    /// Create a new index out of bounds error.
    pub fn index_out_of_bounds(index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds { index, len }
    }

    /// Create a new invalid field error.
    pub fn invalid_field(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Byte position of a parse error, if this is one.
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Parse { position, .. } => Some(*position),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = Error::parse_error(7, "unexpected character");
        assert_eq!(err.to_string(), "unexpected character at position 7");
        assert_eq!(err.position(), Some(7));

        let err = Error::parse_error_with_context(3, "invalid literal", "nul");
        assert_eq!(err.to_string(), "invalid literal at position 3 (near 'nul')");
    }

    #[test]
    fn test_type_mismatch_display() {
        let err = Error::type_mismatch(ValueKind::String, ValueKind::Number);
        assert_eq!(err.to_string(), "type mismatch: expected string, found number");
        assert_eq!(err.position(), None);
    }
}
