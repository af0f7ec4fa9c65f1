//! Error types for the NIF object model.

use thiserror::Error;

/// Coarse failure class of an [`Error`].
///
/// Hosts use this to decide how loud to be: schema problems are fatal at
/// startup, load and write failures abort one operation, condition failures
/// only ever get logged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed schema description.
    Schema,
    /// Whole-file load failure (bad banner, version, truncation, unknown block).
    Load,
    /// A single field violated a length or range guard.
    FieldDecode,
    /// Short or failed write to the sink.
    Write,
    /// Malformed condition or array expression.
    ConditionEval,
    /// Anything else.
    Other,
}

/// Main error type for schema, codec and document operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or inconsistent schema description
    #[error("Schema error: {0}")]
    Schema(String),

    /// Schema or settings JSON could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Header banner is not one of the recognised NIF prefixes
    #[error("Not a NIF file: {0:?}")]
    InvalidMagic(String),

    /// Version number is not listed by the schema
    #[error("Unsupported NIF version: 0x{0:08X}")]
    UnsupportedVersion(u32),

    /// Stream is truncated
    #[error("Unexpected end of file at position {0}")]
    UnexpectedEof(u64),

    /// Block type name not declared by the schema
    #[error("Unknown block type {type_name:?} at block {index}")]
    UnknownBlock { index: usize, type_name: String },

    /// A field's bytes violate a length or range guard
    #[error("Cannot decode {kind} field: {reason}")]
    FieldDecode { kind: String, reason: String },

    /// Malformed condition or array expression
    #[error("Expression error: {0}")]
    Condition(String),

    /// Write to the sink failed
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Invalid data structure in file or tree
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Create a schema error.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Create a field decode error for the given value kind.
    pub fn decode(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FieldDecode { kind: kind.into(), reason: reason.into() }
    }

    /// Failure class of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Schema(_) | Self::Json(_) => ErrorCategory::Schema,
            Self::InvalidMagic(_)
            | Self::UnsupportedVersion(_)
            | Self::UnexpectedEof(_)
            | Self::UnknownBlock { .. }
            | Self::InvalidStructure(_)
            | Self::Utf8(_) => ErrorCategory::Load,
            Self::FieldDecode { .. } => ErrorCategory::FieldDecode,
            Self::WriteFailed(_) => ErrorCategory::Write,
            Self::Condition(_) => ErrorCategory::ConditionEval,
            Self::Io(_) | Self::Other(_) => ErrorCategory::Other,
        }
    }
}

/// Result type alias for NIF operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::UnsupportedVersion(0x14000005);
        assert!(e.to_string().contains("0x14000005"));

        let e = Error::UnknownBlock { index: 3, type_name: "NiFoo".into() };
        assert!(e.to_string().contains("NiFoo"));
        assert!(e.to_string().contains('3'));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_categories() {
        assert_eq!(Error::schema("x").category(), ErrorCategory::Schema);
        assert_eq!(Error::UnexpectedEof(4).category(), ErrorCategory::Load);
        assert_eq!(Error::decode("SizedString", "too long").category(), ErrorCategory::FieldDecode);
        assert_eq!(Error::WriteFailed("x".into()).category(), ErrorCategory::Write);
        assert_eq!(Error::Condition("(".into()).category(), ErrorCategory::ConditionEval);
    }
}
