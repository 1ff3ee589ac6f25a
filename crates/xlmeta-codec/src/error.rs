use thiserror::Error;

use crate::path::FieldPath;

/// Errors from encoding or decoding metadata envelopes.
///
/// Every variant carries the [`FieldPath`] where the failure occurred.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed header at {path}: {reason}")]
    MalformedHeader { path: FieldPath, reason: String },

    #[error("unknown {what} value {value} at {path}")]
    UnknownVariant {
        path: FieldPath,
        what: &'static str,
        value: u64,
    },

    #[error("journal index {index} out of range for {len} entries")]
    IndexOutOfRange {
        path: FieldPath,
        index: i64,
        len: usize,
    },

    #[error("input truncated at {path}")]
    Truncated { path: FieldPath },

    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: FieldPath,
        expected: &'static str,
        found: String,
    },

    #[error("integer overflow at {path}")]
    Overflow { path: FieldPath },

    #[error("missing required field {path}")]
    MissingField { path: FieldPath },

    #[error("invalid value at {path}: {reason}")]
    Invalid { path: FieldPath, reason: String },

    #[error("{what} length {actual} at {path} exceeds limit {limit}")]
    LimitExceeded {
        path: FieldPath,
        what: &'static str,
        limit: usize,
        actual: usize,
    },

    #[error("encoding failed at {path}: {reason}")]
    Encode { path: FieldPath, reason: String },
}

/// Fieldless discriminant of [`CodecError`], for matching without the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedHeader,
    UnknownVariant,
    IndexOutOfRange,
    Truncated,
    TypeMismatch,
    Overflow,
    MissingField,
    Invalid,
    LimitExceeded,
    Encode,
}

impl CodecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedHeader { .. } => ErrorKind::MalformedHeader,
            Self::UnknownVariant { .. } => ErrorKind::UnknownVariant,
            Self::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Self::Truncated { .. } => ErrorKind::Truncated,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::Overflow { .. } => ErrorKind::Overflow,
            Self::MissingField { .. } => ErrorKind::MissingField,
            Self::Invalid { .. } => ErrorKind::Invalid,
            Self::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            Self::Encode { .. } => ErrorKind::Encode,
        }
    }

    /// Where in the envelope the error occurred.
    pub fn path(&self) -> &FieldPath {
        match self {
            Self::MalformedHeader { path, .. }
            | Self::UnknownVariant { path, .. }
            | Self::IndexOutOfRange { path, .. }
            | Self::Truncated { path }
            | Self::TypeMismatch { path, .. }
            | Self::Overflow { path }
            | Self::MissingField { path }
            | Self::Invalid { path, .. }
            | Self::LimitExceeded { path, .. }
            | Self::Encode { path, .. } => path,
        }
    }
}

pub type CodecResult<T> = Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_path() {
        let mut path = FieldPath::key("journal");
        path.push_index(3);
        let err = CodecError::Truncated { path };
        assert_eq!(err.to_string(), "input truncated at journal[3]");
    }

    #[test]
    fn kind_and_path_accessors() {
        let err = CodecError::IndexOutOfRange {
            path: FieldPath::key("journal"),
            index: 5,
            len: 2,
        };
        assert_eq!(err.kind(), ErrorKind::IndexOutOfRange);
        assert_eq!(err.path().to_string(), "journal");
        assert!(err.to_string().contains("index 5"));
    }
}
