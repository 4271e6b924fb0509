//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while converting between application and
/// database values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// No field type is registered under this name.
    #[error("unknown field type: {type_name}")]
    UnknownType {
        /// Name that was looked up.
        type_name: String,
    },

    /// The value variant does not match what the field type handles.
    #[error("type mismatch for {type_name}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Field type performing the conversion.
        type_name: String,
        /// Variant the field type accepts.
        expected: &'static str,
        /// Variant that was supplied.
        actual: &'static str,
    },

    /// The value has the right variant but cannot be parsed or represented.
    #[error("invalid value for {type_name}: {message}")]
    InvalidValue {
        /// Field type performing the conversion.
        type_name: String,
        /// Description of the problem.
        message: String,
    },
}

impl CodecError {
    /// Create an unknown type error.
    pub fn unknown_type(type_name: impl Into<String>) -> Self {
        Self::UnknownType {
            type_name: type_name.into(),
        }
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(
        type_name: impl Into<String>,
        expected: &'static str,
        actual: &'static str,
    ) -> Self {
        Self::TypeMismatch {
            type_name: type_name.into(),
            expected,
            actual,
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}
