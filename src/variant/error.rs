//! Errors of the variant layer.

use thiserror::Error;

/// VariantError represents a failed navigation or conversion on a node tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariantError {
    #[error("{path}: type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("{path}: field doesn't exist")]
    NotFound { path: String },

    #[error("invalid selector {actual:?}: expected YOUR_KEY=YOUR_VALUE")]
    InvalidSelector { actual: String },

    #[error("empty field path")]
    EmptyPath,

    #[error("{path}: failed to decode: {message}")]
    Decode { path: String, message: String },

    #[error("failed to encode: {message}")]
    Encode { message: String },

    #[error("{key} is a reserved annotation and can only be changed through its dedicated setter")]
    ReservedAnnotation { key: String },
}

impl VariantError {
    /// Creates a type mismatch error.
    pub fn type_mismatch(path: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        VariantError::TypeMismatch {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        VariantError::NotFound { path: path.into() }
    }

    /// Creates an invalid selector error.
    pub fn invalid_selector(actual: impl Into<String>) -> Self {
        VariantError::InvalidSelector { actual: actual.into() }
    }

    /// Creates a decode error.
    pub fn decode(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        VariantError::Decode {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Creates an encode error.
    pub fn encode(message: impl std::fmt::Display) -> Self {
        VariantError::Encode {
            message: message.to_string(),
        }
    }
}
