//! Crate level errors.

use thiserror::Error;

use crate::identity::UPSTREAM_IDENTIFIER;
use crate::object::{KubeObjectFieldsError, SubObjectFieldsError};
use crate::variant::VariantError;
use crate::yaml::ParseError;

/// Result is the result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error is the error returned by object, resource list and pipeline
/// operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to parse input: {0}")]
    Parse(String),

    #[error(transparent)]
    KubeObjectFields(#[from] KubeObjectFieldsError),

    #[error(transparent)]
    SubObjectFields(#[from] SubObjectFieldsError),

    #[error("{} is a reserved annotation and must not be modified", UPSTREAM_IDENTIFIER)]
    AttemptToTouchUpstreamIdentifier,

    #[error("duplicate Resource(apiVersion={api_version}, kind={kind}, Namespace={namespace}, Name={name})")]
    DuplicateResource {
        api_version: String,
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("unable to find the functionConfig in the resourceList")]
    MissingFunctionConfig,

    #[error("{0}")]
    InvalidFunctionConfig(String),

    #[error("{0}")]
    InvalidAnnotations(String),

    #[error(transparent)]
    Serialization(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("error: function failure")]
    FunctionFailure,
}

impl Error {
    /// Creates a parse error.
    pub fn parse(message: impl std::fmt::Display) -> Self {
        Error::Parse(message.to_string())
    }

    /// Returns true if the error was caused by a write to the upstream
    /// identifier annotation, whichever layer reported it.
    pub fn is_upstream_identifier_violation(&self) -> bool {
        match self {
            Error::AttemptToTouchUpstreamIdentifier => true,
            Error::KubeObjectFields(e) => matches!(e.cause, VariantError::ReservedAnnotation { .. }),
            Error::SubObjectFields(e) => matches!(e.cause, VariantError::ReservedAnnotation { .. }),
            _ => false,
        }
    }

    /// Returns true for the structured field errors raised by object
    /// accessors.
    pub fn is_field_error(&self) -> bool {
        matches!(self, Error::KubeObjectFields(_) | Error::SubObjectFields(_))
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_message() {
        let err = Error::DuplicateResource {
            api_version: "v1".to_string(),
            kind: "Namespace".to_string(),
            namespace: String::new(),
            name: "example".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "duplicate Resource(apiVersion=v1, kind=Namespace, Namespace=, Name=example)"
        );
    }

    #[test]
    fn test_upstream_identifier_violation() {
        assert!(Error::AttemptToTouchUpstreamIdentifier.is_upstream_identifier_violation());
        let wrapped = Error::SubObjectFields(SubObjectFieldsError {
            path: ".metadata".to_string(),
            expected: "map".to_string(),
            cause: VariantError::ReservedAnnotation {
                key: UPSTREAM_IDENTIFIER.to_string(),
            },
        });
        assert!(wrapped.is_upstream_identifier_violation());
        assert!(!Error::FunctionFailure.is_upstream_identifier_violation());
    }

    #[test]
    fn test_field_errors() {
        let err = Error::KubeObjectFields(KubeObjectFieldsError {
            api_version: "apps/v1".to_string(),
            kind: "Deployment".to_string(),
            name: "web".to_string(),
            path: ".spec.replicas".to_string(),
            expected: "int".to_string(),
            cause: VariantError::not_found(".spec.replicas"),
        });
        assert!(err.is_field_error());
        assert!(!Error::MissingFunctionConfig.is_field_error());

        let encode: Error = serde_yaml::from_str::<u8>("[").unwrap_err().into();
        assert!(matches!(encode, Error::Serialization(_)));
        assert!(!encode.is_field_error());
    }
}
