//! Error types for machine-template generation
//!
//! Errors are grouped by how a reconciler should react to them: `NotReady`
//! requeues quietly, `InvalidInput` is surfaced to the user, `NotFound` reports
//! a release-image gap, and `Internal` is propagated as-is.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for template builders and the scale-from-zero annotator
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A transient precondition is unmet (e.g. a security group not created yet)
    #[error("{message}")]
    NotReady {
        /// Description of what is still missing
        message: String,
    },

    /// The input violates a contract enforced by the builders
    ///
    /// The display form is the bare message: callers and admission parsers
    /// match on these strings.
    #[error("{message}")]
    InvalidInput {
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "spec.platform.azure.subnetID")
        field: Option<String>,
    },

    /// A lookup in the release image (architecture, region, image) failed
    #[error("{message}")]
    NotFound {
        /// Description of what was not found
        message: String,
        /// The kind of thing looked up (e.g. "architecture", "region")
        kind: Option<String>,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "ssh", "catalog", "hash")
        context: String,
    },
}

impl Error {
    /// Create a not-ready error
    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady {
            message: msg.into(),
        }
    }

    /// Create an invalid-input error with the given message
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
            field: None,
        }
    }

    /// Create an invalid-input error with a field path
    pub fn invalid_input_for_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a not-found error for a specific kind of lookup
    pub fn not_found_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::NotFound {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// True for the requeue-without-escalation case
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Error::NotReady { .. })
    }

    /// Check if this error is retryable
    ///
    /// Invalid input needs a spec change and a missing release entry needs a
    /// different release, so neither is retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::NotReady { .. } => true,
            Error::InvalidInput { .. } => false,
            Error::NotFound { .. } => false,
            Error::Internal { .. } => true,
        }
    }

    /// Get the field path if this error names one
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::InvalidInput { field, .. } => field.as_deref(),
            _ => None,
        }
    }

    /// Get the context if this error has one
    pub fn context(&self) -> Option<&str> {
        match self {
            Error::Internal { context, .. } => Some(context),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::internal_with_context("serialization", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Story: a missing security group is a requeue, not a failure
    #[test]
    fn story_not_ready_is_distinguishable() {
        let err = Error::not_ready("the default security group for the HostedCluster has not been created");
        assert!(err.is_not_ready());
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "the default security group for the HostedCluster has not been created"
        );

        assert!(!Error::invalid_input("bad").is_not_ready());
        assert!(!Error::not_found("gone").is_not_ready());
        assert!(!Error::internal("boom").is_not_ready());
    }

    /// Story: invalid input displays the bare message so callers can match it
    #[test]
    fn story_invalid_input_message_is_verbatim() {
        let err = Error::invalid_input(
            "either ImageID or AzureMarketplace needs to be provided for the Azure machine",
        );
        assert_eq!(
            err.to_string(),
            "either ImageID or AzureMarketplace needs to be provided for the Azure machine"
        );
        assert!(!err.is_retryable());
        assert_eq!(err.field(), None);

        let err = Error::invalid_input_for_field("spec.platform.aws", "aws platform not populated");
        assert_eq!(err.field(), Some("spec.platform.aws"));
    }

    #[test]
    fn test_not_found_kind() {
        let err = Error::not_found_kind("architecture", "couldn't find OS metadata for architecture \"ppc64le\"");
        match &err {
            Error::NotFound { kind, .. } => assert_eq!(kind.as_deref(), Some("architecture")),
            _ => panic!("Expected NotFound variant"),
        }
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_internal_error_with_context() {
        let err = Error::internal_with_context("ssh", "rsa key generation failed");
        assert!(err.is_retryable());
        assert_eq!(err.context(), Some("ssh"));
        assert!(err.to_string().contains("[ssh]"));
        assert!(err.to_string().contains("rsa key generation failed"));
    }

    #[test]
    fn test_internal_error_default_context() {
        let err = Error::internal("unexpected state");
        assert_eq!(err.context(), Some(super::UNKNOWN_CONTEXT));
        assert!(err.to_string().contains("[unknown]"));
    }

    #[test]
    fn test_serde_json_error_converts_to_internal() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = parse_err.into();
        assert_eq!(err.context(), Some("serialization"));
    }
}
