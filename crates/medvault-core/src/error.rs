//! Unified error system for the document pipeline
//!
//! One error enum covers the whole taxonomy so every crate propagates the
//! same type with `?`. Variants map one-to-one onto caller-visible outcomes:
//! rejected input, duplicate content, integrity violations, state-machine
//! misuse, and unreachable collaborators.

use crate::identifiers::DocumentId;
use crate::record::VerificationState;

/// Result alias used across all pipeline crates.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Unified error type for all document pipeline operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    /// Input failed validation. Reported synchronously, never retried.
    #[error("validation rejected: {reason}")]
    ValidationRejected {
        /// Why the content was rejected.
        reason: String,
    },

    /// Byte-identical content already stored. Not a failure; the caller is
    /// redirected to the existing record.
    #[error("content already stored as {existing}")]
    DuplicateContent {
        /// Identifier of the record that owns this content.
        existing: DocumentId,
    },

    /// Decrypt or authentication-tag mismatch. Fatal for that read, logged
    /// as a security event, never silently degraded.
    #[error("integrity violation: {message}")]
    IntegrityViolation {
        /// What failed to verify.
        message: String,
    },

    /// State-machine misuse: the requested transition is not legal from the
    /// record's current state.
    #[error("invalid transition: cannot {action} from {state}")]
    InvalidTransition {
        /// The transition that was attempted.
        action: &'static str,
        /// The state the record was in.
        state: VerificationState,
    },

    /// A blob store, key service, ledger, or bus call timed out or errored.
    /// Retryable with backoff up to a ceiling.
    #[error("upstream {service} unavailable: {message}")]
    UpstreamUnavailable {
        /// Which collaborator failed.
        service: String,
        /// The underlying failure.
        message: String,
    },

    /// Referenced document, blob, or key does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// What was missing.
        message: String,
    },

    /// Internal invariant failure.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl VaultError {
    /// Create a validation rejection.
    pub fn validation_rejected(reason: impl Into<String>) -> Self {
        Self::ValidationRejected {
            reason: reason.into(),
        }
    }

    /// Create a duplicate-content redirect to an existing record.
    pub fn duplicate(existing: DocumentId) -> Self {
        Self::DuplicateContent { existing }
    }

    /// Create an integrity violation.
    pub fn integrity_violation(message: impl Into<String>) -> Self {
        Self::IntegrityViolation {
            message: message.into(),
        }
    }

    /// Create an invalid-transition error.
    pub fn invalid_transition(action: &'static str, state: VerificationState) -> Self {
        Self::InvalidTransition { action, state }
    }

    /// Create an upstream-unavailable error.
    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether retrying the same call can succeed.
    ///
    /// Only collaborator outages are retryable. Validation, duplicates, and
    /// transition errors are final, and integrity violations must never be
    /// papered over by a retry loop.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_upstream_errors_are_retryable() {
        assert!(VaultError::upstream("ledger", "timeout").is_retryable());
        assert!(!VaultError::validation_rejected("too large").is_retryable());
        assert!(!VaultError::integrity_violation("tag mismatch").is_retryable());
        assert!(!VaultError::duplicate(DocumentId::new()).is_retryable());
        assert!(
            !VaultError::invalid_transition("anchor", VerificationState::Pending).is_retryable()
        );
    }

    #[test]
    fn display_names_the_transition() {
        let err = VaultError::invalid_transition("sign", VerificationState::Verified);
        assert_eq!(
            err.to_string(),
            "invalid transition: cannot sign from verified"
        );
    }
}
