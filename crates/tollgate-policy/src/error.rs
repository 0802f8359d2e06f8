//! Policy engine error types.

use tollgate_core::{EvaluatorError, ProposalId};

use crate::store::{ProposalStatus, StoreError};

/// Errors raised by the policy engine and service.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// Candidate policy text failed its self-check.
    ///
    /// Distinct from [`PolicyError::Store`] so callers can tell a bad policy
    /// apart from a storage problem.
    #[error("policy validation failed: {0}")]
    Validation(#[source] EvaluatorError),

    /// A self-check or evaluation was requested but no runner is configured.
    #[error("no policy evaluator configured")]
    EvaluatorUnavailable,

    /// The proposal was already approved or rejected.
    #[error("proposal {id} is already {status}")]
    AlreadyDecided {
        /// The proposal.
        id: ProposalId,
        /// Its terminal status.
        status: ProposalStatus,
    },

    /// Persistence failure, passed through unmodified.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Reading policy source from disk failed.
    #[error("failed to read policy source at {path}: {source}")]
    SourceRead {
        /// Path that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl PolicyError {
    /// Whether this is a policy validation failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether this is a persistence not-found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(StoreError::NotFound { .. }))
    }
}

/// Result type for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;
