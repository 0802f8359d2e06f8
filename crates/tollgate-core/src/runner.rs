//! Sandboxed policy execution interface.
//!
//! Policy text is opaque to Tollgate. A [`PolicyRunner`] is whatever can take
//! that text and a [`PolicyRequest`] and produce a [`PolicyResponse`]: a
//! container, a WASM guest, an embedded interpreter. Warm pools, caching and
//! timeouts belong to the runner.

use async_trait::async_trait;

use crate::decision::{PolicyRequest, PolicyResponse};

/// Tool name used for the synthetic smoke-test call when validating a
/// candidate policy. The call is harmless: it only asks what the policy would
/// do about sending a UI message.
pub const SELF_CHECK_TOOL: &str = "ui_send_message";

/// Failure of the policy evaluator itself, as opposed to a denial.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluatorError {
    /// Evaluation exceeded its time budget.
    #[error("policy evaluation timed out after {timeout_ms}ms")]
    Timeout {
        /// Time budget in milliseconds.
        timeout_ms: u64,
    },

    /// The sandbox running the policy crashed or could not start.
    #[error("policy sandbox crashed: {0}")]
    Crashed(String),

    /// The policy source failed to load or raised while running.
    #[error("policy error: {0}")]
    Policy(String),

    /// The policy produced output that is not a valid decision.
    #[error("malformed policy response: {0}")]
    MalformedResponse(String),

    /// No evaluator is configured.
    #[error("policy evaluator unavailable")]
    Unavailable,
}

impl EvaluatorError {
    /// Short kind label, used when rendering `"Kind: detail"` reasons.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "Timeout",
            Self::Crashed(_) => "Crashed",
            Self::Policy(_) => "PolicyError",
            Self::MalformedResponse(_) => "MalformedResponse",
            Self::Unavailable => "Unavailable",
        }
    }

    /// `"Kind: detail"` rendering used in the reserved error payload.
    #[must_use]
    pub fn reason(&self) -> String {
        format!("{}: {self}", self.kind())
    }
}

/// Executes policy source text against a single request.
#[async_trait]
pub trait PolicyRunner: Send + Sync {
    /// Run `source` for `request`.
    ///
    /// # Errors
    ///
    /// Returns an [`EvaluatorError`] if the policy cannot be executed or its
    /// output is not a decision.
    async fn run(
        &self,
        source: &str,
        request: &PolicyRequest,
    ) -> Result<PolicyResponse, EvaluatorError>;
}
