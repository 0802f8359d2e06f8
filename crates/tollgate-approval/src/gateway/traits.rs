//! Collaborators the gateway consumes.

use async_trait::async_trait;
use tollgate_core::{CallId, EvaluatorError, PolicyRequest, PolicyResponse};

use super::types::{ToolCall, ToolError, ToolResult};
use crate::error::ApprovalResult;

/// Decides what to do with a tool call.
///
/// Called exactly once per intercepted call. Implementations may have side
/// effects (logging, rate limiting), so the gateway never retries.
#[async_trait]
pub trait PolicyEvaluator: Send + Sync {
    /// Decide `request`.
    ///
    /// # Errors
    ///
    /// Returns an [`EvaluatorError`] on timeout, crash, or malformed output.
    /// The gateway surfaces it as a distinct evaluator-error outcome.
    async fn decide(&self, request: &PolicyRequest) -> Result<PolicyResponse, EvaluatorError>;
}

/// The underlying tool implementation behind the gateway.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    /// Invoke the tool.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if the tool fails.
    async fn call_tool(&self, call: &ToolCall) -> Result<ToolResult, ToolError>;
}

/// Pushes "a call is waiting for you" events to approvers (UI, bots).
#[async_trait]
pub trait PendingNotifier: Send + Sync {
    /// Announce a pending call. Invoked once per `Ask` decision, before the
    /// gateway blocks.
    ///
    /// # Errors
    ///
    /// Returns an error if the push failed. The gateway logs and ignores it.
    async fn notify_pending(
        &self,
        call_id: &CallId,
        tool_key: &str,
        args_json: Option<&str>,
    ) -> ApprovalResult<()>;
}
