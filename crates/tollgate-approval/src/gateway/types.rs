//! Request, result and error types for the policy gateway.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tollgate_core::reserved::ErrorData;
use tollgate_core::{Decision, PolicyRequest};

/// JSON-RPC internal error code, used for opaque backend failures.
const INTERNAL_ERROR_CODE: i64 = -32603;

/// A tool invocation attempted by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Canonical function name.
    pub name: String,
    /// Call arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Map<String, Value>>,
}

impl ToolCall {
    /// A call with no arguments.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: None,
        }
    }

    /// Attach arguments.
    #[must_use]
    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments = Some(arguments);
        self
    }

    /// Build a call from a JSON object of arguments.
    ///
    /// Non-object values are ignored.
    #[must_use]
    pub fn with_json_arguments(self, arguments: Value) -> Self {
        match arguments {
            Value::Object(map) => self.with_arguments(map),
            _ => self,
        }
    }

    /// The input handed to the policy evaluator for this call.
    #[must_use]
    pub fn to_policy_request(&self) -> PolicyRequest {
        PolicyRequest {
            name: self.name.clone(),
            arguments: self.arguments.clone(),
        }
    }

    /// Serialized arguments for audit and display; `None` when empty.
    #[must_use]
    pub fn arguments_json(&self) -> Option<String> {
        self.arguments
            .as_ref()
            .filter(|args| !args.is_empty())
            .and_then(|args| serde_json::to_string(args).ok())
    }
}

/// Result returned by a tool backend.
///
/// A result may itself report an error (`error` is set); it is still subject
/// to reserved-code inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool output.
    pub content: Value,
    /// Error reported in-band by the tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorData>,
}

impl ToolResult {
    /// A successful result.
    #[must_use]
    pub fn ok(content: Value) -> Self {
        Self {
            content,
            error: None,
        }
    }

    /// A result that reports an error in-band.
    #[must_use]
    pub fn error(error: ErrorData) -> Self {
        Self {
            content: Value::Null,
            error: Some(error),
        }
    }

    /// Whether the tool reported an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Failure raised by a tool backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    /// A structured JSON-RPC error.
    #[error("tool error: {0}")]
    Rpc(ErrorData),

    /// Any other failure, described as text.
    #[error("tool failed: {0}")]
    Failed(String),
}

/// What the agent loop should do after a gated call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnControl {
    /// Keep going; the call's result or error is fed back to the agent.
    Continue,
    /// Stop the enclosing multi-step task.
    Abort,
}

/// Outcome of a gated call that did not produce a tool result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// Denied; the turn must stop.
    #[error("policy denied call to {tool} (abort turn): {}", .reason.as_deref().unwrap_or("no reason given"))]
    DeniedAbort {
        /// The tool key.
        tool: String,
        /// Rationale from the policy or approver.
        reason: Option<String>,
    },

    /// Denied; the turn may continue.
    #[error("policy denied call to {tool}: {}", .reason.as_deref().unwrap_or("no reason given"))]
    DeniedContinue {
        /// The tool key.
        tool: String,
        /// Rationale from the policy.
        reason: Option<String>,
    },

    /// The policy evaluator failed; no decision was made.
    #[error("policy evaluator failed for {tool}: {reason}")]
    Evaluator {
        /// The tool key.
        tool: String,
        /// `"Kind: detail"` description of the failure.
        reason: String,
    },

    /// The backend produced an error colliding with a reserved code or message.
    #[error("backend for {tool} misused a reserved policy error code")]
    ReservedMisuse {
        /// The tool key.
        tool: String,
        /// The backend's error code, when it had one.
        backend_code: Option<i64>,
    },

    /// The backend failed with an ordinary error.
    #[error(transparent)]
    Backend(#[from] ToolError),
}

impl GatewayError {
    /// Denial error for a policy or approver decision.
    pub(crate) fn denied(decision: Decision, tool: String, reason: Option<String>) -> Self {
        match decision {
            Decision::DenyContinue => Self::DeniedContinue { tool, reason },
            Decision::DenyAbort | Decision::Allow | Decision::Ask => {
                Self::DeniedAbort { tool, reason }
            },
        }
    }

    /// The JSON-RPC error object to hand back to the agent.
    #[must_use]
    pub fn to_error_data(&self) -> ErrorData {
        match self {
            Self::DeniedAbort { tool, reason } => {
                ErrorData::policy_denied(Decision::DenyAbort, tool, reason.as_deref())
            },
            Self::DeniedContinue { tool, reason } => {
                ErrorData::policy_denied(Decision::DenyContinue, tool, reason.as_deref())
            },
            Self::Evaluator { tool, reason } => ErrorData::evaluator_error(tool, reason),
            Self::ReservedMisuse { tool, backend_code } => {
                ErrorData::reserved_misuse(tool, *backend_code)
            },
            Self::Backend(ToolError::Rpc(data)) => data.clone(),
            Self::Backend(ToolError::Failed(message)) => {
                ErrorData::new(INTERNAL_ERROR_CODE, message.clone(), None)
            },
        }
    }

    /// Control signal for the agent loop.
    #[must_use]
    pub fn turn_control(&self) -> TurnControl {
        if self.is_abort() {
            TurnControl::Abort
        } else {
            TurnControl::Continue
        }
    }

    /// Whether this outcome stops the enclosing task.
    #[must_use]
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::DeniedAbort { .. })
    }

    /// Whether this outcome is a policy or approver denial.
    #[must_use]
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::DeniedAbort { .. } | Self::DeniedContinue { .. })
    }

    /// The tool key, when known.
    #[must_use]
    pub fn tool(&self) -> Option<&str> {
        match self {
            Self::DeniedAbort { tool, .. }
            | Self::DeniedContinue { tool, .. }
            | Self::Evaluator { tool, .. }
            | Self::ReservedMisuse { tool, .. } => Some(tool),
            Self::Backend(_) => None,
        }
    }
}

/// Result type for gated calls.
pub type GatewayResult<T> = Result<T, GatewayError>;
