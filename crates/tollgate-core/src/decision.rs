//! Policy decisions and human resolutions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of evaluating a tool call against the active policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Proceed with the underlying call.
    Allow,
    /// Refuse the call and stop the enclosing task.
    DenyAbort,
    /// Refuse the call; the enclosing task may continue.
    DenyContinue,
    /// Defer to a human. The call blocks until resolved.
    Ask,
}

impl Decision {
    /// Whether this decision settles the call on its own.
    ///
    /// `Ask` is the only non-terminal decision: it needs a [`CallResolution`].
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Ask)
    }

    /// Wire name of the decision (`"allow"`, `"deny_abort"`, ...).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::DenyAbort => "deny_abort",
            Self::DenyContinue => "deny_continue",
            Self::Ask => "ask",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A human (or automated approver) resolution of an `Ask` decision.
///
/// There is no "deny but continue" resolution: approvers can only let the
/// call through or abort the whole turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallResolution {
    /// Equivalent to [`Decision::Allow`].
    Continue,
    /// Equivalent to [`Decision::DenyAbort`].
    AbortTurn {
        /// Optional reason shown to the agent.
        reason: Option<String>,
    },
}

impl CallResolution {
    /// Abort the turn with a reason.
    #[must_use]
    pub fn abort_turn(reason: impl Into<String>) -> Self {
        Self::AbortTurn {
            reason: Some(reason.into()),
        }
    }

    /// The decision this resolution stands for.
    #[must_use]
    pub fn as_decision(&self) -> Decision {
        match self {
            Self::Continue => Decision::Allow,
            Self::AbortTurn { .. } => Decision::DenyAbort,
        }
    }

    /// The abort reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Continue => None,
            Self::AbortTurn { reason } => reason.as_deref(),
        }
    }
}

/// Input handed to a policy evaluator for a single tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRequest {
    /// Canonical tool name (the tool key).
    pub name: String,
    /// Call arguments, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Map<String, serde_json::Value>>,
}

impl PolicyRequest {
    /// Create a request with no arguments.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: None,
        }
    }

    /// Attach arguments.
    #[must_use]
    pub fn with_arguments(mut self, arguments: serde_json::Map<String, serde_json::Value>) -> Self {
        self.arguments = Some(arguments);
        self
    }

    /// Serialize the arguments for audit and display.
    ///
    /// Returns `None` when there are no arguments or the map is empty.
    #[must_use]
    pub fn arguments_json(&self) -> Option<String> {
        self.arguments
            .as_ref()
            .filter(|args| !args.is_empty())
            .and_then(|args| serde_json::to_string(args).ok())
    }
}

/// Decision produced by a policy evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyResponse {
    /// The decision.
    pub decision: Decision,
    /// Optional rationale for audit and UI display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl PolicyResponse {
    /// A response with no rationale.
    #[must_use]
    pub fn new(decision: Decision) -> Self {
        Self {
            decision,
            rationale: None,
        }
    }

    /// A response with a rationale.
    #[must_use]
    pub fn with_rationale(decision: Decision, rationale: impl Into<String>) -> Self {
        Self {
            decision,
            rationale: Some(rationale.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_terminal_decisions() {
        assert!(Decision::Allow.is_terminal());
        assert!(Decision::DenyAbort.is_terminal());
        assert!(Decision::DenyContinue.is_terminal());
        assert!(!Decision::Ask.is_terminal());
    }

    #[test]
    fn test_decision_wire_names() {
        assert_eq!(serde_json::to_value(Decision::DenyAbort).unwrap(), json!("deny_abort"));
        assert_eq!(Decision::DenyContinue.to_string(), "deny_continue");
        let parsed: Decision = serde_json::from_value(json!("ask")).unwrap();
        assert_eq!(parsed, Decision::Ask);
    }

    #[test]
    fn test_resolution_maps_to_decision() {
        assert_eq!(CallResolution::Continue.as_decision(), Decision::Allow);
        let abort = CallResolution::abort_turn("user_denied");
        assert_eq!(abort.as_decision(), Decision::DenyAbort);
        assert_eq!(abort.reason(), Some("user_denied"));
        assert_eq!(CallResolution::Continue.reason(), None);
    }

    #[test]
    fn test_arguments_json() {
        let mut args = serde_json::Map::new();
        args.insert("text".into(), json!("hi"));
        let req = PolicyRequest::new("echo").with_arguments(args);
        assert_eq!(req.arguments_json().as_deref(), Some(r#"{"text":"hi"}"#));
        assert_eq!(PolicyRequest::new("echo").arguments_json(), None);
        let empty = PolicyRequest::new("echo").with_arguments(serde_json::Map::new());
        assert_eq!(empty.arguments_json(), None);
    }

    #[test]
    fn test_policy_response_parses_without_rationale() {
        let resp: PolicyResponse = serde_json::from_value(json!({"decision": "allow"})).unwrap();
        assert_eq!(resp, PolicyResponse::new(Decision::Allow));
    }
}
