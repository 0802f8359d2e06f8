//! Tool call descriptors and approval requests.

use serde::{Deserialize, Serialize};

use crate::ids::CallId;

/// One tool invocation being gated.
///
/// Immutable once constructed. `args_json` is kept for audit and display
/// only and is never parsed for security decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDescriptor {
    call_id: CallId,
    name: String,
    args_json: Option<String>,
}

impl ToolCallDescriptor {
    /// Describe a tool call.
    #[must_use]
    pub fn new(call_id: CallId, name: impl Into<String>, args_json: Option<String>) -> Self {
        Self {
            call_id,
            name: name.into(),
            args_json,
        }
    }

    /// The call identifier.
    #[must_use]
    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }

    /// The canonical function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The serialized arguments, if any.
    #[must_use]
    pub fn args_json(&self) -> Option<&str> {
        self.args_json.as_deref()
    }
}

/// A tool call waiting on a human decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// The finest policy-decidable unit: the function name.
    pub tool_key: String,
    /// The call being gated.
    pub tool_call: ToolCallDescriptor,
}

impl ApprovalRequest {
    /// Build a request whose tool key is the descriptor's function name.
    #[must_use]
    pub fn for_call(tool_call: ToolCallDescriptor) -> Self {
        Self {
            tool_key: tool_call.name().to_owned(),
            tool_call,
        }
    }

    /// The call identifier.
    #[must_use]
    pub fn call_id(&self) -> &CallId {
        self.tool_call.call_id()
    }
}
