//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tollgate_approval::prelude::*;` to import all essential types.

// Errors
pub use crate::{ApprovalError, ApprovalResult, GatewayError, GatewayResult};

// Hub
pub use crate::{ApprovalHub, DecisionWaiter};

// Gateway
pub use crate::{
    PendingNotifier, PolicyEvaluator, PolicyGateway, ToolBackend, ToolCall, ToolError, ToolResult,
    TurnControl,
};

// Recording
pub use crate::{ApprovalOutcome, MemoryOutcomeLog, OutcomeRecorder};
