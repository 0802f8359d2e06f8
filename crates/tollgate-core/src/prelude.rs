//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tollgate_core::prelude::*;` to import all essential types.

// Decisions
pub use crate::{CallResolution, Decision, PolicyRequest, PolicyResponse};

// Calls and identifiers
pub use crate::{AgentId, ApprovalRequest, CallId, ProposalId, ToolCallDescriptor};

// Wire errors
pub use crate::ErrorData;

// Collaborators
pub use crate::{EvaluatorError, NoopNotifier, PolicyRunner, ResourceNotifier};
