//! Tollgate Approval - Policy enforcement in front of agent tool calls.
//!
//! This crate provides the pieces that sit between an agent and its tools:
//!
//! - **Rendezvous hub** ([`ApprovalHub`]): parks `Ask` calls until an approver
//!   resolves them, with idempotent registration
//! - **Policy gateway** ([`PolicyGateway`]): evaluates every call, enforces
//!   the decision, and screens backend errors for forged reserved codes
//! - **Outcome recording** ([`OutcomeRecorder`], [`MemoryOutcomeLog`])
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use serde_json::json;
//! use tollgate_approval::{
//!     ApprovalHub, PolicyEvaluator, PolicyGateway, ToolBackend, ToolCall, ToolError, ToolResult,
//! };
//! use tollgate_core::{Decision, EvaluatorError, PolicyRequest, PolicyResponse};
//!
//! struct DenyShell;
//!
//! #[async_trait]
//! impl PolicyEvaluator for DenyShell {
//!     async fn decide(&self, req: &PolicyRequest) -> Result<PolicyResponse, EvaluatorError> {
//!         Ok(if req.name == "shell" {
//!             PolicyResponse::with_rationale(Decision::DenyAbort, "no shell access")
//!         } else {
//!             PolicyResponse::new(Decision::Allow)
//!         })
//!     }
//! }
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl ToolBackend for Echo {
//!     async fn call_tool(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
//!         Ok(ToolResult::ok(json!(call.arguments)))
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let gateway = PolicyGateway::new(ApprovalHub::new(), Arc::new(DenyShell), Arc::new(Echo));
//!
//! assert!(gateway.call_tool(ToolCall::new("echo")).await.is_ok());
//!
//! let denied = gateway.call_tool(ToolCall::new("shell")).await.unwrap_err();
//! assert!(denied.is_abort());
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

/// Error types and results for the approval layer.
pub mod error;
pub mod gateway;
pub mod hub;
pub mod record;

pub use error::{ApprovalError, ApprovalResult};
pub use gateway::{
    DEFAULT_CALL_ID_PREFIX, GatewayError, GatewayResult, PendingNotifier, PolicyEvaluator,
    PolicyGateway, ToolBackend, ToolCall, ToolError, ToolResult, TurnControl,
};
pub use hub::{ApprovalHub, DecisionWaiter};
pub use record::{ApprovalOutcome, MemoryOutcomeLog, OutcomeEntry, OutcomeRecorder};
