//! Tollgate Core - Foundation types and traits for the Tollgate approval gateway.
//!
//! This crate provides:
//! - The closed set of policy [`Decision`]s and human [`CallResolution`]s
//! - The immutable [`ToolCallDescriptor`] and the [`ApprovalRequest`] built from it
//! - Identifiers for calls, agents and proposals
//! - The reserved JSON-RPC error codes the gateway uses to signal policy outcomes
//! - The [`PolicyRunner`] and [`ResourceNotifier`] collaborator interfaces
//!
//! # Example
//!
//! ```
//! use tollgate_core::{CallResolution, Decision};
//!
//! assert!(Decision::Allow.is_terminal());
//! assert!(!Decision::Ask.is_terminal());
//!
//! let abort = CallResolution::abort_turn("too risky");
//! assert_eq!(abort.as_decision(), Decision::DenyAbort);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod call;
pub mod decision;
pub mod ids;
pub mod notify;
pub mod reserved;
pub mod runner;
pub mod uris;

pub use call::{ApprovalRequest, ToolCallDescriptor};
pub use decision::{CallResolution, Decision, PolicyRequest, PolicyResponse};
pub use ids::{AgentId, CallId, ProposalId};
pub use notify::{NoopNotifier, ResourceNotifier};
pub use reserved::ErrorData;
pub use runner::{EvaluatorError, PolicyRunner, SELF_CHECK_TOOL};
