//! Tollgate Policy - Active policy state and the proposal lifecycle.
//!
//! A [`PolicyEngine`] holds the one active policy for an agent and moves
//! candidate replacements through a pending/approved/rejected lifecycle,
//! validating each candidate with a self-check before it can go live.
//! [`PolicyService`] ties an engine to a gateway and exposes the reader,
//! proposer and admin operations.
//!
//! # Feature flags
//!
//! - `config`: [`PolicyService::from_config`] builds a service from a loaded
//!   `tollgate_config::Config`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod engine;
pub mod error;
pub mod evaluator;
pub mod service;
pub mod store;

pub use engine::{PolicyEngine, PolicyRecord};
pub use error::{PolicyError, PolicyResult};
pub use evaluator::ActivePolicyEvaluator;
pub use service::{
    CallDecision, PendingCallItem, PolicyService, ProposalDecision, ProposalDescriptor,
    USER_DENIED_REASON,
};
pub use store::{
    MemoryProposalStore, PolicyProposal, ProposalStatus, ProposalStore, StoreError, StoreResult,
};
