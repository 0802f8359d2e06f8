//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tollgate_policy::prelude::*;` to import all essential types.

// Errors
pub use crate::{PolicyError, PolicyResult, StoreError, StoreResult};

// Engine
pub use crate::{ActivePolicyEvaluator, PolicyEngine, PolicyRecord};

// Store
pub use crate::{MemoryProposalStore, PolicyProposal, ProposalStatus, ProposalStore};

// Service
pub use crate::{CallDecision, PendingCallItem, PolicyService, ProposalDecision, ProposalDescriptor};
