//! Proposal persistence interface.
//!
//! Proposals live in a durable store keyed by (agent id, proposal id). The
//! [`PolicyEngine`](crate::PolicyEngine) orchestrates transitions and never
//! holds proposals itself.

mod memory;

pub use memory::MemoryProposalStore;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tollgate_core::{AgentId, ProposalId};

/// Proposal state.
///
/// `Pending` moves exactly once, to `Approved` or `Rejected` (or is deleted
/// by withdrawal). Both decided states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Awaiting a decision.
    Pending,
    /// Approved; its content was activated.
    Approved,
    /// Rejected.
    Rejected,
}

impl ProposalStatus {
    /// Whether no further transition is allowed.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// A candidate replacement policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyProposal {
    /// Proposal identifier.
    pub id: ProposalId,
    /// Candidate policy source text.
    pub content: String,
    /// Current state.
    pub status: ProposalStatus,
    /// When the proposal was created.
    pub created_at: DateTime<Utc>,
    /// When it was decided; `None` while pending.
    pub decided_at: Option<DateTime<Utc>>,
}

impl PolicyProposal {
    /// A new pending proposal created now.
    #[must_use]
    pub fn pending(id: ProposalId, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            status: ProposalStatus::Pending,
            created_at: Utc::now(),
            decided_at: None,
        }
    }
}

/// Errors from proposal persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No proposal with this id exists for the agent.
    #[error("proposal not found: {id}")]
    NotFound {
        /// The missing proposal.
        id: ProposalId,
    },

    /// A proposal with this id already exists for the agent.
    #[error("duplicate proposal id: {id}")]
    Duplicate {
        /// The colliding proposal.
        id: ProposalId,
    },

    /// The requested state transition is not allowed.
    #[error("proposal {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// The proposal.
        id: ProposalId,
        /// Its current status.
        from: ProposalStatus,
        /// The requested status.
        to: ProposalStatus,
    },

    /// A storage operation failed.
    #[error("storage error: {0}")]
    Internal(String),
}

/// Result type for proposal persistence.
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable storage for policy proposals.
#[async_trait]
pub trait ProposalStore: Send + Sync {
    /// Persist a new pending proposal.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if the id is taken.
    async fn create_policy_proposal(
        &self,
        agent_id: &AgentId,
        id: &ProposalId,
        content: &str,
    ) -> StoreResult<PolicyProposal>;

    /// Fetch a proposal, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn get_policy_proposal(
        &self,
        agent_id: &AgentId,
        id: &ProposalId,
    ) -> StoreResult<Option<PolicyProposal>>;

    /// All proposals for the agent, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn list_policy_proposals(&self, agent_id: &AgentId) -> StoreResult<Vec<PolicyProposal>>;

    /// Move a pending proposal to `Approved`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] or [`StoreError::InvalidTransition`].
    async fn approve_policy_proposal(&self, agent_id: &AgentId, id: &ProposalId) -> StoreResult<()>;

    /// Move a pending proposal to `Rejected`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] or [`StoreError::InvalidTransition`].
    async fn reject_policy_proposal(&self, agent_id: &AgentId, id: &ProposalId) -> StoreResult<()>;

    /// Delete a pending proposal.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] or [`StoreError::InvalidTransition`]
    /// if the proposal was already decided.
    async fn delete_policy_proposal(&self, agent_id: &AgentId, id: &ProposalId) -> StoreResult<()>;
}
