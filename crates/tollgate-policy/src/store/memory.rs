//! In-memory proposal store.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use tollgate_core::{AgentId, ProposalId};

use super::{PolicyProposal, ProposalStatus, ProposalStore, StoreError, StoreResult};

type Key = (AgentId, ProposalId);

/// [`ProposalStore`] backed by a map. Not durable; meant for tests and
/// embedding.
///
/// Thread-safe via internal [`RwLock`].
#[derive(Default)]
pub struct MemoryProposalStore {
    proposals: RwLock<HashMap<Key, PolicyProposal>>,
}

impl MemoryProposalStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored proposals across all agents.
    #[must_use]
    pub fn count(&self) -> usize {
        self.proposals.read().map_or(0, |p| p.len())
    }

    fn transition(&self, agent_id: &AgentId, id: &ProposalId, to: ProposalStatus) -> StoreResult<()> {
        let mut proposals = self
            .proposals
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        let proposal = proposals
            .get_mut(&(agent_id.clone(), id.clone()))
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;

        if proposal.status.is_terminal() {
            return Err(StoreError::InvalidTransition {
                id: id.clone(),
                from: proposal.status,
                to,
            });
        }

        proposal.status = to;
        proposal.decided_at = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl ProposalStore for MemoryProposalStore {
    async fn create_policy_proposal(
        &self,
        agent_id: &AgentId,
        id: &ProposalId,
        content: &str,
    ) -> StoreResult<PolicyProposal> {
        let mut proposals = self
            .proposals
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        let key = (agent_id.clone(), id.clone());
        if proposals.contains_key(&key) {
            return Err(StoreError::Duplicate { id: id.clone() });
        }
        let proposal = PolicyProposal::pending(id.clone(), content);
        proposals.insert(key, proposal.clone());
        Ok(proposal)
    }

    async fn get_policy_proposal(
        &self,
        agent_id: &AgentId,
        id: &ProposalId,
    ) -> StoreResult<Option<PolicyProposal>> {
        let proposals = self
            .proposals
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(proposals.get(&(agent_id.clone(), id.clone())).cloned())
    }

    async fn list_policy_proposals(&self, agent_id: &AgentId) -> StoreResult<Vec<PolicyProposal>> {
        let proposals = self
            .proposals
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        let mut list: Vec<PolicyProposal> = proposals
            .iter()
            .filter(|((agent, _), _)| agent == agent_id)
            .map(|(_, p)| p.clone())
            .collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(list)
    }

    async fn approve_policy_proposal(&self, agent_id: &AgentId, id: &ProposalId) -> StoreResult<()> {
        self.transition(agent_id, id, ProposalStatus::Approved)
    }

    async fn reject_policy_proposal(&self, agent_id: &AgentId, id: &ProposalId) -> StoreResult<()> {
        self.transition(agent_id, id, ProposalStatus::Rejected)
    }

    async fn delete_policy_proposal(&self, agent_id: &AgentId, id: &ProposalId) -> StoreResult<()> {
        let mut proposals = self
            .proposals
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        let key = (agent_id.clone(), id.clone());
        match proposals.get(&key) {
            None => Err(StoreError::NotFound { id: id.clone() }),
            Some(p) if p.status.is_terminal() => Err(StoreError::InvalidTransition {
                id: id.clone(),
                from: p.status,
                to: ProposalStatus::Rejected,
            }),
            Some(_) => {
                proposals.remove(&key);
                Ok(())
            },
        }
    }
}

impl fmt::Debug for MemoryProposalStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryProposalStore")
            .field("count", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> AgentId {
        AgentId::new("agent-1")
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryProposalStore::new();
        let id = ProposalId::new("p1");
        let created = store
            .create_policy_proposal(&agent(), &id, "policy text")
            .await
            .unwrap();
        assert_eq!(created.status, ProposalStatus::Pending);
        assert!(created.decided_at.is_none());

        let got = store.get_policy_proposal(&agent(), &id).await.unwrap().unwrap();
        assert_eq!(got, created);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = MemoryProposalStore::new();
        let id = ProposalId::new("p1");
        store.create_policy_proposal(&agent(), &id, "a").await.unwrap();
        let err = store.create_policy_proposal(&agent(), &id, "b").await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_proposals_are_scoped_per_agent() {
        let store = MemoryProposalStore::new();
        let id = ProposalId::new("shared-id");
        let other = AgentId::new("agent-2");
        store.create_policy_proposal(&agent(), &id, "a").await.unwrap();
        store.create_policy_proposal(&other, &id, "b").await.unwrap();

        assert_eq!(store.count(), 2);
        assert_eq!(store.list_policy_proposals(&other).await.unwrap()[0].content, "b");
        assert!(
            store
                .get_policy_proposal(&AgentId::new("nobody"), &id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_decided_proposals_are_terminal() {
        let store = MemoryProposalStore::new();
        let approved = ProposalId::new("a");
        let rejected = ProposalId::new("r");
        store.create_policy_proposal(&agent(), &approved, "x").await.unwrap();
        store.create_policy_proposal(&agent(), &rejected, "y").await.unwrap();

        store.approve_policy_proposal(&agent(), &approved).await.unwrap();
        store.reject_policy_proposal(&agent(), &rejected).await.unwrap();

        for id in [&approved, &rejected] {
            assert!(matches!(
                store.approve_policy_proposal(&agent(), id).await,
                Err(StoreError::InvalidTransition { .. })
            ));
            assert!(matches!(
                store.reject_policy_proposal(&agent(), id).await,
                Err(StoreError::InvalidTransition { .. })
            ));
            assert!(matches!(
                store.delete_policy_proposal(&agent(), id).await,
                Err(StoreError::InvalidTransition { .. })
            ));
        }

        let got = store.get_policy_proposal(&agent(), &approved).await.unwrap().unwrap();
        assert_eq!(got.status, ProposalStatus::Approved);
        assert!(got.decided_at.is_some());
    }

    #[tokio::test]
    async fn test_delete_pending() {
        let store = MemoryProposalStore::new();
        let id = ProposalId::new("gone");
        store.create_policy_proposal(&agent(), &id, "x").await.unwrap();
        store.delete_policy_proposal(&agent(), &id).await.unwrap();
        assert!(store.get_policy_proposal(&agent(), &id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_policy_proposal(&agent(), &id).await,
            Err(StoreError::NotFound { .. })
        ));
    }
}
