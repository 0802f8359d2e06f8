//! Policy engine: active policy state and the proposal lifecycle.
//!
//! The engine owns the one authoritative policy record for an agent and
//! orchestrates proposals held in a [`ProposalStore`]. Activation is gated
//! on a self-check that runs the candidate text against a synthetic
//! request, so a policy that cannot even evaluate never goes live.

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::Map;
use tokio::sync::Mutex;
use tollgate_core::uris::{POLICY_RESOURCE_URI, PROPOSALS_INDEX_URI, proposal_uri};
use tollgate_core::{
    AgentId, EvaluatorError, PolicyRequest, PolicyResponse, PolicyRunner, ProposalId,
    ResourceNotifier, SELF_CHECK_TOOL,
};
use tracing::{debug, info, warn};

use crate::error::{PolicyError, PolicyResult};
use crate::store::{PolicyProposal, ProposalStatus, ProposalStore};

/// The active policy and its version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    /// Policy source text.
    pub source: String,
    /// Monotonic version, bumped by every activation.
    pub version: u64,
}

/// Active-policy holder and proposal orchestrator for one agent.
pub struct PolicyEngine {
    agent_id: AgentId,
    record: RwLock<PolicyRecord>,
    store: Arc<dyn ProposalStore>,
    runner: Option<Arc<dyn PolicyRunner>>,
    notifier: Option<Arc<dyn ResourceNotifier>>,
    self_check_enabled: bool,
    /// Held across every proposal transition, including the self-check.
    transitions: Mutex<()>,
}

impl PolicyEngine {
    /// Create an engine with `source` active at version 1.
    #[must_use]
    pub fn new(agent_id: AgentId, source: impl Into<String>, store: Arc<dyn ProposalStore>) -> Self {
        Self {
            agent_id,
            record: RwLock::new(PolicyRecord {
                source: source.into(),
                version: 1,
            }),
            store,
            runner: None,
            notifier: None,
            self_check_enabled: true,
            transitions: Mutex::new(()),
        }
    }

    /// Evaluate policies (and self-check candidates) with `runner`.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn PolicyRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Signal resource changes to `notifier`.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn ResourceNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Start from `version` instead of 1.
    #[must_use]
    pub fn with_initial_version(self, version: u64) -> Self {
        self.write_record().version = version;
        self
    }

    /// Skip self-checks even when a runner is configured.
    #[must_use]
    pub fn without_self_check(mut self) -> Self {
        self.self_check_enabled = false;
        self
    }

    /// The agent this engine manages.
    #[must_use]
    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    /// The configured resource notifier, if any.
    #[must_use]
    pub fn notifier(&self) -> Option<Arc<dyn ResourceNotifier>> {
        self.notifier.clone()
    }

    /// Snapshot of the active policy.
    #[must_use]
    pub fn get_policy(&self) -> PolicyRecord {
        self.read_record().clone()
    }

    /// Activate `source`, returning the new version.
    ///
    /// Performs no validation; callers that need it run
    /// [`self_check`](Self::self_check) first.
    pub fn set_policy(&self, source: impl Into<String>) -> u64 {
        let version = {
            let mut record = self.write_record();
            record.source = source.into();
            record.version = record.version.saturating_add(1);
            record.version
        };

        info!(agent = %self.agent_id, version, "Policy activated");
        self.notify(POLICY_RESOURCE_URI);
        version
    }

    /// Replace the record wholesale without notifying.
    ///
    /// Used to hydrate the engine from persisted state at startup.
    pub fn load_policy(&self, source: impl Into<String>, version: u64) {
        let mut record = self.write_record();
        record.source = source.into();
        record.version = version;
        debug!(agent = %self.agent_id, version, "Policy loaded");
    }

    /// Run `source` against a synthetic request to prove it evaluates.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Validation`] if evaluation fails, or
    /// [`PolicyError::EvaluatorUnavailable`] without a runner.
    pub async fn self_check(&self, source: &str) -> PolicyResult<()> {
        let runner = self.runner.as_ref().ok_or(PolicyError::EvaluatorUnavailable)?;
        let smoke = PolicyRequest::new(SELF_CHECK_TOOL).with_arguments(Map::new());

        match runner.run(source, &smoke).await {
            Ok(response) => {
                debug!(
                    agent = %self.agent_id,
                    decision = %response.decision,
                    "Policy self-check passed"
                );
                Ok(())
            },
            Err(e) => {
                warn!(agent = %self.agent_id, error = %e, "Policy self-check failed");
                Err(PolicyError::Validation(e))
            },
        }
    }

    /// Whether activation paths run a self-check.
    #[must_use]
    pub fn should_self_check(&self) -> bool {
        self.self_check_enabled && self.runner.is_some()
    }

    /// Evaluate `request` against the active policy.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluatorError::Unavailable`] without a runner, or whatever
    /// the runner reports.
    pub async fn evaluate(&self, request: &PolicyRequest) -> Result<PolicyResponse, EvaluatorError> {
        let runner = self.runner.as_ref().ok_or(EvaluatorError::Unavailable)?;
        let source = self.read_record().source.clone();
        runner.run(&source, request).await
    }

    /// Persist `content` as a new pending proposal.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Validation`] if the content fails its
    /// self-check, or a store error.
    pub async fn create_proposal(&self, content: &str) -> PolicyResult<PolicyProposal> {
        if self.should_self_check() {
            self.self_check(content).await?;
        }

        let id = ProposalId::generate();
        let proposal = self
            .store
            .create_policy_proposal(&self.agent_id, &id, content)
            .await?;

        info!(agent = %self.agent_id, proposal = %id, "Policy proposal created");
        self.notify_proposal(&id);
        Ok(proposal)
    }

    /// Approve a pending proposal and activate its content.
    ///
    /// Returns the new policy version.
    ///
    /// # Errors
    ///
    /// Returns a not-found store error, [`PolicyError::AlreadyDecided`],
    /// [`PolicyError::Validation`], or a store error from the transition.
    pub async fn approve_proposal(&self, id: &ProposalId) -> PolicyResult<u64> {
        let _guard = self.transitions.lock().await;
        let proposal = self.pending_proposal(id).await?;

        if self.should_self_check() {
            self.self_check(&proposal.content).await?;
        }

        // The store transition commits the approval; activation follows it.
        self.store
            .approve_policy_proposal(&self.agent_id, id)
            .await?;
        let version = self.set_policy(proposal.content);

        info!(agent = %self.agent_id, proposal = %id, version, "Policy proposal approved");
        self.notify_proposal(id);
        Ok(version)
    }

    /// Reject a pending proposal.
    ///
    /// # Errors
    ///
    /// Returns a not-found store error or [`PolicyError::AlreadyDecided`].
    pub async fn reject_proposal(&self, id: &ProposalId) -> PolicyResult<()> {
        let _guard = self.transitions.lock().await;
        self.pending_proposal(id).await?;
        self.store
            .reject_policy_proposal(&self.agent_id, id)
            .await?;

        info!(agent = %self.agent_id, proposal = %id, "Policy proposal rejected");
        self.notify_proposal(id);
        Ok(())
    }

    /// Delete a pending proposal.
    ///
    /// # Errors
    ///
    /// Propagates the store error if the proposal is missing or decided.
    pub async fn withdraw_proposal(&self, id: &ProposalId) -> PolicyResult<()> {
        let _guard = self.transitions.lock().await;
        self.store
            .delete_policy_proposal(&self.agent_id, id)
            .await?;

        info!(agent = %self.agent_id, proposal = %id, "Policy proposal withdrawn");
        self.notify_proposal(id);
        Ok(())
    }

    /// Fetch one proposal.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn get_proposal(&self, id: &ProposalId) -> PolicyResult<Option<PolicyProposal>> {
        Ok(self.store.get_policy_proposal(&self.agent_id, id).await?)
    }

    /// All proposals for this agent.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn list_proposals(&self) -> PolicyResult<Vec<PolicyProposal>> {
        Ok(self.store.list_policy_proposals(&self.agent_id).await?)
    }

    async fn pending_proposal(&self, id: &ProposalId) -> PolicyResult<PolicyProposal> {
        let proposal = self
            .store
            .get_policy_proposal(&self.agent_id, id)
            .await?
            .ok_or_else(|| crate::store::StoreError::NotFound { id: id.clone() })?;

        if proposal.status != ProposalStatus::Pending {
            return Err(PolicyError::AlreadyDecided {
                id: id.clone(),
                status: proposal.status,
            });
        }
        Ok(proposal)
    }

    fn notify(&self, uri: &str) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(uri);
        }
    }

    fn notify_proposal(&self, id: &ProposalId) {
        self.notify(&proposal_uri(id));
        self.notify(PROPOSALS_INDEX_URI);
    }

    fn read_record(&self) -> RwLockReadGuard<'_, PolicyRecord> {
        self.record.read().unwrap_or_else(|e| {
            warn!("Policy record lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write_record(&self) -> RwLockWriteGuard<'_, PolicyRecord> {
        self.record.write().unwrap_or_else(|e| {
            warn!("Policy record lock poisoned, recovering");
            e.into_inner()
        })
    }
}

impl fmt::Debug for PolicyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.read_record();
        f.debug_struct("PolicyEngine")
            .field("agent_id", &self.agent_id)
            .field("version", &record.version)
            .field("has_runner", &self.runner.is_some())
            .field("self_check_enabled", &self.self_check_enabled)
            .finish_non_exhaustive()
    }
}
