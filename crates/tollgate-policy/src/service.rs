//! Role-scoped operations over one engine, hub and gateway.
//!
//! [`PolicyService`] wires a [`PolicyEngine`] to a [`PolicyGateway`] that
//! evaluates with the engine's active policy, and exposes the operations each
//! role needs:
//!
//! - **reader**: [`evaluate_policy`](PolicyService::evaluate_policy),
//!   [`active_policy`](PolicyService::active_policy),
//!   [`proposal_content`](PolicyService::proposal_content),
//!   [`pending_calls`](PolicyService::pending_calls)
//! - **proposer**: [`create_proposal`](PolicyService::create_proposal),
//!   [`withdraw_proposal`](PolicyService::withdraw_proposal)
//! - **admin**: [`decide_call`](PolicyService::decide_call),
//!   [`decide_proposal`](PolicyService::decide_proposal),
//!   [`set_policy_text`](PolicyService::set_policy_text)
//!
//! Transport and authentication of the roles are left to the embedder.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tollgate_approval::{
    ApprovalHub, GatewayResult, OutcomeRecorder, PendingNotifier, PolicyGateway, ToolBackend,
    ToolCall, ToolResult,
};
use tollgate_core::{
    CallId, CallResolution, EvaluatorError, PolicyRequest, PolicyResponse, ProposalId,
};
use tracing::info;

use crate::engine::{PolicyEngine, PolicyRecord};
use crate::error::PolicyResult;
use crate::evaluator::ActivePolicyEvaluator;
use crate::store::{PolicyProposal, ProposalStatus};

/// Reason attached when an approver denies a parked call.
pub const USER_DENIED_REASON: &str = "user_denied";

/// One entry of the pending-calls snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCallItem {
    /// The parked call.
    pub call_id: CallId,
    /// Policy-decidable tool key.
    pub tool_key: String,
    /// Serialized call arguments, if any.
    pub args_json: Option<String>,
}

/// Public view of a proposal, without its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalDescriptor {
    /// Proposal identifier.
    pub id: ProposalId,
    /// Current state.
    pub status: ProposalStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Decision time, if decided.
    pub decided_at: Option<DateTime<Utc>>,
}

impl From<&PolicyProposal> for ProposalDescriptor {
    fn from(p: &PolicyProposal) -> Self {
        Self {
            id: p.id.clone(),
            status: p.status,
            created_at: p.created_at,
            decided_at: p.decided_at,
        }
    }
}

/// An approver's verdict on a parked call.
///
/// Approvers cannot deny and let the turn continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDecision {
    /// Let the call run.
    Approve,
    /// Refuse the call and end the agent's turn.
    DenyAbort,
}

impl CallDecision {
    fn into_resolution(self) -> CallResolution {
        match self {
            Self::Approve => CallResolution::Continue,
            Self::DenyAbort => CallResolution::abort_turn(USER_DENIED_REASON),
        }
    }
}

/// An admin's verdict on a policy proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalDecision {
    /// Activate the proposal's content.
    Approve,
    /// Discard the proposal.
    Reject,
}

/// Engine, hub and gateway for one agent.
pub struct PolicyService {
    engine: Arc<PolicyEngine>,
    gateway: PolicyGateway,
}

impl PolicyService {
    /// Build a service gating `backend` with `engine`'s active policy.
    ///
    /// The hub shares the engine's resource notifier, so pending-call
    /// changes are signalled on the same channel as policy changes.
    #[must_use]
    pub fn new(engine: Arc<PolicyEngine>, backend: Arc<dyn ToolBackend>) -> Self {
        let hub = match engine.notifier() {
            Some(notifier) => ApprovalHub::with_notifier(notifier),
            None => ApprovalHub::new(),
        };
        let evaluator = Arc::new(ActivePolicyEvaluator::new(engine.clone()));
        let gateway = PolicyGateway::new(hub, evaluator, backend);
        Self { engine, gateway }
    }

    /// Report enforced outcomes to `recorder`.
    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn OutcomeRecorder>) -> Self {
        self.gateway = self.gateway.with_recorder(recorder);
        self
    }

    /// Announce parked calls to `notifier`.
    #[must_use]
    pub fn with_pending_notifier(mut self, notifier: Arc<dyn PendingNotifier>) -> Self {
        self.gateway = self.gateway.with_pending_notifier(notifier);
        self
    }

    /// Use `prefix` for generated call ids.
    #[must_use]
    pub fn with_call_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.gateway = self.gateway.with_call_id_prefix(prefix);
        self
    }

    /// The policy engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<PolicyEngine> {
        &self.engine
    }

    /// The gateway.
    #[must_use]
    pub fn gateway(&self) -> &PolicyGateway {
        &self.gateway
    }

    /// The approval hub.
    #[must_use]
    pub fn hub(&self) -> &ApprovalHub {
        self.gateway.hub()
    }

    /// Gate a tool call. See [`PolicyGateway::call_tool`].
    ///
    /// # Errors
    ///
    /// Propagates the gateway outcome.
    pub async fn call_tool(&self, call: ToolCall) -> GatewayResult<ToolResult> {
        self.gateway.call_tool(call).await
    }

    /// Gate a tool call under a caller-supplied id.
    ///
    /// # Errors
    ///
    /// Propagates the gateway outcome.
    pub async fn call_tool_as(&self, call_id: CallId, call: ToolCall) -> GatewayResult<ToolResult> {
        self.gateway.call_tool_as(call_id, call).await
    }

    // -- reader --

    /// Ask the active policy what it would do with `request`.
    ///
    /// # Errors
    ///
    /// Returns the evaluator's error.
    pub async fn evaluate_policy(&self, request: &PolicyRequest) -> Result<PolicyResponse, EvaluatorError> {
        self.engine.evaluate(request).await
    }

    /// The active policy.
    #[must_use]
    pub fn active_policy(&self) -> PolicyRecord {
        self.engine.get_policy()
    }

    /// Content of one proposal, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn proposal_content(&self, id: &ProposalId) -> PolicyResult<Option<String>> {
        Ok(self.engine.get_proposal(id).await?.map(|p| p.content))
    }

    /// Descriptors of every proposal, oldest first.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn list_proposals(&self) -> PolicyResult<Vec<ProposalDescriptor>> {
        let proposals = self.engine.list_proposals().await?;
        Ok(proposals.iter().map(ProposalDescriptor::from).collect())
    }

    /// Snapshot of the calls awaiting a human decision, ordered by call id.
    #[must_use]
    pub fn pending_calls(&self) -> Vec<PendingCallItem> {
        self.hub()
            .pending()
            .into_iter()
            .map(|(call_id, request)| PendingCallItem {
                call_id,
                args_json: request.tool_call.args_json().map(str::to_owned),
                tool_key: request.tool_key,
            })
            .collect()
    }

    // -- proposer --

    /// Submit a candidate policy.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the candidate fails its self-check.
    pub async fn create_proposal(&self, content: &str) -> PolicyResult<ProposalDescriptor> {
        let proposal = self.engine.create_proposal(content).await?;
        Ok(ProposalDescriptor::from(&proposal))
    }

    /// Withdraw a pending proposal.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn withdraw_proposal(&self, id: &ProposalId) -> PolicyResult<()> {
        self.engine.withdraw_proposal(id).await
    }

    // -- admin --

    /// Resolve a parked call. Returns whether the call was pending.
    pub fn decide_call(&self, call_id: &CallId, decision: CallDecision) -> bool {
        let resolved = self.hub().resolve(call_id, decision.into_resolution());
        info!(call_id = %call_id, decision = ?decision, resolved, "Call decided");
        resolved
    }

    /// Approve or reject a proposal.
    ///
    /// # Errors
    ///
    /// See [`PolicyEngine::approve_proposal`] and
    /// [`PolicyEngine::reject_proposal`].
    pub async fn decide_proposal(&self, id: &ProposalId, decision: ProposalDecision) -> PolicyResult<()> {
        match decision {
            ProposalDecision::Approve => self.engine.approve_proposal(id).await.map(|_| ()),
            ProposalDecision::Reject => self.engine.reject_proposal(id).await,
        }
    }

    /// Replace the active policy directly, returning the new version.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the text fails its self-check.
    pub async fn set_policy_text(&self, source: &str) -> PolicyResult<u64> {
        if self.engine.should_self_check() {
            self.engine.self_check(source).await?;
        }
        Ok(self.engine.set_policy(source))
    }
}

#[cfg(feature = "config")]
mod from_config {
    use std::sync::Arc;

    use tollgate_approval::ToolBackend;
    use tollgate_config::Config;
    use tollgate_core::{AgentId, PolicyRunner, ResourceNotifier};

    use super::PolicyService;
    use crate::engine::PolicyEngine;
    use crate::error::{PolicyError, PolicyResult};
    use crate::store::ProposalStore;

    impl PolicyService {
        /// Build a service from loaded configuration.
        ///
        /// # Errors
        ///
        /// Returns [`PolicyError::SourceRead`] if `policy.source_path` cannot
        /// be read.
        pub fn from_config(
            config: &Config,
            store: Arc<dyn ProposalStore>,
            runner: Option<Arc<dyn PolicyRunner>>,
            notifier: Option<Arc<dyn ResourceNotifier>>,
            backend: Arc<dyn ToolBackend>,
        ) -> PolicyResult<Self> {
            let policy = &config.policy;
            let source = match (&policy.source, &policy.source_path) {
                (Some(text), _) => text.clone(),
                (None, Some(path)) => {
                    std::fs::read_to_string(path).map_err(|e| PolicyError::SourceRead {
                        path: path.display().to_string(),
                        source: e,
                    })?
                },
                (None, None) => String::new(),
            };

            let mut engine = PolicyEngine::new(AgentId::new(&policy.agent_id), source, store)
                .with_initial_version(policy.initial_version);
            if let Some(runner) = runner {
                engine = engine.with_runner(runner);
            }
            if let Some(notifier) = notifier {
                engine = engine.with_notifier(notifier);
            }
            if !policy.self_check {
                engine = engine.without_self_check();
            }

            Ok(Self::new(Arc::new(engine), backend)
                .with_call_id_prefix(config.gateway.call_id_prefix.clone()))
        }
    }
}

impl fmt::Debug for PolicyService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyService")
            .field("engine", &self.engine)
            .field("gateway", &self.gateway)
            .finish()
    }
}
