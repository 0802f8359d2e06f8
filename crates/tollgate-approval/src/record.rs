//! Outcome recording for gated calls.
//!
//! The gateway reports every decision it enforces to an optional
//! [`OutcomeRecorder`]. Recording is best-effort: a failed write is logged and
//! never changes the decision.

use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tollgate_core::CallId;

use crate::error::ApprovalResult;

/// How a gated call was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalOutcome {
    /// The policy allowed the call.
    PolicyAllow,
    /// The policy denied the call and aborted the turn.
    PolicyDenyAbort,
    /// The policy denied the call; the turn continued.
    PolicyDenyContinue,
    /// An approver let an `Ask` call through.
    UserApprove,
    /// An approver aborted the turn on an `Ask` call.
    UserDenyAbort,
}

impl fmt::Display for ApprovalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PolicyAllow => "policy_allow",
            Self::PolicyDenyAbort => "policy_deny_abort",
            Self::PolicyDenyContinue => "policy_deny_continue",
            Self::UserApprove => "user_approve",
            Self::UserDenyAbort => "user_deny_abort",
        };
        f.write_str(s)
    }
}

/// Sink for settled call outcomes.
#[async_trait]
pub trait OutcomeRecorder: Send + Sync {
    /// Record that `call_id` (tool `tool_key`) was settled as `outcome`.
    ///
    /// # Errors
    ///
    /// Returns an error if the outcome could not be stored. The gateway logs
    /// and ignores it.
    async fn record_outcome(
        &self,
        call_id: &CallId,
        tool_key: &str,
        outcome: ApprovalOutcome,
    ) -> ApprovalResult<()>;
}

/// One recorded outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeEntry {
    /// The gated call.
    pub call_id: CallId,
    /// Its tool key.
    pub tool_key: String,
    /// How it was settled.
    pub outcome: ApprovalOutcome,
    /// When it was recorded.
    pub decided_at: DateTime<Utc>,
}

/// In-memory [`OutcomeRecorder`].
#[derive(Default)]
pub struct MemoryOutcomeLog {
    entries: Mutex<Vec<OutcomeEntry>>,
}

impl MemoryOutcomeLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries in recording order.
    #[must_use]
    pub fn entries(&self) -> Vec<OutcomeEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| {
                tracing::warn!("MemoryOutcomeLog lock poisoned, recovering");
                e.into_inner()
            })
            .clone()
    }

    /// Outcomes recorded for `tool_key`, in order.
    #[must_use]
    pub fn outcomes_for(&self, tool_key: &str) -> Vec<ApprovalOutcome> {
        self.entries()
            .into_iter()
            .filter(|e| e.tool_key == tool_key)
            .map(|e| e.outcome)
            .collect()
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |e| e.len())
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl OutcomeRecorder for MemoryOutcomeLog {
    async fn record_outcome(
        &self,
        call_id: &CallId,
        tool_key: &str,
        outcome: ApprovalOutcome,
    ) -> ApprovalResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| crate::ApprovalError::Storage(e.to_string()))?;
        entries.push(OutcomeEntry {
            call_id: call_id.clone(),
            tool_key: tool_key.to_owned(),
            outcome,
            decided_at: Utc::now(),
        });
        Ok(())
    }
}

impl fmt::Debug for MemoryOutcomeLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryOutcomeLog")
            .field("entries", &self.len())
            .finish()
    }
}
