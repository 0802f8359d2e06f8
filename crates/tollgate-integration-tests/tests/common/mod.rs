//! Shared setup for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tollgate_approval::MemoryOutcomeLog;
use tollgate_core::{AgentId, CallId};
use tollgate_policy::{MemoryProposalStore, PolicyEngine, PolicyService};
use tollgate_test::{CountingBackend, RecordingNotifier, RecordingPendingNotifier, RuleRunner};

/// A fully wired service plus handles on its doubles.
pub struct Harness {
    pub service: Arc<PolicyService>,
    pub backend: Arc<CountingBackend>,
    pub notifier: Arc<RecordingNotifier>,
    pub pending: Arc<RecordingPendingNotifier>,
    pub outcomes: Arc<MemoryOutcomeLog>,
    pub store: Arc<MemoryProposalStore>,
}

impl Harness {
    pub fn new(policy: &str) -> Self {
        Self::with_backend(policy, CountingBackend::new())
    }

    pub fn with_backend(policy: &str, backend: CountingBackend) -> Self {
        Self::assemble(policy, backend, RecordingPendingNotifier::new())
    }

    /// A harness whose pending-call announcer always fails.
    pub fn with_failing_announcer(policy: &str) -> Self {
        Self::assemble(policy, CountingBackend::new(), RecordingPendingNotifier::failing())
    }

    fn assemble(policy: &str, backend: CountingBackend, pending: RecordingPendingNotifier) -> Self {
        tollgate_test::setup_test_logging("tollgate=debug");

        let notifier = Arc::new(RecordingNotifier::new());
        let store = Arc::new(MemoryProposalStore::new());
        let engine = PolicyEngine::new(AgentId::new("agent-1"), policy, store.clone())
            .with_runner(Arc::new(RuleRunner::new()))
            .with_notifier(notifier.clone());

        let backend = Arc::new(backend);
        let pending = Arc::new(pending);
        let outcomes = Arc::new(MemoryOutcomeLog::new());
        let service = PolicyService::new(Arc::new(engine), backend.clone())
            .with_recorder(outcomes.clone())
            .with_pending_notifier(pending.clone());

        Self {
            service: Arc::new(service),
            backend,
            notifier,
            pending,
            outcomes,
            store,
        }
    }

    /// Wait until `call_id` is parked on the hub.
    pub async fn wait_for_pending(&self, call_id: &CallId) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !self.service.hub().is_pending(call_id) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("call was never parked");
    }
}
