//! Policy gateway: the interception point for every tool call.
//!
//! For each call the [`PolicyGateway`]:
//!
//! 1. Asks the [`PolicyEvaluator`] for a decision, exactly once
//! 2. On `Allow`, invokes the backend and screens its errors for forged
//!    reserved codes
//! 3. On `DenyAbort`/`DenyContinue`, returns the matching denial without
//!    touching the backend
//! 4. On `Ask`, parks the call on the [`ApprovalHub`] until an approver
//!    resolves it, then continues as `Allow` or `DenyAbort`
//!
//! Every enforced outcome is reported to the optional [`OutcomeRecorder`].
//! Recording and pending-call notification are best-effort.

mod inflight;
mod traits;
mod types;

pub use traits::{PendingNotifier, PolicyEvaluator, ToolBackend};
pub use types::{GatewayError, GatewayResult, ToolCall, ToolError, ToolResult, TurnControl};

use std::fmt;
use std::sync::Arc;

use tollgate_core::reserved::mentions_reserved_message;
use tollgate_core::{
    ApprovalRequest, CallId, CallResolution, Decision, PolicyResponse, ToolCallDescriptor,
};
use tracing::{debug, info, warn};

use self::inflight::InflightCalls;
use crate::hub::ApprovalHub;
use crate::record::{ApprovalOutcome, OutcomeRecorder};

/// Default prefix for generated call ids.
pub const DEFAULT_CALL_ID_PREFIX: &str = "pg:";

/// Approval-enforcing middleware in front of a [`ToolBackend`].
pub struct PolicyGateway {
    hub: ApprovalHub,
    evaluator: Arc<dyn PolicyEvaluator>,
    backend: Arc<dyn ToolBackend>,
    recorder: Option<Arc<dyn OutcomeRecorder>>,
    pending_notifier: Option<Arc<dyn PendingNotifier>>,
    inflight: InflightCalls,
    call_id_prefix: String,
}

impl PolicyGateway {
    /// Create a gateway.
    #[must_use]
    pub fn new(
        hub: ApprovalHub,
        evaluator: Arc<dyn PolicyEvaluator>,
        backend: Arc<dyn ToolBackend>,
    ) -> Self {
        Self {
            hub,
            evaluator,
            backend,
            recorder: None,
            pending_notifier: None,
            inflight: InflightCalls::default(),
            call_id_prefix: DEFAULT_CALL_ID_PREFIX.to_owned(),
        }
    }

    /// Report enforced outcomes to `recorder`.
    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn OutcomeRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Announce `Ask` calls to `notifier` before blocking on them.
    #[must_use]
    pub fn with_pending_notifier(mut self, notifier: Arc<dyn PendingNotifier>) -> Self {
        self.pending_notifier = Some(notifier);
        self
    }

    /// Use `prefix` for generated call ids.
    #[must_use]
    pub fn with_call_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.call_id_prefix = prefix.into();
        self
    }

    /// The hub parked calls wait on.
    #[must_use]
    pub fn hub(&self) -> &ApprovalHub {
        &self.hub
    }

    /// Whether any backend invocation is in progress.
    #[must_use]
    pub fn has_inflight_calls(&self) -> bool {
        self.inflight.count() > 0
    }

    /// Number of backend invocations in progress.
    #[must_use]
    pub fn inflight_count(&self) -> usize {
        self.inflight.count()
    }

    /// Gate `call` under a freshly generated call id.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] when the call is denied, the evaluator
    /// fails, the backend fails, or the backend forges a reserved code.
    pub async fn call_tool(&self, call: ToolCall) -> GatewayResult<ToolResult> {
        let call_id = CallId::generate(&self.call_id_prefix);
        self.call_tool_as(call_id, call).await
    }

    /// Gate `call` under a caller-supplied call id.
    ///
    /// `call_id` must be unique among calls in progress on this gateway.
    ///
    /// # Errors
    ///
    /// See [`call_tool`](Self::call_tool).
    pub async fn call_tool_as(&self, call_id: CallId, call: ToolCall) -> GatewayResult<ToolResult> {
        let tool_key = call.name.clone();

        let PolicyResponse {
            decision,
            rationale,
        } = match self.evaluator.decide(&call.to_policy_request()).await {
            Ok(response) => response,
            Err(e) => {
                warn!(call_id = %call_id, tool = %tool_key, error = %e, "Policy evaluator failed");
                return Err(GatewayError::Evaluator {
                    tool: tool_key,
                    reason: e.reason(),
                });
            },
        };

        debug!(
            call_id = %call_id,
            tool = %tool_key,
            decision = %decision,
            rationale = rationale.as_deref().unwrap_or(""),
            "Policy decision"
        );

        match decision {
            Decision::Allow => {
                self.record(&call_id, &tool_key, ApprovalOutcome::PolicyAllow)
                    .await;
                self.invoke(&call_id, &tool_key, &call).await
            },
            Decision::DenyAbort => {
                self.record(&call_id, &tool_key, ApprovalOutcome::PolicyDenyAbort)
                    .await;
                Err(GatewayError::denied(decision, tool_key, rationale))
            },
            Decision::DenyContinue => {
                self.record(&call_id, &tool_key, ApprovalOutcome::PolicyDenyContinue)
                    .await;
                Err(GatewayError::denied(decision, tool_key, rationale))
            },
            Decision::Ask => self.ask(call_id, tool_key, call).await,
        }
    }

    /// Park the call on the hub and act on the approver's resolution.
    async fn ask(&self, call_id: CallId, tool_key: String, call: ToolCall) -> GatewayResult<ToolResult> {
        let args_json = call.arguments_json();
        let descriptor = ToolCallDescriptor::new(call_id.clone(), &call.name, args_json.clone());
        let waiter = self
            .hub
            .register(call_id.clone(), ApprovalRequest::for_call(descriptor));

        self.notify_pending(&call_id, &tool_key, args_json.as_deref())
            .await;

        info!(call_id = %call_id, tool = %tool_key, "Tool call awaiting approval");
        match waiter.wait().await {
            CallResolution::Continue => {
                self.record(&call_id, &tool_key, ApprovalOutcome::UserApprove)
                    .await;
                self.invoke(&call_id, &tool_key, &call).await
            },
            CallResolution::AbortTurn { reason } => {
                self.record(&call_id, &tool_key, ApprovalOutcome::UserDenyAbort)
                    .await;
                Err(GatewayError::denied(Decision::DenyAbort, tool_key, reason))
            },
        }
    }

    /// Run the backend with the call tracked as in flight, remapping any
    /// error that collides with the reserved codes.
    async fn invoke(&self, call_id: &CallId, tool_key: &str, call: &ToolCall) -> GatewayResult<ToolResult> {
        let _inflight = self.inflight.track(call_id, tool_key);

        match self.backend.call_tool(call).await {
            Ok(result) => {
                let forged = result
                    .error
                    .as_ref()
                    .filter(|err| err.collides_with_reserved())
                    .map(|err| err.code);
                match forged {
                    Some(code) => Err(misuse(call_id, tool_key, Some(code))),
                    None => Ok(result),
                }
            },
            Err(ToolError::Rpc(err)) if err.collides_with_reserved() => {
                Err(misuse(call_id, tool_key, Some(err.code)))
            },
            Err(ToolError::Failed(message)) if mentions_reserved_message(&message) => {
                Err(misuse(call_id, tool_key, None))
            },
            Err(e) => Err(GatewayError::Backend(e)),
        }
    }

    async fn record(&self, call_id: &CallId, tool_key: &str, outcome: ApprovalOutcome) {
        let Some(recorder) = &self.recorder else {
            return;
        };
        if let Err(e) = recorder.record_outcome(call_id, tool_key, outcome).await {
            warn!(
                call_id = %call_id,
                tool = %tool_key,
                outcome = %outcome,
                error = %e,
                "Failed to record approval outcome"
            );
        }
    }

    async fn notify_pending(&self, call_id: &CallId, tool_key: &str, args_json: Option<&str>) {
        let Some(notifier) = &self.pending_notifier else {
            return;
        };
        if let Err(e) = notifier.notify_pending(call_id, tool_key, args_json).await {
            warn!(
                call_id = %call_id,
                tool = %tool_key,
                error = %e,
                "Failed to announce pending approval"
            );
        }
    }
}

fn misuse(call_id: &CallId, tool_key: &str, backend_code: Option<i64>) -> GatewayError {
    warn!(
        call_id = %call_id,
        tool = %tool_key,
        backend_code = ?backend_code,
        "Backend error collides with reserved policy code, remapping"
    );
    GatewayError::ReservedMisuse {
        tool: tool_key.to_owned(),
        backend_code,
    }
}

impl fmt::Debug for PolicyGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyGateway")
            .field("hub", &self.hub)
            .field("inflight", &self.inflight.count())
            .field("call_id_prefix", &self.call_id_prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tollgate_core::reserved::{self, ErrorData};
    use tollgate_core::{EvaluatorError, PolicyRequest};

    use crate::error::{ApprovalError, ApprovalResult};
    use crate::record::MemoryOutcomeLog;

    /// Returns a fixed response and counts invocations.
    struct FixedEvaluator {
        response: Result<PolicyResponse, EvaluatorError>,
        calls: AtomicUsize,
    }

    impl FixedEvaluator {
        fn new(response: Result<PolicyResponse, EvaluatorError>) -> Arc<Self> {
            Arc::new(Self {
                response,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PolicyEvaluator for FixedEvaluator {
        async fn decide(&self, _request: &PolicyRequest) -> Result<PolicyResponse, EvaluatorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }

    /// Echoes its arguments, or fails with a scripted error.
    struct EchoBackend {
        failure: Option<ToolError>,
        in_band_error: Option<ErrorData>,
        calls: AtomicUsize,
    }

    impl EchoBackend {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                failure: None,
                in_band_error: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(failure: ToolError) -> Arc<Self> {
            Arc::new(Self {
                failure: Some(failure),
                in_band_error: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn in_band(error: ErrorData) -> Arc<Self> {
            Arc::new(Self {
                failure: None,
                in_band_error: Some(error),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ToolBackend for EchoBackend {
        async fn call_tool(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(failure) = &self.failure {
                return Err(failure.clone());
            }
            if let Some(err) = &self.in_band_error {
                return Ok(ToolResult::error(err.clone()));
            }
            Ok(ToolResult::ok(json!(call.arguments)))
        }
    }

    /// Parks inside the backend until released, then fails.
    #[derive(Default)]
    struct BlockingBackend {
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl ToolBackend for BlockingBackend {
        async fn call_tool(&self, _call: &ToolCall) -> Result<ToolResult, ToolError> {
            self.entered.notify_one();
            self.release.notified().await;
            Err(ToolError::Failed("connection reset".into()))
        }
    }

    struct FailingRecorder;

    #[async_trait]
    impl OutcomeRecorder for FailingRecorder {
        async fn record_outcome(
            &self,
            _call_id: &CallId,
            _tool_key: &str,
            _outcome: ApprovalOutcome,
        ) -> ApprovalResult<()> {
            Err(ApprovalError::Storage("disk on fire".into()))
        }
    }

    #[derive(Default)]
    struct CapturingPendingNotifier {
        seen: Mutex<Vec<(String, String, Option<String>)>>,
        fail: bool,
    }

    #[async_trait]
    impl PendingNotifier for CapturingPendingNotifier {
        async fn notify_pending(
            &self,
            call_id: &CallId,
            tool_key: &str,
            args_json: Option<&str>,
        ) -> ApprovalResult<()> {
            self.seen.lock().unwrap().push((
                call_id.to_string(),
                tool_key.to_owned(),
                args_json.map(str::to_owned),
            ));
            if self.fail {
                Err(ApprovalError::Notification("socket closed".into()))
            } else {
                Ok(())
            }
        }
    }

    fn gateway(evaluator: Arc<FixedEvaluator>, backend: Arc<EchoBackend>) -> PolicyGateway {
        PolicyGateway::new(ApprovalHub::new(), evaluator, backend)
    }

    fn allow() -> Arc<FixedEvaluator> {
        FixedEvaluator::new(Ok(PolicyResponse::new(Decision::Allow)))
    }

    // ------------------------------------------------------------------
    // Terminal policy decisions
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_allow_invokes_backend() {
        let backend = EchoBackend::ok();
        let log = Arc::new(MemoryOutcomeLog::new());
        let gw = gateway(allow(), backend.clone()).with_recorder(log.clone());

        let call = ToolCall::new("echo").with_json_arguments(json!({"text": "hi"}));
        let result = gw.call_tool(call).await.unwrap();

        assert_eq!(result.content, json!({"text": "hi"}));
        assert_eq!(backend.calls(), 1);
        assert_eq!(log.outcomes_for("echo"), vec![ApprovalOutcome::PolicyAllow]);
        assert!(log.entries()[0].call_id.as_str().starts_with("pg:"));
        assert!(!gw.has_inflight_calls());
    }

    #[tokio::test]
    async fn test_deny_abort_skips_backend() {
        let backend = EchoBackend::ok();
        let evaluator = FixedEvaluator::new(Ok(PolicyResponse::with_rationale(
            Decision::DenyAbort,
            "no shell access",
        )));
        let gw = gateway(evaluator.clone(), backend.clone());

        let err = gw.call_tool(ToolCall::new("sandbox_exec")).await.unwrap_err();

        assert_eq!(
            err,
            GatewayError::DeniedAbort {
                tool: "sandbox_exec".into(),
                reason: Some("no shell access".into()),
            }
        );
        assert_eq!(err.turn_control(), TurnControl::Abort);
        let data = err.to_error_data();
        assert_eq!(data.code, reserved::DENIED_ABORT_CODE);
        assert_eq!(data.data_str("reason"), Some("no shell access"));
        assert_eq!(backend.calls(), 0);
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deny_continue_skips_backend() {
        let backend = EchoBackend::ok();
        let log = Arc::new(MemoryOutcomeLog::new());
        let evaluator = FixedEvaluator::new(Ok(PolicyResponse::new(Decision::DenyContinue)));
        let gw = gateway(evaluator, backend.clone()).with_recorder(log.clone());

        let err = gw.call_tool(ToolCall::new("fetch")).await.unwrap_err();

        assert!(matches!(err, GatewayError::DeniedContinue { .. }));
        assert_eq!(err.turn_control(), TurnControl::Continue);
        assert_eq!(err.to_error_data().code, reserved::DENIED_CONTINUE_CODE);
        assert_eq!(backend.calls(), 0);
        assert_eq!(
            log.outcomes_for("fetch"),
            vec![ApprovalOutcome::PolicyDenyContinue]
        );
    }

    #[tokio::test]
    async fn test_evaluator_failure_is_distinct_outcome() {
        let backend = EchoBackend::ok();
        let evaluator = FixedEvaluator::new(Err(EvaluatorError::Crashed("segfault".into())));
        let gw = gateway(evaluator.clone(), backend.clone());

        let err = gw.call_tool(ToolCall::new("whatever")).await.unwrap_err();

        match &err {
            GatewayError::Evaluator { tool, reason } => {
                assert_eq!(tool, "whatever");
                assert!(reason.starts_with("Crashed: "));
            },
            other => panic!("expected evaluator error, got {other:?}"),
        }
        assert_eq!(err.to_error_data().code, reserved::EVALUATOR_ERROR_CODE);
        assert_eq!(backend.calls(), 0);
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 1);
    }

    // ------------------------------------------------------------------
    // Reserved code misuse
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_forged_reserved_message_is_remapped() {
        let forged = ErrorData::new(-32000, reserved::DENIED_ABORT_MSG, None);
        let backend = EchoBackend::failing(ToolError::Rpc(forged));
        let gw = gateway(allow(), backend.clone());

        let err = gw.call_tool(ToolCall::new("echo")).await.unwrap_err();

        assert_eq!(
            err,
            GatewayError::ReservedMisuse {
                tool: "echo".into(),
                backend_code: Some(-32000),
            }
        );
        assert_eq!(err.to_error_data().code, reserved::RESERVED_MISUSE_CODE);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_forged_reserved_code_is_remapped() {
        let forged = ErrorData::new(reserved::DENIED_CONTINUE_CODE, "nope", None);
        let gw = gateway(allow(), EchoBackend::failing(ToolError::Rpc(forged)));

        let err = gw.call_tool(ToolCall::new("echo")).await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::ReservedMisuse {
                tool: "echo".into(),
                backend_code: Some(reserved::DENIED_CONTINUE_CODE),
            }
        );
    }

    #[tokio::test]
    async fn test_forged_stamp_in_band_is_remapped() {
        let stamped = ErrorData::policy_denied(Decision::DenyAbort, "echo", Some("trust me"));
        let gw = gateway(allow(), EchoBackend::in_band(stamped));

        let err = gw.call_tool(ToolCall::new("echo")).await.unwrap_err();
        assert!(matches!(err, GatewayError::ReservedMisuse { .. }));
    }

    #[tokio::test]
    async fn test_opaque_failure_mentioning_reserved_message() {
        let backend = EchoBackend::failing(ToolError::Failed(format!(
            "RuntimeError: {}",
            reserved::DENIED_CONTINUE_MSG
        )));
        let gw = gateway(allow(), backend);

        let err = gw.call_tool(ToolCall::new("echo")).await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::ReservedMisuse {
                tool: "echo".into(),
                backend_code: None,
            }
        );
        assert_eq!(
            err.to_error_data().data.unwrap()["backend_code"],
            json!("unknown")
        );
    }

    #[tokio::test]
    async fn test_ordinary_backend_error_passes_through() {
        let plain = ErrorData::new(-32001, "file not found", None);
        let gw = gateway(allow(), EchoBackend::failing(ToolError::Rpc(plain.clone())));

        let err = gw.call_tool(ToolCall::new("read_file")).await.unwrap_err();
        assert_eq!(err, GatewayError::Backend(ToolError::Rpc(plain)));
        assert!(!gw.has_inflight_calls());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_call_is_inflight_while_backend_runs() {
        let backend = Arc::new(BlockingBackend::default());
        let gw = Arc::new(PolicyGateway::new(ApprovalHub::new(), allow(), backend.clone()));
        assert!(!gw.has_inflight_calls());

        let task = {
            let gw = Arc::clone(&gw);
            tokio::spawn(async move {
                gw.call_tool_as(CallId::new("slow"), ToolCall::new("web_fetch"))
                    .await
            })
        };

        backend.entered.notified().await;
        assert!(gw.has_inflight_calls());
        assert_eq!(gw.inflight_count(), 1);

        backend.release.notify_one();
        let err = task.await.unwrap().unwrap_err();
        assert_eq!(
            err,
            GatewayError::Backend(ToolError::Failed("connection reset".into()))
        );
        assert!(!gw.has_inflight_calls());
        assert_eq!(gw.inflight_count(), 0);
    }

    #[tokio::test]
    async fn test_ordinary_in_band_error_is_returned_as_result() {
        let plain = ErrorData::new(-32001, "file not found", None);
        let gw = gateway(allow(), EchoBackend::in_band(plain));

        let result = gw.call_tool(ToolCall::new("read_file")).await.unwrap();
        assert!(result.is_error());
    }

    // ------------------------------------------------------------------
    // Ask
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_ask_continue_invokes_backend_once() {
        let backend = EchoBackend::ok();
        let notifier = Arc::new(CapturingPendingNotifier::default());
        let log = Arc::new(MemoryOutcomeLog::new());
        let evaluator = FixedEvaluator::new(Ok(PolicyResponse::new(Decision::Ask)));
        let gw = Arc::new(
            gateway(evaluator, backend.clone())
                .with_pending_notifier(notifier.clone())
                .with_recorder(log.clone()),
        );
        let id = CallId::new("call-42");

        let task = {
            let gw = Arc::clone(&gw);
            let id = id.clone();
            let call = ToolCall::new("delete_file").with_json_arguments(json!({"path": "/tmp/x"}));
            tokio::spawn(async move { gw.call_tool_as(id, call).await })
        };

        while !gw.hub().is_pending(&id) {
            tokio::task::yield_now().await;
        }
        assert_eq!(backend.calls(), 0);

        assert!(gw.hub().resolve(&id, CallResolution::Continue));
        let result = task.await.unwrap().unwrap();

        assert_eq!(result.content, json!({"path": "/tmp/x"}));
        assert_eq!(backend.calls(), 1);
        assert!(!gw.hub().is_pending(&id));
        assert_eq!(
            notifier.seen.lock().unwrap().clone(),
            vec![(
                "call-42".to_owned(),
                "delete_file".to_owned(),
                Some(r#"{"path":"/tmp/x"}"#.to_owned())
            )]
        );
        assert_eq!(
            log.outcomes_for("delete_file"),
            vec![ApprovalOutcome::UserApprove]
        );
    }

    #[tokio::test]
    async fn test_ask_abort_turn_uses_resolution_reason() {
        let backend = EchoBackend::ok();
        let evaluator = FixedEvaluator::new(Ok(PolicyResponse::new(Decision::Ask)));
        let gw = Arc::new(gateway(evaluator, backend.clone()));
        let id = CallId::new("call-7");

        let task = {
            let gw = Arc::clone(&gw);
            let id = id.clone();
            tokio::spawn(async move { gw.call_tool_as(id, ToolCall::new("rm")).await })
        };
        while !gw.hub().is_pending(&id) {
            tokio::task::yield_now().await;
        }
        gw.hub().resolve(&id, CallResolution::abort_turn("user_denied"));

        let err = task.await.unwrap().unwrap_err();
        assert_eq!(
            err,
            GatewayError::DeniedAbort {
                tool: "rm".into(),
                reason: Some("user_denied".into()),
            }
        );
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_pending_notifier_failure_does_not_block_decision() {
        let notifier = Arc::new(CapturingPendingNotifier {
            fail: true,
            ..Default::default()
        });
        let evaluator = FixedEvaluator::new(Ok(PolicyResponse::new(Decision::Ask)));
        let gw = Arc::new(gateway(evaluator, EchoBackend::ok()).with_pending_notifier(notifier));
        let id = CallId::new("n-1");

        let task = {
            let gw = Arc::clone(&gw);
            let id = id.clone();
            tokio::spawn(async move { gw.call_tool_as(id, ToolCall::new("echo")).await })
        };
        while !gw.hub().is_pending(&id) {
            tokio::task::yield_now().await;
        }
        gw.hub().resolve(&id, CallResolution::Continue);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_ask_leaves_nothing_pending() {
        let evaluator = FixedEvaluator::new(Ok(PolicyResponse::new(Decision::Ask)));
        let gw = Arc::new(gateway(evaluator, EchoBackend::ok()));
        let id = CallId::new("abandoned");

        let task = {
            let gw = Arc::clone(&gw);
            let id = id.clone();
            tokio::spawn(async move { gw.call_tool_as(id, ToolCall::new("echo")).await })
        };
        while !gw.hub().is_pending(&id) {
            tokio::task::yield_now().await;
        }
        task.abort();
        let _ = task.await;

        assert!(gw.hub().pending().is_empty());
    }

    // ------------------------------------------------------------------
    // Best-effort recording
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_recorder_failure_does_not_block_call() {
        let backend = EchoBackend::ok();
        let gw = gateway(allow(), backend.clone()).with_recorder(Arc::new(FailingRecorder));

        assert!(gw.call_tool(ToolCall::new("echo")).await.is_ok());
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_custom_call_id_prefix() {
        let log = Arc::new(MemoryOutcomeLog::new());
        let gw = gateway(allow(), EchoBackend::ok())
            .with_call_id_prefix("gate-")
            .with_recorder(log.clone());

        gw.call_tool(ToolCall::new("echo")).await.unwrap();
        assert!(log.entries()[0].call_id.as_str().starts_with("gate-"));
    }
}
