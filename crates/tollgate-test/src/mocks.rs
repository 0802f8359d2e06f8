//! Mock collaborators for the gateway and engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;
use tollgate_approval::{
    ApprovalError, ApprovalResult, PendingNotifier, ToolBackend, ToolCall, ToolError, ToolResult,
};
use tollgate_core::{CallId, ResourceNotifier};

/// What a [`CountingBackend`] returns.
#[derive(Debug, Clone)]
enum Script {
    Echo,
    Result(ToolResult),
    Failure(ToolError),
}

/// [`ToolBackend`] that counts invocations.
///
/// By default it echoes `{"tool": name, "arguments": args}`.
#[derive(Debug)]
pub struct CountingBackend {
    calls: AtomicUsize,
    names: Mutex<Vec<String>>,
    script: Script,
}

impl Default for CountingBackend {
    fn default() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            names: Mutex::new(Vec::new()),
            script: Script::Echo,
        }
    }
}

impl CountingBackend {
    /// An echoing backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `result` from every call.
    #[must_use]
    pub fn with_result(mut self, result: ToolResult) -> Self {
        self.script = Script::Result(result);
        self
    }

    /// Fail every call with `error`.
    #[must_use]
    pub fn with_failure(mut self, error: ToolError) -> Self {
        self.script = Script::Failure(error);
        self
    }

    /// Number of invocations so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Tool names invoked, in order.
    #[must_use]
    pub fn invoked(&self) -> Vec<String> {
        self.names.lock().map(|n| n.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ToolBackend for CountingBackend {
    async fn call_tool(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut names) = self.names.lock() {
            names.push(call.name.clone());
        }

        match &self.script {
            Script::Echo => Ok(ToolResult::ok(json!({
                "tool": call.name,
                "arguments": call.arguments,
            }))),
            Script::Result(result) => Ok(result.clone()),
            Script::Failure(error) => Err(error.clone()),
        }
    }
}

/// [`ResourceNotifier`] that records every URI it is told about.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    uris: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// URIs received, in order.
    #[must_use]
    pub fn uris(&self) -> Vec<String> {
        self.uris.lock().map(|u| u.clone()).unwrap_or_default()
    }

    /// How many times `uri` was received.
    #[must_use]
    pub fn count_of(&self, uri: &str) -> usize {
        self.uris
            .lock()
            .map(|u| u.iter().filter(|seen| *seen == uri).count())
            .unwrap_or(0)
    }

    /// Forget everything received so far.
    pub fn clear(&self) {
        if let Ok(mut uris) = self.uris.lock() {
            uris.clear();
        }
    }
}

impl ResourceNotifier for RecordingNotifier {
    fn notify(&self, uri: &str) {
        if let Ok(mut uris) = self.uris.lock() {
            uris.push(uri.to_owned());
        }
    }
}

/// One pending-call announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAnnouncement {
    /// The parked call.
    pub call_id: CallId,
    /// Its tool key.
    pub tool_key: String,
    /// Serialized arguments.
    pub args_json: Option<String>,
}

/// [`PendingNotifier`] that records announcements and wakes waiters.
///
/// Tests use [`wait_for`](Self::wait_for) to learn that a call has been
/// parked before resolving it.
#[derive(Debug, Default)]
pub struct RecordingPendingNotifier {
    seen: Mutex<Vec<PendingAnnouncement>>,
    changed: Notify,
    fail: bool,
}

impl RecordingPendingNotifier {
    /// Create a recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record announcements but report failure for each.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Announcements so far.
    #[must_use]
    pub fn announcements(&self) -> Vec<PendingAnnouncement> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Wait until at least `n` announcements have been recorded.
    pub async fn wait_for(&self, n: usize) {
        loop {
            let notified = self.changed.notified();
            if self.announcements().len() >= n {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl PendingNotifier for RecordingPendingNotifier {
    async fn notify_pending(
        &self,
        call_id: &CallId,
        tool_key: &str,
        args_json: Option<&str>,
    ) -> ApprovalResult<()> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(PendingAnnouncement {
                call_id: call_id.clone(),
                tool_key: tool_key.to_owned(),
                args_json: args_json.map(str::to_owned),
            });
        }
        self.changed.notify_waiters();

        if self.fail {
            return Err(ApprovalError::Notification("listener unreachable".to_owned()));
        }
        Ok(())
    }
}
