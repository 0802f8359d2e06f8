//! Tracking of tool calls currently executing behind the gateway.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tollgate_core::CallId;

/// Set of call ids whose backend invocation is in progress.
#[derive(Debug, Default)]
pub(crate) struct InflightCalls {
    calls: Mutex<HashMap<CallId, String>>,
}

impl InflightCalls {
    fn lock(&self) -> MutexGuard<'_, HashMap<CallId, String>> {
        self.calls.lock().unwrap_or_else(|e| {
            tracing::warn!("InflightCalls lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Mark `call_id` in flight until the returned guard is dropped.
    pub(crate) fn track(&self, call_id: &CallId, tool_key: &str) -> InflightGuard<'_> {
        self.lock().insert(call_id.clone(), tool_key.to_owned());
        InflightGuard {
            calls: self,
            call_id: call_id.clone(),
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.lock().len()
    }
}

/// Removes its call from [`InflightCalls`] on drop, on every exit path.
pub(crate) struct InflightGuard<'a> {
    calls: &'a InflightCalls,
    call_id: CallId,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.calls.lock().remove(&self.call_id);
    }
}
