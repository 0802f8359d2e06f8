//! Integration tests for the approval hub under concurrency.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tollgate_approval::ApprovalHub;
use tollgate_core::uris::PENDING_CALLS_URI;
use tollgate_core::{ApprovalRequest, CallId, CallResolution, ToolCallDescriptor};
use tollgate_test::RecordingNotifier;

fn request(id: &str, tool: &str) -> ApprovalRequest {
    ApprovalRequest::for_call(ToolCallDescriptor::new(CallId::new(id), tool, None))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_waiters_on_one_call_share_a_decision() {
    let hub = ApprovalHub::new();
    let id = CallId::new("shared");

    let waiters: Vec<_> = (0..8)
        .map(|_| hub.register(id.clone(), request("shared", "echo")))
        .collect();
    assert_eq!(hub.pending_count(), 1);

    let tasks: Vec<_> = waiters
        .into_iter()
        .map(|w| tokio::spawn(w.wait()))
        .collect();

    assert!(hub.resolve(&id, CallResolution::abort_turn("nope")));
    for resolution in join_all(tasks).await {
        assert_eq!(resolution.unwrap(), CallResolution::abort_turn("nope"));
    }
    assert_eq!(hub.pending_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registration_creates_one_slot() {
    let hub = ApprovalHub::new();
    let id = CallId::new("race");

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let hub = hub.clone();
            let id = id.clone();
            tokio::spawn(async move { hub.await_decision(id, request("race", "echo")).await })
        })
        .collect();

    tokio::time::timeout(Duration::from_secs(5), async {
        while !hub.is_pending(&id) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(hub.pending_count(), 1);

    // Let the remaining registrations land before resolving.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(hub.resolve(&id, CallResolution::Continue));

    for resolution in join_all(tasks).await {
        assert_eq!(resolution.unwrap(), CallResolution::Continue);
    }
}

#[tokio::test]
async fn cancelled_wait_leaves_no_pending_entry() {
    let notifier = Arc::new(RecordingNotifier::new());
    let hub = ApprovalHub::with_notifier(notifier.clone());
    let id = CallId::new("cancel-me");

    let wait = hub.await_decision(id.clone(), request("cancel-me", "echo"));
    let timed_out = tokio::time::timeout(Duration::from_millis(20), wait).await;
    assert!(timed_out.is_err());

    assert!(!hub.is_pending(&id));
    assert!(hub.pending().is_empty());
    // Registration and removal both signal the snapshot.
    assert_eq!(notifier.count_of(PENDING_CALLS_URI), 2);

    // A late decision is a harmless no-op.
    assert!(!hub.resolve(&id, CallResolution::Continue));
}

#[tokio::test]
async fn snapshot_is_ordered_and_excludes_resolved() {
    let hub = ApprovalHub::new();
    let _b = hub.register(CallId::new("b"), request("b", "write_file"));
    let a = hub.register(CallId::new("a"), request("a", "echo"));
    let _c = hub.register(CallId::new("c"), request("c", "sandbox_exec"));

    assert!(hub.resolve(a.call_id(), CallResolution::Continue));
    assert_eq!(a.wait().await, CallResolution::Continue);

    let keys: Vec<_> = hub.pending().keys().map(|k| k.as_str().to_owned()).collect();
    assert_eq!(keys, vec!["b", "c"]);
    assert_eq!(hub.pending()[&CallId::new("c")].tool_key, "sandbox_exec");
}
