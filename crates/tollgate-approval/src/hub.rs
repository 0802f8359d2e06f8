//! Approval rendezvous hub.
//!
//! The [`ApprovalHub`] lets the gateway (which needs a decision for call `X`)
//! and an external resolver (which has a decision for call `X`) meet. Each
//! pending call owns one slot: a `watch` channel plus the [`ApprovalRequest`]
//! shown to approvers. A resolution for an id with no slot is dropped.
//!
//! # Locking
//!
//! One std mutex guards the pending map. It is held only for the
//! check-then-insert on registration and the remove on resolution; waiting
//! happens on the slot's channel with the lock released.
//!
//! # Cancellation
//!
//! Dropping a [`DecisionWaiter`] before its decision arrives releases its
//! interest in the slot. When the last waiter goes away the pending entry is
//! removed, so abandoned calls do not linger in [`ApprovalHub::pending`].

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tollgate_core::uris::PENDING_CALLS_URI;
use tollgate_core::{ApprovalRequest, CallId, CallResolution, ResourceNotifier};
use tracing::{debug, warn};

/// Reason used when a slot closes without ever receiving a decision.
const CLOSED_WITHOUT_DECISION: &str = "approval channel closed without a decision";

struct Slot {
    request: ApprovalRequest,
    tx: watch::Sender<Option<CallResolution>>,
    waiters: usize,
    generation: u64,
}

struct HubInner {
    slots: Mutex<HashMap<CallId, Slot>>,
    next_generation: AtomicU64,
    on_change: Option<Arc<dyn ResourceNotifier>>,
}

impl HubInner {
    fn lock(&self) -> MutexGuard<'_, HashMap<CallId, Slot>> {
        self.slots.lock().unwrap_or_else(|e| {
            warn!("ApprovalHub lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn changed(&self) {
        if let Some(notifier) = &self.on_change {
            notifier.notify(PENDING_CALLS_URI);
        }
    }

    /// Drop one waiter's interest in a slot. Removes the slot when nobody is
    /// left waiting on it.
    fn release(&self, call_id: &CallId, generation: u64) {
        let removed = {
            let mut slots = self.lock();
            match slots.get_mut(call_id) {
                Some(slot) if slot.generation == generation => {
                    slot.waiters = slot.waiters.saturating_sub(1);
                    if slot.waiters == 0 {
                        slots.remove(call_id);
                        true
                    } else {
                        false
                    }
                },
                // Already resolved, or the id was reused by a newer slot.
                _ => false,
            }
        };

        if removed {
            debug!(call_id = %call_id, "Pending approval abandoned, removed");
            self.changed();
        }
    }
}

/// In-process rendezvous between gated tool calls and their approvers.
///
/// Cheap to clone; clones share the same pending map.
///
/// # Example
///
/// ```
/// use tollgate_approval::ApprovalHub;
/// use tollgate_core::{ApprovalRequest, CallId, CallResolution, ToolCallDescriptor};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let hub = ApprovalHub::new();
/// let id = CallId::new("call-1");
/// let request = ApprovalRequest::for_call(ToolCallDescriptor::new(id.clone(), "delete_file", None));
///
/// let waiter = hub.register(id.clone(), request);
/// assert!(hub.is_pending(&id));
///
/// assert!(hub.resolve(&id, CallResolution::Continue));
/// assert_eq!(waiter.wait().await, CallResolution::Continue);
/// assert!(!hub.is_pending(&id));
/// # }
/// ```
#[derive(Clone)]
pub struct ApprovalHub {
    inner: Arc<HubInner>,
}

impl ApprovalHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create an empty hub that signals [`PENDING_CALLS_URI`] on `notifier`
    /// whenever the pending set changes.
    #[must_use]
    pub fn with_notifier(notifier: Arc<dyn ResourceNotifier>) -> Self {
        Self::build(Some(notifier))
    }

    fn build(on_change: Option<Arc<dyn ResourceNotifier>>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                slots: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                on_change,
            }),
        }
    }

    /// Register interest in a decision for `call_id`.
    ///
    /// If `call_id` is already pending, the existing slot is reused and the
    /// returned waiter observes the same decision as every other waiter on
    /// it; `request` is discarded in that case. Registration is atomic with
    /// respect to concurrent registrations and resolutions.
    #[must_use = "dropping the waiter abandons the pending approval"]
    pub fn register(&self, call_id: CallId, request: ApprovalRequest) -> DecisionWaiter {
        let (rx, generation, created) = {
            let mut slots = self.inner.lock();
            match slots.entry(call_id.clone()) {
                Entry::Occupied(mut entry) => {
                    let slot = entry.get_mut();
                    slot.waiters = slot.waiters.saturating_add(1);
                    (slot.tx.subscribe(), slot.generation, false)
                },
                Entry::Vacant(entry) => {
                    let (tx, rx) = watch::channel(None);
                    let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
                    entry.insert(Slot {
                        request,
                        tx,
                        waiters: 1,
                        generation,
                    });
                    (rx, generation, true)
                },
            }
        };

        if created {
            debug!(call_id = %call_id, "Registered pending approval");
            self.inner.changed();
        } else {
            debug!(call_id = %call_id, "Joined existing pending approval");
        }

        DecisionWaiter {
            hub: Arc::clone(&self.inner),
            call_id,
            generation,
            rx,
        }
    }

    /// Register `request` under `call_id` and wait for its resolution.
    ///
    /// There is no internal timeout. Dropping the returned future before it
    /// completes cleans up the pending entry.
    pub async fn await_decision(&self, call_id: CallId, request: ApprovalRequest) -> CallResolution {
        self.register(call_id, request).wait().await
    }

    /// Deliver `resolution` to every waiter on `call_id` and remove it from
    /// the pending set.
    ///
    /// Never blocks. Resolving an unknown or already-resolved id is a no-op.
    /// Returns `true` if a pending call was resolved.
    pub fn resolve(&self, call_id: &CallId, resolution: CallResolution) -> bool {
        let slot = self.inner.lock().remove(call_id);

        let Some(slot) = slot else {
            debug!(call_id = %call_id, "No pending approval for call, ignoring resolution");
            return false;
        };

        debug!(
            call_id = %call_id,
            tool = %slot.request.tool_key,
            decision = %resolution.as_decision(),
            "Resolved pending approval"
        );
        slot.tx.send_replace(Some(resolution));
        self.inner.changed();
        true
    }

    /// Snapshot of all outstanding approval requests, keyed by call id.
    #[must_use]
    pub fn pending(&self) -> BTreeMap<CallId, ApprovalRequest> {
        self.inner
            .lock()
            .iter()
            .map(|(id, slot)| (id.clone(), slot.request.clone()))
            .collect()
    }

    /// Number of outstanding approval requests.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether `call_id` is awaiting a decision.
    #[must_use]
    pub fn is_pending(&self, call_id: &CallId) -> bool {
        self.inner.lock().contains_key(call_id)
    }
}

impl Default for ApprovalHub {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ApprovalHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApprovalHub")
            .field("pending", &self.pending_count())
            .field("notifies", &self.inner.on_change.is_some())
            .finish_non_exhaustive()
    }
}

/// A registered interest in one call's decision.
///
/// Obtained from [`ApprovalHub::register`]. Dropping it without calling
/// [`wait`](Self::wait) to completion abandons the wait.
pub struct DecisionWaiter {
    hub: Arc<HubInner>,
    call_id: CallId,
    generation: u64,
    rx: watch::Receiver<Option<CallResolution>>,
}

impl DecisionWaiter {
    /// The call this waiter is registered for.
    #[must_use]
    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }

    /// Suspend until the call is resolved.
    ///
    /// If the slot closes without a decision the call fails closed with an
    /// [`CallResolution::AbortTurn`].
    pub async fn wait(mut self) -> CallResolution {
        let observed = match self.rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };

        observed.unwrap_or_else(|| {
            warn!(call_id = %self.call_id, "Approval slot closed without a decision, aborting");
            CallResolution::abort_turn(CLOSED_WITHOUT_DECISION)
        })
    }
}

impl Drop for DecisionWaiter {
    fn drop(&mut self) {
        self.hub.release(&self.call_id, self.generation);
    }
}

impl fmt::Debug for DecisionWaiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionWaiter")
            .field("call_id", &self.call_id)
            .finish_non_exhaustive()
    }
}
