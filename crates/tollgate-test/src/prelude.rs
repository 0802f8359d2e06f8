//! Prelude module - commonly used test doubles.
//!
//! Use `use tollgate_test::prelude::*;` in test modules.

pub use crate::{
    ALLOW_ALL, ASK_ALL, CountingBackend, DENY_SHELL, FailingRunner, PendingAnnouncement,
    RecordingNotifier, RecordingPendingNotifier, RuleRunner, setup_test_logging,
};
