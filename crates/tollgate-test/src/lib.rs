//! Tollgate Test - Shared test doubles for the Tollgate workspace.
//!
//! - [`RuleRunner`] / [`FailingRunner`]: policy runners without a sandbox
//! - [`CountingBackend`]: a tool backend that counts invocations
//! - [`RecordingNotifier`] / [`RecordingPendingNotifier`]: capture notifications
//! - [`setup_test_logging`]: tracing output for tests

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod harness;
pub mod mocks;
pub mod runner;

pub use harness::*;
pub use mocks::*;
pub use runner::*;
