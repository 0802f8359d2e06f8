//! Test harness helpers.

use tollgate_telemetry::{LogConfig, LogTarget, setup_logging};

/// Route logs at `filter` into the libtest output capture.
///
/// Safe to call from every test; only the first call installs anything.
pub fn setup_test_logging(filter: &str) {
    let config = LogConfig::new(filter)
        .with_target(LogTarget::Test)
        .without_ansi();
    let _ = setup_logging(&config);
}

/// Policy source that allows every call.
pub const ALLOW_ALL: &str = "default = \"allow\"\n";

/// Policy source that asks for every call.
pub const ASK_ALL: &str = "default = \"ask\"\n";

/// Policy source that allows everything except `sandbox_exec`.
pub const DENY_SHELL: &str = r#"
default = "allow"

[[rules]]
tool = "sandbox_exec"
decision = "deny_abort"
reason = "no shell access"
"#;
