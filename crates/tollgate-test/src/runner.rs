//! Policy runners for tests.
//!
//! [`RuleRunner`] treats policy source as a small TOML rule list, so tests
//! can write real, swappable policy text without a sandbox:
//!
//! ```toml
//! default = "allow"
//!
//! [[rules]]
//! tool = "sandbox_exec"
//! decision = "deny_abort"
//! reason = "no shell access"
//! ```
//!
//! Rules are tried in declaration order; the first whose `tool` matches the
//! request name wins. `tool = "*"` matches anything.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use tollgate_core::{Decision, EvaluatorError, PolicyRequest, PolicyResponse, PolicyRunner};
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleSet {
    #[serde(default = "default_decision")]
    default: Decision,
    #[serde(default)]
    rules: Vec<Rule>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Rule {
    tool: String,
    decision: Decision,
    reason: Option<String>,
}

fn default_decision() -> Decision {
    Decision::Allow
}

impl Rule {
    fn matches(&self, name: &str) -> bool {
        self.tool == "*" || self.tool == name
    }
}

/// [`PolicyRunner`] that interprets policy source as TOML rules.
///
/// Malformed source is reported as [`EvaluatorError::Policy`], which is what
/// a self-check sees for a broken candidate.
#[derive(Debug, Default)]
pub struct RuleRunner {
    runs: AtomicUsize,
}

impl RuleRunner {
    /// Create a runner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of evaluations performed, self-checks included.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PolicyRunner for RuleRunner {
    async fn run(&self, source: &str, request: &PolicyRequest) -> Result<PolicyResponse, EvaluatorError> {
        self.runs.fetch_add(1, Ordering::SeqCst);

        let rules: RuleSet =
            toml::from_str(source).map_err(|e| EvaluatorError::Policy(e.message().to_owned()))?;

        let response = match rules.rules.iter().find(|r| r.matches(&request.name)) {
            Some(rule) => PolicyResponse {
                decision: rule.decision,
                rationale: rule.reason.clone(),
            },
            None => PolicyResponse::new(rules.default),
        };
        debug!(tool = %request.name, decision = %response.decision, "rule runner decided");
        Ok(response)
    }
}

/// [`PolicyRunner`] that always fails with the same error.
#[derive(Debug, Clone)]
pub struct FailingRunner {
    error: EvaluatorError,
}

impl FailingRunner {
    /// Fail with `error`.
    #[must_use]
    pub fn new(error: EvaluatorError) -> Self {
        Self { error }
    }

    /// Fail as a sandbox crash.
    #[must_use]
    pub fn crashed(detail: impl Into<String>) -> Self {
        Self::new(EvaluatorError::Crashed(detail.into()))
    }

    /// Fail as a timeout.
    #[must_use]
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::new(EvaluatorError::Timeout { timeout_ms })
    }
}

#[async_trait]
impl PolicyRunner for FailingRunner {
    async fn run(&self, _source: &str, _request: &PolicyRequest) -> Result<PolicyResponse, EvaluatorError> {
        Err(self.error.clone())
    }
}
