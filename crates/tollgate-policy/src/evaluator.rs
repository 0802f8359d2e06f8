//! Gateway evaluator backed by the engine's active policy.

use std::sync::Arc;

use async_trait::async_trait;
use tollgate_approval::PolicyEvaluator;
use tollgate_core::{EvaluatorError, PolicyRequest, PolicyResponse};

use crate::engine::PolicyEngine;

/// [`PolicyEvaluator`] that runs whatever policy is active at call time.
///
/// Activating a new policy takes effect for the next call; calls already
/// past evaluation are unaffected.
#[derive(Debug, Clone)]
pub struct ActivePolicyEvaluator {
    engine: Arc<PolicyEngine>,
}

impl ActivePolicyEvaluator {
    /// Evaluate against `engine`.
    #[must_use]
    pub fn new(engine: Arc<PolicyEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl PolicyEvaluator for ActivePolicyEvaluator {
    async fn decide(&self, request: &PolicyRequest) -> Result<PolicyResponse, EvaluatorError> {
        self.engine.evaluate(request).await
    }
}
