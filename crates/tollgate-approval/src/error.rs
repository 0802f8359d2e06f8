/// Errors raised by the approval layer's collaborators.
///
/// Gateway outcomes (denials, evaluator failures, reserved-code misuse) are
/// not errors of this kind; see [`GatewayError`](crate::GatewayError).
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    /// Recording an outcome failed (lock poisoned, persistence failed, etc.).
    #[error("storage error: {0}")]
    Storage(String),

    /// Pushing a pending-approval event to listeners failed.
    #[error("notification error: {0}")]
    Notification(String),

    /// Internal approval system error.
    #[error("internal approval error: {0}")]
    Internal(String),
}

/// Result type for approval operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;
