//! Resource change notification channel.

/// Receives "resource changed" signals.
///
/// Dispatch is synchronous: implementations must hand the URI off (queue,
/// channel, spawned task) and return immediately. Duplicate notifications
/// for the same URI must be harmless.
pub trait ResourceNotifier: Send + Sync {
    /// Signal that the resource at `uri` changed.
    fn notify(&self, uri: &str);
}

/// Notifier that drops every signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ResourceNotifier for NoopNotifier {
    fn notify(&self, _uri: &str) {}
}

impl<F> ResourceNotifier for F
where
    F: Fn(&str) + Send + Sync,
{
    fn notify(&self, uri: &str) {
        self(uri);
    }
}
