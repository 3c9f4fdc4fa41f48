//! User-facing notifications
//!
//! Every place the counter UI showed a toast takes a `Notifier` instead of
//! reaching for a global service. The daemon routes notifications to the
//! log; an embedding UI supplies its own implementation.

/// Generic failure message shown when a REST call fails
pub const CONTACT_ADMIN: &str = "An unexpected error has occurred. Please try again later. \
     If the issue persists, contact the system administrator.";

/// Sink for user-facing notifications
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default notifier: structured log records under the `toast` target
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn success(&self, message: &str) {
        tracing::info!(target: "toast", "{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!(target: "toast", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "toast", "{message}");
    }
}
