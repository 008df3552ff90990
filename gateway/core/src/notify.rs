//! User Notifications
//!
//! The toast-equivalent contract: mutation outcomes and stream failures
//! surface through a [`Notifier`] rather than being rendered directly.
//! The embedding UI supplies its own implementation; headless runs use
//! [`LogNotifier`].

use parking_lot::Mutex;

/// Severity of a notification
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifyLevel {
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
    /// Success
    Success,
}

/// Sink for user-visible notifications
pub trait Notifier: Send + Sync {
    /// Deliver a notification
    fn notify(&self, level: NotifyLevel, message: &str);

    /// Deliver a success notification
    fn success(&self, message: &str) {
        self.notify(NotifyLevel::Success, message);
    }

    /// Deliver an error notification
    fn error(&self, message: &str) {
        self.notify(NotifyLevel::Error, message);
    }

    /// Deliver an informational notification
    fn info(&self, message: &str) {
        self.notify(NotifyLevel::Info, message);
    }
}

/// Notifier that routes to the tracing subscriber
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Error | NotifyLevel::Warning => {
                tracing::warn!(%message, "notification");
            }
            NotifyLevel::Info | NotifyLevel::Success => {
                tracing::info!(%message, "notification");
            }
        }
    }
}

/// Notifier that records everything it receives. Used by tests and by
/// headless embeddings that want to inspect outcomes after the fact.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(NotifyLevel, String)>>,
}

impl RecordingNotifier {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    #[must_use]
    pub fn events(&self) -> Vec<(NotifyLevel, String)> {
        self.events.lock().clone()
    }

    /// Messages recorded at the given level
    #[must_use]
    pub fn messages_at(&self, level: NotifyLevel) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        self.events.lock().push((level, message.to_string()));
    }
}
