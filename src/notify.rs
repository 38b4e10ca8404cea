//! Notification channel and per-set error policies.
//!
//! Notifications are fire-and-forget: the core never waits for, or learns
//! about, their delivery.

#[cfg(test)]
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    #[default]
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: Variant,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: Variant::Default,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: Variant::Destructive,
        }
    }
}

/// How a set reports a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Log and show a notification to the user.
    Notify,
    /// Log only.
    Log,
    /// Neither; the error is still returned to the caller.
    Silent,
}

/// Sink for user-facing notifications.
///
/// # Implementations
///
/// - `ConsoleNotifier` - prints to stderr, used by the CLI
/// - `LogNotifier` - forwards to `tracing`
/// - `RecordingNotifier` - keeps everything for inspection (tests only)
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, n: Notification) {
        match n.variant {
            Variant::Default => eprintln!("{}: {}", n.title, n.description),
            Variant::Destructive => eprintln!("[!] {}: {}", n.title, n.description),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, n: Notification) {
        match n.variant {
            Variant::Default => tracing::info!(title = %n.title, "{}", n.description),
            Variant::Destructive => tracing::warn!(title = %n.title, "{}", n.description),
        }
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    seen: Arc<Mutex<Vec<Notification>>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Notification> {
        match self.seen.lock() {
            Ok(mut seen) => std::mem::take(&mut *seen),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn notify(&self, n: Notification) {
        match self.seen.lock() {
            Ok(mut seen) => seen.push(n),
            Err(poisoned) => poisoned.into_inner().push(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_keeps_order() {
        let rec = RecordingNotifier::new();
        let shared: Arc<dyn Notifier> = Arc::new(rec.clone());
        shared.notify(Notification::info("a", "first"));
        shared.notify(Notification::error("b", "second"));
        let seen = rec.take();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].variant, Variant::Destructive);
        assert!(rec.take().is_empty());
    }

    #[test]
    fn console_and_log_do_not_panic() {
        ConsoleNotifier.notify(Notification::info("t", "d"));
        LogNotifier.notify(Notification::error("t", "d"));
    }
}
