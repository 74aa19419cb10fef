//! User-facing notification channel.
//!
//! The core only pushes `(message, severity)` pairs; how they are shown is up
//! to the implementation.

use std::fmt;
use std::sync::Mutex;

use tracing::{error, info};

/// How loudly a notification should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Error => "error",
        })
    }
}

/// Receives success/failure messages for display.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

/// Prints info to stdout and errors to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => {
                info!(target: "worktrack::notify", "{message}");
                println!("{message}");
            }
            Severity::Error => {
                error!(target: "worktrack::notify", "{message}");
                eprintln!("Error: {message}");
            }
        }
    }
}

/// Keeps every notification in memory, oldest first.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    entries: Mutex<Vec<(String, Severity)>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all notifications pushed so far.
    pub fn drain(&self) -> Vec<(String, Severity)> {
        self.entries
            .lock()
            .map(|mut entries| std::mem::take(&mut *entries))
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((message.to_string(), severity));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_notifier_drains_in_order() {
        let notifier = MemoryNotifier::new();
        notifier.notify("Ada work started", Severity::Info);
        notifier.notify("service unreachable", Severity::Error);

        let drained = notifier.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[1], ("service unreachable".to_string(), Severity::Error));
        assert!(notifier.drain().is_empty());
    }
}
