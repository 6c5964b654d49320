//! Best-effort push notifications.
//!
//! Notifications are strictly fire-and-forget: a failure is logged with
//! context and never propagated, so a broken notification channel can
//! never affect scheduling.

use std::time::Duration;
use tracing::{debug, warn};

/// Sends a short human-readable notification. Implementations must not
/// panic and must swallow (but log) their own failures.
pub trait Notifier: Send + Sync {
    fn send(&self, title: &str, message: &str);
}

/// Posts notifications to an [ntfy.sh](https://ntfy.sh) topic.
pub struct NtfyNotifier {
    topic: String,
}

impl NtfyNotifier {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
        }
    }
}

impl Notifier for NtfyNotifier {
    fn send(&self, title: &str, message: &str) {
        let url = format!("https://ntfy.sh/{}", self.topic);
        let result = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .and_then(|client| {
                client
                    .post(&url)
                    .header("Title", title)
                    .body(message.to_string())
                    .send()
            });
        match result {
            Ok(_) => debug!(topic = %self.topic, "notification sent"),
            Err(e) => warn!(topic = %self.topic, error = %e, "failed to send notification"),
        }
    }
}

/// Notifier used when no topic is configured: the message only reaches the
/// log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, title: &str, message: &str) {
        debug!(title, message, "notification (log only)");
    }
}
