use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

pub const DEFAULT_NOTIFICATION_TTL_MS: i64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Error,
}

/// A transient message for the user. Renderers hide it after `expires_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    pub raised_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Notifications raised since the last render.
#[derive(Debug, Clone)]
pub struct Notifier {
    ttl: Duration,
    pending: Vec<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_TTL_MS)
    }
}

impl Notifier {
    pub fn new(ttl_ms: i64) -> Self {
        Self {
            ttl: Duration::milliseconds(ttl_ms.max(0)),
            pending: Vec::new(),
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(message.into(), NotificationLevel::Info);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(message.into(), NotificationLevel::Error);
    }

    fn push(&mut self, message: String, level: NotificationLevel) {
        let raised_at = Utc::now();
        self.pending.push(Notification {
            message,
            level,
            raised_at,
            expires_at: raised_at + self.ttl,
        });
    }

    #[cfg(test)]
    pub fn pending(&self) -> &[Notification] {
        &self.pending
    }

    /// Hands pending notifications to the renderer; each is shown once.
    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_expires_after_ttl() {
        let mut notifier = Notifier::new(3000);
        notifier.error("Failed to load test 7");

        let n = &notifier.pending()[0];
        assert_eq!(n.level, NotificationLevel::Error);
        assert_eq!((n.expires_at - n.raised_at).num_milliseconds(), 3000);
    }

    #[test]
    fn test_drain_empties_queue() {
        let mut notifier = Notifier::default();
        notifier.info("Saved");
        notifier.error("Oops");

        let drained = notifier.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].level, NotificationLevel::Info);
        assert!(notifier.pending().is_empty());
    }
}
