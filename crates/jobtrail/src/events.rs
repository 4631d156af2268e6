//! Scan result events for the presentation layer.
//!
//! The core never renders anything; it broadcasts one event per scan
//! pass and the interface subscribes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Countable outcomes of one scan pass. Every skipped message and every
/// error shows up here; nothing is silently discarded.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    /// Messages fetched from the mailbox this pass.
    pub fetched: usize,
    /// New application records created.
    pub created: usize,
    /// Existing records updated.
    pub updated: usize,
    /// Messages skipped (not job-related, already folded in, or below
    /// the confidence floor).
    pub skipped: usize,
    /// Messages that could not be fetched or parsed.
    pub parse_failures: usize,
    /// Per-message or pass-level error descriptions.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// One completed (or failed) scan pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanEvent {
    /// Mailbox address scanned.
    pub mailbox: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: ScanSummary,
    /// Set when the pass failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Actionable state: credentials (or folder config) need attention
    /// and automatic retries are paused until a manual trigger.
    #[serde(default)]
    pub auth_failed: bool,
}

impl ScanEvent {
    pub fn success(mailbox: &str, started_at: DateTime<Utc>, summary: ScanSummary) -> Self {
        Self {
            mailbox: mailbox.to_string(),
            started_at,
            finished_at: Utc::now(),
            summary,
            error: None,
            auth_failed: false,
        }
    }

    pub fn failure(
        mailbox: &str,
        started_at: DateTime<Utc>,
        summary: ScanSummary,
        error: &str,
        auth_failed: bool,
    ) -> Self {
        Self {
            mailbox: mailbox.to_string(),
            started_at,
            finished_at: Utc::now(),
            summary,
            error: Some(error.to_string()),
            auth_failed,
        }
    }
}

/// Broadcasts scan events to all subscribers.
#[derive(Clone)]
pub struct ScanEventBroadcaster {
    sender: Arc<broadcast::Sender<ScanEvent>>,
}

impl ScanEventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends an event to all subscribers.
    pub fn send(&self, event: ScanEvent) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.sender.subscribe()
    }
}

impl Default for ScanEventBroadcaster {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_receive() {
        let broadcaster = ScanEventBroadcaster::new(8);
        let mut rx = broadcaster.subscribe();

        let summary = ScanSummary {
            fetched: 3,
            created: 1,
            updated: 1,
            skipped: 1,
            ..Default::default()
        };
        broadcaster.send(ScanEvent::success("me@example.com", Utc::now(), summary));

        let received = rx.try_recv().unwrap();
        assert_eq!(received.mailbox, "me@example.com");
        assert_eq!(received.summary.created, 1);
        assert!(received.error.is_none());
        assert!(!received.auth_failed);
    }

    #[test]
    fn test_send_without_receivers_is_fine() {
        let broadcaster = ScanEventBroadcaster::default();
        broadcaster.send(ScanEvent::success(
            "me@example.com",
            Utc::now(),
            ScanSummary::default(),
        ));
    }

    #[test]
    fn test_failure_event_serializes_camel_case() {
        let event = ScanEvent::failure(
            "me@example.com",
            Utc::now(),
            ScanSummary::default(),
            "Authentication failed: LOGIN rejected",
            true,
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"authFailed\":true"));
        assert!(json.contains("\"parseFailures\":0"));
        assert!(json.contains("Authentication failed"));
    }
}
