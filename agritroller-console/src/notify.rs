//! Notification feed and dispatcher.
//!
//! The feed is a bounded, newest-first list of [`NotificationRecord`]s. It
//! mixes records fetched from the controller (positive ids) with transient
//! records the console synthesizes from stream events (negative ids).
//!
//! # Invariants
//!
//! - The feed never holds more than [`MAX_NOTIFICATIONS`] records; the
//!   oldest fall off the end.
//! - Transient ids are unique for the lifetime of the process.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};

use agritroller_proto::envelope::{NotificationHint, Severity};
use agritroller_proto::notification::NotificationRecord;
use agritroller_proto::wifi::WifiStatusUpdate;

use crate::reconcile::Transition;

/// Maximum number of records the feed keeps.
pub const MAX_NOTIFICATIONS: usize = 50;

/// Source recorded when a hint does not name one.
pub const DEFAULT_SOURCE: &str = "event_bus";

/// Source of notifications derived from Wi-Fi transitions.
pub const WIFI_SOURCE: &str = "wifi";

static NEXT_TRANSIENT_ID: AtomicI64 = AtomicI64::new(-1);

/// Allocates the next transient id: -1, -2, -3, ...
fn next_transient_id() -> i64 {
    NEXT_TRANSIENT_ID.fetch_sub(1, Ordering::Relaxed)
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Bounded newest-first notification collection.
#[derive(Debug, Clone, Default)]
pub struct NotificationFeed {
    records: VecDeque<NotificationRecord>,
}

impl NotificationFeed {
    /// Creates an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &NotificationRecord> {
        self.records.iter()
    }

    /// Copies the records out, newest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<NotificationRecord> {
        self.records.iter().cloned().collect()
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the feed is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records not yet marked read.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.records.iter().filter(|r| !r.is_read).count()
    }

    /// Synthesizes a record from an envelope's notification hint.
    ///
    /// Severity and message are copied verbatim; the source defaults to
    /// [`DEFAULT_SOURCE`] and the creation time to now.
    pub fn dispatch(&mut self, event_type: &str, hint: &NotificationHint) -> NotificationRecord {
        let record = NotificationRecord {
            id: next_transient_id(),
            event_type: event_type.to_string(),
            severity: hint.severity,
            source: hint
                .source
                .clone()
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            message: hint.message.clone(),
            created_at: hint.created_at.clone().unwrap_or_else(now_rfc3339),
            is_read: false,
        };
        self.push(record.clone());
        record
    }

    /// Synthesizes a record for a detected Wi-Fi transition.
    ///
    /// `context` is the update that caused the transition; its ssid and
    /// last error end up in the message.
    pub fn dispatch_transition(
        &mut self,
        transition: Transition,
        context: &WifiStatusUpdate,
    ) -> NotificationRecord {
        let (event_type, severity, message) = match transition {
            Transition::BecameConnected => (
                "wifi_connected",
                Severity::Ok,
                format!(
                    "Wi-Fi connected: {}",
                    context.ssid.as_deref().unwrap_or("unknown network")
                ),
            ),
            Transition::BecameDisconnected => (
                "wifi_disconnected",
                Severity::Error,
                context.last_error.as_deref().map_or_else(
                    || "Wi-Fi disconnected".to_string(),
                    |err| format!("Wi-Fi disconnected: {err}"),
                ),
            ),
        };
        let record = NotificationRecord {
            id: next_transient_id(),
            event_type: event_type.to_string(),
            severity,
            source: WIFI_SOURCE.to_string(),
            message,
            created_at: now_rfc3339(),
            is_read: false,
        };
        self.push(record.clone());
        record
    }

    /// Replaces the feed with a page fetched from the controller.
    ///
    /// `records` must already be newest first; anything past
    /// [`MAX_NOTIFICATIONS`] is dropped.
    pub fn replace(&mut self, records: Vec<NotificationRecord>) {
        self.records = records.into_iter().take(MAX_NOTIFICATIONS).collect();
    }

    /// Marks one record read. Returns `false` if it is unknown or already read.
    pub fn mark_read(&mut self, id: i64) -> bool {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(record) if !record.is_read => {
                record.is_read = true;
                true
            }
            _ => false,
        }
    }

    /// Marks every record read and returns how many changed.
    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for record in self.records.iter_mut().filter(|r| !r.is_read) {
            record.is_read = true;
            changed += 1;
        }
        changed
    }

    /// Removes one record. Returns `false` if it was not present.
    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        self.records.len() != before
    }

    /// Drops every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    fn push(&mut self, record: NotificationRecord) {
        self.records.push_front(record);
        self.records.truncate(MAX_NOTIFICATIONS);
    }
}
