//! Notification records as shown in the console's notification feed.

use serde::{Deserialize, Serialize};

use crate::envelope::Severity;

/// A single entry of the notification feed.
///
/// Records fetched from the controller's REST API carry the positive
/// database id. Records synthesized by the console from stream events carry
/// negative ids so the two never collide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Server id (positive) or transient id (negative).
    pub id: i64,
    /// Event type the record was derived from.
    pub event_type: String,
    /// Severity.
    pub severity: Severity,
    /// Originating subsystem.
    pub source: String,
    /// Human-readable text.
    pub message: String,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// Whether the operator has acknowledged the record.
    #[serde(default)]
    pub is_read: bool,
}

impl NotificationRecord {
    /// Whether this record was synthesized locally and is unknown to the server.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        self.id < 0
    }
}
