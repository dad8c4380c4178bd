//! Event envelope types for the AgriTroller event stream.
//!
//! Every text frame on `/api/ws/events` carries one JSON [`EventEnvelope`].
//! The envelope is a thin tag around an arbitrary payload; routing decides
//! what to do with a given `type`, so unknown types are never rejected here.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Event type published by the controller whenever Wi-Fi connectivity changes.
pub const WIFI_STATUS: &str = "wifi_status";

/// Greeting the event bus sends to every freshly attached subscriber.
pub const EVENT_BUS_CONNECTED: &str = "event_bus.connected";

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, nothing is wrong.
    Ok,
    /// Degraded but still working.
    Warning,
    /// Something failed.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Instruction attached to an envelope asking the client to surface a
/// notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationHint {
    /// How loud the notification should be.
    pub severity: Severity,
    /// Human-readable text.
    pub message: String,
    /// Subsystem that produced the event (e.g. `wifi`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// RFC 3339 creation time assigned by the publisher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl NotificationHint {
    /// Creates a hint with no explicit source or creation time.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            source: None,
            created_at: None,
        }
    }

    /// Sets the source subsystem.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the creation timestamp.
    #[must_use]
    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = Some(created_at.into());
        self
    }
}

/// A single decoded message from the event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Event type tag, e.g. [`WIFI_STATUS`].
    #[serde(rename = "type")]
    pub event_type: String,
    /// RFC 3339 time the event was published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Event-specific body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,
    /// Whether the publisher wants a notification shown for this event.
    #[serde(default)]
    pub notify: bool,
    /// Notification details, honoured only when `notify` is set.
    ///
    /// A hint that does not parse (unknown severity, missing message) is
    /// read as `None`; the rest of the envelope still decodes.
    #[serde(
        default,
        deserialize_with = "lenient_hint",
        skip_serializing_if = "Option::is_none"
    )]
    pub notification: Option<NotificationHint>,
}

fn lenient_hint<'de, D>(deserializer: D) -> Result<Option<NotificationHint>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| serde_json::from_value(value).ok()))
}

impl EventEnvelope {
    /// Creates a bare envelope of the given type.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: None,
            payload: None,
            notify: false,
            notification: None,
        }
    }

    /// Sets the publish timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Sets the payload object.
    #[must_use]
    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Attaches a notification hint and raises the `notify` flag.
    #[must_use]
    pub fn with_notification(mut self, hint: NotificationHint) -> Self {
        self.notify = true;
        self.notification = Some(hint);
        self
    }

    /// Returns the hint if, and only if, the envelope asks to be surfaced.
    #[must_use]
    pub const fn notification_hint(&self) -> Option<&NotificationHint> {
        match (&self.notification, self.notify) {
            (Some(hint), true) => Some(hint),
            _ => None,
        }
    }

    /// Whether this envelope carries a Wi-Fi status update.
    #[must_use]
    pub fn is_wifi_status(&self) -> bool {
        self.event_type == WIFI_STATUS
    }
}
