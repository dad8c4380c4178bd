//! Wi-Fi connectivity types carried by `wifi_status` events.
//!
//! The controller publishes partial status pushes: any field may be missing
//! or `null`. [`WifiStatusUpdate`] is that partial form, [`WifiStatus`] the
//! fully merged snapshot the console holds.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::envelope::{EventEnvelope, WIFI_STATUS};

/// Status string meaning the controller has an active Wi-Fi association.
pub const STATUS_CONNECTED: &str = "connected";

/// Status string meaning the controller is not associated with any network.
pub const STATUS_DISCONNECTED: &str = "disconnected";

/// Merged Wi-Fi connectivity snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiStatus {
    /// Network the controller is (or was last) associated with.
    pub ssid: Option<String>,
    /// Connectivity status, e.g. `connected`, `disconnected`, `connecting`.
    pub status: String,
    /// RFC 3339 time of the last successful association.
    pub last_connected_at: Option<String>,
    /// Last error reported by the controller's Wi-Fi service.
    pub last_error: Option<String>,
    /// Free-form status text.
    pub message: Option<String>,
}

impl Default for WifiStatus {
    fn default() -> Self {
        Self {
            ssid: None,
            status: STATUS_DISCONNECTED.to_string(),
            last_connected_at: None,
            last_error: None,
            message: None,
        }
    }
}

impl WifiStatus {
    /// Whether the snapshot reports an active association.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status == STATUS_CONNECTED
    }
}

/// Error extracting a [`WifiStatusUpdate`] from an event payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// The envelope carried no payload object at all.
    #[error("wifi_status event has no payload")]
    Missing,
    /// A recognised field held something other than a string or `null`.
    #[error("wifi_status field `{field}` must be a string or null")]
    WrongType {
        /// Name of the offending field.
        field: &'static str,
    },
    /// None of the recognised fields carried a value.
    #[error("wifi_status payload carries no status fields")]
    Empty,
}

/// Partial Wi-Fi status as pushed by the controller.
///
/// `None` means "not present in this push"; an explicit JSON `null` is
/// treated the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiStatusUpdate {
    /// Network name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    /// Connectivity status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Last successful association time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_connected_at: Option<String>,
    /// Last error text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Free-form status text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WifiStatusUpdate {
    /// Creates an update that only carries a status value.
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }

    /// Extracts an update from a `wifi_status` payload.
    ///
    /// Unknown keys are ignored. Fields are read independently so that a
    /// push carrying only `last_error` is still a valid update.
    ///
    /// # Errors
    ///
    /// - [`PayloadError::Missing`] if `payload` is `None`.
    /// - [`PayloadError::WrongType`] if a recognised field is not a string or `null`.
    /// - [`PayloadError::Empty`] if no recognised field carries a value.
    pub fn from_payload(payload: Option<&Map<String, Value>>) -> Result<Self, PayloadError> {
        let payload = payload.ok_or(PayloadError::Missing)?;
        let update = Self {
            ssid: string_field(payload, "ssid")?,
            status: string_field(payload, "status")?,
            last_connected_at: string_field(payload, "last_connected_at")?,
            last_error: string_field(payload, "last_error")?,
            message: string_field(payload, "message")?,
        };
        if update.is_empty() {
            return Err(PayloadError::Empty);
        }
        Ok(update)
    }

    /// Whether no field carries a value.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.ssid.is_none()
            && self.status.is_none()
            && self.last_connected_at.is_none()
            && self.last_error.is_none()
            && self.message.is_none()
    }

    /// Renders the present fields as a payload object.
    #[must_use]
    pub fn to_payload(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let fields = [
            ("ssid", &self.ssid),
            ("status", &self.status),
            ("last_connected_at", &self.last_connected_at),
            ("last_error", &self.last_error),
            ("message", &self.message),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                map.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        map
    }

    /// Wraps this update in a `wifi_status` envelope.
    #[must_use]
    pub fn into_envelope(self) -> EventEnvelope {
        let payload = self.to_payload();
        EventEnvelope::new(WIFI_STATUS).with_payload(payload)
    }
}

fn string_field(
    payload: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, PayloadError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(PayloadError::WrongType { field }),
    }
}

/// A network seen by the controller's last scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiNetwork {
    /// Network name.
    pub ssid: String,
    /// Signal quality, 0..=100.
    #[serde(default)]
    pub signal: i32,
    /// Security descriptor as reported by the scanner (e.g. `WPA2`).
    #[serde(default)]
    pub security: String,
    /// Whether this is the network the controller is associated with.
    #[serde(default)]
    pub active: bool,
}

impl WifiNetwork {
    /// Creates an inactive network entry.
    pub fn new(ssid: impl Into<String>, signal: i32, security: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            signal,
            security: security.into(),
            active: false,
        }
    }
}
