//! Application state and key handling for the operator console.
//!
//! [`App`] holds a copy of what the stream publishes, refreshed once per UI
//! tick, plus the UI's own selection state. Key presses that need the stream
//! come back as [`Action`]s for the main loop to carry out.

use std::fmt::Write as _;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use agritroller_proto::notification::NotificationRecord;
use agritroller_proto::wifi::{WifiNetwork, WifiStatus};

use crate::stream::{StreamError, StreamHandle, StreamStatus};

/// Which panel is currently focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelFocus {
    /// Notification feed (default).
    #[default]
    Notifications,
    /// Known Wi-Fi networks.
    Networks,
}

/// Work requested by a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Start streaming.
    Connect,
    /// Stop streaming.
    Disconnect,
    /// Mark one notification read.
    MarkRead(i64),
    /// Mark every notification read.
    MarkAllRead,
    /// Drop one notification.
    Remove(i64),
    /// Drop every notification.
    Clear,
}

impl Action {
    /// Carries the action out against the running stream.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Stopped`] if a connect or disconnect cannot
    /// reach the driver.
    pub fn apply(self, stream: &StreamHandle) -> Result<(), StreamError> {
        match self {
            Self::Connect => stream.connect()?,
            Self::Disconnect => stream.disconnect()?,
            Self::MarkRead(id) => {
                stream.notification_feed().write().mark_read(id);
            }
            Self::MarkAllRead => {
                stream.notification_feed().write().mark_all_read();
            }
            Self::Remove(id) => {
                stream.notification_feed().write().remove(id);
            }
            Self::Clear => stream.notification_feed().write().clear(),
        }
        Ok(())
    }
}

/// Main application state.
#[derive(Debug, Default)]
pub struct App {
    /// Stream diagnostics as of the last refresh.
    pub stream: StreamStatus,
    /// Wi-Fi snapshot as of the last refresh.
    pub wifi: Option<WifiStatus>,
    /// Known networks as of the last refresh.
    pub networks: Vec<WifiNetwork>,
    /// Notifications as of the last refresh, newest first.
    pub notifications: Vec<NotificationRecord>,
    /// Which panel is focused.
    pub focus: PanelFocus,
    /// Selected row in the notification panel.
    pub selected_notification: usize,
    /// Selected row in the network panel.
    pub selected_network: usize,
    /// Chrono format for notification timestamps.
    pub timestamp_format: String,
    /// Whether the app should quit.
    pub should_quit: bool,
}

impl App {
    /// Create an empty application.
    #[must_use]
    pub fn new(timestamp_format: impl Into<String>) -> Self {
        Self {
            timestamp_format: timestamp_format.into(),
            ..Self::default()
        }
    }

    /// Copy the latest published state out of the stream.
    pub fn refresh(&mut self, stream: &StreamHandle) {
        self.stream = stream.status();
        self.wifi = stream.wifi_status();
        self.networks = stream.wifi_networks();
        self.notifications = stream.notifications();
        self.clamp_selection();
    }

    /// Number of unread notifications in the last refresh.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.is_read).count()
    }

    /// The notification under the cursor, if any.
    #[must_use]
    pub fn selected_record(&self) -> Option<&NotificationRecord> {
        self.notifications.get(self.selected_notification)
    }

    /// Formats an RFC 3339 timestamp for display. Input that does not parse,
    /// or a pattern chrono cannot render, shows the raw text instead.
    #[must_use]
    pub fn format_timestamp(&self, raw: &str) -> String {
        let Ok(time) = chrono::DateTime::parse_from_rfc3339(raw) else {
            return raw.to_string();
        };
        let local = time.with_timezone(&chrono::Local);
        let mut out = String::new();
        match write!(out, "{}", local.format(&self.timestamp_format)) {
            Ok(()) => out,
            Err(_) => raw.to_string(),
        }
    }

    /// Handle a key event.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<Action> {
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Esc | KeyCode::Char('q'), _) => {
                self.should_quit = true;
                None
            }
            (KeyCode::Tab | KeyCode::BackTab, _) => {
                self.toggle_focus();
                None
            }
            (KeyCode::Char('c'), _) => Some(Action::Connect),
            (KeyCode::Char('d'), _) => Some(Action::Disconnect),
            (KeyCode::Char('R'), _) => Some(Action::MarkAllRead),
            (KeyCode::Char('X'), _) => Some(Action::Clear),
            (KeyCode::Char('r') | KeyCode::Enter, _) if self.focus == PanelFocus::Notifications => {
                self.selected_record().map(|n| Action::MarkRead(n.id))
            }
            (KeyCode::Char('x') | KeyCode::Delete, _)
                if self.focus == PanelFocus::Notifications =>
            {
                self.selected_record().map(|n| Action::Remove(n.id))
            }
            (KeyCode::Up | KeyCode::Char('k'), _) => {
                self.move_selection(false);
                None
            }
            (KeyCode::Down | KeyCode::Char('j'), _) => {
                self.move_selection(true);
                None
            }
            _ => None,
        }
    }

    const fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            PanelFocus::Notifications => PanelFocus::Networks,
            PanelFocus::Networks => PanelFocus::Notifications,
        };
    }

    fn move_selection(&mut self, down: bool) {
        let (selected, len) = match self.focus {
            PanelFocus::Notifications => {
                (&mut self.selected_notification, self.notifications.len())
            }
            PanelFocus::Networks => (&mut self.selected_network, self.networks.len()),
        };
        if down {
            if *selected + 1 < len {
                *selected += 1;
            }
        } else {
            *selected = selected.saturating_sub(1);
        }
    }

    fn clamp_selection(&mut self) {
        self.selected_notification = self
            .selected_notification
            .min(self.notifications.len().saturating_sub(1));
        self.selected_network = self
            .selected_network
            .min(self.networks.len().saturating_sub(1));
    }
}
