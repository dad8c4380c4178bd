//! Theme and styling constants for the TUI.

use ratatui::style::{Color, Modifier, Style};

use agritroller_proto::envelope::Severity;

use crate::stream::lifecycle::ConnectionState;

/// Primary foreground color.
pub const FG_PRIMARY: Color = Color::White;

/// Secondary foreground color (dimmed text).
pub const FG_SECONDARY: Color = Color::Gray;

/// Highlight color for focused elements.
pub const HIGHLIGHT: Color = Color::Cyan;

/// Success/online indicator color.
pub const SUCCESS: Color = Color::Green;

/// Warning indicator color.
pub const WARNING: Color = Color::Yellow;

/// Error indicator color.
pub const ERROR: Color = Color::Red;

/// Offline indicator color.
pub const OFFLINE: Color = Color::DarkGray;

/// Panel title color for the notification panel.
pub const NOTIFICATIONS_TITLE: Color = Color::Cyan;

/// Panel title color for the Wi-Fi panel.
pub const WIFI_TITLE: Color = Color::Green;

/// Normal text style.
#[must_use]
pub fn normal() -> Style {
    Style::default().fg(FG_PRIMARY)
}

/// Dimmed text style (timestamps, metadata).
#[must_use]
pub fn dimmed() -> Style {
    Style::default().fg(FG_SECONDARY)
}

/// Bold text style.
#[must_use]
pub fn bold() -> Style {
    Style::default().fg(FG_PRIMARY).add_modifier(Modifier::BOLD)
}

/// Highlighted text style (focused panel borders).
#[must_use]
pub fn highlighted() -> Style {
    Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

/// Selected item style (in lists).
#[must_use]
pub fn selected() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(HIGHLIGHT)
        .add_modifier(Modifier::BOLD)
}

/// Color of a notification's severity marker.
#[must_use]
pub const fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Ok => SUCCESS,
        Severity::Warning => WARNING,
        Severity::Error => ERROR,
    }
}

/// Color of the connection indicator dot.
#[must_use]
pub const fn connection_color(state: ConnectionState) -> Color {
    match state {
        ConnectionState::Connected => SUCCESS,
        ConnectionState::Reconnecting => WARNING,
        ConnectionState::Disconnected => OFFLINE,
    }
}

/// Style for timestamps (dark gray).
#[must_use]
pub fn timestamp() -> Style {
    Style::default().fg(Color::Rgb(120, 120, 120))
}

/// Style for the status bar background (dark background with white foreground).
#[must_use]
pub fn status_bar_bg() -> Style {
    Style::default().fg(Color::White).bg(Color::Rgb(30, 30, 50))
}

/// Style for panel titles with a given color (bold).
#[must_use]
pub fn panel_title(color: Color) -> Style {
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// Style for unread count badges (bold yellow on dark background).
#[must_use]
pub fn unread_badge() -> Style {
    Style::default()
        .fg(Color::Yellow)
        .bg(Color::Rgb(30, 30, 50))
        .add_modifier(Modifier::BOLD)
}
