//! Terminal UI rendering.

pub mod notification_panel;
pub mod status_bar;
pub mod theme;
pub mod wifi_panel;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
};

use crate::app::App;

/// Main draw function for the entire UI.
pub fn draw(frame: &mut Frame, app: &App) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(65), // Notifications
            Constraint::Percentage(35), // Wi-Fi
        ])
        .split(main_chunks[0]);

    notification_panel::render(frame, content_chunks[0], app);
    wifi_panel::render(frame, content_chunks[1], app);
    status_bar::render(frame, main_chunks[1], app);
}
