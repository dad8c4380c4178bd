//! Status bar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme;
use crate::app::{App, PanelFocus};

/// Render the status bar at the bottom of the screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let help_text = match app.focus {
        PanelFocus::Notifications => {
            "c/d: connect/disconnect | r: read | R: read all | x: remove | Tab | q: quit"
        }
        PanelFocus::Networks => "c/d: connect/disconnect | \u{2191}\u{2193}/jk: navigate | Tab | q: quit",
    };

    let state = app.stream.connection;
    let mut spans = vec![
        Span::styled("AgriTroller", theme::bold()),
        Span::raw(" | "),
        Span::styled("\u{25cf}", theme::normal().fg(theme::connection_color(state))),
        Span::raw(format!(" {state}")),
    ];
    if let Some(err) = &app.stream.last_error {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(err.as_str(), theme::normal().fg(theme::ERROR)));
    }
    if let Some(event) = &app.stream.last_event {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("last: {}", event.event_type),
            theme::dimmed(),
        ));
    }
    spans.push(Span::raw(" | "));
    spans.push(Span::styled(help_text, theme::dimmed()));

    let paragraph = Paragraph::new(Line::from(spans)).style(theme::status_bar_bg());
    frame.render_widget(paragraph, area);
}
