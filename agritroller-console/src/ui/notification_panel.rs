//! Notification feed rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};

use super::theme;
use crate::app::{App, PanelFocus};

/// Render the notification feed, newest first.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus == PanelFocus::Notifications;

    let items: Vec<ListItem> = if app.notifications.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "No notifications",
            theme::dimmed(),
        )))]
    } else {
        app.notifications
            .iter()
            .map(|record| {
                let marker = if record.is_read { "  " } else { "\u{25cf} " };
                let message_style = if record.is_read {
                    theme::dimmed()
                } else {
                    theme::bold()
                };
                ListItem::new(Line::from(vec![
                    Span::styled(
                        marker,
                        theme::normal().fg(theme::severity_color(record.severity)),
                    ),
                    Span::styled(app.format_timestamp(&record.created_at), theme::timestamp()),
                    Span::raw(" "),
                    Span::styled(format!("[{}]", record.source), theme::dimmed()),
                    Span::raw(" "),
                    Span::styled(record.message.as_str(), message_style),
                ]))
            })
            .collect()
    };

    let unread = app.unread_count();
    let title = if unread > 0 {
        Span::styled(
            format!(" Notifications ({unread} unread) "),
            theme::unread_badge(),
        )
    } else {
        Span::styled(
            " Notifications ",
            theme::panel_title(theme::NOTIFICATIONS_TITLE),
        )
    };

    let block = Block::default()
        .title(Line::from(title))
        .borders(Borders::ALL)
        .border_style(if is_focused {
            theme::highlighted()
        } else {
            theme::normal()
        });

    let list = List::new(items)
        .block(block)
        .highlight_style(if is_focused {
            theme::selected()
        } else {
            theme::highlighted()
        });

    let mut state = ListState::default();
    if !app.notifications.is_empty() {
        state.select(Some(app.selected_notification));
    }
    frame.render_stateful_widget(list, area, &mut state);
}
