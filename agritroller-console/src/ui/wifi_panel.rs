//! Wi-Fi snapshot and known-network rendering.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use super::theme;
use crate::app::{App, PanelFocus};

/// Render the Wi-Fi status box above the network list.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(3)])
        .split(area);

    render_status(frame, chunks[0], app);
    render_networks(frame, chunks[1], app);
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let lines = match &app.wifi {
        None => vec![Line::from(Span::styled("No status yet", theme::dimmed()))],
        Some(status) => {
            let color = if status.is_connected() {
                theme::SUCCESS
            } else {
                theme::ERROR
            };
            let mut lines = vec![
                Line::from(vec![
                    Span::styled("\u{25cf} ", theme::normal().fg(color)),
                    Span::styled(status.status.as_str(), theme::bold()),
                ]),
                Line::from(vec![
                    Span::styled("SSID: ", theme::dimmed()),
                    Span::raw(status.ssid.as_deref().unwrap_or("-")),
                ]),
            ];
            if let Some(at) = &status.last_connected_at {
                lines.push(Line::from(vec![
                    Span::styled("Since: ", theme::dimmed()),
                    Span::raw(app.format_timestamp(at)),
                ]));
            }
            if let Some(err) = &status.last_error {
                lines.push(Line::from(Span::styled(
                    err.as_str(),
                    theme::normal().fg(theme::ERROR),
                )));
            }
            if let Some(message) = &status.message {
                lines.push(Line::from(Span::styled(message.as_str(), theme::dimmed())));
            }
            lines
        }
    };

    let block = Block::default()
        .title(Span::styled(" Wi-Fi ", theme::panel_title(theme::WIFI_TITLE)))
        .borders(Borders::ALL)
        .border_style(theme::normal());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_networks(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus == PanelFocus::Networks;

    let items: Vec<ListItem> = app
        .networks
        .iter()
        .map(|network| {
            let marker = if network.active { "\u{2713} " } else { "  " };
            ListItem::new(Line::from(vec![
                Span::styled(marker, theme::normal().fg(theme::SUCCESS)),
                Span::styled(network.ssid.as_str(), theme::normal()),
                Span::styled(
                    format!("  {}% {}", network.signal, network.security),
                    theme::dimmed(),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .title("Networks")
        .borders(Borders::ALL)
        .border_style(if is_focused {
            theme::highlighted()
        } else {
            theme::normal()
        });

    let list = List::new(items).block(block).highlight_style(theme::selected());
    let mut state = ListState::default();
    if is_focused && !app.networks.is_empty() {
        state.select(Some(app.selected_network));
    }
    frame.render_stateful_widget(list, area, &mut state);
}
