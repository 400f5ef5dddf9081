// Event log rendering module
//
// Renders the in-memory log, newest line at the bottom, with channel
// events colored by status.

use crate::app::{AppState, LogEntry, LogKind};
use crate::theme::{status_color, BLOOD_RED, BONE_WHITE, NEON_PURPLE};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem},
    Frame,
};

fn entry_color(kind: LogKind) -> Color {
    match kind {
        LogKind::Info => BONE_WHITE,
        LogKind::Warn => BLOOD_RED,
        LogKind::Channel(status) => status_color(status),
    }
}

fn entry_line(entry: &LogEntry) -> Line<'_> {
    Line::from(vec![
        Span::styled(
            entry.at.format("%H:%M:%S ").to_string(),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            entry.message.as_str(),
            Style::default().fg(entry_color(entry.kind)),
        ),
    ])
}

pub fn render_event_log(f: &mut Frame, area: Rect, app: &AppState) {
    // Only the tail that fits between the borders
    let visible = area.height.saturating_sub(2) as usize;
    let skip = app.logs.len().saturating_sub(visible);
    let items: Vec<ListItem> = app
        .logs
        .iter()
        .skip(skip)
        .map(|entry| ListItem::new(entry_line(entry)))
        .collect();

    let title = format!("━ Event Log ({}) ", app.logs.len());
    let list = List::new(items).block(
        Block::default()
            .title(Span::styled(
                title,
                Style::default().fg(NEON_PURPLE).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(NEON_PURPLE)),
    );

    f.render_widget(list, area);
}
