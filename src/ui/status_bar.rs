// Status bar rendering module
//
// Renders the bottom status bar: hover label or fetch error on the left,
// then key hints by priority as width allows, then live counters.

use crate::app::AppState;
use crate::theme::{AMBER, BLOOD_RED, BONE_WHITE, NEON_PURPLE, TOXIC_GREEN};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

struct Hint {
    priority: u8,
    key: &'static str,
    desc: &'static str,
    color: Color,
}

static HINTS: [Hint; 4] = [
    Hint {
        priority: 1,
        key: "Q:",
        desc: "Quit | ",
        color: Color::Red,
    },
    Hint {
        priority: 1,
        key: "L:",
        desc: "Bolt | ",
        color: NEON_PURPLE,
    },
    Hint {
        priority: 2,
        key: "R:",
        desc: "Poll | ",
        color: NEON_PURPLE,
    },
    Hint {
        priority: 2,
        key: "0:",
        desc: "Zoom reset | ",
        color: NEON_PURPLE,
    },
];

/// Key hints that fit in `available` columns, highest priority first
fn fitting_hints(available: usize) -> Vec<&'static Hint> {
    let mut chosen = Vec::new();
    let mut used = 0;
    for priority in 1..=2 {
        for hint in HINTS.iter().filter(|h| h.priority == priority) {
            let len = hint.key.len() + hint.desc.len();
            if used + len <= available {
                chosen.push(hint);
                used += len;
            }
        }
    }
    chosen
}

/// Counters shown at the end of the bar
pub fn build_counters(app: &AppState) -> Vec<Span<'static>> {
    let scale = app.core.transform().scale;
    vec![
        Span::styled("[x", Style::default().fg(BONE_WHITE)),
        Span::styled(
            format!("{:.2}", scale),
            Style::default().fg(TOXIC_GREEN).add_modifier(Modifier::BOLD),
        ),
        Span::styled("] [pending:", Style::default().fg(BONE_WHITE)),
        Span::styled(
            app.core.pending_len().to_string(),
            Style::default().fg(AMBER).add_modifier(Modifier::BOLD),
        ),
        Span::styled("]", Style::default().fg(BONE_WHITE)),
    ]
}

pub fn render_status_bar(f: &mut Frame, area: Rect, app: &AppState) {
    let mut spans = vec![Span::styled(" ⚡ ", Style::default().fg(NEON_PURPLE))];

    if let Some(label) = &app.hovered {
        spans.push(Span::styled(
            format!("{}  ", label),
            Style::default().fg(BONE_WHITE).add_modifier(Modifier::BOLD),
        ));
    } else if let Some(error) = &app.fetch_error {
        spans.push(Span::styled(
            format!("{}  ", error),
            Style::default().fg(BLOOD_RED),
        ));
    }

    let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    let available = (area.width as usize).saturating_sub(4 + 24 + used);
    for hint in fitting_hints(available) {
        spans.push(Span::styled(
            hint.key,
            Style::default().fg(hint.color).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(hint.desc));
    }
    spans.extend(build_counters(app));

    let status_bar = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .border_style(Style::default().fg(NEON_PURPLE)),
        )
        .alignment(Alignment::Left);

    f.render_widget(status_bar, area);
}
