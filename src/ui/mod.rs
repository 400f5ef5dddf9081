// UI rendering module
//
// This module contains all UI rendering components for boltmap.
// The main draw() function orchestrates rendering of all UI panels.

mod event_log;
mod map;
mod status_bar;

use crate::app::AppState;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use event_log::render_event_log;
use map::render_world_map;
use status_bar::render_status_bar;

/// Main UI drawing function
pub fn draw(f: &mut Frame, app: &mut AppState) {
    let size = f.area();

    // Main layout: body, status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Body
            Constraint::Length(3), // Status bar
        ])
        .split(size);

    // Body: map + event log
    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(75), // World map
            Constraint::Percentage(25), // Event log
        ])
        .split(chunks[0]);

    render_world_map(f, body_chunks[0], app);
    render_event_log(f, body_chunks[1], app);
    render_status_bar(f, chunks[1], app);
}
