// Keyboard and mouse event handling
//
// Translates terminal input into AppState step functions. Mouse positions
// arrive as terminal cells and are mapped into the map canvas's braille
// pixel space (2 columns x 4 rows of dots per cell).

use super::{AppState, WHEEL_NOTCH_DELTA};
use crossterm::event::{KeyCode, MouseEvent, MouseEventKind};
use std::time::Instant;

/// Braille dots per terminal cell
pub const DOTS_PER_COL: f64 = 2.0;
pub const DOTS_PER_ROW: f64 = 4.0;

/// Handle keyboard events and update application state
///
/// Returns `true` if the application should continue running,
/// `false` if it should exit.
///
/// # Key Bindings
/// - `q`, `Q`, `Esc` - Quit the application
/// - `l`, `L` - Fire a debug bolt between two random nodes
/// - `r`, `R` - Poll the snapshot source now
/// - `0` - Reset zoom
pub fn handle_key_event(app: &mut AppState, key: KeyCode) -> bool {
    match key {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
            app.running = false;
            false
        }
        KeyCode::Char('l') | KeyCode::Char('L') => {
            app.trigger_debug_bolt(Instant::now());
            true
        }
        KeyCode::Char('r') | KeyCode::Char('R') => {
            app.force_poll();
            true
        }
        KeyCode::Char('0') => {
            app.reset_zoom();
            true
        }
        _ => true,
    }
}

/// Handle mouse events over the map panel
///
/// The wheel zooms around the pointer; plain motion updates the hover label.
/// Events outside the map panel are ignored.
pub fn handle_mouse_event(app: &mut AppState, mouse: MouseEvent) {
    let Some(point) = cell_to_pixel(app, mouse.column, mouse.row) else {
        if matches!(mouse.kind, MouseEventKind::Moved) {
            app.hovered = None;
        }
        return;
    };

    match mouse.kind {
        // Wheel up zooms in, matching a negative DOM deltaY
        MouseEventKind::ScrollUp => app.on_wheel(-WHEEL_NOTCH_DELTA, point),
        MouseEventKind::ScrollDown => app.on_wheel(WHEEL_NOTCH_DELTA, point),
        MouseEventKind::Moved => app.on_hover(point),
        _ => {}
    }
}

/// Center of a terminal cell in map pixel coordinates (y pointing down)
fn cell_to_pixel(app: &AppState, column: u16, row: u16) -> Option<(f64, f64)> {
    let area = app.map_area;
    if column < area.x
        || row < area.y
        || column >= area.x.saturating_add(area.width)
        || row >= area.y.saturating_add(area.height)
    {
        return None;
    }
    let x = (column - area.x) as f64 * DOTS_PER_COL + DOTS_PER_COL / 2.0;
    let y = (row - area.y) as f64 * DOTS_PER_ROW + DOTS_PER_ROW / 2.0;
    Some((x, y))
}
