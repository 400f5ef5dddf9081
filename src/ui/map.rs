// World map rendering module
//
// Paints the draw-list on a braille Canvas whose coordinate space is the
// map's pixel space (2 dots per column, 4 per row). Layers, bottom to top:
// landmass outlines, channel lines, node markers, bolt halos, bolts.
// The zoom transform is applied here; the draw-list itself stays untouched.

use crate::app::event::{DOTS_PER_COL, DOTS_PER_ROW};
use crate::app::AppState;
use crate::engine::ViewportTransform;
use crate::theme::{fade, glow, status_color, BONE_WHITE, NEON_PURPLE, SLATE, STORM_NAVY};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{
        canvas::{Canvas, Context, Line as CanvasLine, Points},
        Block, BorderType, Borders,
    },
    Frame,
};
use std::time::Instant;

/// Vertical offset of the bolt halo, in dots
const HALO_OFFSET: f64 = 2.0;

/// Map a pre-viewport point into canvas space (zoomed, y pointing up)
pub fn to_canvas(point: (f64, f64), transform: &ViewportTransform, height: f64) -> (f64, f64) {
    let (x, y) = transform.apply(point);
    (x, height - y)
}

/// Consecutive point pairs of a ring, closing back to the first point
pub fn ring_segments(ring: &[(f64, f64)]) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + '_ {
    let closing = match (ring.first(), ring.last()) {
        (Some(&first), Some(&last)) if ring.len() > 2 && first != last => Some((last, first)),
        _ => None,
    };
    ring.windows(2).map(|w| (w[0], w[1])).chain(closing)
}

fn draw_segment(
    ctx: &mut Context<'_>,
    from: (f64, f64),
    to: (f64, f64),
    color: Color,
    transform: &ViewportTransform,
    height: f64,
) {
    let (x1, y1) = to_canvas(from, transform, height);
    let (x2, y2) = to_canvas(to, transform, height);
    ctx.draw(&CanvasLine {
        x1,
        y1,
        x2,
        y2,
        color,
    });
}

pub fn render_world_map(f: &mut Frame, area: Rect, app: &mut AppState) {
    let title = format!(
        " ⚡ Channel Map  nodes:{} channels:{} bolts:{} ",
        app.core.scene().markers.len(),
        app.core.scene().channels.len(),
        app.core.effects_len()
    );
    let block = Block::default()
        .title(Span::styled(
            title,
            Style::default().fg(NEON_PURPLE).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(NEON_PURPLE));

    let inner = block.inner(area);
    let width = inner.width as f64 * DOTS_PER_COL;
    let height = inner.height as f64 * DOTS_PER_ROW;
    app.map_area = inner;
    app.on_resize(width, height);

    let transform = app.core.transform();
    let scene = app.core.scene();
    let bolts = app.core.effect_paths(Instant::now());
    let hovered = app.hovered.as_deref();

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .background_color(STORM_NAVY)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(move |ctx| {
            for ring in &scene.landmasses {
                for (a, b) in ring_segments(ring) {
                    draw_segment(ctx, a, b, SLATE, &transform, height);
                }
            }
            ctx.layer();

            for line in &scene.channels {
                draw_segment(ctx, line.from, line.to, line.color, &transform, height);
            }
            ctx.layer();

            for marker in &scene.markers {
                let point = to_canvas(marker.position, &transform, height);
                ctx.draw(&Points {
                    coords: &[point],
                    color: marker.color,
                });
            }
            ctx.layer();

            for bolt in &bolts {
                let halo = glow(fade(status_color(bolt.status), bolt.opacity));
                for pair in bolt.points.windows(2) {
                    for dy in [-HALO_OFFSET, HALO_OFFSET] {
                        let a = (pair[0].0, pair[0].1 + dy / transform.scale);
                        let b = (pair[1].0, pair[1].1 + dy / transform.scale);
                        draw_segment(ctx, a, b, halo, &transform, height);
                    }
                }
            }
            ctx.layer();

            for bolt in &bolts {
                let color = fade(status_color(bolt.status), bolt.opacity);
                for pair in bolt.points.windows(2) {
                    draw_segment(ctx, pair[0], pair[1], color, &transform, height);
                }
            }

            if let Some(label) = hovered {
                if let Some(marker) = scene.markers.iter().find(|m| m.label == label) {
                    let (x, y) = to_canvas(marker.position, &transform, height);
                    ctx.print(
                        x,
                        y,
                        Span::styled(
                            format!(" {}", label),
                            Style::default().fg(BONE_WHITE).add_modifier(Modifier::BOLD),
                        ),
                    );
                }
            }
        });

    f.render_widget(canvas, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_canvas_flips_y() {
        let identity = ViewportTransform::IDENTITY;
        assert_eq!(to_canvas((10.0, 0.0), &identity, 80.0), (10.0, 80.0));
        assert_eq!(to_canvas((10.0, 80.0), &identity, 80.0), (10.0, 0.0));
    }

    #[test]
    fn test_to_canvas_applies_zoom() {
        let zoomed = ViewportTransform {
            translate_x: -10.0,
            translate_y: -5.0,
            scale: 2.0,
        };
        assert_eq!(to_canvas((10.0, 10.0), &zoomed, 100.0), (10.0, 85.0));
    }

    #[test]
    fn test_ring_segments_close_the_ring() {
        let ring = [(0.0, 0.0), (4.0, 0.0), (4.0, 4.0)];
        let segments: Vec<_> = ring_segments(&ring).collect();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[2], ((4.0, 4.0), (0.0, 0.0)));
    }

    #[test]
    fn test_ring_segments_already_closed() {
        let ring = [(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 0.0)];
        assert_eq!(ring_segments(&ring).count(), 3);
        assert_eq!(ring_segments(&[]).count(), 0);
    }
}
