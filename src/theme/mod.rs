// Theme module - color palette and color scales
//
// Storm palette for the map: dark sea, slate land, amber bolts for channel
// opens and red bolts for closes. Channel lines use a sequential ramp keyed
// on edge index; node markers are colored by a hash of the country code.

use crate::net::ChannelStatus;
use ratatui::style::Color;

/// Map background (sea)
/// RGB: (16, 20, 34)
pub const STORM_NAVY: Color = Color::Rgb(16, 20, 34);

/// Landmass outlines
/// RGB: (72, 84, 110)
pub const SLATE: Color = Color::Rgb(72, 84, 110);

/// Panel borders and titles
/// RGB: (187, 154, 247)
pub const NEON_PURPLE: Color = Color::Rgb(187, 154, 247);

/// Warm accent - channel opened
/// RGB: (255, 196, 87)
pub const AMBER: Color = Color::Rgb(255, 196, 87);

/// Danger accent - channel closed
/// RGB: (247, 118, 142)
pub const BLOOD_RED: Color = Color::Rgb(247, 118, 142);

/// Neutral marker color for nodes without a country
/// RGB: (169, 177, 214)
pub const BONE_WHITE: Color = Color::Rgb(169, 177, 214);

/// Healthy / informational text
/// RGB: (158, 206, 106)
pub const TOXIC_GREEN: Color = Color::Rgb(158, 206, 106);

/// Ends of the sequential channel ramp (light to deep blue)
const CHANNEL_RAMP_START: (u8, u8, u8) = (198, 219, 239);
const CHANNEL_RAMP_END: (u8, u8, u8) = (33, 113, 181);

/// Categorical palette for node markers
const NODE_PALETTE: [(u8, u8, u8); 10] = [
    (31, 119, 180),
    (255, 127, 14),
    (44, 160, 44),
    (214, 39, 40),
    (148, 103, 189),
    (140, 86, 75),
    (227, 119, 194),
    (127, 127, 127),
    (188, 189, 34),
    (23, 190, 207),
];

fn rgb(color: Color) -> Option<(u8, u8, u8)> {
    match color {
        Color::Rgb(r, g, b) => Some((r, g, b)),
        _ => None,
    }
}

/// Interpolate between two RGB colors based on a ratio (0.0 ~ 1.0)
pub fn interpolate_color(color1: (u8, u8, u8), color2: (u8, u8, u8), ratio: f32) -> Color {
    let ratio = ratio.clamp(0.0, 1.0);
    let r = (color1.0 as f32 + (color2.0 as f32 - color1.0 as f32) * ratio) as u8;
    let g = (color1.1 as f32 + (color2.1 as f32 - color1.1 as f32) * ratio) as u8;
    let b = (color1.2 as f32 + (color2.2 as f32 - color1.2 as f32) * ratio) as u8;
    Color::Rgb(r, g, b)
}

/// Sequential ramp color for edge `index` out of `count`
///
/// Purely positional: two snapshots with the same channel order color the
/// same way, regardless of what the channels are.
pub fn channel_color(index: usize, count: usize) -> Color {
    let ratio = if count > 1 {
        index as f32 / (count - 1) as f32
    } else {
        0.0
    };
    interpolate_color(CHANNEL_RAMP_START, CHANNEL_RAMP_END, ratio)
}

/// Stable string hash (31-multiplier rolling hash)
fn string_hash(s: &str) -> u32 {
    s.bytes()
        .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(b as u32))
}

/// Marker color derived from a country code, neutral when unknown
pub fn country_color(country_code: Option<&str>) -> Color {
    match country_code.map(str::trim).filter(|cc| !cc.is_empty()) {
        Some(cc) => {
            let (r, g, b) = NODE_PALETTE[string_hash(&cc.to_ascii_uppercase()) as usize % NODE_PALETTE.len()];
            Color::Rgb(r, g, b)
        }
        None => BONE_WHITE,
    }
}

/// Bolt color for a channel event
pub fn status_color(status: ChannelStatus) -> Color {
    match status {
        ChannelStatus::Open => AMBER,
        ChannelStatus::Closed => BLOOD_RED,
    }
}

/// Fade a color toward the map background; `opacity` 1.0 keeps it unchanged
pub fn fade(color: Color, opacity: f64) -> Color {
    match (rgb(STORM_NAVY), rgb(color)) {
        (Some(bg), Some(fg)) => interpolate_color(bg, fg, opacity as f32),
        _ => color,
    }
}

/// Dim halo color drawn under a bolt
pub fn glow(color: Color) -> Color {
    fade(color, 0.35)
}
