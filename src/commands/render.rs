//! Built-in turntable renderer for the CLI
//!
//! Paints a record on a platter: grooved disc, a label showing the cover art
//! (or a colour derived from the title), a marker that turns at 33⅓ rpm and a
//! progress bar along the bottom. Every pixel is a function of the current
//! track and `time_seconds` only.

use crate::export::{ExportError, FrameRenderer, PreparedTrack};
use image::{Rgb, RgbImage};
use std::f64::consts::TAU;

const RPM: f64 = 100.0 / 3.0;
const BACKGROUND_TOP: [u8; 3] = [24, 22, 28];
const BACKGROUND_BOTTOM: [u8; 3] = [8, 8, 10];
const VINYL: [u8; 3] = [14, 14, 16];
const GROOVE: [u8; 3] = [30, 30, 34];
const MARKER: [u8; 3] = [235, 235, 235];
const BAR_TRACK: [u8; 3] = [50, 50, 56];
const BAR_FILL: [u8; 3] = [230, 120, 60];

/// Disc and progress bar placement for a frame size
#[derive(Debug, Clone, Copy)]
struct Layout {
    center_x: f64,
    center_y: f64,
    disc_radius: f64,
    label_radius: f64,
    spindle_radius: f64,
    bar_x: u32,
    bar_y: u32,
    bar_width: u32,
    bar_height: u32,
}

impl Layout {
    fn new(width: u32, height: u32) -> Self {
        let short = width.min(height) as f64;
        let disc_radius = short * 0.35;
        let bar_height = (height / 40).max(2);
        let bar_width = (width as f64 * 0.8) as u32;
        Self {
            center_x: width as f64 / 2.0,
            center_y: height as f64 * 0.45,
            disc_radius,
            label_radius: disc_radius * 0.35,
            spindle_radius: disc_radius * 0.03,
            bar_x: (width - bar_width) / 2,
            bar_y: height.saturating_sub(bar_height * 3),
            bar_width,
            bar_height,
        }
    }
}

/// Per-track data kept between `begin_track` and `end_track`
struct Deck {
    duration_seconds: f64,
    label_color: [u8; 3],
    cover_art: Option<RgbImage>,
}

/// Placeholder video frames for CLI exports
#[derive(Default)]
pub struct TurntableRenderer {
    deck: Option<Deck>,
}

impl TurntableRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameRenderer for TurntableRenderer {
    fn begin_track(&mut self, track: &PreparedTrack) -> Result<(), ExportError> {
        self.deck = Some(Deck {
            duration_seconds: track.duration_seconds,
            label_color: title_color(&track.title),
            cover_art: track.cover_art.clone(),
        });
        Ok(())
    }

    fn render(
        &mut self,
        surface: &mut RgbImage,
        width: u32,
        height: u32,
        time_seconds: f64,
    ) -> Result<(), ExportError> {
        if surface.dimensions() != (width, height) {
            return Err(ExportError::Render(format!(
                "surface is {:?}, expected {}x{}",
                surface.dimensions(),
                width,
                height
            )));
        }
        let deck = self
            .deck
            .as_ref()
            .ok_or_else(|| ExportError::Render("render called outside a track".to_string()))?;

        let layout = Layout::new(width, height);
        let angle = (time_seconds * RPM / 60.0).fract() * TAU;
        let progress = (time_seconds / deck.duration_seconds).clamp(0.0, 1.0);
        let (sin, cos) = angle.sin_cos();

        for (x, y, pixel) in surface.enumerate_pixels_mut() {
            let t = y as f64 / height.max(1) as f64;
            *pixel = Rgb(mix(BACKGROUND_TOP, BACKGROUND_BOTTOM, t));

            let dx = x as f64 + 0.5 - layout.center_x;
            let dy = y as f64 + 0.5 - layout.center_y;
            let distance = (dx * dx + dy * dy).sqrt();

            if distance <= layout.spindle_radius {
                *pixel = Rgb(BACKGROUND_BOTTOM);
            } else if distance <= layout.label_radius {
                // Label coordinates, turned back by the platter angle
                let lx = dx * cos + dy * sin;
                let ly = -dx * sin + dy * cos;
                *pixel = Rgb(label_pixel(deck, &layout, lx, ly));
            } else if distance <= layout.disc_radius {
                let groove = (distance as u32 / 2) % 2 == 0;
                *pixel = Rgb(if groove { GROOVE } else { VINYL });
            }
        }

        if deck.cover_art.is_none() {
            draw_marker(surface, &layout, angle);
        }
        draw_progress_bar(surface, &layout, progress);
        Ok(())
    }

    fn end_track(&mut self) {
        self.deck = None;
    }
}

/// Cover art sampled nearest-neighbour inside the label, or a flat colour
fn label_pixel(deck: &Deck, layout: &Layout, lx: f64, ly: f64) -> [u8; 3] {
    let Some(cover) = &deck.cover_art else {
        return deck.label_color;
    };
    let (cover_width, cover_height) = cover.dimensions();
    if cover_width == 0 || cover_height == 0 {
        return deck.label_color;
    }

    let diameter = layout.label_radius * 2.0;
    let u = (lx + layout.label_radius) / diameter;
    let v = (ly + layout.label_radius) / diameter;
    let src_x = ((u * cover_width as f64) as u32).min(cover_width - 1);
    let src_y = ((v * cover_height as f64) as u32).min(cover_height - 1);
    cover.get_pixel(src_x, src_y).0
}

/// Dot on the label showing the platter's rotation
fn draw_marker(surface: &mut RgbImage, layout: &Layout, angle: f64) {
    let orbit = layout.label_radius * 0.7;
    let mx = layout.center_x + orbit * angle.cos();
    let my = layout.center_y + orbit * angle.sin();
    let radius = (layout.label_radius * 0.15).max(1.0);

    let (width, height) = surface.dimensions();
    let x0 = (mx - radius).floor().max(0.0) as u32;
    let y0 = (my - radius).floor().max(0.0) as u32;
    let x1 = ((mx + radius).ceil() as u32).min(width);
    let y1 = ((my + radius).ceil() as u32).min(height);

    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f64 + 0.5 - mx;
            let dy = y as f64 + 0.5 - my;
            if dx * dx + dy * dy <= radius * radius {
                surface.put_pixel(x, y, Rgb(MARKER));
            }
        }
    }
}

fn draw_progress_bar(surface: &mut RgbImage, layout: &Layout, progress: f64) {
    let radius = (layout.bar_height / 2) as i32;
    let filled = (layout.bar_width as f64 * progress).round() as u32;
    let (width, height) = surface.dimensions();

    for dy in 0..layout.bar_height {
        for dx in 0..layout.bar_width {
            if !is_inside_rounded_rect(
                dx as i32,
                dy as i32,
                layout.bar_width as i32,
                layout.bar_height as i32,
                radius,
            ) {
                continue;
            }
            let (x, y) = (layout.bar_x + dx, layout.bar_y + dy);
            if x >= width || y >= height {
                continue;
            }
            let color = if dx < filled { BAR_FILL } else { BAR_TRACK };
            surface.put_pixel(x, y, Rgb(color));
        }
    }
}

/// Check if a point is inside a rounded rectangle
fn is_inside_rounded_rect(x: i32, y: i32, width: i32, height: i32, radius: i32) -> bool {
    let corner_x = if x < radius {
        Some(radius - x)
    } else if x >= width - radius {
        Some(x - (width - radius - 1))
    } else {
        None
    };
    let corner_y = if y < radius {
        Some(radius - y)
    } else if y >= height - radius {
        Some(y - (height - radius - 1))
    } else {
        None
    };

    match (corner_x, corner_y) {
        (Some(dx), Some(dy)) => dx * dx + dy * dy <= radius * radius,
        _ => true,
    }
}

/// Stable label colour derived from the title
fn title_color(title: &str) -> [u8; 3] {
    let hash = title
        .bytes()
        .fold(0x811c_9dc5u32, |h, b| (h ^ b as u32).wrapping_mul(0x0100_0193));
    [
        96 + (hash & 0x7f) as u8,
        96 + ((hash >> 8) & 0x7f) as u8,
        96 + ((hash >> 16) & 0x7f) as u8,
    ]
}

fn mix(a: [u8; 3], b: [u8; 3], t: f64) -> [u8; 3] {
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    [lerp(a[0], b[0]), lerp(a[1], b[1]), lerp(a[2], b[2])]
}
