//! Plot rendering
//!
//! Charts are rasterized straight into an [`RgbImage`] and saved as PNG.
//! Titles, row labels and tick values are drawn with an 8x8 bitmap font;
//! every plot is also written with a JSON sidecar holding its title, axis
//! labels and the exact plotted series.

mod charts;
mod text;

pub use charts::{line_chart, summary_plot, waterfall_plot, Band, BarChart};
pub use text::{draw_text, draw_text_centered, draw_text_right, fit_text, text_width, GLYPH_SIZE};

use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Common color definitions
pub mod colors {
    use image::Rgb;

    pub const GREEN: Rgb<u8> = Rgb([0, 200, 83]);
    pub const RED: Rgb<u8> = Rgb([255, 68, 68]);
    pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    pub const GRAY: Rgb<u8> = Rgb([128, 128, 128]);
    pub const LIGHT_GRAY: Rgb<u8> = Rgb([220, 220, 220]);
    pub const BLUE: Rgb<u8> = Rgb([33, 150, 243]);
    pub const LIGHT_BLUE: Rgb<u8> = Rgb([187, 222, 251]);
    /// Low end of the feature-value scale in summary plots
    pub const LOW_VALUE: Rgb<u8> = Rgb([0, 139, 251]);
    /// High end of the feature-value scale in summary plots
    pub const HIGH_VALUE: Rgb<u8> = Rgb([255, 0, 82]);
}

/// One plotted series, as written to the sidecar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    /// Category labels, when the x (or y) axis is categorical
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Everything a reader needs to interpret the raster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartData {
    pub kind: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

/// Rendered chart plus its description
#[derive(Debug, Clone)]
pub struct Chart {
    pub image: RgbImage,
    pub data: ChartData,
}

impl Chart {
    /// Write `<path>` as PNG and `<path>.json` next to it
    pub fn save(&self, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.image.save(path)?;
        fs::write(sidecar_path(path), serde_json::to_string_pretty(&self.data)?)?;
        Ok(path.to_path_buf())
    }
}

/// Location of the JSON description of a plot
pub fn sidecar_path(png: &Path) -> PathBuf {
    png.with_extension("json")
}

/// Linear map of a data range onto a pixel range
#[derive(Debug, Clone, Copy)]
pub(crate) struct Axis1D {
    min: f64,
    max: f64,
    start: f64,
    end: f64,
}

impl Axis1D {
    /// Degenerate ranges are widened so every value maps inside the span
    pub(crate) fn new(min: f64, max: f64, start: u32, end: u32) -> Self {
        let (min, max) = if (max - min).abs() < 1e-12 {
            (min - 0.5, max + 0.5)
        } else {
            (min, max)
        };
        Self {
            min,
            max,
            start: start as f64,
            end: end as f64,
        }
    }

    pub(crate) fn map(&self, value: f64) -> u32 {
        let t = ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0);
        (self.start + t * (self.end - self.start)).round() as u32
    }

    pub(crate) fn span(&self) -> f64 {
        self.max - self.min
    }

    /// `n` evenly spaced `(value, pixel)` pairs, both ends included
    pub(crate) fn ticks(&self, n: usize) -> Vec<(f64, u32)> {
        let n = n.max(2);
        (0..n)
            .map(|i| {
                let value = self.min + self.span() * i as f64 / (n - 1) as f64;
                (value, self.map(value))
            })
            .collect()
    }
}

/// `(min, max)` over finite values, `(0, 0)` when there are none
pub(crate) fn value_range(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min > max {
        (0.0, 0.0)
    } else {
        (min, max)
    }
}

/// Helper function to draw a filled rectangle
pub fn draw_filled_rect(img: &mut RgbImage, x: u32, y: u32, width: u32, height: u32, color: Rgb<u8>) {
    let img_width = img.width();
    let img_height = img.height();

    for dy in 0..height {
        for dx in 0..width {
            let px = x + dx;
            let py = y + dy;
            if px < img_width && py < img_height {
                img.put_pixel(px, py, color);
            }
        }
    }
}

/// Helper function to draw a vertical line
pub fn draw_vertical_line(img: &mut RgbImage, x: u32, y1: u32, y2: u32, color: Rgb<u8>) {
    let (start, end) = if y1 < y2 { (y1, y2) } else { (y2, y1) };
    if x < img.width() && img.height() > 0 {
        for y in start..=end.min(img.height() - 1) {
            img.put_pixel(x, y, color);
        }
    }
}

/// Helper function to draw a horizontal line
pub fn draw_horizontal_line(img: &mut RgbImage, y: u32, x1: u32, x2: u32, color: Rgb<u8>) {
    let (start, end) = if x1 < x2 { (x1, x2) } else { (x2, x1) };
    if y < img.height() && img.width() > 0 {
        for x in start..=end.min(img.width() - 1) {
            img.put_pixel(x, y, color);
        }
    }
}

/// Bresenham line between two pixels
pub fn draw_line(img: &mut RgbImage, (x0, y0): (u32, u32), (x1, y1): (u32, u32), color: Rgb<u8>) {
    let (mut x, mut y) = (x0 as i64, y0 as i64);
    let (x1, y1) = (x1 as i64, y1 as i64);
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
            img.put_pixel(x as u32, y as u32, color);
        }
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Small filled square centred on a pixel
pub fn draw_marker(img: &mut RgbImage, x: u32, y: u32, radius: u32, color: Rgb<u8>) {
    draw_filled_rect(
        img,
        x.saturating_sub(radius),
        y.saturating_sub(radius),
        2 * radius + 1,
        2 * radius + 1,
        color,
    );
}

/// Interpolate between two colors
pub fn interpolate_color(c1: Rgb<u8>, c2: Rgb<u8>, t: f64) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    Rgb([
        ((1.0 - t) * c1.0[0] as f64 + t * c2.0[0] as f64) as u8,
        ((1.0 - t) * c1.0[1] as f64 + t * c2.0[1] as f64) as u8,
        ((1.0 - t) * c1.0[2] as f64 + t * c2.0[2] as f64) as u8,
    ])
}
