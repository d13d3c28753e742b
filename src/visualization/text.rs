//! Bitmap text for titles, row labels and tick values

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgb, RgbImage};

use super::draw_filled_rect;

/// Glyph cell edge in pixels at scale 1
pub const GLYPH_SIZE: u32 = 8;

pub fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * GLYPH_SIZE * scale.max(1)
}

/// Truncate `text` with a trailing `..` so it fits in `max_width` pixels
pub fn fit_text(text: &str, max_width: u32, scale: u32) -> String {
    let max_chars = (max_width / (GLYPH_SIZE * scale.max(1))) as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 2 {
        return text.chars().take(max_chars).collect();
    }
    let mut fitted: String = text.chars().take(max_chars - 2).collect();
    fitted.push_str("..");
    fitted
}

/// Draw `text` with its top-left corner at `(x, y)`, clipped to the image.
///
/// Characters outside the basic Latin block render as `?`.
pub fn draw_text(img: &mut RgbImage, x: u32, y: u32, text: &str, scale: u32, color: Rgb<u8>) {
    let scale = scale.max(1);
    let mut cursor = x;
    for c in text.chars() {
        let glyph = BASIC_FONTS
            .get(c)
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8]);
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if (*bits >> col) & 1 == 1 {
                    draw_filled_rect(
                        img,
                        cursor + col * scale,
                        y + row as u32 * scale,
                        scale,
                        scale,
                        color,
                    );
                }
            }
        }
        cursor += GLYPH_SIZE * scale;
    }
}

/// Draw `text` horizontally centred on `center_x`
pub fn draw_text_centered(img: &mut RgbImage, center_x: u32, y: u32, text: &str, scale: u32, color: Rgb<u8>) {
    let x = center_x.saturating_sub(text_width(text, scale) / 2);
    draw_text(img, x, y, text, scale, color);
}

/// Draw `text` so that it ends at `right_x`
pub fn draw_text_right(img: &mut RgbImage, right_x: u32, y: u32, text: &str, scale: u32, color: Rgb<u8>) {
    let x = right_x.saturating_sub(text_width(text, scale));
    draw_text(img, x, y, text, scale, color);
}

/// Axis value with precision chosen from the axis span
pub fn tick_label(value: f64, span: f64) -> String {
    let decimals = if span >= 10.0 {
        0
    } else if span >= 1.0 {
        1
    } else if span >= 0.1 {
        2
    } else {
        3
    };
    // No "-0.00"
    let value = if value.abs() < 0.5 * 10f64.powi(-(decimals as i32)) {
        0.0
    } else {
        value
    };
    format!("{:.*}", decimals, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualization::colors;

    fn inked(img: &RgbImage) -> usize {
        img.pixels().filter(|p| **p != colors::WHITE).count()
    }

    #[test]
    fn test_draw_text_marks_pixels() {
        let mut img = RgbImage::from_pixel(64, 16, colors::WHITE);
        draw_text(&mut img, 0, 0, "cp", 1, colors::BLACK);
        let one = inked(&img);
        assert!(one > 0);

        let mut big = RgbImage::from_pixel(64, 32, colors::WHITE);
        draw_text(&mut big, 0, 0, "cp", 2, colors::BLACK);
        assert_eq!(inked(&big), 4 * one);
    }

    #[test]
    fn test_unknown_glyph_falls_back() {
        let mut a = RgbImage::from_pixel(8, 8, colors::WHITE);
        let mut b = RgbImage::from_pixel(8, 8, colors::WHITE);
        draw_text(&mut a, 0, 0, "\u{3c3}", 1, colors::BLACK);
        draw_text(&mut b, 0, 0, "?", 1, colors::BLACK);
        assert_eq!(a, b);
    }

    #[test]
    fn test_text_is_clipped() {
        let mut img = RgbImage::from_pixel(10, 4, colors::WHITE);
        draw_text(&mut img, 6, 0, "WWW", 1, colors::BLACK);
        assert!(inked(&img) > 0);
    }

    #[test]
    fn test_fit_text() {
        assert_eq!(fit_text("thalach", 80, 1), "thalach");
        assert_eq!(fit_text("cholesterol level", 64, 1), "choles..");
        assert_eq!(text_width("ab", 2), 32);
    }

    #[test]
    fn test_tick_label_precision() {
        assert_eq!(tick_label(0.12345, 0.05), "0.123");
        assert_eq!(tick_label(-0.0001, 0.5), "0.00");
        assert_eq!(tick_label(42.4, 100.0), "42");
    }
}
