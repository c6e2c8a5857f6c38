//! Caption rendering.
//!
//! Draws a caption onto a picture the way meme captions usually look: word
//! wrapped, centred, near the bottom edge, white text over a black shadow.

use std::io::Cursor;
use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use thiserror::Error;

/// Distance between the text block and the bottom edge, and between the text
/// and the left/right edges.
pub const PADDING: u32 = 20;

/// Font size as a fraction of the image width.
pub const FONT_SCALE: f32 = 0.08;

/// Baseline-to-baseline distance as a multiple of the font size.
pub const LINE_SPACING: f32 = 1.3;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to read font file: {0}")]
    FontIo(#[from] std::io::Error),

    #[error("invalid font data")]
    InvalidFont,

    #[error("image is empty")]
    EmptyImage,

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),
}

/// Draws caption text onto an image.
pub trait CaptionRenderer: Send + Sync {
    fn render(&self, image: &DynamicImage, text: &str) -> Result<RgbaImage, RenderError>;
}

/// Renderer backed by a TrueType/OpenType font.
#[derive(Clone)]
pub struct FontRenderer {
    font: FontArc,
}

impl FontRenderer {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, RenderError> {
        let font = FontArc::try_from_vec(data).map_err(|_| RenderError::InvalidFont)?;
        Ok(Self { font })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        Self::from_bytes(std::fs::read(path)?)
    }
}

impl CaptionRenderer for FontRenderer {
    fn render(&self, image: &DynamicImage, text: &str) -> Result<RgbaImage, RenderError> {
        let mut canvas = image.to_rgba8();
        let (width, height) = canvas.dimensions();
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyImage);
        }

        let font_size = width as f32 * FONT_SCALE;
        let scale = PxScale::from(font_size);
        let measure = |s: &str| text_size(scale, &self.font, s).0 as f32;

        let max_width = width.saturating_sub(2 * PADDING) as f32;
        let lines = wrap_lines(text, max_width, measure);
        let widths: Vec<f32> = lines.iter().map(|line| measure(line)).collect();
        let positions = layout_lines(width, height, font_size, &widths);

        let shadow_offset = (PADDING / 6) as i32;
        for (line, &(x, y)) in lines.iter().zip(&positions) {
            draw_text_mut(&mut canvas, Rgba([0, 0, 0, 255]), x, y, scale, &self.font, line);
        }
        for (line, &(x, y)) in lines.iter().zip(&positions) {
            draw_text_mut(
                &mut canvas,
                Rgba([255, 255, 255, 255]),
                x,
                y - shadow_offset,
                scale,
                &self.font,
                line,
            );
        }

        Ok(canvas)
    }
}

/// Greedy word wrap.
///
/// Words are split on whitespace and packed into lines no wider than
/// `max_width` as reported by `measure`. A single word wider than the limit
/// gets a line of its own rather than being broken.
pub fn wrap_lines(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if measure(&candidate) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Top-left corner of each line, horizontally centred, with the whole block
/// ending `PADDING` pixels above the bottom edge.
pub fn layout_lines(width: u32, height: u32, font_size: f32, line_widths: &[f32]) -> Vec<(i32, i32)> {
    if line_widths.is_empty() {
        return Vec::new();
    }
    let line_height = font_size * LINE_SPACING;
    let block_height = line_height * line_widths.len() as f32 - (line_height - font_size);
    let top = height as f32 - PADDING as f32 - block_height;

    line_widths
        .iter()
        .enumerate()
        .map(|(i, &line_width)| {
            let x = (width as f32 - line_width) / 2.0;
            let y = top + line_height * i as f32;
            (x.round() as i32, y.round() as i32)
        })
        .collect()
}

pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, RenderError> {
    Ok(image::load_from_memory(bytes)?)
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}
