// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark compositor — tiles rotated bitmap text across the page and
// alpha-blends it in a single color.

use docveil_core::config::WatermarkConfig;
use docveil_core::error::{DocveilError, Result};
use docveil_core::types::{RedactionMode, Rgb, WatermarkSpec};
use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{DynamicImage, GrayImage, Luma, RgbImage, imageops};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use tracing::{debug, info, instrument};

/// Side of a font8x8 glyph before scaling.
const GLYPH_SIZE: u32 = 8;

/// Stencil value marking watermark pixels.
const MARK: u8 = 1;

/// Renders and blends watermarks with fixed layout parameters.
#[derive(Debug, Clone)]
pub struct Watermarker {
    glyph_scale: u32,
    gap: u32,
    fallback_color: Rgb,
}

impl Default for Watermarker {
    fn default() -> Self {
        Self::from_config(&WatermarkConfig::default())
    }
}

impl Watermarker {
    pub fn from_config(config: &WatermarkConfig) -> Self {
        Self {
            glyph_scale: config.glyph_scale.max(1),
            gap: config.gap,
            fallback_color: config.fallback_color,
        }
    }

    /// Blend `spec` over `image`. The result is always `Rgb8`.
    ///
    /// A blank text returns the promoted image unchanged. NaN opacity is a
    /// [`DocveilError::Config`]; other out-of-range values are clamped.
    #[instrument(skip(self, image, spec), fields(text = %spec.text, angle = spec.angle, ?mode))]
    pub fn composite(
        &self,
        image: DynamicImage,
        spec: &WatermarkSpec,
        mode: RedactionMode,
    ) -> Result<DynamicImage> {
        if spec.opacity.is_nan() {
            return Err(DocveilError::Config("watermark opacity is NaN".into()));
        }
        let mut rgb = match image {
            DynamicImage::ImageRgb8(buf) => buf,
            other => other.to_rgb8(),
        };
        if !spec.is_enabled() {
            debug!("Watermark text is empty; skipping");
            return Ok(DynamicImage::ImageRgb8(rgb));
        }

        let opacity = spec.opacity.clamp(0.0, 1.0);
        let color = resolve_color(spec.color, mode, self.fallback_color);
        let stencil = self.render_stencil(rgb.width(), rgb.height(), &spec.text, spec.angle);

        blend(&mut rgb, &stencil, color, opacity);
        info!(?color, opacity, "Watermark applied");
        Ok(DynamicImage::ImageRgb8(rgb))
    }

    /// Binary mask (`0` or `1`) of the tiled, rotated text, sized `width` x
    /// `height`.
    ///
    /// Tiles are laid on a square canvas as wide as the image diagonal so
    /// the rotated pattern still covers every corner after the centered
    /// crop. Positive angles turn counter-clockwise on screen.
    pub fn render_stencil(&self, width: u32, height: u32, text: &str, angle: f32) -> GrayImage {
        let diagonal = (width as f64).hypot(height as f64).ceil() as u32;
        let mut canvas = GrayImage::new(diagonal, diagonal);

        let glyphs: Vec<[u8; 8]> = text.chars().map(glyph).collect();
        let cell = GLYPH_SIZE * self.glyph_scale;
        let text_w = cell * glyphs.len() as u32;
        let stride_x = (text_w + self.gap).max(1);
        let stride_y = (cell + self.gap).max(1);

        for origin_y in (0..diagonal).step_by(stride_y as usize) {
            for origin_x in (0..diagonal).step_by(stride_x as usize) {
                for (i, rows) in glyphs.iter().enumerate() {
                    let glyph_x = origin_x + i as u32 * cell;
                    self.stamp(&mut canvas, rows, glyph_x, origin_y);
                }
            }
        }

        let rotated = rotate_about_center(
            &canvas,
            -angle.to_radians(),
            Interpolation::Nearest,
            Luma([0]),
        );
        let left = (diagonal - width) / 2;
        let top = (diagonal - height) / 2;
        imageops::crop_imm(&rotated, left, top, width, height).to_image()
    }

    fn stamp(&self, canvas: &mut GrayImage, rows: &[u8; 8], x0: u32, y0: u32) {
        let scale = self.glyph_scale;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if bits & (1 << col) == 0 {
                    continue;
                }
                let px = x0 + col * scale;
                let py = y0 + row as u32 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        let (x, y) = (px + dx, py + dy);
                        if x < canvas.width() && y < canvas.height() {
                            canvas.put_pixel(x, y, Luma([MARK]));
                        }
                    }
                }
            }
        }
    }
}

/// [`Watermarker::composite`] with the default layout.
pub fn composite(image: DynamicImage, spec: &WatermarkSpec, mode: RedactionMode) -> Result<DynamicImage> {
    Watermarker::default().composite(image, spec, mode)
}

/// Pick the watermark color.
///
/// An explicit color wins. Otherwise the color contrasts with the solid
/// redaction fill: black over white boxes, white over black boxes, and
/// `fallback` for blur or no redaction.
pub fn resolve_color(explicit: Option<Rgb>, mode: RedactionMode, fallback: Rgb) -> Rgb {
    if let Some(color) = explicit {
        return color;
    }
    match mode {
        RedactionMode::SolidWhite => [0, 0, 0],
        RedactionMode::SolidBlack => [255, 255, 255],
        RedactionMode::None | RedactionMode::Blur => fallback,
    }
}

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .unwrap_or([0; 8])
}

fn blend(image: &mut RgbImage, stencil: &GrayImage, color: Rgb, opacity: f32) {
    let keep = 1.0 - opacity;
    for (pixel, mark) in image.pixels_mut().zip(stencil.pixels()) {
        if mark.0[0] == 0 {
            continue;
        }
        for (channel, tint) in pixel.0.iter_mut().zip(color) {
            let mixed = opacity * tint as f32 + keep * *channel as f32;
            *channel = mixed.round().clamp(0.0, 255.0) as u8;
        }
    }
}
