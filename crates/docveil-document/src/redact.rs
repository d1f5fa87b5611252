// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Region redactor — opaque fill or Gaussian blur over template rectangles.

use docveil_core::config::{RedactionConfig, validate_kernel_size};
use docveil_core::error::Result;
use docveil_core::types::{PixelRegion, RedactionMode, Rectangle};
use image::{DynamicImage, ImageBuffer, Pixel, imageops};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::filter::separable_filter_equal;
use imageproc::rect::Rect;
use tracing::{debug, info, instrument};

use crate::image::normalize;

/// Applies a [`RedactionMode`] to a list of rectangles.
#[derive(Debug, Clone)]
pub struct Redactor {
    kernel: Vec<f32>,
}

impl Default for Redactor {
    fn default() -> Self {
        Self {
            kernel: gaussian_kernel(RedactionConfig::default().blur_kernel),
        }
    }
}

impl Redactor {
    /// A redactor blurring with a `kernel_size` x `kernel_size` Gaussian.
    ///
    /// Even or zero sizes are a [`Config`](docveil_core::DocveilError::Config)
    /// error.
    pub fn new(kernel_size: u32) -> Result<Self> {
        validate_kernel_size(kernel_size)?;
        Ok(Self {
            kernel: gaussian_kernel(kernel_size),
        })
    }

    pub fn from_config(config: &RedactionConfig) -> Result<Self> {
        Self::new(config.blur_kernel)
    }

    pub fn kernel_size(&self) -> u32 {
        self.kernel.len() as u32
    }

    /// Redact `rectangles` in `image`.
    ///
    /// Rectangle corners may come in either order and are clipped to the
    /// image; each covers `min..max` on both axes. In blur mode an empty
    /// list blurs the whole frame. Pixels outside every rectangle are left
    /// untouched.
    #[instrument(skip(self, image, rectangles), fields(count = rectangles.len(), ?mode))]
    pub fn redact(
        &self,
        image: DynamicImage,
        rectangles: &[Rectangle],
        mode: RedactionMode,
    ) -> DynamicImage {
        if mode == RedactionMode::None {
            return image;
        }

        let (width, height) = (image.width(), image.height());
        let regions: Vec<PixelRegion> = if rectangles.is_empty() && mode == RedactionMode::Blur {
            debug!("No rectangles given; blurring the whole frame");
            vec![PixelRegion { x: 0, y: 0, width, height }]
        } else {
            rectangles
                .iter()
                .filter_map(|r| {
                    let clipped = r.clip(width, height);
                    if clipped.is_none() {
                        debug!(rect = ?r, "Rectangle lies outside the image; skipped");
                    }
                    clipped
                })
                .collect()
        };

        info!(regions = regions.len(), "Redacting");
        match normalize(image) {
            DynamicImage::ImageLuma8(mut buf) => {
                self.apply(&mut buf, &regions, mode);
                DynamicImage::ImageLuma8(buf)
            }
            DynamicImage::ImageRgb8(mut buf) => {
                self.apply(&mut buf, &regions, mode);
                DynamicImage::ImageRgb8(buf)
            }
            other => other,
        }
    }

    fn apply<P>(&self, buf: &mut ImageBuffer<P, Vec<u8>>, regions: &[PixelRegion], mode: RedactionMode)
    where
        P: Pixel<Subpixel = u8> + 'static,
    {
        if let Some(value) = mode.fill_value() {
            let channels = vec![value; P::CHANNEL_COUNT as usize];
            let color = *P::from_slice(&channels);
            for region in regions {
                let rect = Rect::at(region.x as i32, region.y as i32).of_size(region.width, region.height);
                draw_filled_rect_mut(buf, rect, color);
            }
        } else if mode == RedactionMode::Blur {
            for region in regions {
                let roi = imageops::crop_imm(buf, region.x, region.y, region.width, region.height)
                    .to_image();
                let blurred = separable_filter_equal(&roi, &self.kernel);
                imageops::replace(buf, &blurred, region.x as i64, region.y as i64);
            }
        }
    }
}

/// One-off redaction with a `kernel_size` blur, validated before any pixel
/// work.
pub fn redact(
    image: DynamicImage,
    rectangles: &[Rectangle],
    mode: RedactionMode,
    kernel_size: u32,
) -> Result<DynamicImage> {
    Ok(Redactor::new(kernel_size)?.redact(image, rectangles, mode))
}

/// Normalized 1-D Gaussian of odd length `size`.
///
/// Sigma follows the usual rule for a kernel given only by its size:
/// `0.3 * ((size - 1) / 2 - 1) + 0.8`.
pub fn gaussian_kernel(size: u32) -> Vec<f32> {
    let size = size.max(1);
    let radius = (size / 2) as i32;
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let two_sigma_sq = 2.0 * sigma * sigma;

    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / two_sigma_sq).exp())
        .collect();
    let total: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= total;
    }
    kernel
}

#[cfg(test)]
mod tests {
    use super::*;
    use docveil_core::DocveilError;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    use crate::locate::{CornerLocator, FullFrameLocator};
    use crate::rectify::rectify;

    fn checkerboard(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(101);
        assert_eq!(k.len(), 101);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        assert!((k[0] - k[100]).abs() < 1e-9);
        assert!(k[50] > k[49]);
        assert_eq!(gaussian_kernel(1), vec![1.0]);
    }

    #[test]
    fn even_or_zero_kernel_is_a_config_error() {
        assert!(matches!(Redactor::new(100), Err(DocveilError::Config(_))));
        assert!(matches!(Redactor::new(0), Err(DocveilError::Config(_))));
        assert_eq!(Redactor::new(31).unwrap().kernel_size(), 31);
    }

    #[test]
    fn solid_white_fills_half_open_region() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(100, 100));
        let rects = [Rectangle::new((40, 40), (10, 10))];
        let out = Redactor::default()
            .redact(img, &rects, RedactionMode::SolidWhite)
            .to_rgb8();

        for (x, y, p) in out.enumerate_pixels() {
            let inside = (10..40).contains(&x) && (10..40).contains(&y);
            let expected = if inside { Rgb([255, 255, 255]) } else { Rgb([0, 0, 0]) };
            assert_eq!(*p, expected, "pixel ({x}, {y})");
        }
    }

    #[test]
    fn solid_redaction_is_idempotent() {
        let img = DynamicImage::ImageRgb8(checkerboard(64, 48));
        let rects = [Rectangle::new((5, 5), (30, 20)), Rectangle::new((50, 40), (40, 10))];
        let redactor = Redactor::default();

        let once = redactor.redact(img, &rects, RedactionMode::SolidBlack);
        let twice = redactor.redact(once.clone(), &rects, RedactionMode::SolidBlack);
        assert_eq!(once, twice);
    }

    #[test]
    fn blur_leaves_outside_pixels_untouched() {
        let original = checkerboard(80, 60);
        let rects = [Rectangle::new((20, 10), (60, 50))];
        let out = Redactor::new(15)
            .unwrap()
            .redact(DynamicImage::ImageRgb8(original.clone()), &rects, RedactionMode::Blur)
            .to_rgb8();

        let mut changed_inside = false;
        for (x, y, p) in out.enumerate_pixels() {
            let inside = (20..60).contains(&x) && (10..50).contains(&y);
            if inside {
                changed_inside |= p != original.get_pixel(x, y);
            } else {
                assert_eq!(p, original.get_pixel(x, y), "pixel ({x}, {y}) changed");
            }
        }
        assert!(changed_inside);
    }

    #[test]
    fn empty_blur_list_blurs_whole_frame() {
        let photo = DynamicImage::ImageRgb8(checkerboard(41, 31));
        let corners = FullFrameLocator.locate(&photo).unwrap();
        let rectified = rectify(&photo, &corners).unwrap().into_dynamic();
        let expected = separable_filter_equal(&rectified.to_rgb8(), &gaussian_kernel(9));

        let degraded = Redactor::new(9)
            .unwrap()
            .redact(rectified, &[], RedactionMode::Blur);
        assert_eq!(degraded.to_rgb8(), expected);
    }

    #[test]
    fn empty_solid_list_changes_nothing() {
        let original = DynamicImage::ImageRgb8(checkerboard(20, 20));
        let out = Redactor::default().redact(original.clone(), &[], RedactionMode::SolidWhite);
        assert_eq!(out, original);
    }

    #[test]
    fn kernel_wider_than_region_still_blurs() {
        let img = GrayImage::from_fn(30, 30, |x, _| Luma([if x < 15 { 0 } else { 255 }]));
        let out = Redactor::default()
            .redact(DynamicImage::ImageLuma8(img), &[Rectangle::new((10, 10), (20, 20))], RedactionMode::Blur)
            .to_luma8();
        let mid = out.get_pixel(14, 15).0[0];
        assert!(mid > 0 && mid < 255, "got {mid}");
        assert_eq!(out.get_pixel(5, 5).0[0], 0);
    }

    #[test]
    fn out_of_bounds_rectangles_are_clipped() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(20, 20));
        let rects = [Rectangle::new((-5, -5), (5, 5)), Rectangle::new((30, 30), (40, 40))];
        let out = Redactor::default()
            .redact(img, &rects, RedactionMode::SolidWhite)
            .to_luma8();
        assert_eq!(out.get_pixel(0, 0).0[0], 255);
        assert_eq!(out.get_pixel(4, 4).0[0], 255);
        assert_eq!(out.get_pixel(5, 5).0[0], 0);
    }

    #[test]
    fn one_off_redact_checks_kernel_first() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(8, 8));
        assert!(matches!(
            redact(img.clone(), &[], RedactionMode::SolidWhite, 4),
            Err(DocveilError::Config(_))
        ));
        let out = redact(img, &[Rectangle::new((0, 0), (2, 2))], RedactionMode::SolidWhite, 3).unwrap();
        assert_eq!(out.to_luma8().get_pixel(1, 1).0[0], 255);
    }

    #[test]
    fn none_mode_is_identity() {
        let original = DynamicImage::ImageRgb8(checkerboard(12, 12));
        let out = Redactor::default().redact(
            original.clone(),
            &[Rectangle::new((0, 0), (12, 12))],
            RedactionMode::None,
        );
        assert_eq!(out, original);
    }
}
