// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Interactive preview — a downscaled copy of the capture that the user
// clicks on, and the ratio back to full resolution.

use docveil_core::types::Point;
use image::DynamicImage;
use image::imageops::FilterType;
use tracing::debug;

use crate::geometry::{CornerSet, scale_points};

/// A display-sized copy of a full-resolution image.
#[derive(Debug, Clone)]
pub struct Preview {
    image: DynamicImage,
    ratio: f32,
}

impl Preview {
    /// Downscale `image` to `display_width`, keeping the aspect ratio.
    ///
    /// Images already narrower than the display are used as is (ratio 1).
    pub fn new(image: &DynamicImage, display_width: u32) -> Self {
        let width = image.width();
        if display_width == 0 || width <= display_width {
            return Self {
                image: image.clone(),
                ratio: 1.0,
            };
        }

        let ratio = width as f32 / display_width as f32;
        let height = ((image.height() as f32 / ratio) as u32).max(1);
        debug!(display_width, height, ratio, "Building preview");
        Self {
            image: image.resize_exact(display_width, height, FilterType::Triangle),
            ratio,
        }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Original width divided by preview width.
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn to_full_resolution(&self, corners: &CornerSet) -> CornerSet {
        corners.scaled(self.ratio)
    }

    pub fn points_to_full_resolution(&self, points: &[Point]) -> Vec<Point> {
        scale_points(points, self.ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn downscales_wide_images() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(1800, 1200));
        let preview = Preview::new(&img, 600);
        assert_eq!((preview.image().width(), preview.image().height()), (600, 400));
        assert_eq!(preview.ratio(), 3.0);
        assert_eq!(
            preview.points_to_full_resolution(&[Point::new(100.0, 50.0)]),
            vec![Point::new(300.0, 150.0)]
        );
    }

    #[test]
    fn narrow_images_are_not_upscaled() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(320, 200));
        let preview = Preview::new(&img, 600);
        assert_eq!(preview.ratio(), 1.0);
        assert_eq!(preview.image().width(), 320);
    }
}
