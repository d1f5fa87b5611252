// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rectifier — perspective correction of a located document quadrilateral
// onto an upright, cropped rectangle.

use docveil_core::error::{DocveilError, Result};
use docveil_core::types::TemplateSize;
use image::{DynamicImage, ImageBuffer, Luma, Pixel, Rgb};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::{debug, info, instrument};

use crate::geometry::{CornerSet, OrderedCorners};

/// Smallest accepted quadrilateral area, in px².
const MIN_QUAD_AREA: f32 = 1.0;

/// An image produced by the rectifier.
///
/// Only [`rectify`] creates one, which is how the pipeline guarantees that
/// redaction and watermarking never run on a raw capture.
#[derive(Debug, Clone)]
pub struct RectifiedImage {
    image: DynamicImage,
}

impl RectifiedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> TemplateSize {
        TemplateSize::new(self.image.width(), self.image.height())
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }
}

/// Warp the quadrilateral described by `corners` into an upright image.
///
/// The corners are put in canonical order first, whatever locator produced
/// them. The output is `w x h` where `w` is the longer of the top and
/// bottom edges and `h` the longer of the left and right edges, both
/// truncated. Degenerate quadrilaterals are rejected with
/// [`DocveilError::Geometry`] before any resampling.
#[instrument(skip_all, fields(src_w = image.width(), src_h = image.height()))]
pub fn rectify(image: &DynamicImage, corners: &CornerSet) -> Result<RectifiedImage> {
    let ordered = corners.order();
    debug!(
        top_left = %ordered.top_left(),
        top_right = %ordered.top_right(),
        bottom_right = %ordered.bottom_right(),
        bottom_left = %ordered.bottom_left(),
        "Corners ordered"
    );

    let (width, height) = ordered.target_size();
    let projection = projection_for(&ordered, width, height)?;

    let warped = match image {
        DynamicImage::ImageLuma8(buf) => {
            DynamicImage::ImageLuma8(warp_buffer(buf, &projection, width, height, Luma([0])))
        }
        DynamicImage::ImageRgb8(buf) => {
            DynamicImage::ImageRgb8(warp_buffer(buf, &projection, width, height, Rgb([0, 0, 0])))
        }
        other => DynamicImage::ImageRgb8(warp_buffer(
            &other.to_rgb8(),
            &projection,
            width,
            height,
            Rgb([0, 0, 0]),
        )),
    };

    info!(width, height, "Perspective correction applied");
    Ok(RectifiedImage { image: warped })
}

/// Homography from the ordered corners onto `[0,0]-[w-1,h-1]`.
fn projection_for(ordered: &OrderedCorners, width: u32, height: u32) -> Result<Projection> {
    if width < 2 || height < 2 {
        return Err(DocveilError::Geometry(format!(
            "target size {width}x{height} is too small"
        )));
    }
    let area = ordered.area();
    if area < MIN_QUAD_AREA {
        return Err(DocveilError::Geometry(format!(
            "quadrilateral area {area:.2} px² is degenerate"
        )));
    }

    let (right, bottom) = ((width - 1) as f32, (height - 1) as f32);
    let src = ordered.to_array().map(|p| (p.x, p.y));
    let dst = [(0.0, 0.0), (right, 0.0), (right, bottom), (0.0, bottom)];

    Projection::from_control_points(src, dst).ok_or_else(|| {
        DocveilError::Geometry("projective transform could not be solved".into())
    })
}

fn warp_buffer<P>(
    src: &ImageBuffer<P, Vec<u8>>,
    projection: &Projection,
    width: u32,
    height: u32,
    default: P,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + Send + Sync,
{
    let mut out = ImageBuffer::new(width, height);
    warp_into(src, projection, Interpolation::Bilinear, default, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use docveil_core::types::Point;
    use image::{GrayImage, RgbImage};

    use crate::locate::{CornerLocator, FullFrameLocator};

    fn corners(coords: [(f32, f32); 4]) -> CornerSet {
        CornerSet::new(coords.map(Point::from))
    }

    #[test]
    fn skewed_quad_output_size_follows_edge_formula() {
        let src = DynamicImage::ImageRgb8(RgbImage::from_pixel(260, 260, Rgb([90, 90, 90])));
        let quad = corners([(0.0, 0.0), (200.0, 20.0), (190.0, 220.0), (10.0, 210.0)]);

        let out = rectify(&src, &quad).unwrap();
        assert_eq!((out.width(), out.height()), (200, 210));
    }

    #[test]
    fn corner_order_does_not_matter() {
        let src = DynamicImage::ImageRgb8(RgbImage::from_pixel(260, 260, Rgb([90, 90, 90])));
        let shuffled = corners([(190.0, 220.0), (0.0, 0.0), (10.0, 210.0), (200.0, 20.0)]);
        let out = rectify(&src, &shuffled).unwrap();
        assert_eq!(out.size(), TemplateSize::new(200, 210));
    }

    #[test]
    fn collinear_corners_are_rejected() {
        let src = DynamicImage::ImageLuma8(GrayImage::new(100, 100));
        let line = corners([(0.0, 0.0), (30.0, 30.0), (60.0, 60.0), (90.0, 90.0)]);
        assert!(matches!(rectify(&src, &line), Err(DocveilError::Geometry(_))));
    }

    #[test]
    fn coincident_corners_are_rejected() {
        let src = DynamicImage::ImageLuma8(GrayImage::new(100, 100));
        let dot = corners([(5.0, 5.0); 4]);
        assert!(matches!(rectify(&src, &dot), Err(DocveilError::Geometry(_))));
    }

    #[test]
    fn full_frame_rectify_preserves_content() {
        let mut img = RgbImage::from_pixel(80, 60, Rgb([0, 0, 0]));
        for y in 20..40 {
            for x in 30..50 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let src = DynamicImage::ImageRgb8(img);
        let frame = FullFrameLocator.locate(&src).unwrap();

        let out = rectify(&src, &frame).unwrap();
        assert_eq!((out.width(), out.height()), (79, 59));
        let rgb = out.into_dynamic().to_rgb8();
        assert_eq!(rgb.get_pixel(40, 30), &Rgb([255, 255, 255]));
        assert_eq!(rgb.get_pixel(5, 5), &Rgb([0, 0, 0]));
    }

    #[test]
    fn gray_input_stays_gray() {
        let src = DynamicImage::ImageLuma8(GrayImage::from_pixel(50, 40, Luma([77])));
        let frame = FullFrameLocator.locate(&src).unwrap();
        let out = rectify(&src, &frame).unwrap();
        assert!(matches!(out.as_dynamic(), DynamicImage::ImageLuma8(_)));
    }
}
