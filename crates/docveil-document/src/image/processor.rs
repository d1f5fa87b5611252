// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decode, normalize to 8-bit gray or RGB, grayscale,
// exact resize to a template, and encode for the export collaborator.

use image::imageops::FilterType;
use image::DynamicImage;
use docveil_core::error::DocveilError;
use tracing::{debug, info, instrument};

/// Working-image wrapper used at the pipeline boundaries.
///
/// Every constructor normalizes the buffer to either `Luma8` or `Rgb8`, the
/// two layouts the redactor and compositor understand. Each method consumes
/// `self`, so a stage never holds the pre-transform buffer.
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, DocveilError> {
        let img = image::open(path.as_ref()).map_err(|err| {
            DocveilError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(
            width = img.width(),
            height = img.height(),
            "Image loaded"
        );
        Ok(Self::from_dynamic(img))
    }

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, DocveilError> {
        let img = image::load_from_memory(data).map_err(|err| {
            DocveilError::ImageError(format!("failed to decode image: {}", err))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self::from_dynamic(img))
    }

    /// Wrap an already-decoded `DynamicImage`, normalizing its layout.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            image: normalize(image),
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Convert the image to single-channel luma.
    #[instrument(skip(self))]
    pub fn grayscale(self) -> Self {
        info!("Converting to grayscale");
        Self {
            image: DynamicImage::ImageLuma8(self.image.to_luma8()),
        }
    }

    /// Promote to three channels; RGB input is returned as is.
    pub fn to_rgb(self) -> Self {
        match self.image {
            DynamicImage::ImageRgb8(_) => self,
            other => Self {
                image: DynamicImage::ImageRgb8(other.to_rgb8()),
            },
        }
    }

    /// Resize to exactly `width` x `height` with bilinear filtering,
    /// ignoring aspect ratio.
    #[instrument(skip(self), fields(width, height))]
    pub fn resize_exact(self, width: u32, height: u32) -> Self {
        if self.image.width() == width && self.image.height() == height {
            return self;
        }
        info!(
            from_w = self.image.width(),
            from_h = self.image.height(),
            width,
            height,
            "Resizing image"
        );
        let resized = self.image.resize_exact(width, height, FilterType::Triangle);
        Self {
            image: normalize(resized),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, DocveilError> {
        let mut buffer = Vec::new();
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        self.image.write_with_encoder(encoder).map_err(|err| {
            DocveilError::ImageError(format!("JPEG encoding failed: {}", err))
        })?;
        Ok(buffer)
    }

    /// Write the image to a file. The format is inferred from the file extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), DocveilError> {
        self.image.save(path.as_ref()).map_err(|err| {
            DocveilError::ImageError(format!(
                "failed to save image to {}: {}",
                path.as_ref().display(),
                err
            ))
        })
    }
}

/// Reduce any decoded layout to `Luma8` or `Rgb8`.
///
/// Gray layouts (with or without alpha, any depth) become `Luma8`; all
/// others become `Rgb8`. Alpha is dropped.
pub fn normalize(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image,
        DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_) => DynamicImage::ImageLuma8(image.to_luma8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn rgba_input_is_normalized_to_rgb() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 40])));
        let processor = ImageProcessor::from_dynamic(img);
        match processor.as_dynamic() {
            DynamicImage::ImageRgb8(buf) => assert_eq!(buf.get_pixel(0, 0), &Rgb([10, 20, 30])),
            other => panic!("unexpected layout: {:?}", other.color()),
        }
    }

    #[test]
    fn grayscale_then_promote_keeps_size() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(7, 3, Rgb([200, 200, 200])));
        let out = ImageProcessor::from_dynamic(img).grayscale();
        assert!(matches!(out.as_dynamic(), DynamicImage::ImageLuma8(_)));
        let promoted = out.to_rgb();
        assert!(matches!(promoted.as_dynamic(), DynamicImage::ImageRgb8(_)));
        assert_eq!((promoted.width(), promoted.height()), (7, 3));
    }

    #[test]
    fn resize_exact_ignores_aspect_ratio() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(50, 10, Luma([9])));
        let out = ImageProcessor::from_dynamic(img).resize_exact(20, 40);
        assert_eq!((out.width(), out.height()), (20, 40));
        assert!(matches!(out.as_dynamic(), DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn jpeg_bytes_decode_back() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([0, 128, 255])));
        let bytes = ImageProcessor::from_dynamic(img).to_jpeg_bytes(90).unwrap();
        let decoded = ImageProcessor::from_bytes(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
    }
}
