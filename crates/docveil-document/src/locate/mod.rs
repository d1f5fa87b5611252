// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corner location — full-frame, manual click sequence, and automatic
// edge/contour detection, plus the preview that corners are picked on.

pub mod auto;
pub mod manual;
pub mod preview;

use docveil_core::error::Result;
use docveil_core::types::Point;
use image::DynamicImage;
use tracing::{debug, instrument};

use crate::geometry::CornerSet;

pub use auto::AutoLocator;
pub use manual::ManualLocator;
pub use preview::Preview;

/// A strategy producing the four document corners of an image.
///
/// Implementations return [`DocveilError::DetectionMiss`] or
/// [`DocveilError::IncompleteCorners`] when they have no answer; both are
/// recoverable and the caller picks another strategy or waits for input.
///
/// [`DocveilError::DetectionMiss`]: docveil_core::error::DocveilError::DetectionMiss
/// [`DocveilError::IncompleteCorners`]: docveil_core::error::DocveilError::IncompleteCorners
pub trait CornerLocator {
    fn locate(&self, image: &DynamicImage) -> Result<CornerSet>;
}

/// Uses the whole image as the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullFrameLocator;

impl CornerLocator for FullFrameLocator {
    fn locate(&self, image: &DynamicImage) -> Result<CornerSet> {
        let right = image.width().saturating_sub(1) as f32;
        let bottom = image.height().saturating_sub(1) as f32;
        Ok(CornerSet::new([
            Point::new(0.0, 0.0),
            Point::new(right, 0.0),
            Point::new(right, bottom),
            Point::new(0.0, bottom),
        ]))
    }
}

/// The corner strategy selected by the user.
#[derive(Debug, Clone)]
pub enum LocatorMode {
    Auto(AutoLocator),
    Manual(ManualLocator),
    FullFrame,
}

impl LocatorMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto(_) => "auto",
            Self::Manual(_) => "manual",
            Self::FullFrame => "full-frame",
        }
    }
}

impl CornerLocator for LocatorMode {
    fn locate(&self, image: &DynamicImage) -> Result<CornerSet> {
        match self {
            Self::Auto(locator) => locator.locate(image),
            Self::Manual(locator) => locator.locate(image),
            Self::FullFrame => FullFrameLocator.locate(image),
        }
    }
}

/// Run `locator` on the preview and map the corners to full resolution.
#[instrument(skip_all, fields(ratio = preview.ratio()))]
pub fn locate_on_preview(locator: &dyn CornerLocator, preview: &Preview) -> Result<CornerSet> {
    let corners = locator.locate(preview.image())?;
    let scaled = preview.to_full_resolution(&corners);
    debug!(corners = ?scaled.points(), "Corners scaled to full resolution");
    Ok(scaled)
}
