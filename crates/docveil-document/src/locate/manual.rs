// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Manual corner selection — four user clicks, kept in click order.

use docveil_core::error::{DocveilError, Result};
use docveil_core::types::Point;
use image::DynamicImage;
use tracing::debug;

use super::CornerLocator;
use crate::geometry::CornerSet;

/// Accumulates up to four clicked points.
///
/// Points are never reordered here; the rectifier applies the canonical
/// ordering. A click on a point already collected is ignored, as are clicks
/// after the fourth.
#[derive(Debug, Clone, Default)]
pub struct ManualLocator {
    points: Vec<Point>,
}

impl ManualLocator {
    pub const REQUIRED: usize = 4;

    pub fn new() -> Self {
        Self::default()
    }

    /// Collect clicks in order, applying the same rules as [`push`](Self::push).
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Self {
        let mut locator = Self::new();
        for point in points {
            locator.push(point);
        }
        locator
    }

    /// Record a click. Returns `false` when the click was ignored.
    pub fn push(&mut self, point: Point) -> bool {
        if self.is_complete() || self.points.contains(&point) {
            return false;
        }
        self.points.push(point);
        debug!(collected = self.points.len(), %point, "Corner recorded");
        true
    }

    pub fn reset(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_complete(&self) -> bool {
        self.points.len() >= Self::REQUIRED
    }
}

impl CornerLocator for ManualLocator {
    fn locate(&self, _image: &DynamicImage) -> Result<CornerSet> {
        if !self.is_complete() {
            return Err(DocveilError::IncompleteCorners {
                collected: self.points.len(),
            });
        }
        CornerSet::from_slice(&self.points)
    }
}
