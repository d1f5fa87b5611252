// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry helpers — corner sets and their canonical ordering, and the
// preview-to-full-resolution point scaling.

use docveil_core::error::{DocveilError, Result};
use docveil_core::types::Point;
use imageproc::geometry::contour_area;
use imageproc::point::Point as PixelPoint;

/// Exactly four document corners, in the order a locator produced them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerSet {
    points: [Point; 4],
}

impl CornerSet {
    pub fn new(points: [Point; 4]) -> Self {
        Self { points }
    }

    /// Build from a slice that must hold exactly four points.
    pub fn from_slice(points: &[Point]) -> Result<Self> {
        let points: [Point; 4] = points.try_into().map_err(|_| {
            DocveilError::Geometry(format!("expected 4 corners, got {}", points.len()))
        })?;
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point; 4] {
        &self.points
    }

    /// Corners multiplied by `ratio`, e.g. from preview to full resolution.
    pub fn scaled(&self, ratio: f32) -> Self {
        Self {
            points: self.points.map(|p| Point::new(p.x * ratio, p.y * ratio)),
        }
    }

    /// Apply the canonical ordering rule.
    ///
    /// Minimum `x + y` is top-left. Of the other three, maximum `x + y` is
    /// bottom-right. Of the last two, the one with the smaller `y - x` is
    /// top-right and the other is bottom-left. Ties go to the lower index,
    /// so the result is always a permutation of the input.
    pub fn order(&self) -> OrderedCorners {
        let sum = |p: &Point| p.x + p.y;
        let diff = |p: &Point| p.y - p.x;

        let mut tl = 0;
        for i in 1..4 {
            if sum(&self.points[i]) < sum(&self.points[tl]) {
                tl = i;
            }
        }

        let others: Vec<usize> = (0..4).filter(|&i| i != tl).collect();
        let mut br = others[0];
        for &i in &others[1..] {
            if sum(&self.points[i]) > sum(&self.points[br]) {
                br = i;
            }
        }

        let rest: Vec<usize> = others.into_iter().filter(|&i| i != br).collect();
        let (a, b) = (rest[0], rest[1]);
        let (tr, bl) = if diff(&self.points[a]) <= diff(&self.points[b]) {
            (a, b)
        } else {
            (b, a)
        };

        OrderedCorners {
            top_left: self.points[tl],
            top_right: self.points[tr],
            bottom_right: self.points[br],
            bottom_left: self.points[bl],
        }
    }
}

/// Corners after canonical ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderedCorners {
    top_left: Point,
    top_right: Point,
    bottom_right: Point,
    bottom_left: Point,
}

impl OrderedCorners {
    pub fn top_left(&self) -> Point {
        self.top_left
    }

    pub fn top_right(&self) -> Point {
        self.top_right
    }

    pub fn bottom_right(&self) -> Point {
        self.bottom_right
    }

    pub fn bottom_left(&self) -> Point {
        self.bottom_left
    }

    /// `[top_left, top_right, bottom_right, bottom_left]`.
    pub fn to_array(&self) -> [Point; 4] {
        [self.top_left, self.top_right, self.bottom_right, self.bottom_left]
    }

    /// Output size from the longest opposite edges, truncated to integers.
    pub fn target_size(&self) -> (u32, u32) {
        let width = self
            .bottom_right
            .distance_to(self.bottom_left)
            .max(self.top_right.distance_to(self.top_left));
        let height = self
            .top_right
            .distance_to(self.bottom_right)
            .max(self.top_left.distance_to(self.bottom_left));
        (width as u32, height as u32)
    }

    /// Enclosed area of the quadrilateral in this vertex order.
    pub fn area(&self) -> f32 {
        let outline = self.to_array().map(|p| PixelPoint::new(p.x, p.y));
        contour_area(&outline) as f32
    }
}

impl From<OrderedCorners> for CornerSet {
    fn from(ordered: OrderedCorners) -> Self {
        CornerSet::new(ordered.to_array())
    }
}

/// Map preview-space points to full resolution.
///
/// This is the one place where coordinates cross between the preview a
/// user clicks on and the full image the rectifier warps.
pub fn scale_points(points: &[Point], ratio: f32) -> Vec<Point> {
    points
        .iter()
        .map(|p| Point::new(p.x * ratio, p.y * ratio))
        .collect()
}
