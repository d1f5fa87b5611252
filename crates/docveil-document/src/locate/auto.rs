// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Automatic corner detection — Canny edges, external contours, and a
// four-vertex polygon approximation of the chosen outline.

use docveil_core::config::DetectionConfig;
use docveil_core::error::{DocveilError, Result};
use docveil_core::types::Point;
use image::{DynamicImage, GrayImage};
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::geometry::{approximate_polygon_dp, arc_length, contour_area};
use imageproc::morphology::dilate;
use imageproc::point::Point as PixelPoint;
use tracing::{debug, info, instrument, warn};

use super::CornerLocator;
use crate::geometry::CornerSet;

/// Edge/contour based document outline detector.
#[derive(Debug, Clone)]
pub struct AutoLocator {
    config: DetectionConfig,
}

impl Default for AutoLocator {
    fn default() -> Self {
        Self::new(DetectionConfig::default())
    }
}

impl AutoLocator {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Binary edge map the contours are traced on.
    pub fn edge_map(&self, image: &DynamicImage) -> GrayImage {
        let gray = image.to_luma8();
        let edges = canny(&gray, self.config.canny_low, self.config.canny_high);
        if self.config.edge_dilation == 0 {
            edges
        } else {
            dilate(&edges, Norm::LInf, self.config.edge_dilation)
        }
    }

    /// Outermost contours of the edge map with their enclosed areas.
    fn external_outlines(&self, edges: &GrayImage) -> Vec<(f64, Vec<PixelPoint<i32>>)> {
        find_contours::<i32>(edges)
            .into_iter()
            .filter(|c| c.parent.is_none() && matches!(c.border_type, BorderType::Outer))
            .filter(|c| c.points.len() >= 3)
            .map(|c| (contour_area(&c.points), c.points))
            .collect()
    }
}

impl CornerLocator for AutoLocator {
    /// Pick the smallest external outline above the area floor and accept
    /// it only if it simplifies to exactly four vertices. Ties keep the first
    /// contour found.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn locate(&self, image: &DynamicImage) -> Result<CornerSet> {
        let edges = self.edge_map(image);
        let outlines = self.external_outlines(&edges);
        debug!(count = outlines.len(), "External contours found");

        let min_area = self.config.min_contour_area as f64;
        let mut chosen: Option<(f64, Vec<PixelPoint<i32>>)> = None;
        for (area, outline) in outlines {
            if area < min_area {
                continue;
            }
            match &chosen {
                Some((best, _)) if area >= *best => {}
                _ => chosen = Some((area, outline)),
            }
        }

        let Some((area, outline)) = chosen else {
            warn!("No usable contour in edge map");
            return Err(DocveilError::DetectionMiss);
        };

        let epsilon = self.config.approx_epsilon * arc_length(&outline, true);
        if epsilon <= 0.0 {
            return Err(DocveilError::DetectionMiss);
        }
        let approx = approximate_polygon_dp(&outline, epsilon, true);
        if approx.len() != 4 {
            warn!(
                vertices = approx.len(),
                area,
                "Document outline is not four-sided"
            );
            return Err(DocveilError::DetectionMiss);
        }

        info!(area, corners = ?approx, "Document outline detected");
        let corners: Vec<Point> = approx
            .iter()
            .map(|p| Point::new(p.x as f32, p.y as f32))
            .collect();
        CornerSet::from_slice(&corners)
    }
}
