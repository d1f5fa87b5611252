// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocveilError, Result};
use crate::types::{ColorChoice, Rgb, WatermarkSpec};

/// Environment variable overriding [`AppConfig::templates_dir`].
pub const TEMPLATES_DIR_ENV: &str = "DOCVEIL_TEMPLATES_DIR";

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding `<name>.json` template records.
    pub templates_dir: PathBuf,
    /// Width of the interactive preview that corners are picked on.
    pub preview_width: u32,
    /// Convert to grayscale before redaction.
    pub grayscale: bool,
    /// Treat a template/image size mismatch as an error instead of a warning.
    pub strict_template_size: bool,
    pub detection: DetectionConfig,
    pub redaction: RedactionConfig,
    pub watermark: WatermarkConfig,
    pub palette: Palette,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            templates_dir: default_templates_dir(),
            preview_width: 600,
            grayscale: true,
            strict_template_size: false,
            detection: DetectionConfig::default(),
            redaction: RedactionConfig::default(),
            watermark: WatermarkConfig::default(),
            palette: Palette::default(),
        }
    }
}

impl AppConfig {
    /// Load settings from a JSON file, apply environment overrides and
    /// validate. Keys missing from the file keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.with_env_overrides().validated()
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides().validated()
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var(TEMPLATES_DIR_ENV) {
            if !dir.is_empty() {
                self.templates_dir = PathBuf::from(dir);
            }
        }
        self
    }

    /// Reject parameter combinations before any pixel work happens.
    pub fn validate(&self) -> Result<()> {
        if self.preview_width == 0 {
            return Err(DocveilError::Config("preview width must be non-zero".into()));
        }
        self.detection.validate()?;
        self.redaction.validate()?;
        self.watermark.validate()
    }

    fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }
}

/// Automatic corner detection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Canny hysteresis low threshold.
    pub canny_low: f32,
    /// Canny hysteresis high threshold.
    pub canny_high: f32,
    /// Polygon approximation tolerance as a fraction of the contour perimeter.
    pub approx_epsilon: f64,
    /// Contours enclosing less area than this (px²) are ignored.
    pub min_contour_area: f64,
    /// Radius of the dilation that closes small gaps in the edge map;
    /// 0 disables it.
    pub edge_dilation: u8,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 200.0,
            approx_epsilon: 0.02,
            min_contour_area: 25.0,
            edge_dilation: 1,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.canny_low.is_nan() || self.canny_low < 0.0 || self.canny_low > self.canny_high {
            return Err(DocveilError::Config(format!(
                "canny thresholds must satisfy 0 <= low <= high (got {} / {})",
                self.canny_low, self.canny_high
            )));
        }
        if !(0.0..1.0).contains(&self.approx_epsilon) || self.approx_epsilon == 0.0 {
            return Err(DocveilError::Config(format!(
                "approximation epsilon {} must lie in (0, 1)",
                self.approx_epsilon
            )));
        }
        if self.min_contour_area.is_nan() || self.min_contour_area < 0.0 {
            return Err(DocveilError::Config("minimum contour area must be >= 0".into()));
        }
        Ok(())
    }
}

/// Region redaction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionConfig {
    /// Side of the square Gaussian kernel; must be odd and positive.
    pub blur_kernel: u32,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self { blur_kernel: 101 }
    }
}

impl RedactionConfig {
    pub fn validate(&self) -> Result<()> {
        validate_kernel_size(self.blur_kernel)
    }
}

/// Reject even or zero Gaussian kernel sizes.
pub fn validate_kernel_size(size: u32) -> Result<()> {
    if size == 0 || size % 2 == 0 {
        return Err(DocveilError::Config(format!(
            "blur kernel size {size} must be odd and positive"
        )));
    }
    Ok(())
}

/// Watermark defaults and rendering parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    /// Default text; empty disables watermarking.
    pub text: String,
    /// Rotation in degrees, counter-clockwise on screen.
    pub angle: f32,
    pub opacity: f32,
    /// Integer upscale of the 8x8 bitmap glyphs.
    pub glyph_scale: u32,
    /// Pixels between tiles, on both axes.
    pub gap: u32,
    /// Color used when `Auto` has no solid fill to contrast against.
    pub fallback_color: Rgb,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: "COPIA".into(),
            angle: WatermarkSpec::DEFAULT_ANGLE,
            opacity: WatermarkSpec::DEFAULT_OPACITY,
            glyph_scale: 4,
            gap: 50,
            fallback_color: [125, 125, 125],
        }
    }
}

impl WatermarkConfig {
    pub fn validate(&self) -> Result<()> {
        validate_opacity(self.opacity)?;
        if self.glyph_scale == 0 {
            return Err(DocveilError::Config("glyph scale must be at least 1".into()));
        }
        if !self.angle.is_finite() {
            return Err(DocveilError::Config("watermark angle must be finite".into()));
        }
        Ok(())
    }

    /// A spec carrying the configured text, angle and opacity.
    pub fn to_spec(&self) -> WatermarkSpec {
        WatermarkSpec::new(self.text.clone())
            .with_angle(self.angle)
            .with_opacity(self.opacity)
    }
}

/// Opacity must be a number in [0, 1].
pub fn validate_opacity(opacity: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&opacity) {
        return Err(DocveilError::Config(format!(
            "opacity {opacity} must lie in [0, 1]"
        )));
    }
    Ok(())
}

/// Named watermark colors offered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub white: Rgb,
    pub black: Rgb,
    pub red: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            white: [255, 255, 255],
            black: [0, 0, 0],
            red: [255, 0, 0],
        }
    }
}

impl Palette {
    /// Explicit color for a choice; `Auto` stays unresolved.
    pub fn resolve(&self, choice: ColorChoice) -> Option<Rgb> {
        match choice {
            ColorChoice::Auto => None,
            ColorChoice::White => Some(self.white),
            ColorChoice::Black => Some(self.black),
            ColorChoice::Red => Some(self.red),
        }
    }
}

/// `$XDG_DATA_HOME/docveil/templates`, else `~/.local/share/docveil/templates`.
pub fn default_templates_dir() -> PathBuf {
    data_home().join("docveil").join("templates")
}

fn data_home() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from("/tmp")
}
