// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Docveil redaction pipeline.

use serde::{Deserialize, Serialize};

/// An 8-bit RGB color.
pub type Rgb = [u8; 3];

/// A 2D floating-point pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Pixel dimensions a template was authored against.
///
/// Serialized as a two-element array `[width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct TemplateSize {
    pub width: u32,
    pub height: u32,
}

impl TemplateSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<[u32; 2]> for TemplateSize {
    fn from([width, height]: [u32; 2]) -> Self {
        Self { width, height }
    }
}

impl From<TemplateSize> for [u32; 2] {
    fn from(size: TemplateSize) -> Self {
        [size.width, size.height]
    }
}

impl std::fmt::Display for TemplateSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An axis-aligned pixel region, already clipped to an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Two opposite corners of a region to redact, in rectified-image pixels.
///
/// The corners are stored as authored and may come in either order.
/// Serialized as `[[x1, y1], [x2, y2]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[[i32; 2]; 2]", into = "[[i32; 2]; 2]")]
pub struct Rectangle {
    pub start: (i32, i32),
    pub end: (i32, i32),
}

impl Rectangle {
    pub const fn new(start: (i32, i32), end: (i32, i32)) -> Self {
        Self { start, end }
    }

    /// Corners reordered to `(min_x, min_y, max_x, max_y)`.
    pub fn normalized(&self) -> (i32, i32, i32, i32) {
        (
            self.start.0.min(self.end.0),
            self.start.1.min(self.end.1),
            self.start.0.max(self.end.0),
            self.start.1.max(self.end.1),
        )
    }

    /// Region covered inside a `width` x `height` image.
    ///
    /// The covered span is half-open (`min..max` on both axes). Returns
    /// `None` when nothing of the rectangle lies inside the image.
    pub fn clip(&self, width: u32, height: u32) -> Option<PixelRegion> {
        let (x0, y0, x1, y1) = self.normalized();
        let clamp_x = |v: i32| v.clamp(0, width as i32) as u32;
        let clamp_y = |v: i32| v.clamp(0, height as i32) as u32;
        let (x0, x1) = (clamp_x(x0), clamp_x(x1));
        let (y0, y1) = (clamp_y(y0), clamp_y(y1));
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PixelRegion {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

impl From<[[i32; 2]; 2]> for Rectangle {
    fn from([[x1, y1], [x2, y2]]: [[i32; 2]; 2]) -> Self {
        Self {
            start: (x1, y1),
            end: (x2, y2),
        }
    }
}

impl From<Rectangle> for [[i32; 2]; 2] {
    fn from(rect: Rectangle) -> Self {
        [[rect.start.0, rect.start.1], [rect.end.0, rect.end.1]]
    }
}

/// A size-bound list of regions to redact.
///
/// Rectangle coordinates are only meaningful against `size`; nothing
/// rescales them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub size: TemplateSize,
    #[serde(default)]
    pub rectangles: Vec<Rectangle>,
}

impl Template {
    pub fn new(size: TemplateSize, rectangles: Vec<Rectangle>) -> Self {
        Self { size, rectangles }
    }
}

/// How template regions are obscured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RedactionMode {
    /// Leave the image untouched.
    #[default]
    None,
    /// Opaque white fill.
    SolidWhite,
    /// Opaque black fill.
    SolidBlack,
    /// Gaussian blur restricted to each region.
    Blur,
}

impl RedactionMode {
    /// Channel value used by the solid modes.
    pub fn fill_value(&self) -> Option<u8> {
        match self {
            Self::SolidWhite => Some(255),
            Self::SolidBlack => Some(0),
            Self::None | Self::Blur => None,
        }
    }

    pub fn is_solid(&self) -> bool {
        self.fill_value().is_some()
    }
}

impl std::str::FromStr for RedactionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "solid-white" | "white" => Ok(Self::SolidWhite),
            "solid-black" | "black" => Ok(Self::SolidBlack),
            "blur" | "gaussian" => Ok(Self::Blur),
            other => Err(format!("unknown redaction mode '{other}'")),
        }
    }
}

/// Watermark palette entries offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorChoice {
    /// Pick a color readable against the chosen redaction fill.
    #[default]
    Auto,
    White,
    Black,
    Red,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "white" => Ok(Self::White),
            "black" => Ok(Self::Black),
            "red" => Ok(Self::Red),
            other => Err(format!("unknown watermark color '{other}'")),
        }
    }
}

/// Tiled text watermark parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkSpec {
    pub text: String,
    /// Rotation in degrees, counter-clockwise on screen.
    pub angle: f32,
    /// Explicit fill color; `None` resolves from the redaction mode.
    pub color: Option<Rgb>,
    /// Blend weight of the fill color, 0.0 to 1.0.
    pub opacity: f32,
}

impl WatermarkSpec {
    pub const DEFAULT_ANGLE: f32 = 35.0;
    pub const DEFAULT_OPACITY: f32 = 0.5;

    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            angle: Self::DEFAULT_ANGLE,
            color: None,
            opacity: Self::DEFAULT_OPACITY,
        }
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_color(mut self, color: Option<Rgb>) -> Self {
        self.color = color;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    /// Blank text disables watermarking.
    pub fn is_enabled(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_json_shape() {
        let json = r#"{"size": [100, 80], "rectangles": [[[40, 40], [10, 10]]]}"#;
        let template: Template = serde_json::from_str(json).unwrap();
        assert_eq!(template.size, TemplateSize::new(100, 80));
        assert_eq!(template.rectangles, vec![Rectangle::new((40, 40), (10, 10))]);

        let back = serde_json::to_value(&template).unwrap();
        assert_eq!(back["size"], serde_json::json!([100, 80]));
        assert_eq!(back["rectangles"][0], serde_json::json!([[40, 40], [10, 10]]));
    }

    #[test]
    fn missing_rectangles_is_empty() {
        let template: Template = serde_json::from_str(r#"{"size": [10, 10]}"#).unwrap();
        assert!(template.rectangles.is_empty());
    }

    #[test]
    fn missing_size_is_rejected() {
        let result = serde_json::from_str::<Template>(r#"{"rectangles": []}"#);
        assert!(result.is_err());
    }

    #[test]
    fn rectangle_normalizes_either_corner_order() {
        let a = Rectangle::new((40, 5), (10, 30));
        assert_eq!(a.normalized(), (10, 5, 40, 30));
        assert_eq!(
            a.clip(100, 100),
            Some(PixelRegion { x: 10, y: 5, width: 30, height: 25 })
        );
    }

    #[test]
    fn rectangle_clip_to_image_bounds() {
        let r = Rectangle::new((-20, 90), (50, 150));
        assert_eq!(
            r.clip(100, 100),
            Some(PixelRegion { x: 0, y: 90, width: 50, height: 10 })
        );
        // Entirely outside.
        assert_eq!(Rectangle::new((120, 0), (150, 10)).clip(100, 100), None);
        // Zero width.
        assert_eq!(Rectangle::new((5, 0), (5, 10)).clip(100, 100), None);
    }

    #[test]
    fn redaction_mode_parsing() {
        assert_eq!("blur".parse::<RedactionMode>(), Ok(RedactionMode::Blur));
        assert_eq!("Solid-White".parse::<RedactionMode>(), Ok(RedactionMode::SolidWhite));
        assert!("sepia".parse::<RedactionMode>().is_err());
        assert_eq!(RedactionMode::SolidBlack.fill_value(), Some(0));
        assert!(!RedactionMode::Blur.is_solid());
    }

    #[test]
    fn blank_watermark_text_is_disabled() {
        assert!(!WatermarkSpec::new("   ").is_enabled());
        assert!(WatermarkSpec::new("COPIA").is_enabled());
    }
}
