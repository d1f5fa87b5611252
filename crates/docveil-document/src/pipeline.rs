// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Processing pipeline — rectified image to grayscale, template-sized,
// redacted and watermarked output, either in one call or stage by stage
// through a `DocumentSession`.

use docveil_core::config::AppConfig;
use docveil_core::error::{DocveilError, Result};
use docveil_core::types::{RedactionMode, Template, TemplateSize, WatermarkSpec};
use image::DynamicImage;
use tracing::{info, instrument, warn};

use crate::geometry::CornerSet;
use crate::image::ImageProcessor;
use crate::locate::CornerLocator;
use crate::rectify::{RectifiedImage, rectify};
use crate::redact::Redactor;
use crate::watermark::Watermarker;

/// Per-document choices.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOptions {
    /// Convert to single-channel luma before redaction.
    pub grayscale: bool,
    pub redaction: RedactionMode,
    /// `None`, or blank text, skips watermarking.
    pub watermark: Option<WatermarkSpec>,
    /// Fail instead of warning when the image and template sizes differ.
    pub strict_template_size: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            grayscale: true,
            redaction: RedactionMode::None,
            watermark: None,
            strict_template_size: false,
        }
    }
}

impl ProcessOptions {
    /// Options seeded from the persistent configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            grayscale: config.grayscale,
            strict_template_size: config.strict_template_size,
            ..Self::default()
        }
    }

    /// Any redaction mode other than `None` needs a template.
    pub fn require_template(&self, template: Option<&Template>) -> Result<()> {
        if template.is_none() && self.redaction != RedactionMode::None {
            return Err(missing_template(self.redaction));
        }
        Ok(())
    }
}

/// A non-fatal condition noticed while processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    /// The rectified image was resized to the template's declared size.
    TemplateSizeMismatch {
        expected: TemplateSize,
        actual: TemplateSize,
    },
}

impl std::fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TemplateSizeMismatch { expected, actual } => write!(
                f,
                "template expects {expected} but the document was {actual}; resized to fit"
            ),
        }
    }
}

/// Output of a run, ready for encoding.
#[derive(Debug, Clone)]
pub struct Processed {
    pub image: DynamicImage,
    pub warnings: Vec<PipelineWarning>,
}

/// The redaction and watermark stages with their fixed parameters.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    redactor: Redactor,
    watermarker: Watermarker,
}

impl Pipeline {
    pub fn new(redactor: Redactor, watermarker: Watermarker) -> Self {
        Self { redactor, watermarker }
    }

    /// Validate `config` and build the stages it describes.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            redactor: Redactor::from_config(&config.redaction)?,
            watermarker: Watermarker::from_config(&config.watermark),
        })
    }

    /// Grayscale, template resize, redaction and watermark in one call.
    ///
    /// A template is required unless `options.redaction` is `None`.
    #[instrument(skip_all, fields(
        width = rectified.width(),
        height = rectified.height(),
        redaction = ?options.redaction,
    ))]
    pub fn process(
        &self,
        rectified: RectifiedImage,
        template: Option<&Template>,
        options: &ProcessOptions,
    ) -> Result<Processed> {
        options.require_template(template)?;

        let warnings: Vec<PipelineWarning> =
            size_warning(&rectified, template, options)?.into_iter().collect();
        let prepared = self.prepare(rectified, template, options);
        let redacted = match template {
            Some(template) => self.redactor.redact(prepared, &template.rectangles, options.redaction),
            None => prepared,
        };
        let image = self.watermark(redacted, options.watermark.as_ref(), options.redaction)?;

        info!(warnings = warnings.len(), "Document processed");
        Ok(Processed { image, warnings })
    }

    /// Grayscale conversion and, given a template, the resize to its size.
    fn prepare(
        &self,
        rectified: RectifiedImage,
        template: Option<&Template>,
        options: &ProcessOptions,
    ) -> DynamicImage {
        let mut processor = ImageProcessor::from_dynamic(rectified.into_dynamic());
        if options.grayscale {
            processor = processor.grayscale();
        }
        if let Some(template) = template {
            processor = processor.resize_exact(template.size.width, template.size.height);
        }
        processor.into_dynamic()
    }

    fn watermark(
        &self,
        image: DynamicImage,
        spec: Option<&WatermarkSpec>,
        mode: RedactionMode,
    ) -> Result<DynamicImage> {
        match spec {
            Some(spec) if spec.is_enabled() => self.watermarker.composite(image, spec, mode),
            _ => Ok(image),
        }
    }
}

/// [`Pipeline::process`] with default stage parameters.
pub fn process(
    rectified: RectifiedImage,
    template: Option<&Template>,
    options: &ProcessOptions,
) -> Result<Processed> {
    Pipeline::default().process(rectified, template, options)
}

fn missing_template(mode: RedactionMode) -> DocveilError {
    DocveilError::Config(format!("redaction mode {mode:?} needs a template"))
}

/// Size check against `template`, run before the image is consumed.
fn size_warning(
    rectified: &RectifiedImage,
    template: Option<&Template>,
    options: &ProcessOptions,
) -> Result<Option<PipelineWarning>> {
    match template {
        Some(template) => check_template_size(
            template.size,
            rectified.size(),
            options.strict_template_size,
        ),
        None => Ok(None),
    }
}

fn check_template_size(
    expected: TemplateSize,
    actual: TemplateSize,
    strict: bool,
) -> Result<Option<PipelineWarning>> {
    if expected == actual {
        return Ok(None);
    }
    if strict {
        return Err(DocveilError::TemplateSizeMismatch { expected, actual });
    }
    warn!(%expected, %actual, "Template size differs from the rectified document");
    Ok(Some(PipelineWarning::TemplateSizeMismatch { expected, actual }))
}

// -- Session ------------------------------------------------------------------

/// Where a [`DocumentSession`] stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    CornersLocated,
    Rectified,
    Redacted,
    Watermarked,
    Exported,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CornersLocated => "corners-located",
            Self::Rectified => "rectified",
            Self::Redacted => "redacted",
            Self::Watermarked => "watermarked",
            Self::Exported => "exported",
        }
    }

    /// Forward moves only; redaction and watermarking may be skipped and
    /// corners may be located again before rectifying.
    pub fn can_advance_to(&self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (*self, next),
            (Idle, CornersLocated)
                | (CornersLocated, CornersLocated)
                | (CornersLocated, Rectified)
                | (Rectified, Redacted)
                | (Rectified, Watermarked)
                | (Rectified, Exported)
                | (Redacted, Watermarked)
                | (Redacted, Exported)
                | (Watermarked, Exported)
        )
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One document moving through the stages, one call per stage.
pub struct DocumentSession {
    pipeline: Pipeline,
    options: ProcessOptions,
    stage: Stage,
    source: DynamicImage,
    corners: Option<CornerSet>,
    rectified: Option<RectifiedImage>,
    working: Option<DynamicImage>,
    redaction: RedactionMode,
    warnings: Vec<PipelineWarning>,
}

impl DocumentSession {
    pub fn new(source: DynamicImage, pipeline: Pipeline, options: ProcessOptions) -> Self {
        Self {
            pipeline,
            options,
            stage: Stage::Idle,
            source,
            corners: None,
            rectified: None,
            working: None,
            redaction: RedactionMode::None,
            warnings: Vec::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn source(&self) -> &DynamicImage {
        &self.source
    }

    pub fn corners(&self) -> Option<&CornerSet> {
        self.corners.as_ref()
    }

    pub fn warnings(&self) -> &[PipelineWarning] {
        &self.warnings
    }

    /// Run `locator` on the source image. A failed lookup leaves the stage
    /// unchanged so another strategy can be tried.
    pub fn locate(&mut self, locator: &dyn CornerLocator) -> Result<&CornerSet> {
        self.check(Stage::CornersLocated)?;
        let corners = locator.locate(&self.source)?;
        Ok(self.accept_corners(corners))
    }

    /// Accept corners located elsewhere, e.g. picked on a preview.
    pub fn set_corners(&mut self, corners: CornerSet) -> Result<&CornerSet> {
        self.check(Stage::CornersLocated)?;
        Ok(self.accept_corners(corners))
    }

    fn accept_corners(&mut self, corners: CornerSet) -> &CornerSet {
        self.stage = Stage::CornersLocated;
        self.corners.insert(corners)
    }

    pub fn rectify(&mut self) -> Result<&RectifiedImage> {
        self.check(Stage::Rectified)?;
        let corners = self
            .corners
            .as_ref()
            .ok_or_else(|| self.invalid(Stage::Rectified))?;
        let rectified = rectify(&self.source, corners)?;
        self.stage = Stage::Rectified;
        let stored = self.rectified.insert(rectified);
        Ok(&*stored)
    }

    /// Grayscale, resize to `template` and redact with the session's mode.
    pub fn redact(&mut self, template: &Template) -> Result<()> {
        self.check(Stage::Redacted)?;
        let prepared = self.prepare(Some(template), Stage::Redacted)?;
        let mode = self.options.redaction;
        self.working = Some(self.pipeline.redactor.redact(prepared, &template.rectangles, mode));
        self.redaction = mode;
        self.stage = Stage::Redacted;
        Ok(())
    }

    /// Fails with [`DocveilError::Config`] while a requested redaction is
    /// still outstanding.
    pub fn watermark(&mut self, spec: &WatermarkSpec) -> Result<()> {
        self.check(Stage::Watermarked)?;
        self.check_redacted()?;
        let image = self.working_image(Stage::Watermarked)?;
        self.working = Some(self.pipeline.watermark(image, Some(spec), self.redaction)?);
        self.stage = Stage::Watermarked;
        Ok(())
    }

    /// Hand over the finished image and any warnings.
    ///
    /// Like [`watermark`](Self::watermark), refuses to skip a requested
    /// redaction.
    pub fn export(&mut self) -> Result<Processed> {
        self.check(Stage::Exported)?;
        self.check_redacted()?;
        let image = self.working_image(Stage::Exported)?;
        self.stage = Stage::Exported;
        info!("Document exported");
        Ok(Processed {
            image,
            warnings: std::mem::take(&mut self.warnings),
        })
    }

    /// The current image, preparing the rectified one if no stage has yet.
    fn working_image(&mut self, to: Stage) -> Result<DynamicImage> {
        match self.working.take() {
            Some(image) => Ok(image),
            None => self.prepare(None, to),
        }
    }

    /// A strict size mismatch leaves the rectified image in place so another
    /// template can be tried.
    fn prepare(&mut self, template: Option<&Template>, to: Stage) -> Result<DynamicImage> {
        let rectified = self.rectified.as_ref().ok_or_else(|| self.invalid(to))?;
        let warning = size_warning(rectified, template, &self.options)?;
        let rectified = self.rectified.take().ok_or_else(|| self.invalid(to))?;
        self.warnings.extend(warning);
        Ok(self.pipeline.prepare(rectified, template, &self.options))
    }

    fn check_redacted(&self) -> Result<()> {
        if self.stage == Stage::Rectified && self.options.redaction != RedactionMode::None {
            return Err(missing_template(self.options.redaction));
        }
        Ok(())
    }

    fn check(&self, to: Stage) -> Result<()> {
        if self.stage.can_advance_to(to) {
            Ok(())
        } else {
            Err(self.invalid(to))
        }
    }

    fn invalid(&self, to: Stage) -> DocveilError {
        DocveilError::InvalidTransition {
            from: self.stage.name(),
            to: to.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docveil_core::types::Rectangle;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    use crate::locate::FullFrameLocator;

    fn black(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(w, h))
    }

    fn boxed_template() -> Template {
        Template::new(
            TemplateSize::new(100, 100),
            vec![Rectangle::new((10, 10), (40, 40))],
        )
    }

    fn full_frame(image: &DynamicImage) -> RectifiedImage {
        let corners = FullFrameLocator.locate(image).unwrap();
        rectify(image, &corners).unwrap()
    }

    #[test]
    fn solid_white_template_scenario() {
        let src = black(100, 100);
        let options = ProcessOptions {
            redaction: RedactionMode::SolidWhite,
            ..ProcessOptions::default()
        };
        let template = boxed_template();

        let out = process(full_frame(&src), Some(&template), &options).unwrap();
        assert_eq!(
            out.warnings,
            vec![PipelineWarning::TemplateSizeMismatch {
                expected: TemplateSize::new(100, 100),
                actual: TemplateSize::new(99, 99),
            }]
        );

        let gray = match out.image {
            DynamicImage::ImageLuma8(ref buf) => buf.clone(),
            ref other => panic!("expected Luma8, got {:?}", other.color()),
        };
        assert_eq!(gray.dimensions(), (100, 100));
        for (x, y, p) in gray.enumerate_pixels() {
            let inside = (10..40).contains(&x) && (10..40).contains(&y);
            assert_eq!(p.0[0], if inside { 255 } else { 0 }, "pixel ({x}, {y})");
        }

        let rerun = Redactor::default().redact(out.image, &template.rectangles, RedactionMode::SolidBlack);
        assert!(rerun.to_luma8().pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn strict_size_mismatch_is_an_error() {
        let src = black(100, 100);
        let options = ProcessOptions {
            redaction: RedactionMode::SolidWhite,
            strict_template_size: true,
            ..ProcessOptions::default()
        };
        let err = process(full_frame(&src), Some(&boxed_template()), &options).unwrap_err();
        assert!(matches!(err, DocveilError::TemplateSizeMismatch { .. }));
    }

    #[test]
    fn redaction_without_template_is_rejected() {
        let options = ProcessOptions {
            redaction: RedactionMode::Blur,
            ..ProcessOptions::default()
        };
        let err = process(full_frame(&black(20, 20)), None, &options).unwrap_err();
        assert!(matches!(err, DocveilError::Config(_)));
    }

    #[test]
    fn watermark_output_is_rgb_and_gray_otherwise() {
        let plain = process(full_frame(&black(50, 50)), None, &ProcessOptions::default()).unwrap();
        assert!(matches!(plain.image, DynamicImage::ImageLuma8(_)));

        let options = ProcessOptions {
            watermark: Some(WatermarkSpec::new("COPIA")),
            ..ProcessOptions::default()
        };
        let marked = process(full_frame(&black(50, 50)), None, &options).unwrap();
        assert!(matches!(marked.image, DynamicImage::ImageRgb8(_)));

        let blank = ProcessOptions {
            watermark: Some(WatermarkSpec::new("")),
            ..ProcessOptions::default()
        };
        let skipped = process(full_frame(&black(50, 50)), None, &blank).unwrap();
        assert!(matches!(skipped.image, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn color_is_kept_when_grayscale_is_off() {
        let src = DynamicImage::ImageRgb8(RgbImage::from_pixel(30, 30, Rgb([200, 10, 10])));
        let options = ProcessOptions {
            grayscale: false,
            ..ProcessOptions::default()
        };
        let out = process(full_frame(&src), None, &options).unwrap();
        let [r, g, b] = out.image.to_rgb8().get_pixel(10, 10).0;
        assert!(r.abs_diff(200) <= 1 && g.abs_diff(10) <= 1 && b.abs_diff(10) <= 1);
    }

    #[test]
    fn session_runs_every_stage() {
        let options = ProcessOptions {
            redaction: RedactionMode::SolidBlack,
            ..ProcessOptions::default()
        };
        let src = DynamicImage::ImageLuma8(GrayImage::from_pixel(101, 101, Luma([200])));
        let mut session = DocumentSession::new(src, Pipeline::default(), options);
        assert_eq!(session.stage(), Stage::Idle);

        session.locate(&FullFrameLocator).unwrap();
        assert_eq!(session.stage(), Stage::CornersLocated);
        assert_eq!(session.rectify().unwrap().size(), TemplateSize::new(100, 100));

        session.redact(&boxed_template()).unwrap();
        session.watermark(&WatermarkSpec::new("COPIA").with_opacity(1.0)).unwrap();
        let out = session.export().unwrap();

        assert_eq!(session.stage(), Stage::Exported);
        assert!(out.warnings.is_empty());
        let rgb = out.image.to_rgb8();
        assert_eq!(rgb.dimensions(), (100, 100));
        // Black boxes get a white watermark.
        for y in 10..40 {
            for x in 10..40 {
                assert!(matches!(rgb.get_pixel(x, y).0, [0, 0, 0] | [255, 255, 255]));
            }
        }
        assert!(rgb.pixels().all(|p| p.0[0] == p.0[1] && p.0[1] == p.0[2]));
    }

    #[test]
    fn session_may_skip_redaction_and_watermark() {
        let mut session =
            DocumentSession::new(black(40, 30), Pipeline::default(), ProcessOptions::default());
        session.locate(&FullFrameLocator).unwrap();
        session.rectify().unwrap();
        let out = session.export().unwrap();
        assert_eq!((out.image.width(), out.image.height()), (39, 29));
    }

    #[test]
    fn out_of_order_calls_are_invalid_transitions() {
        let mut session =
            DocumentSession::new(black(40, 30), Pipeline::default(), ProcessOptions::default());

        let err = session.rectify().unwrap_err();
        assert!(matches!(
            err,
            DocveilError::InvalidTransition { from: "idle", to: "rectified" }
        ));
        assert!(session.export().is_err());

        session.locate(&FullFrameLocator).unwrap();
        assert!(session.redact(&boxed_template()).is_err());
        session.rectify().unwrap();
        session.export().unwrap();
        assert!(matches!(
            session.watermark(&WatermarkSpec::new("X")),
            Err(DocveilError::InvalidTransition { from: "exported", .. })
        ));
    }

    #[test]
    fn failed_locate_keeps_stage() {
        let mut session =
            DocumentSession::new(black(40, 30), Pipeline::default(), ProcessOptions::default());
        let miss = crate::locate::AutoLocator::default();
        assert!(session.locate(&miss).unwrap_err().is_recoverable());
        assert_eq!(session.stage(), Stage::Idle);
        session.locate(&FullFrameLocator).unwrap();
        assert_eq!(session.stage(), Stage::CornersLocated);
    }

    #[test]
    fn session_refuses_to_skip_requested_redaction() {
        for mode in [RedactionMode::SolidWhite, RedactionMode::SolidBlack, RedactionMode::Blur] {
            let options = ProcessOptions {
                redaction: mode,
                ..ProcessOptions::default()
            };
            let mut session = DocumentSession::new(black(40, 30), Pipeline::default(), options);
            session.locate(&FullFrameLocator).unwrap();
            session.rectify().unwrap();

            assert!(matches!(session.export(), Err(DocveilError::Config(_))), "{mode:?}");
            assert!(matches!(
                session.watermark(&WatermarkSpec::new("COPIA")),
                Err(DocveilError::Config(_))
            ));
            assert_eq!(session.stage(), Stage::Rectified);

            let template = Template::new(TemplateSize::new(39, 29), vec![]);
            session.redact(&template).unwrap();
            session.export().unwrap();
        }
    }

    #[test]
    fn strict_mismatch_keeps_session_usable() {
        let options = ProcessOptions {
            redaction: RedactionMode::SolidWhite,
            strict_template_size: true,
            ..ProcessOptions::default()
        };
        let mut session = DocumentSession::new(black(100, 100), Pipeline::default(), options);
        session.locate(&FullFrameLocator).unwrap();
        session.rectify().unwrap();

        let err = session.redact(&boxed_template()).unwrap_err();
        assert!(matches!(err, DocveilError::TemplateSizeMismatch { .. }));
        assert_eq!(session.stage(), Stage::Rectified);

        let matching = Template::new(
            TemplateSize::new(99, 99),
            vec![Rectangle::new((0, 0), (10, 10))],
        );
        session.redact(&matching).unwrap();
        let out = session.export().unwrap();
        assert!(out.warnings.is_empty());
        assert_eq!(out.image.to_luma8().get_pixel(5, 5).0[0], 255);
    }

    #[test]
    fn options_require_template_for_redaction() {
        let options = ProcessOptions {
            redaction: RedactionMode::Blur,
            ..ProcessOptions::default()
        };
        assert!(matches!(options.require_template(None), Err(DocveilError::Config(_))));
        assert!(options.require_template(Some(&boxed_template())).is_ok());
        assert!(ProcessOptions::default().require_template(None).is_ok());
    }

    #[test]
    fn stage_table_forbids_going_back() {
        assert!(Stage::Rectified.can_advance_to(Stage::Exported));
        assert!(!Stage::Redacted.can_advance_to(Stage::Rectified));
        assert!(!Stage::Exported.can_advance_to(Stage::Idle));
        assert!(!Stage::Idle.can_advance_to(Stage::Rectified));
    }
}
