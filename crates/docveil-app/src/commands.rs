// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command implementations. Each maps parsed arguments onto the document
// crate and reports what happened.

use std::path::Path;

use anyhow::{Context, Result, bail};
use docveil_core::AppConfig;
use docveil_core::types::{ColorChoice, Point, Rectangle, Rgb, Template, WatermarkSpec};
use docveil_document::template::{parse_template, to_json};
use docveil_document::{
    AutoLocator, DirectoryTemplateStore, DocumentSession, ImageProcessor, LocatorMode,
    ManualLocator, Pipeline, Preview, ProcessOptions, TemplateSource, TemplateStore, fingerprint,
    locate_on_preview,
};
use tracing::{info, warn};

use crate::{CornerMode, ProcessArgs, TemplatesAction};

/// Settings from `path`, or defaults plus environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => Ok(AppConfig::from_env()?),
    }
}

pub fn process(config: &AppConfig, args: ProcessArgs) -> Result<()> {
    let mut config = config.clone();
    if let Some(kernel) = args.blur_kernel {
        config.redaction.blur_kernel = kernel;
    }
    if args.strict_size {
        config.strict_template_size = true;
    }
    let pipeline = Pipeline::from_config(&config)?;

    let template = resolve_template(&config, &args)?;
    let mut options = ProcessOptions::from_config(&config);
    options.grayscale = !args.keep_color;
    options.redaction = args.redaction.into();
    options.require_template(template.as_ref())?;
    let watermark = watermark_spec(&config, &args)?;

    let source = ImageProcessor::open(&args.input)?.into_dynamic();
    let mut session = DocumentSession::new(source, pipeline, options);

    locate(&mut session, &config, &args)?;
    let size = session.rectify()?.size();
    info!(%size, "Document rectified");

    if let Some(template) = &template {
        session.redact(template)?;
    }
    if let Some(spec) = &watermark {
        session.watermark(spec)?;
    }

    let processed = session.export()?;
    for warning in &processed.warnings {
        eprintln!("warning: {warning}");
    }
    write_output(
        ImageProcessor::from_dynamic(processed.image),
        &args.output,
        args.quality,
    )?;
    println!("{}", args.output.display());
    Ok(())
}

/// Find the corners, falling back to the whole frame when automatic
/// detection has no answer.
fn locate(session: &mut DocumentSession, config: &AppConfig, args: &ProcessArgs) -> Result<()> {
    let mode = match args.corners {
        CornerMode::Auto => LocatorMode::Auto(AutoLocator::new(config.detection.clone())),
        CornerMode::Full => LocatorMode::FullFrame,
        CornerMode::Manual => {
            if args.corner.len() != ManualLocator::REQUIRED {
                bail!(
                    "manual mode needs exactly {} --corner values, got {}",
                    ManualLocator::REQUIRED,
                    args.corner.len()
                );
            }
            LocatorMode::Manual(ManualLocator::from_points(args.corner.iter().copied()))
        }
    };

    let located = if args.on_preview || matches!(mode, LocatorMode::Auto(_)) {
        let preview = Preview::new(session.source(), config.preview_width);
        locate_on_preview(&mode, &preview).and_then(|corners| session.set_corners(corners).map(|_| ()))
    } else {
        session.locate(&mode).map(|_| ())
    };

    match located {
        Err(err) if err.is_recoverable() && matches!(mode, LocatorMode::Auto(_)) => {
            warn!(%err, "Automatic detection failed; using the whole image");
            eprintln!("warning: no document outline found, using the whole image");
            session.locate(&LocatorMode::FullFrame)?;
            Ok(())
        }
        other => Ok(other?),
    }
}

fn resolve_template(config: &AppConfig, args: &ProcessArgs) -> Result<Option<Template>> {
    let source = match (&args.template, &args.template_file) {
        (Some(name), _) => TemplateSource::Named(name.clone()),
        (None, Some(path)) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read template {}", path.display()))?;
            TemplateSource::Inline(parse_template(&path.display().to_string(), &raw)?)
        }
        (None, None) => return Ok(None),
    };
    let store = DirectoryTemplateStore::new(&config.templates_dir);
    Ok(Some(source.resolve(&store)?))
}

/// The configured watermark with command-line overrides, when `--watermark`
/// was given at all.
fn watermark_spec(config: &AppConfig, args: &ProcessArgs) -> Result<Option<WatermarkSpec>> {
    let Some(text) = &args.watermark else {
        return Ok(None);
    };
    let mut spec = config.watermark.to_spec();
    if let Some(text) = text {
        spec.text = text.clone();
    }
    if let Some(angle) = args.angle {
        spec.angle = angle;
    }
    if let Some(opacity) = args.opacity {
        spec.opacity = opacity;
    }
    docveil_core::config::validate_opacity(spec.opacity)?;
    Ok(Some(spec.with_color(parse_color(config, &args.color)?)))
}

/// A palette name, `auto`, or an explicit `r,g,b` triple.
fn parse_color(config: &AppConfig, value: &str) -> Result<Option<Rgb>> {
    if let Ok(choice) = value.parse::<ColorChoice>() {
        return Ok(config.palette.resolve(choice));
    }
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let [r, g, b] = parts.as_slice() else {
        bail!("unknown watermark color '{value}'");
    };
    let channel = |s: &str| {
        s.parse::<u8>()
            .with_context(|| format!("bad color channel '{s}' in '{value}'"))
    };
    Ok(Some([channel(r)?, channel(g)?, channel(b)?]))
}

fn write_output(image: ImageProcessor, path: &Path, quality: u8) -> Result<()> {
    let is_jpeg = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));
    if is_jpeg {
        let bytes = image.to_jpeg_bytes(quality)?;
        std::fs::write(path, bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
    } else {
        image.save(path)?;
    }
    Ok(())
}

pub fn templates(config: &AppConfig, action: TemplatesAction) -> Result<()> {
    let store = DirectoryTemplateStore::new(&config.templates_dir);
    match action {
        TemplatesAction::List => {
            let names = store.list()?;
            if names.is_empty() {
                eprintln!("no templates in {}", store.root().display());
            }
            for name in names {
                println!("{name}");
            }
        }
        TemplatesAction::Show { name } => {
            let template = store.load(&name)?;
            println!("{}", to_json(&template)?);
            println!("sha256: {}", fingerprint(&template)?);
        }
        TemplatesAction::Add { name, size, points } => {
            let template = Template::new(size, rectangles_from_points(&points)?);
            if template.rectangles.is_empty() {
                warn!(%name, "Storing a template without rectangles");
            }
            store.save(&name, &template)?;
            println!("{}", store.path_for(&name)?.display());
        }
    }
    Ok(())
}

/// Consecutive points as opposite corners of one rectangle each. Shared
/// corners between neighbouring rectangles are kept.
fn rectangles_from_points(points: &[Point]) -> Result<Vec<Rectangle>> {
    if points.len() % 2 != 0 {
        bail!("points must come in pairs; the last one has no partner");
    }
    let pixel = |p: &Point| (p.x.round() as i32, p.y.round() as i32);
    Ok(points
        .chunks_exact(2)
        .map(|pair| Rectangle::new(pixel(&pair[0]), pixel(&pair[1])))
        .collect())
}
