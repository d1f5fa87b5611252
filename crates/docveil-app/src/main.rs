// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Docveil — rectify, redact and watermark photographed identity documents.
//
// Entry point. Initialises logging, parses the command line and dispatches
// to the `process` and `templates` commands.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use docveil_core::DocveilError;
use docveil_core::human_errors::humanize_error;
use docveil_core::types::{Point, RedactionMode, TemplateSize};
use tracing_subscriber::EnvFilter;

/// Rectify, redact and watermark photographed documents.
#[derive(Parser, Debug)]
#[command(name = "docveil", version, arg_required_else_help = true)]
struct Cli {
    /// JSON settings file; defaults plus environment overrides when absent.
    #[arg(long, global = true, env = "DOCVEIL_CONFIG")]
    config: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rectify one photo and apply redaction and watermark.
    Process(ProcessArgs),
    /// Manage redaction templates.
    Templates {
        #[command(subcommand)]
        action: TemplatesAction,
    },
}

#[derive(clap::Args, Debug)]
struct ProcessArgs {
    /// Photo of the document.
    input: PathBuf,

    /// Output image; JPEG when the extension is .jpg or .jpeg.
    #[arg(short, long)]
    output: PathBuf,

    /// How the document corners are found.
    #[arg(long, value_enum, default_value = "auto")]
    corners: CornerMode,

    /// A corner as `x,y`; give exactly four with `--corners manual`.
    #[arg(long = "corner", value_parser = parse_point)]
    corner: Vec<Point>,

    /// Corner coordinates refer to the downscaled preview, not the photo.
    /// Automatic detection always runs on the preview.
    #[arg(long)]
    on_preview: bool,

    /// Stored template name.
    #[arg(short, long, conflicts_with = "template_file")]
    template: Option<String>,

    /// Template JSON file used as is.
    #[arg(long)]
    template_file: Option<PathBuf>,

    /// How template regions are obscured.
    #[arg(short, long, value_enum, default_value = "none")]
    redaction: RedactionArg,

    /// Keep color instead of converting to grayscale.
    #[arg(long)]
    keep_color: bool,

    /// Watermark text; without a value the configured text is used, and
    /// an empty value disables the watermark.
    #[arg(short, long, num_args = 0..=1)]
    watermark: Option<Option<String>>,

    /// Watermark rotation in degrees, counter-clockwise.
    #[arg(long)]
    angle: Option<f32>,

    /// Watermark opacity between 0 and 1.
    #[arg(long)]
    opacity: Option<f32>,

    /// Watermark color: auto, white, black, red, or `r,g,b`.
    #[arg(long, default_value = "auto")]
    color: String,

    /// Gaussian kernel size for blur redaction (odd).
    #[arg(long)]
    blur_kernel: Option<u32>,

    /// Fail when the rectified document and the template differ in size.
    #[arg(long)]
    strict_size: bool,

    /// JPEG quality (1-100).
    #[arg(long, default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,
}

#[derive(Subcommand, Debug)]
enum TemplatesAction {
    /// List stored template names.
    List,
    /// Print a template with its fingerprint.
    Show { name: String },
    /// Store a template from pairs of opposite rectangle corners.
    Add {
        name: String,
        /// Size of the rectified sample, as `WIDTHxHEIGHT`.
        #[arg(long, value_parser = parse_size)]
        size: TemplateSize,
        /// A corner as `x,y`; consecutive points pair up into rectangles.
        #[arg(long = "point", value_parser = parse_point)]
        points: Vec<Point>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum CornerMode {
    Auto,
    Full,
    Manual,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RedactionArg {
    None,
    SolidWhite,
    SolidBlack,
    Blur,
}

impl From<RedactionArg> for RedactionMode {
    fn from(v: RedactionArg) -> Self {
        match v {
            RedactionArg::None => RedactionMode::None,
            RedactionArg::SolidWhite => RedactionMode::SolidWhite,
            RedactionArg::SolidBlack => RedactionMode::SolidBlack,
            RedactionArg::Blur => RedactionMode::Blur,
        }
    }
}

fn parse_point(s: &str) -> std::result::Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{s}'"))?;
    let x: f32 = x.trim().parse().map_err(|_| format!("bad x coordinate in '{s}'"))?;
    let y: f32 = y.trim().parse().map_err(|_| format!("bad y coordinate in '{s}'"))?;
    Ok(Point::new(x, y))
}

fn parse_size(s: &str) -> std::result::Result<TemplateSize, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT but got '{s}'"))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("bad width in '{s}'"))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("bad height in '{s}'"))?;
    Ok(TemplateSize::new(w, h))
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Docveil starting");

    if let Err(err) = run(cli) {
        report(&err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = commands::load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Process(args) => commands::process(&config, args),
        Command::Templates { action } => commands::templates(&config, action),
    }
}

/// Print an error, in plain language when it is one of ours.
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<DocveilError>() {
        Some(docveil) => {
            let human = humanize_error(docveil);
            eprintln!("error: {}", human.message);
            eprintln!("  {}", human.suggestion);
            eprintln!("  ({err:#})");
        }
        None => eprintln!("error: {err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_parse_with_spaces() {
        assert_eq!(parse_point("12, 34.5").unwrap(), Point::new(12.0, 34.5));
        assert!(parse_point("12").is_err());
        assert!(parse_point("a,b").is_err());
    }

    #[test]
    fn sizes_parse() {
        assert_eq!(parse_size("856x540").unwrap(), TemplateSize::new(856, 540));
        assert!(parse_size("856").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn manual_corners_parse() {
        let cli = Cli::try_parse_from([
            "docveil", "process", "in.png", "-o", "out.jpg", "--corners", "manual",
            "--corner", "0,0", "--corner", "10,0", "--corner", "10,10", "--corner", "0,10",
            "--redaction", "solid-black",
        ])
        .unwrap();
        match cli.command {
            Command::Process(args) => {
                assert_eq!(args.corners, CornerMode::Manual);
                assert_eq!(args.corner.len(), 4);
                assert!(matches!(args.redaction, RedactionArg::SolidBlack));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn bare_watermark_flag_parses_without_text() {
        let parse = |extra: &[&str]| {
            let mut argv = vec!["docveil", "process", "in.png", "-o", "out.png"];
            argv.extend_from_slice(extra);
            match Cli::try_parse_from(argv).unwrap().command {
                Command::Process(args) => args.watermark,
                other => panic!("unexpected command: {other:?}"),
            }
        };
        assert_eq!(parse(&[]), None);
        assert_eq!(parse(&["--watermark"]), Some(None));
        assert_eq!(parse(&["--watermark", "MUESTRA"]), Some(Some("MUESTRA".into())));
    }
}
