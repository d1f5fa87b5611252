// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docveil-document — Document image processing for Docveil.
//
// Locates a photographed document's corners, rectifies it to an upright
// crop, redacts template regions (solid fill or blur) and tiles a
// semi-transparent text watermark over the result.

pub mod geometry;
pub mod image;
pub mod locate;
pub mod pipeline;
pub mod rectify;
pub mod redact;
pub mod template;
pub mod watermark;

// Re-export the primary types so callers can use `docveil_document::Pipeline` etc.
pub use crate::image::ImageProcessor;
pub use geometry::{CornerSet, OrderedCorners, scale_points};
pub use locate::{
    AutoLocator, CornerLocator, FullFrameLocator, LocatorMode, ManualLocator, Preview,
    locate_on_preview,
};
pub use pipeline::{
    DocumentSession, Pipeline, PipelineWarning, ProcessOptions, Processed, Stage, process,
};
pub use rectify::{RectifiedImage, rectify};
pub use redact::{Redactor, redact};
pub use template::{
    DirectoryTemplateStore, MemoryTemplateStore, TemplateSource, TemplateStore, fingerprint,
};
pub use watermark::{Watermarker, composite, resolve_color};
