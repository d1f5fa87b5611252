// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Docveil.

use thiserror::Error;

use crate::types::TemplateSize;

/// Top-level error type for all Docveil operations.
#[derive(Debug, Error)]
pub enum DocveilError {
    // -- Corner location / rectification --
    #[error("degenerate corner set: {0}")]
    Geometry(String),

    #[error("manual corner selection incomplete: {collected} of 4 points")]
    IncompleteCorners { collected: usize },

    #[error("no four-sided document outline detected")]
    DetectionMiss,

    // -- Templates --
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("template '{name}' is invalid: {reason}")]
    TemplateInvalid { name: String, reason: String },

    #[error("template expects {expected} but the working image is {actual}")]
    TemplateSizeMismatch {
        expected: TemplateSize,
        actual: TemplateSize,
    },

    // -- Parameters --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot move from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DocveilError {
    /// Whether the caller can carry on by switching corner mode or
    /// collecting more input.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::DetectionMiss | Self::IncompleteCorners { .. })
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocveilError>;
