// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the person holding the camera.
//
// Every technical error is mapped to plain language with a clear next step.
// The severity drives how a front end presents it.

use crate::error::DocveilError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The result is usable but may be wrong (misplaced redactions).
    Warning,
    /// User must do something (pick corners, choose another template).
    ActionRequired,
    /// Cannot be fixed from inside the session (bad file or bad settings).
    Permanent,
}

/// A human-readable error with a message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether the session can continue with different input.
    pub recoverable: bool,
    pub severity: Severity,
}

/// Convert a `DocveilError` into a `HumanError`.
pub fn humanize_error(err: &DocveilError) -> HumanError {
    match err {
        DocveilError::Geometry(_) => HumanError {
            message: "The selected corners don't outline a document.".into(),
            suggestion: "Pick four distinct corners around the document, or use the whole image instead.".into(),
            recoverable: true,
            severity: Severity::ActionRequired,
        },

        DocveilError::IncompleteCorners { collected } => HumanError {
            message: "Not all corners have been selected yet.".into(),
            suggestion: format!(
                "Click the remaining {} corner(s) of the document.",
                4usize.saturating_sub(*collected)
            ),
            recoverable: true,
            severity: Severity::ActionRequired,
        },

        DocveilError::DetectionMiss => HumanError {
            message: "We couldn't find the edges of the document.".into(),
            suggestion: "Switch to manual mode and click the four corners yourself.".into(),
            recoverable: true,
            severity: Severity::ActionRequired,
        },

        DocveilError::TemplateNotFound(name) => HumanError {
            message: format!("The template \"{name}\" doesn't exist."),
            suggestion: "Choose another template, or create a custom one before processing.".into(),
            recoverable: true,
            severity: Severity::ActionRequired,
        },

        DocveilError::TemplateInvalid { name, .. } => HumanError {
            message: format!("The template \"{name}\" is damaged."),
            suggestion: "Recreate the template; it must at least record the image size.".into(),
            recoverable: true,
            severity: Severity::ActionRequired,
        },

        DocveilError::TemplateSizeMismatch { expected, actual } => HumanError {
            message: "The template was made for a different image size.".into(),
            suggestion: format!(
                "Redacted areas may be in the wrong place (template {expected}, image {actual}). Check the result carefully."
            ),
            recoverable: true,
            severity: Severity::Warning,
        },

        DocveilError::Config(detail) => HumanError {
            message: "Some settings are not valid.".into(),
            suggestion: format!("Correct the settings and try again. ({detail})"),
            recoverable: false,
            severity: Severity::Permanent,
        },

        DocveilError::InvalidTransition { .. } => HumanError {
            message: "That step can't be done yet.".into(),
            suggestion: "Crop the document first, then redact and add the watermark.".into(),
            recoverable: true,
            severity: Severity::ActionRequired,
        },

        DocveilError::ImageError(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try a JPEG or PNG photo.".into(),
            recoverable: false,
            severity: Severity::Permanent,
        },

        DocveilError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    recoverable: false,
                    severity: Severity::Permanent,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Check the folder permissions and free space, then try again.".into(),
                    recoverable: false,
                    severity: Severity::Permanent,
                }
            }
        }

        DocveilError::Serialization(_) => HumanError {
            message: "A saved file couldn't be read.".into(),
            suggestion: "The file may be damaged. Try recreating it.".into(),
            recoverable: false,
            severity: Severity::Permanent,
        },
    }
}
