// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Templates — JSON records of the regions to redact for one document type,
// their storage, and the sessions that author them.

pub mod authoring;
pub mod store;

use docveil_core::error::{DocveilError, Result};
use docveil_core::types::Template;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

pub use authoring::{ClickPairSession, DrawingSession, PointerEvent};
pub use store::{DirectoryTemplateStore, MemoryTemplateStore, TemplateStore};

/// Where the pipeline gets its template from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Looked up by name in a [`TemplateStore`].
    Named(String),
    /// Supplied directly, e.g. from a file given on the command line.
    Inline(Template),
}

impl TemplateSource {
    /// Produce the template, going through `store` for named sources.
    ///
    /// Lookup failures propagate; there is no fallback to an empty template.
    #[instrument(skip(self, store))]
    pub fn resolve(&self, store: &dyn TemplateStore) -> Result<Template> {
        match self {
            Self::Named(name) => store.load(name),
            Self::Inline(template) => {
                debug!(size = %template.size, "Using inline template");
                Ok(template.clone())
            }
        }
    }
}

/// Parse a template record. `name` only labels the error.
pub fn parse_template(name: &str, raw: &str) -> Result<Template> {
    serde_json::from_str(raw).map_err(|err| DocveilError::TemplateInvalid {
        name: name.to_owned(),
        reason: err.to_string(),
    })
}

/// Pretty JSON as written to disk.
pub fn to_json(template: &Template) -> Result<String> {
    Ok(serde_json::to_string_pretty(template)?)
}

/// SHA-256 of the compact JSON encoding, as lowercase hex.
///
/// Two records with the same size and rectangles always share a
/// fingerprint, however they were formatted on disk.
pub fn fingerprint(template: &Template) -> Result<String> {
    let canonical = serde_json::to_vec(template)?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(hex::encode(hasher.finalize()))
}
