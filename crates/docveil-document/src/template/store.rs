// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Template storage — a directory of `<name>.json` records, or an in-memory map.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use docveil_core::error::{DocveilError, Result};
use docveil_core::types::Template;
use tracing::{debug, info, instrument};

use super::{fingerprint, parse_template, to_json};

const EXTENSION: &str = "json";

/// Named template records.
///
/// Names are reduced to their file stem, so `"DNI"`, `"DNI.json"` and
/// `"scans/DNI"` all address the same record.
pub trait TemplateStore {
    fn load(&self, name: &str) -> Result<Template>;
    fn save(&self, name: &str, template: &Template) -> Result<()>;
    /// Stored names, sorted.
    fn list(&self) -> Result<Vec<String>>;
}

/// Reduce a user-supplied template name to its canonical stem.
pub fn template_stem(name: &str) -> Result<String> {
    Path::new(name.trim())
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| DocveilError::TemplateInvalid {
            name: name.to_owned(),
            reason: "template name is empty".into(),
        })
}

/// Templates kept as pretty-printed JSON files in one directory.
#[derive(Debug, Clone)]
pub struct DirectoryTemplateStore {
    root: PathBuf,
}

impl DirectoryTemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `name`.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        let stem = template_stem(name)?;
        Ok(self.root.join(format!("{stem}.{EXTENSION}")))
    }
}

impl TemplateStore for DirectoryTemplateStore {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    fn load(&self, name: &str) -> Result<Template> {
        let path = self.path_for(name)?;
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(DocveilError::TemplateNotFound(path.display().to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        let stem = template_stem(name)?;
        let template = parse_template(&stem, &raw)?;
        info!(
            template = %stem,
            size = %template.size,
            rectangles = template.rectangles.len(),
            fingerprint = %fingerprint(&template)?,
            "Template loaded"
        );
        Ok(template)
    }

    #[instrument(skip(self, template), fields(root = %self.root.display()))]
    fn save(&self, name: &str, template: &Template) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.path_for(name)?;
        std::fs::write(&path, to_json(template)?)?;
        info!(path = %path.display(), "Template saved");
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(root = %self.root.display(), "Templates directory missing");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Templates held in memory, for inline records and tests.
#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    records: Mutex<BTreeMap<String, Template>>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Template>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn load(&self, name: &str) -> Result<Template> {
        let stem = template_stem(name)?;
        self.records()
            .get(&stem)
            .cloned()
            .ok_or(DocveilError::TemplateNotFound(stem))
    }

    fn save(&self, name: &str, template: &Template) -> Result<()> {
        let stem = template_stem(name)?;
        self.records().insert(stem, template.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.records().keys().cloned().collect())
    }
}
