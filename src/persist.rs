//! Persisted per-module doc output.
//!
//! Each validated module is written as `<modules_dir>/<component>/index.json`
//! with bulky or diagnostic-only keys removed at every depth. Parser errors
//! are reported before the `errors` key is dropped, except for the custom
//! tags the documentation set is allowed to use.

use std::path::{Path, PathBuf};

use log::debug;
use serde_json::Value;

use crate::doclet::{Doclet, Location};
use crate::error::BuildError;
use crate::validation::{FindingKind, Findings, ValidationFinding};

/// Keys removed from persisted output.
pub const DEFAULT_STRIPPED_KEYS: &[&str] = &[
    "lineNumber",
    "position",
    "code",
    "loc",
    "context",
    "path",
    "loose",
    "checked",
    "todos",
    "errors",
];

/// Custom tags the parser reports as unknown but which are expected.
pub const DEFAULT_ALLOWED_ERROR_TAGS: &[&str] = &[
    "@curried",
    "@hoc",
    "@hocconfig",
    "@omit",
    "@required",
    "@template",
    "@ui",
];

const UNKNOWN_TAG_PREFIX: &str = "unknown tag ";

/// Writes pruned module docs below an output root.
#[derive(Debug, Clone)]
pub struct DocWriter {
    output_root: PathBuf,
    stripped_keys: Vec<String>,
    allowed_error_tags: Vec<String>,
}

impl DocWriter {
    pub fn new(
        output_root: impl Into<PathBuf>,
        stripped_keys: Vec<String>,
        allowed_error_tags: Vec<String>,
    ) -> Self {
        Self {
            output_root: output_root.into(),
            stripped_keys,
            allowed_error_tags,
        }
    }

    /// Reports parser errors that are not allowed custom tags.
    ///
    /// `source` is the scanned directory, used to locate the message.
    pub fn report_parse_errors(&self, docs: &[Doclet], source: &Path, findings: &mut Findings) {
        for doclet in docs.iter().flat_map(Doclet::walk) {
            for error in doclet.errors() {
                let message = error.message.as_deref().unwrap_or_default();
                let short = message.strip_prefix(UNKNOWN_TAG_PREFIX).unwrap_or(message);
                if !short.is_empty() && self.allowed_error_tags.iter().any(|tag| tag == short) {
                    continue;
                }

                let location = Location::new(
                    source.display().to_string(),
                    error.comment_line_number,
                );
                let text = if short.is_empty() {
                    format!("Parse error: {:?} in {}", error, source.display())
                } else {
                    format!("Parse error: {} in {}", message, location)
                };
                findings.record(ValidationFinding::new(FindingKind::ParseError, text).at(location));
            }
        }
    }

    /// Serializes `docs` with the configured keys stripped.
    pub fn render(&self, docs: &[Doclet]) -> Result<String, BuildError> {
        let mut tree = serde_json::to_value(docs)
            .map_err(|err| BuildError::json(self.output_root.clone(), err))?;
        strip_keys(&mut tree, &self.stripped_keys);
        serde_json::to_string_pretty(&tree)
            .map_err(|err| BuildError::json(self.output_root.clone(), err))
    }

    /// Writes `docs` for `component` and returns the written path.
    pub async fn write(&self, component: &str, docs: &[Doclet]) -> Result<PathBuf, BuildError> {
        let dir = self.output_root.join(component);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| BuildError::io(&dir, err))?;

        let path = dir.join("index.json");
        let contents = self.render(docs)?;
        tokio::fs::write(&path, contents)
            .await
            .map_err(|err| BuildError::io(&path, err))?;

        debug!("Wrote {}", path.display());
        Ok(path)
    }
}

/// Removes every object key in `keys`, at any depth.
pub fn strip_keys(value: &mut Value, keys: &[String]) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !keys.iter().any(|k| k == key));
            for child in map.values_mut() {
                strip_keys(child, keys);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_keys(item, keys);
            }
        }
        _ => {}
    }
}
