//! Projection of persisted module docs and site pages into search documents.
//!
//! The projection is a deliberately shallow text bag: ranking is the index's
//! concern. Module docs are read back from the persisted `index.json` files,
//! never from the ingestion registry.

use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info};
use rayon::prelude::*;
use serde_json::Value;
use walkdir::WalkDir;

use crate::doclet::descendants;
use crate::error::BuildError;
use crate::matching::normalize_path;
use crate::search::{IndexBuilder, SearchDocument};

/// Outcome of building an index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub records: usize,
    pub pages: usize,
    /// Records or pages that could not be projected and were skipped.
    pub failures: usize,
}

/// Feeds module docs and pages into an [`IndexBuilder`].
#[derive(Debug, Clone)]
pub struct Projector {
    modules_dir: PathBuf,
    pages_dir: PathBuf,
    modules_site_path: String,
}

type Projected = Vec<(PathBuf, Result<SearchDocument, BuildError>)>;

impl Projector {
    pub fn new(
        modules_dir: impl Into<PathBuf>,
        pages_dir: impl Into<PathBuf>,
        modules_site_path: impl Into<String>,
    ) -> Self {
        Self {
            modules_dir: modules_dir.into(),
            pages_dir: pages_dir.into(),
            modules_site_path: modules_site_path.into(),
        }
    }

    /// Projects both corpora and adds every document to `index`.
    ///
    /// Items that fail are logged and counted; a missing input directory is
    /// an environment failure.
    pub fn build_index<I: IndexBuilder>(&self, index: &mut I) -> Result<IndexReport, BuildError> {
        info!("Generating search index...");
        for dir in [&self.modules_dir, &self.pages_dir] {
            if !dir.is_dir() {
                return Err(BuildError::Environment(format!(
                    "Unable to find parsed documentation in {}",
                    dir.display()
                )));
            }
        }

        let (records, pages) = rayon::join(|| self.project_records(), || self.project_pages());

        let mut report = IndexReport::default();
        for (path, projected) in records.into_iter().chain(pages) {
            let is_page = path.extension().is_some_and(|ext| ext == "md");
            let added = projected.and_then(|doc| index.add_doc(&doc));
            match added {
                Ok(()) if is_page => report.pages += 1,
                Ok(()) => report.records += 1,
                Err(err) => {
                    error!("Error parsing {}: {:#}", path.display(), anyhow::Error::new(err));
                    report.failures += 1;
                }
            }
        }

        info!(
            "Indexed {} modules and {} pages ({} skipped)",
            report.records, report.pages, report.failures
        );
        Ok(report)
    }

    fn project_records(&self) -> Projected {
        files_with_extension(&self.modules_dir, "json")
            .into_par_iter()
            .map(|path| {
                let projected = fs::read_to_string(&path)
                    .map_err(|err| BuildError::io(&path, err))
                    .and_then(|text| {
                        serde_json::from_str::<Value>(&text).map_err(|err| BuildError::json(&path, err))
                    })
                    .and_then(|tree| {
                        project_record(&tree, &self.modules_site_path)
                            .map_err(|message| BuildError::projection(&path, message))
                    });
                (path, projected)
            })
            .collect()
    }

    fn project_pages(&self) -> Projected {
        files_with_extension(&self.pages_dir, "md")
            .into_par_iter()
            .map(|path| {
                let projected = fs::read_to_string(&path)
                    .map_err(|err| BuildError::io(&path, err))
                    .and_then(|text| {
                        project_page(&path, &self.pages_dir, &text)
                            .map_err(|message| BuildError::projection(&path, message))
                    });
                (path, projected)
            })
            .collect()
    }
}

fn files_with_extension(root: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == extension))
        .collect();
    files.sort();
    files
}

/// Projects a persisted module doc (an array of records) into a search document.
pub fn project_record(tree: &Value, site_path: &str) -> Result<SearchDocument, String> {
    let records: Vec<&Value> = match tree {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let title = records
        .first()
        .and_then(|record| record.get("name"))
        .and_then(Value::as_str)
        .ok_or("record has no name")?
        .to_string();

    let mut description = Vec::new();
    let mut member_descriptions = Vec::new();
    let mut members = Vec::new();

    for record in &records {
        if let Some(subtree) = record.get("description") {
            for value in value_leaves(subtree) {
                match value {
                    Value::String(text) => description.push(text.clone()),
                    Value::Null => {}
                    other => return Err(format!("description value is not text: {}", other)),
                }
            }
        }
        if let Some(subtree) = record.get("members") {
            member_descriptions.extend(value_leaves(subtree).into_iter().filter_map(as_text));
        }
        members.extend(member_names(record)?);
    }

    Ok(SearchDocument {
        id: format!("{}|{}/{}", title, site_path.trim_end_matches('/'), title),
        title,
        description: description.join(" "),
        members: members.join(" "),
        member_descriptions: member_descriptions.join(" "),
    })
}

/// Every `value` property below `root`.
fn value_leaves(root: &Value) -> Vec<&Value> {
    descendants(root)
        .into_iter()
        .filter_map(|node| node.as_object()?.get("value"))
        .collect()
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Names of the member doclets under every `members` node in `root`.
fn member_names(root: &Value) -> Result<Vec<String>, String> {
    let mut names = Vec::new();
    for node in descendants(root) {
        let Some(groups) = node.get("members").and_then(Value::as_object) else {
            continue;
        };
        for group in groups.values() {
            let doclets: Vec<&Value> = match group {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            for doclet in doclets {
                match doclet.get("name") {
                    Some(Value::String(name)) => names.push(name.clone()),
                    Some(Value::Null) | None => {}
                    Some(other) => return Err(format!("member name is not text: {}", other)),
                }
            }
        }
    }
    Ok(names)
}

/// Splits `---` delimited front matter from a page body.
pub fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return (None, text);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let body = &rest[offset + line.len()..];
            return (Some(&rest[..offset]), body);
        }
        offset += line.len();
    }
    (None, text)
}

/// Projects a markdown page below `pages_root`.
pub fn project_page(path: &Path, pages_root: &Path, text: &str) -> Result<SearchDocument, String> {
    let (front_matter, body) = split_front_matter(text);

    let configured_title = match front_matter {
        Some(yaml) if !yaml.trim().is_empty() => {
            let data: serde_yaml::Value =
                serde_yaml::from_str(yaml).map_err(|err| format!("invalid front matter: {}", err))?;
            data.get("title").and_then(|title| match title {
                serde_yaml::Value::String(s) => Some(s.clone()),
                serde_yaml::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
        }
        _ => None,
    };

    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let title = configured_title.unwrap_or_else(|| stem.clone());

    let target = if stem == "index" {
        path.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        path.with_extension("")
    };
    let relative = target.strip_prefix(pages_root).unwrap_or(&target);

    Ok(SearchDocument {
        id: format!("{}|{}", title, normalize_path(relative)),
        title,
        description: body.to_string(),
        members: String::new(),
        member_descriptions: String::new(),
    })
}
