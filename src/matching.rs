//! Source discovery.
//!
//! Finds the directories that hold documented modules: files whose base name
//! matches a shell-style include pattern and whose contents carry an
//! `@module` tag. Directories such as `node_modules` or `build` are pruned
//! during the walk.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use regex::Regex;
use walkdir::WalkDir;

use crate::error::BuildError;

/// Marker a source file must contain to be considered documented.
pub const MODULE_MARKER: &str = "@module";

/// Directory names skipped during discovery.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "build",
    "node_modules",
    "sampler",
    "samples",
    "tests",
    "dist",
    "coverage",
];

/// Translates a shell-style glob into an anchored regex.
///
/// - `**` matches anything, including `/`
/// - `*` matches everything except `/`
/// - `?` matches one character except `/`
/// - `[seq]` / `[!seq]` match a character class or its negation
pub fn translate_pattern(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:[^/]+/)*");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            '[' => match chars[i + 1..].iter().position(|&c| c == ']') {
                Some(offset) if offset > 0 => {
                    let class: String = chars[i + 1..i + 1 + offset].iter().collect();
                    out.push('[');
                    match class.strip_prefix('!') {
                        Some(negated) => {
                            out.push('^');
                            out.push_str(negated);
                        }
                        None => out.push_str(&class),
                    }
                    out.push(']');
                    i += offset + 2;
                }
                _ => {
                    out.push_str("\\[");
                    i += 1;
                }
            },
            c => {
                if "\\.^$+{}|()".contains(c) {
                    out.push('\\');
                }
                out.push(c);
                i += 1;
            }
        }
    }

    out.push('$');
    out
}

/// Decides which files and directories discovery looks at.
#[derive(Debug, Clone)]
pub struct SourceFilter {
    include: Regex,
    excluded_dirs: Vec<String>,
}

impl SourceFilter {
    pub fn new(include_pattern: &str, excluded_dirs: Vec<String>) -> Result<Self, BuildError> {
        let include = Regex::new(&translate_pattern(include_pattern)).map_err(|err| {
            BuildError::Config(format!("invalid include pattern {}: {}", include_pattern, err))
        })?;
        Ok(Self {
            include,
            excluded_dirs,
        })
    }

    fn is_excluded_dir(&self, name: &str) -> bool {
        self.excluded_dirs.iter().any(|dir| dir == name)
    }

    fn includes_file(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.include.is_match(&name.to_string_lossy()))
            .unwrap_or(false)
    }

    /// Documented source files below `root`, sorted.
    pub fn module_files(&self, root: &Path) -> Result<Vec<PathBuf>, BuildError> {
        if !root.is_dir() {
            return Err(BuildError::Environment(format!(
                "source directory {} does not exist",
                root.display()
            )));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root).follow_links(true).into_iter();
        for entry in walker.filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !self.is_excluded_dir(&entry.file_name().to_string_lossy())
        }) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("Skipping unreadable entry below {}: {}", root.display(), err);
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || !self.includes_file(path) {
                continue;
            }
            match fs::read_to_string(path) {
                Ok(contents) if contents.contains(MODULE_MARKER) => files.push(path.to_path_buf()),
                Ok(_) => {}
                Err(err) => debug!("Skipping {}: {}", path.display(), err),
            }
        }

        files.sort();
        Ok(files)
    }

    /// Directories holding at least one documented source file.
    pub fn module_dirs(&self, root: &Path) -> Result<BTreeSet<PathBuf>, BuildError> {
        Ok(self
            .module_files(root)?
            .into_iter()
            .filter_map(|file| file.parent().map(Path::to_path_buf))
            .collect())
    }
}

/// Normalizes a path to use forward slashes.
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// The module path a scanned directory is expected to document.
///
/// This is the part after `packages/`, else after `raw/`, else the last two
/// segments. A trailing `src` segment is dropped (`spotlight/src` documents
/// `spotlight`).
pub fn component_directory(dir: &Path) -> String {
    let normalized = normalize_path(dir);
    let normalized = normalized.trim_end_matches('/');

    let after = |marker: &str| {
        normalized
            .split(marker)
            .nth(1)
            .filter(|rest| !rest.is_empty())
            .map(str::to_string)
    };

    let component = after("packages/")
        .or_else(|| after("raw/"))
        .unwrap_or_else(|| {
            let parts: Vec<&str> = normalized.split('/').collect();
            parts[parts.len().saturating_sub(2)..].join("/")
        });

    let mut parts: Vec<&str> = component.split('/').collect();
    if parts.len() > 1 && parts.last() == Some(&"src") {
        parts.pop();
    }
    parts.join("/")
}
