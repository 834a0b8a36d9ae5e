//! Library description artifact.
//!
//! Builds the `library name -> {packageName, version, dependencies,
//! description, ...}` mapping the site uses for its library overview pages.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::DocsConfig;
use crate::error::BuildError;
use crate::validation::{FindingKind, Findings, ValidationFinding};

/// Library name to description, in discovery order.
pub type LibraryDescriptions = IndexMap<String, LibraryDescription>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryDescription {
    pub package_name: Option<String>,
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct PackageManifest {
    name: Option<String>,
    version: Option<String>,
    dependencies: Option<Map<String, Value>>,
    description: Option<String>,
}

/// The libraries below a root: each visible `packages/*` directory (except
/// `sampler`), or the root itself.
pub fn library_paths(config: &DocsConfig) -> Result<Vec<(String, PathBuf)>, BuildError> {
    if !config.has_package_dir {
        let name = config
            .path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        return Ok(vec![(name, config.path.clone())]);
    }

    let package_dir = config.path.join("packages");
    let mut libraries = Vec::new();
    for entry in fs::read_dir(&package_dir).map_err(|err| BuildError::io(&package_dir, err))? {
        let entry = entry.map_err(|err| BuildError::io(&package_dir, err))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !entry.path().is_dir() || name == "sampler" || name.starts_with('.') {
            continue;
        }
        libraries.push((name, entry.path()));
    }
    libraries.sort();
    Ok(libraries)
}

/// First blockquote line of a readme, without the `>` marker.
pub fn readme_blurb(contents: &str) -> Option<String> {
    contents
        .lines()
        .map(str::trim_start)
        .find(|line| line.starts_with('>'))
        .map(|line| line.trim_start_matches('>').trim().to_string())
        .filter(|line| !line.is_empty())
}

/// Describes every library of a root.
///
/// A library without a readable `package.json` is skipped; in strict runs
/// that is also reported as a finding.
pub fn describe_libraries(
    config: &DocsConfig,
    strict: bool,
    findings: &mut Findings,
) -> Result<LibraryDescriptions, BuildError> {
    let mut output = LibraryDescriptions::new();

    for (name, path) in library_paths(config)? {
        let manifest_path = path.join("package.json");
        let manifest = fs::read_to_string(&manifest_path)
            .ok()
            .and_then(|text| serde_json::from_str::<PackageManifest>(&text).ok());

        let Some(manifest) = manifest else {
            if strict {
                findings.record(ValidationFinding::new(
                    FindingKind::PackageManifest,
                    format!("Unable to load package.json in {}!", path.display()),
                ));
            } else {
                debug!("No package.json in {}", path.display());
            }
            continue;
        };

        let description = config
            .description
            .clone()
            .or_else(|| {
                fs::read_to_string(path.join("README.md"))
                    .ok()
                    .and_then(|readme| readme_blurb(&readme))
            })
            .or(manifest.description);

        output.insert(
            name,
            LibraryDescription {
                package_name: manifest.name,
                version: manifest.version,
                dependencies: manifest.dependencies,
                description,
                extra: config.extra.clone(),
            },
        );
    }

    Ok(output)
}

/// Writes the description mapping as JSON, creating parent directories.
pub fn save_descriptions(path: &Path, descriptions: &LibraryDescriptions) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| BuildError::io(parent, err))?;
    }
    let contents =
        serde_json::to_string_pretty(descriptions).map_err(|err| BuildError::json(path, err))?;
    fs::write(path, contents).map_err(|err| BuildError::io(path, err))?;
    info!("Wrote {} library descriptions to {}", descriptions.len(), path.display());
    Ok(())
}
