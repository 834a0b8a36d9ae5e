//! Configuration.
//!
//! [`BuildConfig`] holds the run settings, layered from built-in defaults, an
//! optional config file and `DOCWEAVE_*` environment variables.
//! [`DocsConfig`] describes one library root and is read from the library's
//! own `docs/config.json`.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::BuildError;
use crate::matching::DEFAULT_EXCLUDED_DIRS;
use crate::persist::{DEFAULT_ALLOWED_ERROR_TAGS, DEFAULT_STRIPPED_KEYS};

/// Settings for one docweave run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Library roots to ingest.
    pub libraries: Vec<PathBuf>,
    /// Root of the site's markdown pages.
    pub pages_dir: PathBuf,
    /// Where persisted module docs are written (and read back for indexing).
    pub modules_dir: PathBuf,
    /// Site-relative prefix used in module search ids.
    pub modules_site_path: String,
    pub index_file: PathBuf,
    pub library_description_file: PathBuf,
    /// Base-name glob for candidate source files.
    pub include_pattern: String,
    pub excluded_dirs: Vec<String>,
    /// `library/Module` pairs that may be linked without a matching doclet.
    pub link_exceptions: Vec<String>,
    pub allowed_error_tags: Vec<String>,
    pub stripped_keys: Vec<String>,
    pub parallel_jobs: Option<usize>,
    pub strict: bool,
    pub ignore_external: bool,
    /// External extractor; the scanned directory is appended as the last argument.
    pub parser_command: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            libraries: Vec::new(),
            pages_dir: PathBuf::from("src/pages"),
            modules_dir: PathBuf::from("src/pages/docs/modules"),
            modules_site_path: "docs/modules".to_string(),
            index_file: PathBuf::from("src/data/docIndex.json"),
            library_description_file: PathBuf::from("src/data/libraryDescription.json"),
            include_pattern: "*.js".to_string(),
            excluded_dirs: owned(DEFAULT_EXCLUDED_DIRS),
            link_exceptions: vec!["spotlight/Spotlight".to_string()],
            allowed_error_tags: owned(DEFAULT_ALLOWED_ERROR_TAGS),
            stripped_keys: owned(DEFAULT_STRIPPED_KEYS),
            parallel_jobs: None,
            strict: false,
            ignore_external: false,
            parser_command: owned(&["documentation", "build", "--shallow", "--format", "json"]),
        }
    }
}

impl BuildConfig {
    /// Loads defaults, then `path` (if given), then `DOCWEAVE_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, BuildError> {
        let mut builder = Config::builder().add_source(Config::try_from(&BuildConfig::default())?);

        if let Some(path) = path {
            if !path.exists() {
                return Err(BuildError::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(Environment::with_prefix("DOCWEAVE").try_parsing(true))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Number of directories parsed concurrently.
    pub fn jobs(&self) -> usize {
        self.parallel_jobs
            .filter(|jobs| *jobs > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4)
            })
    }
}

/// How to read one library root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocsConfig {
    pub path: PathBuf,
    /// Libraries live under `packages/`.
    pub has_package_dir: bool,
    pub has_config: bool,
    /// Whether sources are scanned for doclets at all.
    pub parse_source: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Any other keys, passed through to the library description artifact.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DocsConfig {
    pub const CONFIG_FILE: &'static str = "docs/config.json";

    /// Defaults derived from the directory layout alone.
    pub fn defaults(path: &Path) -> Self {
        let display = path.to_string_lossy();
        Self {
            path: path.to_path_buf(),
            has_package_dir: path.join("packages").is_dir(),
            has_config: path.join(Self::CONFIG_FILE).is_file(),
            parse_source: !display.contains("/cli") && !display.contains("eslint"),
            description: None,
            extra: Map::new(),
        }
    }

    /// Reads `docs/config.json` over the defaults.
    ///
    /// An unreadable config yields the defaults (with `has_config` cleared)
    /// together with the error, so the caller can report it and carry on.
    pub fn load(path: &Path) -> (Self, Option<BuildError>) {
        let mut config = Self::defaults(path);
        if !config.has_config {
            return (config, None);
        }

        let file = path.join(Self::CONFIG_FILE);
        let overrides = std::fs::read_to_string(&file)
            .map_err(|err| BuildError::io(&file, err))
            .and_then(|text| {
                serde_json::from_str::<Map<String, Value>>(&text)
                    .map_err(|err| BuildError::json(&file, err))
            });

        match overrides {
            Ok(overrides) => {
                debug!("Loaded {}", file.display());
                config.apply(overrides);
                (config, None)
            }
            Err(err) => {
                warn!("Error loading {}, using default config", file.display());
                config.has_config = false;
                (config, Some(err))
            }
        }
    }

    fn apply(&mut self, overrides: Map<String, Value>) {
        for (key, value) in overrides {
            match (key.as_str(), &value) {
                ("hasPackageDir", Value::Bool(flag)) => self.has_package_dir = *flag,
                ("parseSource", Value::Bool(flag)) => self.parse_source = *flag,
                ("description", Value::String(text)) => self.description = Some(text.clone()),
                ("path", Value::String(text)) => self.path = PathBuf::from(text),
                _ => {
                    self.extra.insert(key, value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_build_config_defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.include_pattern, "*.js");
        assert!(config.excluded_dirs.contains(&"node_modules".to_string()));
        assert!(config.stripped_keys.contains(&"errors".to_string()));
        assert!(!config.strict);
        assert!(config.jobs() > 0);
    }

    #[test]
    fn test_build_config_file_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("docweave.toml");
        fs::write(
            &file,
            "strict = true\nlink_exceptions = []\nlibraries = [\"raw/ui\"]\nparallel_jobs = 3\n",
        )
        .unwrap();

        let config = BuildConfig::load(Some(&file)).unwrap();
        assert!(config.strict);
        assert!(config.link_exceptions.is_empty());
        assert_eq!(config.libraries, vec![PathBuf::from("raw/ui")]);
        assert_eq!(config.jobs(), 3);
        assert_eq!(config.include_pattern, "*.js");
    }

    #[test]
    fn test_build_config_missing_file_is_error() {
        assert!(BuildConfig::load(Some(Path::new("/nope/docweave.toml"))).is_err());
    }

    #[test]
    fn test_docs_config_merges_overrides() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("docs")).unwrap();
        fs::create_dir_all(temp.path().join("packages")).unwrap();
        fs::write(
            temp.path().join("docs/config.json"),
            r#"{"description": "Core widgets", "icon": "ui.svg", "parseSource": false}"#,
        )
        .unwrap();

        let (config, err) = DocsConfig::load(temp.path());
        assert!(err.is_none());
        assert!(config.has_config);
        assert!(config.has_package_dir);
        assert!(!config.parse_source);
        assert_eq!(config.description.as_deref(), Some("Core widgets"));
        assert_eq!(config.extra["icon"], "ui.svg");
    }

    #[test]
    fn test_docs_config_bad_json_falls_back() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("docs")).unwrap();
        fs::write(temp.path().join("docs/config.json"), "{not json").unwrap();

        let (config, err) = DocsConfig::load(temp.path());
        assert!(err.is_some());
        assert!(!config.has_config);
        assert!(config.parse_source);
    }

    #[test]
    fn test_cli_and_eslint_roots_skip_sources() {
        assert!(!DocsConfig::defaults(Path::new("raw/cli")).parse_source);
        assert!(!DocsConfig::defaults(Path::new("raw/eslint-config-enact")).parse_source);
        assert!(DocsConfig::defaults(Path::new("raw/ui")).parse_source);
    }
}
