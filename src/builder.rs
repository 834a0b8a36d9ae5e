use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::{BuildConfig, DocsConfig};
use crate::doclet::Doclet;
use crate::error::BuildError;
use crate::library::{self, LibraryDescriptions};
use crate::matching::{component_directory, SourceFilter};
use crate::persist::DocWriter;
use crate::registry::{SharedRegistry, SymbolRegistry};
use crate::search::{IndexBuilder, IndexReport, ElasticlunrIndex, Projector};
use crate::validation::{
    ExitStatus, FindingKind, Findings, RecordValidator, Resolver, ValidationFinding,
};

/// Extracts the doclets of one source directory.
pub trait DocParser: Send + Sync + 'static {
    fn parse(&self, dir: &Path) -> impl Future<Output = Result<Vec<Doclet>, BuildError>> + Send;
}

/// Runs an external extraction command with the directory as its last
/// argument and reads doclet JSON from its stdout.
#[derive(Debug, Clone)]
pub struct CommandParser {
    program: String,
    args: Vec<String>,
}

impl CommandParser {
    pub fn new(command: &[String]) -> Result<Self, BuildError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| BuildError::Config("parser_command is empty".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl DocParser for CommandParser {
    async fn parse(&self, dir: &Path) -> Result<Vec<Doclet>, BuildError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(dir)
            .output()
            .await
            .map_err(|err| {
                BuildError::Environment(format!("Unable to run {}: {}", self.program, err))
            })?;

        if !output.status.success() {
            return Err(BuildError::parse(
                dir,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        serde_json::from_slice(&output.stdout).map_err(|err| BuildError::parse(dir, err.to_string()))
    }
}

/// Loads doclets that were extracted ahead of time into a file inside each
/// directory.
#[derive(Debug, Clone)]
pub struct JsonFileParser {
    file_name: String,
}

impl JsonFileParser {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

impl DocParser for JsonFileParser {
    async fn parse(&self, dir: &Path) -> Result<Vec<Doclet>, BuildError> {
        let path = dir.join(&self.file_name);
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| BuildError::parse(&path, err.to_string()))?;
        serde_json::from_str(&text).map_err(|err| BuildError::parse(&path, err.to_string()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    pub directories_processed: usize,
    /// Directories whose parser returned no doclets.
    pub directories_skipped: usize,
    pub item_failures: usize,
    pub modules: usize,
    pub statics: usize,
    pub findings: usize,
    pub build_time: Duration,
}

/// Drives one run: ingestion, resolution, library descriptions and the
/// search index.
pub struct DocBuilder<P> {
    config: BuildConfig,
    parser: Arc<P>,
    registry: SharedRegistry,
    filter: SourceFilter,
    writer: Option<DocWriter>,
    parallel_jobs: usize,
    findings: Findings,
    stats: BuildStats,
}

impl<P> DocBuilder<P> {
    /// `parser` is only used by ingestion; a `DocBuilder<()>` can resolve,
    /// describe and index without one.
    pub fn new(config: BuildConfig, parser: P) -> Result<Self> {
        let filter = SourceFilter::new(&config.include_pattern, config.excluded_dirs.clone())?;
        let writer = DocWriter::new(
            &config.modules_dir,
            config.stripped_keys.clone(),
            config.allowed_error_tags.clone(),
        );
        let parallel_jobs = config.jobs();

        Ok(Self {
            config,
            parser: Arc::new(parser),
            registry: SymbolRegistry::shared(),
            filter,
            writer: Some(writer),
            parallel_jobs,
            findings: Findings::new(),
            stats: BuildStats::default(),
        })
    }

    /// Validate only; nothing is written and parser errors are not reported.
    pub fn disable_save(&mut self) {
        self.writer = None;
    }

    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    pub fn findings(&self) -> &Findings {
        &self.findings
    }

    /// Source directories below `root` that hold documented modules.
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let dirs = self
            .filter
            .module_dirs(root)
            .with_context(|| format!("Failed to discover sources in {}", root.display()))?;
        debug!("Discovered {} module directories in {}", dirs.len(), root.display());
        Ok(dirs.into_iter().collect())
    }

    /// Reads the docs config of every library root.
    ///
    /// Unreadable configs are reported as findings and replaced by defaults.
    pub fn load_docs_configs(&mut self, roots: &[PathBuf]) -> Vec<DocsConfig> {
        roots
            .iter()
            .map(|root| {
                let (config, err) = DocsConfig::load(root);
                if let Some(err) = err {
                    self.findings.record(
                        ValidationFinding::new(
                            FindingKind::DocsConfig,
                            format!("{:#}", anyhow::Error::new(err)),
                        ),
                    );
                }
                config
            })
            .collect()
    }

    /// Resolves references and links over everything ingested so far.
    pub fn resolve(&mut self, ignore_external: bool) -> usize {
        let resolver = Resolver::new(ignore_external, self.config.link_exceptions.clone());
        let findings = {
            let registry = self.registry.lock();
            resolver.resolve(&registry)
        };
        let count = findings.len();
        self.findings.absorb(findings);
        count
    }

    /// Writes the library description artifact for `libraries`.
    pub fn describe(&mut self, libraries: &[DocsConfig]) -> Result<LibraryDescriptions> {
        let mut descriptions = LibraryDescriptions::new();
        for library in libraries {
            let described =
                library::describe_libraries(library, self.config.strict, &mut self.findings)
                    .with_context(|| {
                        format!("Failed to describe libraries in {}", library.path.display())
                    })?;
            descriptions.extend(described);
        }
        library::save_descriptions(&self.config.library_description_file, &descriptions)?;
        Ok(descriptions)
    }

    /// Builds the search index from persisted module docs and site pages.
    pub fn index(&mut self) -> Result<IndexReport> {
        let start_time = Instant::now();
        let projector = Projector::new(
            &self.config.modules_dir,
            &self.config.pages_dir,
            &self.config.modules_site_path,
        );
        let mut index = ElasticlunrIndex::for_docs();
        let report = projector.build_index(&mut index)?;
        self.stats.item_failures += report.failures;

        save_index(&index, &self.config.index_file)?;
        self.stats.build_time += start_time.elapsed();
        Ok(report)
    }

    pub fn stats(&self) -> BuildStats {
        let registry = self.registry.lock();
        BuildStats {
            modules: registry.module_count(),
            statics: registry.static_count(),
            findings: self.findings.len(),
            ..self.stats.clone()
        }
    }

    pub fn status(&self) -> ExitStatus {
        ExitStatus::from_run(
            self.findings.len(),
            self.stats.item_failures,
            self.config.strict,
        )
    }
}

impl<P: DocParser> DocBuilder<P> {
    /// Ingests every library whose sources are meant to be parsed.
    pub async fn ingest_libraries(&mut self, libraries: &[DocsConfig]) -> Result<()> {
        let mut dirs = Vec::new();
        for library in libraries {
            if !library.parse_source {
                info!("Skipping sources of {}", library.path.display());
                continue;
            }
            dirs.extend(self.discover(&library.path)?);
        }
        self.ingest(dirs).await
    }

    /// Parses and validates `dirs` concurrently, then waits for all of them.
    ///
    /// A directory that cannot be processed is logged and counted; an
    /// environment failure aborts the remaining directories.
    pub async fn ingest(&mut self, dirs: Vec<PathBuf>) -> Result<()> {
        let start_time = Instant::now();
        info!(
            "Processing {} directories with {} parallel jobs",
            dirs.len(),
            self.parallel_jobs
        );

        let semaphore = Arc::new(Semaphore::new(self.parallel_jobs.max(1)));
        let mut tasks = JoinSet::new();

        for dir in dirs {
            let parser = Arc::clone(&self.parser);
            let registry = Arc::clone(&self.registry);
            let writer = self.writer.clone();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        process_directory(parser.as_ref(), &dir, &registry, writer.as_ref()).await
                    }
                    Err(err) => Err(BuildError::Environment(err.to_string())),
                };
                (dir, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (dir, outcome) = joined.context("Ingestion task failed")?;
            match outcome {
                Ok(Some(findings)) => {
                    self.stats.directories_processed += 1;
                    self.findings.absorb(findings);
                }
                Ok(None) => {
                    debug!("No doclets in {}", dir.display());
                    self.stats.directories_skipped += 1;
                }
                Err(err) if err.is_fatal() => {
                    tasks.abort_all();
                    return Err(anyhow::Error::new(err)
                        .context(format!("Unable to process {}", dir.display())));
                }
                Err(err) => {
                    error!("{}", err);
                    self.stats.item_failures += 1;
                }
            }
        }

        self.stats.build_time += start_time.elapsed();
        let registry = self.registry.lock();
        info!(
            "Ingested {} modules and {} static members",
            registry.module_count(),
            registry.static_count()
        );
        Ok(())
    }
}

/// Parses, validates and (optionally) persists one directory.
///
/// Returns `None` when the parser found nothing to document.
async fn process_directory<P: DocParser>(
    parser: &P,
    dir: &Path,
    registry: &SharedRegistry,
    writer: Option<&DocWriter>,
) -> Result<Option<Findings>, BuildError> {
    let component = component_directory(dir);
    let docs = parser.parse(dir).await?;
    if docs.is_empty() {
        return Ok(None);
    }

    let mut findings = Findings::new();
    {
        let mut registry = registry.lock();
        RecordValidator::new(&component).validate(&docs, &mut registry, &mut findings);
    }

    if let Some(writer) = writer {
        writer.report_parse_errors(&docs, dir, &mut findings);
        writer.write(&component, &docs).await?;
    }
    Ok(Some(findings))
}

/// Writes an index as JSON, creating parent directories.
pub fn save_index<I: IndexBuilder>(index: &I, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
    }
    std::fs::write(path, index.to_json())
        .with_context(|| format!("Failed to write search index: {}", path.display()))?;
    info!("Wrote search index to {}", path.display());
    Ok(())
}

impl BuildStats {
    pub fn log_summary(&self) {
        info!(
            "Processed {} directories ({} empty, {} failed) in {:.2?}",
            self.directories_processed,
            self.directories_skipped,
            self.item_failures,
            self.build_time
        );
        if self.findings > 0 {
            warn!("{} validation findings", self.findings);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn config_in(temp: &TempDir) -> BuildConfig {
        BuildConfig {
            modules_dir: temp.path().join("out/modules"),
            pages_dir: temp.path().join("out"),
            index_file: temp.path().join("data/docIndex.json"),
            library_description_file: temp.path().join("data/libraryDescription.json"),
            parallel_jobs: Some(2),
            ..BuildConfig::default()
        }
    }

    fn module_json(name: &str) -> serde_json::Value {
        json!([{
            "name": name,
            "kind": "module",
            "path": [{"name": name, "kind": "module"}],
            "context": {"file": format!("{}/index.js", name), "loc": {"start": {"line": 1, "column": 0}}},
            "members": {"static": [], "instance": []},
            "errors": [{"message": "unknown tag @ui", "commentLineNumber": 2}]
        }])
    }

    #[test]
    fn test_command_parser_requires_program() {
        assert!(CommandParser::new(&[]).is_err());
        assert!(CommandParser::new(&["documentation".to_string()]).is_ok());
    }

    #[tokio::test]
    async fn test_ingest_with_json_file_parser() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("raw/ui/Button");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("doclets.json"), module_json("ui/Button").to_string()).unwrap();
        let broken = temp.path().join("raw/ui/Broken");
        fs::create_dir_all(&broken).unwrap();

        let config = config_in(&temp);
        let mut builder = DocBuilder::new(config.clone(), JsonFileParser::new("doclets.json")).unwrap();
        builder.ingest(vec![source, broken]).await.unwrap();

        let stats = builder.stats();
        assert_eq!(stats.directories_processed, 1);
        assert_eq!(stats.item_failures, 1);
        assert_eq!(stats.modules, 1);
        assert!(builder.findings().is_empty());
        assert_eq!(builder.status(), ExitStatus::ItemFailures);

        let written = config.modules_dir.join("ui/Button/index.json");
        let persisted: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(written).unwrap()).unwrap();
        assert!(persisted[0].get("errors").is_none());
        assert!(persisted[0].get("path").is_none());
        assert_eq!(persisted[0]["name"], "ui/Button");
    }

    #[tokio::test]
    async fn test_disabled_save_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("raw/ui/Button");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("doclets.json"), module_json("ui/Button").to_string()).unwrap();

        let config = config_in(&temp);
        let mut builder = DocBuilder::new(config.clone(), JsonFileParser::new("doclets.json")).unwrap();
        builder.disable_save();
        builder.ingest(vec![source]).await.unwrap();

        assert!(!config.modules_dir.exists());
        assert!(builder.registry().lock().has_module("ui/Button"));
        assert_eq!(builder.status(), ExitStatus::Success);
    }

    #[test]
    fn test_save_index_creates_parent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data/nested/docIndex.json");
        save_index(&ElasticlunrIndex::for_docs(), &path).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["ref"], "id");
    }
}
