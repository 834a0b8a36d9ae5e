use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;

use docweave::error::EXIT_FAILURE;
use docweave::{BuildConfig, CommandParser, DocBuilder, ExitStatus};

#[derive(Parser)]
#[command(
    name = "docweave",
    version,
    about = "Validate doc-comment records across libraries and build the site search index"
)]
struct Cli {
    /// Run configuration file (toml, json or yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate one source tree without writing anything
    Scan {
        /// Root to scan
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// Base-name glob of candidate source files
        #[arg(long)]
        pattern: Option<String>,

        /// Exit non-zero when findings are reported
        #[arg(long)]
        strict: bool,
    },
    /// Ingest every configured library, then write descriptions and the index
    Build(BuildArgs),
    /// Build the search index from previously persisted docs
    Index,
    /// Write the library description artifact only
    Describe,
}

#[derive(Args)]
struct BuildArgs {
    /// Library roots, in addition to the configured ones
    libraries: Vec<PathBuf>,

    #[arg(long)]
    strict: bool,

    /// Do not report references into libraries that were not scanned
    #[arg(long)]
    ignore_external: bool,

    /// Validate only, without persisting module docs
    #[arg(long)]
    no_save: bool,

    /// Number of directories parsed concurrently
    #[arg(short, long)]
    jobs: Option<usize>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(cli).await {
        Ok(status) => std::process::exit(status.code()),
        Err(err) => {
            error!("{:#}", err);
            std::process::exit(EXIT_FAILURE);
        }
    }
}

async fn run(cli: Cli) -> Result<ExitStatus> {
    let mut config = BuildConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Scan {
            path,
            pattern,
            strict,
        } => {
            if let Some(pattern) = pattern {
                config.include_pattern = pattern;
            }
            config.strict |= strict;

            let parser = CommandParser::new(&config.parser_command)?;
            let mut builder = DocBuilder::new(config, parser)?;
            builder.disable_save();

            let dirs = builder.discover(&path)?;
            builder.ingest(dirs).await?;
            builder.resolve(true);

            builder.stats().log_summary();
            Ok(builder.status())
        }
        Commands::Build(args) => {
            config.libraries.extend(args.libraries);
            config.strict |= args.strict;
            config.ignore_external |= args.ignore_external;
            if args.jobs.is_some() {
                config.parallel_jobs = args.jobs;
            }
            let ignore_external = config.ignore_external;
            let libraries = config.libraries.clone();

            let parser = CommandParser::new(&config.parser_command)?;
            let mut builder = DocBuilder::new(config, parser)?;
            if args.no_save {
                builder.disable_save();
            }

            let docs_configs = builder.load_docs_configs(&libraries);
            builder.ingest_libraries(&docs_configs).await?;
            builder.resolve(ignore_external);

            if !args.no_save {
                let descriptions = builder.describe(&docs_configs)?;
                info!("Described {} libraries", descriptions.len());
                let report = builder.index()?;
                info!("Index holds {} documents", report.records + report.pages);
            }

            builder.stats().log_summary();
            Ok(builder.status())
        }
        Commands::Index => {
            let mut builder = DocBuilder::new(config, ())?;
            builder.index()?;
            Ok(builder.status())
        }
        Commands::Describe => {
            let libraries = config.libraries.clone();
            let mut builder = DocBuilder::new(config, ())?;
            let docs_configs = builder.load_docs_configs(&libraries);
            builder.describe(&docs_configs)?;
            Ok(builder.status())
        }
    }
}
