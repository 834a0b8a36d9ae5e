//! Docweave
//!
//! Validates documentation records extracted from many libraries, checks
//! their cross-references once every library has been read, and builds the
//! search index and library descriptions for a documentation site.

pub mod builder;
pub mod config;
pub mod doclet;
pub mod error;
pub mod library;
pub mod matching;
pub mod persist;
pub mod registry;
pub mod search;
pub mod validation;

pub use builder::{BuildStats, CommandParser, DocBuilder, DocParser, JsonFileParser};
pub use config::{BuildConfig, DocsConfig};
pub use doclet::{Doclet, Location};
pub use error::BuildError;
pub use library::{LibraryDescription, LibraryDescriptions};
pub use persist::DocWriter;
pub use registry::{ReferenceCitation, SharedRegistry, SymbolRegistry};
pub use search::{ElasticlunrIndex, IndexBuilder, IndexReport, Projector, SearchDocument};
pub use validation::{
    ExitStatus, FindingKind, Findings, RecordValidator, Resolver, ValidationFinding,
    ValidationSeverity,
};
