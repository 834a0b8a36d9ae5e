//! Error types for the ingestion and indexing pipeline.
//!
//! Validation problems are *not* errors: they are collected as
//! [`ValidationFinding`](crate::validation::ValidationFinding)s. The variants
//! here cover the two remaining classes, per-item failures (one directory or
//! one page could not be processed) and environment failures that stop the
//! whole run.

use std::path::PathBuf;

use thiserror::Error;

/// Process exit code used for environment failures and unprocessable items.
pub const EXIT_FAILURE: i32 = 2;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Environment(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unable to process {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("error projecting {path}: {message}")]
    Projection { path: PathBuf, message: String },
}

impl BuildError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        BuildError::Json {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        BuildError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn projection(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        BuildError::Projection {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error must stop the run instead of skipping one item.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, BuildError::Parse { .. } | BuildError::Projection { .. })
    }
}

impl From<config::ConfigError> for BuildError {
    fn from(err: config::ConfigError) -> Self {
        BuildError::Config(err.to_string())
    }
}
