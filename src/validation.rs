//! Doc-record validation.
//!
//! Validation runs in two phases. [`RecordValidator`] checks each record as
//! its directory is ingested and fills the
//! [`SymbolRegistry`](crate::registry::SymbolRegistry); once every directory
//! has been ingested, [`Resolver`] checks the deferred references and links
//! against the complete registry. Both phases report problems as
//! [`ValidationFinding`]s, which are collected rather than raised.

pub mod record_validator;
pub mod resolver;

use std::fmt;

use serde::Serialize;

use crate::doclet::Location;
use crate::error::EXIT_FAILURE;

pub use record_validator::RecordValidator;
pub use resolver::{Resolver, LINK_PATTERN};

/// Represents the severity level of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationSeverity::Info => write!(f, "info"),
            ValidationSeverity::Warning => write!(f, "warning"),
            ValidationSeverity::Error => write!(f, "error"),
        }
    }
}

/// What a finding is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    TooManyDoclets,
    NotAModule,
    ModuleNameMismatch,
    DuplicateMember,
    InvalidSee,
    InvalidReference,
    InvalidLink,
    ParseError,
    DescriptionExtraction,
    PackageManifest,
    DocsConfig,
}

impl FindingKind {
    pub fn severity(self) -> ValidationSeverity {
        match self {
            FindingKind::InvalidSee | FindingKind::TooManyDoclets => ValidationSeverity::Warning,
            FindingKind::PackageManifest | FindingKind::DocsConfig => ValidationSeverity::Warning,
            _ => ValidationSeverity::Error,
        }
    }
}

/// A recoverable problem found while validating or resolving.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationFinding {
    pub kind: FindingKind,
    pub severity: ValidationSeverity,
    pub message: String,
    pub location: Option<Location>,
    /// Secondary lines, e.g. every place a broken reference is cited.
    pub related: Vec<String>,
}

impl ValidationFinding {
    pub fn new(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message: message.into(),
            location: None,
            related: Vec::new(),
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_related(mut self, related: Vec<String>) -> Self {
        self.related = related;
        self
    }
}

impl fmt::Display for ValidationFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for line in &self.related {
            write!(f, "\n    {}", line)?;
        }
        Ok(())
    }
}

/// Accumulates findings, logging each one as it is recorded.
#[derive(Debug, Default, Clone)]
pub struct Findings {
    items: Vec<ValidationFinding>,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, finding: ValidationFinding) {
        log::warn!("{}", finding);
        self.items.push(finding);
    }

    /// Takes over findings that were already logged where they were recorded.
    pub fn absorb(&mut self, other: Findings) {
        self.items.extend(other.items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.items.iter()
    }

    pub fn count(&self, kind: FindingKind) -> usize {
        self.items.iter().filter(|f| f.kind == kind).count()
    }
}

/// How a run ended, ordered by precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExitStatus {
    Success,
    /// Findings were reported during a strict run.
    Findings,
    /// Some directories, records or pages could not be processed.
    ItemFailures,
}

impl ExitStatus {
    pub fn from_run(findings: usize, item_failures: usize, strict: bool) -> Self {
        if item_failures > 0 {
            ExitStatus::ItemFailures
        } else if strict && findings > 0 {
            ExitStatus::Findings
        } else {
            ExitStatus::Success
        }
    }

    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Findings => 1,
            ExitStatus::ItemFailures => EXIT_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finding_display_includes_related_lines() {
        let finding = ValidationFinding::new(FindingKind::InvalidLink, "Invalid link: ui/Gone:")
            .with_related(vec!["Used in: ui/Button".to_string()]);
        assert_eq!(
            finding.to_string(),
            "Invalid link: ui/Gone:\n    Used in: ui/Button"
        );
        assert_eq!(finding.severity, ValidationSeverity::Error);
    }

    #[test]
    fn test_findings_count_by_kind() {
        let mut findings = Findings::new();
        findings.record(ValidationFinding::new(FindingKind::InvalidSee, "a"));
        findings.record(ValidationFinding::new(FindingKind::InvalidSee, "b"));
        findings.record(ValidationFinding::new(FindingKind::DuplicateMember, "c"));
        assert_eq!(findings.len(), 3);
        assert_eq!(findings.count(FindingKind::InvalidSee), 2);
    }

    #[test]
    fn test_exit_status_precedence() {
        assert_eq!(ExitStatus::from_run(3, 0, false).code(), 0);
        assert_eq!(ExitStatus::from_run(3, 0, true).code(), 1);
        assert_eq!(ExitStatus::from_run(0, 1, false).code(), 2);
        assert_eq!(ExitStatus::from_run(5, 1, true).code(), 2);
        assert_eq!(ExitStatus::from_run(0, 0, true), ExitStatus::Success);
    }
}
