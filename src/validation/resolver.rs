//! Whole-corpus reference and link resolution.
//!
//! Runs once, after every directory has been ingested. References are often
//! forward (a module citing a member of a library scanned later), so nothing
//! here may run before the registry is complete.

use lazy_static::lazy_static;
use regex::Regex;

use crate::registry::{library_of, SymbolRegistry};
use crate::validation::{FindingKind, Findings, ValidationFinding};

/// Classifies link text as `library/Module` with an optional `.member`.
///
/// Group 1 is the whole match, group 2 the `library/Module` pair and group 3
/// the member suffix. Word characters are ASCII only.
pub const LINK_PATTERN: &str = r"^(([[:word:]]+/[[:word:]]+)(\.[[:word:]]+)?)";

lazy_static! {
    static ref LINK_REGEX: Regex = Regex::new(LINK_PATTERN).expect("link pattern is valid");
}

/// Resolves the deferred references and links held in a registry.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    ignore_external: bool,
    link_exceptions: Vec<String>,
}

impl Resolver {
    pub fn new(ignore_external: bool, link_exceptions: Vec<String>) -> Self {
        Self {
            ignore_external,
            link_exceptions,
        }
    }

    /// Whether a name belongs to a library that was never scanned and should
    /// therefore be left alone.
    fn is_ignored_external(&self, registry: &SymbolRegistry, name: &str) -> bool {
        self.ignore_external && !registry.has_library(library_of(name))
    }

    pub fn resolve(&self, registry: &SymbolRegistry) -> Findings {
        let mut findings = Findings::new();
        self.resolve_references(registry, &mut findings);
        self.resolve_links(registry, &mut findings);
        findings
    }

    fn resolve_references(&self, registry: &SymbolRegistry, findings: &mut Findings) {
        for (target, citations) in registry.references() {
            if self.is_ignored_external(registry, target) || registry.has_static(target) {
                continue;
            }
            let related = citations
                .iter()
                .map(|citation| {
                    format!(
                        "type: {} - {} in {}",
                        citation.kind, citation.name, citation.location
                    )
                })
                .collect();
            findings.record(
                ValidationFinding::new(
                    FindingKind::InvalidReference,
                    format!("Invalid reference: {}:", target),
                )
                .with_related(related),
            );
        }
    }

    fn resolve_links(&self, registry: &SymbolRegistry, findings: &mut Findings) {
        for (link, citing) in registry.links() {
            if self.is_ignored_external(registry, link) {
                continue;
            }
            let Some(captures) = LINK_REGEX.captures(link) else {
                continue;
            };
            let module = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
            if self.link_exceptions.iter().any(|exception| exception == module) {
                continue;
            }

            let matched = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            let resolved = if captures.get(3).is_some() {
                registry.has_static(matched)
            } else {
                registry.has_module(matched)
            };

            if !resolved {
                findings.record(
                    ValidationFinding::new(
                        FindingKind::InvalidLink,
                        format!("Invalid link: {}:", link),
                    )
                    .with_related(citing.iter().map(|m| format!("Used in: {}", m)).collect()),
                );
            }
        }
    }
}
