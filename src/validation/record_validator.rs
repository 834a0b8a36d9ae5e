//! Per-directory doc-record validation
//!
//! Checks one directory's record set as soon as the parser returns it and
//! registers what it finds in the shared registry. References and links are
//! only harvested here; they are resolved later by the resolver once every
//! library has been scanned.

use std::collections::HashMap;

use log::debug;
use serde_json::Value;

use crate::doclet::{descendants, link_urls, Doclet, Location};
use crate::registry::{ReferenceCitation, SymbolRegistry};
use crate::validation::{FindingKind, Findings, ValidationFinding};

/// Tags whose target is a symbol that must exist somewhere in the corpus.
const REFERENCE_TAGS: &[&str] = &["extends", "mixes"];

/// Validates the record set of one scanned directory.
#[derive(Debug, Clone)]
pub struct RecordValidator {
    expected_module: String,
}

impl RecordValidator {
    /// `expected_module` is the module name implied by the directory layout.
    pub fn new(expected_module: impl Into<String>) -> Self {
        Self {
            expected_module: expected_module.into(),
        }
    }

    /// Validates `docs`, registering its module and statics.
    ///
    /// Returns the identity the module was registered under, or `None` when
    /// the directory produced no records.
    pub fn validate(
        &self,
        docs: &[Doclet],
        registry: &mut SymbolRegistry,
        findings: &mut Findings,
    ) -> Option<String> {
        let first = docs.first()?;

        if docs.len() > 1 {
            findings.record(
                ValidationFinding::new(
                    FindingKind::TooManyDoclets,
                    format!("Too many doclets ({}):", docs.len()),
                )
                .at(first.location())
                .with_related(docs.iter().map(Doclet::display_position).collect()),
            );
        }

        let identity = self.check_module_identity(first, findings);

        self.check_statics(first, &identity, registry, findings);

        match serde_json::to_value(first) {
            Ok(tree) => {
                check_sees(&tree, findings);
                for url in link_urls(&tree) {
                    registry.add_link(url, &identity);
                }
            }
            Err(err) => findings.record(
                ValidationFinding::new(
                    FindingKind::DescriptionExtraction,
                    format!("Unable to inspect {}: {}", identity, err),
                )
                .at(first.location()),
            ),
        }

        registry.register_module(&identity);
        debug!("Validated module {}", identity);
        Some(identity)
    }

    /// Rule: the first record must be the module matching its directory.
    fn check_module_identity(&self, first: &Doclet, findings: &mut Findings) -> String {
        let declared = first
            .name
            .clone()
            .unwrap_or_else(|| self.expected_module.clone());

        match first.root_segment() {
            Some(segment) if segment.kind.as_deref() == Some("module") => {
                if segment.name != self.expected_module {
                    findings.record(
                        ValidationFinding::new(
                            FindingKind::ModuleNameMismatch,
                            format!(
                                "Module name ({}) does not match path: {} in {}",
                                segment.name,
                                self.expected_module,
                                first.display_position()
                            ),
                        )
                        .at(first.location()),
                    );
                    return self.expected_module.clone();
                }
                declared
            }
            Some(segment) => {
                findings.record(
                    ValidationFinding::new(
                        FindingKind::NotAModule,
                        format!(
                            "First item not a module: {} ({}) in {}",
                            segment.name,
                            segment.kind.as_deref().unwrap_or("unknown"),
                            first.display_position()
                        ),
                    )
                    .at(first.location()),
                );
                declared
            }
            None => {
                findings.record(
                    ValidationFinding::new(
                        FindingKind::NotAModule,
                        format!(
                            "First item not a module: record has no path in {}",
                            first.display_position()
                        ),
                    )
                    .at(first.location()),
                );
                declared
            }
        }
    }

    /// Rule: static member names are unique; also harvests references.
    fn check_statics(
        &self,
        first: &Doclet,
        identity: &str,
        registry: &mut SymbolRegistry,
        findings: &mut Findings,
    ) {
        let mut uniques: HashMap<&str, &Doclet> = HashMap::new();

        for member in first.static_members() {
            let Some(name) = member.name.as_deref() else {
                debug!("Skipping unnamed static member at {}", member.location());
                continue;
            };

            if let Some(original) = uniques.get(name) {
                findings.record(
                    ValidationFinding::new(
                        FindingKind::DuplicateMember,
                        format!(
                            "Duplicate module member {}, original: {}",
                            member.display_position(),
                            original.display_position()
                        ),
                    )
                    .at(member.location()),
                );
            } else {
                uniques.insert(name, member);
                let owner = match member.memberof.as_deref() {
                    Some(memberof) if Some(memberof) != first.name.as_deref() => memberof,
                    _ => identity,
                };
                registry.register_static(format!("{}.{}", owner, name));
            }

            for tag in member.tags() {
                if !REFERENCE_TAGS.contains(&tag.title.as_str()) {
                    continue;
                }
                if let Some(target) = tag.name.as_deref() {
                    registry.add_reference(
                        target,
                        ReferenceCitation {
                            kind: tag.title.clone(),
                            name: name.to_string(),
                            location: member.location(),
                        },
                    );
                }
            }
        }
    }
}

/// Rule: an `@see` must carry an inline link or a URL.
///
/// Every object in the record tree that carries tags is checked, not only
/// member doclets; the location is that object's own source file.
fn check_sees(tree: &Value, findings: &mut Findings) {
    for owner in descendants(tree) {
        let Some(tags) = owner.get("tags").and_then(Value::as_array) else {
            continue;
        };
        let file = owner
            .pointer("/context/file")
            .and_then(Value::as_str)
            .unwrap_or("<unknown>");

        for tag in tags {
            if tag.get("title").and_then(Value::as_str) != Some("see") {
                continue;
            }
            let description = tag
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if is_valid_see(description) {
                continue;
            }
            let location = Location::new(file, tag.get("lineNumber").and_then(Value::as_u64));
            findings.record(
                ValidationFinding::new(
                    FindingKind::InvalidSee,
                    format!("Potentially invalid @see '{}' at {}", description, location),
                )
                .at(location),
            );
        }
    }
}

fn is_valid_see(description: &str) -> bool {
    description.contains("{@link") || description.contains("http")
}
