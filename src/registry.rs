//! Cross-reference registry.
//!
//! Accumulates every module, static member, library, `@extends`/`@mixes`
//! reference and link seen while ingesting one run. Ingestion only adds;
//! resolution only reads. All collections are ordered sets/maps so that
//! reports do not depend on the order directories were scanned in.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::doclet::Location;

/// Registry shared between concurrent ingestion tasks.
pub type SharedRegistry = Arc<Mutex<SymbolRegistry>>;

/// One citation of a referenced symbol.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ReferenceCitation {
    /// Tag that produced the reference (`extends` or `mixes`).
    pub kind: String,
    /// Name of the member carrying the tag.
    pub name: String,
    pub location: Location,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct SymbolRegistry {
    statics: BTreeSet<String>,
    modules: BTreeSet<String>,
    libraries: BTreeSet<String>,
    refs: BTreeMap<String, Vec<ReferenceCitation>>,
    links: BTreeMap<String, Vec<String>>,
}

/// The library a qualified name belongs to: its first `/` segment.
pub fn library_of(name: &str) -> &str {
    name.split('/').next().unwrap_or(name)
}

impl SymbolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRegistry {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Adds `memberof.name`; returns `false` if it was already present.
    pub fn register_static(&mut self, qualified: impl Into<String>) -> bool {
        self.statics.insert(qualified.into())
    }

    /// Records a module and marks its library as scanned.
    pub fn register_module(&mut self, name: &str) {
        self.libraries.insert(library_of(name).to_string());
        self.modules.insert(name.to_string());
    }

    pub fn add_reference(&mut self, target: impl Into<String>, citation: ReferenceCitation) {
        let citations = self.refs.entry(target.into()).or_default();
        citations.push(citation);
    }

    /// Records that `module` cites `link`. A module is listed once per link.
    pub fn add_link(&mut self, link: impl Into<String>, module: &str) {
        let citing = self.links.entry(link.into()).or_default();
        if !citing.iter().any(|m| m == module) {
            citing.push(module.to_string());
        }
    }

    pub fn has_static(&self, qualified: &str) -> bool {
        self.statics.contains(qualified)
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.modules.contains(name)
    }

    pub fn has_library(&self, library: &str) -> bool {
        self.libraries.contains(library)
    }

    pub fn statics(&self) -> impl Iterator<Item = &str> {
        self.statics.iter().map(String::as_str)
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(String::as_str)
    }

    pub fn libraries(&self) -> impl Iterator<Item = &str> {
        self.libraries.iter().map(String::as_str)
    }

    pub fn references(&self) -> &BTreeMap<String, Vec<ReferenceCitation>> {
        &self.refs
    }

    pub fn links(&self) -> &BTreeMap<String, Vec<String>> {
        &self.links
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn static_count(&self) -> usize {
        self.statics.len()
    }
}
