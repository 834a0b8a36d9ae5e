//! Search index.
//!
//! The projector only talks to an [`IndexBuilder`], so the engine is
//! pluggable. [`ElasticlunrIndex`] is the default: an elasticlunr index that
//! does not keep the source documents.

pub mod projector;

use serde::Serialize;

use crate::error::BuildError;

pub use projector::{IndexReport, Projector};

/// A document handed to the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocument {
    /// `title|site-path`; the index keeps nothing else to link back with.
    pub id: String,
    pub title: String,
    pub description: String,
    pub members: String,
    pub member_descriptions: String,
}

impl SearchDocument {
    /// The value of an indexed field by its index name.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "id" => Some(&self.id),
            "title" => Some(&self.title),
            "description" => Some(&self.description),
            "members" => Some(&self.members),
            "memberDescriptions" => Some(&self.member_descriptions),
            _ => None,
        }
    }
}

/// Fields every docweave index is built with.
pub const INDEX_FIELDS: &[&str] = &["title", "description", "members", "memberDescriptions"];
pub const INDEX_REF: &str = "id";

/// The capability the projector needs from a search engine.
pub trait IndexBuilder {
    fn add_field(&mut self, name: &str);
    fn set_ref(&mut self, name: &str);
    /// Whether the source documents are stored alongside the index.
    fn save_document(&mut self, save: bool);
    fn add_doc(&mut self, doc: &SearchDocument) -> Result<(), BuildError>;
    /// The serialized index, as the site's search page loads it.
    fn to_json(&self) -> String;
}

/// Default [`IndexBuilder`], backed by `elasticlunr-rs` with its English
/// pipeline.
///
/// The engine index is created on the first document; changing the
/// configuration afterwards starts a new, empty one.
pub struct ElasticlunrIndex {
    fields: Vec<String>,
    ref_field: String,
    save: bool,
    index: Option<elasticlunr::Index>,
    docs: usize,
}

impl Default for ElasticlunrIndex {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            ref_field: INDEX_REF.to_string(),
            save: true,
            index: None,
            docs: 0,
        }
    }
}

impl ElasticlunrIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// An index configured with the docweave fields and no document storage.
    pub fn for_docs() -> Self {
        let mut index = Self::new();
        for field in INDEX_FIELDS {
            index.add_field(field);
        }
        index.set_ref(INDEX_REF);
        index.save_document(false);
        index
    }

    pub fn len(&self) -> usize {
        self.docs
    }

    pub fn is_empty(&self) -> bool {
        self.docs == 0
    }

    fn build(&self) -> elasticlunr::Index {
        elasticlunr::IndexBuilder::new()
            .save_docs(self.save)
            .add_fields(&self.fields)
            .set_ref(&self.ref_field)
            .build()
    }

    fn reset(&mut self) {
        self.index = None;
        self.docs = 0;
    }
}

impl IndexBuilder for ElasticlunrIndex {
    fn add_field(&mut self, name: &str) {
        if !self.fields.iter().any(|f| f == name) {
            self.fields.push(name.to_string());
            self.reset();
        }
    }

    fn set_ref(&mut self, name: &str) {
        self.ref_field = name.to_string();
        self.reset();
    }

    fn save_document(&mut self, save: bool) {
        self.save = save;
        self.reset();
    }

    fn add_doc(&mut self, doc: &SearchDocument) -> Result<(), BuildError> {
        let doc_ref = doc
            .field(&self.ref_field)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                BuildError::projection(&doc.title, format!("missing ref field {}", self.ref_field))
            })?;
        let values: Vec<&str> = self
            .fields
            .iter()
            .map(|field| doc.field(field).unwrap_or_default())
            .collect();

        if self.index.is_none() {
            self.index = Some(self.build());
        }
        if let Some(index) = self.index.as_mut() {
            index.add_doc(doc_ref, values);
            self.docs += 1;
        }
        Ok(())
    }

    fn to_json(&self) -> String {
        match &self.index {
            Some(index) => index.to_json(),
            None => self.build().to_json(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn doc(id: &str, title: &str, description: &str) -> SearchDocument {
        SearchDocument {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            ..SearchDocument::default()
        }
    }

    fn parsed(index: &ElasticlunrIndex) -> Value {
        serde_json::from_str(&index.to_json()).unwrap()
    }

    #[test]
    fn test_index_layout() {
        let mut index = ElasticlunrIndex::for_docs();
        index
            .add_doc(&doc("ui/Button|docs/modules/ui/Button", "ui/Button", "Pressable buttons"))
            .unwrap();
        assert_eq!(index.len(), 1);
        let json = parsed(&index);

        assert_eq!(json["ref"], "id");
        assert_eq!(json["fields"][3], "memberDescriptions");
        assert_eq!(json["documentStore"]["save"], false);
        assert!(json["documentStore"]["docInfo"]["ui/Button|docs/modules/ui/Button"].is_object());

        // Terms go through the engine's stemmer.
        let leaf = &json["index"]["description"]["root"]["b"]["u"]["t"]["t"]["o"]["n"];
        assert!(leaf["docs"]["ui/Button|docs/modules/ui/Button"].is_object());
    }

    #[test]
    fn test_empty_index_still_serializes() {
        let json = parsed(&ElasticlunrIndex::for_docs());
        assert_eq!(json["ref"], "id");
        assert_eq!(json["fields"][0], "title");
    }

    #[test]
    fn test_missing_ref_is_rejected() {
        let mut index = ElasticlunrIndex::for_docs();
        assert!(index.add_doc(&doc("", "Untitled", "text")).is_err());
        assert!(index.is_empty());
    }
}
