//! Doclet data model.
//!
//! The external parser's output is only loosely specified, so every field is
//! optional and unknown keys are retained in `rest` so that persisting a
//! record round-trips what the parser produced. Tree-wide queries (links,
//! description text) operate on the JSON form via [`descendants`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One documentation entry for a single symbol (module, function, member, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Doclet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memberof: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Members>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<SourceContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ParseDiagnostic>>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// One step of a doclet's nesting path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Member doclets grouped by scope. A group the parser did not emit stays
/// absent when the doclet is written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Members {
    #[serde(default, rename = "static", skip_serializing_if = "Option::is_none")]
    pub statics: Option<Vec<Doclet>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<Vec<Doclet>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner: Option<Vec<Doclet>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<Doclet>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<Vec<Doclet>>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Members {
    pub fn iter(&self) -> impl Iterator<Item = &Doclet> {
        [
            &self.statics,
            &self.instance,
            &self.inner,
            &self.events,
            &self.global,
        ]
        .into_iter()
        .flatten()
        .flatten()
    }
}

/// A block tag such as `@see`, `@extends` or `@mixes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        rename = "lineNumber",
        skip_serializing_if = "Option::is_none"
    )]
    pub line_number: Option<u64>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Where a doclet came from. Used only for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceContext {
    #[serde(default)]
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<SourceSpan>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSpan {
    #[serde(default)]
    pub start: SourcePosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<SourcePosition>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcePosition {
    #[serde(default)]
    pub line: u64,
    #[serde(default)]
    pub column: u64,
}

/// A diagnostic the parser attached to a doclet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseDiagnostic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        default,
        rename = "commentLineNumber",
        skip_serializing_if = "Option::is_none"
    )]
    pub comment_line_number: Option<u64>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// A file and line, printed as `file:line`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Location {
    pub file: String,
    pub line: Option<u64>,
}

impl Location {
    pub fn new(file: impl Into<String>, line: Option<u64>) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file, line),
            None => write!(f, "{}", self.file),
        }
    }
}

impl Doclet {
    /// The first path segment, which must be the module for a top-level record.
    pub fn root_segment(&self) -> Option<&PathSegment> {
        self.path.as_ref().and_then(|path| path.first())
    }

    pub fn static_members(&self) -> &[Doclet] {
        self.members
            .as_ref()
            .and_then(|members| members.statics.as_deref())
            .unwrap_or_default()
    }

    pub fn tags(&self) -> &[Tag] {
        self.tags.as_deref().unwrap_or_default()
    }

    pub fn errors(&self) -> &[ParseDiagnostic] {
        self.errors.as_deref().unwrap_or_default()
    }

    pub fn location(&self) -> Location {
        match &self.context {
            Some(context) => Location::new(
                context.file.clone(),
                context.loc.as_ref().map(|loc| loc.start.line),
            ),
            None => Location::new("<unknown>", None),
        }
    }

    /// `name in file:line`, or just `file:line` for anonymous doclets.
    pub fn display_position(&self) -> String {
        match &self.name {
            Some(name) => format!("{} in {}", name, self.location()),
            None => self.location().to_string(),
        }
    }

    /// Depth-first walk over this doclet and every nested member doclet.
    pub fn walk(&self) -> Vec<&Doclet> {
        let mut out = vec![self];
        if let Some(members) = &self.members {
            for member in members.iter() {
                out.extend(member.walk());
            }
        }
        out
    }
}

/// Every value reachable from `root`, including `root` itself, in document
/// order. Arrays are transparent: their elements are visited but the array
/// itself is not yielded.
pub fn descendants(root: &Value) -> Vec<&Value> {
    let mut out = Vec::new();
    collect_descendants(root, &mut out);
    out
}

fn collect_descendants<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_descendants(item, out);
            }
        }
        Value::Object(map) => {
            out.push(value);
            for child in map.values() {
                collect_descendants(child, out);
            }
        }
        _ => out.push(value),
    }
}

/// URLs of every `{"type": "link", "url": ...}` node in the tree.
pub fn link_urls(root: &Value) -> Vec<String> {
    descendants(root)
        .into_iter()
        .filter_map(|node| {
            let map = node.as_object()?;
            if map.get("type").and_then(Value::as_str) != Some("link") {
                return None;
            }
            map.get("url").and_then(Value::as_str).map(str::to_string)
        })
        .collect()
}
