//! Content entries: the unit the index stores and queries return

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// An addressable piece of repository content, as seen by the index.
///
/// Properties are multi-valued; a missing key and an empty list both mean
/// "not set".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub identifier: String,
    /// Table (content type) of the entry
    pub table_name: String,
    /// Path segment name used for path resolution
    #[serde(default)]
    pub name: String,
    /// Folders the entry is filed in; empty for unfiled entries and the root
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_identifiers: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, Vec<Value>>,
    /// Full-text body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ContentEntry {
    pub fn new(identifier: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            table_name: table_name.into(),
            name: String::new(),
            parent_identifiers: Vec::new(),
            properties: BTreeMap::new(),
            content: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_identifiers.push(parent.into());
        self
    }

    /// Appends one value to a property
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Replaces all values of a property
    pub fn with_values(mut self, name: impl Into<String>, values: Vec<Value>) -> Self {
        self.properties.insert(name.into(), values);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn property(&self, name: &str) -> &[Value] {
        self.properties.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_unfiled(&self) -> bool {
        self.parent_identifiers.is_empty()
    }
}
