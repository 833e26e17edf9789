//! Content reader contract
//!
//! Read access to repository content, used to answer entry lookups and to
//! supply full-text bodies on the index-modify path.

use std::collections::BTreeMap;
use std::sync::RwLock;

use super::entry::ContentEntry;
use crate::search::{SearchError, SearchResult};

pub trait ContentReader: Send + Sync {
    fn get_entry(&self, identifier: &str) -> SearchResult<Option<ContentEntry>>;

    /// Entries filed directly in a folder
    fn child_entries(&self, parent_identifier: &str) -> SearchResult<Vec<ContentEntry>>;

    /// Entries filed in no folder (the root excluded)
    fn unfiled_entries(&self) -> SearchResult<Vec<ContentEntry>>;

    /// Indexable text of an entry
    fn read_text(&self, identifier: &str) -> SearchResult<Option<String>>;
}

/// Content reader over an in-memory entry map
pub struct InMemoryContentReader {
    root_id: String,
    entries: RwLock<BTreeMap<String, ContentEntry>>,
}

impl InMemoryContentReader {
    pub fn new(root_id: impl Into<String>) -> Self {
        Self {
            root_id: root_id.into(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn with_entries(root_id: impl Into<String>, entries: Vec<ContentEntry>) -> Self {
        let reader = Self::new(root_id);
        if let Ok(mut map) = reader.entries.write() {
            for entry in entries {
                map.insert(entry.identifier.clone(), entry);
            }
        }
        reader
    }

    pub fn insert(&self, entry: ContentEntry) -> SearchResult<()> {
        self.write()?.insert(entry.identifier.clone(), entry);
        Ok(())
    }

    pub fn remove(&self, identifier: &str) -> SearchResult<Option<ContentEntry>> {
        Ok(self.write()?.remove(identifier))
    }

    fn read(&self) -> SearchResult<std::sync::RwLockReadGuard<'_, BTreeMap<String, ContentEntry>>> {
        self.entries
            .read()
            .map_err(|_| SearchError::execution("content reader lock poisoned"))
    }

    fn write(
        &self,
    ) -> SearchResult<std::sync::RwLockWriteGuard<'_, BTreeMap<String, ContentEntry>>> {
        self.entries
            .write()
            .map_err(|_| SearchError::execution("content reader lock poisoned"))
    }
}

impl ContentReader for InMemoryContentReader {
    fn get_entry(&self, identifier: &str) -> SearchResult<Option<ContentEntry>> {
        Ok(self.read()?.get(identifier).cloned())
    }

    fn child_entries(&self, parent_identifier: &str) -> SearchResult<Vec<ContentEntry>> {
        Ok(self
            .read()?
            .values()
            .filter(|e| e.parent_identifiers.iter().any(|p| p == parent_identifier))
            .cloned()
            .collect())
    }

    fn unfiled_entries(&self) -> SearchResult<Vec<ContentEntry>> {
        Ok(self
            .read()?
            .values()
            .filter(|e| e.is_unfiled() && e.identifier != self.root_id)
            .cloned()
            .collect())
    }

    fn read_text(&self, identifier: &str) -> SearchResult<Option<String>> {
        Ok(self.read()?.get(identifier).and_then(|e| e.content.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader() -> InMemoryContentReader {
        InMemoryContentReader::with_entries(
            "root",
            vec![
                ContentEntry::new("root", "folder"),
                ContentEntry::new("f1", "folder").with_parent("root"),
                ContentEntry::new("d1", "doc").with_parent("f1").with_content("hello"),
                ContentEntry::new("loose", "doc"),
            ],
        )
    }

    #[test]
    fn test_children() {
        let children = reader().child_entries("root").unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].identifier, "f1");
    }

    #[test]
    fn test_unfiled_excludes_root() {
        let unfiled = reader().unfiled_entries().unwrap();
        assert_eq!(unfiled.len(), 1);
        assert_eq!(unfiled[0].identifier, "loose");
    }

    #[test]
    fn test_read_text() {
        let reader = reader();
        assert_eq!(reader.read_text("d1").unwrap().as_deref(), Some("hello"));
        assert_eq!(reader.read_text("nope").unwrap(), None);
    }
}
