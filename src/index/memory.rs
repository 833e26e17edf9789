//! In-memory queryable index, optionally journaled to disk
//!
//! Entries live in a `BTreeMap` behind a `RwLock`: queries share the read
//! lock, modifications take the write lock, so a query never observes half
//! of a batch. With an index directory every modification is appended to the
//! journal before it is applied, and `open()` replays the journal.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::errors::{IndexError, IndexResult};
use super::fulltext::{tokenize, FullTextExpression};
use super::journal::{Journal, JournalRecord};
use super::native::{FieldExpr, FolderRef, IndexHit, NativeFilter, NativeQuery};
use super::storage::QueryableIndexStorage;
use crate::content::ContentEntry;
use crate::model::{Operator, SelectorName};
use crate::observability::{log_event_with_fields, Event};
use crate::value::{compare_values, LikePattern, NameConverter, ToStringNameConverter, Value};

/// Storage settings
#[derive(Clone)]
pub struct IndexSettings {
    /// Journal directory; `None` keeps the index in memory only
    pub index_dir: Option<PathBuf>,
    /// Identifier of the root folder; paths are resolved from it
    pub root_id: String,
    /// Parent identifier recorded for the root; treated as "no parent"
    pub root_parent_id: String,
    /// Applied to table and property names at indexing time
    pub name_converter: Arc<dyn NameConverter>,
}

impl IndexSettings {
    pub fn in_memory(root_id: impl Into<String>) -> Self {
        Self {
            index_dir: None,
            root_id: root_id.into(),
            root_parent_id: String::new(),
            name_converter: Arc::new(ToStringNameConverter),
        }
    }
}

struct IndexedEntry {
    entry: ContentEntry,
    table: String,
    parents: Vec<String>,
    fields: BTreeMap<String, Vec<Value>>,
}

impl IndexedEntry {
    fn text_tokens(&self, field: Option<&str>) -> Vec<String> {
        match field {
            Some(field) => self
                .fields
                .get(field)
                .map(|values| values.iter().flat_map(|v| tokenize(&v.to_text())).collect())
                .unwrap_or_default(),
            None => {
                let mut tokens = self
                    .entry
                    .content
                    .as_deref()
                    .map(tokenize)
                    .unwrap_or_default();
                for value in self.fields.values().flatten() {
                    if value.is_textual() {
                        tokens.extend(tokenize(&value.to_text()));
                    }
                }
                tokens
            }
        }
    }
}

#[derive(Default)]
struct IndexState {
    entries: BTreeMap<String, IndexedEntry>,
    journal: Option<Journal>,
}

pub struct InMemoryIndexStorage {
    settings: IndexSettings,
    state: RwLock<Option<IndexState>>,
}

impl InMemoryIndexStorage {
    pub fn new(settings: IndexSettings) -> Self {
        Self {
            settings,
            state: RwLock::new(None),
        }
    }

    fn read(&self) -> IndexResult<RwLockReadGuard<'_, Option<IndexState>>> {
        self.state.read().map_err(|_| IndexError::Poisoned)
    }

    fn write(&self) -> IndexResult<RwLockWriteGuard<'_, Option<IndexState>>> {
        self.state.write().map_err(|_| IndexError::Poisoned)
    }

    fn index_entry(&self, entry: ContentEntry) -> IndexedEntry {
        let converter = self.settings.name_converter.as_ref();
        IndexedEntry {
            table: converter.convert(&entry.table_name),
            parents: entry
                .parent_identifiers
                .iter()
                .filter(|p| **p != self.settings.root_parent_id)
                .cloned()
                .collect(),
            fields: entry
                .properties
                .iter()
                .map(|(k, v)| (converter.convert(k), v.clone()))
                .collect(),
            entry,
        }
    }

    fn apply(&self, state: &mut IndexState, record: JournalRecord) -> usize {
        match record {
            JournalRecord::Add { entries } => {
                let count = entries.len();
                for entry in entries {
                    let indexed = self.index_entry(entry);
                    state.entries.insert(indexed.entry.identifier.clone(), indexed);
                }
                count
            }
            JournalRecord::Remove { identifiers } => identifiers
                .iter()
                .filter(|id| state.entries.remove(id.as_str()).is_some())
                .count(),
            JournalRecord::Clear => {
                let count = state.entries.len();
                state.entries.clear();
                count
            }
        }
    }

    fn modify(&self, record: JournalRecord) -> IndexResult<usize> {
        let mut guard = self.write()?;
        let state = guard.as_mut().ok_or(IndexError::Closed)?;
        if let Some(journal) = state.journal.as_mut() {
            journal.append(&record)?;
        }
        Ok(self.apply(state, record))
    }

    fn with_state<T>(&self, f: impl FnOnce(&IndexState) -> IndexResult<T>) -> IndexResult<T> {
        let guard = self.read()?;
        let state = guard.as_ref().ok_or(IndexError::Closed)?;
        f(state)
    }
}

impl QueryableIndexStorage for InMemoryIndexStorage {
    fn open(&self) -> IndexResult<()> {
        let mut guard = self.write()?;
        if guard.is_some() {
            return Ok(());
        }

        let mut state = IndexState::default();
        let mut replayed = 0usize;
        if let Some(dir) = &self.settings.index_dir {
            let (journal, records) = Journal::open(dir)?;
            replayed = records.len();
            for record in records {
                self.apply(&mut state, record);
            }
            state.journal = Some(journal);
        }

        let entries = state.entries.len().to_string();
        let replayed = replayed.to_string();
        let location = self
            .settings
            .index_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "<memory>".to_string());
        *guard = Some(state);

        log_event_with_fields(
            Event::IndexOpened,
            &[
                ("entries", &entries),
                ("location", &location),
                ("replayed_records", &replayed),
            ],
        );
        Ok(())
    }

    fn close(&self) -> IndexResult<()> {
        self.write()?.take();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.read().map(|s| s.is_some()).unwrap_or(false)
    }

    fn add_entries(&self, entries: Vec<ContentEntry>) -> IndexResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }
        self.modify(JournalRecord::Add { entries })
    }

    fn remove_entries(&self, identifiers: &[String]) -> IndexResult<usize> {
        if identifiers.is_empty() {
            return Ok(0);
        }
        self.modify(JournalRecord::Remove {
            identifiers: identifiers.to_vec(),
        })
    }

    fn clear(&self) -> IndexResult<()> {
        self.modify(JournalRecord::Clear).map(|_| ())
    }

    fn execute_query(
        &self,
        query: &NativeQuery,
        _selector: &SelectorName,
    ) -> IndexResult<Vec<IndexHit>> {
        self.with_state(|state| {
            let plan = QueryPlan::prepare(&query.filter, state, &self.settings.root_id)?;
            let tables: HashSet<&str> = query.tables.iter().map(String::as_str).collect();

            let mut hits = Vec::new();
            for indexed in state.entries.values() {
                if !tables.contains(indexed.table.as_str()) {
                    continue;
                }
                let score = plan.score(indexed);
                if !plan.matches(&query.filter, indexed, state, score) {
                    continue;
                }
                let values = match &query.fields {
                    None => indexed.fields.clone(),
                    Some(fields) => fields
                        .iter()
                        .filter_map(|f| indexed.fields.get(f).map(|v| (f.clone(), v.clone())))
                        .collect(),
                };
                hits.push(IndexHit {
                    identifier: indexed.entry.identifier.clone(),
                    score,
                    values,
                });
            }
            Ok(hits)
        })
    }

    fn get_entry(&self, identifier: &str) -> IndexResult<Option<ContentEntry>> {
        self.with_state(|state| Ok(state.entries.get(identifier).map(|e| e.entry.clone())))
    }

    fn child_entries(&self, parent_identifier: &str) -> IndexResult<Vec<ContentEntry>> {
        self.with_state(|state| {
            Ok(state
                .entries
                .values()
                .filter(|e| e.parents.iter().any(|p| p == parent_identifier))
                .map(|e| e.entry.clone())
                .collect())
        })
    }

    fn unfiled_entries(&self) -> IndexResult<Vec<ContentEntry>> {
        self.with_state(|state| {
            Ok(state
                .entries
                .values()
                .filter(|e| e.parents.is_empty() && e.entry.identifier != self.settings.root_id)
                .map(|e| e.entry.clone())
                .collect())
        })
    }

    fn entry_count(&self) -> IndexResult<usize> {
        self.with_state(|state| Ok(state.entries.len()))
    }

    fn compact(&self) -> IndexResult<()> {
        let mut guard = self.write()?;
        let state = guard.as_mut().ok_or(IndexError::Closed)?;
        let entries: Vec<ContentEntry> = state.entries.values().map(|e| e.entry.clone()).collect();
        let count = entries.len().to_string();
        if let Some(journal) = state.journal.as_mut() {
            journal.rewrite(&[JournalRecord::Add { entries }])?;
        }
        log_event_with_fields(Event::IndexCompacted, &[("entries", &count)]);
        Ok(())
    }
}

/// Per-query precomputation: resolved folders, compiled patterns and
/// parsed full-text expressions
struct QueryPlan {
    folders: HashMap<FolderRef, Option<String>>,
    patterns: HashMap<String, LikePattern>,
    full_text: Vec<(Option<String>, FullTextExpression)>,
}

impl QueryPlan {
    fn prepare(filter: &NativeFilter, state: &IndexState, root_id: &str) -> IndexResult<Self> {
        let mut plan = QueryPlan {
            folders: HashMap::new(),
            patterns: HashMap::new(),
            full_text: Vec::new(),
        };
        let mut error = None;

        filter.walk(&mut |node| match node {
            NativeFilter::ChildOf(folder) | NativeFilter::DescendantOf(folder) => {
                let resolved = resolve_folder(folder, state, root_id);
                plan.folders.insert(folder.clone(), resolved);
            }
            NativeFilter::Term {
                operator: Operator::Like,
                value,
                ..
            } => {
                let pattern = value.to_text();
                if !plan.patterns.contains_key(&pattern) {
                    match LikePattern::compile(&pattern) {
                        Ok(compiled) => {
                            plan.patterns.insert(pattern, compiled);
                        }
                        Err(e) => {
                            error.get_or_insert(IndexError::InvalidPattern {
                                pattern,
                                reason: e.to_string(),
                            });
                        }
                    }
                }
            }
            NativeFilter::FullText { field, expression } => {
                plan.full_text
                    .push((field.clone(), FullTextExpression::parse(expression)));
            }
            _ => {}
        });

        match error {
            Some(e) => Err(e),
            None => Ok(plan),
        }
    }

    /// Sum of matching full-text scores; 1.0 when the query has none
    fn score(&self, entry: &IndexedEntry) -> f64 {
        if self.full_text.is_empty() {
            return 1.0;
        }
        self.full_text
            .iter()
            .filter_map(|(field, expr)| expr.score(&entry.text_tokens(field.as_deref())))
            .sum()
    }

    fn matches(
        &self,
        filter: &NativeFilter,
        entry: &IndexedEntry,
        state: &IndexState,
        score: f64,
    ) -> bool {
        match filter {
            NativeFilter::MatchAll => true,
            NativeFilter::And(parts) => parts.iter().all(|p| self.matches(p, entry, state, score)),
            NativeFilter::Or(parts) => parts.iter().any(|p| self.matches(p, entry, state, score)),
            NativeFilter::Not(inner) => !self.matches(inner, entry, state, score),
            NativeFilter::Term {
                field,
                operator,
                value,
            } => field_values(field, entry, score)
                .iter()
                .any(|v| self.compare(v, *operator, value)),
            NativeFilter::Exists { field } => {
                entry.fields.get(field).map_or(false, |v| !v.is_empty())
            }
            NativeFilter::FullText { field, expression } => FullTextExpression::parse(expression)
                .score(&entry.text_tokens(field.as_deref()))
                .is_some(),
            NativeFilter::ChildOf(folder) => match self.folders.get(folder) {
                Some(Some(id)) => entry.parents.iter().any(|p| p == id),
                _ => false,
            },
            NativeFilter::DescendantOf(folder) => match self.folders.get(folder) {
                Some(Some(id)) => is_descendant(entry, id, state),
                _ => false,
            },
        }
    }

    fn compare(&self, actual: &Value, operator: Operator, expected: &Value) -> bool {
        match operator {
            Operator::Like => self
                .patterns
                .get(&expected.to_text())
                .map_or(false, |p| p.matches(&actual.to_text())),
            op => compare_values(actual, expected).map_or(false, |o| op.accepts(o)),
        }
    }
}

fn field_values(field: &FieldExpr, entry: &IndexedEntry, score: f64) -> Vec<Value> {
    match field {
        FieldExpr::Property(name) => entry.fields.get(name).cloned().unwrap_or_default(),
        FieldExpr::Length(inner) => field_values(inner, entry, score)
            .iter()
            .map(|v| Value::Long(v.to_text().chars().count() as i64))
            .collect(),
        FieldExpr::LowerCase(inner) => field_values(inner, entry, score)
            .iter()
            .map(|v| Value::String(v.to_text().to_lowercase()))
            .collect(),
        FieldExpr::UpperCase(inner) => field_values(inner, entry, score)
            .iter()
            .map(|v| Value::String(v.to_text().to_uppercase()))
            .collect(),
        FieldExpr::Score => vec![Value::Double(score)],
    }
}

fn resolve_folder(folder: &FolderRef, state: &IndexState, root_id: &str) -> Option<String> {
    match folder {
        FolderRef::Identifier(id) => Some(id.clone()),
        FolderRef::Path(segments) => {
            let mut current = root_id.to_string();
            for segment in segments {
                current = state
                    .entries
                    .values()
                    .find(|e| e.entry.name == *segment && e.parents.iter().any(|p| *p == current))?
                    .entry
                    .identifier
                    .clone();
            }
            Some(current)
        }
    }
}

fn is_descendant(entry: &IndexedEntry, ancestor: &str, state: &IndexState) -> bool {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut frontier: Vec<&str> = entry.parents.iter().map(String::as_str).collect();
    while let Some(parent) = frontier.pop() {
        if parent == ancestor {
            return true;
        }
        if !visited.insert(parent) {
            continue;
        }
        if let Some(indexed) = state.entries.get(parent) {
            frontier.extend(indexed.parents.iter().map(String::as_str));
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::LowerCaseNameConverter;
    use tempfile::TempDir;

    fn tree() -> Vec<ContentEntry> {
        vec![
            ContentEntry::new("root", "folder").with_name(""),
            ContentEntry::new("f1", "folder").with_name("docs").with_parent("root"),
            ContentEntry::new("f2", "folder").with_name("2024").with_parent("f1"),
            ContentEntry::new("d1", "doc")
                .with_name("a.txt")
                .with_parent("f1")
                .with_property("title", "Alpha")
                .with_property("size", 10i64)
                .with_content("the quick brown fox"),
            ContentEntry::new("d2", "doc")
                .with_name("b.txt")
                .with_parent("f2")
                .with_property("title", "Beta")
                .with_property("size", 20i64)
                .with_content("fox fox fox"),
            ContentEntry::new("d3", "doc")
                .with_name("c.txt")
                .with_property("title", "Gamma"),
        ]
    }

    fn storage() -> InMemoryIndexStorage {
        let storage = InMemoryIndexStorage::new(IndexSettings::in_memory("root"));
        storage.open().unwrap();
        storage.add_entries(tree()).unwrap();
        storage
    }

    fn query(filter: NativeFilter) -> NativeQuery {
        NativeQuery {
            tables: vec!["doc".into()],
            filter,
            fields: None,
        }
    }

    fn ids(hits: Vec<IndexHit>) -> Vec<String> {
        hits.into_iter().map(|h| h.identifier).collect()
    }

    fn run(storage: &InMemoryIndexStorage, filter: NativeFilter) -> Vec<IndexHit> {
        storage
            .execute_query(&query(filter), &SelectorName::new("doc"))
            .unwrap()
    }

    #[test]
    fn test_closed_storage_rejects_queries() {
        let storage = InMemoryIndexStorage::new(IndexSettings::in_memory("root"));
        let err = storage
            .execute_query(&query(NativeFilter::MatchAll), &SelectorName::new("doc"))
            .unwrap_err();
        assert!(matches!(err, IndexError::Closed));
    }

    #[test]
    fn test_table_filter() {
        let storage = storage();
        assert_eq!(ids(run(&storage, NativeFilter::MatchAll)), vec!["d1", "d2", "d3"]);
    }

    #[test]
    fn test_term_and_like() {
        let storage = storage();
        let hits = run(
            &storage,
            NativeFilter::Term {
                field: FieldExpr::Property("size".into()),
                operator: Operator::GreaterThan,
                value: Value::Long(15),
            },
        );
        assert_eq!(ids(hits), vec!["d2"]);

        let hits = run(
            &storage,
            NativeFilter::Term {
                field: FieldExpr::LowerCase(Box::new(FieldExpr::Property("title".into()))),
                operator: Operator::Like,
                value: Value::from("%a"),
            },
        );
        assert_eq!(ids(hits), vec!["d1", "d2", "d3"]);
    }

    #[test]
    fn test_full_text_scores() {
        let storage = storage();
        let hits = run(
            &storage,
            NativeFilter::FullText {
                field: None,
                expression: "fox".into(),
            },
        );
        let scores: Vec<(String, f64)> = hits.into_iter().map(|h| (h.identifier, h.score)).collect();
        assert_eq!(scores, vec![("d1".to_string(), 1.0), ("d2".to_string(), 3.0)]);
    }

    #[test]
    fn test_folder_predicates() {
        let storage = storage();
        let child = run(
            &storage,
            NativeFilter::ChildOf(FolderRef::Path(vec!["docs".into()])),
        );
        assert_eq!(ids(child), vec!["d1"]);

        let below = run(
            &storage,
            NativeFilter::DescendantOf(FolderRef::Identifier("f1".into())),
        );
        assert_eq!(ids(below), vec!["d1", "d2"]);

        let missing = run(
            &storage,
            NativeFilter::ChildOf(FolderRef::Path(vec!["nope".into()])),
        );
        assert!(missing.is_empty());
    }

    #[test]
    fn test_unfiled_and_children() {
        let storage = storage();
        let unfiled = storage.unfiled_entries().unwrap();
        assert_eq!(unfiled.len(), 1);
        assert_eq!(unfiled[0].identifier, "d3");
        assert_eq!(storage.child_entries("root").unwrap().len(), 1);
    }

    #[test]
    fn test_name_conversion() {
        let mut settings = IndexSettings::in_memory("root");
        settings.name_converter = Arc::new(LowerCaseNameConverter);
        let storage = InMemoryIndexStorage::new(settings);
        storage.open().unwrap();
        storage
            .add_entries(vec![ContentEntry::new("x", "Doc").with_property("Title", "t")])
            .unwrap();

        let hits = run(
            &storage,
            NativeFilter::Exists {
                field: "title".into(),
            },
        );
        assert_eq!(ids(hits), vec!["x"]);
    }

    #[test]
    fn test_journal_replay_and_compact() {
        let dir = TempDir::new().unwrap();
        let settings = IndexSettings {
            index_dir: Some(dir.path().to_path_buf()),
            ..IndexSettings::in_memory("root")
        };

        {
            let storage = InMemoryIndexStorage::new(settings.clone());
            storage.open().unwrap();
            storage.add_entries(tree()).unwrap();
            storage.remove_entries(&["d3".to_string()]).unwrap();
            storage.compact().unwrap();
            storage.close().unwrap();
        }

        let storage = InMemoryIndexStorage::new(settings);
        storage.open().unwrap();
        assert_eq!(storage.entry_count().unwrap(), 5);
        assert!(storage.get_entry("d3").unwrap().is_none());
    }

    #[test]
    fn test_like_metacharacters_are_literal() {
        let storage = storage();
        let hits = run(
            &storage,
            NativeFilter::Term {
                field: FieldExpr::Property("title".into()),
                operator: Operator::Like,
                value: Value::from("(Alpha"),
            },
        );
        assert!(hits.is_empty());
    }
}
