//! Commands carried through the interceptor chain
//!
//! `Command` is a closed set of payloads; `accept` routes each one to the
//! matching `Interceptor` visit method.

use std::collections::BTreeMap;

use super::context::InvocationContext;
use super::entry::ContentEntry;
use super::interceptor::{Interceptor, Next};
use crate::model::{Constraint, Query, Selector};
use crate::result::{ItemsList, Row, ScoredRow};
use crate::search::{SearchError, SearchResult};
use crate::value::Value;

/// Add and/or remove index entries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModifyIndexCommand {
    pub added: Vec<ContentEntry>,
    pub removed: Vec<String>,
}

/// Run one selector's share of a query against the index
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteSelectorCommand {
    pub selector: Selector,
    /// Only constraints on this selector
    pub constraint: Option<Constraint>,
    /// Logical column names to fetch; `None` fetches everything
    pub fields: Option<Vec<String>>,
    pub variables: BTreeMap<String, Value>,
}

/// Run a complete query: select, join, filter, sort, page, project
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessQueryCommand {
    pub query: Query,
    pub variables: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetChildEntriesCommand {
    pub parent_identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetContentEntryCommand {
    pub identifier: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetUnfiledEntriesCommand;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ModifyIndex(ModifyIndexCommand),
    ExecuteSelector(ExecuteSelectorCommand),
    ProcessQuery(ProcessQueryCommand),
    GetChildEntries(GetChildEntriesCommand),
    GetContentEntry(GetContentEntryCommand),
    GetUnfiledEntries(GetUnfiledEntriesCommand),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::ModifyIndex(_) => "ModifyIndex",
            Command::ExecuteSelector(_) => "ExecuteSelector",
            Command::ProcessQuery(_) => "ProcessQuery",
            Command::GetChildEntries(_) => "GetChildEntries",
            Command::GetContentEntry(_) => "GetContentEntry",
            Command::GetUnfiledEntries(_) => "GetUnfiledEntries",
        }
    }

    /// Asks `interceptor` to visit this command
    pub fn accept(
        &self,
        interceptor: &dyn Interceptor,
        ctx: &InvocationContext,
        next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        match self {
            Command::ModifyIndex(c) => interceptor.visit_modify_index(ctx, c, next),
            Command::ExecuteSelector(c) => interceptor.visit_execute_selector(ctx, c, next),
            Command::ProcessQuery(c) => interceptor.visit_process_query(ctx, c, next),
            Command::GetChildEntries(c) => interceptor.visit_get_child_entries(ctx, c, next),
            Command::GetContentEntry(c) => interceptor.visit_get_content_entry(ctx, c, next),
            Command::GetUnfiledEntries(c) => interceptor.visit_get_unfiled_entries(ctx, c, next),
        }
    }
}

/// Outcome of an index modification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexModification {
    pub added: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    Rows(Vec<ScoredRow>),
    Items(ItemsList<Row>),
    Entry(Option<ContentEntry>),
    Entries(Vec<ContentEntry>),
    Modified(IndexModification),
}

impl CommandOutput {
    pub fn kind(&self) -> &'static str {
        match self {
            CommandOutput::Rows(_) => "rows",
            CommandOutput::Items(_) => "items",
            CommandOutput::Entry(_) => "entry",
            CommandOutput::Entries(_) => "entries",
            CommandOutput::Modified(_) => "modified",
        }
    }

    fn unexpected(&self, wanted: &str) -> SearchError {
        SearchError::execution(format!(
            "Interceptor chain returned {} where {} was expected",
            self.kind(),
            wanted
        ))
    }

    pub fn into_rows(self) -> SearchResult<Vec<ScoredRow>> {
        match self {
            CommandOutput::Rows(rows) => Ok(rows),
            other => Err(other.unexpected("rows")),
        }
    }

    pub fn into_items(self) -> SearchResult<ItemsList<Row>> {
        match self {
            CommandOutput::Items(items) => Ok(items),
            other => Err(other.unexpected("items")),
        }
    }

    pub fn into_entry(self) -> SearchResult<Option<ContentEntry>> {
        match self {
            CommandOutput::Entry(entry) => Ok(entry),
            other => Err(other.unexpected("entry")),
        }
    }

    pub fn into_entries(self) -> SearchResult<Vec<ContentEntry>> {
        match self {
            CommandOutput::Entries(entries) => Ok(entries),
            other => Err(other.unexpected("entries")),
        }
    }

    pub fn into_modification(self) -> SearchResult<IndexModification> {
        match self {
            CommandOutput::Modified(m) => Ok(m),
            other => Err(other.unexpected("modified")),
        }
    }
}
