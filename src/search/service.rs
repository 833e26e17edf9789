//! Search service façade
//!
//! Lifecycle: `Created` → `start()` → `Running` → `stop()` → `Stopped`.
//! `start()` is idempotent while running; a stopped service cannot be
//! restarted. Every public operation other than `start`/`stop` requires the
//! `Running` state.
//!
//! The service is shared by many callers: it only takes its state lock to
//! read the interceptor chain, and executes commands outside the lock.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::content::interceptors::{
    CachingInterceptor, ContentReaderInterceptor, IndexInterceptor, ObserveInterceptor,
    QueryProcessorInterceptor,
};
use crate::content::{
    Command, ContentEntry, GetChildEntriesCommand, GetContentEntryCommand,
    GetUnfiledEntriesCommand, IndexModification, Interceptor, InterceptorChain,
    InvocationContext, ModifyIndexCommand, ProcessQueryCommand,
};
use crate::index::QueryableIndexStorage;
use crate::model::Query;
use crate::observability::{
    log_event, log_event_with_fields, Event, Logger, MetricsRegistry, MetricsSnapshot,
};
use crate::query::parse_query;
use crate::result::{ItemsList, Row};
use crate::value::Value;

use super::config::SearchServiceConfiguration;
use super::errors::{SearchError, SearchResult};
use super::validator::QueryValidator;

/// Lifecycle state of a search service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Created,
    Running,
    Stopped,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Created => "CREATED",
            ServiceStatus::Running => "RUNNING",
            ServiceStatus::Stopped => "STOPPED",
        }
    }
}

#[derive(Clone)]
struct Running {
    chain: InterceptorChain,
    storage: Arc<dyn QueryableIndexStorage>,
    cache: Option<Arc<CachingInterceptor>>,
}

enum State {
    Created,
    Running(Running),
    Stopped,
}

pub struct SearchService {
    config: SearchServiceConfiguration,
    metrics: Arc<MetricsRegistry>,
    state: RwLock<State>,
}

impl SearchService {
    pub fn new(config: SearchServiceConfiguration) -> Self {
        Self {
            config,
            metrics: Arc::new(MetricsRegistry::new()),
            state: RwLock::new(State::Created),
        }
    }

    pub fn configuration(&self) -> &SearchServiceConfiguration {
        &self.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn status(&self) -> ServiceStatus {
        match self.read().as_deref() {
            Ok(State::Created) => ServiceStatus::Created,
            Ok(State::Running(_)) => ServiceStatus::Running,
            Ok(State::Stopped) | Err(_) => ServiceStatus::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status() == ServiceStatus::Running
    }

    /// Names of the interceptors in dispatch order; empty unless running
    pub fn interceptor_names(&self) -> Vec<&'static str> {
        self.running()
            .map(|running| running.chain.names())
            .unwrap_or_default()
    }

    fn read(&self) -> SearchResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| SearchError::service_state("search service state lock poisoned"))
    }

    fn write(&self) -> SearchResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| SearchError::service_state("search service state lock poisoned"))
    }

    fn running(&self) -> SearchResult<Running> {
        match &*self.read()? {
            State::Running(running) => Ok(running.clone()),
            State::Created => Err(SearchError::service_state(
                "Search service has not been started",
            )),
            State::Stopped => Err(SearchError::service_state("Search service has been stopped")),
        }
    }

    /// Wires the interceptor chain and opens the index storage
    pub fn start(&self) -> SearchResult<()> {
        let mut state = self.write()?;
        match &*state {
            State::Running(_) => return Ok(()),
            State::Stopped => {
                return Err(SearchError::service_state(
                    "Search service has been stopped and cannot be restarted",
                ))
            }
            State::Created => {}
        }

        log_event(Event::ServiceStart);
        self.config.validate()?;

        let storage = self.config.index.storage(self.config.name_converter.clone());
        if let Err(e) = storage.open() {
            let reason = e.to_string();
            Logger::fatal(
                "SEARCH_SERVICE_START_FAILED",
                &[("code", e.code()), ("reason", reason.as_str())],
            );
            return Err(e.into());
        }

        let running = self.wire(storage);
        let names = running.chain.names().join(",");
        *state = State::Running(running);

        log_event_with_fields(Event::ServiceStarted, &[("interceptors", names.as_str())]);
        Ok(())
    }

    /// observe → configured extras → caching → content reader → processor → index
    fn wire(&self, storage: Arc<dyn QueryableIndexStorage>) -> Running {
        let mut interceptors: Vec<Arc<dyn Interceptor>> =
            vec![Arc::new(ObserveInterceptor::new(self.metrics.clone()))];
        interceptors.extend(self.config.interceptors.iter().cloned());

        let cache = (self.config.cache_capacity > 0)
            .then(|| Arc::new(CachingInterceptor::new(self.config.cache_capacity)));
        if let Some(cache) = &cache {
            interceptors.push(cache.clone());
        }
        if let Some(reader) = &self.config.content_reader {
            interceptors.push(Arc::new(ContentReaderInterceptor::new(reader.clone())));
        }
        interceptors.push(Arc::new(QueryProcessorInterceptor));
        interceptors.push(Arc::new(IndexInterceptor::new(storage.clone())));

        Running {
            chain: InterceptorChain::new(interceptors),
            storage,
            cache,
        }
    }

    /// Closes the index storage. Idempotent.
    pub fn stop(&self) -> SearchResult<()> {
        let mut state = self.write()?;
        let previous = std::mem::replace(&mut *state, State::Stopped);
        if let State::Running(running) = previous {
            log_event(Event::ServiceStop);
            running.storage.close()?;
            log_event(Event::ServiceStopped);
        }
        Ok(())
    }

    /// Context for calls that bring none, with a fresh invocation id
    pub fn invocation_context(&self) -> InvocationContext {
        self.config.invocation_context().derive()
    }

    pub fn execute(&self, query: &Query) -> SearchResult<ItemsList<Row>> {
        self.execute_with_variables(query, &BTreeMap::new())
    }

    pub fn execute_with_variables(
        &self,
        query: &Query,
        variables: &BTreeMap<String, Value>,
    ) -> SearchResult<ItemsList<Row>> {
        self.execute_in(&self.invocation_context(), query, variables)
    }

    /// Validates `query` against the context's schema, then runs it
    /// through the interceptor chain. A rejected query dispatches nothing.
    pub fn execute_in(
        &self,
        ctx: &InvocationContext,
        query: &Query,
        variables: &BTreeMap<String, Value>,
    ) -> SearchResult<ItemsList<Row>> {
        let running = self.running()?;

        if let Err(e) = QueryValidator::new(ctx.schema()).validate(query, variables) {
            self.reject(ctx, &e);
            return Err(e);
        }

        let command = Command::ProcessQuery(ProcessQueryCommand {
            query: query.clone(),
            variables: variables.clone(),
        });
        running.chain.dispatch(ctx, &command)?.into_items()
    }

    /// Parses and executes a query statement
    pub fn execute_sql(&self, statement: &str) -> SearchResult<ItemsList<Row>> {
        self.execute_sql_with_variables(statement, &BTreeMap::new())
    }

    pub fn execute_sql_with_variables(
        &self,
        statement: &str,
        variables: &BTreeMap<String, Value>,
    ) -> SearchResult<ItemsList<Row>> {
        let ctx = self.invocation_context();
        let query = match parse_query(statement) {
            Ok(query) => query,
            Err(e) => {
                self.running()?;
                self.reject(&ctx, &e);
                return Err(e);
            }
        };
        self.execute_in(&ctx, &query, variables)
    }

    fn reject(&self, ctx: &InvocationContext, error: &SearchError) {
        self.metrics.increment_queries_rejected();
        let id = ctx.id().to_string();
        let reason = error.to_string();
        log_event_with_fields(
            Event::QueryRejected,
            &[
                ("code", error.code()),
                ("invocation_id", id.as_str()),
                ("reason", reason.as_str()),
            ],
        );
    }

    /// Adds (or replaces) and removes index entries
    pub fn modify_index(
        &self,
        added: Vec<ContentEntry>,
        removed: Vec<String>,
    ) -> SearchResult<IndexModification> {
        let running = self.running()?;
        let command = Command::ModifyIndex(ModifyIndexCommand { added, removed });
        running
            .chain
            .dispatch(&self.invocation_context(), &command)?
            .into_modification()
    }

    pub fn get_content_entry(&self, identifier: &str) -> SearchResult<Option<ContentEntry>> {
        let running = self.running()?;
        let command = Command::GetContentEntry(GetContentEntryCommand {
            identifier: identifier.to_string(),
        });
        running
            .chain
            .dispatch(&self.invocation_context(), &command)?
            .into_entry()
    }

    pub fn child_entries(&self, parent_identifier: &str) -> SearchResult<Vec<ContentEntry>> {
        let running = self.running()?;
        let command = Command::GetChildEntries(GetChildEntriesCommand {
            parent_identifier: parent_identifier.to_string(),
        });
        running
            .chain
            .dispatch(&self.invocation_context(), &command)?
            .into_entries()
    }

    pub fn unfiled_entries(&self) -> SearchResult<Vec<ContentEntry>> {
        let running = self.running()?;
        let command = Command::GetUnfiledEntries(GetUnfiledEntriesCommand);
        running
            .chain
            .dispatch(&self.invocation_context(), &command)?
            .into_entries()
    }

    /// Rebuilds the index from the content reader: every entry reachable
    /// from the root folder, plus unfiled entries. Returns the entry count.
    pub fn reindex(&self) -> SearchResult<usize> {
        let running = self.running()?;
        let reader = self.config.content_reader.clone().ok_or_else(|| {
            SearchError::configuration("reindex requires a content reader")
        })?;

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        let mut queue = VecDeque::new();

        if let Some(root) = reader.get_entry(&self.config.index.root_id)? {
            seen.insert(root.identifier.clone());
            queue.push_back(root.identifier.clone());
            entries.push(root);
        }
        while let Some(parent) = queue.pop_front() {
            for child in reader.child_entries(&parent)? {
                if seen.insert(child.identifier.clone()) {
                    queue.push_back(child.identifier.clone());
                    entries.push(child);
                }
            }
        }
        for entry in reader.unfiled_entries()? {
            if seen.insert(entry.identifier.clone()) {
                entries.push(entry);
            }
        }

        running.storage.clear()?;
        if let Some(cache) = &running.cache {
            cache.clear()?;
        }
        let modification = running
            .chain
            .dispatch(
                &self.invocation_context(),
                &Command::ModifyIndex(ModifyIndexCommand {
                    added: entries,
                    removed: Vec::new(),
                }),
            )?
            .into_modification()?;

        let count = modification.added.to_string();
        log_event_with_fields(Event::ReindexComplete, &[("entries", count.as_str())]);
        Ok(modification.added)
    }

    /// Rewrites the index journal as a snapshot
    pub fn compact(&self) -> SearchResult<()> {
        self.running()?.storage.compact()?;
        Ok(())
    }

    /// Number of indexed entries
    pub fn entry_count(&self) -> SearchResult<usize> {
        Ok(self.running()?.storage.entry_count()?)
    }
}
