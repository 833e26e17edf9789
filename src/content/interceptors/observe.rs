//! Observation interceptor
//!
//! First in every chain. Logs each command with its invocation id, duration
//! and outcome, and feeds the metrics registry.

use std::sync::Arc;

use crate::content::command::{
    CommandOutput, ExecuteSelectorCommand, GetChildEntriesCommand, GetContentEntryCommand,
    GetUnfiledEntriesCommand, ModifyIndexCommand, ProcessQueryCommand,
};
use crate::content::context::InvocationContext;
use crate::content::interceptor::{Interceptor, Next};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry, ObservationScope};
use crate::search::{SearchError, SearchResult};

pub struct ObserveInterceptor {
    metrics: Arc<MetricsRegistry>,
}

impl ObserveInterceptor {
    pub fn new(metrics: Arc<MetricsRegistry>) -> Self {
        Self { metrics }
    }

    fn observe(&self, ctx: &InvocationContext, next: Next<'_>) -> SearchResult<CommandOutput> {
        let command = next.command().name();
        let invocation = ctx.id().to_string();
        self.metrics.increment_commands_dispatched();

        let scope = ObservationScope::with_fields(
            "COMMAND",
            &[("command", command), ("invocation_id", &invocation)],
        );
        match next.proceed(ctx) {
            Ok(output) => {
                self.record_success(&output, &invocation);
                scope.complete_with_fields(&[("outcome", "completed")]);
                Ok(output)
            }
            Err(err) => {
                self.record_failure(command, &err, &invocation);
                scope.fail(&err.to_string());
                Err(err)
            }
        }
    }

    fn record_success(&self, output: &CommandOutput, invocation: &str) {
        match output {
            CommandOutput::Items(items) => {
                self.metrics.increment_queries_executed();
                self.metrics.add_rows_returned(items.len() as u64);
                let rows = items.len().to_string();
                let total = items.num_items.to_string();
                log_event_with_fields(
                    Event::QueryExecuted,
                    &[("invocation_id", invocation), ("rows", &rows), ("total", &total)],
                );
            }
            CommandOutput::Modified(modification) => {
                self.metrics.add_entries_indexed(modification.added as u64);
                self.metrics.add_entries_removed(modification.removed as u64);
                let added = modification.added.to_string();
                let removed = modification.removed.to_string();
                log_event_with_fields(
                    Event::IndexModified,
                    &[("added", &added), ("invocation_id", invocation), ("removed", &removed)],
                );
            }
            _ => {}
        }
    }

    fn record_failure(&self, command: &str, err: &SearchError, invocation: &str) {
        let message = err.to_string();
        let fields: [(&str, &str); 4] = [
            ("code", err.code()),
            ("command", command),
            ("invocation_id", invocation),
            ("message", message.as_str()),
        ];
        let rejected = matches!(
            err,
            SearchError::InvalidQuery(_) | SearchError::TableDoesntExist(_)
        );
        if command == "ProcessQuery" && rejected {
            self.metrics.increment_queries_rejected();
            log_event_with_fields(Event::QueryRejected, &fields);
        } else {
            if command == "ProcessQuery" {
                self.metrics.increment_queries_failed();
            }
            log_event_with_fields(Event::CommandFailed, &fields);
        }
    }
}

impl Interceptor for ObserveInterceptor {
    fn name(&self) -> &'static str {
        "observe"
    }

    fn visit_modify_index(
        &self,
        ctx: &InvocationContext,
        _command: &ModifyIndexCommand,
        next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        self.observe(ctx, next)
    }

    fn visit_execute_selector(
        &self,
        ctx: &InvocationContext,
        _command: &ExecuteSelectorCommand,
        next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        self.observe(ctx, next)
    }

    fn visit_process_query(
        &self,
        ctx: &InvocationContext,
        _command: &ProcessQueryCommand,
        next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        self.observe(ctx, next)
    }

    fn visit_get_child_entries(
        &self,
        ctx: &InvocationContext,
        _command: &GetChildEntriesCommand,
        next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        self.observe(ctx, next)
    }

    fn visit_get_content_entry(
        &self,
        ctx: &InvocationContext,
        _command: &GetContentEntryCommand,
        next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        self.observe(ctx, next)
    }

    fn visit_get_unfiled_entries(
        &self,
        ctx: &InvocationContext,
        _command: &GetUnfiledEntriesCommand,
        next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        self.observe(ctx, next)
    }
}
