//! Interceptor chain
//!
//! A command enters the first interceptor; each interceptor handles it,
//! forwards it with `next.proceed`, or forwards a different command with
//! `next.dispatch` and post-processes the result. A command that falls off
//! the end of the chain is an execution error.

use std::sync::Arc;

use super::command::{
    Command, CommandOutput, ExecuteSelectorCommand, GetChildEntriesCommand,
    GetContentEntryCommand, GetUnfiledEntriesCommand, ModifyIndexCommand, ProcessQueryCommand,
};
use super::context::InvocationContext;
use crate::search::{SearchError, SearchResult};

/// One pipeline stage. Every visit method forwards by default.
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &'static str;

    fn visit_modify_index(
        &self,
        ctx: &InvocationContext,
        _command: &ModifyIndexCommand,
        next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        next.proceed(ctx)
    }

    fn visit_execute_selector(
        &self,
        ctx: &InvocationContext,
        _command: &ExecuteSelectorCommand,
        next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        next.proceed(ctx)
    }

    fn visit_process_query(
        &self,
        ctx: &InvocationContext,
        _command: &ProcessQueryCommand,
        next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        next.proceed(ctx)
    }

    fn visit_get_child_entries(
        &self,
        ctx: &InvocationContext,
        _command: &GetChildEntriesCommand,
        next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        next.proceed(ctx)
    }

    fn visit_get_content_entry(
        &self,
        ctx: &InvocationContext,
        _command: &GetContentEntryCommand,
        next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        next.proceed(ctx)
    }

    fn visit_get_unfiled_entries(
        &self,
        ctx: &InvocationContext,
        _command: &GetUnfiledEntriesCommand,
        next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        next.proceed(ctx)
    }
}

/// The rest of the chain, as seen by one interceptor
#[derive(Clone, Copy)]
pub struct Next<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    command: &'a Command,
}

impl<'a> Next<'a> {
    /// Forwards the current command
    pub fn proceed(self, ctx: &InvocationContext) -> SearchResult<CommandOutput> {
        dispatch(self.interceptors, ctx, self.command)
    }

    /// Sends another command down the rest of the chain
    pub fn dispatch(self, ctx: &InvocationContext, command: &Command) -> SearchResult<CommandOutput> {
        dispatch(self.interceptors, ctx, command)
    }

    pub fn command(&self) -> &'a Command {
        self.command
    }
}

fn dispatch(
    interceptors: &[Arc<dyn Interceptor>],
    ctx: &InvocationContext,
    command: &Command,
) -> SearchResult<CommandOutput> {
    match interceptors.split_first() {
        Some((first, rest)) => command.accept(
            first.as_ref(),
            ctx,
            Next {
                interceptors: rest,
                command,
            },
        ),
        None => Err(SearchError::execution(format!(
            "No interceptor handled the {} command",
            command.name()
        ))),
    }
}

/// Immutable, ordered interceptor sequence
#[derive(Clone)]
pub struct InterceptorChain {
    interceptors: Arc<[Arc<dyn Interceptor>]>,
}

impl InterceptorChain {
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self {
            interceptors: interceptors.into(),
        }
    }

    pub fn dispatch(&self, ctx: &InvocationContext, command: &Command) -> SearchResult<CommandOutput> {
        dispatch(&self.interceptors, ctx, command)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentEntry, IndexModification};
    use crate::schema::{InMemorySchema, Schema};
    use std::sync::Mutex;

    fn ctx() -> InvocationContext {
        let schema: Arc<dyn Schema> = Arc::new(InMemorySchema::builder().build().unwrap());
        InvocationContext::new(schema)
    }

    /// Records the order in which it is visited
    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Interceptor for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn visit_get_content_entry(
            &self,
            ctx: &InvocationContext,
            _command: &GetContentEntryCommand,
            next: Next<'_>,
        ) -> SearchResult<CommandOutput> {
            self.log.lock().unwrap().push(self.name);
            next.proceed(ctx)
        }
    }

    /// Leaf answering entry lookups and counting modifications
    struct Leaf;

    impl Interceptor for Leaf {
        fn name(&self) -> &'static str {
            "leaf"
        }

        fn visit_get_content_entry(
            &self,
            _ctx: &InvocationContext,
            command: &GetContentEntryCommand,
            _next: Next<'_>,
        ) -> SearchResult<CommandOutput> {
            Ok(CommandOutput::Entry(Some(ContentEntry::new(
                command.identifier.clone(),
                "doc",
            ))))
        }

        fn visit_modify_index(
            &self,
            _ctx: &InvocationContext,
            command: &ModifyIndexCommand,
            _next: Next<'_>,
        ) -> SearchResult<CommandOutput> {
            Ok(CommandOutput::Modified(IndexModification {
                added: command.added.len(),
                removed: command.removed.len(),
            }))
        }
    }

    /// Rewrites a lookup into a modification further down the chain
    struct Rewriter;

    impl Interceptor for Rewriter {
        fn name(&self) -> &'static str {
            "rewriter"
        }

        fn visit_get_unfiled_entries(
            &self,
            ctx: &InvocationContext,
            _command: &GetUnfiledEntriesCommand,
            next: Next<'_>,
        ) -> SearchResult<CommandOutput> {
            let modification = next
                .dispatch(
                    ctx,
                    &Command::ModifyIndex(ModifyIndexCommand {
                        added: vec![],
                        removed: vec!["x".into()],
                    }),
                )?
                .into_modification()?;
            Ok(CommandOutput::Entries(vec![ContentEntry::new(
                modification.removed.to_string(),
                "count",
            )]))
        }
    }

    #[test]
    fn test_visit_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = InterceptorChain::new(vec![
            Arc::new(Recorder {
                name: "first",
                log: log.clone(),
            }),
            Arc::new(Recorder {
                name: "second",
                log: log.clone(),
            }),
            Arc::new(Leaf),
        ]);

        let entry = chain
            .dispatch(
                &ctx(),
                &Command::GetContentEntry(GetContentEntryCommand {
                    identifier: "doc-1".into(),
                }),
            )
            .unwrap()
            .into_entry()
            .unwrap()
            .unwrap();

        assert_eq!(entry.identifier, "doc-1");
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(chain.names(), vec!["first", "second", "leaf"]);
    }

    #[test]
    fn test_unhandled_command_fails() {
        let chain = InterceptorChain::new(vec![Arc::new(Leaf)]);
        let err = chain
            .dispatch(&ctx(), &Command::GetUnfiledEntries(GetUnfiledEntriesCommand))
            .unwrap_err();
        assert_eq!(err.code(), "SEARCH_EXECUTION_FAILED");
        assert!(err.to_string().contains("GetUnfiledEntries"));
    }

    #[test]
    fn test_dispatch_new_command_downstream() {
        let chain = InterceptorChain::new(vec![Arc::new(Rewriter), Arc::new(Leaf)]);
        let entries = chain
            .dispatch(&ctx(), &Command::GetUnfiledEntries(GetUnfiledEntriesCommand))
            .unwrap()
            .into_entries()
            .unwrap();
        assert_eq!(entries[0].identifier, "1");
    }

    #[test]
    fn test_output_mismatch_is_an_error() {
        let err = CommandOutput::Rows(vec![]).into_entry().unwrap_err();
        assert!(err.to_string().contains("rows"));
    }
}
