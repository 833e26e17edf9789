//! Content reader interceptor
//!
//! Answers entry lookups from the `ContentReader`, and on the index-modify
//! path fills in the full-text body of entries that arrive without one.

use std::sync::Arc;

use crate::content::command::{
    Command, CommandOutput, GetChildEntriesCommand, GetContentEntryCommand,
    GetUnfiledEntriesCommand, ModifyIndexCommand,
};
use crate::content::context::InvocationContext;
use crate::content::interceptor::{Interceptor, Next};
use crate::content::reader::ContentReader;
use crate::search::SearchResult;

pub struct ContentReaderInterceptor {
    reader: Arc<dyn ContentReader>,
}

impl ContentReaderInterceptor {
    pub fn new(reader: Arc<dyn ContentReader>) -> Self {
        Self { reader }
    }
}

impl Interceptor for ContentReaderInterceptor {
    fn name(&self) -> &'static str {
        "content-reader"
    }

    fn visit_modify_index(
        &self,
        ctx: &InvocationContext,
        command: &ModifyIndexCommand,
        next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        if command.added.iter().all(|e| e.content.is_some()) {
            return next.proceed(ctx);
        }

        let mut hydrated = command.clone();
        for entry in hydrated.added.iter_mut().filter(|e| e.content.is_none()) {
            entry.content = self.reader.read_text(&entry.identifier)?;
        }
        next.dispatch(ctx, &Command::ModifyIndex(hydrated))
    }

    fn visit_get_content_entry(
        &self,
        _ctx: &InvocationContext,
        command: &GetContentEntryCommand,
        _next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        Ok(CommandOutput::Entry(self.reader.get_entry(&command.identifier)?))
    }

    fn visit_get_child_entries(
        &self,
        _ctx: &InvocationContext,
        command: &GetChildEntriesCommand,
        _next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        Ok(CommandOutput::Entries(
            self.reader.child_entries(&command.parent_identifier)?,
        ))
    }

    fn visit_get_unfiled_entries(
        &self,
        _ctx: &InvocationContext,
        _command: &GetUnfiledEntriesCommand,
        _next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        Ok(CommandOutput::Entries(self.reader.unfiled_entries()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::command::IndexModification;
    use crate::content::entry::ContentEntry;
    use crate::content::interceptor::InterceptorChain;
    use crate::content::reader::InMemoryContentReader;
    use crate::schema::{InMemorySchema, Schema};
    use std::sync::Mutex;

    /// Keeps the entries of the last modification it received
    #[derive(Default)]
    struct Sink {
        received: Mutex<Vec<ContentEntry>>,
    }

    impl Interceptor for Sink {
        fn name(&self) -> &'static str {
            "sink"
        }

        fn visit_modify_index(
            &self,
            _ctx: &InvocationContext,
            command: &ModifyIndexCommand,
            _next: Next<'_>,
        ) -> SearchResult<CommandOutput> {
            *self.received.lock().unwrap() = command.added.clone();
            Ok(CommandOutput::Modified(IndexModification {
                added: command.added.len(),
                removed: command.removed.len(),
            }))
        }
    }

    fn setup() -> (InterceptorChain, Arc<Sink>, InvocationContext) {
        let reader = Arc::new(InMemoryContentReader::with_entries(
            "root",
            vec![
                ContentEntry::new("root", "folder"),
                ContentEntry::new("d1", "doc")
                    .with_parent("root")
                    .with_content("stored body"),
            ],
        ));
        let sink = Arc::new(Sink::default());
        let interceptors: Vec<Arc<dyn Interceptor>> =
            vec![Arc::new(ContentReaderInterceptor::new(reader)), sink.clone()];
        let chain = InterceptorChain::new(interceptors);
        let schema: Arc<dyn Schema> = Arc::new(InMemorySchema::builder().build().unwrap());
        (chain, sink, InvocationContext::new(schema))
    }

    #[test]
    fn test_missing_content_is_hydrated() {
        let (chain, sink, ctx) = setup();
        let command = Command::ModifyIndex(ModifyIndexCommand {
            added: vec![
                ContentEntry::new("d1", "doc"),
                ContentEntry::new("d2", "doc").with_content("own body"),
            ],
            removed: vec![],
        });
        chain.dispatch(&ctx, &command).unwrap();

        let received = sink.received.lock().unwrap();
        assert_eq!(received[0].content.as_deref(), Some("stored body"));
        assert_eq!(received[1].content.as_deref(), Some("own body"));
    }

    #[test]
    fn test_reads_answered_by_reader() {
        let (chain, _sink, ctx) = setup();

        let entry = chain
            .dispatch(
                &ctx,
                &Command::GetContentEntry(GetContentEntryCommand {
                    identifier: "d1".into(),
                }),
            )
            .unwrap()
            .into_entry()
            .unwrap();
        assert_eq!(entry.map(|e| e.identifier), Some("d1".to_string()));

        let children = chain
            .dispatch(
                &ctx,
                &Command::GetChildEntries(GetChildEntriesCommand {
                    parent_identifier: "root".into(),
                }),
            )
            .unwrap()
            .into_entries()
            .unwrap();
        assert_eq!(children.len(), 1);

        let unfiled = chain
            .dispatch(&ctx, &Command::GetUnfiledEntries(GetUnfiledEntriesCommand))
            .unwrap()
            .into_entries()
            .unwrap();
        assert!(unfiled.is_empty());
    }
}
