//! Index interceptor: the leaf of every chain, backed by the storage

use std::sync::Arc;

use crate::content::command::{
    CommandOutput, ExecuteSelectorCommand, GetChildEntriesCommand, GetContentEntryCommand,
    GetUnfiledEntriesCommand, IndexModification, ModifyIndexCommand,
};
use crate::content::context::InvocationContext;
use crate::content::interceptor::{Interceptor, Next};
use crate::index::{QueryTranslator, QueryableIndexStorage};
use crate::result::ScoredRow;
use crate::search::SearchResult;

pub struct IndexInterceptor {
    storage: Arc<dyn QueryableIndexStorage>,
}

impl IndexInterceptor {
    pub fn new(storage: Arc<dyn QueryableIndexStorage>) -> Self {
        Self { storage }
    }
}

impl Interceptor for IndexInterceptor {
    fn name(&self) -> &'static str {
        "index"
    }

    fn visit_modify_index(
        &self,
        _ctx: &InvocationContext,
        command: &ModifyIndexCommand,
        _next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        let removed = self.storage.remove_entries(&command.removed)?;
        let added = self.storage.add_entries(command.added.clone())?;
        Ok(CommandOutput::Modified(IndexModification { added, removed }))
    }

    fn visit_execute_selector(
        &self,
        ctx: &InvocationContext,
        command: &ExecuteSelectorCommand,
        _next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        let name = command.selector.name();
        let native = QueryTranslator::new(ctx, name, &command.variables).translate(
            &command.selector.table,
            command.constraint.as_ref(),
            command.fields.as_deref(),
        )?;

        let rows = self
            .storage
            .execute_query(&native, name)?
            .into_iter()
            .map(|hit| ScoredRow::single(name.clone(), hit.into()))
            .collect();
        Ok(CommandOutput::Rows(rows))
    }

    fn visit_get_child_entries(
        &self,
        _ctx: &InvocationContext,
        command: &GetChildEntriesCommand,
        _next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        Ok(CommandOutput::Entries(
            self.storage.child_entries(&command.parent_identifier)?,
        ))
    }

    fn visit_get_content_entry(
        &self,
        _ctx: &InvocationContext,
        command: &GetContentEntryCommand,
        _next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        Ok(CommandOutput::Entry(self.storage.get_entry(&command.identifier)?))
    }

    fn visit_get_unfiled_entries(
        &self,
        _ctx: &InvocationContext,
        _command: &GetUnfiledEntriesCommand,
        _next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        Ok(CommandOutput::Entries(self.storage.unfiled_entries()?))
    }
}
