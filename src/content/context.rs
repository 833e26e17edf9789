//! Invocation context: per-execution collaborators

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::model::SelectorName;
use crate::schema::Schema;
use crate::search::SearchResult;
use crate::value::{NameConverter, PathSplitter, SlashSplitter, ToStringNameConverter};

/// Maps a table to the physical table names its selector covers
pub trait TableResolver: Send + Sync {
    fn resolve(
        &self,
        schema: &dyn Schema,
        converter: &dyn NameConverter,
        table: &SelectorName,
    ) -> SearchResult<Vec<String>>;
}

/// Resolves a table to itself and every subtable
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaTableResolver;

impl TableResolver for SchemaTableResolver {
    fn resolve(
        &self,
        schema: &dyn Schema,
        converter: &dyn NameConverter,
        table: &SelectorName,
    ) -> SearchResult<Vec<String>> {
        let names: BTreeSet<String> = schema
            .table_hierarchy(table)?
            .iter()
            .map(|t| converter.convert(&t.name))
            .collect();
        Ok(names.into_iter().collect())
    }
}

/// Resolves a table to itself only
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactTableResolver;

impl TableResolver for ExactTableResolver {
    fn resolve(
        &self,
        schema: &dyn Schema,
        converter: &dyn NameConverter,
        table: &SelectorName,
    ) -> SearchResult<Vec<String>> {
        Ok(vec![converter.convert(&schema.table(table)?.name)])
    }
}

/// Collaborators for one execution.
///
/// Cheap to clone; `derive()` gives each call its own invocation id.
#[derive(Clone)]
pub struct InvocationContext {
    id: Uuid,
    schema: Arc<dyn Schema>,
    name_converter: Arc<dyn NameConverter>,
    table_resolver: Arc<dyn TableResolver>,
    path_splitter: Arc<dyn PathSplitter>,
}

impl InvocationContext {
    /// Context with identity names, subtable-aware resolution and `/` paths
    pub fn new(schema: Arc<dyn Schema>) -> Self {
        Self {
            id: Uuid::new_v4(),
            schema,
            name_converter: Arc::new(ToStringNameConverter),
            table_resolver: Arc::new(SchemaTableResolver),
            path_splitter: Arc::new(SlashSplitter),
        }
    }

    pub fn with_name_converter(mut self, converter: Arc<dyn NameConverter>) -> Self {
        self.name_converter = converter;
        self
    }

    pub fn with_table_resolver(mut self, resolver: Arc<dyn TableResolver>) -> Self {
        self.table_resolver = resolver;
        self
    }

    pub fn with_path_splitter(mut self, splitter: Arc<dyn PathSplitter>) -> Self {
        self.path_splitter = splitter;
        self
    }

    /// Same collaborators, fresh invocation id
    pub fn derive(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            ..self.clone()
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn schema(&self) -> &dyn Schema {
        self.schema.as_ref()
    }

    pub fn name_converter(&self) -> &dyn NameConverter {
        self.name_converter.as_ref()
    }

    pub fn path_splitter(&self) -> &dyn PathSplitter {
        self.path_splitter.as_ref()
    }

    /// Storage name of a logical column or table name
    pub fn storage_name(&self, name: &str) -> String {
        self.name_converter.convert(name)
    }

    /// Physical tables covered by a schema table
    pub fn resolve_tables(&self, table: &SelectorName) -> SearchResult<Vec<String>> {
        self.table_resolver
            .resolve(self.schema.as_ref(), self.name_converter.as_ref(), table)
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::InMemorySchema;
    use crate::value::LowerCaseNameConverter;

    fn schema() -> Arc<dyn Schema> {
        Arc::new(
            InMemorySchema::builder()
                .add_table("Base")
                .add_subtable("Doc", "Base")
                .add_subtable("Note", "Doc")
                .add_table("Other")
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_schema_resolver_includes_subtables() {
        let ctx = InvocationContext::new(schema());
        let tables = ctx.resolve_tables(&SelectorName::new("Doc")).unwrap();
        assert_eq!(tables, vec!["Doc".to_string(), "Note".to_string()]);
    }

    #[test]
    fn test_exact_resolver() {
        let ctx = InvocationContext::new(schema())
            .with_table_resolver(Arc::new(ExactTableResolver))
            .with_name_converter(Arc::new(LowerCaseNameConverter));
        let tables = ctx.resolve_tables(&SelectorName::new("Doc")).unwrap();
        assert_eq!(tables, vec!["doc".to_string()]);
    }

    #[test]
    fn test_unknown_table() {
        let ctx = InvocationContext::new(schema());
        let err = ctx.resolve_tables(&SelectorName::new("Nope")).unwrap_err();
        assert!(err.is_table_doesnt_exist());
    }

    #[test]
    fn test_derive_changes_id() {
        let ctx = InvocationContext::new(schema());
        assert_ne!(ctx.id(), ctx.derive().id());
    }
}
