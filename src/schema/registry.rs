//! Schema registry
//!
//! `Schema` is the single source of truth for what is queryable. The query
//! engine consults it on every execution and never caches lookups per query,
//! so an implementation backed by mutable state makes schema changes visible
//! to subsequent queries.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::errors::{SchemaError, SchemaResult};
use super::types::{Column, DefaultOrdering, Table};
use crate::model::{Operator, Order, SelectorName};
use crate::value::{ColumnType, NameConverter, ToStringNameConverter};

/// Read-only schema lookup
pub trait Schema: Send + Sync {
    /// Table for a selector name
    fn table(&self, name: &SelectorName) -> SchemaResult<Arc<Table>>;

    /// All tables, in name order
    fn tables(&self) -> Vec<Arc<Table>>;

    /// Column of a table, applying the schema's name normalization
    fn column(&self, table: &SelectorName, column: &str) -> SchemaResult<Option<Column>>;

    /// The table and every table below it in the parent hierarchy
    fn table_hierarchy(&self, name: &SelectorName) -> SchemaResult<Vec<Arc<Table>>> {
        let root = self.table(name)?;
        let all = self.tables();

        let mut result = vec![root.clone()];
        let mut frontier = vec![root.name.clone()];
        while let Some(parent) = frontier.pop() {
            for table in &all {
                if table.parent.as_deref() == Some(parent.as_str()) {
                    frontier.push(table.name.clone());
                    result.push(table.clone());
                }
            }
        }
        Ok(result)
    }
}

/// Immutable in-memory schema, built with `InMemorySchema::builder()`
pub struct InMemorySchema {
    tables: BTreeMap<String, Arc<Table>>,
    name_converter: Arc<dyn NameConverter>,
}

impl InMemorySchema {
    /// Builder with identity name conversion
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new(Arc::new(ToStringNameConverter))
    }

    /// Builder normalizing table and column names with `converter`
    pub fn builder_with_converter(converter: Arc<dyn NameConverter>) -> SchemaBuilder {
        SchemaBuilder::new(converter)
    }
}

impl Schema for InMemorySchema {
    fn table(&self, name: &SelectorName) -> SchemaResult<Arc<Table>> {
        self.tables
            .get(&self.name_converter.convert(name.as_str()))
            .cloned()
            .ok_or_else(|| SchemaError::table_doesnt_exist(name.as_str()))
    }

    fn tables(&self) -> Vec<Arc<Table>> {
        self.tables.values().cloned().collect()
    }

    fn column(&self, table: &SelectorName, column: &str) -> SchemaResult<Option<Column>> {
        let table = self.table(table)?;
        let name = self.name_converter.convert(column);
        Ok(table.column(&name).cloned())
    }
}

/// Fluent schema builder.
///
/// Errors are recorded and reported by `build()`, so calls can be chained.
pub struct SchemaBuilder {
    tables: Vec<Table>,
    name_converter: Arc<dyn NameConverter>,
    error: Option<SchemaError>,
}

impl SchemaBuilder {
    fn new(name_converter: Arc<dyn NameConverter>) -> Self {
        Self {
            tables: Vec::new(),
            name_converter,
            error: None,
        }
    }

    fn fail(&mut self, error: SchemaError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        let name = self.name_converter.convert(name);
        self.tables.iter_mut().find(|t| t.name == name)
    }

    /// Adds a table with no parent
    pub fn add_table(self, name: &str) -> Self {
        self.add_table_definition(Table::new(name))
    }

    /// Adds a table inheriting the columns of `parent`
    pub fn add_subtable(self, name: &str, parent: &str) -> Self {
        let mut table = Table::new(name);
        table.parent = Some(parent.to_string());
        self.add_table_definition(table)
    }

    /// Adds a complete table definition (used by the file loader)
    pub fn add_table_definition(mut self, mut table: Table) -> Self {
        table.name = self.name_converter.convert(&table.name);
        table.parent = table.parent.map(|p| self.name_converter.convert(&p));

        if self.tables.iter().any(|t| t.name == table.name) {
            self.fail(SchemaError::DuplicateTable(table.name));
            return self;
        }

        let columns = std::mem::take(&mut table.columns);
        let name = table.name.clone();
        self.tables.push(table);
        for column in columns {
            self = self.add_column_definition(&name, column);
        }
        self
    }

    /// Adds a column to a previously added table
    pub fn add_column(
        self,
        table: &str,
        name: &str,
        column_type: ColumnType,
        orderable: bool,
        operators: &[Operator],
    ) -> Self {
        self.add_column_definition(table, Column::new(name, column_type, orderable, operators))
    }

    fn add_column_definition(mut self, table: &str, mut column: Column) -> Self {
        column.name = self.name_converter.convert(&column.name);
        let table_name = self.name_converter.convert(table);

        let error = match self.table_mut(table) {
            None => Some(SchemaError::table_doesnt_exist(table_name)),
            Some(t) if t.column(&column.name).is_some() => Some(SchemaError::DuplicateColumn {
                table: table_name,
                column: column.name,
            }),
            Some(t) => {
                t.columns.push(column);
                None
            }
        };
        if let Some(error) = error {
            self.fail(error);
        }
        self
    }

    /// Appends a default ordering item to a table
    pub fn default_ordering(mut self, table: &str, column: &str, order: Order) -> Self {
        let column = self.name_converter.convert(column);
        let table_name = self.name_converter.convert(table);
        match self.table_mut(table) {
            Some(t) => t.default_ordering.push(DefaultOrdering { column, order }),
            None => self.fail(SchemaError::table_doesnt_exist(table_name)),
        }
        self
    }

    /// Resolves inheritance and freezes the schema
    pub fn build(self) -> SchemaResult<InMemorySchema> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let declared: BTreeMap<String, Table> = self
            .tables
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();

        let mut tables = BTreeMap::new();
        for name in declared.keys() {
            let table = resolve_inherited(name, &declared)?;
            for ordering in &table.default_ordering {
                if table.column(&ordering.column).is_none() {
                    return Err(SchemaError::UnknownOrderingColumn {
                        table: table.name.clone(),
                        column: ordering.column.clone(),
                    });
                }
            }
            tables.insert(name.clone(), Arc::new(table));
        }

        Ok(InMemorySchema {
            tables,
            name_converter: self.name_converter,
        })
    }
}

/// Produces a table whose columns are the ancestors' columns followed by its
/// own; a column redeclared by a descendant replaces the inherited one.
fn resolve_inherited(name: &str, declared: &BTreeMap<String, Table>) -> SchemaResult<Table> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut current = name.to_string();

    loop {
        if !seen.insert(current.clone()) {
            return Err(SchemaError::ParentCycle(name.to_string()));
        }
        let table = declared
            .get(&current)
            .ok_or_else(|| SchemaError::table_doesnt_exist(&current))?;
        chain.push(table);
        match &table.parent {
            Some(parent) if !declared.contains_key(parent) => {
                return Err(SchemaError::UnknownParent {
                    table: table.name.clone(),
                    parent: parent.clone(),
                })
            }
            Some(parent) => current = parent.clone(),
            None => break,
        }
    }

    let mut columns: Vec<Column> = Vec::new();
    let mut default_ordering = Vec::new();
    for table in chain.iter().rev() {
        for column in &table.columns {
            match columns.iter_mut().find(|c| c.name == column.name) {
                Some(existing) => *existing = column.clone(),
                None => columns.push(column.clone()),
            }
        }
        if !table.default_ordering.is_empty() {
            default_ordering = table.default_ordering.clone();
        }
    }

    let own = chain[0];
    Ok(Table {
        name: own.name.clone(),
        parent: own.parent.clone(),
        columns,
        default_ordering,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::LowerCaseNameConverter;

    fn sample() -> InMemorySchema {
        InMemorySchema::builder()
            .add_table("base")
            .add_column("base", "id", ColumnType::Id, true, &[Operator::EqualTo])
            .default_ordering("base", "id", Order::Ascending)
            .add_subtable("doc", "base")
            .add_column("doc", "title", ColumnType::String, true, &[Operator::Like])
            .build()
            .unwrap()
    }

    #[test]
    fn test_unknown_table() {
        let schema = sample();
        let err = schema.table(&SelectorName::new("nope")).unwrap_err();
        assert_eq!(err, SchemaError::TableDoesntExist("nope".into()));
    }

    #[test]
    fn test_inherited_columns_and_ordering() {
        let schema = sample();
        let doc = schema.table(&SelectorName::new("doc")).unwrap();
        let names: Vec<_> = doc.column_names().collect();
        assert_eq!(names, vec!["id", "title"]);
        assert_eq!(doc.default_ordering[0].column, "id");
    }

    #[test]
    fn test_hierarchy_includes_subtables() {
        let schema = sample();
        let names: Vec<_> = schema
            .table_hierarchy(&SelectorName::new("base"))
            .unwrap()
            .iter()
            .map(|t| t.name.clone())
            .collect();
        assert_eq!(names, vec!["base", "doc"]);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let result = InMemorySchema::builder()
            .add_table("t")
            .add_column("t", "c", ColumnType::String, true, &[])
            .add_column("t", "c", ColumnType::String, true, &[])
            .build();
        assert!(matches!(result, Err(SchemaError::DuplicateColumn { .. })));
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let result = InMemorySchema::builder().add_table("t").add_table("t").build();
        assert_eq!(result.err(), Some(SchemaError::DuplicateTable("t".into())));
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let result = InMemorySchema::builder().add_subtable("t", "missing").build();
        assert!(matches!(result, Err(SchemaError::UnknownParent { .. })));
    }

    #[test]
    fn test_parent_cycle_rejected() {
        let result = InMemorySchema::builder()
            .add_subtable("a", "b")
            .add_subtable("b", "a")
            .build();
        assert!(matches!(result, Err(SchemaError::ParentCycle(_))));
    }

    #[test]
    fn test_case_normalized_lookup() {
        let schema = InMemorySchema::builder_with_converter(Arc::new(LowerCaseNameConverter))
            .add_table("Document")
            .add_column("Document", "Title", ColumnType::String, true, &[Operator::EqualTo])
            .build()
            .unwrap();

        assert!(schema.table(&SelectorName::new("DOCUMENT")).is_ok());
        let column = schema.column(&SelectorName::new("document"), "TITLE").unwrap();
        assert_eq!(column.map(|c| c.name), Some("title".to_string()));
    }
}
