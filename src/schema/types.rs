//! Schema type definitions
//!
//! A schema is a set of tables (selectors). Each table is an ordered list of
//! columns; each column declares its value type, whether it can be used for
//! ordering, and the comparison operators it admits.

use serde::{Deserialize, Serialize};

use crate::model::{Operator, Order};
use crate::value::ColumnType;

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Whether ORDER BY may use this column
    #[serde(default = "default_orderable")]
    pub orderable: bool,
    /// Admissible comparison operators
    pub operators: Vec<Operator>,
}

fn default_orderable() -> bool {
    true
}

impl Column {
    pub fn new(
        name: impl Into<String>,
        column_type: ColumnType,
        orderable: bool,
        operators: &[Operator],
    ) -> Self {
        Self {
            name: name.into(),
            column_type,
            orderable,
            operators: operators.to_vec(),
        }
    }

    /// Operators a constraint on this column may use
    pub fn available_query_operators(&self) -> &[Operator] {
        &self.operators
    }

    pub fn supports(&self, operator: Operator) -> bool {
        self.operators.contains(&operator)
    }
}

/// Default ordering item declared by a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultOrdering {
    pub column: String,
    pub order: Order,
}

/// Table definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    /// Parent table; the table inherits the parent's columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Ordering used when a query has no ORDER BY
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_ordering: Vec<DefaultOrdering>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            columns: Vec::new(),
            default_ordering: Vec::new(),
        }
    }

    /// Column by exact (already converted) name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_operator_policy() {
        let column = Column::new(
            "integerColumn",
            ColumnType::Integer,
            true,
            &[Operator::EqualTo, Operator::LessThan],
        );
        assert!(column.supports(Operator::EqualTo));
        assert!(!column.supports(Operator::Like));
        assert_eq!(column.available_query_operators().len(), 2);
    }

    #[test]
    fn test_table_from_json() {
        let json = r#"{
            "name": "cmis:document",
            "parent": "cmis:base",
            "columns": [
                {"name": "cmis:name", "type": "string", "operators": ["=", "LIKE"]}
            ],
            "default_ordering": [{"column": "cmis:name", "order": "desc"}]
        }"#;
        let table: Table = serde_json::from_str(json).unwrap();
        assert_eq!(table.parent.as_deref(), Some("cmis:base"));
        assert!(table.column("cmis:name").unwrap().orderable);
        assert_eq!(table.default_ordering[0].order, Order::Descending);
    }
}
