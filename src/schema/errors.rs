//! Schema error types

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Schema lookup and construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Selector does not name a table
    #[error("Table '{0}' doesn't exist")]
    TableDoesntExist(String),

    #[error("Table '{0}' is already defined")]
    DuplicateTable(String),

    #[error("Column '{column}' is already defined in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("Table '{table}' declares unknown parent table '{parent}'")]
    UnknownParent { table: String, parent: String },

    #[error("Table '{0}' is part of a parent cycle")]
    ParentCycle(String),

    #[error("Default ordering of table '{table}' references unknown column '{column}'")]
    UnknownOrderingColumn { table: String, column: String },

    #[error("Malformed schema at {path}: {reason}")]
    Malformed { path: String, reason: String },
}

impl SchemaError {
    pub fn table_doesnt_exist(name: impl Into<String>) -> Self {
        SchemaError::TableDoesntExist(name.into())
    }

    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::TableDoesntExist(_) => "SCHEMA_TABLE_NOT_FOUND",
            SchemaError::DuplicateTable(_) => "SCHEMA_DUPLICATE_TABLE",
            SchemaError::DuplicateColumn { .. } => "SCHEMA_DUPLICATE_COLUMN",
            SchemaError::UnknownParent { .. } => "SCHEMA_UNKNOWN_PARENT",
            SchemaError::ParentCycle(_) => "SCHEMA_PARENT_CYCLE",
            SchemaError::UnknownOrderingColumn { .. } => "SCHEMA_UNKNOWN_ORDERING_COLUMN",
            SchemaError::Malformed { .. } => "SCHEMA_MALFORMED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SchemaError::DuplicateColumn {
            table: "doc".into(),
            column: "title".into(),
        };
        assert_eq!(err.to_string(), "Column 'title' is already defined in table 'doc'");
        assert_eq!(err.code(), "SCHEMA_DUPLICATE_COLUMN");
    }
}
