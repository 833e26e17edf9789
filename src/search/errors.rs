//! Search service error root
//!
//! Every failure the query subsystem reports is a `SearchError`, so callers
//! can match broadly or on one variant. Nothing is retried by the core.

use thiserror::Error;

use crate::index::IndexError;
use crate::schema::SchemaError;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum SearchError {
    /// Operator not permitted for a column, unknown column, malformed
    /// predicate or query text
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Selector does not name a table
    #[error("Table '{0}' doesn't exist")]
    TableDoesntExist(String),

    /// Index, join or sort failure; `source` keeps the original cause
    #[error("Query execution failed: {message}")]
    QueryExecution {
        message: String,
        #[source]
        source: Option<BoxedCause>,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Operation not allowed in the service's current lifecycle state
    #[error("Search service state error: {0}")]
    ServiceState(String),
}

impl SearchError {
    pub fn invalid_query(message: impl Into<String>) -> Self {
        SearchError::InvalidQuery(message.into())
    }

    pub fn execution(message: impl Into<String>) -> Self {
        SearchError::QueryExecution {
            message: message.into(),
            source: None,
        }
    }

    pub fn execution_caused_by(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SearchError::QueryExecution {
            message: message.into(),
            source: Some(Box::new(cause)),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        SearchError::Configuration(message.into())
    }

    pub fn service_state(message: impl Into<String>) -> Self {
        SearchError::ServiceState(message.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SearchError::InvalidQuery(_) => "SEARCH_INVALID_QUERY",
            SearchError::TableDoesntExist(_) => "SEARCH_TABLE_NOT_FOUND",
            SearchError::QueryExecution { .. } => "SEARCH_EXECUTION_FAILED",
            SearchError::Configuration(_) => "SEARCH_CONFIGURATION_ERROR",
            SearchError::ServiceState(_) => "SEARCH_SERVICE_STATE",
        }
    }

    /// Always false: retry policy belongs to the caller
    pub fn is_retryable(&self) -> bool {
        false
    }

    pub fn is_invalid_query(&self) -> bool {
        matches!(self, SearchError::InvalidQuery(_))
    }

    pub fn is_table_doesnt_exist(&self) -> bool {
        matches!(self, SearchError::TableDoesntExist(_))
    }
}

impl From<SchemaError> for SearchError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::TableDoesntExist(name) => SearchError::TableDoesntExist(name),
            other => SearchError::Configuration(other.to_string()),
        }
    }
}

impl From<IndexError> for SearchError {
    fn from(err: IndexError) -> Self {
        SearchError::QueryExecution {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_codes() {
        assert_eq!(SearchError::invalid_query("x").code(), "SEARCH_INVALID_QUERY");
        assert_eq!(
            SearchError::TableDoesntExist("t".into()).code(),
            "SEARCH_TABLE_NOT_FOUND"
        );
        assert_eq!(SearchError::execution("x").code(), "SEARCH_EXECUTION_FAILED");
        assert!(!SearchError::execution("x").is_retryable());
    }

    #[test]
    fn test_schema_error_conversion() {
        let err: SearchError = SchemaError::table_doesnt_exist("missing").into();
        assert!(err.is_table_doesnt_exist());
        assert_eq!(err.to_string(), "Table 'missing' doesn't exist");
    }

    #[test]
    fn test_index_error_keeps_source() {
        let err: SearchError = IndexError::Closed.into();
        assert_eq!(err.code(), "SEARCH_EXECUTION_FAILED");
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), IndexError::Closed.to_string());
    }
}
