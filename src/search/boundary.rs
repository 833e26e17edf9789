//! Async boundary helper
//!
//! The engine has no cancellation: a query runs to completion or fails.
//! Callers that need a deadline run the query on the blocking pool and stop
//! waiting when the deadline passes. The abandoned query finishes in the
//! background and its result is discarded.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::model::Query;
use crate::result::{ItemsList, Row};
use crate::value::Value;

use super::errors::{SearchError, SearchResult};
use super::service::SearchService;

/// Executes `query` on tokio's blocking pool, giving up after `timeout`
pub async fn execute_with_timeout(
    service: Arc<SearchService>,
    query: Query,
    variables: BTreeMap<String, Value>,
    timeout: Duration,
) -> SearchResult<ItemsList<Row>> {
    let task = tokio::task::spawn_blocking(move || service.execute_with_variables(&query, &variables));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(SearchError::execution_caused_by(
            "Query task did not complete",
            join_error,
        )),
        Err(_) => Err(SearchError::execution(format!(
            "Query abandoned after {} ms",
            timeout.as_millis()
        ))),
    }
}
