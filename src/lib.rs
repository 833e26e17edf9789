//! cmis-search - schema-aware query engine for a content repository
//!
//! Queries are validated against a schema, routed through an interceptor
//! chain and executed per selector against a queryable index. Joins,
//! residual filtering, ordering and paging happen above the index.

pub mod cli;
pub mod content;
pub mod index;
pub mod model;
pub mod observability;
pub mod query;
pub mod result;
pub mod schema;
pub mod search;
pub mod value;
