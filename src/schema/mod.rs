//! Schema subsystem
//!
//! Static description of the queryable tables (selectors) and their columns,
//! including the comparison operators each column admits.
//!
//! # Design Principles
//!
//! - Immutable after construction (builder, then frozen)
//! - Table and column names normalized by a pluggable `NameConverter`
//! - Subtables inherit their parent's columns
//! - Consulted at execution, never by the query builder

mod errors;
mod loader;
mod registry;
mod types;

pub use errors::{SchemaError, SchemaResult};
pub use loader::{SchemaDefinition, SchemaLoader};
pub use registry::{InMemorySchema, Schema, SchemaBuilder};
pub use types::{Column, DefaultOrdering, Table};
