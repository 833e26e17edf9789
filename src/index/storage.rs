//! Queryable index storage contract
//!
//! The query engine depends on this trait only. Implementations own their
//! read/write isolation: writers (`add_entries`, `remove_entries`) and readers
//! (`execute_query`) may be called concurrently.

use super::errors::IndexResult;
use super::native::{IndexHit, NativeQuery};
use crate::content::ContentEntry;
use crate::model::SelectorName;

pub trait QueryableIndexStorage: Send + Sync {
    /// Opens (or recovers) the storage. Idempotent.
    fn open(&self) -> IndexResult<()>;

    fn close(&self) -> IndexResult<()>;

    fn is_open(&self) -> bool;

    /// Adds or replaces entries by identifier; returns how many were written
    fn add_entries(&self, entries: Vec<ContentEntry>) -> IndexResult<usize>;

    /// Removes entries; returns how many existed
    fn remove_entries(&self, identifiers: &[String]) -> IndexResult<usize>;

    /// Removes every entry
    fn clear(&self) -> IndexResult<()>;

    /// Runs one selector's query. Hits are unsorted.
    fn execute_query(&self, query: &NativeQuery, selector: &SelectorName)
        -> IndexResult<Vec<IndexHit>>;

    fn get_entry(&self, identifier: &str) -> IndexResult<Option<ContentEntry>>;

    fn child_entries(&self, parent_identifier: &str) -> IndexResult<Vec<ContentEntry>>;

    fn unfiled_entries(&self) -> IndexResult<Vec<ContentEntry>>;

    fn entry_count(&self) -> IndexResult<usize>;

    /// Rewrites durable state into its most compact form
    fn compact(&self) -> IndexResult<()> {
        Ok(())
    }
}
