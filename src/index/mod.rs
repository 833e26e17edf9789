//! Queryable index storage
//!
//! The contract the query engine executes against, the storage-native query
//! form, the translator from constraint trees to that form, and an in-memory
//! implementation with an optional checksummed journal.

mod checksum;
mod errors;
mod fulltext;
mod journal;
mod memory;
mod native;
mod storage;
mod translator;

pub use errors::{IndexError, IndexResult};
pub use fulltext::{tokenize, FullTextExpression};
pub use journal::{JournalRecord, JOURNAL_FILE};
pub use memory::{InMemoryIndexStorage, IndexSettings};
pub use native::{FieldExpr, FolderRef, IndexHit, NativeFilter, NativeQuery};
pub use storage::QueryableIndexStorage;
pub use translator::{resolve_static, QueryTranslator};
