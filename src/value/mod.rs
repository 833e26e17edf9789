//! Values and naming helpers shared by the schema, the query model and the
//! index storage.
//!
//! - `Value`: typed literal / property value
//! - `ColumnType`: declared type of a schema column
//! - `NameConverter`: logical name → storage name
//! - `PathSplitter`: hierarchical path → segments

mod cast;
mod names;
mod path;
mod types;

pub use cast::{compare_values, LikePattern};
pub use names::{LowerCaseNameConverter, NameConverter, ToStringNameConverter};
pub use path::{PathSplitter, SlashSplitter};
pub use types::{ColumnType, Value};
