//! Result assembly: scored rows, join collection, post-join filtering,
//! sorting and paging containers

mod filter;
mod join;
mod row;
mod sorter;

pub use filter::{leaf_selector, RowFilter};
pub use join::{HashJoinCollector, JoinCollector, JoinKey};
pub use row::{ItemsList, Row, RowValue, ScoredRow, SelectorRow};
pub use sorter::{
    OrderingSorter, ResultSorter, ResultSorterFactory, SchemaResultSorterFactory, SortExpr, SortKey,
};
