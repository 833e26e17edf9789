//! Query Model
//!
//! Immutable representation of a built or parsed query: source (selectors and
//! joins), projected columns, constraint tree, orderings and paging.
//!
//! The model is purely structural. Nothing here checks that a selector
//! exists or that an operator is admissible for a column; that happens at
//! execution time against the live schema.

mod column;
mod constraint;
mod limit;
mod operand;
mod ordering;
mod query;
mod source;

pub use column::Column;
pub use constraint::{Comparison, Constraint, FullTextSearch, Location, Operator};
pub use limit::Limit;
pub use operand::{DynamicOperand, StaticOperand};
pub use ordering::{Order, Ordering};
pub use query::Query;
pub use source::{Join, JoinCondition, JoinType, Selector, SelectorName, Source};
