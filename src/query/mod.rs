//! Query construction
//!
//! Two front ends produce the same query model:
//! - `QueryBuilder`: stage-typed fluent API for programmatic queries
//! - `parse_query`: the textual `SELECT ... FROM ... WHERE ...` grammar
//!
//! Neither consults the schema.

mod builder;
mod lexer;
mod parser;

pub use builder::{
    ComparisonBuilder, ConstraintBuilder, JoinBuilder, OperandBuilder, QueryBuilder,
    SourceBuilder,
};
pub use parser::parse_query;
