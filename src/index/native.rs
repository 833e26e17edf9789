//! Storage-native query form
//!
//! What the translator produces from a selector's constraint and what a
//! `QueryableIndexStorage` executes. Names here are storage names (already
//! passed through the name converter) and bind variables are resolved.

use std::collections::BTreeMap;

use crate::model::Operator;
use crate::value::Value;

/// Per-entry value a term compares against
#[derive(Debug, Clone, PartialEq)]
pub enum FieldExpr {
    Property(String),
    Length(Box<FieldExpr>),
    LowerCase(Box<FieldExpr>),
    UpperCase(Box<FieldExpr>),
    /// Full-text relevance of the entry within this query
    Score,
}

/// Folder reference with the path already split into segments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FolderRef {
    Path(Vec<String>),
    Identifier(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NativeFilter {
    MatchAll,
    And(Vec<NativeFilter>),
    Or(Vec<NativeFilter>),
    Not(Box<NativeFilter>),
    /// True when any value of the field satisfies the comparison
    Term {
        field: FieldExpr,
        operator: Operator,
        value: Value,
    },
    Exists {
        field: String,
    },
    FullText {
        field: Option<String>,
        expression: String,
    },
    ChildOf(FolderRef),
    DescendantOf(FolderRef),
}

impl NativeFilter {
    /// Visits every node, parents first
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a NativeFilter)) {
        visit(self);
        match self {
            NativeFilter::And(parts) | NativeFilter::Or(parts) => {
                for part in parts {
                    part.walk(visit);
                }
            }
            NativeFilter::Not(inner) => inner.walk(visit),
            _ => {}
        }
    }
}

/// One selector's query against the storage
#[derive(Debug, Clone, PartialEq)]
pub struct NativeQuery {
    /// Physical tables searched
    pub tables: Vec<String>,
    pub filter: NativeFilter,
    /// Fields returned with each hit; `None` returns all of them
    pub fields: Option<Vec<String>>,
}

/// One matching entry
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub identifier: String,
    pub score: f64,
    pub values: BTreeMap<String, Vec<Value>>,
}
