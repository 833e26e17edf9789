//! Scored rows, projected rows and paged result lists

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::index::IndexHit;
use crate::model::SelectorName;
use crate::value::Value;

/// One selector's entry inside a row
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorRow {
    pub identifier: String,
    pub score: f64,
    /// Values keyed by storage field name
    pub values: BTreeMap<String, Vec<Value>>,
}

impl From<IndexHit> for SelectorRow {
    fn from(hit: IndexHit) -> Self {
        Self {
            identifier: hit.identifier,
            score: hit.score,
            values: hit.values,
        }
    }
}

/// Intermediate result tuple.
///
/// A single-selector query yields one selector per row; a join yields one
/// per joined selector. Selectors on the null side of an outer join are
/// absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRow {
    pub selectors: BTreeMap<SelectorName, SelectorRow>,
    /// Sum of the present selectors' scores
    pub score: f64,
}

impl ScoredRow {
    pub fn single(selector: SelectorName, row: SelectorRow) -> Self {
        let score = row.score;
        let mut selectors = BTreeMap::new();
        selectors.insert(selector, row);
        Self { selectors, score }
    }

    /// Combines two rows; `None` sides contribute nothing
    pub fn merge(left: Option<&ScoredRow>, right: Option<&ScoredRow>) -> Self {
        let mut selectors = BTreeMap::new();
        for side in [left, right].into_iter().flatten() {
            for (name, row) in &side.selectors {
                selectors.insert(name.clone(), row.clone());
            }
        }
        let score = selectors.values().map(|r| r.score).sum();
        Self { selectors, score }
    }

    pub fn selector(&self, name: &SelectorName) -> Option<&SelectorRow> {
        self.selectors.get(name)
    }

    pub fn identifier(&self, name: &SelectorName) -> Option<&str> {
        self.selectors.get(name).map(|r| r.identifier.as_str())
    }

    /// Values of a storage field; empty when unset or the selector is absent
    pub fn values(&self, selector: &SelectorName, field: &str) -> &[Value] {
        self.selectors
            .get(selector)
            .and_then(|r| r.values.get(field))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// One projected column of a result row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowValue {
    pub name: String,
    /// Empty when the column is unset
    pub values: Vec<Value>,
}

/// Final result row returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Entry identifier per present selector
    pub identifiers: BTreeMap<SelectorName, String>,
    pub values: Vec<RowValue>,
    pub score: f64,
}

impl Row {
    pub fn get(&self, name: &str) -> Option<&[Value]> {
        self.values
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.values.as_slice())
    }

    /// First value of a column
    pub fn first(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(|v| v.first())
    }

    /// Identifier of the only (or first) selector
    pub fn identifier(&self) -> Option<&str> {
        self.identifiers.values().next().map(String::as_str)
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemsList<T> {
    pub items: Vec<T>,
    /// True when rows exist past this page
    pub has_more_items: bool,
    /// Total rows before paging
    pub num_items: usize,
}

impl<T> ItemsList<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            has_more_items: false,
            num_items: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ItemsList<U> {
        ItemsList {
            items: self.items.into_iter().map(f).collect(),
            has_more_items: self.has_more_items,
            num_items: self.num_items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(selector: &str, id: &str, score: f64) -> ScoredRow {
        ScoredRow::single(
            SelectorName::new(selector),
            SelectorRow {
                identifier: id.into(),
                score,
                values: BTreeMap::new(),
            },
        )
    }

    #[test]
    fn test_merge_sums_scores() {
        let merged = ScoredRow::merge(Some(&row("a", "1", 1.5)), Some(&row("b", "2", 2.0)));
        assert_eq!(merged.score, 3.5);
        assert_eq!(merged.identifier(&SelectorName::new("b")), Some("2"));
    }

    #[test]
    fn test_merge_with_null_side() {
        let merged = ScoredRow::merge(Some(&row("a", "1", 1.0)), None);
        assert_eq!(merged.selectors.len(), 1);
        assert!(merged.values(&SelectorName::new("b"), "x").is_empty());
    }
}
