//! Post-join row filtering
//!
//! Constraints that span selectors (or touch the nullable side of an outer
//! join) cannot run inside one selector's index query. Each leaf of such a
//! constraint is run against its own selector first; the resulting
//! identifier sets then decide the constraint per joined row.

use std::collections::HashSet;

use super::row::ScoredRow;
use crate::model::{Constraint, SelectorName};
use crate::search::{SearchError, SearchResult};

/// Selector a leaf constraint reads from
pub fn leaf_selector(constraint: &Constraint) -> Option<&SelectorName> {
    match constraint {
        Constraint::Comparison(c) => Some(c.operand1.selector()),
        Constraint::PropertyExistence { selector, .. }
        | Constraint::ChildNode { selector, .. }
        | Constraint::DescendantNode { selector, .. } => Some(selector),
        Constraint::FullTextSearch(search) => search.selector.as_ref(),
        Constraint::And(_) | Constraint::Or(_) | Constraint::Not(_) => None,
    }
}

fn is_leaf(constraint: &Constraint) -> bool {
    !matches!(
        constraint,
        Constraint::And(_) | Constraint::Or(_) | Constraint::Not(_)
    )
}

struct Leaf {
    selector: SelectorName,
    identifiers: HashSet<String>,
}

/// Two-valued: a leaf over a selector absent from the row (the null side
/// of an outer join) is false, so its negation is true. `NOT b.x = 'v'`
/// therefore keeps null-extended rows, and `b.x IS NULL` matches them.
pub struct RowFilter {
    constraint: Constraint,
    leaves: Vec<Leaf>,
}

impl RowFilter {
    /// Resolves every leaf (pre-order) through `leaf_matches`, which returns
    /// the identifiers of the selector's entries satisfying the leaf.
    pub fn build(
        constraint: Constraint,
        mut leaf_matches: impl FnMut(&SelectorName, &Constraint) -> SearchResult<HashSet<String>>,
    ) -> SearchResult<Self> {
        let mut leaves = Vec::new();
        let mut error = None;
        constraint.walk(&mut |node| {
            if !is_leaf(node) || error.is_some() {
                return;
            }
            let result = match leaf_selector(node) {
                Some(selector) => leaf_matches(selector, node).map(|identifiers| Leaf {
                    selector: selector.clone(),
                    identifiers,
                }),
                None => Err(SearchError::invalid_query(format!(
                    "Constraint {} must name its selector in a join",
                    node
                ))),
            };
            match result {
                Ok(leaf) => leaves.push(leaf),
                Err(e) => error = Some(e),
            }
        });

        match error {
            Some(e) => Err(e),
            None => Ok(Self { constraint, leaves }),
        }
    }

    pub fn matches(&self, row: &ScoredRow) -> bool {
        let mut next = 0;
        self.evaluate(&self.constraint, row, &mut next)
    }

    // Children are always evaluated so `next` stays aligned with the
    // pre-order leaf numbering.
    fn evaluate(&self, constraint: &Constraint, row: &ScoredRow, next: &mut usize) -> bool {
        match constraint {
            Constraint::And(parts) => parts
                .iter()
                .map(|p| self.evaluate(p, row, next))
                .fold(true, |acc, v| acc && v),
            Constraint::Or(parts) => parts
                .iter()
                .map(|p| self.evaluate(p, row, next))
                .fold(false, |acc, v| acc || v),
            Constraint::Not(inner) => !self.evaluate(inner, row, next),
            _ => {
                let leaf = &self.leaves[*next];
                *next += 1;
                row.identifier(&leaf.selector)
                    .map_or(false, |id| leaf.identifiers.contains(id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DynamicOperand, Operator, StaticOperand};
    use crate::result::SelectorRow;
    use crate::value::Value;
    use std::collections::BTreeMap;

    fn eq(selector: &str, value: i64) -> Constraint {
        Constraint::comparison(
            DynamicOperand::property(selector, "n"),
            Operator::EqualTo,
            StaticOperand::Literal(Value::Long(value)),
        )
    }

    fn joined(a: Option<&str>, b: Option<&str>) -> ScoredRow {
        let mut selectors = BTreeMap::new();
        for (name, id) in [("a", a), ("b", b)] {
            if let Some(id) = id {
                selectors.insert(
                    SelectorName::new(name),
                    SelectorRow {
                        identifier: id.into(),
                        score: 1.0,
                        values: BTreeMap::new(),
                    },
                );
            }
        }
        ScoredRow {
            selectors,
            score: 1.0,
        }
    }

    fn filter(constraint: Constraint) -> RowFilter {
        RowFilter::build(constraint, |selector, leaf| {
            // a.n = 1 matches A1, b.n = 2 matches B2
            let ids: Vec<&str> = match (selector.as_str(), leaf) {
                ("a", c) if *c == eq("a", 1) => vec!["A1"],
                ("b", c) if *c == eq("b", 2) => vec!["B2"],
                _ => vec![],
            };
            Ok(ids.iter().map(|s| s.to_string()).collect())
        })
        .unwrap()
    }

    #[test]
    fn test_or_across_selectors() {
        let f = filter(Constraint::or(eq("a", 1), eq("b", 2)));
        assert!(f.matches(&joined(Some("A1"), Some("B1"))));
        assert!(f.matches(&joined(Some("A2"), Some("B2"))));
        assert!(!f.matches(&joined(Some("A2"), Some("B1"))));
    }

    #[test]
    fn test_absent_selector_fails_leaf() {
        let f = filter(eq("b", 2));
        assert!(!f.matches(&joined(Some("A1"), None)));

        let negated = filter(Constraint::not(eq("b", 2)));
        assert!(negated.matches(&joined(Some("A1"), None)));
    }

    #[test]
    fn test_leaf_numbering_with_nested_tree() {
        let f = filter(Constraint::and(
            Constraint::not(eq("a", 1)),
            Constraint::or(eq("a", 9), eq("b", 2)),
        ));
        assert!(f.matches(&joined(Some("A2"), Some("B2"))));
        assert!(!f.matches(&joined(Some("A1"), Some("B2"))));
    }
}
