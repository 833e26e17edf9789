//! Join collectors
//!
//! Neither input is assumed to be ordered. The right side is hashed by join
//! key, then every left row probes it, so a join runs in
//! O(|left| + |right| + output). Several matches on both sides produce the
//! full cross product; nothing is deduplicated.

use std::collections::{BTreeSet, HashMap};

use super::row::ScoredRow;
use crate::content::InvocationContext;
use crate::model::{JoinCondition, JoinType, SelectorName};
use crate::search::{SearchError, SearchResult};
use crate::value::Value;

pub trait JoinCollector: Send + Sync {
    fn join(&self, left: Vec<ScoredRow>, right: Vec<ScoredRow>) -> SearchResult<Vec<ScoredRow>>;
}

/// Where a join key comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinKey {
    pub selector: SelectorName,
    /// Storage field; `None` joins on the entry identifier
    pub field: Option<String>,
}

impl JoinKey {
    fn keys(&self, row: &ScoredRow) -> Vec<String> {
        let Some(selector_row) = row.selector(&self.selector) else {
            return Vec::new();
        };
        match &self.field {
            None => vec![selector_row.identifier.clone()],
            Some(field) => {
                let keys: BTreeSet<String> = row
                    .values(&self.selector, field)
                    .iter()
                    .map(canonical_key)
                    .collect();
                keys.into_iter().collect()
            }
        }
    }
}

/// Hash key under which equal values collide (`1` and `1.0` included)
fn canonical_key(value: &Value) -> String {
    match value {
        Value::Long(n) => n.to_string(),
        Value::Double(d) if d.fract() == 0.0 && d.abs() < 9.0e15 => (*d as i64).to_string(),
        other => other.to_text(),
    }
}

pub struct HashJoinCollector {
    join_type: JoinType,
    left: JoinKey,
    right: JoinKey,
}

impl HashJoinCollector {
    pub fn new(join_type: JoinType, left: JoinKey, right: JoinKey) -> Self {
        Self {
            join_type,
            left,
            right,
        }
    }

    /// Orients a join condition against the selectors of the left input
    pub fn for_condition(
        ctx: &InvocationContext,
        join_type: JoinType,
        condition: &JoinCondition,
        left_selectors: &[SelectorName],
    ) -> SearchResult<Self> {
        let (first, second) = match condition {
            JoinCondition::EquiJoin {
                selector1,
                property1,
                selector2,
                property2,
            } => (
                JoinKey {
                    selector: selector1.clone(),
                    field: Some(ctx.storage_name(property1)),
                },
                JoinKey {
                    selector: selector2.clone(),
                    field: Some(ctx.storage_name(property2)),
                },
            ),
            JoinCondition::SameNode {
                selector1,
                selector2,
            } => (
                JoinKey {
                    selector: selector1.clone(),
                    field: None,
                },
                JoinKey {
                    selector: selector2.clone(),
                    field: None,
                },
            ),
        };

        let first_left = left_selectors.contains(&first.selector);
        let second_left = left_selectors.contains(&second.selector);
        match (first_left, second_left) {
            (true, false) => Ok(Self::new(join_type, first, second)),
            (false, true) => Ok(Self::new(join_type, second, first)),
            _ => Err(SearchError::execution(format!(
                "Join condition {} must reference one selector on each side",
                condition
            ))),
        }
    }
}

impl JoinCollector for HashJoinCollector {
    fn join(&self, left: Vec<ScoredRow>, right: Vec<ScoredRow>) -> SearchResult<Vec<ScoredRow>> {
        let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, row) in right.iter().enumerate() {
            for key in self.right.keys(row) {
                by_key.entry(key).or_default().push(i);
            }
        }

        let mut right_matched = vec![false; right.len()];
        let mut joined = Vec::new();

        for left_row in &left {
            // A multi-valued key may reach the same right row twice.
            let matches: BTreeSet<usize> = self
                .left
                .keys(left_row)
                .iter()
                .filter_map(|k| by_key.get(k))
                .flatten()
                .copied()
                .collect();

            if matches.is_empty() {
                if self.join_type == JoinType::LeftOuter {
                    joined.push(ScoredRow::merge(Some(left_row), None));
                }
                continue;
            }
            for i in matches {
                right_matched[i] = true;
                joined.push(ScoredRow::merge(Some(left_row), Some(&right[i])));
            }
        }

        if self.join_type == JoinType::RightOuter {
            for (row, matched) in right.iter().zip(&right_matched) {
                if !matched {
                    joined.push(ScoredRow::merge(None, Some(row)));
                }
            }
        }
        Ok(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::SelectorRow;
    use std::collections::BTreeMap;

    fn row(selector: &str, id: &str, field: &str, values: Vec<Value>) -> ScoredRow {
        let mut map = BTreeMap::new();
        map.insert(field.to_string(), values);
        ScoredRow::single(
            SelectorName::new(selector),
            SelectorRow {
                identifier: id.into(),
                score: 1.0,
                values: map,
            },
        )
    }

    fn equi(join_type: JoinType) -> HashJoinCollector {
        HashJoinCollector::new(
            join_type,
            JoinKey {
                selector: SelectorName::new("a"),
                field: Some("k".into()),
            },
            JoinKey {
                selector: SelectorName::new("b"),
                field: Some("k".into()),
            },
        )
    }

    fn ids(rows: &[ScoredRow]) -> Vec<(Option<&str>, Option<&str>)> {
        rows.iter()
            .map(|r| {
                (
                    r.identifier(&SelectorName::new("a")),
                    r.identifier(&SelectorName::new("b")),
                )
            })
            .collect()
    }

    #[test]
    fn test_single_match() {
        let left = vec![
            row("a", "A1", "k", vec![Value::Long(1)]),
            row("a", "A2", "k", vec![Value::Long(2)]),
        ];
        let right = vec![
            row("b", "B1", "k", vec![Value::Long(1)]),
            row("b", "B2", "k", vec![Value::Long(3)]),
        ];
        let joined = equi(JoinType::Inner).join(left, right).unwrap();
        assert_eq!(ids(&joined), vec![(Some("A1"), Some("B1"))]);
        assert_eq!(joined[0].score, 2.0);
    }

    #[test]
    fn test_cross_product_on_repeated_keys() {
        let left = vec![
            row("a", "A1", "k", vec![Value::Long(1)]),
            row("a", "A2", "k", vec![Value::Long(1)]),
        ];
        let right = vec![
            row("b", "B1", "k", vec![Value::Double(1.0)]),
            row("b", "B2", "k", vec![Value::Long(1)]),
        ];
        let joined = equi(JoinType::Inner).join(left, right).unwrap();
        assert_eq!(joined.len(), 4);
    }

    #[test]
    fn test_multi_valued_key_matches_once() {
        let left = vec![row("a", "A1", "k", vec![Value::from("x"), Value::from("y")])];
        let right = vec![row("b", "B1", "k", vec![Value::from("y"), Value::from("x")])];
        let joined = equi(JoinType::Inner).join(left, right).unwrap();
        assert_eq!(joined.len(), 1);
    }

    #[test]
    fn test_outer_joins() {
        let left = vec![
            row("a", "A1", "k", vec![Value::Long(1)]),
            row("a", "A2", "k", vec![]),
        ];
        let right = vec![
            row("b", "B1", "k", vec![Value::Long(1)]),
            row("b", "B2", "k", vec![Value::Long(9)]),
        ];

        let left_outer = equi(JoinType::LeftOuter)
            .join(left.clone(), right.clone())
            .unwrap();
        assert_eq!(
            ids(&left_outer),
            vec![(Some("A1"), Some("B1")), (Some("A2"), None)]
        );

        let right_outer = equi(JoinType::RightOuter).join(left, right).unwrap();
        assert_eq!(
            ids(&right_outer),
            vec![(Some("A1"), Some("B1")), (None, Some("B2"))]
        );
    }

    #[test]
    fn test_same_node() {
        let collector = HashJoinCollector::new(
            JoinType::Inner,
            JoinKey {
                selector: SelectorName::new("a"),
                field: None,
            },
            JoinKey {
                selector: SelectorName::new("b"),
                field: None,
            },
        );
        let left = vec![row("a", "X", "k", vec![]), row("a", "Y", "k", vec![])];
        let right = vec![row("b", "Y", "k", vec![])];
        let joined = collector.join(left, right).unwrap();
        assert_eq!(ids(&joined), vec![(Some("Y"), Some("Y"))]);
    }
}
