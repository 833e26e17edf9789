//! Query sources: selectors and joins

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a selector (a queryable table, or the alias it is bound to)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectorName(String);

impl SelectorName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SelectorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SelectorName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for SelectorName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A table bound into the query, optionally under an alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Table name as it appears in the schema
    pub table: SelectorName,
    /// Alias used by the rest of the query
    pub alias: Option<SelectorName>,
}

impl Selector {
    pub fn new(table: impl Into<SelectorName>) -> Self {
        Self {
            table: table.into(),
            alias: None,
        }
    }

    pub fn aliased(table: impl Into<SelectorName>, alias: impl Into<SelectorName>) -> Self {
        Self {
            table: table.into(),
            alias: Some(alias.into()),
        }
    }

    /// Name by which constraints, columns and orderings refer to this selector
    pub fn name(&self) -> &SelectorName {
        self.alias.as_ref().unwrap_or(&self.table)
    }
}

/// Join type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
}

impl JoinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "JOIN",
            JoinType::LeftOuter => "LEFT OUTER JOIN",
            JoinType::RightOuter => "RIGHT OUTER JOIN",
        }
    }
}

/// Join predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinCondition {
    /// `selector1.property1 = selector2.property2`
    EquiJoin {
        selector1: SelectorName,
        property1: String,
        selector2: SelectorName,
        property2: String,
    },
    /// Both selectors address the same content entry
    SameNode {
        selector1: SelectorName,
        selector2: SelectorName,
    },
}

impl JoinCondition {
    pub fn equi(
        selector1: impl Into<SelectorName>,
        property1: impl Into<String>,
        selector2: impl Into<SelectorName>,
        property2: impl Into<String>,
    ) -> Self {
        JoinCondition::EquiJoin {
            selector1: selector1.into(),
            property1: property1.into(),
            selector2: selector2.into(),
            property2: property2.into(),
        }
    }

    pub fn same_node(selector1: impl Into<SelectorName>, selector2: impl Into<SelectorName>) -> Self {
        JoinCondition::SameNode {
            selector1: selector1.into(),
            selector2: selector2.into(),
        }
    }

    /// Selectors the condition refers to
    pub fn selectors(&self) -> [&SelectorName; 2] {
        match self {
            JoinCondition::EquiJoin {
                selector1,
                selector2,
                ..
            }
            | JoinCondition::SameNode {
                selector1,
                selector2,
            } => [selector1, selector2],
        }
    }
}

impl fmt::Display for JoinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinCondition::EquiJoin {
                selector1,
                property1,
                selector2,
                property2,
            } => write!(f, "{}.{} = {}.{}", selector1, property1, selector2, property2),
            JoinCondition::SameNode {
                selector1,
                selector2,
            } => write!(f, "ISSAMENODE({}, {})", selector1, selector2),
        }
    }
}

/// Two sources combined by a join condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub left: Source,
    pub right: Source,
    pub join_type: JoinType,
    pub condition: JoinCondition,
}

/// The FROM part of a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Selector(Selector),
    Join(Box<Join>),
}

impl Source {
    /// All selectors, left to right
    pub fn selectors(&self) -> Vec<&Selector> {
        let mut out = Vec::new();
        self.collect_selectors(&mut out);
        out
    }

    fn collect_selectors<'a>(&'a self, out: &mut Vec<&'a Selector>) {
        match self {
            Source::Selector(selector) => out.push(selector),
            Source::Join(join) => {
                join.left.collect_selectors(out);
                join.right.collect_selectors(out);
            }
        }
    }

    /// Selector names, left to right
    pub fn selector_names(&self) -> Vec<SelectorName> {
        self.selectors().into_iter().map(|s| s.name().clone()).collect()
    }

    /// Finds a selector by the name the query uses for it
    pub fn selector(&self, name: &SelectorName) -> Option<&Selector> {
        self.selectors().into_iter().find(|s| s.name() == name)
    }

    /// Selectors whose rows may be absent from a joined row
    /// (the inner side of an outer join, transitively)
    pub fn nullable_selectors(&self) -> Vec<SelectorName> {
        let mut out = Vec::new();
        self.collect_nullable(false, &mut out);
        out
    }

    fn collect_nullable(&self, nullable: bool, out: &mut Vec<SelectorName>) {
        match self {
            Source::Selector(selector) => {
                if nullable {
                    out.push(selector.name().clone());
                }
            }
            Source::Join(join) => {
                let (left_nullable, right_nullable) = match join.join_type {
                    JoinType::Inner => (false, false),
                    JoinType::LeftOuter => (false, true),
                    JoinType::RightOuter => (true, false),
                };
                join.left.collect_nullable(nullable || left_nullable, out);
                join.right.collect_nullable(nullable || right_nullable, out);
            }
        }
    }
}

impl From<Selector> for Source {
    fn from(selector: Selector) -> Self {
        Source::Selector(selector)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Selector(selector) => match &selector.alias {
                Some(alias) => write!(f, "{} AS {}", selector.table, alias),
                None => write!(f, "{}", selector.table),
            },
            Source::Join(join) => write!(
                f,
                "{} {} {} ON {}",
                join.left,
                join.join_type.as_str(),
                join.right,
                join.condition
            ),
        }
    }
}
