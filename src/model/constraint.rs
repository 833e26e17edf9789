//! Constraint tree

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::operand::{DynamicOperand, StaticOperand};
use super::source::SelectorName;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    EqualTo,
    #[serde(rename = "<>")]
    NotEqualTo,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqualTo,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqualTo,
    #[serde(rename = "LIKE")]
    Like,
}

impl Operator {
    /// Every operator, in declaration order
    pub const ALL: [Operator; 7] = [
        Operator::EqualTo,
        Operator::NotEqualTo,
        Operator::LessThan,
        Operator::LessThanOrEqualTo,
        Operator::GreaterThan,
        Operator::GreaterThanOrEqualTo,
        Operator::Like,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::EqualTo => "=",
            Operator::NotEqualTo => "<>",
            Operator::LessThan => "<",
            Operator::LessThanOrEqualTo => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqualTo => ">=",
            Operator::Like => "LIKE",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" => Some(Operator::EqualTo),
            "<>" | "!=" => Some(Operator::NotEqualTo),
            "<" => Some(Operator::LessThan),
            "<=" => Some(Operator::LessThanOrEqualTo),
            ">" => Some(Operator::GreaterThan),
            ">=" => Some(Operator::GreaterThanOrEqualTo),
            s if s.eq_ignore_ascii_case("like") => Some(Operator::Like),
            _ => None,
        }
    }

    /// Evaluates a non-LIKE operator against a comparison outcome
    pub fn accepts(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Operator::EqualTo => ordering == Equal,
            Operator::NotEqualTo => ordering != Equal,
            Operator::LessThan => ordering == Less,
            Operator::LessThanOrEqualTo => ordering != Greater,
            Operator::GreaterThan => ordering == Greater,
            Operator::GreaterThanOrEqualTo => ordering != Less,
            Operator::Like => false,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Atomic comparison `operand1 <operator> operand2`
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub operand1: DynamicOperand,
    pub operator: Operator,
    pub operand2: StaticOperand,
}

/// Full-text predicate
#[derive(Debug, Clone, PartialEq)]
pub struct FullTextSearch {
    /// Selector searched; may be omitted when the query has one selector
    pub selector: Option<SelectorName>,
    /// Restricts the search to one column
    pub property: Option<String>,
    /// Search expression: terms, `"quoted phrases"`, `-excluded`
    pub expression: String,
}

/// Folder given by path or by identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Path(String),
    Identifier(String),
}

impl Location {
    /// Paths start with `/`; anything else is an identifier
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with('/') {
            Location::Path(raw.to_string())
        } else {
            Location::Identifier(raw.to_string())
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Path(p) | Location::Identifier(p) => write!(f, "'{}'", p),
        }
    }
}

/// Constraint tree
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    And(Vec<Constraint>),
    Or(Vec<Constraint>),
    Not(Box<Constraint>),
    Comparison(Comparison),
    PropertyExistence {
        selector: SelectorName,
        property: String,
    },
    FullTextSearch(FullTextSearch),
    /// Entry is a direct child of the folder
    ChildNode {
        selector: SelectorName,
        parent: Location,
    },
    /// Entry is anywhere below the folder
    DescendantNode {
        selector: SelectorName,
        ancestor: Location,
    },
}

impl Constraint {
    pub fn comparison(operand1: DynamicOperand, operator: Operator, operand2: StaticOperand) -> Self {
        Constraint::Comparison(Comparison {
            operand1,
            operator,
            operand2,
        })
    }

    pub fn not(constraint: Constraint) -> Self {
        Constraint::Not(Box::new(constraint))
    }

    /// Combines two constraints with AND, flattening nested conjunctions
    pub fn and(left: Constraint, right: Constraint) -> Self {
        let mut parts = left.into_conjuncts();
        parts.extend(right.into_conjuncts());
        Constraint::And(parts)
    }

    /// Combines two constraints with OR, flattening nested disjunctions
    pub fn or(left: Constraint, right: Constraint) -> Self {
        let mut parts = Vec::new();
        for c in [left, right] {
            match c {
                Constraint::Or(inner) => parts.extend(inner),
                other => parts.push(other),
            }
        }
        Constraint::Or(parts)
    }

    /// Top-level conjuncts
    pub fn into_conjuncts(self) -> Vec<Constraint> {
        match self {
            Constraint::And(parts) => parts.into_iter().flat_map(Self::into_conjuncts).collect(),
            other => vec![other],
        }
    }

    /// Rebuilds a constraint from conjuncts; `None` when empty
    pub fn from_conjuncts(mut parts: Vec<Constraint>) -> Option<Self> {
        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(Constraint::And(parts)),
        }
    }

    /// Visits every node, parents before children
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Constraint)) {
        visit(self);
        match self {
            Constraint::And(parts) | Constraint::Or(parts) => {
                for part in parts {
                    part.walk(visit);
                }
            }
            Constraint::Not(inner) => inner.walk(visit),
            _ => {}
        }
    }

    /// Atomic comparisons in the tree
    pub fn comparisons(&self) -> Vec<&Comparison> {
        let mut out = Vec::new();
        self.walk(&mut |c| {
            if let Constraint::Comparison(comparison) = c {
                out.push(comparison);
            }
        });
        out
    }

    /// Selectors referenced anywhere in the tree.
    ///
    /// A full-text search without a selector contributes nothing.
    pub fn selectors(&self) -> BTreeSet<SelectorName> {
        let mut out = BTreeSet::new();
        self.walk(&mut |c| match c {
            Constraint::Comparison(comparison) => {
                out.insert(comparison.operand1.selector().clone());
            }
            Constraint::PropertyExistence { selector, .. }
            | Constraint::ChildNode { selector, .. }
            | Constraint::DescendantNode { selector, .. } => {
                out.insert(selector.clone());
            }
            Constraint::FullTextSearch(search) => {
                if let Some(selector) = &search.selector {
                    out.insert(selector.clone());
                }
            }
            _ => {}
        });
        out
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, parts: &[Constraint], sep: &str) -> fmt::Result {
            write!(f, "(")?;
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", sep)?;
                }
                write!(f, "{}", part)?;
            }
            write!(f, ")")
        }

        match self {
            Constraint::And(parts) => join(f, parts, "AND"),
            Constraint::Or(parts) => join(f, parts, "OR"),
            Constraint::Not(inner) => write!(f, "NOT {}", inner),
            Constraint::Comparison(c) => write!(f, "{} {} {}", c.operand1, c.operator, c.operand2),
            Constraint::PropertyExistence { selector, property } => {
                write!(f, "{}.{} IS NOT NULL", selector, property)
            }
            Constraint::FullTextSearch(search) => {
                write!(f, "CONTAINS(")?;
                match (&search.selector, &search.property) {
                    (Some(s), Some(p)) => write!(f, "{}.{}, ", s, p)?,
                    (Some(s), None) => write!(f, "{}, ", s)?,
                    _ => {}
                }
                write!(f, "'{}')", search.expression.replace('\'', "''"))
            }
            Constraint::ChildNode { selector, parent } => {
                write!(f, "IN_FOLDER({}, {})", selector, parent)
            }
            Constraint::DescendantNode { selector, ancestor } => {
                write!(f, "IN_TREE({}, {})", selector, ancestor)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn eq(selector: &str, property: &str, value: i64) -> Constraint {
        Constraint::comparison(
            DynamicOperand::property(selector, property),
            Operator::EqualTo,
            StaticOperand::Literal(Value::Long(value)),
        )
    }

    #[test]
    fn test_operator_symbols_round_trip() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_symbol(op.symbol()), Some(op));
        }
        assert_eq!(Operator::from_symbol("!="), Some(Operator::NotEqualTo));
        assert_eq!(Operator::from_symbol("like"), Some(Operator::Like));
    }

    #[test]
    fn test_operator_serde_uses_symbols() {
        let ops: Vec<Operator> = serde_json::from_str(r#"["=", "<>", "LIKE"]"#).unwrap();
        assert_eq!(ops, vec![Operator::EqualTo, Operator::NotEqualTo, Operator::Like]);
    }

    #[test]
    fn test_and_flattens() {
        let c = Constraint::and(Constraint::and(eq("a", "x", 1), eq("a", "y", 2)), eq("b", "z", 3));
        assert_eq!(c.clone().into_conjuncts().len(), 3);
        assert_eq!(c.comparisons().len(), 3);
    }

    #[test]
    fn test_selectors_collected() {
        let c = Constraint::or(eq("a", "x", 1), Constraint::not(eq("b", "y", 2)));
        let selectors: Vec<_> = c.selectors().into_iter().map(|s| s.to_string()).collect();
        assert_eq!(selectors, vec!["a", "b"]);
    }

    #[test]
    fn test_from_conjuncts() {
        assert!(Constraint::from_conjuncts(vec![]).is_none());
        assert_eq!(Constraint::from_conjuncts(vec![eq("a", "x", 1)]), Some(eq("a", "x", 1)));
    }

    #[test]
    fn test_location_parse() {
        assert_eq!(Location::parse("/a/b"), Location::Path("/a/b".into()));
        assert_eq!(Location::parse("abc-123"), Location::Identifier("abc-123".into()));
    }
}
