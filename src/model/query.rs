//! Query model root

use std::fmt;

use super::column::Column;
use super::constraint::Constraint;
use super::limit::Limit;
use super::ordering::Ordering;
use super::source::{SelectorName, Source};

/// A complete query. Built once, immutable and re-executable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub source: Source,
    /// Projected columns; empty projects every column of every selector
    pub columns: Vec<Column>,
    pub constraint: Option<Constraint>,
    pub orderings: Vec<Ordering>,
    pub limit: Limit,
}

impl Query {
    pub fn new(source: impl Into<Source>) -> Self {
        Self {
            source: source.into(),
            columns: Vec::new(),
            constraint: None,
            orderings: Vec::new(),
            limit: Limit::none(),
        }
    }

    /// Selector names in source order
    pub fn selector_names(&self) -> Vec<SelectorName> {
        self.source.selector_names()
    }

    pub fn is_join(&self) -> bool {
        matches!(self.source, Source::Join(_))
    }

    /// Same query with a different page
    pub fn with_limit(&self, limit: Limit) -> Self {
        Self {
            limit,
            ..self.clone()
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if self.columns.is_empty() {
            write!(f, "*")?;
        }
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", column)?;
        }
        write!(f, " FROM {}", self.source)?;
        if let Some(constraint) = &self.constraint {
            write!(f, " WHERE {}", constraint)?;
        }
        if !self.orderings.is_empty() {
            write!(f, " ORDER BY ")?;
            for (i, ordering) in self.orderings.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", ordering)?;
            }
        }
        if let Some(limit) = self.limit.row_limit {
            write!(f, " LIMIT {}", limit)?;
        }
        if self.limit.offset > 0 {
            write!(f, " OFFSET {}", self.limit.offset)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DynamicOperand, Operator, Selector, StaticOperand};
    use crate::value::Value;

    #[test]
    fn test_display_renders_query() {
        let mut query = Query::new(Selector::new("doc"));
        query.columns.push(Column::new("doc", "title"));
        query.constraint = Some(Constraint::comparison(
            DynamicOperand::property("doc", "size"),
            Operator::GreaterThan,
            StaticOperand::Literal(Value::Long(10)),
        ));
        query.orderings.push(Ordering::descending(DynamicOperand::property("doc", "size")));
        query.limit = Limit::new(5, 10);

        assert_eq!(
            query.to_string(),
            "SELECT doc.title FROM doc WHERE doc.size > 10 ORDER BY doc.size DESC LIMIT 5 OFFSET 10"
        );
    }

    #[test]
    fn test_with_limit_keeps_rest() {
        let query = Query::new(Selector::new("doc"));
        let paged = query.with_limit(Limit::new(1, 1));
        assert_eq!(paged.source, query.source);
        assert_eq!(paged.limit.offset, 1);
    }
}
