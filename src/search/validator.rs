//! Query validation against the live schema
//!
//! Runs before any command is dispatched, so a rejected query never touches
//! the index. Order of checks:
//!
//! 1. every selector names an existing table (`TableDoesntExist`)
//! 2. selector names are unique and join conditions reference them
//! 3. projected columns exist
//! 4. every atomic constraint: column exists, operator is admissible for
//!    the column, bind variables are supplied
//!
//! Orderings are validated by the result sorter factory.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{
    Comparison, Constraint, DynamicOperand, JoinCondition, Operator, Query, SelectorName, Source,
    StaticOperand,
};
use crate::schema::Schema;
use crate::search::{SearchError, SearchResult};
use crate::value::Value;

pub struct QueryValidator<'a> {
    schema: &'a dyn Schema,
}

impl<'a> QueryValidator<'a> {
    pub fn new(schema: &'a dyn Schema) -> Self {
        Self { schema }
    }

    /// Validates `query`; `variables` are the values bound for this execution
    pub fn validate(&self, query: &Query, variables: &BTreeMap<String, Value>) -> SearchResult<()> {
        // 1. Tables
        let selectors = query.source.selectors();
        for selector in &selectors {
            self.schema.table(&selector.table)?;
        }

        // 2. Selector names and join conditions
        let mut names = BTreeSet::new();
        for selector in &selectors {
            if !names.insert(selector.name().clone()) {
                return Err(SearchError::invalid_query(format!(
                    "Selector name '{}' is used more than once",
                    selector.name()
                )));
            }
        }
        self.validate_joins(query, &query.source)?;

        // 3. Columns
        for column in &query.columns {
            match &column.property {
                Some(property) => {
                    self.column(query, &column.selector, property)?;
                }
                None => {
                    self.table_of(query, &column.selector)?;
                }
            }
        }

        // 4. Constraint
        if let Some(constraint) = &query.constraint {
            let mut error = None;
            constraint.walk(&mut |node| {
                if error.is_none() {
                    if let Err(e) = self.validate_node(query, node, variables) {
                        error = Some(e);
                    }
                }
            });
            if let Some(e) = error {
                return Err(e);
            }
        }

        Ok(())
    }

    fn table_of<'q>(&self, query: &'q Query, selector: &SelectorName) -> SearchResult<&'q SelectorName> {
        query
            .source
            .selector(selector)
            .map(|s| &s.table)
            .ok_or_else(|| {
                SearchError::invalid_query(format!("Unknown selector '{}'", selector))
            })
    }

    fn column(
        &self,
        query: &Query,
        selector: &SelectorName,
        property: &str,
    ) -> SearchResult<crate::schema::Column> {
        let table = self.table_of(query, selector)?;
        self.schema.column(table, property)?.ok_or_else(|| {
            SearchError::invalid_query(format!(
                "Column '{}' does not exist on selector '{}' (table '{}')",
                property, selector, table
            ))
        })
    }

    fn validate_joins(&self, query: &Query, source: &Source) -> SearchResult<()> {
        let join = match source {
            Source::Selector(_) => return Ok(()),
            Source::Join(join) => join,
        };
        self.validate_joins(query, &join.left)?;
        self.validate_joins(query, &join.right)?;

        let left = join.left.selector_names();
        let right = join.right.selector_names();
        let [first, second] = join.condition.selectors();
        let spans_both = (left.contains(first) && right.contains(second))
            || (left.contains(second) && right.contains(first));
        if !spans_both {
            return Err(SearchError::invalid_query(format!(
                "Join condition {} must reference one selector from each side of the join",
                join.condition
            )));
        }
        if let JoinCondition::EquiJoin {
            selector1,
            property1,
            selector2,
            property2,
        } = &join.condition
        {
            self.column(query, selector1, property1)?;
            self.column(query, selector2, property2)?;
        }
        Ok(())
    }

    fn validate_node(
        &self,
        query: &Query,
        node: &Constraint,
        variables: &BTreeMap<String, Value>,
    ) -> SearchResult<()> {
        match node {
            Constraint::And(_) | Constraint::Or(_) | Constraint::Not(_) => Ok(()),
            Constraint::Comparison(comparison) => {
                self.validate_comparison(query, comparison, variables)
            }
            Constraint::PropertyExistence { selector, property } => {
                self.column(query, selector, property).map(|_| ())
            }
            Constraint::FullTextSearch(search) => {
                match &search.selector {
                    Some(selector) => {
                        self.table_of(query, selector)?;
                        if let Some(property) = &search.property {
                            self.column(query, selector, property)?;
                        }
                    }
                    None if query.is_join() => {
                        return Err(SearchError::invalid_query(format!(
                            "CONTAINS('{}') must name a selector in a join",
                            search.expression
                        )));
                    }
                    None => {}
                }
                Ok(())
            }
            Constraint::ChildNode { selector, .. } | Constraint::DescendantNode { selector, .. } => {
                self.table_of(query, selector).map(|_| ())
            }
        }
    }

    fn validate_comparison(
        &self,
        query: &Query,
        comparison: &Comparison,
        variables: &BTreeMap<String, Value>,
    ) -> SearchResult<()> {
        if let StaticOperand::BindVariable(name) = &comparison.operand2 {
            if !variables.contains_key(name) {
                return Err(SearchError::invalid_query(format!(
                    "No value bound to variable '${}'",
                    name
                )));
            }
        }
        self.validate_operand(query, &comparison.operand1, comparison.operator, true)
    }

    /// `checks_operator` is false below `LENGTH()`: the operator then
    /// compares a number, not the column's values.
    fn validate_operand(
        &self,
        query: &Query,
        operand: &DynamicOperand,
        operator: Operator,
        checks_operator: bool,
    ) -> SearchResult<()> {
        match operand {
            DynamicOperand::PropertyValue { selector, property } => {
                let column = self.column(query, selector, property)?;
                if checks_operator && !column.supports(operator) {
                    return Err(SearchError::invalid_query(format!(
                        "Operator '{}' is not supported for column '{}.{}'",
                        operator, selector, property
                    )));
                }
                Ok(())
            }
            DynamicOperand::LowerCase(inner) | DynamicOperand::UpperCase(inner) => {
                self.validate_operand(query, inner, operator, checks_operator)
            }
            DynamicOperand::Length(inner) => {
                if operator == Operator::Like {
                    return Err(SearchError::invalid_query(format!(
                        "Operator 'LIKE' cannot be applied to {}",
                        operand
                    )));
                }
                self.validate_operand(query, inner, operator, false)
            }
            DynamicOperand::FullTextSearchScore { selector } => {
                if operator == Operator::Like {
                    return Err(SearchError::invalid_query(format!(
                        "Operator 'LIKE' cannot be applied to {}",
                        operand
                    )));
                }
                self.table_of(query, selector).map(|_| ())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, Join, JoinType, Selector};
    use crate::schema::InMemorySchema;
    use crate::value::ColumnType;

    fn schema() -> InMemorySchema {
        InMemorySchema::builder()
            .add_table("someTable")
            .add_column(
                "someTable",
                "integerColumn",
                ColumnType::Integer,
                true,
                &[
                    Operator::EqualTo,
                    Operator::NotEqualTo,
                    Operator::LessThan,
                    Operator::LessThanOrEqualTo,
                    Operator::GreaterThan,
                    Operator::GreaterThanOrEqualTo,
                ],
            )
            .add_column("someTable", "stringColumn", ColumnType::String, true, &[Operator::Like])
            .add_table("other")
            .add_column("other", "ref", ColumnType::Id, true, &[Operator::EqualTo])
            .build()
            .unwrap()
    }

    fn compare(property: &str, operator: Operator) -> Query {
        let mut query = Query::new(Selector::new("someTable"));
        query.constraint = Some(Constraint::comparison(
            DynamicOperand::property("someTable", property),
            operator,
            StaticOperand::Literal(Value::Long(1)),
        ));
        query
    }

    fn validate(query: &Query) -> SearchResult<()> {
        let schema = schema();
        QueryValidator::new(&schema).validate(query, &BTreeMap::new())
    }

    #[test]
    fn test_admissible_operator_passes() {
        assert!(validate(&compare("integerColumn", Operator::EqualTo)).is_ok());
    }

    #[test]
    fn test_inadmissible_operator_names_operator_and_column() {
        let err = validate(&compare("integerColumn", Operator::Like)).unwrap_err();
        assert!(err.is_invalid_query());
        let message = err.to_string();
        assert!(message.contains("LIKE"));
        assert!(message.contains("integerColumn"));
    }

    #[test]
    fn test_unknown_table_wins_over_bad_predicate() {
        let mut query = compare("integerColumn", Operator::Like);
        query.source = Selector::new("missing").into();
        let err = validate(&query).unwrap_err();
        assert!(err.is_table_doesnt_exist());
    }

    #[test]
    fn test_unknown_column_is_invalid() {
        let err = validate(&compare("nope", Operator::EqualTo)).unwrap_err();
        assert!(err.is_invalid_query());
    }

    #[test]
    fn test_length_skips_column_operator_set() {
        let mut query = Query::new(Selector::new("someTable"));
        query.constraint = Some(Constraint::comparison(
            DynamicOperand::property("someTable", "stringColumn").length(),
            Operator::GreaterThan,
            StaticOperand::Literal(Value::Long(3)),
        ));
        assert!(validate(&query).is_ok());

        query.constraint = Some(Constraint::comparison(
            DynamicOperand::property("someTable", "stringColumn").length(),
            Operator::Like,
            StaticOperand::Literal(Value::String("1%".into())),
        ));
        assert!(validate(&query).unwrap_err().is_invalid_query());
    }

    #[test]
    fn test_missing_bind_variable() {
        let mut query = Query::new(Selector::new("someTable"));
        query.constraint = Some(Constraint::comparison(
            DynamicOperand::property("someTable", "integerColumn"),
            Operator::EqualTo,
            StaticOperand::BindVariable("n".into()),
        ));
        assert!(validate(&query).unwrap_err().is_invalid_query());

        let schema = schema();
        let mut variables = BTreeMap::new();
        variables.insert("n".to_string(), Value::Long(2));
        assert!(QueryValidator::new(&schema).validate(&query, &variables).is_ok());
    }

    #[test]
    fn test_join_condition_must_span_both_sides() {
        let mut query = Query::new(Source::Join(Box::new(Join {
            left: Selector::aliased("someTable", "a").into(),
            right: Selector::aliased("other", "b").into(),
            join_type: JoinType::Inner,
            condition: JoinCondition::same_node("a", "a"),
        })));
        assert!(validate(&query).unwrap_err().is_invalid_query());

        if let Source::Join(join) = &mut query.source {
            join.condition = JoinCondition::equi("a", "integerColumn", "b", "ref");
        }
        query.columns = vec![Column::new("a", "integerColumn"), Column::all_of("b")];
        assert!(validate(&query).is_ok());
    }

    #[test]
    fn test_duplicate_selector_names() {
        let query = Query::new(Source::Join(Box::new(Join {
            left: Selector::new("someTable").into(),
            right: Selector::new("someTable").into(),
            join_type: JoinType::Inner,
            condition: JoinCondition::same_node("someTable", "someTable"),
        })));
        assert!(validate(&query).unwrap_err().is_invalid_query());
    }
}
