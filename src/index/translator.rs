//! Constraint → native query translation for one selector

use std::collections::BTreeMap;

use super::native::{FieldExpr, FolderRef, NativeFilter, NativeQuery};
use crate::content::InvocationContext;
use crate::model::{Constraint, DynamicOperand, Location, Operator, SelectorName, StaticOperand};
use crate::search::{SearchError, SearchResult};
use crate::value::{LikePattern, Value};

/// Resolves a literal or bind variable
pub fn resolve_static(
    operand: &StaticOperand,
    variables: &BTreeMap<String, Value>,
) -> SearchResult<Value> {
    match operand {
        StaticOperand::Literal(value) => Ok(value.clone()),
        StaticOperand::BindVariable(name) => variables.get(name).cloned().ok_or_else(|| {
            SearchError::invalid_query(format!("No value bound to variable '${}'", name))
        }),
    }
}

pub struct QueryTranslator<'a> {
    ctx: &'a InvocationContext,
    selector: &'a SelectorName,
    variables: &'a BTreeMap<String, Value>,
}

impl<'a> QueryTranslator<'a> {
    pub fn new(
        ctx: &'a InvocationContext,
        selector: &'a SelectorName,
        variables: &'a BTreeMap<String, Value>,
    ) -> Self {
        Self {
            ctx,
            selector,
            variables,
        }
    }

    /// Builds the storage query for `table` under this selector
    pub fn translate(
        &self,
        table: &SelectorName,
        constraint: Option<&Constraint>,
        fields: Option<&[String]>,
    ) -> SearchResult<NativeQuery> {
        let filter = match constraint {
            Some(c) => self.filter(c)?,
            None => NativeFilter::MatchAll,
        };
        Ok(NativeQuery {
            tables: self.ctx.resolve_tables(table)?,
            filter,
            fields: fields.map(|f| f.iter().map(|name| self.ctx.storage_name(name)).collect()),
        })
    }

    fn check_selector(&self, selector: &SelectorName) -> SearchResult<()> {
        if selector == self.selector {
            Ok(())
        } else {
            Err(SearchError::execution(format!(
                "Constraint on selector '{}' cannot run against selector '{}'",
                selector, self.selector
            )))
        }
    }

    fn filter(&self, constraint: &Constraint) -> SearchResult<NativeFilter> {
        Ok(match constraint {
            Constraint::And(parts) => NativeFilter::And(
                parts.iter().map(|p| self.filter(p)).collect::<SearchResult<_>>()?,
            ),
            Constraint::Or(parts) => NativeFilter::Or(
                parts.iter().map(|p| self.filter(p)).collect::<SearchResult<_>>()?,
            ),
            Constraint::Not(inner) => NativeFilter::Not(Box::new(self.filter(inner)?)),
            Constraint::Comparison(comparison) => {
                let field = self.field(&comparison.operand1)?;
                let value = resolve_static(&comparison.operand2, self.variables)?;
                if comparison.operator == Operator::Like {
                    LikePattern::compile(&value.to_text()).map_err(|e| {
                        SearchError::invalid_query(format!(
                            "Invalid LIKE pattern {}: {}",
                            value, e
                        ))
                    })?;
                }
                NativeFilter::Term {
                    field,
                    operator: comparison.operator,
                    value,
                }
            }
            Constraint::PropertyExistence { selector, property } => {
                self.check_selector(selector)?;
                NativeFilter::Exists {
                    field: self.ctx.storage_name(property),
                }
            }
            Constraint::FullTextSearch(search) => {
                if let Some(selector) = &search.selector {
                    self.check_selector(selector)?;
                }
                NativeFilter::FullText {
                    field: search.property.as_deref().map(|p| self.ctx.storage_name(p)),
                    expression: search.expression.clone(),
                }
            }
            Constraint::ChildNode { selector, parent } => {
                self.check_selector(selector)?;
                NativeFilter::ChildOf(self.folder(parent))
            }
            Constraint::DescendantNode { selector, ancestor } => {
                self.check_selector(selector)?;
                NativeFilter::DescendantOf(self.folder(ancestor))
            }
        })
    }

    fn field(&self, operand: &DynamicOperand) -> SearchResult<FieldExpr> {
        Ok(match operand {
            DynamicOperand::PropertyValue { selector, property } => {
                self.check_selector(selector)?;
                FieldExpr::Property(self.ctx.storage_name(property))
            }
            DynamicOperand::Length(inner) => FieldExpr::Length(Box::new(self.field(inner)?)),
            DynamicOperand::LowerCase(inner) => FieldExpr::LowerCase(Box::new(self.field(inner)?)),
            DynamicOperand::UpperCase(inner) => FieldExpr::UpperCase(Box::new(self.field(inner)?)),
            DynamicOperand::FullTextSearchScore { selector } => {
                self.check_selector(selector)?;
                FieldExpr::Score
            }
        })
    }

    fn folder(&self, location: &Location) -> FolderRef {
        match location {
            Location::Path(path) => FolderRef::Path(self.ctx.path_splitter().split(path)),
            Location::Identifier(id) => FolderRef::Identifier(id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{InMemorySchema, Schema};
    use crate::value::{ColumnType, LowerCaseNameConverter};
    use std::sync::Arc;

    fn ctx() -> InvocationContext {
        let schema: Arc<dyn Schema> = Arc::new(
            InMemorySchema::builder()
                .add_table("Doc")
                .add_column("Doc", "Title", ColumnType::String, true, &Operator::ALL)
                .build()
                .unwrap(),
        );
        InvocationContext::new(schema).with_name_converter(Arc::new(LowerCaseNameConverter))
    }

    #[test]
    fn test_translate_comparison_with_variable() {
        let ctx = ctx();
        let selector = SelectorName::new("Doc");
        let mut variables = BTreeMap::new();
        variables.insert("t".to_string(), Value::from("x"));

        let constraint = Constraint::comparison(
            DynamicOperand::property("Doc", "Title").upper_case(),
            Operator::EqualTo,
            StaticOperand::BindVariable("t".into()),
        );
        let query = QueryTranslator::new(&ctx, &selector, &variables)
            .translate(&selector, Some(&constraint), Some(&["Title".to_string()]))
            .unwrap();

        assert_eq!(query.tables, vec!["doc".to_string()]);
        assert_eq!(query.fields, Some(vec!["title".to_string()]));
        assert_eq!(
            query.filter,
            NativeFilter::Term {
                field: FieldExpr::UpperCase(Box::new(FieldExpr::Property("title".into()))),
                operator: Operator::EqualTo,
                value: Value::from("x"),
            }
        );
    }

    #[test]
    fn test_missing_variable() {
        let ctx = ctx();
        let selector = SelectorName::new("Doc");
        let constraint = Constraint::comparison(
            DynamicOperand::property("Doc", "Title"),
            Operator::EqualTo,
            StaticOperand::BindVariable("missing".into()),
        );
        let err = QueryTranslator::new(&ctx, &selector, &BTreeMap::new())
            .translate(&selector, Some(&constraint), None)
            .unwrap_err();
        assert!(err.is_invalid_query());
    }

    #[test]
    fn test_path_is_split() {
        let ctx = ctx();
        let selector = SelectorName::new("Doc");
        let constraint = Constraint::DescendantNode {
            selector: selector.clone(),
            ancestor: Location::parse("/a/b/"),
        };
        let query = QueryTranslator::new(&ctx, &selector, &BTreeMap::new())
            .translate(&selector, Some(&constraint), None)
            .unwrap();
        assert_eq!(
            query.filter,
            NativeFilter::DescendantOf(FolderRef::Path(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn test_foreign_selector_rejected() {
        let ctx = ctx();
        let selector = SelectorName::new("Doc");
        let constraint = Constraint::PropertyExistence {
            selector: SelectorName::new("Other"),
            property: "x".into(),
        };
        let err = QueryTranslator::new(&ctx, &selector, &BTreeMap::new())
            .translate(&selector, Some(&constraint), None)
            .unwrap_err();
        assert_eq!(err.code(), "SEARCH_EXECUTION_FAILED");
    }
}
