//! Result sorting
//!
//! Sorts are stable: rows with equal keys keep their incoming order, which
//! may itself be the storage's relevance ranking.

use std::cmp::Ordering as CmpOrdering;

use super::row::ScoredRow;
use crate::content::InvocationContext;
use crate::model::{DynamicOperand, Order, Ordering, SelectorName, Source};
use crate::search::{SearchError, SearchResult};
use crate::value::Value;

pub trait ResultSorter: Send + Sync {
    fn sort(&self, rows: &mut [ScoredRow]);
}

/// Builds sorters for a query
pub trait ResultSorterFactory {
    /// Sorter used when the query has no ORDER BY
    fn default_result_sorter(&self, selectors: &[SelectorName])
        -> SearchResult<Box<dyn ResultSorter>>;

    /// Sorter for explicit orderings
    fn result_sorter(&self, orderings: &[Ordering]) -> SearchResult<Box<dyn ResultSorter>>;
}

/// Sort expression over a row, with storage field names
#[derive(Debug, Clone, PartialEq)]
pub enum SortExpr {
    Property { selector: SelectorName, field: String },
    Length(Box<SortExpr>),
    LowerCase(Box<SortExpr>),
    UpperCase(Box<SortExpr>),
    /// One selector's score, or the row score
    Score(Option<SelectorName>),
}

impl SortExpr {
    fn evaluate(&self, row: &ScoredRow) -> Option<Value> {
        match self {
            SortExpr::Property { selector, field } => row.values(selector, field).first().cloned(),
            SortExpr::Length(inner) => inner
                .evaluate(row)
                .map(|v| Value::Long(v.to_text().chars().count() as i64)),
            SortExpr::LowerCase(inner) => inner
                .evaluate(row)
                .map(|v| Value::String(v.to_text().to_lowercase())),
            SortExpr::UpperCase(inner) => inner
                .evaluate(row)
                .map(|v| Value::String(v.to_text().to_uppercase())),
            SortExpr::Score(None) => Some(Value::Double(row.score)),
            SortExpr::Score(Some(selector)) => row.selector(selector).map(|r| Value::Double(r.score)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub expr: SortExpr,
    pub order: Order,
}

/// Multi-key stable sorter
#[derive(Debug, Clone, PartialEq)]
pub struct OrderingSorter {
    keys: Vec<SortKey>,
}

impl OrderingSorter {
    pub fn new(keys: Vec<SortKey>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    fn compare(&self, a: &ScoredRow, b: &ScoredRow) -> CmpOrdering {
        for key in &self.keys {
            let ordering = compare_sort_values(key.expr.evaluate(a).as_ref(), key.expr.evaluate(b).as_ref());
            let ordering = match key.order {
                Order::Ascending => ordering,
                Order::Descending => ordering.reverse(),
            };
            if ordering != CmpOrdering::Equal {
                return ordering;
            }
        }
        CmpOrdering::Equal
    }
}

impl ResultSorter for OrderingSorter {
    fn sort(&self, rows: &mut [ScoredRow]) {
        rows.sort_by(|a, b| self.compare(a, b));
    }
}

/// Total order over optional values:
/// - missing < present
/// - by type first: boolean < number < datetime < text
/// - numbers by widened value (`f64::total_cmp`, NaN last), then longs
///   exactly; text is never parsed
fn compare_sort_values(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    match (a, b) {
        (None, None) => CmpOrdering::Equal,
        (None, Some(_)) => CmpOrdering::Less,
        (Some(_), None) => CmpOrdering::Greater,
        (Some(a), Some(b)) => type_rank(a)
            .cmp(&type_rank(b))
            .then_with(|| compare_same_rank(a, b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Boolean(_) => 0,
        Value::Long(_) | Value::Double(_) => 1,
        Value::DateTime(_) => 2,
        _ => 3,
    }
}

fn compare_same_rank(a: &Value, b: &Value) -> CmpOrdering {
    match (a, b) {
        (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
        (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
        (Value::Long(a), Value::Long(b)) => a.cmp(b),
        (a, b) if a.is_numeric() && b.is_numeric() => {
            let (a, a_exact) = numeric_key(a);
            let (b, b_exact) = numeric_key(b);
            a.total_cmp(&b).then(a_exact.cmp(&b_exact))
        }
        _ => a.to_text().cmp(&b.to_text()),
    }
}

/// Widened value, then a tie-break that keeps distinct longs apart
fn numeric_key(value: &Value) -> (f64, (u8, i64)) {
    match value {
        Value::Long(n) => (*n as f64, (1, *n)),
        Value::Double(d) => (*d, (0, 0)),
        _ => (f64::NAN, (0, 0)),
    }
}

/// Sorter factory backed by the schema of the invocation context
pub struct SchemaResultSorterFactory<'a> {
    ctx: &'a InvocationContext,
    source: &'a Source,
}

impl<'a> SchemaResultSorterFactory<'a> {
    pub fn new(ctx: &'a InvocationContext, source: &'a Source) -> Self {
        Self { ctx, source }
    }

    fn table_of(&self, selector: &SelectorName) -> SearchResult<&'a SelectorName> {
        self.source
            .selector(selector)
            .map(|s| &s.table)
            .ok_or_else(|| {
                SearchError::invalid_query(format!("Ordering references unknown selector '{}'", selector))
            })
    }

    fn sort_expr(&self, operand: &DynamicOperand) -> SearchResult<SortExpr> {
        Ok(match operand {
            DynamicOperand::PropertyValue { selector, property } => {
                let table = self.table_of(selector)?;
                let column = self
                    .ctx
                    .schema()
                    .column(table, property)?
                    .ok_or_else(|| {
                        SearchError::invalid_query(format!(
                            "Cannot order by unknown column '{}.{}'",
                            selector, property
                        ))
                    })?;
                if !column.orderable {
                    return Err(SearchError::invalid_query(format!(
                        "Column '{}.{}' is not orderable",
                        selector, property
                    )));
                }
                SortExpr::Property {
                    selector: selector.clone(),
                    field: self.ctx.storage_name(property),
                }
            }
            DynamicOperand::Length(inner) => SortExpr::Length(Box::new(self.sort_expr(inner)?)),
            DynamicOperand::LowerCase(inner) => SortExpr::LowerCase(Box::new(self.sort_expr(inner)?)),
            DynamicOperand::UpperCase(inner) => SortExpr::UpperCase(Box::new(self.sort_expr(inner)?)),
            DynamicOperand::FullTextSearchScore { selector } => {
                self.table_of(selector)?;
                SortExpr::Score(Some(selector.clone()))
            }
        })
    }
}

impl ResultSorterFactory for SchemaResultSorterFactory<'_> {
    fn default_result_sorter(
        &self,
        selectors: &[SelectorName],
    ) -> SearchResult<Box<dyn ResultSorter>> {
        let mut keys = Vec::new();
        for selector in selectors {
            let table = self.ctx.schema().table(self.table_of(selector)?)?;
            for item in &table.default_ordering {
                keys.push(SortKey {
                    expr: SortExpr::Property {
                        selector: selector.clone(),
                        field: self.ctx.storage_name(&item.column),
                    },
                    order: item.order,
                });
            }
        }
        if keys.is_empty() {
            keys.push(SortKey {
                expr: SortExpr::Score(None),
                order: Order::Descending,
            });
        }
        Ok(Box::new(OrderingSorter::new(keys)))
    }

    fn result_sorter(&self, orderings: &[Ordering]) -> SearchResult<Box<dyn ResultSorter>> {
        let keys = orderings
            .iter()
            .map(|o| {
                Ok(SortKey {
                    expr: self.sort_expr(&o.operand)?,
                    order: o.order,
                })
            })
            .collect::<SearchResult<Vec<_>>>()?;
        Ok(Box::new(OrderingSorter::new(keys)))
    }
}
