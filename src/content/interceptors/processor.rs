//! Query processor interceptor
//!
//! Orchestrates a ProcessQuery command:
//!
//! 1. build the sorter (explicit orderings are validated before any I/O)
//! 2. run each selector through ExecuteSelector with its pushed-down conjuncts
//! 3. join selector results bottom-up through the join tree
//! 4. filter joined rows by the conjuncts that could not be pushed down
//! 5. sort, then page, then project
//!
//! Paging always follows join and sort.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::content::command::{
    Command, CommandOutput, ExecuteSelectorCommand, ProcessQueryCommand,
};
use crate::content::context::InvocationContext;
use crate::content::interceptor::{Interceptor, Next};
use crate::model::{Constraint, JoinCondition, Query, Selector, SelectorName, Source};
use crate::result::{
    HashJoinCollector, ItemsList, JoinCollector, ResultSorterFactory, Row, RowFilter, RowValue,
    SchemaResultSorterFactory, ScoredRow,
};
use crate::search::{SearchError, SearchResult};
use crate::value::Value;

pub struct QueryProcessorInterceptor;

impl Interceptor for QueryProcessorInterceptor {
    fn name(&self) -> &'static str {
        "query-processor"
    }

    fn visit_process_query(
        &self,
        ctx: &InvocationContext,
        command: &ProcessQueryCommand,
        next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        QueryExecution::new(ctx, next, &command.query, &command.variables)
            .run()
            .map(CommandOutput::Items)
    }
}

/// Output column: name in the result row, selector, storage field
struct OutputColumn {
    name: String,
    selector: SelectorName,
    field: String,
}

struct QueryExecution<'a> {
    ctx: &'a InvocationContext,
    next: Next<'a>,
    query: &'a Query,
    variables: &'a BTreeMap<String, Value>,
    pushdown: BTreeMap<SelectorName, Vec<Constraint>>,
    residual: Vec<Constraint>,
}

impl<'a> QueryExecution<'a> {
    fn new(
        ctx: &'a InvocationContext,
        next: Next<'a>,
        query: &'a Query,
        variables: &'a BTreeMap<String, Value>,
    ) -> Self {
        let (pushdown, residual) = split_constraint(query);
        Self {
            ctx,
            next,
            query,
            variables,
            pushdown,
            residual,
        }
    }

    fn run(&self) -> SearchResult<ItemsList<Row>> {
        let factory = SchemaResultSorterFactory::new(self.ctx, &self.query.source);
        let sorter = if self.query.orderings.is_empty() {
            factory.default_result_sorter(&self.query.selector_names())?
        } else {
            factory.result_sorter(&self.query.orderings)?
        };
        let columns = self.output_columns()?;

        let mut rows = self.execute_source(&self.query.source)?;

        if let Some(residual) = Constraint::from_conjuncts(self.residual.clone()) {
            let filter = RowFilter::build(residual, |name, leaf| {
                let selector = self.selector(name)?;
                Ok(self
                    .execute_selector(selector, Some(leaf.clone()), Some(Vec::new()))?
                    .iter()
                    .filter_map(|row| row.identifier(name).map(str::to_string))
                    .collect::<HashSet<_>>())
            })?;
            rows.retain(|row| filter.matches(row));
        }

        sorter.sort(&mut rows);

        let total = rows.len();
        let (page, has_more_items) = self.query.limit.apply(rows);
        Ok(ItemsList {
            items: page.iter().map(|row| project(row, &columns)).collect(),
            has_more_items,
            num_items: total,
        })
    }

    fn selector(&self, name: &SelectorName) -> SearchResult<&'a Selector> {
        self.query.source.selector(name).ok_or_else(|| {
            SearchError::invalid_query(format!("Unknown selector '{}'", name))
        })
    }

    fn execute_source(&self, source: &Source) -> SearchResult<Vec<ScoredRow>> {
        match source {
            Source::Selector(selector) => {
                let constraint = self
                    .pushdown
                    .get(selector.name())
                    .and_then(|parts| Constraint::from_conjuncts(parts.clone()));
                let fields = self.fields_for(selector)?;
                self.execute_selector(selector, constraint, fields)
            }
            Source::Join(join) => {
                let left = self.execute_source(&join.left)?;
                let right = self.execute_source(&join.right)?;
                let collector = HashJoinCollector::for_condition(
                    self.ctx,
                    join.join_type,
                    &join.condition,
                    &join.left.selector_names(),
                )?;
                collector.join(left, right)
            }
        }
    }

    fn execute_selector(
        &self,
        selector: &Selector,
        constraint: Option<Constraint>,
        fields: Option<Vec<String>>,
    ) -> SearchResult<Vec<ScoredRow>> {
        let command = Command::ExecuteSelector(ExecuteSelectorCommand {
            selector: selector.clone(),
            constraint,
            fields,
            variables: self.variables.clone(),
        });
        self.next.dispatch(self.ctx, &command)?.into_rows()
    }

    /// Columns a selector must return: projected, ordered-by and join
    /// columns. `None` when everything is projected.
    fn fields_for(&self, selector: &Selector) -> SearchResult<Option<Vec<String>>> {
        let name = selector.name();
        let query = self.query;
        if query.columns.is_empty()
            || query
                .columns
                .iter()
                .any(|c| &c.selector == name && c.property.is_none())
        {
            return Ok(None);
        }

        let mut fields = BTreeSet::new();
        for column in query.columns.iter().filter(|c| &c.selector == name) {
            if let Some(property) = &column.property {
                fields.insert(property.clone());
            }
        }
        for ordering in &query.orderings {
            if let Some((selector, property)) = ordering.operand.property_ref() {
                if selector == name {
                    fields.insert(property.to_string());
                }
            }
        }
        if query.orderings.is_empty() {
            let table = self.ctx.schema().table(&selector.table)?;
            for item in &table.default_ordering {
                fields.insert(item.column.clone());
            }
        }
        for condition in join_conditions(&query.source) {
            if let JoinCondition::EquiJoin {
                selector1,
                property1,
                selector2,
                property2,
            } = condition
            {
                if selector1 == name {
                    fields.insert(property1.clone());
                }
                if selector2 == name {
                    fields.insert(property2.clone());
                }
            }
        }
        Ok(Some(fields.into_iter().collect()))
    }

    fn output_columns(&self) -> SearchResult<Vec<OutputColumn>> {
        let qualify = self.query.is_join();
        let requested = if self.query.columns.is_empty() {
            self.query
                .source
                .selectors()
                .into_iter()
                .map(|s| crate::model::Column::all_of(s.name().clone()))
                .collect()
        } else {
            self.query.columns.clone()
        };

        let mut out = Vec::new();
        for column in requested {
            match &column.property {
                Some(property) => out.push(OutputColumn {
                    name: column.alias.clone().unwrap_or_else(|| {
                        output_name(qualify, &column.selector, property)
                    }),
                    selector: column.selector.clone(),
                    field: self.ctx.storage_name(property),
                }),
                None => {
                    let selector = self.selector(&column.selector)?;
                    let table = self.ctx.schema().table(&selector.table)?;
                    for table_column in table.columns() {
                        out.push(OutputColumn {
                            name: output_name(qualify, &column.selector, &table_column.name),
                            selector: column.selector.clone(),
                            field: self.ctx.storage_name(&table_column.name),
                        });
                    }
                }
            }
        }
        Ok(out)
    }
}

fn output_name(qualify: bool, selector: &SelectorName, property: &str) -> String {
    if qualify {
        format!("{}.{}", selector, property)
    } else {
        property.to_string()
    }
}

fn project(row: &ScoredRow, columns: &[OutputColumn]) -> Row {
    Row {
        identifiers: row
            .selectors
            .iter()
            .map(|(name, r)| (name.clone(), r.identifier.clone()))
            .collect(),
        values: columns
            .iter()
            .map(|c| RowValue {
                name: c.name.clone(),
                values: row.values(&c.selector, &c.field).to_vec(),
            })
            .collect(),
        score: row.score,
    }
}

fn join_conditions(source: &Source) -> Vec<&JoinCondition> {
    match source {
        Source::Selector(_) => Vec::new(),
        Source::Join(join) => {
            let mut out = join_conditions(&join.left);
            out.extend(join_conditions(&join.right));
            out.push(&join.condition);
            out
        }
    }
}

fn has_unqualified_full_text(constraint: &Constraint) -> bool {
    let mut found = false;
    constraint.walk(&mut |c| {
        if let Constraint::FullTextSearch(search) = c {
            found |= search.selector.is_none();
        }
    });
    found
}

/// Splits the WHERE clause into per-selector conjuncts that run inside the
/// selector's index query and a residual applied after joining.
///
/// A conjunct is pushed down when it reads exactly one selector and that
/// selector cannot be null-extended by an outer join.
fn split_constraint(query: &Query) -> (BTreeMap<SelectorName, Vec<Constraint>>, Vec<Constraint>) {
    let conjuncts = query
        .constraint
        .clone()
        .map(Constraint::into_conjuncts)
        .unwrap_or_default();
    let mut pushdown: BTreeMap<SelectorName, Vec<Constraint>> = BTreeMap::new();
    let mut residual = Vec::new();

    if !query.is_join() {
        if let Some(name) = query.selector_names().into_iter().next() {
            pushdown.insert(name, conjuncts);
        }
        return (pushdown, residual);
    }

    let nullable = query.source.nullable_selectors();
    for conjunct in conjuncts {
        let selectors = conjunct.selectors();
        let target = match selectors.len() {
            1 if !has_unqualified_full_text(&conjunct) => selectors.into_iter().next(),
            _ => None,
        };
        match target {
            Some(selector) if !nullable.contains(&selector) => {
                pushdown.entry(selector).or_default().push(conjunct)
            }
            _ => residual.push(conjunct),
        }
    }
    (pushdown, residual)
}
