//! Stage-typed query builder
//!
//! ```text
//! QueryBuilder::new()
//!     .select("doc", "title")
//!     .from("doc")
//!     .where_()
//!         .property_value("doc", "size").is_greater_than().literal(10)
//!         .and()
//!         .open_paren()
//!             .property_value("doc", "title").is_like().literal("a%")
//!             .or()
//!             .not().property_value("doc", "title").is_equal_to().variable("t")
//!         .close_paren()
//!     .end()
//!     .order_by_descending(DynamicOperand::property("doc", "size"))
//!     .limit(10)
//!     .query()
//! ```
//!
//! Each stage only offers the calls that are valid next, so the builder
//! cannot produce a structurally broken query. It does not look at the
//! schema: operator admissibility is checked when the query executes.
//!
//! Adjacent terms are joined by AND; `or()` binds looser than AND, `not()`
//! negates the next term or parenthesised group.

use crate::model::{
    Column, Constraint, DynamicOperand, FullTextSearch, Join, JoinCondition, JoinType, Limit,
    Location, Operator, Ordering, Query, Selector, SelectorName, Source, StaticOperand,
};
use crate::value::Value;

/// Projection stage
#[derive(Debug, Default)]
pub struct QueryBuilder {
    columns: Vec<Column>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, selector: &str, property: &str) -> Self {
        self.columns.push(Column::new(selector, property));
        self
    }

    pub fn select_as(mut self, selector: &str, property: &str, alias: &str) -> Self {
        self.columns
            .push(Column::new(selector, property).with_alias(alias));
        self
    }

    /// `selector.*`
    pub fn select_all_of(mut self, selector: &str) -> Self {
        self.columns.push(Column::all_of(selector));
        self
    }

    pub fn select_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn from(self, table: &str) -> SourceBuilder {
        self.from_selector(Selector::new(table))
    }

    pub fn from_aliased(self, table: &str, alias: &str) -> SourceBuilder {
        self.from_selector(Selector::aliased(table, alias))
    }

    pub fn from_selector(self, selector: Selector) -> SourceBuilder {
        SourceBuilder {
            query: Query {
                columns: self.columns,
                ..Query::new(selector)
            },
        }
    }
}

/// Source, ordering and paging stage
#[derive(Debug)]
pub struct SourceBuilder {
    query: Query,
}

impl SourceBuilder {
    pub fn join(self, right: Selector) -> JoinBuilder {
        self.join_with(JoinType::Inner, right)
    }

    pub fn left_outer_join(self, right: Selector) -> JoinBuilder {
        self.join_with(JoinType::LeftOuter, right)
    }

    pub fn right_outer_join(self, right: Selector) -> JoinBuilder {
        self.join_with(JoinType::RightOuter, right)
    }

    fn join_with(self, join_type: JoinType, right: Selector) -> JoinBuilder {
        JoinBuilder {
            parent: self,
            join_type,
            right,
        }
    }

    /// Starts the WHERE clause. Called twice, the clauses are ANDed.
    pub fn where_(self) -> ConstraintBuilder {
        ConstraintBuilder {
            parent: self,
            frames: vec![Frame::default()],
        }
    }

    pub fn order_by(mut self, ordering: Ordering) -> Self {
        self.query.orderings.push(ordering);
        self
    }

    pub fn order_by_ascending(self, operand: DynamicOperand) -> Self {
        self.order_by(Ordering::ascending(operand))
    }

    pub fn order_by_descending(self, operand: DynamicOperand) -> Self {
        self.order_by(Ordering::descending(operand))
    }

    pub fn limit(mut self, row_limit: usize) -> Self {
        self.query.limit.row_limit = Some(row_limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.query.limit.offset = offset;
        self
    }

    pub fn paging(mut self, limit: Limit) -> Self {
        self.query.limit = limit;
        self
    }

    pub fn query(self) -> Query {
        self.query
    }
}

/// Join condition stage
#[derive(Debug)]
pub struct JoinBuilder {
    parent: SourceBuilder,
    join_type: JoinType,
    right: Selector,
}

impl JoinBuilder {
    pub fn on(mut self, condition: JoinCondition) -> SourceBuilder {
        let left = std::mem::replace(
            &mut self.parent.query.source,
            Source::Selector(self.right.clone()),
        );
        self.parent.query.source = Source::Join(Box::new(Join {
            left,
            right: Source::Selector(self.right),
            join_type: self.join_type,
            condition,
        }));
        self.parent
    }

    pub fn on_equi(
        self,
        selector1: &str,
        property1: &str,
        selector2: &str,
        property2: &str,
    ) -> SourceBuilder {
        self.on(JoinCondition::equi(selector1, property1, selector2, property2))
    }

    pub fn on_same_node(self, selector1: &str, selector2: &str) -> SourceBuilder {
        self.on(JoinCondition::same_node(selector1, selector2))
    }
}

/// One parenthesis level: OR of AND-groups
#[derive(Debug, Default)]
struct Frame {
    disjuncts: Vec<Vec<Constraint>>,
    negate_next: bool,
    negated: bool,
}

impl Frame {
    fn push(&mut self, constraint: Constraint) {
        let constraint = if std::mem::take(&mut self.negate_next) {
            Constraint::not(constraint)
        } else {
            constraint
        };
        match self.disjuncts.last_mut() {
            Some(group) => group.push(constraint),
            None => self.disjuncts.push(vec![constraint]),
        }
    }

    fn build(self) -> Option<Constraint> {
        let mut parts: Vec<Constraint> = self
            .disjuncts
            .into_iter()
            .filter_map(Constraint::from_conjuncts)
            .collect();
        let combined = match parts.len() {
            0 => return None,
            1 => parts.pop(),
            _ => Some(Constraint::Or(parts)),
        };
        if self.negated {
            combined.map(Constraint::not)
        } else {
            combined
        }
    }
}

/// WHERE clause stage
#[derive(Debug)]
pub struct ConstraintBuilder {
    parent: SourceBuilder,
    frames: Vec<Frame>,
}

impl ConstraintBuilder {
    fn frame(&mut self) -> &mut Frame {
        if self.frames.is_empty() {
            self.frames.push(Frame::default());
        }
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Adds a complete constraint as the next term
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.frame().push(constraint);
        self
    }

    pub fn operand(self, operand: DynamicOperand) -> ComparisonBuilder {
        ComparisonBuilder {
            parent: self,
            operand,
        }
    }

    pub fn property_value(self, selector: &str, property: &str) -> ComparisonBuilder {
        self.operand(DynamicOperand::property(selector, property))
    }

    pub fn length(self, selector: &str, property: &str) -> ComparisonBuilder {
        self.operand(DynamicOperand::property(selector, property).length())
    }

    pub fn lower_case(self, selector: &str, property: &str) -> ComparisonBuilder {
        self.operand(DynamicOperand::property(selector, property).lower_case())
    }

    pub fn upper_case(self, selector: &str, property: &str) -> ComparisonBuilder {
        self.operand(DynamicOperand::property(selector, property).upper_case())
    }

    pub fn full_text_search_score(self, selector: &str) -> ComparisonBuilder {
        self.operand(DynamicOperand::score(selector))
    }

    /// `property IS NOT NULL`
    pub fn has_property(self, selector: &str, property: &str) -> Self {
        self.constraint(Constraint::PropertyExistence {
            selector: SelectorName::new(selector),
            property: property.to_string(),
        })
    }

    /// `CONTAINS('expression')` over the whole entry
    pub fn contains(self, expression: &str) -> Self {
        self.constraint(Constraint::FullTextSearch(FullTextSearch {
            selector: None,
            property: None,
            expression: expression.to_string(),
        }))
    }

    /// `CONTAINS(selector[.property], 'expression')`
    pub fn contains_in(self, selector: &str, property: Option<&str>, expression: &str) -> Self {
        self.constraint(Constraint::FullTextSearch(FullTextSearch {
            selector: Some(SelectorName::new(selector)),
            property: property.map(str::to_string),
            expression: expression.to_string(),
        }))
    }

    /// `IN_FOLDER(selector, folder)`; a folder starting with `/` is a path
    pub fn in_folder(self, selector: &str, folder: &str) -> Self {
        self.constraint(Constraint::ChildNode {
            selector: SelectorName::new(selector),
            parent: Location::parse(folder),
        })
    }

    /// `IN_TREE(selector, folder)`
    pub fn in_tree(self, selector: &str, folder: &str) -> Self {
        self.constraint(Constraint::DescendantNode {
            selector: SelectorName::new(selector),
            ancestor: Location::parse(folder),
        })
    }

    /// Terms are ANDed by default; reads better in chains
    pub fn and(self) -> Self {
        self
    }

    pub fn or(mut self) -> Self {
        self.frame().disjuncts.push(Vec::new());
        self
    }

    pub fn not(mut self) -> Self {
        let frame = self.frame();
        frame.negate_next = !frame.negate_next;
        self
    }

    pub fn open_paren(mut self) -> Self {
        let negated = std::mem::take(&mut self.frame().negate_next);
        self.frames.push(Frame {
            negated,
            ..Frame::default()
        });
        self
    }

    /// Closes the innermost group; ignored at the top level
    pub fn close_paren(mut self) -> Self {
        if self.frames.len() > 1 {
            if let Some(frame) = self.frames.pop() {
                if let Some(group) = frame.build() {
                    self.frame().push(group);
                }
            }
        }
        self
    }

    /// Ends the WHERE clause, closing any open groups
    pub fn end(mut self) -> SourceBuilder {
        while self.frames.len() > 1 {
            self = self.close_paren();
        }
        let built = self.frames.pop().and_then(Frame::build);
        let mut parent = self.parent;
        parent.query.constraint = match (parent.query.constraint.take(), built) {
            (Some(existing), Some(new)) => Some(Constraint::and(existing, new)),
            (existing, new) => existing.or(new),
        };
        parent
    }
}

/// Operator stage of a comparison
#[derive(Debug)]
pub struct ComparisonBuilder {
    parent: ConstraintBuilder,
    operand: DynamicOperand,
}

impl ComparisonBuilder {
    pub fn is(self, operator: Operator) -> OperandBuilder {
        OperandBuilder {
            parent: self.parent,
            operand: self.operand,
            operator,
        }
    }

    pub fn is_equal_to(self) -> OperandBuilder {
        self.is(Operator::EqualTo)
    }

    pub fn is_not_equal_to(self) -> OperandBuilder {
        self.is(Operator::NotEqualTo)
    }

    pub fn is_less_than(self) -> OperandBuilder {
        self.is(Operator::LessThan)
    }

    pub fn is_less_than_or_equal_to(self) -> OperandBuilder {
        self.is(Operator::LessThanOrEqualTo)
    }

    pub fn is_greater_than(self) -> OperandBuilder {
        self.is(Operator::GreaterThan)
    }

    pub fn is_greater_than_or_equal_to(self) -> OperandBuilder {
        self.is(Operator::GreaterThanOrEqualTo)
    }

    pub fn is_like(self) -> OperandBuilder {
        self.is(Operator::Like)
    }
}

/// Right-hand side of a comparison
#[derive(Debug)]
pub struct OperandBuilder {
    parent: ConstraintBuilder,
    operand: DynamicOperand,
    operator: Operator,
}

impl OperandBuilder {
    fn finish(self, value: StaticOperand) -> ConstraintBuilder {
        self.parent
            .constraint(Constraint::comparison(self.operand, self.operator, value))
    }

    pub fn literal(self, value: impl Into<Value>) -> ConstraintBuilder {
        self.finish(StaticOperand::Literal(value.into()))
    }

    /// Bind variable resolved at execution
    pub fn variable(self, name: &str) -> ConstraintBuilder {
        self.finish(StaticOperand::BindVariable(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_query;

    #[test]
    fn test_builder_matches_parser() {
        let built = QueryBuilder::new()
            .select("someTable", "integerColumn")
            .from("someTable")
            .where_()
            .property_value("someTable", "integerColumn")
            .is_equal_to()
            .literal(1)
            .end()
            .query();
        let parsed =
            parse_query("SELECT integerColumn FROM someTable WHERE integerColumn = 1").unwrap();
        assert_eq!(built, parsed);
    }

    #[test]
    fn test_builder_does_not_validate() {
        let query = QueryBuilder::new()
            .from("noSuchTable")
            .where_()
            .property_value("noSuchTable", "x")
            .is_like()
            .literal(1)
            .end()
            .query();
        assert!(query.constraint.is_some());
    }

    #[test]
    fn test_grouping_and_negation() {
        let built = QueryBuilder::new()
            .from("d")
            .where_()
            .property_value("d", "a")
            .is_equal_to()
            .literal(1)
            .and()
            .open_paren()
            .property_value("d", "b")
            .is_equal_to()
            .literal(2)
            .or()
            .not()
            .property_value("d", "c")
            .is_equal_to()
            .variable("c")
            .close_paren()
            .end()
            .query();
        let parsed = parse_query("SELECT * FROM d WHERE a = 1 AND (b = 2 OR NOT c = $c)").unwrap();
        assert_eq!(built.constraint, parsed.constraint);
    }

    #[test]
    fn test_negated_group_and_unclosed_paren() {
        let built = QueryBuilder::new()
            .from("d")
            .where_()
            .not()
            .open_paren()
            .property_value("d", "a")
            .is_equal_to()
            .literal(1)
            .or()
            .has_property("d", "b")
            .end()
            .query();
        let parsed = parse_query("SELECT * FROM d WHERE NOT (a = 1 OR b IS NOT NULL)").unwrap();
        assert_eq!(built.constraint, parsed.constraint);
    }

    #[test]
    fn test_join_and_paging() {
        let query = QueryBuilder::new()
            .select_all_of("a")
            .select_as("b", "title", "t")
            .from_aliased("doc", "a")
            .left_outer_join(Selector::aliased("note", "b"))
            .on_equi("a", "id", "b", "ref")
            .order_by_ascending(DynamicOperand::property("b", "title"))
            .limit(5)
            .offset(10)
            .query();
        let parsed = parse_query(
            "SELECT a.*, b.title AS t FROM doc a LEFT JOIN note b ON a.id = b.ref \
             ORDER BY b.title LIMIT 5 OFFSET 10",
        )
        .unwrap();
        assert_eq!(query, parsed);
    }

    #[test]
    fn test_empty_where() {
        let query = QueryBuilder::new().from("d").where_().end().query();
        assert_eq!(query.constraint, None);
    }
}
