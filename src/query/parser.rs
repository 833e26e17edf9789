//! Textual query parser
//!
//! ```text
//! query      := SELECT select_list FROM source [WHERE or_expr]
//!               [ORDER BY ordering {, ordering}] [LIMIT n] [OFFSET n]
//! select     := * | item {, item}
//! item       := sel.* | [sel.]column [[AS] alias] | SCORE() [[AS] alias]
//! source     := table_ref {join_type JOIN table_ref ON join_cond}
//! join_cond  := sel.col = sel.col | ISSAMENODE(sel, sel)
//! or_expr    := and_expr {OR and_expr}
//! and_expr   := not_expr {AND not_expr}
//! not_expr   := NOT not_expr | ( or_expr ) | CONTAINS(...) | IN_FOLDER(...)
//!             | IN_TREE(...) | operand predicate
//! operand    := [sel.]column | LOWER(operand) | UPPER(operand)
//!             | LENGTH(operand) | SCORE([sel])
//! predicate  := op static | [NOT] LIKE static | IS [NOT] NULL
//! static     := 'text' | number | TRUE | FALSE | TIMESTAMP 'iso' | $var
//! ```
//!
//! Keywords are case-insensitive. Unqualified columns belong to the only
//! selector of a single-selector query and must be qualified in a join.
//! The parser builds structure only; columns and operators are checked
//! against the schema at execution.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::lexer::{tokenize, Token, TokenKind};
use crate::model::{
    Column, Constraint, DynamicOperand, FullTextSearch, Join, JoinCondition, JoinType, Limit,
    Location, Operator, Order, Ordering, Query, Selector, SelectorName, Source, StaticOperand,
};
use crate::search::{SearchError, SearchResult};
use crate::value::Value;

const RESERVED: &[&str] = &[
    "SELECT", "FROM", "WHERE", "AND", "OR", "NOT", "ORDER", "BY", "ASC", "DESC", "LIMIT",
    "OFFSET", "JOIN", "INNER", "LEFT", "RIGHT", "OUTER", "ON", "AS", "IS", "NULL", "LIKE",
];

static EOF: TokenKind = TokenKind::Eof;

/// Parses query text into a query model
pub fn parse_query(text: &str) -> SearchResult<Query> {
    let tokens = tokenize(text).map_err(|e| {
        SearchError::invalid_query(format!("Syntax error at offset {}: {}", e.offset, e.message))
    })?;
    Parser::new(tokens).parse()
}

struct RawColumn {
    qualifier: Option<String>,
    /// `None` for `sel.*`
    property: Option<String>,
    alias: Option<String>,
    offset: usize,
}

enum SelectItem {
    Column(RawColumn),
    Score { alias: Option<String>, offset: usize },
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    selectors: Vec<SelectorName>,
    aliases: BTreeMap<String, DynamicOperand>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            selectors: Vec::new(),
            aliases: BTreeMap::new(),
        }
    }

    // Token stream

    fn peek(&self) -> &TokenKind {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .or_else(|| self.tokens.last())
            .map(|t| &t.kind)
            .unwrap_or(&EOF)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.offset)
            .unwrap_or(0)
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn error(&self, expected: &str) -> SearchError {
        SearchError::invalid_query(format!(
            "Syntax error at offset {}: expected {}, found {}",
            self.offset(),
            expected,
            self.peek()
        ))
    }

    fn is_keyword_at(&self, n: usize, keyword: &str) -> bool {
        matches!(self.peek_at(n), TokenKind::Ident(s) if s.eq_ignore_ascii_case(keyword))
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        self.is_keyword_at(0, keyword)
    }

    /// Keyword immediately followed by `(`
    fn is_function(&self, name: &str) -> bool {
        self.is_keyword(name) && *self.peek_at(1) == TokenKind::LParen
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.is_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> SearchResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(keyword))
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> SearchResult<()> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(self.error(&kind.to_string()))
        }
    }

    fn is_plain_ident(&self) -> bool {
        match self.peek() {
            TokenKind::Ident(s) => !RESERVED.iter().any(|k| s.eq_ignore_ascii_case(k)),
            TokenKind::QuotedIdent(_) => true,
            _ => false,
        }
    }

    fn ident(&mut self) -> SearchResult<String> {
        if !self.is_plain_ident() {
            return Err(self.error("identifier"));
        }
        match self.advance() {
            TokenKind::Ident(s) | TokenKind::QuotedIdent(s) => Ok(s),
            _ => Err(self.error("identifier")),
        }
    }

    fn string(&mut self) -> SearchResult<String> {
        match self.peek().clone() {
            TokenKind::Str(s) => {
                self.pos += 1;
                Ok(s)
            }
            _ => Err(self.error("string literal")),
        }
    }

    fn optional_alias(&mut self) -> SearchResult<Option<String>> {
        if self.eat_keyword("AS") {
            return self.ident().map(Some);
        }
        if self.is_plain_ident() {
            return self.ident().map(Some);
        }
        Ok(None)
    }

    fn count(&mut self) -> SearchResult<usize> {
        match self.peek().clone() {
            TokenKind::Number(n) => {
                let value = n
                    .parse::<usize>()
                    .map_err(|_| self.error("non-negative integer"))?;
                self.pos += 1;
                Ok(value)
            }
            _ => Err(self.error("non-negative integer")),
        }
    }

    // Query

    fn parse(mut self) -> SearchResult<Query> {
        self.expect_keyword("SELECT")?;
        let items = self.select_list()?;
        self.expect_keyword("FROM")?;
        let source = self.source()?;
        self.selectors = source.selector_names();

        let mut query = Query::new(source);
        query.columns = self.resolve_columns(items)?;

        if self.eat_keyword("WHERE") {
            query.constraint = Some(self.or_expr()?);
        }

        if self.eat_keyword("ORDER") {
            self.expect_keyword("BY")?;
            loop {
                query.orderings.push(self.ordering()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }

        let mut limit = Limit::none();
        if self.eat_keyword("LIMIT") {
            limit.row_limit = Some(self.count()?);
        }
        if self.eat_keyword("OFFSET") {
            limit.offset = self.count()?;
        }
        query.limit = limit;

        if *self.peek() != TokenKind::Eof {
            return Err(self.error("end of query"));
        }
        Ok(query)
    }

    fn select_list(&mut self) -> SearchResult<Vec<SelectItem>> {
        if self.eat(&TokenKind::Star) {
            return Ok(Vec::new());
        }
        let mut items = Vec::new();
        loop {
            let offset = self.offset();
            if self.is_function("SCORE") {
                self.pos += 1;
                self.expect(TokenKind::LParen)?;
                self.expect(TokenKind::RParen)?;
                let alias = self.optional_alias()?;
                items.push(SelectItem::Score { alias, offset });
            } else {
                let name = self.ident()?;
                let item = if self.eat(&TokenKind::Dot) {
                    if self.eat(&TokenKind::Star) {
                        RawColumn {
                            qualifier: Some(name),
                            property: None,
                            alias: None,
                            offset,
                        }
                    } else {
                        RawColumn {
                            qualifier: Some(name),
                            property: Some(self.ident()?),
                            alias: self.optional_alias()?,
                            offset,
                        }
                    }
                } else {
                    RawColumn {
                        qualifier: None,
                        property: Some(name),
                        alias: self.optional_alias()?,
                        offset,
                    }
                };
                items.push(SelectItem::Column(item));
            }
            if !self.eat(&TokenKind::Comma) {
                return Ok(items);
            }
        }
    }

    fn default_selector(&self, what: &str, offset: usize) -> SearchResult<SelectorName> {
        match self.selectors.as_slice() {
            [only] => Ok(only.clone()),
            _ => Err(SearchError::invalid_query(format!(
                "Syntax error at offset {}: {} must be qualified with a selector in a join",
                offset, what
            ))),
        }
    }

    /// SCORE() aliases and column aliases become usable in ORDER BY
    fn resolve_columns(&mut self, items: Vec<SelectItem>) -> SearchResult<Vec<Column>> {
        let mut columns = Vec::new();
        for item in items {
            match item {
                SelectItem::Score { alias, offset } => {
                    let selector = self.default_selector("SCORE()", offset)?;
                    if let Some(alias) = alias {
                        self.aliases
                            .insert(alias, DynamicOperand::FullTextSearchScore { selector });
                    }
                }
                SelectItem::Column(raw) => {
                    let selector = match raw.qualifier {
                        Some(q) => SelectorName::new(q),
                        None => {
                            let what = format!("Column '{}'", raw.property.as_deref().unwrap_or("*"));
                            self.default_selector(&what, raw.offset)?
                        }
                    };
                    let column = match raw.property {
                        Some(property) => {
                            if let Some(alias) = &raw.alias {
                                self.aliases.insert(
                                    alias.clone(),
                                    DynamicOperand::property(selector.clone(), property.clone()),
                                );
                            }
                            Column {
                                selector,
                                property: Some(property),
                                alias: raw.alias,
                            }
                        }
                        None => Column::all_of(selector),
                    };
                    columns.push(column);
                }
            }
        }
        Ok(columns)
    }

    // FROM

    fn table_ref(&mut self) -> SearchResult<Selector> {
        let table = self.ident()?;
        Ok(match self.optional_alias()? {
            Some(alias) => Selector::aliased(table, alias),
            None => Selector::new(table),
        })
    }

    fn join_type(&mut self) -> SearchResult<Option<JoinType>> {
        let join_type = if self.eat_keyword("JOIN") {
            return Ok(Some(JoinType::Inner));
        } else if self.eat_keyword("INNER") {
            JoinType::Inner
        } else if self.eat_keyword("LEFT") {
            self.eat_keyword("OUTER");
            JoinType::LeftOuter
        } else if self.eat_keyword("RIGHT") {
            self.eat_keyword("OUTER");
            JoinType::RightOuter
        } else {
            return Ok(None);
        };
        self.expect_keyword("JOIN")?;
        Ok(Some(join_type))
    }

    fn source(&mut self) -> SearchResult<Source> {
        let mut source = Source::Selector(self.table_ref()?);
        while let Some(join_type) = self.join_type()? {
            let right = self.table_ref()?;
            self.expect_keyword("ON")?;
            let condition = self.join_condition()?;
            source = Source::Join(Box::new(Join {
                left: source,
                right: right.into(),
                join_type,
                condition,
            }));
        }
        Ok(source)
    }

    fn join_condition(&mut self) -> SearchResult<JoinCondition> {
        if self.is_function("ISSAMENODE") {
            self.pos += 1;
            self.expect(TokenKind::LParen)?;
            let first = self.ident()?;
            self.expect(TokenKind::Comma)?;
            let second = self.ident()?;
            self.expect(TokenKind::RParen)?;
            return Ok(JoinCondition::same_node(first, second));
        }
        let selector1 = self.ident()?;
        self.expect(TokenKind::Dot)?;
        let property1 = self.ident()?;
        self.expect(TokenKind::Eq)?;
        let selector2 = self.ident()?;
        self.expect(TokenKind::Dot)?;
        let property2 = self.ident()?;
        Ok(JoinCondition::equi(selector1, property1, selector2, property2))
    }

    // WHERE

    fn or_expr(&mut self) -> SearchResult<Constraint> {
        let mut left = self.and_expr()?;
        while self.eat_keyword("OR") {
            left = Constraint::or(left, self.and_expr()?);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> SearchResult<Constraint> {
        let mut left = self.not_expr()?;
        while self.eat_keyword("AND") {
            left = Constraint::and(left, self.not_expr()?);
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> SearchResult<Constraint> {
        if self.eat_keyword("NOT") {
            return Ok(Constraint::not(self.not_expr()?));
        }
        if self.eat(&TokenKind::LParen) {
            let inner = self.or_expr()?;
            self.expect(TokenKind::RParen)?;
            return Ok(inner);
        }
        if self.is_function("CONTAINS") {
            return self.contains();
        }
        if self.is_function("IN_FOLDER") || self.is_function("ISCHILDNODE") {
            self.pos += 1;
            let (selector, parent) = self.folder_args("IN_FOLDER")?;
            return Ok(Constraint::ChildNode { selector, parent });
        }
        if self.is_function("IN_TREE") || self.is_function("ISDESCENDANTNODE") {
            self.pos += 1;
            let (selector, ancestor) = self.folder_args("IN_TREE")?;
            return Ok(Constraint::DescendantNode { selector, ancestor });
        }
        self.predicate()
    }

    fn contains(&mut self) -> SearchResult<Constraint> {
        self.pos += 1;
        self.expect(TokenKind::LParen)?;
        let mut selector = None;
        let mut property = None;
        if !matches!(self.peek(), TokenKind::Str(_)) {
            selector = Some(SelectorName::new(self.ident()?));
            if self.eat(&TokenKind::Dot) {
                property = Some(self.ident()?);
            }
            self.expect(TokenKind::Comma)?;
        }
        let expression = self.string()?;
        self.expect(TokenKind::RParen)?;
        Ok(Constraint::FullTextSearch(FullTextSearch {
            selector,
            property,
            expression,
        }))
    }

    fn folder_args(&mut self, name: &str) -> SearchResult<(SelectorName, Location)> {
        let offset = self.offset();
        self.expect(TokenKind::LParen)?;
        let selector = if matches!(self.peek(), TokenKind::Str(_)) {
            self.default_selector(&format!("{}()", name), offset)?
        } else {
            let selector = SelectorName::new(self.ident()?);
            self.expect(TokenKind::Comma)?;
            selector
        };
        let location = Location::parse(&self.string()?);
        self.expect(TokenKind::RParen)?;
        Ok((selector, location))
    }

    fn predicate(&mut self) -> SearchResult<Constraint> {
        let operand = self.dynamic_operand()?;

        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            self.expect_keyword("NULL")?;
            let (selector, property) = match &operand {
                DynamicOperand::PropertyValue { selector, property } => {
                    (selector.clone(), property.clone())
                }
                other => {
                    return Err(SearchError::invalid_query(format!(
                        "IS NULL requires a column, found {}",
                        other
                    )))
                }
            };
            let exists = Constraint::PropertyExistence { selector, property };
            return Ok(if negated { exists } else { Constraint::not(exists) });
        }

        if self.eat_keyword("NOT") {
            self.expect_keyword("LIKE")?;
            let value = self.static_operand()?;
            return Ok(Constraint::not(Constraint::comparison(
                operand,
                Operator::Like,
                value,
            )));
        }

        let operator = if self.eat_keyword("LIKE") {
            Operator::Like
        } else {
            match self.peek() {
                TokenKind::Eq => Operator::EqualTo,
                TokenKind::NotEq => Operator::NotEqualTo,
                TokenKind::Lt => Operator::LessThan,
                TokenKind::LtEq => Operator::LessThanOrEqualTo,
                TokenKind::Gt => Operator::GreaterThan,
                TokenKind::GtEq => Operator::GreaterThanOrEqualTo,
                _ => return Err(self.error("comparison operator")),
            }
        };
        if operator != Operator::Like {
            self.pos += 1;
        }
        let value = self.static_operand()?;
        Ok(Constraint::comparison(operand, operator, value))
    }

    fn dynamic_operand(&mut self) -> SearchResult<DynamicOperand> {
        let functions: [(&str, fn(DynamicOperand) -> DynamicOperand); 3] = [
            ("LOWER", DynamicOperand::lower_case),
            ("UPPER", DynamicOperand::upper_case),
            ("LENGTH", DynamicOperand::length),
        ];
        for (name, wrap) in functions {
            if self.is_function(name) {
                self.pos += 1;
                self.expect(TokenKind::LParen)?;
                let inner = self.dynamic_operand()?;
                self.expect(TokenKind::RParen)?;
                return Ok(wrap(inner));
            }
        }

        if self.is_function("SCORE") {
            let offset = self.offset();
            self.pos += 1;
            self.expect(TokenKind::LParen)?;
            let selector = if *self.peek() == TokenKind::RParen {
                self.default_selector("SCORE()", offset)?
            } else {
                SelectorName::new(self.ident()?)
            };
            self.expect(TokenKind::RParen)?;
            return Ok(DynamicOperand::FullTextSearchScore { selector });
        }

        let offset = self.offset();
        let name = self.ident()?;
        if self.eat(&TokenKind::Dot) {
            let property = self.ident()?;
            return Ok(DynamicOperand::property(name, property));
        }
        let selector = self.default_selector(&format!("Column '{}'", name), offset)?;
        Ok(DynamicOperand::property(selector, name))
    }

    fn static_operand(&mut self) -> SearchResult<StaticOperand> {
        let negative = self.eat(&TokenKind::Minus);
        let value = match self.peek().clone() {
            TokenKind::Variable(name) if !negative => {
                self.pos += 1;
                return Ok(StaticOperand::BindVariable(name));
            }
            TokenKind::Number(text) => {
                let value = number(&text, negative).ok_or_else(|| self.error("number"))?;
                self.pos += 1;
                value
            }
            _ if negative => return Err(self.error("number")),
            TokenKind::Str(s) => {
                self.pos += 1;
                Value::String(s)
            }
            TokenKind::Ident(_) if self.is_keyword("TRUE") => {
                self.pos += 1;
                Value::Boolean(true)
            }
            TokenKind::Ident(_) if self.is_keyword("FALSE") => {
                self.pos += 1;
                Value::Boolean(false)
            }
            TokenKind::Ident(_) if self.is_keyword("TIMESTAMP") => {
                self.pos += 1;
                let offset = self.offset();
                let text = self.string()?;
                let parsed = DateTime::parse_from_rfc3339(&text).map_err(|e| {
                    SearchError::invalid_query(format!(
                        "Syntax error at offset {}: invalid timestamp '{}': {}",
                        offset, text, e
                    ))
                })?;
                Value::DateTime(parsed.with_timezone(&Utc))
            }
            _ => return Err(self.error("literal or variable")),
        };
        Ok(StaticOperand::Literal(value))
    }

    // ORDER BY

    fn ordering(&mut self) -> SearchResult<Ordering> {
        let alias = match self.peek() {
            TokenKind::Ident(name)
                if !matches!(self.peek_at(1), TokenKind::Dot | TokenKind::LParen) =>
            {
                self.aliases.get(name).cloned()
            }
            _ => None,
        };
        let operand = match alias {
            Some(operand) => {
                self.pos += 1;
                operand
            }
            None => self.dynamic_operand()?,
        };

        let order = if self.eat_keyword("DESC") {
            Order::Descending
        } else {
            self.eat_keyword("ASC");
            Order::Ascending
        };
        Ok(Ordering { operand, order })
    }
}

fn number(text: &str, negative: bool) -> Option<Value> {
    let signed = if negative {
        format!("-{}", text)
    } else {
        text.to_string()
    };
    if text.contains(['.', 'e', 'E']) {
        signed.parse::<f64>().ok().map(Value::Double)
    } else {
        signed.parse::<i64>().ok().map(Value::Long)
    }
}
