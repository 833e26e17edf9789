//! Column operator admissibility
//!
//! A comparison is accepted only when the column's available query
//! operators include it. Validation happens before anything is dispatched.

use std::sync::Arc;

use cmis_search::model::{Constraint, DynamicOperand, Operator, Query, Selector, StaticOperand};
use cmis_search::schema::{InMemorySchema, Schema};
use cmis_search::search::{IndexConfiguration, SearchService, SearchServiceConfiguration};
use cmis_search::value::{ColumnType, Value};

fn setup_service() -> SearchService {
    let schema: Arc<dyn Schema> = Arc::new(
        InMemorySchema::builder()
            .add_table("someTable")
            .add_column(
                "someTable",
                "integerColumn",
                ColumnType::Integer,
                true,
                &[Operator::EqualTo],
            )
            .build()
            .unwrap(),
    );
    let service = SearchService::new(SearchServiceConfiguration::new(
        schema,
        IndexConfiguration::in_memory("root"),
    ));
    service.start().unwrap();
    service
}

fn comparison_query(operator: Operator) -> Query {
    let mut query = Query::new(Selector::new("someTable"));
    query.constraint = Some(Constraint::comparison(
        DynamicOperand::property("someTable", "integerColumn"),
        operator,
        StaticOperand::Literal(Value::Long(7)),
    ));
    query
}

/// LIKE is not in the column's operator set and is rejected.
#[test]
fn test_like_is_rejected() {
    let service = setup_service();
    let err = service.execute(&comparison_query(Operator::Like)).unwrap_err();
    assert!(err.is_invalid_query());
    assert!(err.to_string().contains("LIKE"));
}

/// Equality is in the column's operator set and is accepted.
#[test]
fn test_equality_is_accepted() {
    let service = setup_service();
    let result = service.execute(&comparison_query(Operator::EqualTo)).unwrap();
    assert!(result.is_empty());
    assert_eq!(result.num_items, 0);
}

/// Only the declared operator passes; every other one is rejected.
#[test]
fn test_every_operator_checked() {
    let service = setup_service();
    for operator in Operator::ALL {
        let result = service.execute(&comparison_query(operator));
        if operator == Operator::EqualTo {
            assert!(result.is_ok(), "{:?} should be accepted", operator);
        } else {
            let err = result.unwrap_err();
            assert!(err.is_invalid_query(), "{:?} should be rejected", operator);
        }
    }

    let metrics = service.metrics();
    assert_eq!(metrics.queries_executed, 1);
    assert_eq!(metrics.queries_rejected, Operator::ALL.len() as u64 - 1);
}

/// Operator admissibility applies to parsed statements too.
#[test]
fn test_parsed_statement_checked() {
    let service = setup_service();
    assert!(service
        .execute_sql("SELECT * FROM someTable WHERE integerColumn = 7")
        .is_ok());
    assert!(service
        .execute_sql("SELECT * FROM someTable WHERE integerColumn > 7")
        .unwrap_err()
        .is_invalid_query());
    assert!(service
        .execute_sql("SELECT * FROM otherTable")
        .unwrap_err()
        .is_table_doesnt_exist());
}
