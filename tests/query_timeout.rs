//! Deadline-bounded execution on the tokio blocking pool

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use cmis_search::content::ContentEntry;
use cmis_search::model::{Operator, Query, Selector};
use cmis_search::schema::{InMemorySchema, Schema};
use cmis_search::search::{
    execute_with_timeout, IndexConfiguration, SearchService, SearchServiceConfiguration,
};
use cmis_search::value::ColumnType;

fn setup_service() -> Arc<SearchService> {
    let schema: Arc<dyn Schema> = Arc::new(
        InMemorySchema::builder()
            .add_table("doc")
            .add_column("doc", "title", ColumnType::String, true, &[Operator::EqualTo])
            .build()
            .unwrap(),
    );
    let service = SearchService::new(SearchServiceConfiguration::new(
        schema,
        IndexConfiguration::in_memory("root"),
    ));
    service.start().unwrap();
    service
        .modify_index(
            vec![
                ContentEntry::new("d1", "doc").with_property("title", "a"),
                ContentEntry::new("d2", "doc").with_property("title", "b"),
            ],
            vec![],
        )
        .unwrap();
    Arc::new(service)
}

#[tokio::test]
async fn test_query_completes_within_deadline() {
    let service = setup_service();
    let result = execute_with_timeout(
        service.clone(),
        Query::new(Selector::new("doc")),
        BTreeMap::new(),
        Duration::from_secs(10),
    )
    .await
    .unwrap();
    assert_eq!(result.num_items, 2);
    assert_eq!(service.metrics().queries_executed, 1);
}

#[tokio::test]
async fn test_errors_pass_through() {
    let service = setup_service();
    let err = execute_with_timeout(
        service,
        Query::new(Selector::new("missing")),
        BTreeMap::new(),
        Duration::from_secs(10),
    )
    .await
    .unwrap_err();
    assert!(err.is_table_doesnt_exist());
}

#[tokio::test]
async fn test_stopped_service_fails() {
    let service = setup_service();
    service.stop().unwrap();
    let result = execute_with_timeout(
        service,
        Query::new(Selector::new("doc")),
        BTreeMap::new(),
        Duration::from_secs(10),
    )
    .await;
    assert!(result.is_err());
}
