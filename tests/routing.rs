mod common;

use common::{engine, provider_db, MockDatabase};
use serde_json::json;
use sqlite_provider::{
    AppError, ProviderConfig, QueryRequest, RecordingSink, ResourceUri, Selection, Values, ViewConfig,
};
use std::sync::Arc;

fn uri(s: &str) -> ResourceUri {
    ResourceUri::parse(s).unwrap()
}

fn setup() -> (Arc<MockDatabase>, Arc<RecordingSink>, sqlite_provider::RoutingEngine) {
    setup_with(ProviderConfig::default())
}

fn setup_with(config: ProviderConfig) -> (Arc<MockDatabase>, Arc<RecordingSink>, sqlite_provider::RoutingEngine) {
    let db = Arc::new(provider_db());
    let sink = Arc::new(RecordingSink::new());
    let engine = engine(db.clone(), sink.clone(), config);
    (db, sink, engine)
}

fn named(name: &str) -> Values {
    let mut v = Values::new();
    v.insert("name".into(), json!(name));
    v
}

#[tokio::test]
async fn query_selects_table_and_scopes_item_by_bare_id() {
    let (db, _, engine) = setup();
    let result = engine
        .query(&uri("content://test.com/test/1"), &QueryRequest::default())
        .await
        .unwrap();
    let q = db.last_query();
    assert_eq!(q.table, "test");
    assert_eq!(q.where_parts, vec!["_id=1".to_string()]);
    assert_eq!(result.notification_uri, "content://test.com/test");
}

#[tokio::test]
async fn query_scopes_children_by_quoted_parent_id() {
    let (db, _, engine) = setup();
    engine
        .query(&uri("content://test.com/parent/1/children"), &QueryRequest::default())
        .await
        .unwrap();
    let q = db.last_query();
    assert_eq!(q.table, "children");
    assert_eq!(q.where_parts, vec!["parent_id='1'".to_string()]);
}

#[tokio::test]
async fn query_passes_modifiers_through() {
    let (db, _, engine) = setup();
    engine
        .query(
            &uri("content://test.com/test?groupBy=name&having=count(*)>1&limit=100&distinct=true"),
            &QueryRequest::default(),
        )
        .await
        .unwrap();
    let q = db.last_query();
    assert_eq!(q.group_by.as_deref(), Some("name"));
    assert_eq!(q.having.as_deref(), Some("count(*)>1"));
    assert_eq!(q.limit.as_deref(), Some("100"));
    assert!(q.distinct);

    engine
        .query(&uri("content://test.com/test?distinct=false"), &QueryRequest::default())
        .await
        .unwrap();
    let q = db.last_query();
    assert!(!q.distinct);
    assert_eq!(q.group_by, None);
    assert_eq!(q.having, None);
    assert_eq!(q.limit, None);
}

#[tokio::test]
async fn query_expands_foreign_table() {
    let (db, _, engine) = setup();
    engine
        .query(&uri("content://test.com/children?expand=parent"), &QueryRequest::default())
        .await
        .unwrap();
    let q = db.last_query();
    assert_eq!(
        q.from_clause(),
        "\"children\" LEFT OUTER JOIN \"parent\" ON \"children\".\"parent_id\"=\"parent\".\"_id\""
    );
    let map = q.projection_map.unwrap();
    assert_eq!(map.get("parent__id").map(String::as_str), Some("parent._id AS parent__id"));
    assert_eq!(map.get("children_name").map(String::as_str), Some("children.name AS children_name"));
}

#[tokio::test]
async fn query_carries_caller_inputs() {
    let (db, _, engine) = setup();
    let request = QueryRequest {
        projection: Some(vec!["name".into()]),
        selection: Selection::new("name = ?", vec!["x".into()]),
        sort_order: Some("name ASC".into()),
    };
    engine.query(&uri("/test"), &request).await.unwrap();
    let q = db.last_query();
    assert_eq!(q.projection, request.projection);
    assert_eq!(q.selection, request.selection);
    assert_eq!(q.sort_order.as_deref(), Some("name ASC"));
}

#[tokio::test]
async fn bulk_insert_notifies_once() {
    let (db, sink, engine) = setup();
    let items: Vec<Values> = (0..100).map(|i| named(&format!("n{}", i))).collect();
    let report = engine.bulk_insert(&uri("content://test.com/table1"), &items).await.unwrap();
    assert_eq!(report.inserted, 100);
    assert!(report.failures.is_empty());
    assert_eq!(sink.count(), 1);
    assert_eq!(sink.uris(), vec!["content://test.com/table1".to_string()]);
    db.with(|c| {
        assert_eq!(c.batch_inserts.len(), 100);
        assert!(c.inserts.is_empty());
        assert_eq!(c.batches_begun, 1);
        assert_eq!(c.batches_committed, 1);
    });
}

#[tokio::test]
async fn single_mutations_notify_each_time() {
    let (_, sink, engine) = setup();
    let table = uri("content://test.com/table1");
    for i in 0..100 {
        engine.insert(&table, &named(&format!("n{}", i))).await.unwrap();
    }
    assert_eq!(sink.count(), 100);
    for _ in 0..100 {
        engine.update(&table, &named("x"), &Selection::default()).await.unwrap();
    }
    assert_eq!(sink.count(), 200);
    for _ in 0..100 {
        engine.delete(&table, &Selection::default()).await.unwrap();
    }
    assert_eq!(sink.count(), 300);
}

#[tokio::test]
async fn bulk_insert_yields_per_item_by_default() {
    let items: Vec<Values> = (0..100).map(|i| named(&format!("n{}", i))).collect();

    let (db, _, engine) = setup();
    engine.bulk_insert(&uri("content://test.com/table1"), &items).await.unwrap();
    assert_eq!(db.with(|c| c.yields), 100);

    let (db, _, engine) = setup();
    engine
        .bulk_insert(&uri("content://test.com/table1?allowYield=true"), &items)
        .await
        .unwrap();
    assert_eq!(db.with(|c| c.yields), 100);

    let (db, _, engine) = setup();
    engine
        .bulk_insert(&uri("content://test.com/table1?allowYield=false"), &items)
        .await
        .unwrap();
    assert_eq!(db.with(|c| c.yields), 0);
}

#[tokio::test]
async fn bulk_insert_records_item_failures_and_still_notifies() {
    let db = Arc::new(provider_db().rejecting("name", json!("dup")));
    let sink = Arc::new(RecordingSink::new());
    let engine = engine(db.clone(), sink.clone(), ProviderConfig::default());

    let items = vec![named("a"), named("dup"), named("b")];
    let report = engine.bulk_insert(&uri("/table1"), &items).await.unwrap();
    assert_eq!(report.inserted, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert_eq!(report.failures[0].code, "constraint_violation");
    assert_eq!(sink.count(), 1);

    let report = engine.bulk_insert(&uri("/table1"), &[named("dup")]).await.unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(sink.count(), 1);
}

#[tokio::test]
async fn configured_view_notifies_its_base_table() {
    let config = ProviderConfig {
        views: vec![ViewConfig {
            name: "view1".into(),
            base_table: "table1".into(),
        }],
        ..Default::default()
    };
    let (_, sink, engine) = setup_with(config);
    let result = engine
        .query(&uri("content://test.com/view1"), &QueryRequest::default())
        .await
        .unwrap();
    assert_eq!(result.notification_uri, "content://test.com/table1");

    engine
        .update(&uri("content://test.com/view1/3"), &named("x"), &Selection::default())
        .await
        .unwrap();
    assert_eq!(sink.uris(), vec!["content://test.com/table1".to_string()]);
}

#[tokio::test]
async fn view_ddl_names_the_base_table() {
    let (_, _, engine) = setup();
    let result = engine
        .query(&uri("content://test.com/view2"), &QueryRequest::default())
        .await
        .unwrap();
    assert_eq!(result.notification_uri, "content://test.com/table1");
}

#[tokio::test]
async fn resolution_failures_touch_nothing() {
    let (db, sink, engine) = setup();
    let err = engine.insert(&uri("/missing"), &named("a")).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let err = engine
        .bulk_insert(&uri("/missing"), &[named("a")])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(matches!(ResourceUri::parse("/1/test"), Err(AppError::MalformedPath(_))));

    assert_eq!(sink.count(), 0);
    db.with(|c| {
        assert!(c.inserts.is_empty());
        assert!(c.batch_inserts.is_empty());
        assert_eq!(c.batches_begun, 0);
    });
}

#[tokio::test]
async fn excluded_tables_are_not_routed() {
    let config = ProviderConfig {
        excluded_tables: vec!["test".into()],
        ..Default::default()
    };
    let (_, _, engine) = setup_with(config);
    let err = engine.query(&uri("/test"), &QueryRequest::default()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn child_insert_fills_parent_key_and_returns_item_uri() {
    let (db, sink, engine) = setup();
    let item = engine
        .insert(&uri("content://test.com/parent/7/children"), &named("kid"))
        .await
        .unwrap();
    assert_eq!(item, "content://test.com/parent/7/children/1");
    db.with(|c| {
        let (table, values) = &c.inserts[0];
        assert_eq!(table, "children");
        assert_eq!(values.get("parent_id"), Some(&json!("7")));
    });
    assert_eq!(sink.uris(), vec!["content://test.com/parent/7/children".to_string()]);
}

#[tokio::test]
async fn update_and_delete_are_scoped() {
    let (db, _, engine) = setup();
    engine
        .update(
            &uri("/parent/1/children/4"),
            &named("x"),
            &Selection::new("name = ?", vec!["y".into()]),
        )
        .await
        .unwrap();
    engine.delete(&uri("/test/2"), &Selection::default()).await.unwrap();
    db.with(|c| {
        assert_eq!(
            c.updates[0].2.clause.as_deref(),
            Some("(_id=4 AND parent_id='1') AND (name = ?)")
        );
        assert_eq!(c.deletes[0].1.clause.as_deref(), Some("_id=2"));
    });
}

#[tokio::test]
async fn misconfigured_view_fails_schema_load() {
    let config = ProviderConfig {
        views: vec![ViewConfig {
            name: "view1".into(),
            base_table: "nowhere".into(),
        }],
        ..Default::default()
    };
    let (_, _, engine) = setup_with(config);
    let err = engine.query(&uri("/test"), &QueryRequest::default()).await.unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
}
