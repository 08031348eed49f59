//! RoutingEngine: resolves resource URIs, dispatches to the database handle, emits change notifications.

use crate::config::{self, ProviderConfig};
use crate::error::AppError;
use crate::schema::SchemaAnalyzer;
use crate::service::notify::{NotificationSink, TracingSink};
use crate::service::route::RouteTarget;
use crate::sql::{QueryBuilder, QueryRequest, ScopedQueryBuilder};
use crate::store::{DatabaseHandle, Row, Selection, Values};
use crate::uri::ResourceUri;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Debug, Serialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    /// Collection to watch for changes to these rows.
    pub notification_uri: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    pub index: usize,
    pub code: &'static str,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BulkInsertReport {
    pub inserted: usize,
    pub failures: Vec<BulkFailure>,
}

pub struct RoutingEngine {
    db: Arc<dyn DatabaseHandle>,
    builder: Arc<dyn QueryBuilder>,
    sink: Arc<dyn NotificationSink>,
    config: ProviderConfig,
    schema: RwLock<Option<Arc<SchemaAnalyzer>>>,
}

impl RoutingEngine {
    pub fn new(
        db: Arc<dyn DatabaseHandle>,
        builder: Arc<dyn QueryBuilder>,
        sink: Arc<dyn NotificationSink>,
        config: ProviderConfig,
    ) -> Self {
        RoutingEngine {
            db,
            builder,
            sink,
            config,
            schema: RwLock::new(None),
        }
    }

    pub fn with_defaults(db: Arc<dyn DatabaseHandle>, config: ProviderConfig) -> Self {
        Self::new(db, Arc::new(ScopedQueryBuilder), Arc::new(TracingSink), config)
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Analyzed schema, read from the database on first use.
    pub async fn schema(&self) -> Result<Arc<SchemaAnalyzer>, AppError> {
        if let Some(schema) = self.schema.read().await.as_ref() {
            return Ok(schema.clone());
        }
        self.reload_schema().await
    }

    /// Re-read the schema (after a migration) and validate the configuration against it.
    pub async fn reload_schema(&self) -> Result<Arc<SchemaAnalyzer>, AppError> {
        let mut slot = self.schema.write().await;
        let schema = SchemaAnalyzer::analyze(self.db.as_ref(), &self.config.excluded_tables).await?;
        config::validate(&self.config, &schema)?;
        let schema = Arc::new(schema);
        *slot = Some(schema.clone());
        Ok(schema)
    }

    /// Live engine version, straight from the database.
    pub async fn probe(&self) -> Result<String, AppError> {
        self.db.engine_version().await
    }

    async fn resolve(&self, uri: &ResourceUri) -> Result<(RouteTarget, Arc<SchemaAnalyzer>), AppError> {
        let schema = self.schema().await?;
        let target = RouteTarget::resolve(uri, &schema, &self.config)?;
        Ok((target, schema))
    }

    pub async fn query(&self, uri: &ResourceUri, request: &QueryRequest) -> Result<QueryResult, AppError> {
        let (target, schema) = self.resolve(uri).await?;
        let query = self.builder.build(&target, request, &schema)?;
        let rows = self.db.query(&query).await?;
        Ok(QueryResult {
            rows,
            notification_uri: target.notification_uri.to_string(),
        })
    }

    /// Insert one row and return the new item URI.
    pub async fn insert(&self, uri: &ResourceUri, values: &Values) -> Result<String, AppError> {
        let (target, _) = self.resolve(uri).await?;
        let values = with_parent_key(&target, values);
        let id = self.db.insert(&target.table, &values).await?;
        self.notify(&target);
        Ok(target
            .uri
            .with_path(target.uri.path.collection().with_appended_id(id))
            .to_string())
    }

    pub async fn update(&self, uri: &ResourceUri, values: &Values, selection: &Selection) -> Result<u64, AppError> {
        let (target, _) = self.resolve(uri).await?;
        let selection = selection.scoped(&target.scoping_predicates(None));
        let changed = self.db.update(&target.table, values, &selection).await?;
        self.notify(&target);
        Ok(changed)
    }

    pub async fn delete(&self, uri: &ResourceUri, selection: &Selection) -> Result<u64, AppError> {
        let (target, _) = self.resolve(uri).await?;
        let selection = selection.scoped(&target.scoping_predicates(None));
        let removed = self.db.delete(&target.table, &selection).await?;
        self.notify(&target);
        Ok(removed)
    }

    /// Insert every item in one batch. Item failures are reported, not fatal; one notification at most.
    pub async fn bulk_insert(&self, uri: &ResourceUri, items: &[Values]) -> Result<BulkInsertReport, AppError> {
        let (target, _) = self.resolve(uri).await?;
        let allow_yield = uri.params.allow_yield();
        let mut report = BulkInsertReport::default();

        let mut batch = self.db.begin_batch().await?;
        for (index, item) in items.iter().enumerate() {
            let values = with_parent_key(&target, item);
            match batch.insert(&target.table, &values).await {
                Ok(_) => report.inserted += 1,
                Err(e) => {
                    tracing::warn!(table = %target.table, index, error = %e, "bulk insert item failed");
                    report.failures.push(BulkFailure {
                        index,
                        code: e.code(),
                        message: e.to_string(),
                    });
                }
            }
            if allow_yield {
                if let Err(e) = batch.yield_if_contended().await {
                    if let Err(rollback) = batch.end(false).await {
                        tracing::error!(error = %rollback, "rollback after failed yield");
                    }
                    return Err(e);
                }
            }
        }
        batch.end(true).await?;

        if report.inserted > 0 {
            self.notify(&target);
        }
        Ok(report)
    }

    fn notify(&self, target: &RouteTarget) {
        self.sink.notify_change(&target.notification_uri.to_string());
    }
}

/// Child-collection inserts carry `<parent>_id` from the URI unless the payload sets it.
fn with_parent_key(target: &RouteTarget, values: &Values) -> Values {
    let mut values = values.clone();
    if let Some(parent) = &target.parent {
        let key = format!("{}_id", parent.parent_column_name);
        if !values.keys().any(|k| k.eq_ignore_ascii_case(&key)) {
            values.insert(key, Value::String(parent.parent_id.clone()));
        }
    }
    values
}
