#![allow(dead_code)]

use serde_json::Value;
use sqlite_provider::schema::{CatalogEntry, CatalogKind, ColumnMeta, ForeignKeyMeta, IndexMeta};
use sqlite_provider::sql::SelectQuery;
use sqlite_provider::{
    AppError, DatabaseHandle, ProviderConfig, RecordingSink, RoutingEngine, Row, ScopedQueryBuilder, Selection,
    Values, WriteBatch,
};
use std::sync::{Arc, Mutex};

struct MockTable {
    name: String,
    kind: CatalogKind,
    sql: Option<String>,
    columns: Vec<String>,
}

/// Everything the engine asked the database to do, in order.
#[derive(Default)]
pub struct Calls {
    pub queries: Vec<SelectQuery>,
    pub inserts: Vec<(String, Values)>,
    /// Inserts made through a write batch rather than the handle.
    pub batch_inserts: Vec<(String, Values)>,
    pub updates: Vec<(String, Values, Selection)>,
    pub deletes: Vec<(String, Selection)>,
    pub yields: usize,
    pub batches_begun: usize,
    pub batches_committed: usize,
    pub batches_rolled_back: usize,
}

/// In-memory stand-in for the database: a fixed catalog and a call log.
#[derive(Default)]
pub struct MockDatabase {
    tables: Vec<MockTable>,
    rejected: Option<(String, Value)>,
    rows: Vec<Row>,
    pub calls: Arc<Mutex<Calls>>,
}

/// Batch sharing the mock's call log.
struct MockBatch {
    calls: Arc<Mutex<Calls>>,
    rejected: Option<(String, Value)>,
}

fn check_rejected(rejected: &Option<(String, Value)>, table: &str, values: &Values) -> Result<(), AppError> {
    if let Some((column, value)) = rejected {
        if values.get(column) == Some(value) {
            return Err(AppError::ConstraintViolation(format!("UNIQUE constraint failed: {}.{}", table, column)));
        }
    }
    Ok(())
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, name: &str, columns: &[&str]) -> Self {
        self.tables.push(MockTable {
            name: name.to_string(),
            kind: CatalogKind::Table,
            sql: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    pub fn view(mut self, name: &str, ddl: &str, columns: &[&str]) -> Self {
        self.tables.push(MockTable {
            name: name.to_string(),
            kind: CatalogKind::View,
            sql: Some(ddl.to_string()),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    /// Inserts carrying `column = value` fail with a constraint violation.
    pub fn rejecting(mut self, column: &str, value: Value) -> Self {
        self.rejected = Some((column.to_string(), value));
        self
    }

    /// Rows returned by every query.
    pub fn returning(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    pub fn with<T>(&self, f: impl FnOnce(&Calls) -> T) -> T {
        f(&self.calls.lock().unwrap())
    }

    pub fn last_query(&self) -> SelectQuery {
        self.with(|c| c.queries.last().cloned().expect("no query recorded"))
    }
}

/// Standard provider fixture: `test`, `parent`/`children`, `table1` and two views over it.
pub fn provider_db() -> MockDatabase {
    MockDatabase::new()
        .table("test", &["_id", "name"])
        .table("parent", &["_id", "name"])
        .table("children", &["_id", "name", "parent_id"])
        .table("table1", &["_id", "name"])
        .view("view1", "CREATE VIEW view1 AS SELECT _id, name FROM other", &["_id", "name"])
        .view("view2", "CREATE VIEW view2 AS SELECT _id, name FROM table1", &["_id", "name"])
}

pub fn engine(db: Arc<MockDatabase>, sink: Arc<RecordingSink>, config: ProviderConfig) -> RoutingEngine {
    RoutingEngine::new(db, Arc::new(ScopedQueryBuilder), sink, config)
}

#[async_trait::async_trait]
impl DatabaseHandle for MockDatabase {
    async fn query(&self, query: &SelectQuery) -> Result<Vec<Row>, AppError> {
        self.calls.lock().unwrap().queries.push(query.clone());
        Ok(self.rows.clone())
    }

    async fn insert(&self, table: &str, values: &Values) -> Result<i64, AppError> {
        check_rejected(&self.rejected, table, values)?;
        let mut calls = self.calls.lock().unwrap();
        calls.inserts.push((table.to_string(), values.clone()));
        Ok(calls.inserts.len() as i64)
    }

    async fn update(&self, table: &str, values: &Values, selection: &Selection) -> Result<u64, AppError> {
        self.calls
            .lock()
            .unwrap()
            .updates
            .push((table.to_string(), values.clone(), selection.clone()));
        Ok(1)
    }

    async fn delete(&self, table: &str, selection: &Selection) -> Result<u64, AppError> {
        self.calls
            .lock()
            .unwrap()
            .deletes
            .push((table.to_string(), selection.clone()));
        Ok(1)
    }

    async fn begin_batch(&self) -> Result<Box<dyn WriteBatch>, AppError> {
        self.calls.lock().unwrap().batches_begun += 1;
        Ok(Box::new(MockBatch {
            calls: self.calls.clone(),
            rejected: self.rejected.clone(),
        }))
    }

    async fn catalog(&self) -> Result<Vec<CatalogEntry>, AppError> {
        Ok(self
            .tables
            .iter()
            .map(|t| CatalogEntry {
                name: t.name.clone(),
                kind: t.kind,
                sql: t.sql.clone(),
            })
            .collect())
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnMeta>, AppError> {
        let t = self
            .tables
            .iter()
            .find(|t| t.name == table)
            .ok_or_else(|| AppError::NotFound(table.to_string()))?;
        Ok(t.columns
            .iter()
            .map(|c| ColumnMeta {
                name: c.clone(),
                decl_type: Some("INTEGER".into()),
                not_null: false,
                pk_position: u32::from(c == "_id"),
            })
            .collect())
    }

    async fn table_indexes(&self, _table: &str) -> Result<Vec<IndexMeta>, AppError> {
        Ok(Vec::new())
    }

    async fn table_foreign_keys(&self, _table: &str) -> Result<Vec<ForeignKeyMeta>, AppError> {
        Ok(Vec::new())
    }

    async fn engine_version(&self) -> Result<String, AppError> {
        Ok("3.mock".into())
    }
}

#[async_trait::async_trait]
impl WriteBatch for MockBatch {
    async fn insert(&mut self, table: &str, values: &Values) -> Result<i64, AppError> {
        check_rejected(&self.rejected, table, values)?;
        let mut calls = self.calls.lock().unwrap();
        calls.batch_inserts.push((table.to_string(), values.clone()));
        Ok(calls.batch_inserts.len() as i64)
    }

    async fn yield_if_contended(&mut self) -> Result<bool, AppError> {
        self.calls.lock().unwrap().yields += 1;
        Ok(true)
    }

    async fn end(self: Box<Self>, commit: bool) -> Result<(), AppError> {
        let mut calls = self.calls.lock().unwrap();
        if commit {
            calls.batches_committed += 1;
        } else {
            calls.batches_rolled_back += 1;
        }
        Ok(())
    }
}
