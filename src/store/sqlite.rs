//! SQLite implementation of [`DatabaseHandle`] over an sqlx pool.

use crate::error::{AppError, ConfigError};
use crate::schema::{CatalogEntry, CatalogKind, ColumnMeta, ForeignKeyMeta, IndexMeta, IndexOrigin};
use crate::sql::{self, QueryBuf, SelectQuery, SqliteBindValue};
use crate::store::{DatabaseHandle, Row, Selection, Values, WriteBatch};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteQueryResult, SqliteRow};
use sqlx::{Sqlite, Transaction};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long a writer waits on SQLite's file lock before failing with `SQLITE_BUSY`.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteHandle {
    pool: SqlitePool,
    /// Statements currently waiting on or running against the database, batches included.
    in_flight: Arc<AtomicUsize>,
}

/// Counts one statement as in flight until dropped.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        InFlight(counter.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SqliteHandle {
    /// Open (creating the file if needed) a pool of at most `max_connections`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let opts = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| ConfigError::Load(format!("invalid DATABASE_URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(opts)
            .await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        SqliteHandle {
            pool,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Statements in flight right now, across the handle and its batches.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    async fn execute(&self, q: &QueryBuf) -> Result<SqliteQueryResult, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let _guard = InFlight::enter(&self.in_flight);
        Ok(bind(q).execute(&self.pool).await?)
    }

    async fn fetch(&self, q: &QueryBuf) -> Result<Vec<SqliteRow>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let _guard = InFlight::enter(&self.in_flight);
        Ok(bind(q).fetch_all(&self.pool).await?)
    }
}

fn bind(q: &QueryBuf) -> sqlx::query::Query<'_, Sqlite, sqlx::sqlite::SqliteArguments<'_>> {
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(SqliteBindValue::from_json(p));
    }
    query
}

fn inserted_rowid(result: SqliteQueryResult) -> Result<i64, AppError> {
    if result.rows_affected() == 0 {
        return Err(AppError::Engine(sqlx::Error::RowNotFound));
    }
    Ok(result.last_insert_rowid())
}

/// A write batch holding its own pooled connection inside a transaction.
pub struct SqliteBatch {
    pool: SqlitePool,
    tx: Option<Transaction<'static, Sqlite>>,
    in_flight: Arc<AtomicUsize>,
}

impl SqliteBatch {
    fn tx(&mut self) -> Result<&mut Transaction<'static, Sqlite>, AppError> {
        self.tx
            .as_mut()
            .ok_or_else(|| AppError::Engine(sqlx::Error::Protocol("write batch is no longer open".into())))
    }
}

#[async_trait::async_trait]
impl WriteBatch for SqliteBatch {
    async fn insert(&mut self, table: &str, values: &Values) -> Result<i64, AppError> {
        let q = sql::insert(table, values);
        tracing::debug!(sql = %q.sql, params = ?q.params, "batch execute");
        let _guard = InFlight::enter(&self.in_flight);
        let tx = self.tx()?;
        inserted_rowid(bind(&q).execute(&mut **tx).await?)
    }

    async fn yield_if_contended(&mut self) -> Result<bool, AppError> {
        // Our own statements are finished here, so anything counted belongs to someone else.
        if self.in_flight.load(Ordering::SeqCst) == 0 {
            return Ok(false);
        }
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        tokio::task::yield_now().await;
        self.tx = Some(self.pool.begin().await?);
        tracing::debug!("write batch yielded");
        Ok(true)
    }

    async fn end(self: Box<Self>, commit: bool) -> Result<(), AppError> {
        match self.tx {
            Some(tx) if commit => tx.commit().await?,
            Some(tx) => tx.rollback().await?,
            None => {}
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DatabaseHandle for SqliteHandle {
    async fn query(&self, query: &SelectQuery) -> Result<Vec<Row>, AppError> {
        let rows = self.fetch(&query.to_sql()).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn insert(&self, table: &str, values: &Values) -> Result<i64, AppError> {
        inserted_rowid(self.execute(&sql::insert(table, values)).await?)
    }

    async fn update(&self, table: &str, values: &Values, selection: &Selection) -> Result<u64, AppError> {
        let q = sql::update(table, values, selection)?;
        Ok(self.execute(&q).await?.rows_affected())
    }

    async fn delete(&self, table: &str, selection: &Selection) -> Result<u64, AppError> {
        Ok(self.execute(&sql::delete(table, selection)).await?.rows_affected())
    }

    async fn begin_batch(&self) -> Result<Box<dyn WriteBatch>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteBatch {
            pool: self.pool.clone(),
            tx: Some(tx),
            in_flight: self.in_flight.clone(),
        }))
    }

    async fn catalog(&self) -> Result<Vec<CatalogEntry>, AppError> {
        let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(
            "SELECT name, type, sql FROM sqlite_master WHERE type IN ('table', 'view') ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(name, kind, sql)| CatalogEntry {
                name,
                kind: if kind == "view" {
                    CatalogKind::View
                } else {
                    CatalogKind::Table
                },
                sql,
            })
            .collect())
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnMeta>, AppError> {
        let rows: Vec<(String, Option<String>, i64, i64)> = sqlx::query_as(
            "SELECT name, type, \"notnull\", pk FROM pragma_table_info(?) ORDER BY cid",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(name, decl_type, not_null, pk)| ColumnMeta {
                name,
                decl_type: decl_type.filter(|t| !t.is_empty()),
                not_null: not_null != 0,
                pk_position: u32::try_from(pk).unwrap_or(0),
            })
            .collect())
    }

    async fn table_indexes(&self, table: &str) -> Result<Vec<IndexMeta>, AppError> {
        let list: Vec<(String, i64, String)> =
            sqlx::query_as("SELECT name, \"unique\", origin FROM pragma_index_list(?) ORDER BY seq")
                .bind(table)
                .fetch_all(&self.pool)
                .await?;
        let mut out = Vec::with_capacity(list.len());
        for (name, unique, origin) in list {
            let cols: Vec<(Option<String>,)> =
                sqlx::query_as("SELECT name FROM pragma_index_info(?) ORDER BY seqno")
                    .bind(&name)
                    .fetch_all(&self.pool)
                    .await?;
            out.push(IndexMeta {
                columns: cols.into_iter().filter_map(|(c,)| c).collect(),
                name,
                unique: unique != 0,
                origin: IndexOrigin::from_code(&origin),
            });
        }
        Ok(out)
    }

    async fn table_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyMeta>, AppError> {
        let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(
            "SELECT \"from\", \"table\", \"to\" FROM pragma_foreign_key_list(?) ORDER BY id, seq",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(from, table, to)| ForeignKeyMeta { from, table, to })
            .collect())
    }

    async fn engine_version(&self) -> Result<String, AppError> {
        let (version,): (String,) = sqlx::query_as("SELECT sqlite_version()")
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }
}

fn row_to_json(row: &SqliteRow) -> Row {
    use sqlx::Column;
    use sqlx::Row as _;
    let mut map = Row::new();
    for (i, col) in row.columns().iter().enumerate() {
        map.insert(col.name().to_string(), cell_to_value(row, i));
    }
    map
}

fn cell_to_value(row: &SqliteRow, i: usize) -> Value {
    use sqlx::Row as _;
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(i) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(i) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(i) {
        return Value::String(s);
    }
    if let Ok(Some(b)) = row.try_get::<Option<Vec<u8>>, _>(i) {
        return Value::String(b.iter().map(|byte| format!("{:02x}", byte)).collect());
    }
    Value::Null
}
