use crate::error::AppError;
use crate::schema::{CatalogEntry, ColumnMeta, ForeignKeyMeta, IndexMeta};
use crate::sql::SelectQuery;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One result row, column name to value.
pub type Row = Map<String, Value>;

/// Column values for insert/update.
pub type Values = BTreeMap<String, Value>;

/// Caller-supplied WHERE fragment with positional `?` arguments (bound as text).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub clause: Option<String>,
    pub args: Vec<String>,
}

impl Selection {
    pub fn new(clause: impl Into<String>, args: Vec<String>) -> Self {
        Selection {
            clause: Some(clause.into()),
            args,
        }
    }

    /// AND the scoping predicates in front of the caller's clause.
    pub fn scoped(&self, predicates: &[String]) -> Selection {
        let scope = predicates.join(" AND ");
        let clause = match (scope.is_empty(), self.clause.as_deref()) {
            (true, c) => c.map(String::from),
            (false, None) => Some(scope),
            (false, Some(c)) => Some(format!("({}) AND ({})", scope, c)),
        };
        Selection {
            clause,
            args: self.args.clone(),
        }
    }
}

/// The database the engine executes against. Shared by every request.
#[async_trait::async_trait]
pub trait DatabaseHandle: Send + Sync {
    async fn query(&self, query: &SelectQuery) -> Result<Vec<Row>, AppError>;
    /// Returns the new row id.
    async fn insert(&self, table: &str, values: &Values) -> Result<i64, AppError>;
    /// Returns the number of rows changed.
    async fn update(&self, table: &str, values: &Values, selection: &Selection) -> Result<u64, AppError>;
    async fn delete(&self, table: &str, selection: &Selection) -> Result<u64, AppError>;

    /// Open a write batch owned by the caller. Writes on the handle itself never join it.
    async fn begin_batch(&self) -> Result<Box<dyn WriteBatch>, AppError>;

    async fn catalog(&self) -> Result<Vec<CatalogEntry>, AppError>;
    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnMeta>, AppError>;
    async fn table_indexes(&self, table: &str) -> Result<Vec<IndexMeta>, AppError>;
    async fn table_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyMeta>, AppError>;
    async fn engine_version(&self) -> Result<String, AppError>;
}

/// Inserts grouped into one transaction, committed or rolled back by [`end`](Self::end).
#[async_trait::async_trait]
pub trait WriteBatch: Send {
    async fn insert(&mut self, table: &str, values: &Values) -> Result<i64, AppError>;
    /// Commit what is done so far and let waiting writers in, if there are any.
    /// Returns whether the batch actually yielded.
    async fn yield_if_contended(&mut self) -> Result<bool, AppError>;
    async fn end(self: Box<Self>, commit: bool) -> Result<(), AppError>;
}
