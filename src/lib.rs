//! SQLite provider: resource-URI routing over a schema inferred from the live database.
//!
//! A path such as `/parent/1/children` resolves to the `children` table scoped to
//! `parent_id='1'`; queries, inserts, updates, deletes and bulk inserts are dispatched to a
//! [`DatabaseHandle`](store::DatabaseHandle) and each mutation is reported to a
//! [`NotificationSink`](service::NotificationSink).

pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;
pub mod uri;

pub use config::{validate, ProviderConfig, ViewConfig};
pub use error::{AppError, ConfigError};
pub use routes::{common_routes, provider_routes, DEFAULT_BODY_LIMIT};
pub use schema::SchemaAnalyzer;
pub use service::{
    BroadcastSink, BulkInsertReport, NotificationSink, QueryResult, RecordingSink, RoutingEngine, TracingSink,
};
pub use sql::{QueryBuilder, QueryRequest, ScopedQueryBuilder};
pub use state::AppState;
pub use store::{DatabaseHandle, Row, Selection, SqliteBatch, SqliteHandle, Values, WriteBatch};
pub use uri::{ResourcePath, ResourceUri};
