//! Example consumer: serves a SQLite database as resource URIs.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Reads `DATABASE_URL`, `PROVIDER_BIND`, `PROVIDER_MAX_CONNECTIONS` and `PROVIDER_CONFIG`, from the environment or `.env`.

use axum::Router;
use sqlite_provider::{
    common_routes, provider_routes, AppState, ProviderConfig, RoutingEngine, SqliteHandle, DEFAULT_BODY_LIMIT,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ProviderConfig::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sqlite_provider=info")),
        )
        .init();

    let db = SqliteHandle::connect(&config.database_url, config.max_connections).await?;
    let bind_addr = config.bind_addr.clone();
    let engine = RoutingEngine::with_defaults(Arc::new(db), config);
    let schema = engine.reload_schema().await?;
    tracing::info!(tables = ?schema.table_names(), "routing tables");

    let state = AppState::new(engine);
    let app = Router::new()
        .merge(common_routes(state.clone()))
        .merge(provider_routes(state, DEFAULT_BODY_LIMIT));

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
