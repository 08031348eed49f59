//! Resource routes: any path, any verb, forwarded to the routing engine.

use crate::handlers::provider::{delete as delete_handler, insert, query, update};
use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::limit::RequestBodyLimitLayer;

/// Request body cap for inserts and updates (2 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

pub fn provider_routes(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route(
            "/*path",
            get(query)
                .post(insert)
                .patch(update)
                .put(update)
                .delete(delete_handler),
        )
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}
