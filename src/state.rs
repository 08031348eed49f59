//! Shared application state for all routes.

use crate::service::RoutingEngine;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Owns the database handle and the cached schema; reload it after migrations.
    pub engine: Arc<RoutingEngine>,
}

impl AppState {
    pub fn new(engine: RoutingEngine) -> Self {
        AppState {
            engine: Arc::new(engine),
        }
    }
}
