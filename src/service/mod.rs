//! Routing and mutation: URI resolution, the engine and change notification.

mod engine;
pub mod notify;
mod route;
pub use engine::{BulkFailure, BulkInsertReport, QueryResult, RoutingEngine};
pub use notify::{BroadcastSink, NotificationSink, RecordingSink, TracingSink};
pub use route::RouteTarget;
