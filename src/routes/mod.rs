mod common;
mod provider;
pub use common::common_routes;
pub use provider::{provider_routes, DEFAULT_BODY_LIMIT};
