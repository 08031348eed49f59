//! HTTP handlers for resource access through the routing engine.

pub mod provider;
pub use provider::*;
