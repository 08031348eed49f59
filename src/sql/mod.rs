//! SQL text for the store: SELECT assembly from routed requests, single-row writes, value binding.

mod builder;
pub mod params;
mod scope;
pub use builder::*;
pub use params::*;
pub use scope::*;
