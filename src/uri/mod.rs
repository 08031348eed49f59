//! Resource URIs: hierarchical table/id paths plus query-string modifiers.

mod params;
mod path;

pub use params::*;
pub use path::*;
