//! Schema introspection: raw catalog rows, the typed model and the analyzer over them.

mod analyzer;
pub mod catalog;
pub mod model;

pub use analyzer::SchemaAnalyzer;
pub use catalog::*;
pub use model::*;
