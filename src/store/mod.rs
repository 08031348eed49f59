//! The database collaborator: capability trait and the SQLite implementation.

pub mod sqlite;
mod traits;
pub use sqlite::{SqliteBatch, SqliteHandle};
pub use traits::*;
