//! Config validation against the analyzed schema.

use crate::config::ProviderConfig;
use crate::error::ConfigError;
use crate::schema::SchemaAnalyzer;
use std::collections::HashSet;

/// Every declared view names an existing base table, and no view is declared twice.
pub fn validate(config: &ProviderConfig, schema: &SchemaAnalyzer) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for view in &config.views {
        if !seen.insert(view.name.to_ascii_lowercase()) {
            return Err(ConfigError::DuplicateView(view.name.clone()));
        }
        if schema.table(&view.base_table).is_none() {
            return Err(ConfigError::MissingReference {
                kind: "base table",
                id: view.base_table.clone(),
            });
        }
    }
    Ok(())
}
