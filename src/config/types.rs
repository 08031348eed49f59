//! Provider configuration: connection, bind address, declared views and routing exclusions.

use serde::{Deserialize, Serialize};

/// A view routed like a table whose change notifications go to `base_table`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    pub name: String,
    pub base_table: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub views: Vec<ViewConfig>,
    /// Tables hidden from routing in addition to the engine's own.
    #[serde(default)]
    pub excluded_tables: Vec<String>,
}

fn default_database_url() -> String {
    "sqlite://provider.db".into()
}

fn default_max_connections() -> u32 {
    5
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".into()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            database_url: default_database_url(),
            max_connections: default_max_connections(),
            bind_addr: default_bind_addr(),
            views: Vec::new(),
            excluded_tables: Vec::new(),
        }
    }
}

impl ProviderConfig {
    /// Declared base table for `view`, if configured.
    pub fn base_table_of(&self, view: &str) -> Option<&str> {
        self.views
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(view))
            .map(|v| v.base_table.as_str())
    }
}

/// Shape of the JSON file named by `PROVIDER_CONFIG`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub views: Vec<ViewConfig>,
    #[serde(default)]
    pub excluded_tables: Vec<String>,
}
