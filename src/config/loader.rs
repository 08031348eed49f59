//! Load provider config from the environment (and `.env`), with an optional JSON overlay file.

use crate::config::{ConfigFile, ProviderConfig};
use crate::error::ConfigError;
use std::path::Path;

impl ProviderConfig {
    /// Read `DATABASE_URL`, `PROVIDER_MAX_CONNECTIONS`, `PROVIDER_BIND` and, when set, the
    /// `PROVIDER_CONFIG` JSON file. Missing variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let mut config = ProviderConfig::default();
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(n) = std::env::var("PROVIDER_MAX_CONNECTIONS") {
            config.max_connections = n
                .parse()
                .map_err(|_| ConfigError::Load(format!("PROVIDER_MAX_CONNECTIONS: invalid number '{}'", n)))?;
        }
        if let Ok(addr) = std::env::var("PROVIDER_BIND") {
            config.bind_addr = addr;
        }
        if let Ok(path) = std::env::var("PROVIDER_CONFIG") {
            config.merge_file(Path::new(&path))?;
        }
        Ok(config)
    }

    /// Merge `views` and `excluded_tables` from a JSON file.
    pub fn merge_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        self.merge_json(&text)
    }

    pub fn merge_json(&mut self, text: &str) -> Result<(), ConfigError> {
        let file: ConfigFile = serde_json::from_str(text).map_err(|e| ConfigError::Load(e.to_string()))?;
        self.views.extend(file.views);
        self.excluded_tables.extend(file.excluded_tables);
        tracing::debug!(
            views = self.views.len(),
            excluded = self.excluded_tables.len(),
            "config file merged"
        );
        Ok(())
    }
}
