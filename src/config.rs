use serde::{Deserialize, Serialize};

use crate::store::DEFAULT_MAX_PROPERTY_LENGTH;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub repository: RepositoryConfig,
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Longest string accepted for a single property value
    pub max_property_length: usize,
    pub load_seed_data: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Re-run metadata extraction whenever a new version of a document is created
    pub extract_on_new_version: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            max_property_length: DEFAULT_MAX_PROPERTY_LENGTH,
            load_seed_data: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and config file
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        // Add default configuration
        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        // Add config file if it exists
        config = config.add_source(config::File::with_name("config").required(false));

        // Environment variables with prefix "FORMS_", e.g. FORMS_SERVER__PORT
        config = config.add_source(
            config::Environment::with_prefix("FORMS")
                .separator("__")
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }

    /// Seed data is loaded when configured or when LOAD_SEED_DATA=true
    pub fn load_seed_data(&self) -> bool {
        self.repository.load_seed_data
            || std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true"
    }

    /// Get the server bind address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
