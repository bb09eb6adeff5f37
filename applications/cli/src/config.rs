/// Application configuration
use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use weave_playback::EngineConfig;
use weave_provider::ProviderConfig;

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "weave.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderSettings {
    /// Client configuration for the HTTP provider
    pub fn client_config(&self) -> ProviderConfig {
        let config = match &self.access_token {
            Some(token) => ProviderConfig::with_token(&self.url, token),
            None => ProviderConfig::new(&self.url),
        };
        config.timeout(Duration::from_secs(self.timeout_secs))
    }
}

impl AppConfig {
    /// Load configuration from `weave.toml` (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load configuration from a given file (if present) and the environment
    ///
    /// Environment variables use the `WEAVE_` prefix with `__` between
    /// sections, e.g. `WEAVE_PROVIDER__URL`.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut settings = config::Config::builder();

        if path.exists() {
            settings = settings.add_source(config::File::from(PathBuf::from(path)));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("WEAVE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(settings.build()?.try_deserialize()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.database_url.is_empty() {
            return Err(CliError::Config(
                "database URL is required (set WEAVE_STORAGE__DATABASE_URL)".to_string(),
            ));
        }

        if self.provider.url.is_empty() {
            return Err(CliError::Config(
                "provider URL is required (set WEAVE_PROVIDER__URL)".to_string(),
            ));
        }

        if self.provider.timeout_secs == 0 {
            return Err(CliError::Config(
                "provider timeout must be at least one second".to_string(),
            ));
        }

        if self.engine.pool_name_cache_capacity == 0 {
            return Err(CliError::Config(
                "pool name cache capacity must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

// Default values
fn default_database_url() -> String {
    "sqlite://weave.db".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            access_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}
