//! Server configuration

use anyhow::Context;
use beacon_core::ConfigStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A configured site user, selected per request by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    /// Roles in addition to `authenticated`
    #[serde(default)]
    pub roles: Vec<String>,

    /// Granted permissions, e.g. `administer google analytics`
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Replaces the tracked page path when `path` is requested with `query_param` present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlOverrideRule {
    pub path: String,
    pub query_param: String,
}

fn default_url_overrides() -> Vec<UrlOverrideRule> {
    // Keeps e-mail addresses typed into the reset form out of analytics
    vec![UrlOverrideRule {
        path: "/user/password".to_string(),
        query_param: "name".to_string(),
    }]
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host
    pub host: String,

    /// Server port (HTTP)
    pub port: u16,

    /// Path prefix the site is served under
    pub base_path: String,

    /// Path the `<front>` visibility token stands for
    pub front_page: String,

    /// YAML document holding the tracking settings.
    /// Saved settings are written back to it; without one they live in memory only.
    pub settings_file: Option<PathBuf>,

    /// Local copy of the analytics library, served when local caching is enabled
    pub local_library: Option<PathBuf>,

    /// Known users keyed by name
    pub users: HashMap<String, UserConfig>,

    /// Page path overrides for sensitive query strings
    pub url_overrides: Vec<UrlOverrideRule>,

    /// Log level
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            base_path: "/".to_string(),
            front_page: "/".to_string(),
            settings_file: None,
            local_library: None,
            users: HashMap::new(),
            url_overrides: default_url_overrides(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and config file
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file if exists
        dotenvy::dotenv().ok();

        let config_result = config::Config::builder()
            .add_source(config::File::with_name("config/server").required(false))
            .add_source(config::Environment::with_prefix("BEACON"))
            .build();

        match config_result {
            Ok(cfg) => cfg
                .try_deserialize()
                .map_err(|e| anyhow::anyhow!("Failed to deserialize config: {}", e)),
            Err(e) => {
                tracing::info!("No usable config found ({}), using default configuration", e);
                Ok(Self::default())
            }
        }
    }

    /// Load the tracking settings store.
    ///
    /// A missing settings file yields an empty store, so tracking starts disabled.
    pub fn load_settings_store(&self) -> anyhow::Result<ConfigStore> {
        let Some(path) = &self.settings_file else {
            tracing::info!("No settings file configured, tracking settings are kept in memory");
            return Ok(ConfigStore::new());
        };

        if !path.exists() {
            tracing::warn!("Settings file {:?} not found, starting with empty settings", path);
            return Ok(ConfigStore::new());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;
        let store = ConfigStore::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse settings file {:?}", path))?;
        tracing::info!("Loaded tracking settings from {:?}", path);
        Ok(store)
    }
}

/// Write the settings store back to `path`
pub async fn persist_settings(path: &Path, store: &ConfigStore) -> anyhow::Result<()> {
    let content = store.to_yaml_string()?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write settings file {:?}", path))?;
    Ok(())
}
