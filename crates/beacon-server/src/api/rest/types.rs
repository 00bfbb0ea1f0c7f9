//! REST API type definitions
//!
//! Shared state plus request and response types for the site endpoints.

use crate::config::ServerConfig;
use beacon_core::ConfigStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Tracking settings; the render hook reads, the settings form writes
    pub store: Arc<RwLock<ConfigStore>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig, store: ConfigStore) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            config: Arc::new(config),
        }
    }

    /// Site base path with leading and trailing slash
    pub fn base_path(&self) -> String {
        let trimmed = self.config.base_path.trim_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", trimmed)
        }
    }

    /// Roles offered by the settings form
    pub fn known_roles(&self) -> Vec<String> {
        let mut roles = vec![
            beacon_core::context::ANONYMOUS_ROLE.to_string(),
            beacon_core::context::AUTHENTICATED_ROLE.to_string(),
        ];
        let mut extra: Vec<String> = self
            .config
            .users
            .values()
            .flat_map(|user| user.roles.iter().cloned())
            .filter(|role| !roles.contains(role))
            .collect();
        extra.sort();
        extra.dedup();
        roles.extend(extra);
        roles
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Settings save response
#[derive(Debug, Serialize, Deserialize)]
pub struct SaveResponse {
    pub success: bool,
    pub message: String,
}
