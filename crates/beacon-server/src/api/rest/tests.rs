//! Tests for REST API components

#![cfg(test)]

use super::types::*;
use crate::config::{ServerConfig, UserConfig};
use beacon_core::ConfigStore;

fn state_with_users(users: &[(&str, &[&str])]) -> AppState {
    let mut config = ServerConfig::default();
    for (name, roles) in users {
        config.users.insert(
            name.to_string(),
            UserConfig {
                roles: roles.iter().map(|r| r.to_string()).collect(),
                permissions: Vec::new(),
            },
        );
    }
    AppState::new(config, ConfigStore::new())
}

#[test]
fn test_known_roles_start_with_builtin_roles() {
    let state = state_with_users(&[("a", &["editor", "administrator"]), ("b", &["editor"])]);

    assert_eq!(
        state.known_roles(),
        vec!["anonymous", "authenticated", "administrator", "editor"]
    );
}

#[test]
fn test_known_roles_skip_builtin_duplicates() {
    let state = state_with_users(&[("a", &["authenticated"])]);
    assert_eq!(state.known_roles(), vec!["anonymous", "authenticated"]);
}

#[test]
fn test_base_path_normalized() {
    let mut config = ServerConfig::default();
    assert_eq!(AppState::new(config.clone(), ConfigStore::new()).base_path(), "/");

    config.base_path = "site".to_string();
    assert_eq!(AppState::new(config, ConfigStore::new()).base_path(), "/site/");
}

#[test]
fn test_save_response_serialization() {
    let response = SaveResponse {
        success: true,
        message: "saved".to_string(),
    };
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "saved");
}
