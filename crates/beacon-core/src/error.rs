//! Error types for Beacon Core

use thiserror::Error;

/// User-facing message shown when an account identifier fails validation
pub const INVALID_ACCOUNT_MESSAGE: &str =
    "A valid Google Analytics Web Property ID is case sensitive and formatted like UA-xxxxxxx-yy.";

/// Configuration store error
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Type mismatch for '{key}': expected {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Settings validation error, raised when an update is saved
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("{}", INVALID_ACCOUNT_MESSAGE)]
    InvalidAccount(String),

    #[error("A list of top-level domains is required if multiple top-level domains tracking is selected.")]
    MissingCrossDomains,

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Changing '{0}' requires the 'add JS snippets for google analytics' permission")]
    SnippetPermission(String),

    #[error(transparent)]
    Store(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
