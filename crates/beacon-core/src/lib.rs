//! Beacon Core - analytics tracking decisions for rendered pages
//!
//! This crate decides whether a page gets the analytics tracking snippet and
//! renders it:
//! - Dotted-key configuration store and typed settings snapshot
//! - Request context supplied by the host
//! - Visibility rules (roles, path patterns)
//! - Ordered `config` parameters and snippet markup
//! - Error types

pub mod context;
pub mod domain;
pub mod engine;
pub mod error;
pub mod identity;
pub mod parameters;
pub mod settings;
pub mod snippet;
pub mod store;
pub mod visibility;

// Re-export commonly used types
pub use context::{PagePathOverride, RequestContext, ResponseStatus};
pub use engine::TrackingDecisionEngine;
pub use error::{ConfigError, SettingsError};
pub use parameters::{ParamValue, ParameterSet};
pub use settings::{DomainMode, RoleMode, SettingsUpdate, TrackingSettings, VisibilityMode};
pub use store::{ConfigStore, SettingsSource};
