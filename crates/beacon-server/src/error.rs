//! Server error types

use crate::pages;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use beacon_core::SettingsError;
use serde_json::json;
use std::fmt;

/// Error returned by the JSON endpoints
#[derive(Debug)]
pub enum ServerError {
    /// Invalid request
    InvalidRequest(String),

    /// Missing permission
    Forbidden(String),

    /// Internal server error
    InternalError(String),

    /// Not found
    NotFound(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ServerError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ServerError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ServerError::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ServerError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ServerError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ServerError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

impl From<SettingsError> for ServerError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::SnippetPermission(_) => ServerError::Forbidden(err.to_string()),
            SettingsError::Store(_) => ServerError::InternalError(err.to_string()),
            _ => ServerError::InvalidRequest(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::InternalError(err.to_string())
    }
}

/// Error rendered as a site page.
///
/// These are HTML so the tracking hook still sees them and records the hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageError {
    /// 403, the current user lacks a permission
    AccessDenied,

    /// 404
    NotFound,
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, title, message) = match self {
            PageError::AccessDenied => (
                StatusCode::FORBIDDEN,
                "Access denied",
                "You are not authorized to access this page.",
            ),
            PageError::NotFound => (
                StatusCode::NOT_FOUND,
                "Page not found",
                "The requested page could not be found.",
            ),
        };

        let body = format!("<p>{}</p>", message);
        (status, Html(pages::layout(title, &body))).into_response()
    }
}
