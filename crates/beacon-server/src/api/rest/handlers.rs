//! API endpoint handlers
//!
//! Site pages, the settings form and its JSON save endpoint.

use super::extractors::JsonExtractor;
use super::types::*;
use crate::config::persist_settings;
use crate::error::{PageError, ServerError};
use crate::pages;
use crate::session::{permissions, CurrentUser};
use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse, Response},
    Json,
};
use beacon_core::{SettingsUpdate, TrackingSettings};
use tracing::{info, warn};

/// 403 page unless `user` holds `permission`
fn require(user: &CurrentUser, permission: &str) -> Result<(), PageError> {
    if user.has_permission(permission) {
        Ok(())
    } else {
        Err(PageError::AccessDenied)
    }
}

/// Health check endpoint
pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub(super) async fn front_page() -> Html<String> {
    Html(pages::front_page())
}

pub(super) async fn admin_index(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Html<String>, PageError> {
    require(&user, permissions::ACCESS_ADMINISTRATION_PAGES)?;
    Ok(Html(pages::admin_index(&state.base_path())))
}

pub(super) async fn modules(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Html<String>, PageError> {
    require(&user, permissions::ADMINISTER_MODULES)?;
    Ok(Html(pages::modules_page(&state.base_path())))
}

pub(super) async fn status_report(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Html<String>, PageError> {
    require(&user, permissions::ADMINISTER_SITE_CONFIGURATION)?;
    let settings = {
        let store = state.store.read().await;
        TrackingSettings::from_source(&*store)
    };
    Ok(Html(pages::status_report(&state.base_path(), &settings)))
}

pub(super) async fn help(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Html<String>, PageError> {
    require(&user, permissions::ACCESS_ADMINISTRATION_PAGES)?;
    Ok(Html(pages::help_page(&state.base_path())))
}

pub(super) async fn password_reset() -> Html<String> {
    Html(pages::password_page())
}

/// Settings form
pub(super) async fn settings_form(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Html<String>, PageError> {
    require(&user, permissions::ADMINISTER_GOOGLE_ANALYTICS)?;
    let settings = {
        let store = state.store.read().await;
        TrackingSettings::from_source(&*store)
    };

    Ok(Html(pages::settings_form(
        &state.base_path(),
        &settings,
        &state.known_roles(),
        user.has_permission(permissions::ADD_JS_SNIPPETS),
    )))
}

/// Settings save endpoint
#[axum::debug_handler]
pub(super) async fn save_settings(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonExtractor(update): JsonExtractor<SettingsUpdate>,
) -> Result<Json<SaveResponse>, ServerError> {
    if !user.has_permission(permissions::ADMINISTER_GOOGLE_ANALYTICS) {
        return Err(ServerError::Forbidden(format!(
            "'{}' permission required",
            permissions::ADMINISTER_GOOGLE_ANALYTICS
        )));
    }
    let can_edit_snippets = user.has_permission(permissions::ADD_JS_SNIPPETS);

    // Write lock for the whole save so concurrent saves cannot interleave
    let mut store = state.store.write().await;
    if let Err(err) = update.apply(&mut store, can_edit_snippets) {
        warn!("Rejected settings update: {}", err);
        return Err(err.into());
    }

    if let Some(path) = &state.config.settings_file {
        persist_settings(path, &store).await?;
    }
    drop(store);

    info!(
        "Tracking settings saved by '{}'",
        user.name.as_deref().unwrap_or("anonymous")
    );
    Ok(Json(SaveResponse {
        success: true,
        message: "The configuration options have been saved.".to_string(),
    }))
}

/// Host-provisioned copy of the analytics library
pub(super) async fn local_library(State(state): State<AppState>) -> Response {
    let Some(path) = &state.config.local_library else {
        return PageError::NotFound.into_response();
    };

    match tokio::fs::read(path).await {
        Ok(content) => ([(header::CONTENT_TYPE, "application/javascript")], content).into_response(),
        Err(err) => {
            warn!("Local analytics library {:?} unavailable: {}", path, err);
            PageError::NotFound.into_response()
        }
    }
}

pub(super) async fn not_found() -> PageError {
    PageError::NotFound
}
