//! Router creation and configuration
//!
//! Creates the Axum router for the site pages and wires the tracking hook.

use super::handlers::*;
use super::types::AppState;
use crate::hook::inject_tracking;
use axum::{middleware, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the site router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(front_page))
        .route("/health", get(health))
        .route("/admin", get(admin_index))
        .route("/admin/modules", get(modules))
        .route("/admin/reports/status", get(status_report))
        .route("/admin/help/google_analytics", get(help))
        .route(
            "/admin/config/system/google-analytics",
            get(settings_form).post(save_settings),
        )
        .route("/user/password", get(password_reset))
        .route("/beacon/gtag.js", get(local_library))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), inject_tracking))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
