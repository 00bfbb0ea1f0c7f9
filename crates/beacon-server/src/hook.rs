//! Page-render hook: adds the tracking snippet to HTML responses
//!
//! Runs after the handler so the final response status is known, which is
//! what lets 403 and 404 pages record their dedicated page path.

use crate::api::rest::types::AppState;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::session::CurrentUser;
use axum::{
    body::{Body, HttpBody},
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use beacon_core::context::normalize_path;
use beacon_core::{PagePathOverride, RequestContext, ResponseStatus, TrackingDecisionEngine};
use tracing::{debug, warn};
use url::form_urlencoded;

/// Largest HTML body buffered for injection
pub const MAX_INJECT_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Axum middleware injecting the tracking markup into tracked pages
pub async fn inject_tracking(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let user = CurrentUser::from_headers(request.headers(), &state.config);

    let response = next.run(request).await;
    if !is_html(response.headers()) {
        return response;
    }

    // Snapshot the settings; the lock is not held while rendering
    let engine = {
        let store = state.store.read().await;
        TrackingDecisionEngine::from_source(&*store)
    };

    let context = build_context(
        &state.config,
        &user,
        &path,
        query.as_deref(),
        &host,
        ResponseStatus::from_code(response.status().as_u16()),
    );

    let Some(markup) = engine.render(&context) else {
        return response;
    };
    debug!("Injecting tracking markup into '{}'", path);

    let too_large = response
        .body()
        .size_hint()
        .upper()
        .map_or(true, |upper| upper > MAX_INJECT_BODY_BYTES as u64);
    // Unbounded streams are left alone as well
    if too_large {
        warn!("Response body for '{}' too large to inject tracking markup", path);
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_INJECT_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("Failed to buffer response body for '{}': {}", path, err);
            return ServerError::InternalError("failed to render page".to_string()).into_response();
        }
    };

    let html = match std::str::from_utf8(&bytes) {
        Ok(html) => inject_markup(html, &markup),
        Err(_) => {
            warn!("Response body for '{}' is not UTF-8; tracking markup skipped", path);
            return Response::from_parts(parts, Body::from(bytes));
        }
    };
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

/// Request context for the page being rendered
pub fn build_context(
    config: &ServerConfig,
    user: &CurrentUser,
    path: &str,
    query: Option<&str>,
    host: &str,
    status: ResponseStatus,
) -> RequestContext {
    let context = RequestContext::new(path)
        .with_host(host)
        .with_status(status)
        .with_base_path(&config.base_path)
        .with_front_page(&config.front_page);
    let mut context = user.apply_to(context);

    if let Some(page_path) = page_path_override(config, &context, query) {
        context = context.with_page_path_override(page_path);
    }
    context
}

/// Tracked path replacing a request path whose query is sensitive
fn page_path_override(
    config: &ServerConfig,
    context: &RequestContext,
    query: Option<&str>,
) -> Option<PagePathOverride> {
    let query = query?;
    config
        .url_overrides
        .iter()
        .find(|rule| {
            normalize_path(&rule.path) == context.current_path && has_query_param(query, &rule.query_param)
        })
        .map(|rule| {
            PagePathOverride::Path(format!(
                "{}{}",
                context.base_path,
                normalize_path(&rule.path).trim_start_matches('/')
            ))
        })
}

/// Whether the decoded query carries `name`
fn has_query_param(query: &str, name: &str) -> bool {
    form_urlencoded::parse(query.as_bytes()).any(|(key, _)| key == name)
}

fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim_start().to_ascii_lowercase().starts_with("text/html"))
}

/// Insert `markup` before the closing head tag, or append it when there is none
pub fn inject_markup(html: &str, markup: &str) -> String {
    let position = html.to_ascii_lowercase().find("</head>");
    match position {
        Some(index) => {
            let mut out = String::with_capacity(html.len() + markup.len());
            out.push_str(&html[..index]);
            out.push_str(markup);
            out.push_str(&html[index..]);
            out
        }
        None => format!("{}{}", html, markup),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};
    use axum::{middleware, routing::get, Router};
    use beacon_core::settings::keys;
    use beacon_core::ConfigStore;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const HTML: [(header::HeaderName, &str); 1] = [(header::CONTENT_TYPE, "text/html; charset=utf-8")];

    fn tracked_app(router: Router<AppState>) -> Router {
        let mut store = ConfigStore::new();
        store.set(keys::ACCOUNT, "UA-1-1").unwrap();
        let state = AppState::new(ServerConfig::default(), store);
        router
            .layer(middleware::from_fn_with_state(state.clone(), inject_tracking))
            .with_state(state)
    }

    async fn fetch(app: Router) -> (StatusCode, Vec<u8>) {
        let request = axum::http::Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_markup_injected_into_html() {
        let app = tracked_app(Router::new().route("/", get(|| async { (HTML, "<head></head>") })));
        let (status, body) = fetch(app).await;
        assert_eq!(status, StatusCode::OK);
        let body = String::from_utf8(body).unwrap();
        assert!(body.contains("gtag/js?id=UA-1-1"));
        assert!(body.ends_with("</head>"));
    }

    #[tokio::test]
    async fn test_non_utf8_body_passed_through() {
        let raw: &'static [u8] = b"<head></head>\xff\xfe";
        let app = tracked_app(Router::new().route("/", get(move || async move { (HTML, raw) })));
        let (status, body) = fetch(app).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, raw);
    }

    #[tokio::test]
    async fn test_oversized_body_passed_through() {
        let page = format!("<head></head>{}", "x".repeat(MAX_INJECT_BODY_BYTES));
        let expected = page.clone().into_bytes();
        let app = tracked_app(Router::new().route("/", get(move || {
            let page = page.clone();
            async move { (HTML, page) }
        })));
        let (status, body) = fetch(app).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, expected);
    }

    #[test]
    fn test_inject_before_head_close() {
        let html = "<html><head><title>x</title></HEAD><body></body></html>";
        let out = inject_markup(html, "<script></script>");
        assert_eq!(
            out,
            "<html><head><title>x</title><script></script></HEAD><body></body></html>"
        );
    }

    #[test]
    fn test_inject_appends_without_head() {
        assert_eq!(inject_markup("<p>hi</p>", "<script></script>"), "<p>hi</p><script></script>");
    }

    #[test]
    fn test_is_html() {
        let mut headers = HeaderMap::new();
        assert!(!is_html(&headers));

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
        assert!(is_html(&headers));

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(!is_html(&headers));
    }

    #[test]
    fn test_query_param_detection() {
        assert!(has_query_param("name=foo", "name"));
        assert!(has_query_param("a=1&name", "name"));
        assert!(!has_query_param("username=foo", "name"));
        assert!(!has_query_param("", "name"));
        assert!(has_query_param("na%6De=foo%40example.com", "name"));
        assert!(has_query_param("x=1&%6E%61%6D%65", "name"));
    }

    #[test]
    fn test_password_page_override() {
        let config = ServerConfig {
            base_path: "/site".to_string(),
            ..ServerConfig::default()
        };
        let user = CurrentUser::anonymous();

        let context = build_context(
            &config,
            &user,
            "/user/password",
            Some("name=foo%40example.com"),
            "localhost",
            ResponseStatus::Ok,
        );
        assert_eq!(
            context.page_path_override,
            Some(PagePathOverride::Path("/site/user/password".to_string()))
        );

        let context = build_context(&config, &user, "/user/password", None, "localhost", ResponseStatus::Ok);
        assert!(context.page_path_override.is_none());

        let context = build_context(&config, &user, "/", Some("name=foo"), "localhost", ResponseStatus::Ok);
        assert!(context.page_path_override.is_none());
    }

    #[test]
    fn test_context_from_request_parts() {
        let context = build_context(
            &ServerConfig::default(),
            &CurrentUser::anonymous(),
            "/missing/",
            None,
            "www.example.com:8080",
            ResponseStatus::NotFound,
        );

        assert_eq!(context.current_path, "/missing");
        assert_eq!(context.host, "www.example.com");
        assert_eq!(context.response_status, ResponseStatus::NotFound);
    }
}
