//! Markup emitted into tracked pages

use crate::context::RequestContext;
use crate::parameters::{script_json, ParameterSet};
use crate::settings::{DomainMode, TrackingSettings};
use serde_json::json;

/// Production `gtag.js` endpoint
pub const GTAG_LIBRARY_URL: &str = "https://www.googletagmanager.com/gtag/js";
/// Debug-instrumented analytics library
pub const DEBUG_LIBRARY_URL: &str = "https://www.google-analytics.com/analytics_debug.js";
/// Location of the host-provisioned local library copy, relative to the base path
pub const LOCAL_LIBRARY_PATH: &str = "beacon/gtag.js";

/// Source of the analytics library script
pub fn library_src(settings: &TrackingSettings, context: &RequestContext) -> String {
    if settings.debug {
        DEBUG_LIBRARY_URL.to_string()
    } else if settings.cache_local_copy {
        format!("{}{}?id={}", context.base_path, LOCAL_LIBRARY_PATH, settings.account)
    } else {
        format!("{}?id={}", GTAG_LIBRARY_URL, settings.account)
    }
}

/// Inline script: data layer bootstrap, raw snippets and the `config` call.
///
/// Snippets are administrator-authored script and are inserted untouched.
pub fn inline_script(settings: &TrackingSettings, parameters: &ParameterSet) -> String {
    let mut script = String::from(
        "window.dataLayer = window.dataLayer || [];function gtag(){dataLayer.push(arguments)};gtag(\"js\", new Date());",
    );
    script.push_str(&settings.codesnippet_before);
    script.push_str(&format!(
        "gtag(\"config\", {}, {});",
        script_json(&serde_json::Value::String(settings.account.clone())),
        parameters
    ));
    script.push_str(&settings.codesnippet_after);
    script
}

/// Settings exposed to client-side helpers
pub fn client_settings(settings: &TrackingSettings) -> serde_json::Value {
    let mut value = json!({
        "account": settings.account,
        "trackDomainMode": settings.domain_mode.code(),
        "trackUrlFragments": settings.track_url_fragments,
    });
    if settings.domain_mode == DomainMode::MultipleTopLevelDomains {
        value["trackCrossDomains"] = json!(settings.cross_domains);
    }
    value
}

/// Full markup handed to the page-render hook
pub fn render(settings: &TrackingSettings, context: &RequestContext, parameters: &ParameterSet) -> String {
    format!(
        "<script async src=\"{}\"></script>\n<script>{}</script>\n<script type=\"application/json\" data-beacon-settings>{}</script>\n",
        library_src(settings, context),
        inline_script(settings, parameters),
        script_json(&client_settings(settings))
    )
}
