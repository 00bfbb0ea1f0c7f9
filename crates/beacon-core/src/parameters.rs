//! Parameters of the `gtag("config", ...)` call
//!
//! Every conditional key is one row of [`PARAMETER_RULES`], evaluated in
//! order. Most flags signal "off" by leaving their key out; the display
//! features flag is the exception and is emitted as an explicit `false`.

use crate::context::{PagePathOverride, RequestContext};
use crate::domain::cookie_domain;
use crate::identity::hash_user_id;
use crate::settings::{keys, DomainMode, TrackingSettings};
use serde_json::json;
use std::fmt;

/// Script expression tracking the full URL including the fragment
pub const URL_FRAGMENT_EXPRESSION: &str = "location.pathname + location.search + location.hash";

/// JSON text safe to embed in an inline `<script>` element.
///
/// `<`, `>` and `&` only occur inside JSON strings, where their `\u` escapes
/// are equivalent, so the value reads back unchanged.
pub fn script_json(value: &serde_json::Value) -> String {
    value
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

/// A parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Serialized as JSON
    Json(serde_json::Value),
    /// Emitted verbatim as a script expression
    Expression(String),
}

impl ParamValue {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ParamValue::Json(value) => Some(value),
            ParamValue::Expression(_) => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Json(serde_json::Value::Bool(value))
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Json(serde_json::Value::String(value.to_string()))
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(value: serde_json::Value) -> Self {
        ParamValue::Json(value)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Json(value) => f.write_str(&script_json(value)),
            ParamValue::Expression(expression) => f.write_str(expression),
        }
    }
}

/// Ordered parameter mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    entries: Vec<(String, ParamValue)>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter. An existing key keeps its position and gets the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Renders as a script object literal, e.g. `{"groups":"default"}`
impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (index, (key, value)) in self.entries.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", script_json(&serde_json::Value::String(key.clone())), value)?;
        }
        f.write_str("}")
    }
}

type ValueFn = fn(&TrackingSettings, &RequestContext) -> Option<ParamValue>;

/// One conditional parameter
pub struct ParameterRule {
    /// Setting gating the key, `None` when the key is unconditional
    pub setting: Option<&'static str>,
    pub key: &'static str,
    /// Value to emit, `None` leaves the key out
    pub value: ValueFn,
}

/// Conditional parameters in emission order
pub const PARAMETER_RULES: &[ParameterRule] = &[
    ParameterRule {
        setting: None,
        key: "groups",
        value: groups,
    },
    ParameterRule {
        setting: Some(keys::DOMAIN_MODE),
        key: "cookie_domain",
        value: cookie_domain_param,
    },
    ParameterRule {
        setting: Some(keys::DOMAIN_MODE),
        key: "linker",
        value: linker,
    },
    ParameterRule {
        setting: Some(keys::ANONYMIZE_IP),
        key: "anonymize_ip",
        value: anonymize_ip,
    },
    ParameterRule {
        setting: Some(keys::TRACK_DISPLAYFEATURES),
        key: "allow_display_features",
        value: allow_display_features,
    },
    ParameterRule {
        setting: Some(keys::TRACK_LINKID),
        key: "link_attribution",
        value: link_attribution,
    },
    ParameterRule {
        setting: Some(keys::TRACK_USERID),
        key: "user_id",
        value: user_id,
    },
    ParameterRule {
        setting: Some(keys::TRACK_URLFRAGMENTS),
        key: "page_path",
        value: page_path,
    },
];

fn groups(_: &TrackingSettings, _: &RequestContext) -> Option<ParamValue> {
    Some("default".into())
}

fn cookie_domain_param(settings: &TrackingSettings, context: &RequestContext) -> Option<ParamValue> {
    if settings.domain_mode != DomainMode::OneDomainMultiSubdomain {
        return None;
    }
    cookie_domain(&context.host).map(|domain| domain.as_str().into())
}

fn linker(settings: &TrackingSettings, _: &RequestContext) -> Option<ParamValue> {
    (settings.domain_mode == DomainMode::MultipleTopLevelDomains)
        .then(|| json!({ "domains": settings.cross_domains }).into())
}

fn anonymize_ip(settings: &TrackingSettings, _: &RequestContext) -> Option<ParamValue> {
    settings.anonymize_ip.then(|| true.into())
}

fn allow_display_features(settings: &TrackingSettings, _: &RequestContext) -> Option<ParamValue> {
    (!settings.track_display_features).then(|| false.into())
}

fn link_attribution(settings: &TrackingSettings, _: &RequestContext) -> Option<ParamValue> {
    settings.track_link_id.then(|| true.into())
}

fn user_id(settings: &TrackingSettings, context: &RequestContext) -> Option<ParamValue> {
    if !settings.track_user_id {
        return None;
    }
    context
        .user_id
        .as_deref()
        .map(|id| hash_user_id(&settings.user_id_salt, id).as_str().into())
}

fn page_path(settings: &TrackingSettings, context: &RequestContext) -> Option<ParamValue> {
    if let Some(page) = context.response_status.error_page() {
        let prefix = script_json(&serde_json::Value::String(format!(
            "{}{}?page=",
            context.base_path, page
        )));
        return Some(ParamValue::Expression(format!(
            "{} + document.location.pathname + document.location.search + \"&from=\" + document.referrer",
            prefix
        )));
    }

    if settings.track_url_fragments {
        return Some(ParamValue::Expression(URL_FRAGMENT_EXPRESSION.to_string()));
    }

    match &context.page_path_override {
        Some(PagePathOverride::Path(path)) => Some(path.as_str().into()),
        Some(PagePathOverride::Expression(expression)) => {
            Some(ParamValue::Expression(expression.clone()))
        }
        None => None,
    }
}

/// Build the ordered parameter set for a tracked request.
///
/// Free-form `codesnippet.create` fields are merged last, in configured order.
pub fn build_tracking_parameters(
    settings: &TrackingSettings,
    context: &RequestContext,
) -> ParameterSet {
    let mut parameters = ParameterSet::new();

    for rule in PARAMETER_RULES {
        if let Some(value) = (rule.value)(settings, context) {
            parameters.insert(rule.key, value);
        }
    }

    for (key, value) in &settings.codesnippet_create {
        parameters.insert(key.as_str(), value.clone());
    }

    parameters
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_set_display() {
        let mut params = ParameterSet::new();
        params.insert("groups", "default");
        params.insert("anonymize_ip", true);
        params.insert("page_path", ParamValue::Expression(URL_FRAGMENT_EXPRESSION.to_string()));

        assert_eq!(
            params.to_string(),
            r#"{"groups":"default","anonymize_ip":true,"page_path":location.pathname + location.search + location.hash}"#
        );
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut params = ParameterSet::new();
        params.insert("a", json!(1));
        params.insert("b", json!(2));
        params.insert("a", json!(3));

        assert_eq!(params.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(params.get("a"), Some(&ParamValue::Json(json!(3))));
    }

    #[test]
    fn test_json_string_escaping() {
        let mut params = ParameterSet::new();
        params.insert("cookie_name", "quote\"d");
        assert_eq!(params.to_string(), r#"{"cookie_name":"quote\"d"}"#);
    }

    #[test]
    fn test_markup_characters_escaped_in_strings() {
        let mut params = ParameterSet::new();
        params.insert("cookie_name", "</script><b>&");
        params.insert("a<b", true);
        assert_eq!(
            params.to_string(),
            r#"{"cookie_name":"\u003c/script\u003e\u003cb\u003e\u0026","a\u003cb":true}"#
        );

        let value: serde_json::Value = serde_json::from_str(&script_json(&json!("</script>"))).unwrap();
        assert_eq!(value, json!("</script>"));
    }

    #[test]
    fn test_rules_are_unique_and_start_with_groups() {
        assert_eq!(PARAMETER_RULES[0].key, "groups");
        assert!(PARAMETER_RULES[0].setting.is_none());
        let keys: std::collections::BTreeSet<_> =
            PARAMETER_RULES.iter().map(|rule| rule.key).collect();
        assert_eq!(keys.len(), PARAMETER_RULES.len());
    }
}
