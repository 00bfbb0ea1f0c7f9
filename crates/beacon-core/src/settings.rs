//! Tracking settings snapshot and save-time validation

use crate::error::SettingsError;
use crate::store::{ConfigStore, SettingsSource};
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Configuration keys understood by [`TrackingSettings::from_source`]
pub mod keys {
    pub const ACCOUNT: &str = "account";
    pub const REQUEST_PATH_MODE: &str = "visibility.request_path_mode";
    pub const REQUEST_PATH_PAGES: &str = "visibility.request_path_pages";
    pub const USER_ROLE_MODE: &str = "visibility.user_role_mode";
    pub const USER_ROLE_ROLES: &str = "visibility.user_role_roles";
    pub const ANONYMIZE_IP: &str = "privacy.anonymizeip";
    pub const USER_ID_SALT: &str = "privacy.user_id_salt";
    pub const TRACK_LINKID: &str = "track.linkid";
    pub const TRACK_USERID: &str = "track.userid";
    pub const TRACK_DISPLAYFEATURES: &str = "track.displayfeatures";
    pub const TRACK_URLFRAGMENTS: &str = "track.urlfragments";
    pub const DOMAIN_MODE: &str = "domain_mode";
    pub const CROSS_DOMAINS: &str = "cross_domains";
    pub const DEBUG: &str = "debug";
    pub const CACHE: &str = "cache";
    pub const CODESNIPPET_CREATE: &str = "codesnippet.create";
    pub const CODESNIPPET_BEFORE: &str = "codesnippet.before";
    pub const CODESNIPPET_AFTER: &str = "codesnippet.after";
}

/// Whether the visibility path list includes or excludes pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VisibilityMode {
    /// Track every page except the listed ones (code 0)
    #[default]
    ShowExceptListed,
    /// Track only the listed pages (code 1)
    ShowOnlyListed,
}

impl VisibilityMode {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::ShowExceptListed),
            1 => Some(Self::ShowOnlyListed),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::ShowExceptListed => 0,
            Self::ShowOnlyListed => 1,
        }
    }
}

/// How the role filter is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoleMode {
    /// Track only users holding one of the selected roles (code 0)
    #[default]
    OnlySelected,
    /// Track everyone except users holding one of the selected roles (code 1)
    AllExceptSelected,
}

impl RoleMode {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::OnlySelected),
            1 => Some(Self::AllExceptSelected),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::OnlySelected => 0,
            Self::AllExceptSelected => 1,
        }
    }
}

/// Cross-site tracking linkage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DomainMode {
    /// A single domain (code 0)
    #[default]
    SingleDomain,
    /// One domain with multiple subdomains (code 1)
    OneDomainMultiSubdomain,
    /// Multiple top-level domains (code 2)
    MultipleTopLevelDomains,
}

impl DomainMode {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::SingleDomain),
            1 => Some(Self::OneDomainMultiSubdomain),
            2 => Some(Self::MultipleTopLevelDomains),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::SingleDomain => 0,
            Self::OneDomainMultiSubdomain => 1,
            Self::MultipleTopLevelDomains => 2,
        }
    }
}

/// Immutable per-request view of the tracking configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSettings {
    /// Web property id (`UA-xxxx-y`), empty when tracking is not configured
    pub account: String,
    pub visibility_mode: VisibilityMode,
    /// Path patterns, one per configured line
    pub visibility_paths: Vec<String>,
    pub role_mode: RoleMode,
    /// Role identifiers; empty means every role
    pub role_filter: BTreeSet<String>,
    pub anonymize_ip: bool,
    pub track_link_id: bool,
    pub track_user_id: bool,
    pub track_display_features: bool,
    pub track_url_fragments: bool,
    pub domain_mode: DomainMode,
    pub cross_domains: Vec<String>,
    pub debug: bool,
    /// Extra `config` parameters, in configured order
    pub codesnippet_create: Vec<(String, serde_json::Value)>,
    /// Raw script emitted before the `config` call
    pub codesnippet_before: String,
    /// Raw script emitted after the `config` call
    pub codesnippet_after: String,
    pub cache_local_copy: bool,
    pub user_id_salt: String,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            account: String::new(),
            visibility_mode: VisibilityMode::default(),
            visibility_paths: Vec::new(),
            role_mode: RoleMode::default(),
            role_filter: BTreeSet::new(),
            anonymize_ip: true,
            track_link_id: false,
            track_user_id: false,
            track_display_features: true,
            track_url_fragments: false,
            domain_mode: DomainMode::default(),
            cross_domains: Vec::new(),
            debug: false,
            codesnippet_create: Vec::new(),
            codesnippet_before: String::new(),
            codesnippet_after: String::new(),
            cache_local_copy: false,
            user_id_salt: String::new(),
        }
    }
}

impl TrackingSettings {
    /// Load a snapshot from a configuration source.
    ///
    /// Never fails: values of the wrong type are logged and replaced by
    /// their defaults so that a bad setting cannot break page rendering.
    pub fn from_source<S: SettingsSource + ?Sized>(source: &S) -> Self {
        let defaults = Self::default();

        let visibility_mode = read_code(
            keys::REQUEST_PATH_MODE,
            source.get_i64(keys::REQUEST_PATH_MODE),
            VisibilityMode::from_code,
            defaults.visibility_mode,
        );
        let role_mode = read_code(
            keys::USER_ROLE_MODE,
            source.get_i64(keys::USER_ROLE_MODE),
            RoleMode::from_code,
            defaults.role_mode,
        );
        let domain_mode = read_code(
            keys::DOMAIN_MODE,
            source.get_i64(keys::DOMAIN_MODE),
            DomainMode::from_code,
            defaults.domain_mode,
        );

        Self {
            account: read(
                keys::ACCOUNT,
                source.get_str(keys::ACCOUNT).map(|v| v.map(|s| s.trim().to_string())),
                defaults.account,
            ),
            visibility_mode,
            visibility_paths: read(
                keys::REQUEST_PATH_PAGES,
                source.get_string_list(keys::REQUEST_PATH_PAGES),
                defaults.visibility_paths,
            ),
            role_mode,
            role_filter: read(
                keys::USER_ROLE_ROLES,
                source.get_string_list(keys::USER_ROLE_ROLES),
                Vec::new(),
            )
            .into_iter()
            .collect(),
            anonymize_ip: read(
                keys::ANONYMIZE_IP,
                source.get_bool(keys::ANONYMIZE_IP),
                defaults.anonymize_ip,
            ),
            track_link_id: read(
                keys::TRACK_LINKID,
                source.get_bool(keys::TRACK_LINKID),
                defaults.track_link_id,
            ),
            track_user_id: read(
                keys::TRACK_USERID,
                source.get_bool(keys::TRACK_USERID),
                defaults.track_user_id,
            ),
            track_display_features: read(
                keys::TRACK_DISPLAYFEATURES,
                source.get_bool(keys::TRACK_DISPLAYFEATURES),
                defaults.track_display_features,
            ),
            track_url_fragments: read(
                keys::TRACK_URLFRAGMENTS,
                source.get_bool(keys::TRACK_URLFRAGMENTS),
                defaults.track_url_fragments,
            ),
            domain_mode,
            cross_domains: read(
                keys::CROSS_DOMAINS,
                source.get_string_list(keys::CROSS_DOMAINS),
                defaults.cross_domains,
            ),
            debug: read(keys::DEBUG, source.get_bool(keys::DEBUG), defaults.debug),
            codesnippet_create: source
                .value(keys::CODESNIPPET_CREATE)
                .map(create_fields)
                .unwrap_or_default(),
            codesnippet_before: read(
                keys::CODESNIPPET_BEFORE,
                source.get_str(keys::CODESNIPPET_BEFORE).map(|v| v.map(str::to_string)),
                defaults.codesnippet_before,
            ),
            codesnippet_after: read(
                keys::CODESNIPPET_AFTER,
                source.get_str(keys::CODESNIPPET_AFTER).map(|v| v.map(str::to_string)),
                defaults.codesnippet_after,
            ),
            cache_local_copy: read(keys::CACHE, source.get_bool(keys::CACHE), defaults.cache_local_copy),
            user_id_salt: read(
                keys::USER_ID_SALT,
                source.get_str(keys::USER_ID_SALT).map(|v| v.map(str::to_string)),
                defaults.user_id_salt,
            ),
        }
    }

    /// Whether a web property id has been configured
    pub fn has_account(&self) -> bool {
        !self.account.is_empty()
    }
}

fn read<T>(key: &str, result: crate::error::Result<Option<T>>, default: T) -> T {
    match result {
        Ok(Some(value)) => value,
        Ok(None) => default,
        Err(err) => {
            warn!("Ignoring setting '{}': {}", key, err);
            default
        }
    }
}

fn read_code<T>(
    key: &str,
    result: crate::error::Result<Option<i64>>,
    decode: fn(i64) -> Option<T>,
    default: T,
) -> T {
    match result {
        Ok(None) => default,
        Ok(Some(code)) => decode(code).unwrap_or_else(|| {
            warn!("Ignoring setting '{}': unknown mode {}", key, code);
            default
        }),
        Err(err) => {
            warn!("Ignoring setting '{}': {}", key, err);
            default
        }
    }
}

/// Convert the `codesnippet.create` mapping into ordered JSON scalars.
fn create_fields(value: &serde_yaml::Value) -> Vec<(String, serde_json::Value)> {
    let Some(map) = value.as_mapping() else {
        if !value.is_null() {
            warn!("Ignoring setting '{}': expected mapping", keys::CODESNIPPET_CREATE);
        }
        return Vec::new();
    };

    map.iter()
        .filter_map(|(key, value)| {
            let Some(key) = key.as_str() else {
                warn!("Ignoring non-string key in '{}'", keys::CODESNIPPET_CREATE);
                return None;
            };
            match yaml_scalar_to_json(value) {
                Some(json) => Some((key.to_string(), json)),
                None => {
                    warn!(
                        "Ignoring '{}.{}': only strings, numbers and booleans are allowed",
                        keys::CODESNIPPET_CREATE,
                        key
                    );
                    None
                }
            }
        })
        .collect()
}

fn yaml_scalar_to_json(value: &serde_yaml::Value) -> Option<serde_json::Value> {
    match value {
        serde_yaml::Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
        serde_yaml::Value::String(s) => Some(serde_json::Value::String(s.clone())),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(serde_json::Value::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(serde_json::Value::from(u))
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(serde_json::Value::Number)
            }
        }
        _ => None,
    }
}

fn account_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // `\d` would also accept non-ASCII digits.
    PATTERN.get_or_init(|| Regex::new(r"^UA-[0-9]+-[0-9]+$").expect("account pattern is valid"))
}

/// Validate a web property id. The empty string is accepted and disables tracking.
pub fn validate_account(account: &str) -> Result<(), SettingsError> {
    if account.is_empty() || account_pattern().is_match(account) {
        Ok(())
    } else {
        Err(SettingsError::InvalidAccount(account.to_string()))
    }
}

/// Partial settings submission, as posted by the settings form.
///
/// Only fields that are present are written. [`SettingsUpdate::apply`]
/// validates everything first and leaves the store untouched on error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsUpdate {
    pub account: Option<String>,
    pub request_path_mode: Option<i64>,
    pub request_path_pages: Option<String>,
    pub user_role_mode: Option<i64>,
    pub user_role_roles: Option<Vec<String>>,
    pub anonymize_ip: Option<bool>,
    pub track_linkid: Option<bool>,
    pub track_userid: Option<bool>,
    pub track_displayfeatures: Option<bool>,
    pub track_urlfragments: Option<bool>,
    pub domain_mode: Option<i64>,
    pub cross_domains: Option<String>,
    pub debug: Option<bool>,
    pub cache: Option<bool>,
    /// YAML mapping text, e.g. `cookie_name: myNewName`
    pub codesnippet_create: Option<String>,
    pub codesnippet_before: Option<String>,
    pub codesnippet_after: Option<String>,
}

impl SettingsUpdate {
    /// Validate and write the update into `store`.
    ///
    /// `can_edit_snippets` reflects the submitting user's snippet permission;
    /// without it, the before/after snippets may only be resubmitted unchanged.
    pub fn apply(&self, store: &mut ConfigStore, can_edit_snippets: bool) -> Result<(), SettingsError> {
        let mut staged = store.clone();

        if let Some(account) = &self.account {
            let account = account.trim();
            validate_account(account)?;
            staged.set(keys::ACCOUNT, account)?;
        }

        if let Some(code) = self.request_path_mode {
            let mode = VisibilityMode::from_code(code)
                .ok_or_else(|| invalid(keys::REQUEST_PATH_MODE, format!("unknown mode {}", code)))?;
            staged.set(keys::REQUEST_PATH_MODE, mode.code())?;
        }
        if let Some(pages) = &self.request_path_pages {
            staged.set(keys::REQUEST_PATH_PAGES, normalize_lines(pages))?;
        }
        if let Some(code) = self.user_role_mode {
            let mode = RoleMode::from_code(code)
                .ok_or_else(|| invalid(keys::USER_ROLE_MODE, format!("unknown mode {}", code)))?;
            staged.set(keys::USER_ROLE_MODE, mode.code())?;
        }
        if let Some(roles) = &self.user_role_roles {
            let roles: Vec<serde_yaml::Value> = roles
                .iter()
                .map(|role| role.trim())
                .filter(|role| !role.is_empty())
                .map(serde_yaml::Value::from)
                .collect();
            staged.set(keys::USER_ROLE_ROLES, serde_yaml::Value::Sequence(roles))?;
        }

        for (key, flag) in [
            (keys::ANONYMIZE_IP, self.anonymize_ip),
            (keys::TRACK_LINKID, self.track_linkid),
            (keys::TRACK_USERID, self.track_userid),
            (keys::TRACK_DISPLAYFEATURES, self.track_displayfeatures),
            (keys::TRACK_URLFRAGMENTS, self.track_urlfragments),
            (keys::DEBUG, self.debug),
            (keys::CACHE, self.cache),
        ] {
            if let Some(flag) = flag {
                staged.set(key, flag)?;
            }
        }

        if let Some(code) = self.domain_mode {
            let mode = DomainMode::from_code(code)
                .ok_or_else(|| invalid(keys::DOMAIN_MODE, format!("unknown mode {}", code)))?;
            staged.set(keys::DOMAIN_MODE, mode.code())?;
        }
        if let Some(domains) = &self.cross_domains {
            staged.set(keys::CROSS_DOMAINS, normalize_lines(domains))?;
        }

        if let Some(create) = &self.codesnippet_create {
            staged.set(keys::CODESNIPPET_CREATE, parse_create_fields(create)?)?;
        }

        for (key, snippet) in [
            (keys::CODESNIPPET_BEFORE, &self.codesnippet_before),
            (keys::CODESNIPPET_AFTER, &self.codesnippet_after),
        ] {
            let Some(snippet) = snippet else { continue };
            let current = store.get_str(key).ok().flatten().unwrap_or_default();
            if !can_edit_snippets && snippet.as_str() != current {
                return Err(SettingsError::SnippetPermission(key.to_string()));
            }
            staged.set(key, snippet.as_str())?;
        }

        let settings = TrackingSettings::from_source(&staged);
        if settings.domain_mode == DomainMode::MultipleTopLevelDomains
            && settings.cross_domains.is_empty()
        {
            return Err(SettingsError::MissingCrossDomains);
        }

        *store = staged;
        Ok(())
    }
}

fn invalid(key: &str, reason: String) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        reason,
    }
}

fn normalize_lines(content: &str) -> String {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_create_fields(content: &str) -> Result<serde_yaml::Value, SettingsError> {
    if content.trim().is_empty() {
        return Ok(serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
    }

    let value: serde_yaml::Value = serde_yaml::from_str(content).map_err(|err| {
        invalid(keys::CODESNIPPET_CREATE, format!("not a YAML mapping: {}", err))
    })?;
    let map = value
        .as_mapping()
        .ok_or_else(|| invalid(keys::CODESNIPPET_CREATE, "expected `name: value` lines".to_string()))?;

    for (key, value) in map {
        if !key.is_string() || yaml_scalar_to_json(value).is_none() {
            return Err(invalid(
                keys::CODESNIPPET_CREATE,
                "only strings, numbers and booleans are allowed".to_string(),
            ));
        }
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = TrackingSettings::default();

        assert!(!settings.has_account());
        assert!(settings.anonymize_ip);
        assert!(settings.track_display_features);
        assert!(!settings.track_link_id);
        assert_eq!(settings.visibility_mode, VisibilityMode::ShowExceptListed);
        assert_eq!(settings.domain_mode, DomainMode::SingleDomain);
    }

    #[test]
    fn test_mode_codes() {
        for code in 0..2 {
            assert_eq!(VisibilityMode::from_code(code).unwrap().code(), code);
            assert_eq!(RoleMode::from_code(code).unwrap().code(), code);
        }
        for code in 0..3 {
            assert_eq!(DomainMode::from_code(code).unwrap().code(), code);
        }
        assert!(DomainMode::from_code(3).is_none());
        assert!(VisibilityMode::from_code(2).is_none());
    }

    #[test]
    fn test_from_source_bad_values_fall_back() {
        let store = ConfigStore::from_yaml_str(
            "account: UA-1-1\ndomain_mode: 7\ntrack:\n  linkid: [1]\nprivacy:\n  anonymizeip: 0\n",
        )
        .unwrap();
        let settings = TrackingSettings::from_source(&store);

        assert_eq!(settings.account, "UA-1-1");
        assert_eq!(settings.domain_mode, DomainMode::SingleDomain);
        assert!(!settings.track_link_id);
        assert!(!settings.anonymize_ip);
    }

    #[test]
    fn test_create_fields_keep_order() {
        let store = ConfigStore::from_yaml_str(
            "codesnippet:\n  create:\n    cookie_domain: foo.example.com\n    cookie_name: myNewName\n    cookie_expires: 20000\n    nested: [1]\n",
        )
        .unwrap();
        let settings = TrackingSettings::from_source(&store);

        assert_eq!(
            settings.codesnippet_create,
            vec![
                ("cookie_domain".to_string(), serde_json::json!("foo.example.com")),
                ("cookie_name".to_string(), serde_json::json!("myNewName")),
                ("cookie_expires".to_string(), serde_json::json!(20000)),
            ]
        );
    }

    #[test]
    fn test_validate_account() {
        assert!(validate_account("UA-123456-1").is_ok());
        assert!(validate_account("").is_ok());
        assert!(validate_account("ua-123456-1").is_err());
        assert!(validate_account("UA-123456").is_err());
        assert!(validate_account("UA-12a456-1").is_err());
        assert!(validate_account(" UA-1-1").is_err());
        assert!(validate_account("UA-١٢-1").is_err());
    }
}
