//! Unit tests for settings submission and persistence

use beacon_core::error::INVALID_ACCOUNT_MESSAGE;
use beacon_core::settings::keys;
use beacon_core::{
    ConfigStore, DomainMode, SettingsError, SettingsSource, SettingsUpdate, TrackingSettings,
};

fn store_with_account() -> ConfigStore {
    let mut store = ConfigStore::new();
    store.set(keys::ACCOUNT, "UA-123456-1").unwrap();
    store
}

// =============================================================================
// Account validation
// =============================================================================

#[test]
fn test_invalid_account_rejected() {
    let mut store = store_with_account();
    let update = SettingsUpdate {
        account: Some("invalid-UA-code".to_string()),
        ..SettingsUpdate::default()
    };

    let err = update.apply(&mut store, true).unwrap_err();
    assert!(matches!(err, SettingsError::InvalidAccount(_)));
    assert_eq!(err.to_string(), INVALID_ACCOUNT_MESSAGE);
    assert_eq!(store.get_str(keys::ACCOUNT).unwrap(), Some("UA-123456-1"));
}

#[test]
fn test_valid_account_trimmed_and_saved() {
    let mut store = ConfigStore::new();
    let update = SettingsUpdate {
        account: Some("  UA-123456-2 ".to_string()),
        ..SettingsUpdate::default()
    };

    update.apply(&mut store, false).unwrap();
    assert_eq!(store.get_str(keys::ACCOUNT).unwrap(), Some("UA-123456-2"));
}

#[test]
fn test_empty_account_allowed() {
    let mut store = store_with_account();
    let update = SettingsUpdate {
        account: Some(String::new()),
        ..SettingsUpdate::default()
    };

    update.apply(&mut store, false).unwrap();
    assert!(!TrackingSettings::from_source(&store).has_account());
}

// =============================================================================
// Field validation
// =============================================================================

#[test]
fn test_failed_update_leaves_store_untouched() {
    let mut store = store_with_account();
    let before = store.clone();
    let update = SettingsUpdate {
        debug: Some(true),
        request_path_mode: Some(5),
        ..SettingsUpdate::default()
    };

    let err = update.apply(&mut store, true).unwrap_err();
    assert!(matches!(err, SettingsError::InvalidValue { .. }));
    assert_eq!(store, before);
}

#[test]
fn test_multi_domain_requires_cross_domains() {
    let mut store = store_with_account();
    let update = SettingsUpdate {
        domain_mode: Some(2),
        cross_domains: Some("\n  \n".to_string()),
        ..SettingsUpdate::default()
    };

    let err = update.apply(&mut store, true).unwrap_err();
    assert!(matches!(err, SettingsError::MissingCrossDomains));
}

#[test]
fn test_cross_domains_saved_line_by_line() {
    let mut store = store_with_account();
    let update = SettingsUpdate {
        domain_mode: Some(2),
        cross_domains: Some("www.example.com\r\n  www.example.net  \n".to_string()),
        ..SettingsUpdate::default()
    };

    update.apply(&mut store, true).unwrap();
    let settings = TrackingSettings::from_source(&store);
    assert_eq!(settings.domain_mode, DomainMode::MultipleTopLevelDomains);
    assert_eq!(settings.cross_domains, vec!["www.example.com", "www.example.net"]);
}

#[test]
fn test_codesnippet_create_parsed_in_order() {
    let mut store = store_with_account();
    let update = SettingsUpdate {
        codesnippet_create: Some(
            "cookie_domain: foo.example.com\ncookie_name: myNewName\ncookie_expires: 20000\n"
                .to_string(),
        ),
        ..SettingsUpdate::default()
    };

    update.apply(&mut store, false).unwrap();
    let settings = TrackingSettings::from_source(&store);
    let keys: Vec<&str> = settings
        .codesnippet_create
        .iter()
        .map(|(key, _)| key.as_str())
        .collect();
    assert_eq!(keys, vec!["cookie_domain", "cookie_name", "cookie_expires"]);
}

#[test]
fn test_codesnippet_create_rejects_nested_values() {
    let mut store = store_with_account();
    let update = SettingsUpdate {
        codesnippet_create: Some("cookie_flags:\n  secure: true\n".to_string()),
        ..SettingsUpdate::default()
    };

    assert!(matches!(
        update.apply(&mut store, true),
        Err(SettingsError::InvalidValue { .. })
    ));
}

#[test]
fn test_role_and_path_lists_saved() {
    let mut store = store_with_account();
    let update = SettingsUpdate {
        request_path_mode: Some(1),
        request_path_pages: Some("/admin\n/admin/*\n\n".to_string()),
        user_role_mode: Some(0),
        user_role_roles: Some(vec!["authenticated".to_string(), " ".to_string()]),
        ..SettingsUpdate::default()
    };

    update.apply(&mut store, true).unwrap();
    let settings = TrackingSettings::from_source(&store);
    assert_eq!(settings.visibility_paths, vec!["/admin", "/admin/*"]);
    assert_eq!(settings.role_filter.len(), 1);
    assert!(settings.role_filter.contains("authenticated"));
}

// =============================================================================
// Snippet permission
// =============================================================================

#[test]
fn test_snippet_change_requires_permission() {
    let mut store = store_with_account();
    let update = SettingsUpdate {
        codesnippet_before: Some("console.log('before');".to_string()),
        ..SettingsUpdate::default()
    };

    let err = update.apply(&mut store, false).unwrap_err();
    assert!(matches!(err, SettingsError::SnippetPermission(ref key) if key == keys::CODESNIPPET_BEFORE));

    update.apply(&mut store, true).unwrap();
    assert_eq!(
        store.get_str(keys::CODESNIPPET_BEFORE).unwrap(),
        Some("console.log('before');")
    );
}

#[test]
fn test_unchanged_snippet_resubmission_allowed() {
    let mut store = store_with_account();
    store.set(keys::CODESNIPPET_AFTER, "after();").unwrap();
    let update = SettingsUpdate {
        codesnippet_before: Some(String::new()),
        codesnippet_after: Some("after();".to_string()),
        debug: Some(true),
        ..SettingsUpdate::default()
    };

    update.apply(&mut store, false).unwrap();
    assert!(TrackingSettings::from_source(&store).debug);
}

#[test]
fn test_update_deserializes_from_partial_json() {
    let update: SettingsUpdate =
        serde_json::from_str(r#"{"account":"UA-1-2","track_linkid":true}"#).unwrap();

    assert_eq!(update.account.as_deref(), Some("UA-1-2"));
    assert_eq!(update.track_linkid, Some(true));
    assert!(update.codesnippet_before.is_none());
}
