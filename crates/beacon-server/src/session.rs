//! Current user resolution and permissions

use crate::config::ServerConfig;
use axum::http::HeaderMap;
use beacon_core::RequestContext;
use std::collections::BTreeSet;

/// Header naming the configured user a request is made as
pub const USER_HEADER: &str = "x-beacon-user";

pub mod permissions {
    pub const ACCESS_ADMINISTRATION_PAGES: &str = "access administration pages";
    pub const ADMINISTER_GOOGLE_ANALYTICS: &str = "administer google analytics";
    pub const ADMINISTER_MODULES: &str = "administer modules";
    pub const ADMINISTER_SITE_CONFIGURATION: &str = "administer site configuration";
    pub const ADD_JS_SNIPPETS: &str = "add JS snippets for google analytics";
}

/// The user a request is made as
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentUser {
    /// `None` for anonymous visitors
    pub name: Option<String>,
    pub roles: Vec<String>,
    pub permissions: BTreeSet<String>,
}

impl CurrentUser {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Resolve the user named by the [`USER_HEADER`] header.
    ///
    /// Unknown names are treated as anonymous.
    pub fn from_headers(headers: &HeaderMap, config: &ServerConfig) -> Self {
        let Some(name) = headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|name| !name.is_empty())
        else {
            return Self::anonymous();
        };

        match config.users.get(name) {
            Some(user) => Self {
                name: Some(name.to_string()),
                roles: user.roles.clone(),
                permissions: user.permissions.iter().cloned().collect(),
            },
            None => {
                tracing::debug!("Unknown user '{}', treating request as anonymous", name);
                Self::anonymous()
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.name.is_some()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// Attach identity and roles to a request context
    pub fn apply_to(&self, context: RequestContext) -> RequestContext {
        let Some(name) = &self.name else {
            return context;
        };

        let mut context = context.with_user(name.as_str());
        context.user_roles.extend(self.roles.iter().cloned());
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserConfig;
    use axum::http::HeaderValue;
    use beacon_core::context::{ANONYMOUS_ROLE, AUTHENTICATED_ROLE};

    fn config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.users.insert(
            "admin".to_string(),
            UserConfig {
                roles: vec!["administrator".to_string()],
                permissions: vec![permissions::ADMINISTER_GOOGLE_ANALYTICS.to_string()],
            },
        );
        config
    }

    #[test]
    fn test_missing_header_is_anonymous() {
        let user = CurrentUser::from_headers(&HeaderMap::new(), &config());
        assert!(!user.is_authenticated());
        assert_eq!(user, CurrentUser::anonymous());
    }

    #[test]
    fn test_unknown_user_is_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static("mallory"));

        assert!(!CurrentUser::from_headers(&headers, &config()).is_authenticated());
    }

    #[test]
    fn test_known_user_gets_roles_and_permissions() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static("admin"));
        let user = CurrentUser::from_headers(&headers, &config());

        assert!(user.is_authenticated());
        assert!(user.has_permission(permissions::ADMINISTER_GOOGLE_ANALYTICS));
        assert!(!user.has_permission(permissions::ADD_JS_SNIPPETS));

        let context = user.apply_to(RequestContext::new("/"));
        assert_eq!(context.user_id.as_deref(), Some("admin"));
        assert!(context.user_roles.contains(AUTHENTICATED_ROLE));
        assert!(context.user_roles.contains("administrator"));
        assert!(!context.user_roles.contains(ANONYMOUS_ROLE));
    }

    #[test]
    fn test_anonymous_context_untouched() {
        let context = CurrentUser::anonymous().apply_to(RequestContext::new("/"));
        assert_eq!(context, RequestContext::new("/"));
    }
}
