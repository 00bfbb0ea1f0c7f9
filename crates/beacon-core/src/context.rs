//! Per-request input supplied by the host

use std::collections::BTreeSet;

/// Role every visitor without a session carries
pub const ANONYMOUS_ROLE: &str = "anonymous";
/// Role every logged-in user carries
pub const AUTHENTICATED_ROLE: &str = "authenticated";

/// HTTP status of the page being rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseStatus {
    #[default]
    Ok,
    Forbidden,
    NotFound,
    Other(u16),
}

impl ResponseStatus {
    pub fn from_code(code: u16) -> Self {
        match code {
            200 => Self::Ok,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Other(code) => code,
        }
    }

    /// Static asset recorded in place of the real path for tracked error pages
    pub fn error_page(self) -> Option<&'static str> {
        match self {
            Self::Forbidden => Some("403.html"),
            Self::NotFound => Some("404.html"),
            _ => None,
        }
    }
}

/// Externally supplied replacement for the tracked `page_path`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagePathOverride {
    /// Literal path, emitted as a JSON string
    Path(String),
    /// Script expression, emitted verbatim
    Expression(String),
}

/// Request context handed to the decision engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Normalized path: leading slash, no query string or fragment
    pub current_path: String,
    pub user_roles: BTreeSet<String>,
    pub response_status: ResponseStatus,
    /// Host name the page was requested on, without port
    pub host: String,
    /// Site base path, always with leading and trailing slash
    pub base_path: String,
    /// Path the `<front>` token resolves to
    pub front_page: String,
    /// Identifier of the authenticated user, if any
    pub user_id: Option<String>,
    pub page_path_override: Option<PagePathOverride>,
}

impl RequestContext {
    /// Context for an anonymous request to `path` that rendered with status 200
    pub fn new(path: &str) -> Self {
        Self {
            current_path: normalize_path(path),
            user_roles: BTreeSet::from([ANONYMOUS_ROLE.to_string()]),
            response_status: ResponseStatus::Ok,
            host: String::new(),
            base_path: "/".to_string(),
            front_page: "/".to_string(),
            user_id: None,
            page_path_override: None,
        }
    }

    /// Replace the role set
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the request as made by an authenticated user.
    ///
    /// Adds the `authenticated` role and drops `anonymous`.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self.user_roles.remove(ANONYMOUS_ROLE);
        self.user_roles.insert(AUTHENTICATED_ROLE.to_string());
        self
    }

    pub fn with_status(mut self, status: ResponseStatus) -> Self {
        self.response_status = status;
        self
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = strip_port(host).to_string();
        self
    }

    pub fn with_base_path(mut self, base_path: &str) -> Self {
        let trimmed = base_path.trim_matches('/');
        self.base_path = if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", trimmed)
        };
        self
    }

    pub fn with_front_page(mut self, front_page: &str) -> Self {
        self.front_page = normalize_path(front_page);
        self
    }

    pub fn with_page_path_override(mut self, page_path: PagePathOverride) -> Self {
        self.page_path_override = Some(page_path);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Strip query string and fragment, force a leading slash and drop a trailing one.
pub fn normalize_path(path: &str) -> String {
    let path = path
        .split(&['?', '#'][..])
        .next()
        .unwrap_or_default()
        .trim();
    let trimmed = path.trim_matches('/');
    format!("/{}", trimmed)
}

fn strip_port(host: &str) -> &str {
    let host = host.trim();
    if host.starts_with('[') {
        // Bracketed IPv6 literal
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    if host.matches(':').count() > 1 {
        return host;
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}
