//! Page visibility rules
//!
//! A request is tracked when both the role check and the path check pass.
//! Path patterns are matched case-insensitively against the whole path;
//! `*` matches any run of characters and `<front>` stands for the front page.

use crate::context::RequestContext;
use crate::settings::{RoleMode, TrackingSettings, VisibilityMode};
use log::{debug, warn};
use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;

/// Token resolved to the site's front page
pub const FRONT_PAGE_TOKEN: &str = "<front>";

/// Compiled list of visibility path patterns.
///
/// `<front>` is kept apart from the compiled regex and resolved against the
/// request's front page at match time, so one matcher serves every request.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    regex: Option<Regex>,
    front: bool,
}

impl PathMatcher {
    /// Compile `patterns`.
    ///
    /// Blank patterns are skipped and a leading slash is added where missing.
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut front = false;
        let alternatives: Vec<String> = patterns
            .into_iter()
            .filter_map(|pattern| {
                let pattern = pattern.as_ref().trim();
                if pattern.is_empty() {
                    return None;
                }
                if pattern == FRONT_PAGE_TOKEN {
                    front = true;
                    return None;
                }
                let pattern = if pattern.starts_with('/') {
                    pattern.to_string()
                } else {
                    format!("/{}", pattern)
                };
                Some(regex::escape(&pattern).replace(r"\*", ".*"))
            })
            .collect();

        if alternatives.is_empty() {
            return Ok(Self { regex: None, front });
        }

        let regex = RegexBuilder::new(&format!("^(?:{})$", alternatives.join("|")))
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            regex: Some(regex),
            front,
        })
    }

    /// Whether `path` matches, with `<front>` standing for `front_page`
    pub fn is_match(&self, path: &str, front_page: &str) -> bool {
        if self.front && path.eq_ignore_ascii_case(front_page) {
            return true;
        }
        self.regex.as_ref().is_some_and(|regex| regex.is_match(path))
    }

    /// Whether no pattern was configured
    pub fn is_empty(&self) -> bool {
        self.regex.is_none() && !self.front
    }

    /// Compile the visibility list of `settings`, logging and returning
    /// `None` when it does not compile.
    pub fn from_settings(settings: &TrackingSettings) -> Option<Self> {
        match Self::new(&settings.visibility_paths) {
            Ok(matcher) => Some(matcher),
            Err(err) => {
                warn!("Visibility patterns could not be compiled: {}", err);
                None
            }
        }
    }
}

/// Role check: an empty filter lets every role through.
pub fn roles_allow(settings: &TrackingSettings, roles: &BTreeSet<String>) -> bool {
    if settings.role_filter.is_empty() {
        return true;
    }

    let intersects = roles.iter().any(|role| settings.role_filter.contains(role));
    match settings.role_mode {
        RoleMode::OnlySelected => intersects,
        RoleMode::AllExceptSelected => !intersects,
    }
}

/// Path check against the compiled visibility list.
///
/// Tracked error pages (403/404) always pass so that they record a hit.
/// A list that failed to compile matches nothing.
pub fn path_allows(
    settings: &TrackingSettings,
    matcher: Option<&PathMatcher>,
    context: &RequestContext,
) -> bool {
    if context.response_status.error_page().is_some() {
        return true;
    }

    let matched =
        matcher.is_some_and(|matcher| matcher.is_match(&context.current_path, &context.front_page));

    match settings.visibility_mode {
        VisibilityMode::ShowExceptListed => !matched,
        VisibilityMode::ShowOnlyListed => matched,
    }
}

/// Decide whether the tracking snippet is emitted for this request.
///
/// Compiles the visibility list on each call; [`should_track_with`] takes a
/// precompiled matcher.
pub fn should_track(settings: &TrackingSettings, context: &RequestContext) -> bool {
    should_track_with(settings, PathMatcher::from_settings(settings).as_ref(), context)
}

/// [`should_track`] with the visibility list already compiled
pub fn should_track_with(
    settings: &TrackingSettings,
    matcher: Option<&PathMatcher>,
    context: &RequestContext,
) -> bool {
    if !settings.has_account() {
        return false;
    }

    let roles_ok = roles_allow(settings, &context.user_roles);
    let path_ok = path_allows(settings, matcher, context);
    debug!(
        "Visibility for '{}' (status {}): roles={}, path={}",
        context.current_path,
        context.response_status.code(),
        roles_ok,
        path_ok
    );

    roles_ok && path_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRONT: &str = "/node";

    fn matcher(patterns: &[&str]) -> PathMatcher {
        PathMatcher::new(patterns).unwrap()
    }

    #[test]
    fn test_exact_pattern_is_anchored() {
        let m = matcher(&["/admin"]);
        assert!(m.is_match("/admin", FRONT));
        assert!(!m.is_match("/admin/config", FRONT));
        assert!(!m.is_match("/administer", FRONT));
        assert!(!m.is_match("/x/admin", FRONT));
    }

    #[test]
    fn test_wildcard_matches_suffix() {
        let m = matcher(&["/admin/*"]);
        assert!(m.is_match("/admin/config/system/google-analytics", FRONT));
        assert!(!m.is_match("/admin", FRONT));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(matcher(&["/Admin"]).is_match("/ADMIN", FRONT));
    }

    #[test]
    fn test_front_token() {
        let m = matcher(&["<front>"]);
        assert!(m.is_match("/node", FRONT));
        assert!(!m.is_match("/", FRONT));
        assert!(m.is_match("/", "/"));
        assert!(!m.is_empty());
    }

    #[test]
    fn test_matcher_reused_across_front_pages() {
        let m = matcher(&["<front>", "/admin/*"]);
        assert!(m.is_match("/home", "/home"));
        assert!(!m.is_match("/home", "/node"));
        assert!(m.is_match("/admin/x", "/home"));
    }

    #[test]
    fn test_missing_leading_slash_and_blank_lines() {
        let m = matcher(&["", "user/*", "   "]);
        assert!(m.is_match("/user/1", FRONT));
        assert!(!m.is_empty());
        assert!(matcher(&["", " "]).is_empty());
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let m = matcher(&["/a.b", "/c+(d)"]);
        assert!(m.is_match("/a.b", FRONT));
        assert!(!m.is_match("/axb", FRONT));
        assert!(m.is_match("/c+(d)", FRONT));
    }

    #[test]
    fn test_role_modes() {
        let mut settings = TrackingSettings::default();
        settings.role_filter = BTreeSet::from(["editor".to_string()]);
        let editor = BTreeSet::from(["authenticated".to_string(), "editor".to_string()]);
        let anonymous = BTreeSet::from(["anonymous".to_string()]);

        assert!(roles_allow(&settings, &editor));
        assert!(!roles_allow(&settings, &anonymous));

        settings.role_mode = RoleMode::AllExceptSelected;
        assert!(!roles_allow(&settings, &editor));
        assert!(roles_allow(&settings, &anonymous));
    }
}
