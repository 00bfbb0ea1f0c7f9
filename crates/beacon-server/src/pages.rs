//! HTML pages served by the site

use crate::session::permissions;
use beacon_core::{DomainMode, RoleMode, TrackingSettings, VisibilityMode};

/// Route of the tracking settings form, relative to the base path
pub const SETTINGS_ROUTE: &str = "admin/config/system/google-analytics";
/// Route of the module help page, relative to the base path
pub const HELP_ROUTE: &str = "admin/help/google_analytics";

pub const SETTINGS_HELP: &str =
    "Google Analytics is a free (registration required) website traffic and marketing effectiveness service.";
pub const MODULE_HELP: &str = "Google Analytics adds a web statistics tracking system to your website.";

/// Wrap `body` in the site layout. Tracking markup is injected before `</head>`.
pub fn layout(title: &str, body: &str) -> String {
    let title = escape_html(title);
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n"
    )
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn front_page() -> String {
    layout("Welcome", "<p>No front page content has been created yet.</p>")
}

pub fn admin_index(base_path: &str) -> String {
    let body = format!(
        "<ul>\n<li><a href=\"{base}admin/modules\">Extend</a></li>\n<li><a href=\"{base}admin/reports/status\">Status report</a></li>\n<li><a href=\"{base}{settings}\">Google Analytics</a></li>\n</ul>",
        base = base_path,
        settings = SETTINGS_ROUTE
    );
    layout("Administration", &body)
}

pub fn modules_page(base_path: &str) -> String {
    let body = format!(
        "<table>\n<tr><th>Module</th><th>Description</th><th>Operations</th></tr>\n<tr><td>Google Analytics</td><td>{help}</td><td><a href=\"{base}{help_route}\">Help</a> <a href=\"{base}{settings}\">Configure</a></td></tr>\n</table>",
        help = MODULE_HELP,
        base = base_path,
        help_route = HELP_ROUTE,
        settings = SETTINGS_ROUTE
    );
    layout("Extend", &body)
}

pub fn help_page(base_path: &str) -> String {
    let body = format!(
        "<p>{}</p>\n<p>Configure which pages and roles are tracked on the <a href=\"{}{}\">Google Analytics settings page</a>.</p>",
        MODULE_HELP, base_path, SETTINGS_ROUTE
    );
    layout("Google Analytics", &body)
}

pub fn password_page() -> String {
    layout(
        "Reset your password",
        "<form method=\"get\">\n<label for=\"name\">Username or email address</label>\n<input type=\"text\" id=\"name\" name=\"name\">\n<button type=\"submit\">Submit</button>\n</form>",
    )
}

/// Status report entries for the tracking module
pub fn status_report(base_path: &str, settings: &TrackingSettings) -> String {
    let settings_link = format!(
        "<a href=\"{}{}\">Google Analytics settings page</a>",
        base_path, SETTINGS_ROUTE
    );

    let mut entries = Vec::new();
    if !settings.has_account() {
        entries.push(format!(
            "<li class=\"warning\">Google Analytics module has not been configured yet. Please configure its settings from the {}.</li>",
            settings_link
        ));
    }
    if settings.debug {
        entries.push(format!(
            "<li class=\"warning\">Google Analytics module has debugging enabled. Please disable debugging setting in production sites from the {}.</li>",
            settings_link
        ));
    }
    if entries.is_empty() {
        entries.push("<li>Google Analytics is configured.</li>".to_string());
    }

    layout("Status report", &format!("<ul>\n{}\n</ul>", entries.join("\n")))
}

/// `codesnippet.create` fields as editable `name: value` lines
pub fn create_fields_text(settings: &TrackingSettings) -> String {
    settings
        .codesnippet_create
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn checkbox(name: &str, label: &str, checked: bool) -> String {
    format!(
        "<label><input type=\"checkbox\" name=\"{}\" value=\"1\"{}> {}</label>",
        name,
        if checked { " checked=\"checked\"" } else { "" },
        label
    )
}

fn radio(name: &str, value: i64, label: &str, current: i64) -> String {
    format!(
        "<label><input type=\"radio\" name=\"{}\" value=\"{}\"{}> {}</label>",
        name,
        value,
        if value == current { " checked=\"checked\"" } else { "" },
        label
    )
}

fn textarea(name: &str, label: &str, content: &str, disabled: bool) -> String {
    format!(
        "<label for=\"{name}\">{label}</label>\n<textarea id=\"{name}\" name=\"{name}\" rows=\"5\"{disabled}>{content}</textarea>",
        name = name,
        label = label,
        disabled = if disabled { " disabled=\"disabled\"" } else { "" },
        content = escape_html(content)
    )
}

/// Settings form. Saving posts the same field names as JSON.
///
/// Without the snippet permission the before/after snippets are shown but disabled.
pub fn settings_form(
    base_path: &str,
    settings: &TrackingSettings,
    known_roles: &[String],
    can_edit_snippets: bool,
) -> String {
    let mut sections = vec![format!("<p>{}</p>", SETTINGS_HELP)];

    sections.push(format!(
        "<fieldset>\n<legend>General settings</legend>\n<label for=\"account\">Web Property ID</label>\n<input type=\"text\" id=\"account\" name=\"account\" value=\"{}\" size=\"20\" maxlength=\"20\" placeholder=\"UA-\">\n</fieldset>",
        escape_html(&settings.account)
    ));

    let domain = settings.domain_mode.code();
    sections.push(format!(
        "<fieldset>\n<legend>Domains</legend>\n{}\n{}\n{}\n{}\n</fieldset>",
        radio("domain_mode", DomainMode::SingleDomain.code(), "A single domain (default)", domain),
        radio(
            "domain_mode",
            DomainMode::OneDomainMultiSubdomain.code(),
            "One domain with multiple subdomains",
            domain
        ),
        radio(
            "domain_mode",
            DomainMode::MultipleTopLevelDomains.code(),
            "Multiple top-level domains",
            domain
        ),
        textarea("cross_domains", "List of top-level domains", &settings.cross_domains.join("\n"), false)
    ));

    let path_mode = settings.visibility_mode.code();
    sections.push(format!(
        "<fieldset>\n<legend>Pages</legend>\n{}\n{}\n{}\n</fieldset>",
        radio(
            "request_path_mode",
            VisibilityMode::ShowExceptListed.code(),
            "Every page except the listed pages",
            path_mode
        ),
        radio(
            "request_path_mode",
            VisibilityMode::ShowOnlyListed.code(),
            "The listed pages only",
            path_mode
        ),
        textarea("request_path_pages", "Pages", &settings.visibility_paths.join("\n"), false)
    ));

    let role_mode = settings.role_mode.code();
    let role_boxes: Vec<String> = known_roles
        .iter()
        .map(|role| {
            format!(
                "<label><input type=\"checkbox\" name=\"user_role_roles\" value=\"{role}\"{checked}> {role}</label>",
                role = escape_html(role),
                checked = if settings.role_filter.contains(role) {
                    " checked=\"checked\""
                } else {
                    ""
                }
            )
        })
        .collect();
    sections.push(format!(
        "<fieldset>\n<legend>Roles</legend>\n{}\n{}\n{}\n</fieldset>",
        radio("user_role_mode", RoleMode::OnlySelected.code(), "Add to the selected roles only", role_mode),
        radio(
            "user_role_mode",
            RoleMode::AllExceptSelected.code(),
            "Add to every role except the selected ones",
            role_mode
        ),
        role_boxes.join("\n")
    ));

    sections.push(format!(
        "<fieldset>\n<legend>Tracking and privacy</legend>\n{}\n</fieldset>",
        [
            checkbox("anonymize_ip", "Anonymize visitors IP address", settings.anonymize_ip),
            checkbox("track_linkid", "Enable enhanced link attribution", settings.track_link_id),
            checkbox("track_userid", "Track User ID", settings.track_user_id),
            checkbox(
                "track_displayfeatures",
                "Track display features",
                settings.track_display_features
            ),
            checkbox("track_urlfragments", "Track changing URL fragments as pageviews", settings.track_url_fragments),
            checkbox("cache", "Locally cache tracking code file", settings.cache_local_copy),
            checkbox("debug", "Enable debugging", settings.debug),
        ]
        .join("\n")
    ));

    sections.push(format!(
        "<fieldset>\n<legend>Custom JavaScript code</legend>\n{}\n{}\n{}\n</fieldset>",
        textarea("codesnippet_create", "Create only fields", &create_fields_text(settings), false),
        textarea(
            "codesnippet_before",
            "Code snippet (before)",
            &settings.codesnippet_before,
            !can_edit_snippets
        ),
        textarea(
            "codesnippet_after",
            "Code snippet (after)",
            &settings.codesnippet_after,
            !can_edit_snippets
        )
    ));

    let body = format!(
        "<form method=\"post\" action=\"{}{}\" data-submit=\"json\">\n{}\n<button type=\"submit\">Save configuration</button>\n</form>\n<p>Users need the '{}' permission to change the code snippets.</p>",
        base_path,
        SETTINGS_ROUTE,
        sections.join("\n"),
        permissions::ADD_JS_SNIPPETS
    );
    layout("Google Analytics", &body)
}
