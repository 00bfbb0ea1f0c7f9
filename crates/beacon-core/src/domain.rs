//! Cookie domain derivation for multi-subdomain tracking

/// Parent domain shared by all subdomains of `host`.
///
/// The leftmost label is stripped when the host has more than two labels
/// and is not a dotted-numeric address. Localhost, IP addresses, bare
/// two-label domains and hosts with characters outside `[A-Za-z0-9-]` in
/// any label yield `None`.
pub fn cookie_domain(host: &str) -> Option<String> {
    let host = host.trim().trim_end_matches('.');
    if host.is_empty() || host.contains(':') || host.starts_with('[') {
        return None;
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 || !labels.iter().all(|label| is_dns_label(label)) {
        return None;
    }

    let numeric = host.chars().filter(|c| *c != '.').all(|c| c.is_ascii_digit());
    if numeric {
        return None;
    }

    Some(labels[1..].join("."))
}

fn is_dns_label(label: &str) -> bool {
    !label.is_empty() && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}
