// src/core/scanner/headers_scanner.rs

use crate::core::models::HeaderData;
use std::collections::BTreeMap;
use tracing::debug;

/// Security headers whose presence is recorded for every fetch.
pub const SECURITY_HEADERS: &[&str] = &[
    "strict-transport-security",
    "content-security-policy",
    "x-frame-options",
    "x-content-type-options",
    "referrer-policy",
    "permissions-policy",
    "x-xss-protection",
    "cross-origin-opener-policy",
    "cross-origin-resource-policy",
    "cross-origin-embedder-policy",
];

/// Headers whose values commonly name the serving stack.
const TECHNOLOGY_HEADERS: &[&str] = &[
    "server",
    "x-powered-by",
    "x-aspnet-version",
    "x-aspnetmvc-version",
    "x-generator",
    "x-drupal-cache",
    "x-runtime",
    "via",
];

/// Checks for the presence of a specific header in a lowercase-keyed header table.
///
/// A header that is present but empty still counts as present; the value is
/// kept so the check layer can judge its quality.
fn check_header(headers: &BTreeMap<String, String>, name: &str) -> HeaderData {
    match headers.get(name) {
        Some(value) => {
            debug!(header_name = name, value = %value, "Header found.");
            HeaderData { present: true, value: Some(value.clone()) }
        }
        None => {
            debug!(header_name = name, "Header not found.");
            HeaderData { present: false, value: None }
        }
    }
}

/// Presence/value table for every entry of [`SECURITY_HEADERS`].
pub fn parse_security_headers(headers: &BTreeMap<String, String>) -> BTreeMap<String, HeaderData> {
    SECURITY_HEADERS
        .iter()
        .map(|name| (name.to_string(), check_header(headers, name)))
        .collect()
}

/// `name: value` strings for the headers that disclose server technology.
pub fn technology_hints(headers: &BTreeMap<String, String>) -> Vec<String> {
    TECHNOLOGY_HEADERS
        .iter()
        .filter_map(|name| {
            headers
                .get(*name)
                .filter(|v| !v.trim().is_empty())
                .map(|v| format!("{name}: {v}"))
        })
        .collect()
}

/// A header value that reveals a version number, e.g. `Apache/2.4.41` or `PHP/8.1.2`.
pub fn discloses_version(value: &str) -> bool {
    value
        .split(|c: char| c.is_whitespace() || c == '(' || c == ')')
        .any(|token| {
            token
                .split_once('/')
                .is_some_and(|(_, version)| version.chars().next().is_some_and(|c| c.is_ascii_digit()))
        })
}

/// Parses `max-age` out of an HSTS header value.
pub fn hsts_max_age(value: &str) -> Option<u64> {
    value.split(';').find_map(|directive| {
        let (key, val) = directive.trim().split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("max-age")
            .then(|| val.trim().trim_matches('"').parse().ok())
            .flatten()
    })
}

/// Individual cookies from a newline-joined `set-cookie` value.
pub fn set_cookies(headers: &BTreeMap<String, String>) -> Vec<&str> {
    headers
        .get("set-cookie")
        .map(|raw| raw.lines().filter(|l| !l.trim().is_empty()).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn security_table_covers_every_known_header() {
        let table = parse_security_headers(&headers(&[("content-security-policy", "default-src 'self'")]));
        assert_eq!(table.len(), SECURITY_HEADERS.len());
        assert!(table["content-security-policy"].present);
        assert!(!table["strict-transport-security"].present);
    }

    #[test]
    fn technology_hints_skip_empty_values() {
        let hints = technology_hints(&headers(&[("server", "nginx/1.24.0"), ("x-powered-by", " ")]));
        assert_eq!(hints, vec!["server: nginx/1.24.0".to_string()]);
    }

    #[test]
    fn version_disclosure_detection() {
        assert!(discloses_version("Apache/2.4.41 (Ubuntu)"));
        assert!(discloses_version("PHP/8.1.2"));
        assert!(!discloses_version("cloudflare"));
        assert!(!discloses_version("nginx"));
    }

    #[test]
    fn hsts_max_age_parsing() {
        assert_eq!(hsts_max_age("max-age=31536000; includeSubDomains"), Some(31_536_000));
        assert_eq!(hsts_max_age("includeSubDomains; Max-Age=\"600\""), Some(600));
        assert_eq!(hsts_max_age("preload"), None);
    }

    #[test]
    fn splits_joined_cookies() {
        let h = headers(&[("set-cookie", "a=1; Secure\nb=2; HttpOnly")]);
        assert_eq!(set_cookies(&h), vec!["a=1; Secure", "b=2; HttpOnly"]);
    }
}
