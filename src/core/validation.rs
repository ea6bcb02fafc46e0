// src/core/validation.rs

//! Pre-flight checks on the target URL. Nothing here touches the network.

use crate::core::error::ScanError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::{debug, warn};
use url::{Host, Url};

pub const MAX_URL_LENGTH: usize = 2048;

/// An explicit `scheme://` prefix; a `://` further into the URL does not count.
static SCHEME_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://").unwrap());

/// A validated, absolute scan target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub url: Url,
    pub host: String,
}

impl Target {
    pub fn is_https(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// `scheme://host[:port]` with no path, used to build probe URLs.
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.origin(), path)
    }
}

/// Validates and normalizes a raw target. `https://` is assumed when no scheme is given.
pub fn validate_target(raw: &str) -> Result<Target, ScanError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ScanError::MissingUrl);
    }
    if trimmed.len() > MAX_URL_LENGTH {
        return Err(ScanError::UrlTooLong { length: trimmed.len(), max: MAX_URL_LENGTH });
    }

    let with_scheme = if SCHEME_PREFIX.is_match(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&with_scheme).map_err(|e| ScanError::InvalidUrl(format!("{trimmed}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ScanError::InvalidUrl(format!("unsupported scheme '{}'", url.scheme())));
    }

    let host = match url.host() {
        Some(host) => checked_host(host)?,
        None => return Err(ScanError::InvalidUrl(format!("{trimmed}: missing host"))),
    };

    debug!(url = %url, host = %host, "Target validated.");
    Ok(Target { url, host })
}

/// Normalized host name, or `BlockedTarget` for reserved names and literal addresses.
fn checked_host(host: Host<&str>) -> Result<String, ScanError> {
    match host {
        Host::Domain(domain) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            if is_blocked_hostname(&domain) {
                return Err(ScanError::BlockedTarget(domain));
            }
            Ok(domain)
        }
        Host::Ipv4(ip) if is_blocked_ip(IpAddr::V4(ip)) => Err(ScanError::BlockedTarget(ip.to_string())),
        Host::Ipv4(ip) => Ok(ip.to_string()),
        Host::Ipv6(ip) if is_blocked_ip(IpAddr::V6(ip)) => Err(ScanError::BlockedTarget(format!("[{ip}]"))),
        Host::Ipv6(ip) => Ok(ip.to_string()),
    }
}

/// Re-checks a redirect destination the way the original target was checked.
pub fn check_redirect_target(url: &Url) -> Result<(), ScanError> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ScanError::InvalidUrl(format!("redirect to unsupported scheme '{}'", url.scheme())));
    }
    let host = url.host().ok_or_else(|| ScanError::InvalidUrl(format!("{url}: missing host")))?;
    checked_host(host).map(|_| ())
}

/// Fails with `BlockedTarget` when any resolved address of `host` is in a blocked range.
///
/// Addresses that do not parse are ignored; they come from the resolver as text.
pub fn check_resolved_addresses<'a>(
    host: &str,
    addresses: impl IntoIterator<Item = &'a String>,
) -> Result<(), ScanError> {
    let blocked = addresses
        .into_iter()
        .filter_map(|a| a.parse::<IpAddr>().ok())
        .find(|ip| is_blocked_ip(*ip));
    match blocked {
        Some(ip) => {
            warn!(host, address = %ip, "Target resolves to a blocked address.");
            Err(ScanError::BlockedTarget(format!("{host} ({ip})")))
        }
        None => Ok(()),
    }
}

fn is_blocked_hostname(domain: &str) -> bool {
    domain == "localhost" || domain.ends_with(".localhost")
}

/// Loopback, private, link-local and unspecified ranges.
pub fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_ipv4(v4),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_blocked_ipv4(mapped);
            }
            is_blocked_ipv6(v6)
        }
    }
}

fn is_blocked_ipv4(ip: Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.octets()[0] == 0
}

fn is_blocked_ipv6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepends_https_when_scheme_missing() {
        let target = validate_target("example.com/path?q=1").unwrap();
        assert_eq!(target.url.as_str(), "https://example.com/path?q=1");
        assert_eq!(target.host, "example.com");
        assert!(target.is_https());
        assert_eq!(target.join("/robots.txt"), "https://example.com/robots.txt");
    }

    #[test]
    fn keeps_explicit_http() {
        let target = validate_target("http://Example.COM").unwrap();
        assert!(!target.is_https());
        assert_eq!(target.host, "example.com");
    }

    #[test]
    fn rejects_missing_and_oversized_urls() {
        assert_eq!(validate_target("   "), Err(ScanError::MissingUrl));
        let long = format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH));
        assert!(matches!(validate_target(&long), Err(ScanError::UrlTooLong { .. })));
    }

    #[test]
    fn rejects_private_and_loopback_targets() {
        for raw in [
            "localhost",
            "http://localhost:8080",
            "127.0.0.1",
            "10.1.2.3",
            "172.16.0.1",
            "172.31.255.255",
            "192.168.1.1",
            "0.0.0.0",
            "169.254.169.254",
            "http://[::1]/",
            "http://[fe80::1]/",
            "http://[fd00::1]/",
        ] {
            assert!(
                matches!(validate_target(raw), Err(ScanError::BlockedTarget(_))),
                "{raw} should be blocked"
            );
        }
    }

    #[test]
    fn allows_public_ranges_next_to_private_ones() {
        assert!(validate_target("172.32.0.1").is_ok());
        assert!(validate_target("172.15.0.1").is_ok());
        assert!(validate_target("8.8.8.8").is_ok());
    }

    #[test]
    fn scheme_inside_the_query_is_not_a_scheme() {
        let target = validate_target("example.com/?r=http://x").unwrap();
        assert!(target.is_https());
        assert_eq!(target.host, "example.com");
        assert_eq!(target.url.query(), Some("r=http://x"));
    }

    #[test]
    fn resolved_private_addresses_are_blocked() {
        let loopback = vec!["93.184.216.34".to_string(), "127.0.0.1".to_string()];
        assert!(matches!(
            check_resolved_addresses("localtest.me", &loopback),
            Err(ScanError::BlockedTarget(_))
        ));
        let metadata = vec!["169.254.169.254".to_string()];
        assert!(check_resolved_addresses("metadata.example", &metadata).is_err());
        let mapped = vec!["::ffff:10.0.0.5".to_string()];
        assert!(check_resolved_addresses("mapped.example", &mapped).is_err());
        let public = vec!["93.184.216.34".to_string(), "2606:2800:220:1::".to_string()];
        assert!(check_resolved_addresses("example.com", &public).is_ok());
    }

    #[test]
    fn redirects_to_internal_hosts_are_blocked() {
        for raw in ["http://169.254.169.254/latest/meta-data", "http://localhost/", "https://[::1]/", "file:///etc/passwd"] {
            assert!(check_redirect_target(&Url::parse(raw).unwrap()).is_err(), "{raw}");
        }
        assert!(check_redirect_target(&Url::parse("https://www.example.com/home").unwrap()).is_ok());
    }

    #[test]
    fn rejects_unsupported_schemes() {
        assert!(matches!(validate_target("ftp://example.com"), Err(ScanError::InvalidUrl(_))));
    }
}
