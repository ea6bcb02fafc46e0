// src/core/checks/network.rs

use super::{CheckBuilder, CheckInputs, CheckList};
use crate::core::config::DnsHardeningPolicy;
use crate::core::models::{Check, FindingType, SslResult};
use serde_json::json;

/// Days before expiry at which the certificate check starts warning.
const EXPIRY_WARNING_DAYS: i64 = 30;

pub(super) fn connectivity_checks(inputs: &CheckInputs<'_>, list: &mut CheckList) {
    let dns = inputs.dns;
    list.emit("dns-resolution", |b| {
        let details = json!({ "resolved": dns.resolved, "ipv4": dns.ipv4, "ipv6": dns.ipv6 });
        let b = b.details(details);
        Some(match (dns.ipv4.is_empty(), dns.ipv6.is_empty()) {
            _ if !dns.resolved => b.failed(format!("{} did not resolve to any address", dns.hostname)),
            (true, false) => b.passed(format!(
                "Resolved to IPv6-only address(es): {} (no A records)",
                dns.ipv6.join(", ")
            )),
            (false, true) => b.passed(format!("Resolved to IPv4 address(es): {}", dns.ipv4.join(", "))),
            _ => b.passed(format!(
                "Resolved to {} IPv4 and {} IPv6 address(es)",
                dns.ipv4.len(),
                dns.ipv6.len()
            )),
        })
    });

    let page = inputs.headers;
    list.emit("site-reachable", |b| {
        let b = b.details(json!({
            "status": page.status,
            "finalUrl": page.final_url,
            "redirects": page.redirect_chain.len(),
            "responseTimeMs": page.response_time_ms,
            "attempts": page.attempts,
        }));
        Some(match (page.is_reachable(), page.status) {
            (false, _) => b.failed(format!(
                "Site did not respond: {}",
                page.error.as_deref().unwrap_or("no response")
            )),
            (true, Some(status)) if status >= 500 => {
                b.warning(format!("Site responded with server error HTTP {status}"))
            }
            (true, status) => b.passed(format!(
                "Site responded with HTTP {} in {} ms",
                status.unwrap_or_default(),
                page.response_time_ms
            )),
        })
    });

    if https_unavailable(inputs) {
        list.emit("https-missing", |b| {
            Some(b.failed(format!("{} is served over plain HTTP and no TLS endpoint answered on port 443", inputs.target.host)))
        });
    }
}

/// The target was given as `http://` and no TLS endpoint answered at all.
fn https_unavailable(inputs: &CheckInputs<'_>) -> bool {
    !inputs.target.is_https()
        && inputs.ssl.is_some_and(|ssl| !ssl.handshake_completed && !ssl.legacy_protocol_only)
}

pub(super) fn tls_checks(inputs: &CheckInputs<'_>, list: &mut CheckList) {
    let Some(ssl) = inputs.ssl else { return };
    if https_unavailable(inputs) {
        return;
    }

    if let Some(error) = ssl.error.as_deref().filter(|_| !ssl.handshake_completed) {
        list.emit("ssl-valid", |b| Some(b.failed(format!("TLS connection failed: {error}"))));
        list.emit("ssl-expiry", |b| Some(b.error("Certificate could not be retrieved")));
        list.emit("tls-version", |b| {
            Some(match ssl.legacy_protocol_only {
                true => b.failed("Server only offers TLS versions older than 1.2"),
                false => b.error("No TLS session was negotiated"),
            })
        });
        return;
    }

    list.emit("ssl-valid", |b| Some(certificate_validity(ssl, b)));

    list.emit("ssl-expiry", |b| {
        let days = ssl.days_until_expiry?;
        let b = b.details(json!({ "daysUntilExpiry": days, "validTo": ssl.valid_to }));
        Some(if days < 0 {
            b.failed(format!("Certificate expired {} days ago", -days))
        } else if days <= EXPIRY_WARNING_DAYS {
            b.warning(format!("Certificate expires in {days} days"))
        } else {
            b.passed(format!("Certificate expires in {days} days"))
        })
    });

    list.emit("tls-version", |b| {
        let b = b.details(json!({ "protocol": ssl.protocol, "cipher": ssl.cipher }));
        Some(match ssl.protocol.as_deref() {
            Some("TLSv1.3") => b.passed("TLS 1.3 negotiated"),
            Some("TLSv1.2") => b.passed("TLS 1.2 negotiated; TLS 1.3 is preferred"),
            other => b.warning(format!(
                "Negotiated protocol version is not recognised: {}",
                other.unwrap_or("unknown")
            )),
        })
    });
}

fn certificate_validity(ssl: &SslResult, b: CheckBuilder) -> Check {
    let b = b.details(json!({
        "issuer": ssl.issuer,
        "subject": ssl.subject,
        "validFrom": ssl.valid_from,
        "validTo": ssl.valid_to,
        "selfSigned": ssl.self_signed,
        "altNames": ssl.alt_names,
        "chainVerified": ssl.chain_verified,
    }));
    if ssl.valid {
        return b.passed(format!(
            "Certificate is trusted and valid (issued by {})",
            ssl.issuer.as_deref().unwrap_or("unknown issuer")
        ));
    }
    if ssl.days_until_expiry.is_some_and(|d| d < 0) {
        return b.failed("Certificate has expired");
    }
    if ssl.self_signed {
        return b.failed("Certificate is self-signed and not trusted by browsers");
    }
    b.failed(format!(
        "Certificate is not trusted: {}",
        ssl.verification_error.as_deref().unwrap_or("chain verification failed")
    ))
}

pub(super) fn dns_checks(inputs: &CheckInputs<'_>, list: &mut CheckList) {
    let dns = inputs.dns;
    if !dns.resolved {
        return;
    }

    list.emit("dns-ipv6", |b| {
        let b = b.details(json!({ "ipv6": dns.ipv6 }));
        Some(if dns.ipv6.is_empty() {
            b.info("No AAAA records; the site is not reachable over IPv6")
        } else {
            b.passed(format!("IPv6 supported ({} AAAA record(s))", dns.ipv6.len()))
        })
    });

    let scored = inputs.dns_policy == DnsHardeningPolicy::Scored;
    let hardening_type = if scored { FindingType::Compliance } else { FindingType::Informational };

    list.emit("dns-caa", |b| {
        let b = b.finding_type(hardening_type).details(json!({ "caa": dns.caa }));
        Some(match (dns.caa.is_empty(), scored) {
            (false, _) => b.passed(format!("{} CAA record(s) restrict certificate issuance", dns.caa.len())),
            (true, true) => b.warning("No CAA records; any CA may issue certificates for this domain"),
            (true, false) => b.info("No CAA records; any CA may issue certificates for this domain"),
        })
    });

    list.emit("dns-dnssec", |b| {
        let b = b.finding_type(hardening_type).details(json!({ "hasDnssec": dns.has_dnssec }));
        Some(match (dns.has_dnssec, scored) {
            (true, _) => b.passed("DNSKEY records found; the zone appears to be signed"),
            (false, true) => b.warning("DNSSEC does not appear to be enabled"),
            (false, false) => b.info("DNSSEC does not appear to be enabled"),
        })
    });
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::build_checks;
    use crate::core::models::{CheckStatus, Entitlements, PlanTier, Severity, SslResult};

    #[test]
    fn http_only_target_reports_https_missing_and_no_tls_checks() {
        let target = target("http://example.com");
        let dns = resolved_dns("example.com");
        let tls = SslResult::failed("TCP Connection Error: connection refused");
        let page = page(&[]);
        let inputs = inputs(&target, &dns, Some(&tls), &page);

        let checks = build_checks(&inputs, Entitlements::resolve(PlanTier::Free, false));

        let https = checks.iter().find(|c| c.id == "https-missing").expect("https-missing emitted");
        assert_eq!(https.status, CheckStatus::Failed);
        assert_eq!(https.severity, Severity::Critical);
        for id in ["ssl-valid", "ssl-expiry", "tls-version"] {
            assert!(checks.iter().all(|c| c.id != id), "{id} should be absent");
        }
    }

    #[test]
    fn certificate_expiring_soon_warns_with_day_count() {
        let target = target("https://example.com");
        let dns = resolved_dns("example.com");
        let tls = good_tls(10);
        let page = page(&[]);
        let inputs = inputs(&target, &dns, Some(&tls), &page);

        let checks = build_checks(&inputs, Entitlements::resolve(PlanTier::Free, false));

        let valid = checks.iter().find(|c| c.id == "ssl-valid").unwrap();
        assert_eq!(valid.status, CheckStatus::Passed);
        let expiry = checks.iter().find(|c| c.id == "ssl-expiry").unwrap();
        assert_eq!(expiry.status, CheckStatus::Warning);
        assert!(expiry.message.contains("10 days"), "{}", expiry.message);
        assert!(checks.iter().all(|c| c.id != "https-missing"));
    }

    #[test]
    fn ipv6_only_resolution_is_reported_as_such() {
        let target = target("https://v6.example.com");
        let mut dns = resolved_dns("v6.example.com");
        dns.ipv4.clear();
        dns.ipv6 = vec!["2001:db8::10".to_string()];
        let page = page(&[]);
        let inputs = inputs(&target, &dns, None, &page);

        let checks = build_checks(&inputs, Entitlements::resolve(PlanTier::Free, false));

        let resolution = checks.iter().find(|c| c.id == "dns-resolution").unwrap();
        assert_eq!(resolution.status, CheckStatus::Passed);
        assert_eq!(resolution.details.as_ref().unwrap()["resolved"], true);
        assert!(resolution.message.contains("IPv6-only"), "{}", resolution.message);
    }

    #[test]
    fn dns_hardening_policy_controls_scoring() {
        let target = target("https://example.com");
        let dns = resolved_dns("example.com");
        let page = page(&[]);
        let mut inputs = inputs(&target, &dns, None, &page);
        let business = Entitlements::resolve(PlanTier::Business, false);

        let relaxed = build_checks(&inputs, business);
        let caa = relaxed.iter().find(|c| c.id == "dns-caa").unwrap();
        assert_eq!(caa.status, CheckStatus::Info);
        assert!(!caa.is_scored());

        inputs.dns_policy = crate::core::config::DnsHardeningPolicy::Scored;
        let strict = build_checks(&inputs, business);
        let caa = strict.iter().find(|c| c.id == "dns-caa").unwrap();
        assert_eq!(caa.status, CheckStatus::Warning);
        assert!(caa.is_scored());
    }

    #[test]
    fn tls_handshake_failure_on_https_target() {
        let target = target("https://example.com");
        let dns = resolved_dns("example.com");
        let tls = SslResult::failed("TLS Handshake Error: unexpected EOF");
        let page = page(&[]);
        let inputs = inputs(&target, &dns, Some(&tls), &page);

        let checks = build_checks(&inputs, Entitlements::resolve(PlanTier::Free, false));

        let valid = checks.iter().find(|c| c.id == "ssl-valid").unwrap();
        assert_eq!(valid.status, CheckStatus::Failed);
        assert_eq!(checks.iter().find(|c| c.id == "tls-version").unwrap().status, CheckStatus::Error);
    }

    #[test]
    fn legacy_only_server_fails_tls_version_even_over_http() {
        let target = target("http://old.example.com");
        let dns = resolved_dns("old.example.com");
        let tls = SslResult {
            legacy_protocol_only: true,
            ..SslResult::failed("TLS Handshake Error: received fatal alert: ProtocolVersion")
        };
        let page = page(&[]);
        let inputs = inputs(&target, &dns, Some(&tls), &page);

        let checks = build_checks(&inputs, Entitlements::resolve(PlanTier::Free, false));

        assert!(checks.iter().all(|c| c.id != "https-missing"));
        let version = checks.iter().find(|c| c.id == "tls-version").unwrap();
        assert_eq!(version.status, CheckStatus::Failed);
        assert!(version.message.contains("older than 1.2"), "{}", version.message);
    }
}
