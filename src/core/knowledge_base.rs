// src/core/knowledge_base.rs

//! The static catalog of every check the scanner can emit.
//! Each entry fixes the check's display name, category, minimum plan, finding
//! type, score weight and remediation text, so the aggregator and the UI never
//! hard-code any of them.

use crate::core::models::{CheckCategory, FindingType, PlanGate, Severity};

/// Signed score contribution of a check per status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Weight {
    pub passed: i32,
    pub warning: i32,
    pub failed: i32,
}

/// Used for any check without its own weight.
pub const DEFAULT_WEIGHT: Weight = Weight { passed: 3, warning: -2, failed: -5 };

/// Everything static about a check.
pub struct CheckDefinition {
    /// Stable identifier (e.g., "header-hsts").
    pub id: &'static str,
    /// A short, human-readable title for the check.
    pub name: &'static str,
    /// The category this check belongs to.
    pub category: CheckCategory,
    /// The lowest plan that receives this check.
    pub gate: PlanGate,
    pub finding_type: FindingType,
    /// Severity reported when the check fails.
    pub severity: Severity,
    /// `None` falls back to [`DEFAULT_WEIGHT`].
    pub weight: Option<Weight>,
    /// Clear, actionable steps the user can take to fix the issue.
    pub remediation: &'static str,
}

const fn w(passed: i32, warning: i32, failed: i32) -> Option<Weight> {
    Some(Weight { passed, warning, failed })
}

/// The centralized, static catalog of all checks, in emission order.
static CATALOG: &[CheckDefinition] = &[
    // --- Free: connectivity and transport ---
    CheckDefinition {
        id: "dns-resolution",
        name: "DNS Resolution",
        category: CheckCategory::Dns,
        gate: PlanGate::Free,
        finding_type: FindingType::BestPractice,
        severity: Severity::Critical,
        weight: w(2, -2, -10),
        remediation: "Publish A and/or AAAA records for the host so clients can reach it.",
    },
    CheckDefinition {
        id: "site-reachable",
        name: "Site Reachable",
        category: CheckCategory::Connectivity,
        gate: PlanGate::Free,
        finding_type: FindingType::BestPractice,
        severity: Severity::High,
        weight: w(2, -2, -10),
        remediation: "Make sure the web server is running and that firewalls allow inbound HTTP(S) traffic.",
    },
    CheckDefinition {
        id: "https-missing",
        name: "HTTPS Not Available",
        category: CheckCategory::Ssl,
        gate: PlanGate::Free,
        finding_type: FindingType::Vulnerability,
        severity: Severity::Critical,
        weight: w(0, -5, -15),
        remediation: "Serve the site over HTTPS with a certificate from a trusted CA (e.g., Let's Encrypt) and redirect all HTTP traffic to it.",
    },
    CheckDefinition {
        id: "ssl-valid",
        name: "SSL Certificate Validity",
        category: CheckCategory::Ssl,
        gate: PlanGate::Free,
        finding_type: FindingType::Vulnerability,
        severity: Severity::Critical,
        weight: w(5, -5, -15),
        remediation: "Install a certificate issued by a publicly trusted CA that covers this hostname, and serve the full intermediate chain.",
    },
    CheckDefinition {
        id: "ssl-expiry",
        name: "SSL Certificate Expiry",
        category: CheckCategory::Ssl,
        gate: PlanGate::Free,
        finding_type: FindingType::Compliance,
        severity: Severity::High,
        weight: w(2, -3, -10),
        remediation: "Renew the certificate and automate renewal (e.g., with an ACME client) well before the expiry date.",
    },
    CheckDefinition {
        id: "tls-version",
        name: "TLS Protocol Version",
        category: CheckCategory::Ssl,
        gate: PlanGate::Free,
        finding_type: FindingType::Compliance,
        severity: Severity::High,
        weight: w(3, -3, -8),
        remediation: "Disable TLS 1.0 and 1.1 and prefer TLS 1.3 in the server configuration.",
    },
    // --- Free: essential headers ---
    CheckDefinition {
        id: "header-hsts",
        name: "Strict-Transport-Security",
        category: CheckCategory::Headers,
        gate: PlanGate::Free,
        finding_type: FindingType::Compliance,
        severity: Severity::Medium,
        weight: w(4, -2, -5),
        remediation: "Add 'Strict-Transport-Security: max-age=31536000; includeSubDomains'. Start with a shorter max-age if unsure.",
    },
    CheckDefinition {
        id: "header-x-frame-options",
        name: "X-Frame-Options",
        category: CheckCategory::Headers,
        gate: PlanGate::Free,
        finding_type: FindingType::Vulnerability,
        severity: Severity::Medium,
        weight: w(3, -2, -4),
        remediation: "Add 'X-Frame-Options: DENY' (or 'SAMEORIGIN'), or use the CSP 'frame-ancestors' directive.",
    },
    CheckDefinition {
        id: "header-x-content-type-options",
        name: "X-Content-Type-Options",
        category: CheckCategory::Headers,
        gate: PlanGate::Free,
        finding_type: FindingType::BestPractice,
        severity: Severity::Low,
        weight: w(2, -1, -3),
        remediation: "Add the 'X-Content-Type-Options' header and set its value to 'nosniff'.",
    },
    CheckDefinition {
        id: "server-disclosure",
        name: "Server Version Disclosure",
        category: CheckCategory::Headers,
        gate: PlanGate::Free,
        finding_type: FindingType::BestPractice,
        severity: Severity::Low,
        weight: w(2, -2, -3),
        remediation: "Configure the server and framework to omit version numbers from 'Server' and 'X-Powered-By' (e.g., 'server_tokens off;' in Nginx).",
    },
    // --- Pro: headers, performance, detection ---
    CheckDefinition {
        id: "header-csp",
        name: "Content-Security-Policy",
        category: CheckCategory::Headers,
        gate: PlanGate::Pro,
        finding_type: FindingType::BestPractice,
        severity: Severity::Medium,
        weight: None,
        remediation: "Define a Content-Security-Policy. Start from \"default-src 'self'\" in report-only mode and tighten it.",
    },
    CheckDefinition {
        id: "header-referrer-policy",
        name: "Referrer-Policy",
        category: CheckCategory::Headers,
        gate: PlanGate::Pro,
        finding_type: FindingType::BestPractice,
        severity: Severity::Low,
        weight: w(1, -1, -2),
        remediation: "Add 'Referrer-Policy: strict-origin-when-cross-origin' to avoid leaking full URLs to other sites.",
    },
    CheckDefinition {
        id: "header-permissions-policy",
        name: "Permissions-Policy",
        category: CheckCategory::Headers,
        gate: PlanGate::Pro,
        finding_type: FindingType::BestPractice,
        severity: Severity::Low,
        weight: w(1, -1, -2),
        remediation: "Add a Permissions-Policy that disables unused browser features, e.g. 'camera=(), microphone=(), geolocation=()'.",
    },
    CheckDefinition {
        id: "cookie-security",
        name: "Cookie Security Flags",
        category: CheckCategory::Headers,
        gate: PlanGate::Pro,
        finding_type: FindingType::BestPractice,
        severity: Severity::Medium,
        weight: None,
        remediation: "Set 'Secure', 'HttpOnly' and 'SameSite=Lax' (or 'Strict') on every cookie, session cookies first.",
    },
    CheckDefinition {
        id: "compression",
        name: "Response Compression",
        category: CheckCategory::Performance,
        gate: PlanGate::Pro,
        finding_type: FindingType::Performance,
        severity: Severity::Low,
        weight: w(1, -1, -2),
        remediation: "Enable gzip or Brotli compression for text responses in the web server or CDN.",
    },
    CheckDefinition {
        id: "cache-control",
        name: "Cache-Control",
        category: CheckCategory::Performance,
        gate: PlanGate::Pro,
        finding_type: FindingType::Performance,
        severity: Severity::Low,
        weight: w(1, -1, -2),
        remediation: "Send an explicit Cache-Control header: 'no-store' for private pages, a max-age for static assets.",
    },
    CheckDefinition {
        id: "cdn-detection",
        name: "CDN Detection",
        category: CheckCategory::Technology,
        gate: PlanGate::Pro,
        finding_type: FindingType::Informational,
        severity: Severity::Info,
        weight: None,
        remediation: "A CDN improves latency and absorbs volumetric attacks; consider one for public sites.",
    },
    CheckDefinition {
        id: "waf-detection",
        name: "WAF Detection",
        category: CheckCategory::Technology,
        gate: PlanGate::Pro,
        finding_type: FindingType::Informational,
        severity: Severity::Info,
        weight: None,
        remediation: "A web application firewall filters common attacks; consider enabling one in front of the origin.",
    },
    CheckDefinition {
        id: "tech-detection",
        name: "Technology Stack",
        category: CheckCategory::Technology,
        gate: PlanGate::Pro,
        finding_type: FindingType::Informational,
        severity: Severity::Info,
        weight: None,
        remediation: "Keep every detected component patched and avoid advertising versions publicly.",
    },
    CheckDefinition {
        id: "dns-ipv6",
        name: "IPv6 Support",
        category: CheckCategory::Dns,
        gate: PlanGate::Pro,
        finding_type: FindingType::Informational,
        severity: Severity::Info,
        weight: None,
        remediation: "Publish AAAA records so IPv6-only clients can reach the site.",
    },
    CheckDefinition {
        id: "email-spf",
        name: "SPF Record",
        category: CheckCategory::Email,
        gate: PlanGate::Pro,
        finding_type: FindingType::Compliance,
        severity: Severity::Medium,
        weight: w(3, -2, -4),
        remediation: "Create a TXT record that lists your authorized mail servers, e.g. 'v=spf1 include:_spf.google.com -all'.",
    },
    CheckDefinition {
        id: "email-dmarc",
        name: "DMARC Policy",
        category: CheckCategory::Email,
        gate: PlanGate::Pro,
        finding_type: FindingType::Compliance,
        severity: Severity::High,
        weight: w(3, -2, -5),
        remediation: "Add a TXT record at _dmarc with 'v=DMARC1; p=none;' and move to 'p=quarantine' or 'p=reject' after reviewing reports.",
    },
    CheckDefinition {
        id: "email-dkim",
        name: "DKIM Signing",
        category: CheckCategory::Email,
        gate: PlanGate::Pro,
        finding_type: FindingType::BestPractice,
        severity: Severity::Low,
        weight: w(2, -1, -2),
        remediation: "Enable DKIM signing in your email provider and publish the public key at <selector>._domainkey.",
    },
    CheckDefinition {
        id: "email-bimi",
        name: "BIMI Record",
        category: CheckCategory::Email,
        gate: PlanGate::Pro,
        finding_type: FindingType::Informational,
        severity: Severity::Info,
        weight: None,
        remediation: "Once DMARC is enforced, publish a BIMI record at default._bimi to show your logo in supporting inboxes.",
    },
    CheckDefinition {
        id: "sensitive-files",
        name: "Sensitive File Exposure",
        category: CheckCategory::Vulnerabilities,
        gate: PlanGate::Pro,
        finding_type: FindingType::Vulnerability,
        severity: Severity::Critical,
        weight: w(3, -5, -15),
        remediation: "Remove configuration, backup and VCS files from the web root, and deny access to dotfiles in the server configuration.",
    },
    CheckDefinition {
        id: "public-files",
        name: "Public Metadata Files",
        category: CheckCategory::Content,
        gate: PlanGate::Pro,
        finding_type: FindingType::Informational,
        severity: Severity::Info,
        weight: None,
        remediation: "Publish /.well-known/security.txt so researchers know how to report issues.",
    },
    CheckDefinition {
        id: "robots-txt",
        name: "robots.txt Analysis",
        category: CheckCategory::Content,
        gate: PlanGate::Pro,
        finding_type: FindingType::Informational,
        severity: Severity::Info,
        weight: None,
        remediation: "robots.txt is public; do not rely on it to hide sensitive paths. Protect them with authentication instead.",
    },
    CheckDefinition {
        id: "mixed-content",
        name: "Mixed Content",
        category: CheckCategory::Content,
        gate: PlanGate::Pro,
        finding_type: FindingType::Vulnerability,
        severity: Severity::Medium,
        weight: w(2, -3, -5),
        remediation: "Load every script, stylesheet, frame and image over HTTPS, or add 'upgrade-insecure-requests' to the CSP.",
    },
    // --- Business: active probes and supply chain ---
    CheckDefinition {
        id: "xss-reflection",
        name: "Reflected Input (XSS)",
        category: CheckCategory::Vulnerabilities,
        gate: PlanGate::Business,
        finding_type: FindingType::Vulnerability,
        severity: Severity::High,
        weight: w(3, -3, -15),
        remediation: "Encode user input for the context it is written into and avoid placing it in script blocks or event handlers. A strict CSP limits the impact.",
    },
    CheckDefinition {
        id: "sql-errors",
        name: "SQL Error Disclosure",
        category: CheckCategory::Vulnerabilities,
        gate: PlanGate::Business,
        finding_type: FindingType::Vulnerability,
        severity: Severity::Critical,
        weight: w(3, -5, -15),
        remediation: "Use parameterized queries everywhere and show generic error pages instead of database messages.",
    },
    CheckDefinition {
        id: "directory-listing",
        name: "Directory Listing",
        category: CheckCategory::Vulnerabilities,
        gate: PlanGate::Business,
        finding_type: FindingType::Vulnerability,
        severity: Severity::Medium,
        weight: w(2, -3, -8),
        remediation: "Disable automatic indexes ('autoindex off;' in Nginx, 'Options -Indexes' in Apache).",
    },
    CheckDefinition {
        id: "third-party-scripts",
        name: "Third-Party Scripts",
        category: CheckCategory::Content,
        gate: PlanGate::Business,
        finding_type: FindingType::BestPractice,
        severity: Severity::Medium,
        weight: w(2, -2, -4),
        remediation: "Self-host critical scripts or pin them with Subresource Integrity ('integrity' attribute) and a CSP allow-list.",
    },
    CheckDefinition {
        id: "vulnerable-libraries",
        name: "Vulnerable JavaScript Libraries",
        category: CheckCategory::Vulnerabilities,
        gate: PlanGate::Business,
        finding_type: FindingType::Vulnerability,
        severity: Severity::High,
        weight: w(3, -4, -10),
        remediation: "Upgrade each listed library to at least the fixed version, and remove end-of-life frameworks.",
    },
    CheckDefinition {
        id: "dns-caa",
        name: "CAA Records",
        category: CheckCategory::Dns,
        gate: PlanGate::Business,
        finding_type: FindingType::Informational,
        severity: Severity::Low,
        weight: w(2, -2, -2),
        remediation: "Add CAA records naming the CAs allowed to issue for the domain, e.g. '0 issue \"letsencrypt.org\"'.",
    },
    CheckDefinition {
        id: "dns-dnssec",
        name: "DNSSEC",
        category: CheckCategory::Dns,
        gate: PlanGate::Business,
        finding_type: FindingType::Informational,
        severity: Severity::Low,
        weight: w(2, -2, -2),
        remediation: "Enable DNSSEC signing at your DNS provider and publish the DS record at the registrar.",
    },
];

/// Retrieves the static definition of a check.
///
/// # Arguments
///
/// * `id` - The check identifier.
///
/// # Returns
///
/// An `Option` containing a reference to the `CheckDefinition` if the id is known.
pub fn get_check_definition(id: &str) -> Option<&'static CheckDefinition> {
    CATALOG.iter().find(|c| c.id == id)
}

/// Weight of a check; unknown ids and entries without weight get [`DEFAULT_WEIGHT`].
pub fn weight_for(id: &str) -> Weight {
    get_check_definition(id).and_then(|c| c.weight).unwrap_or(DEFAULT_WEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique() {
        let ids: HashSet<_> = CATALOG.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), CATALOG.len());
    }

    #[test]
    fn gates_match_plan_tiers() {
        let gate = |id| get_check_definition(id).map(|c| c.gate);
        assert_eq!(gate("header-hsts"), Some(PlanGate::Free));
        assert_eq!(gate("header-csp"), Some(PlanGate::Pro));
        assert_eq!(gate("sensitive-files"), Some(PlanGate::Pro));
        assert_eq!(gate("xss-reflection"), Some(PlanGate::Business));
        assert_eq!(gate("dns-dnssec"), Some(PlanGate::Business));
        assert_eq!(CATALOG.iter().filter(|c| c.gate == PlanGate::Free).count(), 10);
        assert_eq!(CATALOG.iter().filter(|c| c.gate == PlanGate::Pro).count(), 18);
        assert_eq!(CATALOG.iter().filter(|c| c.gate == PlanGate::Business).count(), 7);
    }

    #[test]
    fn missing_weights_fall_back_to_default() {
        assert_eq!(weight_for("header-csp"), DEFAULT_WEIGHT);
        assert_eq!(weight_for("no-such-check"), DEFAULT_WEIGHT);
        assert_eq!(weight_for("ssl-valid").failed, -15);
    }

    #[test]
    fn informational_detections_have_no_vulnerability_type() {
        for id in ["cdn-detection", "waf-detection", "tech-detection", "dns-ipv6", "public-files", "robots-txt"] {
            assert_eq!(get_check_definition(id).map(|c| c.finding_type), Some(FindingType::Informational), "{id}");
        }
    }
}
