// src/core/checks/mod.rs

//! Turns the sub-results of a scan into the ordered, plan-gated check list.

mod content;
mod email;
mod headers;
mod network;

use crate::core::config::DnsHardeningPolicy;
use crate::core::knowledge_base::{get_check_definition, CheckDefinition};
use crate::core::models::{
    Check, CheckCategory, CheckStatus, DnsResult, EmailSecurityResult, Entitlements, Evidence, FindingType,
    FingerprintResult, HeadersResult, PlanGate, ProbeResults, RobotsInfo, Severity, SslResult,
};
use crate::core::validation::Target;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Read-only view of everything the scan collected.
pub struct CheckInputs<'a> {
    pub target: &'a Target,
    pub dns: &'a DnsResult,
    pub ssl: Option<&'a SslResult>,
    pub headers: &'a HeadersResult,
    /// Headers sent with the main fetch, for evidence.
    pub request_headers: &'a BTreeMap<String, String>,
    pub email: Option<&'a EmailSecurityResult>,
    pub fingerprint: Option<&'a FingerprintResult>,
    pub probes: &'a ProbeResults,
    pub robots: Option<&'a RobotsInfo>,
    pub dns_policy: DnsHardeningPolicy,
    pub evidence_preview_len: usize,
}

/// Builds one check from its catalog entry. Evidence is dropped at build time
/// unless the finding type and final status allow it.
pub struct CheckBuilder {
    id: &'static str,
    definition: Option<&'static CheckDefinition>,
    finding_type: Option<FindingType>,
    severity: Option<Severity>,
    details: Option<serde_json::Value>,
    evidence: Option<Evidence>,
}

impl CheckBuilder {
    pub fn new(id: &'static str) -> Self {
        let definition = get_check_definition(id);
        if definition.is_none() {
            warn!(id, "Check id missing from catalog.");
        }
        Self { id, definition, finding_type: None, severity: None, details: None, evidence: None }
    }

    pub fn finding_type(mut self, finding_type: FindingType) -> Self {
        self.finding_type = Some(finding_type);
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn evidence(mut self, evidence: Option<Evidence>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn passed(self, message: impl Into<String>) -> Check {
        self.build(CheckStatus::Passed, message.into())
    }

    pub fn warning(self, message: impl Into<String>) -> Check {
        self.build(CheckStatus::Warning, message.into())
    }

    pub fn failed(self, message: impl Into<String>) -> Check {
        self.build(CheckStatus::Failed, message.into())
    }

    pub fn info(self, message: impl Into<String>) -> Check {
        self.build(CheckStatus::Info, message.into())
    }

    pub fn error(self, message: impl Into<String>) -> Check {
        self.build(CheckStatus::Error, message.into())
    }

    fn build(self, status: CheckStatus, message: String) -> Check {
        let finding_type = self
            .finding_type
            .or(self.definition.map(|d| d.finding_type))
            .unwrap_or(FindingType::Informational);
        let base_severity = self.definition.map(|d| d.severity).unwrap_or(Severity::Info);
        let severity = self.severity.unwrap_or(match status {
            CheckStatus::Failed => base_severity,
            CheckStatus::Warning => step_down(base_severity),
            CheckStatus::Passed | CheckStatus::Info | CheckStatus::Error => Severity::Info,
        });
        let evidence = self.evidence.filter(|_| Check::accepts_evidence(finding_type, status));

        Check {
            id: self.id.to_string(),
            name: self.definition.map(|d| d.name).unwrap_or(self.id).to_string(),
            category: self.definition.map(|d| d.category).unwrap_or(CheckCategory::Content),
            status,
            message,
            details: self.details,
            severity,
            finding_type,
            plan_gate: self.definition.map(|d| d.gate).unwrap_or(PlanGate::Free),
            evidence,
        }
    }
}

/// A warning is one severity level below the check's failure severity.
fn step_down(severity: Severity) -> Severity {
    match severity {
        Severity::Critical => Severity::High,
        Severity::High => Severity::Medium,
        Severity::Medium | Severity::Low => Severity::Low,
        Severity::Info => Severity::Info,
    }
}

/// Accumulates checks, silently skipping those above the caller's plan.
pub struct CheckList {
    entitlements: Entitlements,
    checks: Vec<Check>,
}

impl CheckList {
    pub fn new(entitlements: Entitlements) -> Self {
        Self { entitlements, checks: Vec::new() }
    }

    /// Runs `build` only when the check's gate is met; `None` means no check applies.
    pub fn emit<F>(&mut self, id: &'static str, build: F)
    where
        F: FnOnce(CheckBuilder) -> Option<Check>,
    {
        let gate = get_check_definition(id).map(|d| d.gate).unwrap_or(PlanGate::Free);
        if !self.entitlements.allows(gate) {
            return;
        }
        if let Some(check) = build(CheckBuilder::new(id)) {
            debug!(id, status = %check.status, "Check emitted.");
            self.checks.push(check);
        }
    }

    /// Free checks first, then pro, then business; order within a tier is kept.
    pub fn into_checks(mut self) -> Vec<Check> {
        self.checks.sort_by_key(|c| c.plan_gate);
        self.checks
    }
}

/// Builds the ordered check list for the caller's entitlements.
pub fn build_checks(inputs: &CheckInputs<'_>, entitlements: Entitlements) -> Vec<Check> {
    let mut list = CheckList::new(entitlements);
    network::connectivity_checks(inputs, &mut list);
    network::tls_checks(inputs, &mut list);
    headers::header_checks(inputs, &mut list);
    network::dns_checks(inputs, &mut list);
    email::email_checks(inputs, &mut list);
    content::detection_checks(inputs, &mut list);
    content::probe_checks(inputs, &mut list);
    list.into_checks()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::core::models::HeaderData;
    use crate::core::scanner::headers_scanner::parse_security_headers;
    use std::sync::OnceLock;

    pub fn target(raw: &str) -> Target {
        crate::core::validation::validate_target(raw).expect("valid fixture target")
    }

    pub fn resolved_dns(host: &str) -> DnsResult {
        DnsResult {
            hostname: host.to_string(),
            resolved: true,
            ipv4: vec!["93.184.216.34".to_string()],
            ..Default::default()
        }
    }

    pub fn page(headers: &[(&str, &str)]) -> HeadersResult {
        let headers: BTreeMap<String, String> =
            headers.iter().map(|(k, v)| (k.to_ascii_lowercase(), v.to_string())).collect();
        let security_headers: BTreeMap<String, HeaderData> = parse_security_headers(&headers);
        HeadersResult {
            status: Some(200),
            final_url: Some("https://example.com/".to_string()),
            headers,
            security_headers,
            attempts: 1,
            body: "<html><body>Hello</body></html>".to_string(),
            ..Default::default()
        }
    }

    pub fn good_tls(days: i64) -> SslResult {
        SslResult {
            valid: true,
            handshake_completed: true,
            chain_verified: true,
            issuer: Some("Let's Encrypt".to_string()),
            subject: Some("example.com".to_string()),
            days_until_expiry: Some(days),
            protocol: Some("TLSv1.3".to_string()),
            cipher: Some("TLS13_AES_128_GCM_SHA256".to_string()),
            ..Default::default()
        }
    }

    pub fn empty_probes() -> &'static ProbeResults {
        static EMPTY: OnceLock<ProbeResults> = OnceLock::new();
        EMPTY.get_or_init(ProbeResults::default)
    }

    pub fn no_request_headers() -> &'static BTreeMap<String, String> {
        static EMPTY: OnceLock<BTreeMap<String, String>> = OnceLock::new();
        EMPTY.get_or_init(BTreeMap::new)
    }

    pub fn inputs<'a>(
        target: &'a Target,
        dns: &'a DnsResult,
        ssl: Option<&'a SslResult>,
        headers: &'a HeadersResult,
    ) -> CheckInputs<'a> {
        CheckInputs {
            target,
            dns,
            ssl,
            headers,
            request_headers: no_request_headers(),
            email: None,
            fingerprint: None,
            probes: empty_probes(),
            robots: None,
            dns_policy: DnsHardeningPolicy::Informational,
            evidence_preview_len: 400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::core::models::PlanTier;
    use crate::core::sanitizer::{capture_evidence, CapturedExchange};

    fn sample_evidence() -> Evidence {
        capture_evidence(
            CapturedExchange {
                method: "GET",
                url: "https://example.com/",
                request_headers: BTreeMap::new(),
                status: 200,
                response_headers: BTreeMap::new(),
                body: "<html></html>",
            },
            "proof",
            None,
            400,
        )
    }

    #[test]
    fn evidence_is_dropped_for_passing_and_informational_checks() {
        let passed = CheckBuilder::new("xss-reflection").evidence(Some(sample_evidence())).passed("ok");
        assert!(passed.evidence.is_none());
        let info = CheckBuilder::new("cdn-detection").evidence(Some(sample_evidence())).failed("x");
        assert!(info.evidence.is_none());
        let kept = CheckBuilder::new("xss-reflection").evidence(Some(sample_evidence())).failed("reflected");
        assert!(kept.evidence.is_some());
    }

    #[test]
    fn severity_follows_status() {
        assert_eq!(CheckBuilder::new("ssl-valid").failed("x").severity, Severity::Critical);
        assert_eq!(CheckBuilder::new("ssl-valid").warning("x").severity, Severity::High);
        assert_eq!(CheckBuilder::new("ssl-valid").passed("x").severity, Severity::Info);
        assert_eq!(CheckBuilder::new("ssl-valid").severity(Severity::Low).failed("x").severity, Severity::Low);
    }

    #[test]
    fn list_skips_gated_checks_and_orders_by_tier() {
        let mut list = CheckList::new(Entitlements::resolve(PlanTier::Pro, false));
        list.emit("header-csp", |b| Some(b.info("pro")));
        list.emit("xss-reflection", |_| panic!("business check must not be built on pro"));
        list.emit("header-hsts", |b| Some(b.passed("free")));
        let ids: Vec<_> = list.into_checks().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["header-hsts".to_string(), "header-csp".to_string()]);
    }

    #[test]
    fn full_list_has_unique_ids_on_business() {
        let target = target("https://example.com");
        let dns = resolved_dns("example.com");
        let tls = good_tls(120);
        let page = page(&[("Server", "nginx")]);
        let inputs = inputs(&target, &dns, Some(&tls), &page);

        let checks = build_checks(&inputs, Entitlements::resolve(PlanTier::Business, false));

        let mut ids: Vec<_> = checks.iter().map(|c| c.id.clone()).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert!(checks.iter().all(|c| c.evidence.is_none() || Check::accepts_evidence(c.finding_type, c.status)));
    }
}
