// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString};

// --- Reusable Result Types ---

/// Outcome of a best-effort lookup: a value, nothing found, or the error text.
pub type Lookup<T> = Result<Option<T>, String>;

// --- Plans & Entitlements ---

/// Subscription level of the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PlanTier {
    #[default]
    Free,
    Pro,
    Business,
    Enterprise,
}

/// Minimum plan a check requires before it is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlanGate {
    Free,
    Pro,
    Business,
}

/// Feature flags derived from the plan and the admin override.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlements {
    pub is_pro: bool,
    pub is_business: bool,
}

impl Entitlements {
    pub fn resolve(plan: PlanTier, is_admin: bool) -> Self {
        Self {
            is_pro: is_admin || matches!(plan, PlanTier::Pro | PlanTier::Business | PlanTier::Enterprise),
            is_business: is_admin || matches!(plan, PlanTier::Business | PlanTier::Enterprise),
        }
    }

    pub fn allows(&self, gate: PlanGate) -> bool {
        match gate {
            PlanGate::Free => true,
            PlanGate::Pro => self.is_pro,
            PlanGate::Business => self.is_business,
        }
    }
}

// --- Request ---

/// Extra credentials the caller wants sent along with every probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthOverride {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub cookie_header: Option<String>,
    pub profile_name: Option<String>,
    pub profile_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub url: String,
    #[serde(default)]
    pub plan: PlanTier,
    #[serde(default)]
    pub is_admin_override: bool,
    pub auth: Option<AuthOverride>,
}

impl ScanRequest {
    pub fn new(url: impl Into<String>, plan: PlanTier) -> Self {
        Self { url: url.into(), plan, ..Default::default() }
    }

    pub fn entitlements(&self) -> Entitlements {
        Entitlements::resolve(self.plan, self.is_admin_override)
    }
}

// --- Checks ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Warning,
    Failed,
    Info,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FindingType {
    Vulnerability,
    BestPractice,
    Compliance,
    Informational,
    Performance,
}

/// High-level grouping used when rendering checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum CheckCategory {
    #[strum(serialize = "Connectivity")]
    Connectivity,
    #[strum(serialize = "SSL/TLS")]
    Ssl,
    #[strum(serialize = "DNS")]
    Dns,
    #[strum(serialize = "Security Headers")]
    Headers,
    #[strum(serialize = "Email Security")]
    Email,
    #[strum(serialize = "Vulnerabilities")]
    Vulnerabilities,
    #[strum(serialize = "Content")]
    Content,
    #[strum(serialize = "Technology")]
    Technology,
    #[strum(serialize = "Performance")]
    Performance,
}

/// A single named assessment emitted by the aggregator.
///
/// Built through [`crate::core::checks::CheckBuilder`]; evidence is only ever
/// kept when [`Check::accepts_evidence`] holds at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    pub id: String,
    pub name: String,
    pub category: CheckCategory,
    pub status: CheckStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub severity: Severity,
    pub finding_type: FindingType,
    pub plan_gate: PlanGate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,
}

impl Check {
    /// Only exploitable or compliance findings that did not pass may carry evidence.
    pub fn accepts_evidence(finding_type: FindingType, status: CheckStatus) -> bool {
        matches!(finding_type, FindingType::Vulnerability | FindingType::Compliance)
            && !matches!(status, CheckStatus::Passed | CheckStatus::Info)
    }

    /// Whether this check moves the score at all.
    pub fn is_scored(&self) -> bool {
        !matches!(self.status, CheckStatus::Info | CheckStatus::Error)
            && self.finding_type != FindingType::Informational
    }
}

// --- Evidence ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceRequest {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body_preview: String,
}

/// Captured request/response supporting a finding. Constructed only through
/// [`crate::core::sanitizer::capture_evidence`] so the body is always sanitized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub(crate) request: EvidenceRequest,
    pub(crate) response: EvidenceResponse,
    pub(crate) proof_of_impact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) reproduction_steps: Option<Vec<String>>,
    pub(crate) timestamp: DateTime<Utc>,
}

impl Evidence {
    pub fn request(&self) -> &EvidenceRequest {
        &self.request
    }

    pub fn response(&self) -> &EvidenceResponse {
        &self.response
    }

    pub fn proof_of_impact(&self) -> &str {
        &self.proof_of_impact
    }

    pub fn reproduction_steps(&self) -> Option<&[String]> {
        self.reproduction_steps.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

// --- DNS ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsResult {
    pub hostname: String,
    pub resolved: bool,
    pub ipv4: Vec<String>,
    pub ipv6: Vec<String>,
    pub ns: Vec<String>,
    pub mx: Vec<MxRecord>,
    pub txt: Vec<String>,
    pub caa: Vec<String>,
    pub has_dnssec: bool,
    pub cdn: Option<String>,
    /// Per record type lookup failures, kept for diagnostics only.
    pub errors: BTreeMap<String, String>,
}

// --- SSL/TLS ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SslResult {
    pub valid: bool,
    pub handshake_completed: bool,
    pub chain_verified: bool,
    pub verification_error: Option<String>,
    pub issuer: Option<String>,
    pub subject: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub days_until_expiry: Option<i64>,
    pub protocol: Option<String>,
    pub cipher: Option<String>,
    pub self_signed: bool,
    pub alt_names: Vec<String>,
    /// The server refused TLS 1.2 and 1.3 with a `protocol_version` alert.
    #[serde(default)]
    pub legacy_protocol_only: bool,
    pub error: Option<String>,
}

impl SslResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self { error: Some(error.into()), ..Default::default() }
    }
}

// --- HTTP Headers ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderData {
    pub present: bool,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadersResult {
    pub status: Option<u16>,
    pub final_url: Option<String>,
    pub redirect_chain: Vec<String>,
    /// Raw response headers, lowercase keys. Repeated headers are joined with "\n".
    pub headers: BTreeMap<String, String>,
    pub security_headers: BTreeMap<String, HeaderData>,
    pub technology_hints: Vec<String>,
    pub response_time_ms: u64,
    pub attempts: u32,
    pub truncated: bool,
    pub error: Option<String>,
    #[serde(skip)]
    pub body: String,
}

impl HeadersResult {
    /// An all-empty header table means the origin could not be reached.
    pub fn is_reachable(&self) -> bool {
        !self.headers.is_empty()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn has_security_header(&self, name: &str) -> bool {
        self.security_headers.get(name).is_some_and(|h| h.present)
    }
}

// --- Fingerprint ---

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Technology {
    pub name: String,
    pub category: String,
    pub version: Option<String>,
    /// 0-100; a recovered version raises it.
    pub confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThirdPartyScript {
    pub src: String,
    pub host: String,
    pub high_risk: bool,
    pub has_integrity: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VulnerableLibrary {
    pub name: String,
    pub version: String,
    pub fixed_in: String,
    pub advisory: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub server: Option<String>,
    pub powered_by: Option<String>,
    pub ip_addresses: Vec<String>,
    pub cdn: Option<String>,
    pub waf: Option<String>,
    pub technologies: Vec<Technology>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintResult {
    pub cdn: Option<String>,
    pub waf: Option<String>,
    pub technologies: Vec<Technology>,
    pub third_party_scripts: Vec<ThirdPartyScript>,
    pub vulnerable_libraries: Vec<VulnerableLibrary>,
    pub mixed_content: Vec<String>,
}

// --- Probes ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProbeVerdict {
    Safe,
    Informational,
    Vulnerable,
}

/// Where a reflected marker landed in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReflectionContext {
    Redirect,
    Script,
    Attribute,
    Body,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionOutcome {
    pub tested_url: String,
    pub parameter: String,
    pub status: Option<u16>,
    pub reflected: bool,
    pub vulnerable: bool,
    pub context: ReflectionContext,
    pub verdict: ProbeVerdict,
    pub evidence: Option<Evidence>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlErrorOutcome {
    pub tested_url: String,
    pub parameter: String,
    pub status: Option<u16>,
    pub vulnerable: bool,
    pub engine: Option<String>,
    pub signature: Option<String>,
    pub evidence: Option<Evidence>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListingOutcome {
    pub found: bool,
    pub paths: Vec<String>,
    pub evidence: Option<Evidence>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitiveFilesOutcome {
    pub found: bool,
    pub files: Vec<String>,
    pub checked: usize,
    pub soft_404: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicFilesOutcome {
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotsInfo {
    pub found: bool,
    pub disallowed_paths: Vec<String>,
    pub sitemaps: Vec<String>,
    pub sensitive_paths: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionInfo {
    pub encoding: Option<String>,
    pub error: Option<String>,
}

/// Everything the plan-gated probe layer produced. `None` means the probe did not run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResults {
    pub reflection: Option<ReflectionOutcome>,
    pub sql_errors: Option<SqlErrorOutcome>,
    pub directory_listing: Option<DirectoryListingOutcome>,
    pub sensitive_files: Option<SensitiveFilesOutcome>,
    pub public_files: Option<PublicFilesOutcome>,
    pub compression: Option<CompressionInfo>,
}

// --- Email ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpfData {
    pub record: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmarcData {
    pub record: String,
    pub policy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DkimRecord {
    pub selector: String,
    pub record: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSecurityResult {
    pub domain: String,
    pub mx: Lookup<Vec<MxRecord>>,
    pub spf: Lookup<SpfData>,
    pub dmarc: Lookup<DmarcData>,
    pub dkim: Lookup<Vec<DkimRecord>>,
    pub bimi: Lookup<String>,
}

impl Default for EmailSecurityResult {
    fn default() -> Self {
        Self {
            domain: String::new(),
            mx: Ok(None),
            spf: Ok(None),
            dmarc: Ok(None),
            dkim: Ok(None),
            bimi: Ok(None),
        }
    }
}

// --- Main Report ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
pub enum Grade {
    #[serde(rename = "A+")]
    #[strum(serialize = "A+")]
    APlus,
    A,
    B,
    C,
    D,
    F,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    /// Includes checks with `info` status.
    pub passed: usize,
    pub warnings: usize,
    pub failed: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vulnerability {
    pub id: String,
    pub title: String,
    pub severity: Severity,
    pub description: String,
    pub remediation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,
}

/// The aggregate root returned for every successful scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub plan: PlanTier,
    pub score: u8,
    pub grade: Grade,
    pub checks: Vec<Check>,
    pub summary: Summary,
    pub dns: DnsResult,
    pub ssl: Option<SslResult>,
    pub headers: HeadersResult,
    pub server_info: ServerInfo,
    pub robots: Option<RobotsInfo>,
    pub email_security: Option<EmailSecurityResult>,
    pub fingerprint: Option<FingerprintResult>,
    pub probes: ProbeResults,
    pub vulnerabilities: Vec<Vulnerability>,
    pub duration_ms: u64,
}

impl ScanResult {
    pub fn check(&self, id: &str) -> Option<&Check> {
        self.checks.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn entitlements_follow_plan_and_admin() {
        assert_eq!(Entitlements::resolve(PlanTier::Free, false), Entitlements { is_pro: false, is_business: false });
        assert_eq!(Entitlements::resolve(PlanTier::Pro, false), Entitlements { is_pro: true, is_business: false });
        assert_eq!(Entitlements::resolve(PlanTier::Enterprise, false), Entitlements { is_pro: true, is_business: true });
        assert_eq!(Entitlements::resolve(PlanTier::Free, true), Entitlements { is_pro: true, is_business: true });
    }

    #[test]
    fn plan_tier_parses_case_insensitively() {
        assert_eq!(PlanTier::from_str("Business").ok(), Some(PlanTier::Business));
        assert!(PlanTier::from_str("platinum").is_err());
        assert_eq!(PlanTier::Enterprise.to_string(), "enterprise");
    }

    #[test]
    fn evidence_predicate_rejects_informational_and_passing() {
        assert!(Check::accepts_evidence(FindingType::Vulnerability, CheckStatus::Failed));
        assert!(Check::accepts_evidence(FindingType::Compliance, CheckStatus::Warning));
        assert!(!Check::accepts_evidence(FindingType::Vulnerability, CheckStatus::Passed));
        assert!(!Check::accepts_evidence(FindingType::Vulnerability, CheckStatus::Info));
        assert!(!Check::accepts_evidence(FindingType::Informational, CheckStatus::Failed));
        assert!(!Check::accepts_evidence(FindingType::BestPractice, CheckStatus::Warning));
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let request: ScanRequest = serde_json::from_str(r#"{"url":"example.com"}"#).unwrap();
        assert_eq!(request.plan, PlanTier::Free);
        assert!(!request.is_admin_override);
        assert!(request.auth.is_none());
    }

    #[test]
    fn grade_serializes_with_plus_sign() {
        assert_eq!(serde_json::to_string(&Grade::APlus).unwrap(), "\"A+\"");
        assert_eq!(Grade::APlus.to_string(), "A+");
    }
}
