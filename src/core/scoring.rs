// src/core/scoring.rs

//! Weighted scoring, grading and summary counts over the final check list.

use crate::core::knowledge_base::{get_check_definition, weight_for};
use crate::core::models::{
    Check, CheckStatus, DnsResult, FindingType, FingerprintResult, Grade, HeadersResult, SslResult, Summary,
    Vulnerability,
};
use std::collections::HashSet;
use tracing::debug;

const BASE_SCORE: i32 = 50;

/// Posture signals that earn a bonus on top of the weighted checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BonusSignals {
    pub ssl_valid_30_days: bool,
    pub tls13: bool,
    pub cdn: bool,
    pub csp: bool,
    pub hsts: bool,
}

impl BonusSignals {
    pub fn collect(
        ssl: Option<&SslResult>,
        headers: &HeadersResult,
        dns: &DnsResult,
        fingerprint: Option<&FingerprintResult>,
    ) -> Self {
        Self {
            ssl_valid_30_days: ssl.is_some_and(|s| s.valid && s.days_until_expiry.is_some_and(|d| d > 30)),
            tls13: ssl.is_some_and(|s| s.protocol.as_deref() == Some("TLSv1.3")),
            cdn: dns.cdn.is_some() || fingerprint.is_some_and(|f| f.cdn.is_some()),
            csp: headers.has_security_header("content-security-policy"),
            hsts: headers.has_security_header("strict-transport-security"),
        }
    }

    fn total(&self) -> i32 {
        [(self.ssl_valid_30_days, 5), (self.tls13, 5), (self.cdn, 3), (self.csp, 5), (self.hsts, 3)]
            .into_iter()
            .filter_map(|(on, points)| on.then_some(points))
            .sum()
    }
}

/// Keeps the first check for each id.
pub fn dedupe_checks(checks: Vec<Check>) -> Vec<Check> {
    let mut seen = HashSet::new();
    checks.into_iter().filter(|c| seen.insert(c.id.clone())).collect()
}

/// Score in `0..=100` from the weighted checks plus bonuses.
pub fn calculate_score(checks: &[Check], bonuses: BonusSignals) -> u8 {
    let weighted: i32 = checks
        .iter()
        .filter(|c| c.is_scored())
        .map(|c| {
            let weight = weight_for(&c.id);
            match c.status {
                CheckStatus::Passed => weight.passed,
                CheckStatus::Warning => weight.warning,
                CheckStatus::Failed => weight.failed,
                CheckStatus::Info | CheckStatus::Error => 0,
            }
        })
        .sum();
    let raw = BASE_SCORE + weighted + bonuses.total();
    debug!(weighted, bonus = bonuses.total(), raw, "Score computed.");
    raw.clamp(0, 100) as u8
}

pub fn grade_for(score: u8) -> Grade {
    match score {
        90.. => Grade::APlus,
        80..=89 => Grade::A,
        70..=79 => Grade::B,
        60..=69 => Grade::C,
        45..=59 => Grade::D,
        _ => Grade::F,
    }
}

pub fn summarize(checks: &[Check]) -> Summary {
    checks.iter().fold(Summary { total: checks.len(), ..Default::default() }, |mut s, c| {
        match c.status {
            CheckStatus::Passed | CheckStatus::Info => s.passed += 1,
            CheckStatus::Warning => s.warnings += 1,
            CheckStatus::Failed => s.failed += 1,
            CheckStatus::Error => s.errors += 1,
        }
        s
    })
}

/// Failed or warning vulnerability checks, with remediation from the catalog.
pub fn vulnerabilities_from(checks: &[Check]) -> Vec<Vulnerability> {
    checks
        .iter()
        .filter(|c| c.finding_type == FindingType::Vulnerability)
        .filter(|c| matches!(c.status, CheckStatus::Failed | CheckStatus::Warning))
        .map(|c| Vulnerability {
            id: c.id.clone(),
            title: c.name.clone(),
            severity: c.severity,
            description: c.message.clone(),
            remediation: get_check_definition(&c.id)
                .map(|d| d.remediation.to_string())
                .unwrap_or_else(|| "Review the finding and apply the vendor's guidance.".to_string()),
            evidence: c.evidence.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::checks::CheckBuilder;
    use crate::core::models::{HeaderData, Severity};

    #[test]
    fn grade_boundaries() {
        assert_eq!(grade_for(100), Grade::APlus);
        assert_eq!(grade_for(90), Grade::APlus);
        assert_eq!(grade_for(89), Grade::A);
        assert_eq!(grade_for(70), Grade::B);
        assert_eq!(grade_for(60), Grade::C);
        assert_eq!(grade_for(45), Grade::D);
        assert_eq!(grade_for(44), Grade::F);
        assert_eq!(grade_for(0), Grade::F);
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let checks = vec![
            CheckBuilder::new("header-hsts").passed("first"),
            CheckBuilder::new("header-csp").info("csp"),
            CheckBuilder::new("header-hsts").failed("second"),
        ];
        let deduped = dedupe_checks(checks);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].message, "first");
    }

    #[test]
    fn info_error_and_informational_checks_do_not_move_the_score() {
        let baseline = calculate_score(&[], BonusSignals::default());
        assert_eq!(baseline, 50);
        let neutral = vec![
            CheckBuilder::new("header-csp").info("absent"),
            CheckBuilder::new("compression").error("timeout"),
            CheckBuilder::new("cdn-detection").passed("Cloudflare"),
        ];
        assert_eq!(calculate_score(&neutral, BonusSignals::default()), baseline);
    }

    #[test]
    fn weights_and_bonuses_apply() {
        let checks = vec![
            CheckBuilder::new("header-hsts").passed("ok"),
            CheckBuilder::new("sql-errors").failed("mysql"),
        ];
        let hsts = crate::core::knowledge_base::weight_for("header-hsts").passed;
        assert_eq!(calculate_score(&checks, BonusSignals::default()) as i32, 50 + hsts - 15);

        let bonuses = BonusSignals { ssl_valid_30_days: true, tls13: true, cdn: true, csp: true, hsts: true };
        assert_eq!(calculate_score(&[], bonuses), 71);
    }

    #[test]
    fn score_is_clamped() {
        let failures: Vec<Check> = (0..20).map(|_| CheckBuilder::new("https-missing").failed("x")).collect();
        assert_eq!(calculate_score(&failures, BonusSignals::default()), 0);
        let passes: Vec<Check> = (0..40).map(|_| CheckBuilder::new("header-hsts").passed("x")).collect();
        assert_eq!(calculate_score(&passes, BonusSignals::default()), 100);
    }

    #[test]
    fn summary_counts_info_as_passed() {
        let checks = vec![
            CheckBuilder::new("header-hsts").passed("ok"),
            CheckBuilder::new("header-csp").info("absent"),
            CheckBuilder::new("cache-control").warning("none"),
            CheckBuilder::new("ssl-valid").failed("bad"),
            CheckBuilder::new("compression").error("timeout"),
        ];
        let summary = summarize(&checks);
        assert_eq!(summary, Summary { total: 5, passed: 2, warnings: 1, failed: 1, errors: 1 });
    }

    #[test]
    fn vulnerabilities_carry_catalog_remediation() {
        let checks = vec![
            CheckBuilder::new("sql-errors").failed("mysql error"),
            CheckBuilder::new("header-hsts").failed("missing"),
            CheckBuilder::new("directory-listing").passed("none"),
        ];
        let vulns = vulnerabilities_from(&checks);
        assert_eq!(vulns.len(), 1);
        assert_eq!(vulns[0].id, "sql-errors");
        assert_eq!(vulns[0].severity, Severity::Critical);
        assert!(vulns[0].remediation.contains("parameterized"));
    }

    #[test]
    fn bonus_signals_read_raw_results() {
        let mut headers = HeadersResult::default();
        headers.security_headers.insert(
            "content-security-policy".to_string(),
            HeaderData { present: true, value: Some("default-src 'self'".to_string()) },
        );
        let ssl = SslResult {
            valid: true,
            days_until_expiry: Some(31),
            protocol: Some("TLSv1.3".to_string()),
            ..Default::default()
        };
        let signals = BonusSignals::collect(Some(&ssl), &headers, &DnsResult::default(), None);
        assert_eq!(signals, BonusSignals { ssl_valid_30_days: true, tls13: true, cdn: false, csp: true, hsts: false });
    }
}
