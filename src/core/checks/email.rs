// src/core/checks/email.rs

use super::{CheckInputs, CheckList};
use serde_json::json;

pub(super) fn email_checks(inputs: &CheckInputs<'_>, list: &mut CheckList) {
    let Some(email) = inputs.email else { return };

    list.emit("email-spf", |b| {
        Some(match &email.spf {
            Err(e) => b.error(format!("SPF lookup failed: {e}")),
            Ok(None) => b.failed(format!("No SPF record published for {}", email.domain)),
            Ok(Some(spf)) => {
                let b = b.details(json!({ "record": spf.record }));
                match spf_qualifier(&spf.record) {
                    Some('-') => b.passed("SPF record ends with a hard fail (-all)"),
                    Some('~') => b.passed("SPF record ends with a soft fail (~all)"),
                    Some('+') => b.warning("SPF record allows any sender (+all)"),
                    Some(_) => b.warning("SPF record ends with a neutral qualifier (?all)"),
                    None => b.warning("SPF record has no 'all' mechanism"),
                }
            }
        })
    });

    list.emit("email-dmarc", |b| {
        Some(match &email.dmarc {
            Err(e) => b.error(format!("DMARC lookup failed: {e}")),
            Ok(None) => b.failed(format!("No DMARC record published at _dmarc.{}", email.domain)),
            Ok(Some(dmarc)) => {
                let b = b.details(json!({ "record": dmarc.record, "policy": dmarc.policy }));
                match dmarc.policy.as_deref() {
                    Some(policy @ ("reject" | "quarantine")) => b.passed(format!("DMARC policy is enforced (p={policy})")),
                    Some("none") => b.warning("DMARC policy is monitor-only (p=none)"),
                    Some(other) => b.warning(format!("DMARC policy is not recognised (p={other})")),
                    None => b.warning("DMARC record has no policy tag"),
                }
            }
        })
    });

    list.emit("email-dkim", |b| {
        Some(match &email.dkim {
            Err(e) => b.error(format!("DKIM lookup failed: {e}")),
            Ok(Some(records)) if !records.is_empty() => {
                let selectors: Vec<&str> = records.iter().map(|r| r.selector.as_str()).collect();
                b.details(json!({ "selectors": selectors }))
                    .passed(format!("DKIM key found for selector(s): {}", selectors.join(", ")))
            }
            Ok(_) => b.warning("No DKIM key found for the common selectors"),
        })
    });

    list.emit("email-bimi", |b| {
        Some(match &email.bimi {
            Err(e) => b.error(format!("BIMI lookup failed: {e}")),
            Ok(Some(record)) => b.details(json!({ "record": record })).passed("BIMI record published"),
            Ok(None) => b.info("No BIMI record published"),
        })
    });
}

/// Qualifier of the trailing `all` mechanism; a bare `all` means `+`.
fn spf_qualifier(record: &str) -> Option<char> {
    record.split_whitespace().rev().find_map(|term| {
        let lower = term.to_ascii_lowercase();
        match lower.as_str() {
            "all" => Some('+'),
            _ if lower.len() == 4 && lower.ends_with("all") => lower.chars().next().filter(|c| "+-~?".contains(*c)),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::build_checks;
    use super::*;
    use crate::core::models::{
        CheckStatus, DkimRecord, DmarcData, EmailSecurityResult, Entitlements, PlanTier, SpfData,
    };

    #[test]
    fn spf_qualifiers() {
        assert_eq!(spf_qualifier("v=spf1 include:_spf.google.com -all"), Some('-'));
        assert_eq!(spf_qualifier("v=spf1 mx ~ALL"), Some('~'));
        assert_eq!(spf_qualifier("v=spf1 all"), Some('+'));
        assert_eq!(spf_qualifier("v=spf1 mx"), None);
    }

    #[test]
    fn email_checks_follow_each_lookup() {
        let target = target("https://example.com");
        let dns = resolved_dns("example.com");
        let page = page(&[("Server", "nginx")]);
        let email = EmailSecurityResult {
            domain: "example.com".to_string(),
            spf: Ok(Some(SpfData { record: "v=spf1 mx ?all".to_string() })),
            dmarc: Ok(Some(DmarcData { record: "v=DMARC1; p=reject".to_string(), policy: Some("reject".to_string()) })),
            dkim: Ok(Some(vec![DkimRecord { selector: "google".to_string(), record: "v=DKIM1; k=rsa; p=MIGf".to_string() }])),
            bimi: Err("DNS Error: timed out".to_string()),
            ..Default::default()
        };
        let mut inputs = inputs(&target, &dns, None, &page);
        inputs.email = Some(&email);

        let checks = build_checks(&inputs, Entitlements::resolve(PlanTier::Pro, false));

        let status = |id: &str| checks.iter().find(|c| c.id == id).map(|c| c.status);
        assert_eq!(status("email-spf"), Some(CheckStatus::Warning));
        assert_eq!(status("email-dmarc"), Some(CheckStatus::Passed));
        assert_eq!(status("email-dkim"), Some(CheckStatus::Passed));
        assert_eq!(status("email-bimi"), Some(CheckStatus::Error));
    }

    #[test]
    fn missing_records_fail_and_absent_scan_emits_nothing() {
        let target = target("https://example.com");
        let dns = resolved_dns("example.com");
        let page = page(&[]);
        let email = EmailSecurityResult { domain: "example.com".to_string(), ..Default::default() };
        let mut inputs = inputs(&target, &dns, None, &page);
        let pro = Entitlements::resolve(PlanTier::Pro, false);

        assert!(build_checks(&inputs, pro).iter().all(|c| !c.id.starts_with("email-")));

        inputs.email = Some(&email);
        let checks = build_checks(&inputs, pro);
        let status = |id: &str| checks.iter().find(|c| c.id == id).map(|c| c.status);
        assert_eq!(status("email-spf"), Some(CheckStatus::Failed));
        assert_eq!(status("email-dmarc"), Some(CheckStatus::Failed));
        assert_eq!(status("email-dkim"), Some(CheckStatus::Warning));
        assert_eq!(status("email-bimi"), Some(CheckStatus::Info));
    }
}
