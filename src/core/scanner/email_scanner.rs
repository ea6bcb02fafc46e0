// src/core/scanner/email_scanner.rs

use tracing::{debug, info, warn};

use crate::core::models::{DkimRecord, DmarcData, EmailSecurityResult, Lookup, MxRecord, SpfData};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::TokioAsyncResolver;

/// A list of common DKIM selectors to check for when a specific one is not known.
const COMMON_DKIM_SELECTORS: &[&str] = &["google", "selector1", "selector2", "default", "dkim"];

/// Resolves the mail-authentication records of a domain.
///
/// Each lookup is independent: one failing only sets its own `Err` slot.
///
/// # Arguments
/// * `resolver` - The resolver shared with the DNS scan.
/// * `host` - The scanned hostname; a leading `www.` is stripped first.
///
/// # Returns
/// An `EmailSecurityResult` with one `Lookup` per record family.
pub async fn run_email_scan(resolver: &TokioAsyncResolver, host: &str) -> EmailSecurityResult {
    // Strip "www." prefix to query the root domain, which is standard for these record types.
    let domain = host.strip_prefix("www.").unwrap_or(host);
    info!(target = %domain, "Starting email security scan.");

    let (mx, spf, dmarc, dkim, bimi) = tokio::join!(
        lookup_mx(resolver, domain),
        lookup_spf(resolver, domain),
        lookup_dmarc(resolver, domain),
        lookup_dkim(resolver, domain),
        lookup_bimi(resolver, domain)
    );

    info!(
        mx = matches!(mx, Ok(Some(_))),
        spf = matches!(spf, Ok(Some(_))),
        dmarc = matches!(dmarc, Ok(Some(_))),
        dkim = matches!(dkim, Ok(Some(_))),
        bimi = matches!(bimi, Ok(Some(_))),
        "Email security scan finished."
    );
    EmailSecurityResult { domain: domain.to_string(), mx, spf, dmarc, dkim, bimi }
}

/// "No records" means the record is absent, anything else is a lookup failure.
fn absent_or_error<T>(target: &str, what: &str, e: ResolveError) -> Lookup<T> {
    if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) {
        debug!(target, what, "No records found.");
        Ok(None)
    } else {
        warn!(target, what, error = %e, "Lookup failed.");
        Err(format!("DNS Error: {e}"))
    }
}

/// All TXT strings at `name`, or the lookup outcome when there are none.
async fn txt_strings(resolver: &TokioAsyncResolver, name: &str, what: &str) -> Lookup<Vec<String>> {
    match resolver.txt_lookup(name).await {
        Ok(records) => Ok(Some(records.iter().map(|r| r.to_string()).collect())),
        Err(e) => absent_or_error(name, what, e),
    }
}

async fn lookup_mx(resolver: &TokioAsyncResolver, target: &str) -> Lookup<Vec<MxRecord>> {
    debug!(target, "Looking up MX records.");
    match resolver.mx_lookup(target).await {
        Ok(records) => {
            let mut mx: Vec<MxRecord> = records
                .iter()
                .map(|r| MxRecord {
                    preference: r.preference(),
                    exchange: r.exchange().to_string().trim_end_matches('.').to_string(),
                })
                .collect();
            mx.sort_by_key(|r| r.preference);
            Ok(Some(mx).filter(|m| !m.is_empty()))
        }
        Err(e) => absent_or_error(target, "MX", e),
    }
}

/// Looks up the SPF (Sender Policy Framework) record for a domain.
/// SPF records are stored in TXT records and start with "v=spf1".
async fn lookup_spf(resolver: &TokioAsyncResolver, target: &str) -> Lookup<SpfData> {
    debug!(target, "Looking up SPF record.");
    let record = txt_strings(resolver, target, "SPF")
        .await?
        .and_then(|txt| txt.into_iter().find(|r| r.trim_start().to_ascii_lowercase().starts_with("v=spf1")));
    debug!(target, found = record.is_some(), "SPF lookup done.");
    Ok(record.map(|record| SpfData { record }))
}

/// Looks up the DMARC record for a domain.
/// DMARC records are stored in a TXT record at the `_dmarc` subdomain.
async fn lookup_dmarc(resolver: &TokioAsyncResolver, target: &str) -> Lookup<DmarcData> {
    let dmarc_target = format!("_dmarc.{target}");
    debug!(target = %dmarc_target, "Looking up DMARC record.");
    let record = txt_strings(resolver, &dmarc_target, "DMARC")
        .await?
        .and_then(|txt| txt.into_iter().find(|r| r.contains("v=DMARC1")));
    Ok(record.map(|record| DmarcData { policy: dmarc_policy(&record), record }))
}

/// The `p=` tag of a DMARC record, lowercased.
pub fn dmarc_policy(record: &str) -> Option<String> {
    record
        .split(';')
        .filter_map(|tag| tag.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("p"))
        .map(|(_, value)| value.trim().to_ascii_lowercase())
}

/// Looks up DKIM records for a domain using a list of common selectors.
/// DKIM records are stored in TXT records at `selector._domainkey.domain`.
async fn lookup_dkim(resolver: &TokioAsyncResolver, target: &str) -> Lookup<Vec<DkimRecord>> {
    debug!(target, "Looking up DKIM records for common selectors.");
    let lookups = COMMON_DKIM_SELECTORS.iter().map(|selector| async move {
        let name = format!("{selector}._domainkey.{target}");
        (*selector, txt_strings(resolver, &name, "DKIM").await)
    });
    let outcomes = futures::future::join_all(lookups).await;

    let mut found_records = Vec::new();
    let mut last_error = None;
    for (selector, outcome) in outcomes {
        match outcome {
            Ok(Some(txt)) => found_records.extend(
                txt.into_iter()
                    .filter(|r| looks_like_dkim(r))
                    .map(|record| DkimRecord { selector: selector.to_string(), record }),
            ),
            Ok(None) => {}
            Err(e) => last_error = Some(e),
        }
    }

    match (found_records.is_empty(), last_error) {
        (false, _) => {
            debug!(count = found_records.len(), "DKIM records found.");
            Ok(Some(found_records))
        }
        // Nothing found and at least one selector errored: the absence is not proven.
        (true, Some(e)) => Err(e),
        (true, _) => Ok(None),
    }
}

fn looks_like_dkim(record: &str) -> bool {
    record.contains("v=DKIM1") || record.trim_start().starts_with("p=") || record.contains("; p=")
}

/// Looks up the BIMI record at `default._bimi`.
async fn lookup_bimi(resolver: &TokioAsyncResolver, target: &str) -> Lookup<String> {
    let bimi_target = format!("default._bimi.{target}");
    debug!(target = %bimi_target, "Looking up BIMI record.");
    Ok(txt_strings(resolver, &bimi_target, "BIMI")
        .await?
        .and_then(|txt| txt.into_iter().find(|r| r.contains("v=BIMI1"))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dmarc_policy_tag() {
        assert_eq!(dmarc_policy("v=DMARC1; p=reject; rua=mailto:d@example.com").as_deref(), Some("reject"));
        assert_eq!(dmarc_policy("v=DMARC1;P=None").as_deref(), Some("none"));
        assert_eq!(dmarc_policy("v=DMARC1; rua=mailto:d@example.com"), None);
    }

    #[test]
    fn policy_tag_is_not_confused_with_pct() {
        assert_eq!(dmarc_policy("v=DMARC1; pct=50; p=quarantine").as_deref(), Some("quarantine"));
    }

    #[test]
    fn dkim_records_are_recognised_with_or_without_version() {
        assert!(looks_like_dkim("v=DKIM1; k=rsa; p=MIGfMA0GCSqGSIb3"));
        assert!(looks_like_dkim("p=MIGfMA0GCSqGSIb3"));
        assert!(!looks_like_dkim("google-site-verification=abc"));
    }
}
