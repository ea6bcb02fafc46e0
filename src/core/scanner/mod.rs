// src/core/scanner/mod.rs

// This file acts as the public interface for the `scanner` module.
// It declares the sub-scanners and sequences them into one scan.
pub mod dns_scanner;
pub mod email_scanner;
pub mod fingerprint_scanner;
pub mod headers_scanner;
pub mod http_fetcher;
pub mod probes;
pub mod ssl_scanner;

use crate::core::checks::{build_checks, CheckInputs};
use crate::core::config::ScanConfig;
use crate::core::error::ScanError;
use crate::core::models::{
    DnsResult, FingerprintResult, HeadersResult, ProbeResults, ScanRequest, ScanResult, ServerInfo,
};
use crate::core::scoring::{calculate_score, dedupe_checks, grade_for, summarize, vulnerabilities_from, BonusSignals};
use crate::core::validation::{check_resolved_addresses, validate_target, Target};
use self::dns_scanner::{build_resolver, run_dns_scan};
use self::email_scanner::run_email_scan;
use self::fingerprint_scanner::run_fingerprint_scan;
use self::http_fetcher::HttpFetcher;
use self::probes::run_probes;
use self::ssl_scanner::run_ssl_scan;
use chrono::Utc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Validates the request and runs the whole scan pipeline.
///
/// The pipeline runs in its own task under the configured scan budget. A
/// panic inside it, budget exhaustion and cancellation through `cancel` are
/// all reported as [`ScanError`]; probe failures never are.
///
/// # Arguments
///
/// * `request` - The target URL, plan and optional auth override.
/// * `config` - Timeouts and limits for this scan.
/// * `cancel` - Cancels the scan when triggered.
///
/// # Returns
///
/// The scored `ScanResult`, or the reason no result could be produced.
pub async fn run_full_scan(
    request: ScanRequest,
    config: &ScanConfig,
    cancel: CancellationToken,
) -> Result<ScanResult, ScanError> {
    let target = validate_target(&request.url)?;
    if cancel.is_cancelled() {
        return Err(ScanError::Cancelled);
    }

    let budget = config.scan_budget;
    let config = config.clone();
    let task = tokio::spawn(async move { scan_target(target, request, config).await });
    let abort = task.abort_handle();

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!("Scan cancelled.");
            abort.abort();
            Err(ScanError::Cancelled)
        }
        joined = tokio::time::timeout(budget, task) => match joined {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                error!(error = %join_error, "Scan pipeline task failed.");
                Err(ScanError::Internal(join_error.to_string()))
            }
            Err(_) => {
                warn!(budget_secs = budget.as_secs(), "Scan budget exhausted.");
                abort.abort();
                Err(ScanError::TimedOut(budget))
            }
        }
    }
}

/// The pipeline proper, for an already validated target.
pub(crate) async fn scan_target(
    target: Target,
    request: ScanRequest,
    config: ScanConfig,
) -> Result<ScanResult, ScanError> {
    let started = Instant::now();
    let entitlements = request.entitlements();
    info!(target = %target.url, plan = %request.plan, "Starting full scan.");

    let resolver = build_resolver(&config);
    let fetcher = HttpFetcher::new(&config, request.auth.as_ref()).map_err(ScanError::Internal)?;

    let dns = run_dns_scan(&resolver, &target.host, &config).await;
    if !config.allow_private_targets {
        check_resolved_addresses(&target.host, dns.ipv4.iter().chain(&dns.ipv6))?;
    }

    let (ssl, headers) = if dns.resolved {
        let (ssl, headers) = tokio::join!(run_ssl_scan(&target.host, &config), fetcher.fetch(target.url.as_str()));
        (Some(ssl), headers)
    } else {
        warn!(target = %target.host, "Host did not resolve, skipping TLS and HTTP.");
        let headers = HeadersResult { error: Some("DNS resolution failed".to_string()), ..Default::default() };
        (None, headers)
    };

    let ((probes, robots), fingerprint, email) = if headers.is_reachable() {
        tokio::join!(
            run_probes(&fetcher, &target, &headers.body, entitlements),
            async { entitlements.is_pro.then(|| run_fingerprint_scan(&headers, &target.host, dns.cdn.as_deref())) },
            async {
                match entitlements.is_pro {
                    true => Some(run_email_scan(&resolver, &target.host).await),
                    false => None,
                }
            },
        )
    } else {
        ((ProbeResults::default(), None), None, None)
    };

    let request_headers = fetcher.request_headers();
    let inputs = CheckInputs {
        target: &target,
        dns: &dns,
        ssl: ssl.as_ref(),
        headers: &headers,
        request_headers: &request_headers,
        email: email.as_ref(),
        fingerprint: fingerprint.as_ref(),
        probes: &probes,
        robots: robots.as_ref(),
        dns_policy: config.dns_hardening,
        evidence_preview_len: config.evidence_preview_len,
    };
    let checks = dedupe_checks(build_checks(&inputs, entitlements));

    let bonuses = BonusSignals::collect(ssl.as_ref(), &headers, &dns, fingerprint.as_ref());
    let score = calculate_score(&checks, bonuses);
    let grade = grade_for(score);
    let summary = summarize(&checks);
    let vulnerabilities = vulnerabilities_from(&checks);
    let server_info = server_info(&dns, &headers, fingerprint.as_ref());
    let duration_ms = started.elapsed().as_millis() as u64;

    info!(target = %target.url, score, grade = %grade, checks = checks.len(), duration_ms, "Full scan finished.");

    Ok(ScanResult {
        url: target.url.to_string(),
        timestamp: Utc::now(),
        plan: request.plan,
        score,
        grade,
        checks,
        summary,
        dns,
        ssl,
        headers,
        server_info,
        robots,
        email_security: email,
        fingerprint,
        probes,
        vulnerabilities,
        duration_ms,
    })
}

fn server_info(dns: &DnsResult, headers: &HeadersResult, fingerprint: Option<&FingerprintResult>) -> ServerInfo {
    ServerInfo {
        server: headers.header("server").map(str::to_string),
        powered_by: headers.header("x-powered-by").map(str::to_string),
        ip_addresses: dns.ipv4.iter().chain(&dns.ipv6).cloned().collect(),
        cdn: fingerprint.and_then(|f| f.cdn.clone()).or_else(|| dns.cdn.clone()),
        waf: fingerprint.and_then(|f| f.waf.clone()),
        technologies: fingerprint.map(|f| f.technologies.clone()).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{CheckStatus, PlanTier};
    use crate::core::test_support::{response, serve};

    #[tokio::test]
    async fn blocked_target_fails_before_any_network_call() {
        let request = ScanRequest::new("http://localhost:8080", PlanTier::Business);
        let err = run_full_scan(request, &ScanConfig::default(), CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ScanError::BlockedTarget(_)));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn host_resolving_to_loopback_is_blocked_before_fetching() {
        let hits = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = hits.clone();
        let base = serve(move |_, _| {
            seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            response(200, &[], "<html>internal</html>")
        })
        .await;
        let target = Target { url: url::Url::parse(&base).unwrap(), host: "127.0.0.1".to_string() };

        let err = scan_target(target, ScanRequest::new(base.clone(), PlanTier::Business), ScanConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::BlockedTarget(_)));
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_token_stops_the_scan() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let request = ScanRequest::new("https://example.com", PlanTier::Free);
        let err = run_full_scan(request, &ScanConfig::default(), cancel).await.unwrap_err();
        assert_eq!(err, ScanError::Cancelled);
    }

    #[tokio::test]
    async fn plain_http_site_on_free_plan() {
        let base = serve(|_, _| response(200, &[("Server", "nginx/1.18.0")], "<html><body>ok</body></html>")).await;
        let target = Target { url: url::Url::parse(&base).unwrap(), host: "127.0.0.1".to_string() };
        let config = ScanConfig {
            tls_timeout: std::time::Duration::from_secs(2),
            allow_private_targets: true,
            ..Default::default()
        };

        let result = scan_target(target, ScanRequest::new(base.clone(), PlanTier::Free), config).await.unwrap();

        assert!(result.dns.resolved);
        assert_eq!(result.check("site-reachable").unwrap().status, CheckStatus::Passed);
        assert_eq!(result.check("server-disclosure").unwrap().status, CheckStatus::Warning);
        assert_eq!(result.check("https-missing").unwrap().status, CheckStatus::Failed);
        assert!(result.check("ssl-valid").is_none());
        assert!(result.check("header-csp").is_none());
        assert!(result.fingerprint.is_none());
        assert!(result.email_security.is_none());
        assert_eq!(result.probes, ProbeResults::default());
        assert_eq!(result.server_info.server.as_deref(), Some("nginx/1.18.0"));
        assert_eq!(result.grade, grade_for(result.score));
        assert_eq!(result.summary.total, result.checks.len());
    }
}
