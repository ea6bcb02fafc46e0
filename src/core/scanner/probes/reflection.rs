// src/core/scanner/probes/reflection.rs

//! Reflected-input probe: sends a harmless random marker and reports where it lands.

use crate::core::models::{ProbeVerdict, ReflectionContext, ReflectionOutcome};
use crate::core::scanner::http_fetcher::HttpFetcher;
use crate::core::scanner::probes::{evidence_from, snippet_around};
use crate::core::validation::Target;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Method;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const REFLECTION_PARAMETER: &str = "q";

/// A script block up to its closing tag, or to the end of a body cut off inside it.
static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>(?:.*?</script\s*>|.*\z)").unwrap());
/// Opening tags with their attribute list.
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[a-zA-Z][a-zA-Z0-9-]*\s[^>]*>").unwrap());
static EVENT_HANDLER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)\son[a-z]+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).unwrap());
/// Attribute values that start with a `javascript:` URL.
static JAVASCRIPT_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)=\s*("\s*javascript:[^"]*"|'\s*javascript:[^']*'|javascript:[^\s>]*)"#).unwrap());

/// A fresh alphanumeric marker; it cannot change server state or break markup.
pub fn new_marker() -> String {
    format!("bsx{}", Uuid::new_v4().simple())
}

/// Decides context and verdict for one response. Earlier rules win.
pub fn classify_reflection(status: u16, body: &str, marker: &str) -> (ReflectionContext, ProbeVerdict) {
    if (300..400).contains(&status) {
        return (ReflectionContext::Redirect, ProbeVerdict::Safe);
    }
    if !body.contains(marker) {
        return (ReflectionContext::None, ProbeVerdict::Safe);
    }

    let in_script = SCRIPT_BLOCK.find_iter(body).any(|m| m.as_str().contains(marker));
    let in_handler = EVENT_HANDLER.find_iter(body).any(|m| m.as_str().contains(marker));
    let in_js_url = JAVASCRIPT_URL.find_iter(body).any(|m| m.as_str().contains(marker));
    if in_script || in_handler || in_js_url {
        return (ReflectionContext::Script, ProbeVerdict::Vulnerable);
    }

    if TAG.find_iter(body).any(|m| m.as_str().contains(marker)) {
        return (ReflectionContext::Attribute, ProbeVerdict::Informational);
    }
    (ReflectionContext::Body, ProbeVerdict::Safe)
}

/// GETs the target with the marker in `?q=` and classifies the reflection.
pub async fn probe_reflection(fetcher: &HttpFetcher, target: &Target) -> ReflectionOutcome {
    let marker = new_marker();
    let mut url = target.url.clone();
    url.query_pairs_mut().append_pair(REFLECTION_PARAMETER, &marker);
    let tested_url = url.to_string();
    info!(url = %tested_url, "Starting reflection probe.");

    let timeout = fetcher.config().probe_timeout;
    let response = match fetcher.probe(Method::GET, &tested_url, timeout, &[]).await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "Reflection probe failed.");
            return ReflectionOutcome {
                tested_url,
                parameter: REFLECTION_PARAMETER.to_string(),
                status: None,
                reflected: false,
                vulnerable: false,
                context: ReflectionContext::None,
                verdict: ProbeVerdict::Safe,
                evidence: None,
                error: Some(e),
            };
        }
    };

    let (context, verdict) = classify_reflection(response.status, &response.body, &marker);
    let vulnerable = verdict == ProbeVerdict::Vulnerable;
    debug!(status = response.status, %context, %verdict, "Reflection classified.");

    let evidence = (context == ReflectionContext::Script).then(|| {
        let snippet = snippet_around(&response.body, &marker, 200);
        evidence_from(
            fetcher,
            "GET",
            &response,
            &snippet,
            format!("The value of '{REFLECTION_PARAMETER}' is echoed unencoded into an executable script context."),
            vec![
                format!("Open {tested_url}"),
                format!("Search the response for the marker {marker}"),
                "Observe that it is placed inside a script block, event handler or javascript: URL".to_string(),
            ],
        )
    });

    ReflectionOutcome {
        tested_url,
        parameter: REFLECTION_PARAMETER.to_string(),
        status: Some(response.status),
        reflected: response.body.contains(&marker)
            || response.header("location").is_some_and(|l| l.contains(&marker)),
        vulnerable,
        context,
        verdict,
        evidence,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ScanConfig;
    use crate::core::test_support::{response, serve};

    const M: &str = "bsx0123456789abcdef";

    #[test]
    fn redirect_is_never_vulnerable() {
        let (ctx, verdict) = classify_reflection(302, &format!("<script>var q='{M}'</script>"), M);
        assert_eq!(ctx, ReflectionContext::Redirect);
        assert_eq!(verdict, ProbeVerdict::Safe);
    }

    #[test]
    fn script_contexts_are_vulnerable() {
        for body in [
            format!("<html><script>var q = \"{M}\";</script></html>"),
            format!("<a href=\"#\" onclick=\"search('{M}')\">x</a>"),
            format!("<a href=\"javascript:go('{M}')\">x</a>"),
        ] {
            assert_eq!(classify_reflection(200, &body, M), (ReflectionContext::Script, ProbeVerdict::Vulnerable), "{body}");
        }
    }

    #[test]
    fn unclosed_script_block_is_still_script_context() {
        assert_eq!(
            classify_reflection(200, "<html><script>var s='bsxM';", "bsxM"),
            (ReflectionContext::Script, ProbeVerdict::Vulnerable)
        );
        let truncated = format!("<script src=\"/a.js\"></script><p>hi</p><script>var q = '{M}'; {}", "x".repeat(64));
        assert_eq!(classify_reflection(200, &truncated, M), (ReflectionContext::Script, ProbeVerdict::Vulnerable));
        // A closed block before the marker does not swallow the body text after it.
        let after = format!("<script>init();</script><p>{M}</p>");
        assert_eq!(classify_reflection(200, &after, M), (ReflectionContext::Body, ProbeVerdict::Safe));
    }

    #[test]
    fn attribute_context_is_informational() {
        let body = format!("<input type=\"text\" value=\"{M}\">");
        assert_eq!(classify_reflection(200, &body, M), (ReflectionContext::Attribute, ProbeVerdict::Informational));
    }

    #[test]
    fn body_text_and_absence_are_safe() {
        assert_eq!(
            classify_reflection(200, &format!("<p>You searched for {M}</p>"), M),
            (ReflectionContext::Body, ProbeVerdict::Safe)
        );
        assert_eq!(classify_reflection(200, "<p>nothing</p>", M), (ReflectionContext::None, ProbeVerdict::Safe));
    }

    #[test]
    fn markers_are_unique() {
        assert_ne!(new_marker(), new_marker());
        assert!(new_marker().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn script_reflection_carries_evidence() {
        let base = serve(|_, path| {
            let q = path.split("q=").nth(1).unwrap_or_default();
            response(200, &[("Content-Type", "text/html")], &format!("<script>var term = '{q}';</script>"))
        })
        .await;
        let fetcher = HttpFetcher::new(&ScanConfig::default(), None).unwrap();
        // Loopback targets are refused by validation, so the target is built directly.
        let target = Target { url: url::Url::parse(&format!("{base}/search")).unwrap(), host: "127.0.0.1".to_string() };

        let outcome = probe_reflection(&fetcher, &target).await;

        assert!(outcome.vulnerable);
        assert_eq!(outcome.context, ReflectionContext::Script);
        let evidence = outcome.evidence.expect("evidence for script context");
        assert_eq!(evidence.request.method, "GET");
        assert!(evidence.response.body_preview.contains("bsx"));
    }

    #[tokio::test]
    async fn evidence_from_authenticated_scan_hides_credentials() {
        let base = serve(|_, path| {
            let q = path.split("q=").nth(1).unwrap_or_default();
            response(200, &[], &format!("<script>var term = '{q}';</script>"))
        })
        .await;
        let auth = crate::core::models::AuthOverride {
            headers: std::collections::BTreeMap::from([("Authorization".to_string(), "Bearer TOPSECRET".to_string())]),
            cookie_header: Some("session=hunter2".to_string()),
            ..Default::default()
        };
        let fetcher = HttpFetcher::new(&ScanConfig::default(), Some(&auth)).unwrap();
        let target = Target { url: url::Url::parse(&format!("{base}/search")).unwrap(), host: "127.0.0.1".to_string() };

        let outcome = probe_reflection(&fetcher, &target).await;

        let evidence = outcome.evidence.expect("evidence for script context");
        let json = serde_json::to_string(&evidence).unwrap();
        assert!(!json.contains("TOPSECRET"), "{json}");
        assert!(!json.contains("hunter2"), "{json}");
        assert_eq!(evidence.request.headers["authorization"], crate::core::sanitizer::REDACTED);
    }
}
