// src/core/checks/headers.rs

use super::{CheckInputs, CheckList};
use crate::core::models::Evidence;
use crate::core::sanitizer::{capture_evidence, CapturedExchange};
use crate::core::scanner::headers_scanner::{discloses_version, hsts_max_age, set_cookies};
use serde_json::json;

/// HSTS shorter than 180 days is flagged.
const HSTS_MIN_MAX_AGE: u64 = 15_552_000;

pub(super) fn header_checks(inputs: &CheckInputs<'_>, list: &mut CheckList) {
    let page = inputs.headers;
    if !page.is_reachable() {
        return;
    }

    list.emit("header-hsts", |b| {
        let Some(value) = page.header("strict-transport-security") else {
            return Some(b.failed("Strict-Transport-Security header is missing"));
        };
        let max_age = hsts_max_age(value);
        let b = b.details(json!({ "value": value, "maxAge": max_age }));
        Some(match max_age {
            Some(age) if age >= HSTS_MIN_MAX_AGE => b.passed(format!("HSTS enabled with max-age={age}")),
            Some(age) => b.warning(format!("HSTS max-age={age} is shorter than the recommended 180 days")),
            None => b.warning("HSTS header has no valid max-age directive"),
        })
    });

    list.emit("header-x-frame-options", |b| {
        let xfo = page.header("x-frame-options").map(str::trim);
        let frame_ancestors = page
            .header("content-security-policy")
            .is_some_and(|csp| csp.to_ascii_lowercase().contains("frame-ancestors"));
        Some(match xfo {
            Some(value) if value.eq_ignore_ascii_case("deny") || value.eq_ignore_ascii_case("sameorigin") => {
                b.passed(format!("X-Frame-Options is set to {value}"))
            }
            _ if frame_ancestors => b.passed("Framing is restricted by the CSP frame-ancestors directive"),
            Some(value) => b
                .evidence(Some(main_page_evidence(inputs, "The page sends an unrecognised X-Frame-Options value.")))
                .warning(format!("X-Frame-Options has an ineffective value: {value}")),
            None => b
                .evidence(Some(main_page_evidence(inputs, "The page can be embedded in a frame by any origin (clickjacking).")))
                .warning("X-Frame-Options header is missing and no frame-ancestors policy is set"),
        })
    });

    list.emit("header-x-content-type-options", |b| {
        Some(match page.header("x-content-type-options") {
            Some(value) if value.trim().eq_ignore_ascii_case("nosniff") => b.passed("X-Content-Type-Options is set to nosniff"),
            Some(value) => b.warning(format!("X-Content-Type-Options has an unexpected value: {value}")),
            None => b.failed("X-Content-Type-Options header is missing"),
        })
    });

    list.emit("server-disclosure", |b| {
        let disclosed: Vec<String> = ["server", "x-powered-by", "x-aspnet-version", "x-aspnetmvc-version"]
            .into_iter()
            .filter_map(|name| page.header(name).filter(|v| discloses_version(v) || name.starts_with("x-aspnet")).map(|v| format!("{name}: {v}")))
            .collect();
        Some(if disclosed.is_empty() {
            b.passed("No software versions disclosed in response headers")
        } else {
            b.details(json!({ "headers": disclosed }))
                .warning(format!("Response headers disclose software versions: {}", disclosed.join("; ")))
        })
    });

    list.emit("header-csp", |b| {
        let Some(csp) = page.header("content-security-policy") else {
            return Some(b.info("No Content-Security-Policy header"));
        };
        let b = b.details(json!({ "value": csp }));
        let lower = csp.to_ascii_lowercase();
        Some(if lower.contains("'unsafe-inline'") || lower.contains("'unsafe-eval'") {
            b.warning("Content-Security-Policy allows 'unsafe-inline' or 'unsafe-eval'")
        } else {
            b.passed("Content-Security-Policy is set")
        })
    });

    list.emit("header-referrer-policy", |b| {
        Some(match page.header("referrer-policy") {
            Some(value) if value.trim().eq_ignore_ascii_case("unsafe-url") => {
                b.warning("Referrer-Policy 'unsafe-url' leaks full URLs to other sites")
            }
            Some(value) => b.passed(format!("Referrer-Policy is set to {value}")),
            None => b.info("No Referrer-Policy header; browsers fall back to their default"),
        })
    });

    list.emit("header-permissions-policy", |b| {
        Some(match page.header("permissions-policy") {
            Some(_) => b.passed("Permissions-Policy is set"),
            None => b.info("No Permissions-Policy header"),
        })
    });

    list.emit("cookie-security", |b| {
        let cookies = set_cookies(&page.headers);
        if cookies.is_empty() {
            return Some(b.info("No cookies are set on the main page"));
        }
        let https = inputs.target.is_https();
        let weak: Vec<serde_json::Value> = cookies
            .iter()
            .filter_map(|cookie| {
                let missing = missing_cookie_flags(cookie, https);
                (!missing.is_empty()).then(|| json!({ "cookie": cookie_name(cookie), "missing": missing }))
            })
            .collect();
        Some(if weak.is_empty() {
            b.passed(format!("All {} cookie(s) set Secure, HttpOnly and SameSite", cookies.len()))
        } else {
            let count = weak.len();
            b.details(json!({ "cookies": weak }))
                .warning(format!("{count} of {} cookie(s) lack security flags", cookies.len()))
        })
    });

    list.emit("cache-control", |b| {
        Some(match page.header("cache-control") {
            Some(value) => b.details(json!({ "value": value })).passed(format!("Cache-Control: {value}")),
            None => b.warning("No Cache-Control header; caching behaviour is left to intermediaries"),
        })
    });

    list.emit("compression", |b| {
        let compression = inputs.probes.compression.as_ref()?;
        Some(match (&compression.encoding, &compression.error) {
            (Some(encoding), _) => b.passed(format!("Responses are compressed with {encoding}")),
            (None, Some(error)) => b.error(format!("Compression could not be checked: {error}")),
            (None, None) => b.warning("Responses are not compressed"),
        })
    });
}

/// Flags a cookie should carry; `Secure` only counts on HTTPS sites.
fn missing_cookie_flags(cookie: &str, https: bool) -> Vec<&'static str> {
    let attributes: Vec<String> = cookie.split(';').skip(1).map(|a| a.trim().to_ascii_lowercase()).collect();
    let has = |flag: &str| attributes.iter().any(|a| a == flag || a.starts_with(&format!("{flag}=")));
    let mut missing = Vec::new();
    if https && !has("secure") {
        missing.push("Secure");
    }
    if !has("httponly") {
        missing.push("HttpOnly");
    }
    if !has("samesite") {
        missing.push("SameSite");
    }
    missing
}

fn cookie_name(cookie: &str) -> &str {
    cookie.split(['=', ';']).next().unwrap_or_default().trim()
}

/// Evidence built from the main page exchange.
fn main_page_evidence(inputs: &CheckInputs<'_>, proof: &str) -> Evidence {
    let page = inputs.headers;
    let url = page.final_url.clone().unwrap_or_else(|| inputs.target.url.to_string());
    capture_evidence(
        CapturedExchange {
            method: "GET",
            url: &url,
            request_headers: inputs.request_headers.clone(),
            status: page.status.unwrap_or_default(),
            response_headers: page.headers.clone(),
            body: &page.body,
        },
        proof,
        Some(vec![
            format!("Request {url}"),
            "Inspect the response headers for X-Frame-Options or a CSP frame-ancestors directive".to_string(),
        ]),
        inputs.evidence_preview_len,
    )
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::build_checks;
    use super::*;
    use crate::core::models::{CheckStatus, Entitlements, FindingType, PlanTier};

    #[test]
    fn csp_is_not_emitted_on_free_plan() {
        let target = target("https://example.com");
        let dns = resolved_dns("example.com");
        let page = page(&[("Server", "nginx")]);
        let inputs = inputs(&target, &dns, None, &page);

        let checks = build_checks(&inputs, Entitlements::resolve(PlanTier::Free, false));

        assert!(checks.iter().all(|c| c.id != "header-csp"));
    }

    #[test]
    fn missing_csp_on_pro_is_unscored_info() {
        let target = target("https://example.com");
        let dns = resolved_dns("example.com");
        let page = page(&[("Server", "nginx")]);
        let inputs = inputs(&target, &dns, None, &page);

        let checks = build_checks(&inputs, Entitlements::resolve(PlanTier::Pro, false));

        let csp = checks.iter().find(|c| c.id == "header-csp").expect("header-csp on pro");
        assert_eq!(csp.status, CheckStatus::Info);
        assert_eq!(csp.finding_type, FindingType::BestPractice);
        assert!(!csp.is_scored());
        assert!(csp.evidence.is_none());
    }

    #[test]
    fn missing_frame_options_carries_evidence() {
        let target = target("https://example.com");
        let dns = resolved_dns("example.com");
        let page = page(&[("Server", "nginx")]);
        let inputs = inputs(&target, &dns, None, &page);

        let checks = build_checks(&inputs, Entitlements::resolve(PlanTier::Free, false));

        let xfo = checks.iter().find(|c| c.id == "header-x-frame-options").unwrap();
        assert_eq!(xfo.status, CheckStatus::Warning);
        let evidence = xfo.evidence.as_ref().expect("vulnerability warning keeps evidence");
        assert_eq!(evidence.response.status, 200);
        assert_eq!(evidence.response.body_preview, "<html><body>Hello</body></html>");
    }

    #[test]
    fn version_disclosure_and_hsts_quality() {
        let target = target("https://example.com");
        let dns = resolved_dns("example.com");
        let page = page(&[("Server", "Apache/2.4.41 (Ubuntu)"), ("Strict-Transport-Security", "max-age=300")]);
        let inputs = inputs(&target, &dns, None, &page);

        let checks = build_checks(&inputs, Entitlements::resolve(PlanTier::Free, false));

        let status = |id: &str| checks.iter().find(|c| c.id == id).map(|c| c.status);
        assert_eq!(status("server-disclosure"), Some(CheckStatus::Warning));
        assert_eq!(status("header-hsts"), Some(CheckStatus::Warning));
    }

    #[test]
    fn cookie_flags() {
        assert_eq!(missing_cookie_flags("sid=1; Secure; HttpOnly; SameSite=Lax", true), Vec::<&str>::new());
        assert_eq!(missing_cookie_flags("sid=1; Path=/", true), vec!["Secure", "HttpOnly", "SameSite"]);
        assert_eq!(missing_cookie_flags("sid=1; HttpOnly; SameSite=Strict", false), Vec::<&str>::new());
        assert_eq!(cookie_name("sid=abc; Path=/"), "sid");
    }
}
