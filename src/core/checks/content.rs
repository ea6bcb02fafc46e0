// src/core/checks/content.rs

use super::{CheckInputs, CheckList};
use crate::core::models::ProbeVerdict;
use serde_json::json;

pub(super) fn detection_checks(inputs: &CheckInputs<'_>, list: &mut CheckList) {
    if !inputs.headers.is_reachable() {
        return;
    }
    let fingerprint = inputs.fingerprint;

    list.emit("cdn-detection", |b| {
        let cdn = fingerprint.and_then(|f| f.cdn.as_deref()).or(inputs.dns.cdn.as_deref());
        Some(match cdn {
            Some(name) => b.details(json!({ "cdn": name })).passed(format!("Served through {name}")),
            None => b.info("No CDN detected"),
        })
    });

    list.emit("waf-detection", |b| {
        let waf = fingerprint?.waf.as_deref();
        Some(match waf {
            Some(name) => b.details(json!({ "waf": name })).passed(format!("{name} appears to protect the site")),
            None => b.info("No web application firewall detected"),
        })
    });

    list.emit("tech-detection", |b| {
        let technologies = &fingerprint?.technologies;
        Some(if technologies.is_empty() {
            b.info("No technologies identified")
        } else {
            let names: Vec<String> = technologies
                .iter()
                .map(|t| match &t.version {
                    Some(v) => format!("{} {v}", t.name),
                    None => t.name.clone(),
                })
                .collect();
            b.details(json!({ "technologies": technologies }))
                .info(format!("Detected: {}", names.join(", ")))
        })
    });

    list.emit("mixed-content", |b| {
        let fingerprint = fingerprint?;
        if !inputs.target.is_https() {
            return None;
        }
        let resources = &fingerprint.mixed_content;
        Some(if resources.is_empty() {
            b.passed("No insecure resources referenced by the page")
        } else {
            b.details(json!({ "resources": resources }))
                .failed(format!("{} resource(s) are loaded over plain HTTP", resources.len()))
        })
    });

    list.emit("third-party-scripts", |b| {
        let scripts = &fingerprint?.third_party_scripts;
        if scripts.is_empty() {
            return Some(b.passed("No third-party scripts loaded"));
        }
        let risky: Vec<&str> = scripts
            .iter()
            .filter(|s| s.high_risk && !s.has_integrity)
            .map(|s| s.src.as_str())
            .collect();
        let hosts: Vec<&str> = {
            let mut hosts: Vec<&str> = scripts.iter().map(|s| s.host.as_str()).collect();
            hosts.sort_unstable();
            hosts.dedup();
            hosts
        };
        let b = b.details(json!({ "scripts": scripts, "hosts": hosts }));
        Some(if risky.is_empty() {
            b.passed(format!("{} third-party script(s) from {} host(s)", scripts.len(), hosts.len()))
        } else {
            b.warning(format!(
                "{} script(s) from high-risk hosts load without Subresource Integrity",
                risky.len()
            ))
        })
    });

    list.emit("vulnerable-libraries", |b| {
        let libraries = &fingerprint?.vulnerable_libraries;
        Some(if libraries.is_empty() {
            b.passed("No known-vulnerable JavaScript library versions detected")
        } else {
            let names: Vec<String> = libraries.iter().map(|l| format!("{} {}", l.name, l.version)).collect();
            b.details(json!({ "libraries": libraries }))
                .failed(format!("Vulnerable libraries: {}", names.join(", ")))
        })
    });
}

pub(super) fn probe_checks(inputs: &CheckInputs<'_>, list: &mut CheckList) {
    let probes = inputs.probes;

    list.emit("sensitive-files", |b| {
        let outcome = probes.sensitive_files.as_ref()?;
        let b = b.details(json!({
            "files": outcome.files,
            "found": outcome.found,
            "checked": outcome.checked,
            "soft404": outcome.soft_404,
        }));
        Some(if outcome.soft_404 {
            b.info("The server answers 200 for unknown paths; file exposure could not be determined")
        } else if outcome.found {
            b.failed(format!("Sensitive files are publicly reachable: {}", outcome.files.join(", ")))
        } else {
            b.passed(format!("None of {} sensitive paths are exposed", outcome.checked))
        })
    });

    list.emit("public-files", |b| {
        let outcome = probes.public_files.as_ref()?;
        let b = b.details(json!({ "files": outcome.files }));
        Some(if outcome.files.is_empty() {
            b.info("No public metadata files (robots.txt, sitemap.xml, security.txt) found")
        } else {
            b.info(format!("Public files: {}", outcome.files.join(", ")))
        })
    });

    list.emit("robots-txt", |b| {
        if probes.public_files.is_none() {
            return None;
        }
        let Some(robots) = inputs.robots.filter(|r| r.found) else {
            return Some(b.info("No robots.txt published"));
        };
        let b = b.details(json!({
            "disallowedPaths": robots.disallowed_paths,
            "sitemaps": robots.sitemaps,
            "sensitivePaths": robots.sensitive_paths,
        }));
        Some(if robots.sensitive_paths.is_empty() {
            b.info(format!("robots.txt lists {} disallowed path(s)", robots.disallowed_paths.len()))
        } else {
            b.info(format!(
                "robots.txt reveals potentially sensitive paths: {}",
                robots.sensitive_paths.join(", ")
            ))
        })
    });

    list.emit("xss-reflection", |b| {
        let outcome = probes.reflection.as_ref()?;
        let b = b.details(json!({
            "testedUrl": outcome.tested_url,
            "parameter": outcome.parameter,
            "context": outcome.context,
            "reflected": outcome.reflected,
        }));
        if let Some(error) = &outcome.error {
            return Some(b.error(format!("Reflection probe failed: {error}")));
        }
        Some(match outcome.verdict {
            ProbeVerdict::Vulnerable => b.evidence(outcome.evidence.clone()).failed(format!(
                "Parameter '{}' is reflected unencoded in a {} context",
                outcome.parameter, outcome.context
            )),
            ProbeVerdict::Informational => b.info(format!(
                "Parameter '{}' is reflected inside an HTML attribute (not directly exploitable)",
                outcome.parameter
            )),
            ProbeVerdict::Safe => b.passed("Test input was not reflected unencoded"),
        })
    });

    list.emit("sql-errors", |b| {
        let outcome = probes.sql_errors.as_ref()?;
        let b = b.details(json!({
            "testedUrl": outcome.tested_url,
            "parameter": outcome.parameter,
            "engine": outcome.engine,
        }));
        if let Some(error) = &outcome.error {
            return Some(b.error(format!("SQL error probe failed: {error}")));
        }
        Some(if outcome.vulnerable {
            b.evidence(outcome.evidence.clone()).failed(format!(
                "A quote in parameter '{}' triggers a {} database error",
                outcome.parameter,
                outcome.engine.as_deref().unwrap_or("database")
            ))
        } else {
            b.passed("No database error messages were triggered")
        })
    });

    list.emit("directory-listing", |b| {
        let outcome = probes.directory_listing.as_ref()?;
        let b = b.details(json!({ "paths": outcome.paths }));
        Some(if outcome.found {
            b.evidence(outcome.evidence.clone())
                .failed(format!("Directory listing is enabled at {}", outcome.paths.join(", ")))
        } else {
            b.passed("No directory listings found")
        })
    });
}
