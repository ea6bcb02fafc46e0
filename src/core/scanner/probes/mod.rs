// src/core/scanner/probes/mod.rs

//! Safe, non-destructive vulnerability probes.
//!
//! Every probe issues single GET or HEAD requests without following redirects,
//! under its own timeout. A failing probe records its error and never aborts
//! its siblings.

pub mod exposure;
pub mod reflection;
pub mod robots;
pub mod sql_errors;

use crate::core::models::{Entitlements, Evidence, ProbeResults, RobotsInfo};
use crate::core::sanitizer::{capture_evidence, CapturedExchange};
use crate::core::scanner::http_fetcher::{HttpFetcher, ProbeResponse};
use crate::core::validation::Target;
use tracing::info;

/// Runs the probes the entitlements allow, all concurrently.
///
/// # Arguments
/// * `fetcher` - The scan's shared HTTP client.
/// * `target` - The validated target.
/// * `baseline` - Body of the unmodified page, used to discount pre-existing error text.
/// * `entitlements` - Pro probes need `is_pro`, intrusive-looking ones `is_business`.
///
/// # Returns
/// The probe results (a `None` slot means the probe did not run) and the robots analysis.
pub async fn run_probes(
    fetcher: &HttpFetcher,
    target: &Target,
    baseline: &str,
    entitlements: Entitlements,
) -> (ProbeResults, Option<RobotsInfo>) {
    info!(
        target = %target.host,
        pro = entitlements.is_pro,
        business = entitlements.is_business,
        "Starting probe layer."
    );

    let pro = entitlements.is_pro;
    let business = entitlements.is_business;
    let (reflection, sql_errors, directory_listing, sensitive_files, public_files, compression, robots) = tokio::join!(
        gated(business, reflection::probe_reflection(fetcher, target)),
        gated(business, sql_errors::probe_sql_errors(fetcher, target, baseline)),
        gated(business, exposure::probe_directory_listing(fetcher, target)),
        gated(pro, exposure::probe_sensitive_files(fetcher, target)),
        gated(pro, exposure::probe_public_files(fetcher, target)),
        gated(pro, exposure::probe_compression(fetcher, target)),
        gated(pro, robots::probe_robots(fetcher, target)),
    );

    info!("Probe layer finished.");
    (
        ProbeResults { reflection, sql_errors, directory_listing, sensitive_files, public_files, compression },
        robots,
    )
}

/// Awaits `probe` only when `allowed`; the future is dropped unpolled otherwise.
async fn gated<T>(allowed: bool, probe: impl Future<Output = T>) -> Option<T> {
    if allowed { Some(probe.await) } else { None }
}

/// Evidence for a probe response, with `body` standing in for the full body.
pub(crate) fn evidence_from(
    fetcher: &HttpFetcher,
    method: &str,
    response: &ProbeResponse,
    body: &str,
    proof_of_impact: String,
    reproduction_steps: Vec<String>,
) -> Evidence {
    capture_evidence(
        CapturedExchange {
            method,
            url: &response.url,
            request_headers: fetcher.request_headers(),
            status: response.status,
            response_headers: response.headers.clone(),
            body,
        },
        proof_of_impact,
        Some(reproduction_steps),
        fetcher.config().evidence_preview_len,
    )
}

/// Up to `radius` bytes either side of the first `needle`, on char boundaries.
pub(crate) fn snippet_around(body: &str, needle: &str, radius: usize) -> String {
    let Some(pos) = body.find(needle) else {
        return body.to_string();
    };
    let mut start = pos.saturating_sub(radius);
    while !body.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (pos + needle.len() + radius).min(body.len());
    while !body.is_char_boundary(end) {
        end += 1;
    }
    body[start..end].to_string()
}
