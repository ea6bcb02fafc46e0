// src/core/scanner/probes/exposure.rs

//! Existence checks: directory listings, sensitive files, public metadata files
//! and response compression.

use crate::core::models::{CompressionInfo, DirectoryListingOutcome, PublicFilesOutcome, SensitiveFilesOutcome};
use crate::core::scanner::http_fetcher::HttpFetcher;
use crate::core::scanner::probes::{evidence_from, snippet_around};
use crate::core::validation::Target;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Method;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Conventional asset directories that are often left browsable.
pub const LISTING_PATHS: &[&str] = &["/images/", "/uploads/", "/assets/", "/static/", "/files/", "/backup/"];

/// Paths that must never be publicly readable.
pub const SENSITIVE_FILES: &[&str] = &[
    "/.env",
    "/.git/config",
    "/config.php",
    "/wp-config.php",
    "/database.sql",
    "/.htaccess",
    "/backup.zip",
    "/backup.sql",
    "/backup.tar.gz",
    "/wp-config.php.bak",
    "/phpinfo.php",
    "/server-status",
    "/.svn/entries",
];

/// Files that are expected to be public; never reported as sensitive.
pub const PUBLIC_FILES: &[&str] = &["/robots.txt", "/sitemap.xml", "/.well-known/security.txt", "/humans.txt"];

static LISTING_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)index of /|directory listing|parent directory").unwrap());

pub fn is_directory_listing(status: u16, body: &str) -> bool {
    status == 200 && LISTING_MARKERS.is_match(body)
}

/// GETs each listing path concurrently; evidence is kept for the first hit.
pub async fn probe_directory_listing(fetcher: &HttpFetcher, target: &Target) -> DirectoryListingOutcome {
    info!(target = %target.host, paths = LISTING_PATHS.len(), "Starting directory listing probe.");
    let timeout = fetcher.config().probe_timeout;
    let concurrency = fetcher.config().probe_concurrency;

    let responses: Vec<_> = stream::iter(LISTING_PATHS.iter().copied())
        .map(|path| {
            let url = target.join(path);
            async move { (path, fetcher.probe(Method::GET, &url, timeout, &[]).await) }
        })
        .buffered(concurrency)
        .boxed()
        .collect()
        .await;

    let mut outcome = DirectoryListingOutcome::default();
    for (path, response) in responses {
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                debug!(path, error = %e, "Listing probe request failed.");
                continue;
            }
        };
        if !is_directory_listing(response.status, &response.body) {
            continue;
        }
        debug!(path, "Directory listing enabled.");
        if outcome.evidence.is_none() {
            let marker = LISTING_MARKERS.find(&response.body).map(|m| m.as_str()).unwrap_or("Index of /");
            let snippet = snippet_around(&response.body, marker, 200);
            outcome.evidence = Some(evidence_from(
                fetcher,
                "GET",
                &response,
                &snippet,
                format!("{path} returns an auto-generated file index."),
                vec![format!("Open {}", response.url), "Observe the browsable file index".to_string()],
            ));
        }
        outcome.paths.push(path.to_string());
    }
    outcome.found = !outcome.paths.is_empty();
    info!(found = outcome.found, count = outcome.paths.len(), "Directory listing probe finished.");
    outcome
}

/// HEADs every sensitive path, keeping list order. A 200 means exposed.
///
/// A random canary path is checked first; a 200 for it marks the server as
/// soft-404 and every hit is suppressed.
pub async fn probe_sensitive_files(fetcher: &HttpFetcher, target: &Target) -> SensitiveFilesOutcome {
    info!(target = %target.host, paths = SENSITIVE_FILES.len(), "Starting sensitive file probe.");
    let timeout = fetcher.config().existence_timeout;

    let canary = target.join(&format!("/{}.bak", Uuid::new_v4().simple()));
    let soft_404 = matches!(fetcher.probe(Method::HEAD, &canary, timeout, &[]).await, Ok(r) if r.status == 200);
    if soft_404 {
        warn!(target = %target.host, "Server answers 200 for a nonexistent path, suppressing file findings.");
        return SensitiveFilesOutcome { found: false, files: Vec::new(), checked: 0, soft_404: true };
    }

    let files = existing_paths(fetcher, target, SENSITIVE_FILES).await;
    info!(found = files.len(), "Sensitive file probe finished.");
    SensitiveFilesOutcome { found: !files.is_empty(), files, checked: SENSITIVE_FILES.len(), soft_404: false }
}

/// HEADs the well-known public files. Presence is informational.
pub async fn probe_public_files(fetcher: &HttpFetcher, target: &Target) -> PublicFilesOutcome {
    debug!(target = %target.host, "Starting public file probe.");
    PublicFilesOutcome { files: existing_paths(fetcher, target, PUBLIC_FILES).await }
}

/// Paths answering 200 to a HEAD, in input order.
async fn existing_paths(fetcher: &HttpFetcher, target: &Target, paths: &[&str]) -> Vec<String> {
    let timeout = fetcher.config().existence_timeout;
    let concurrency = fetcher.config().probe_concurrency;

    stream::iter(paths.iter().copied())
        .map(|path| {
            let url = target.join(path);
            async move {
                match fetcher.probe(Method::HEAD, &url, timeout, &[]).await {
                    Ok(response) if response.status == 200 => {
                        debug!(path, "Path exists.");
                        Some(path.to_string())
                    }
                    Ok(response) => {
                        debug!(path, status = response.status, "Path not found.");
                        None
                    }
                    Err(e) => {
                        debug!(path, error = %e, "Existence check failed.");
                        None
                    }
                }
            }
        })
        .buffered(concurrency)
        .filter_map(|found| async move { found })
        .boxed()
        .collect()
        .await
}

/// HEAD advertising compression support; the answer's `content-encoding` is recorded.
pub async fn probe_compression(fetcher: &HttpFetcher, target: &Target) -> CompressionInfo {
    let url = target.url.to_string();
    let timeout = fetcher.config().existence_timeout;
    match fetcher
        .probe(Method::HEAD, &url, timeout, &[("accept-encoding", "gzip, deflate, br")])
        .await
    {
        Ok(response) => {
            let encoding = response
                .header("content-encoding")
                .map(|e| e.trim().to_ascii_lowercase())
                .filter(|e| !e.is_empty() && e != "identity");
            debug!(encoding = ?encoding, "Compression probe finished.");
            CompressionInfo { encoding, error: None }
        }
        Err(e) => {
            warn!(error = %e, "Compression probe failed.");
            CompressionInfo { encoding: None, error: Some(e) }
        }
    }
}
