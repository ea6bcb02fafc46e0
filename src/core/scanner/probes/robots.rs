// src/core/scanner/probes/robots.rs

use crate::core::models::RobotsInfo;
use crate::core::scanner::http_fetcher::HttpFetcher;
use crate::core::validation::Target;
use reqwest::Method;
use tracing::{debug, info};

/// Disallowed paths containing one of these hint at something worth hiding.
const SENSITIVE_KEYWORDS: &[&str] = &[
    "admin", "login", "backup", "config", "secret", ".git", ".env", "api", "internal", "staging", "dev",
];

/// Parses `Disallow:` and `Sitemap:` lines, case-insensitively. Comments are ignored.
pub fn parse_robots(body: &str) -> RobotsInfo {
    let mut info = RobotsInfo { found: true, ..Default::default() };
    for line in body.lines() {
        let line = line.split('#').next().unwrap_or_default().trim();
        let Some((key, value)) = line.split_once(':') else { continue };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.trim().to_ascii_lowercase().as_str() {
            "disallow" => {
                if !info.disallowed_paths.iter().any(|p| p == value) {
                    info.disallowed_paths.push(value.to_string());
                }
            }
            "sitemap" => info.sitemaps.push(value.to_string()),
            _ => {}
        }
    }
    info.sensitive_paths = info
        .disallowed_paths
        .iter()
        .filter(|path| {
            let lower = path.to_ascii_lowercase();
            SENSITIVE_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .cloned()
        .collect();
    info
}

/// Fetches `/robots.txt`. Anything but a 200 plain-text answer counts as absent.
pub async fn probe_robots(fetcher: &HttpFetcher, target: &Target) -> RobotsInfo {
    let url = target.join("/robots.txt");
    let timeout = fetcher.config().probe_timeout;
    match fetcher.probe(Method::GET, &url, timeout, &[]).await {
        Ok(response) if response.status == 200 && !looks_like_html(&response.body) => {
            let info = parse_robots(&response.body);
            info!(
                disallowed = info.disallowed_paths.len(),
                sensitive = info.sensitive_paths.len(),
                sitemaps = info.sitemaps.len(),
                "robots.txt analyzed."
            );
            info
        }
        Ok(response) => {
            debug!(status = response.status, "No usable robots.txt.");
            RobotsInfo::default()
        }
        Err(e) => {
            debug!(error = %e, "robots.txt request failed.");
            RobotsInfo::default()
        }
    }
}

/// Soft-404 pages return HTML with a 200 status.
fn looks_like_html(body: &str) -> bool {
    let head = body.trim_start().get(..15).unwrap_or(body.trim_start()).to_ascii_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_directives_case_insensitively() {
        let info = parse_robots(
            "User-agent: *\nDISALLOW: /admin/\ndisallow: /cart # checkout\nDisallow:\nSitemap: https://example.com/sitemap.xml\n",
        );
        assert!(info.found);
        assert_eq!(info.disallowed_paths, vec!["/admin/".to_string(), "/cart".to_string()]);
        assert_eq!(info.sitemaps, vec!["https://example.com/sitemap.xml".to_string()]);
        assert_eq!(info.sensitive_paths, vec!["/admin/".to_string()]);
    }

    #[test]
    fn flags_sensitive_keywords() {
        let info = parse_robots("Disallow: /.git/\nDisallow: /api/internal\nDisallow: /blog\n");
        assert_eq!(info.sensitive_paths, vec!["/.git/".to_string(), "/api/internal".to_string()]);
    }

    #[test]
    fn html_is_not_robots() {
        assert!(looks_like_html("  <!DOCTYPE html><html>"));
        assert!(!looks_like_html("User-agent: *"));
    }
}
