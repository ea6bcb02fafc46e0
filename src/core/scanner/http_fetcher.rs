// src/core/scanner/http_fetcher.rs

use crate::core::config::ScanConfig;
use crate::core::models::{AuthOverride, HeadersResult};
use crate::core::sanitizer::redact_headers;
use crate::core::scanner::headers_scanner::{parse_security_headers, technology_hints};
use crate::core::validation::{check_redirect_target, check_resolved_addresses};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE, LOCATION};
use reqwest::{Client, Method, Response};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::{Host, Url};

/// A desktop Chrome header set; probes should look like a normal visit.
const BROWSER_HEADERS: &[(&str, &str)] = &[
    ("user-agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"),
    ("accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"),
    ("accept-language", "en-US,en;q=0.9"),
    ("accept-encoding", "identity"),
    ("cache-control", "no-cache"),
    ("upgrade-insecure-requests", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
];

/// Delay before each attempt, indexed by attempt number.
const BACKOFF_DELAYS_MS: &[u64] = &[0, 1000, 2000];

/// Timing of one fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptPlan {
    pub attempt: u32,
    pub delay: Duration,
    pub timeout: Duration,
}

/// Maps an attempt number to its delay and timeout; `None` once attempts are exhausted.
pub fn attempt_plan(attempt: u32, config: &ScanConfig) -> Option<AttemptPlan> {
    if attempt >= config.max_attempts {
        return None;
    }
    let delay_ms = BACKOFF_DELAYS_MS
        .get(attempt as usize)
        .or(BACKOFF_DELAYS_MS.last())
        .copied()
        .unwrap_or_default();
    Some(AttemptPlan {
        attempt,
        delay: Duration::from_millis(delay_ms),
        timeout: config.http_timeout + config.retry_timeout_step * attempt,
    })
}

/// Retry state: the next attempt number, advanced by [`RetryState::next_attempt`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryState {
    attempt: u32,
}

impl RetryState {
    pub fn next_attempt(&mut self, config: &ScanConfig) -> Option<AttemptPlan> {
        let plan = attempt_plan(self.attempt, config)?;
        self.attempt += 1;
        Some(plan)
    }
}

/// Why one fetch attempt failed. Blocked redirects are not retried.
#[derive(Debug)]
enum AttemptError {
    Transient(String),
    Blocked(String),
}

impl From<String> for AttemptError {
    fn from(message: String) -> Self {
        AttemptError::Transient(message)
    }
}

/// A single response as seen by a probe: no redirects followed, body capped.
#[derive(Debug, Clone, Default)]
pub struct ProbeResponse {
    pub url: String,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ProbeResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Shared HTTP client for the main fetch and every probe of one scan.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    request_headers: HeaderMap,
    /// Lowercased names of caller-supplied auth headers.
    secret_header_names: Vec<String>,
    config: ScanConfig,
}

impl HttpFetcher {
    pub fn new(config: &ScanConfig, auth: Option<&AuthOverride>) -> Result<Self, String> {
        let client = Client::builder()
            .use_rustls_tls()
            // Certificate problems are reported by the TLS inspector, not by failing fetches.
            .danger_accept_invalid_certs(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;

        Ok(Self {
            client,
            request_headers: build_request_headers(auth),
            secret_header_names: auth
                .map(|a| a.headers.keys().map(|k| k.to_ascii_lowercase()).collect())
                .unwrap_or_default(),
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Request headers as sent, with credential values redacted, for evidence.
    pub fn request_headers(&self) -> BTreeMap<String, String> {
        redact_headers(header_map_to_btree(&self.request_headers), &self.secret_header_names)
    }

    /// Fetches `url`, following redirects and retrying per the backoff schedule.
    ///
    /// Never fails: after the last attempt the failed result is returned with
    /// `error` set and an empty header table.
    pub async fn fetch(&self, url: &str) -> HeadersResult {
        info!(url, "Starting HTTP fetch.");
        let mut retry = RetryState::default();
        let mut last = HeadersResult::default();

        while let Some(plan) = retry.next_attempt(&self.config) {
            if !plan.delay.is_zero() {
                debug!(attempt = plan.attempt, delay_ms = plan.delay.as_millis() as u64, "Backing off before retry.");
                tokio::time::sleep(plan.delay).await;
            }
            match self.attempt(url, plan.timeout).await {
                Ok(mut result) => {
                    result.attempts = plan.attempt + 1;
                    info!(status = ?result.status, attempts = result.attempts, "HTTP fetch finished.");
                    return result;
                }
                Err(AttemptError::Blocked(e)) => {
                    warn!(url, error = %e, "HTTP fetch stopped at a blocked redirect.");
                    return HeadersResult {
                        error: Some(e),
                        attempts: plan.attempt + 1,
                        ..Default::default()
                    };
                }
                Err(AttemptError::Transient(e)) => {
                    warn!(url, attempt = plan.attempt, error = %e, "HTTP fetch attempt failed.");
                    last = HeadersResult {
                        error: Some(e),
                        attempts: plan.attempt + 1,
                        ..Default::default()
                    };
                }
            }
        }

        warn!(url, attempts = last.attempts, "HTTP fetch gave up, origin treated as unreachable.");
        last
    }

    /// One attempt: re-issues requests for each redirect, each hop costing a fixed slice of budget.
    async fn attempt(&self, url: &str, budget: Duration) -> Result<HeadersResult, AttemptError> {
        let started = Instant::now();
        let mut current = Url::parse(url).map_err(|e| format!("Invalid URL {url}: {e}"))?;
        let mut remaining = budget;
        let mut redirect_chain = Vec::new();

        loop {
            if remaining.is_zero() {
                return Err(AttemptError::Transient(format!(
                    "Timeout budget exhausted after {} redirect(s)",
                    redirect_chain.len()
                )));
            }

            let request = self
                .client
                .get(current.clone())
                .headers(self.request_headers.clone())
                .send();
            let response = tokio::time::timeout(remaining, request)
                .await
                .map_err(|_| format!("Request to {current} timed out after {remaining:?}"))?
                .map_err(|e| format!("Request to {current} failed: {e}"))?;

            let status = response.status();
            if status.is_redirection() {
                if let Some(next) = redirect_target(&current, response.headers()) {
                    self.guard_redirect(&next).await.map_err(AttemptError::Blocked)?;
                    debug!(from = %current, to = %next, "Following redirect.");
                    redirect_chain.push(current.to_string());
                    current = next;
                    remaining = remaining.saturating_sub(self.config.redirect_hop_cost);
                    continue;
                }
            }

            let headers = header_map_to_btree(response.headers());
            let read_budget = budget.saturating_sub(started.elapsed()).max(Duration::from_secs(1));
            let (body, truncated) = tokio::time::timeout(read_budget, read_capped(response, self.config.max_body_bytes))
                .await
                .map_err(|_| format!("Reading body of {current} timed out"))?
                .map_err(|e| format!("Reading body of {current} failed: {e}"))?;

            return Ok(HeadersResult {
                status: Some(status.as_u16()),
                final_url: Some(current.to_string()),
                redirect_chain,
                security_headers: parse_security_headers(&headers),
                technology_hints: technology_hints(&headers),
                headers,
                response_time_ms: started.elapsed().as_millis() as u64,
                attempts: 0,
                truncated,
                error: None,
                body,
            });
        }
    }

    /// Refuses redirect hops into blocked ranges, by literal host and by resolved address.
    async fn guard_redirect(&self, next: &Url) -> Result<(), String> {
        if self.config.allow_private_targets {
            return Ok(());
        }
        check_redirect_target(next).map_err(|e| format!("Redirect to {next} refused: {e}"))?;
        if let Some(Host::Domain(domain)) = next.host() {
            let port = next.port_or_known_default().unwrap_or(443);
            // Lookup failures are left for the request itself to report.
            if let Ok(addresses) = tokio::net::lookup_host((domain, port)).await {
                let addresses: Vec<String> = addresses.map(|a| a.ip().to_string()).collect();
                check_resolved_addresses(domain, &addresses)
                    .map_err(|e| format!("Redirect to {next} refused: {e}"))?;
            }
        }
        Ok(())
    }

    /// Single request without redirects or retries, as used by every safe probe.
    pub async fn probe(
        &self,
        method: Method,
        url: &str,
        timeout: Duration,
        extra_headers: &[(&str, &str)],
    ) -> Result<ProbeResponse, String> {
        let mut headers = self.request_headers.clone();
        for (name, value) in extra_headers {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                headers.insert(name, value);
            }
        }

        let is_head = method == Method::HEAD;
        let exchange = async {
            let response = self
                .client
                .request(method, url)
                .headers(headers)
                .send()
                .await
                .map_err(|e| format!("Probe request to {url} failed: {e}"))?;
            let status = response.status().as_u16();
            let response_headers = header_map_to_btree(response.headers());
            let body = if is_head {
                String::new()
            } else {
                read_capped(response, self.config.max_body_bytes)
                    .await
                    .map(|(body, _)| body)
                    .map_err(|e| format!("Reading probe body from {url} failed: {e}"))?
            };
            Ok::<_, String>(ProbeResponse { url: url.to_string(), status, headers: response_headers, body })
        };

        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| format!("Probe request to {url} timed out after {timeout:?}"))?
    }
}

fn redirect_target(current: &Url, headers: &HeaderMap) -> Option<Url> {
    let location = headers.get(LOCATION)?.to_str().ok()?;
    current.join(location).ok()
}

/// Reads at most `cap` bytes; past the cap the response (and its stream) is dropped.
async fn read_capped(mut response: Response, cap: usize) -> Result<(String, bool), reqwest::Error> {
    let mut buf: Vec<u8> = Vec::new();
    let mut truncated = false;
    while let Some(chunk) = response.chunk().await? {
        let room = cap.saturating_sub(buf.len());
        if chunk.len() > room {
            buf.extend_from_slice(&chunk[..room]);
            truncated = true;
            break;
        }
        buf.extend_from_slice(&chunk);
    }
    drop(response);
    Ok((String::from_utf8_lossy(&buf).into_owned(), truncated))
}

/// Browser defaults overlaid with caller-supplied auth headers and cookie.
fn build_request_headers(auth: Option<&AuthOverride>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in BROWSER_HEADERS {
        headers.insert(HeaderName::from_static(*name), HeaderValue::from_static(*value));
    }

    let Some(auth) = auth else { return headers };
    for (name, value) in &auth.headers {
        match (HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = %name, "Skipping auth header that is not a valid HTTP header."),
        }
    }
    if let Some(cookie) = auth.cookie_header.as_deref().filter(|c| !c.trim().is_empty()) {
        match HeaderValue::from_str(cookie) {
            Ok(value) => {
                headers.insert(COOKIE, value);
            }
            Err(_) => warn!("Skipping cookie header with invalid characters."),
        }
    }
    headers
}

/// Lowercase-keyed copy; repeated headers such as `set-cookie` are joined with newlines.
pub fn header_map_to_btree(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        map.entry(name.as_str().to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push('\n');
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    map
}
