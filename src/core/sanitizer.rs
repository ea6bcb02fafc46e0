// src/core/sanitizer.rs

//! Body-preview sanitizer and the single entry point for building [`Evidence`].

use crate::core::models::{Evidence, EvidenceRequest, EvidenceResponse};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_PREVIEW_LEN: usize = 400;

/// Shown instead of content that looks binary or encrypted.
pub const BINARY_PLACEHOLDER: &str = "[binary or encrypted content omitted]";

/// Replaces credential values in recorded request headers.
pub const REDACTED: &str = "[redacted]";

/// Request headers whose values never reach evidence.
const CREDENTIAL_HEADERS: &[&str] = &["authorization", "proxy-authorization", "cookie"];

const NON_PRINTABLE_RATIO_LIMIT: f64 = 0.10;
const ENTROPY_WINDOW: usize = 1000;
const ENTROPY_LIMIT: f64 = 6.0;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static CONTROL_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]{3,}").unwrap());

fn is_printable(c: char) -> bool {
    !c.is_control() || matches!(c, '\n' | '\r' | '\t')
}

fn non_printable_ratio(text: &str) -> f64 {
    let (total, bad) = text
        .chars()
        .fold((0usize, 0usize), |(t, b), c| (t + 1, b + usize::from(!is_printable(c) || c == '\u{FFFD}')));
    if total == 0 { 0.0 } else { bad as f64 / total as f64 }
}

/// Shannon entropy in bits per character over the first 1000 characters.
pub fn shannon_entropy(text: &str) -> f64 {
    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for c in text.chars().take(ENTROPY_WINDOW) {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }
    counts
        .values()
        .map(|&n| {
            let p = n as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

fn has_binary_magic(text: &str) -> bool {
    let bytes = text.as_bytes();
    // TLS record header: handshake/alert/change-cipher/app-data, version 3.x
    let tls_record = bytes.len() >= 3 && matches!(bytes[0], 0x14..=0x17) && bytes[1] == 0x03 && bytes[2] <= 0x04;
    tls_record || text.starts_with("PRI * HTTP/2.0") || CONTROL_RUN.is_match(text)
}

/// True when any of the three heuristics says the body is not text.
pub fn looks_binary(text: &str) -> bool {
    non_printable_ratio(text) > NON_PRINTABLE_RATIO_LIMIT
        || shannon_entropy(text) > ENTROPY_LIMIT
        || has_binary_magic(text)
}

/// Produces a safe, single-line preview of a response body.
pub fn sanitize_body(body: &str, max_len: usize) -> String {
    if looks_binary(body) {
        return BINARY_PLACEHOLDER.to_string();
    }
    let printable: String = body.chars().filter(|&c| is_printable(c)).collect();
    let collapsed = WHITESPACE_RUN.replace_all(printable.trim(), " ");
    truncate_chars(&collapsed, max_len)
}

fn truncate_chars(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    // The ellipsis counts towards the limit so a second pass is a no-op.
    let mut cut: String = text.chars().take(max_len.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Blanks the values of credential headers and of every name in `extra` (case-insensitive).
pub fn redact_headers(mut headers: BTreeMap<String, String>, extra: &[String]) -> BTreeMap<String, String> {
    for (name, value) in headers.iter_mut() {
        let secret = CREDENTIAL_HEADERS.iter().any(|c| name.eq_ignore_ascii_case(c))
            || extra.iter().any(|e| name.eq_ignore_ascii_case(e));
        if secret {
            *value = REDACTED.to_string();
        }
    }
    headers
}

/// Raw material for evidence; the body is only ever stored sanitized.
#[derive(Debug, Clone)]
pub struct CapturedExchange<'a> {
    pub method: &'a str,
    pub url: &'a str,
    pub request_headers: BTreeMap<String, String>,
    pub status: u16,
    pub response_headers: BTreeMap<String, String>,
    pub body: &'a str,
}

pub fn capture_evidence(
    exchange: CapturedExchange<'_>,
    proof_of_impact: impl Into<String>,
    reproduction_steps: Option<Vec<String>>,
    preview_len: usize,
) -> Evidence {
    Evidence {
        request: EvidenceRequest {
            method: exchange.method.to_string(),
            url: exchange.url.to_string(),
            headers: redact_headers(exchange.request_headers, &[]),
        },
        response: EvidenceResponse {
            status: exchange.status,
            headers: exchange.response_headers,
            body_preview: sanitize_body(exchange.body, preview_len),
        },
        proof_of_impact: proof_of_impact.into(),
        reproduction_steps,
        timestamp: Utc::now(),
    }
}
