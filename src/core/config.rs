// src/core/config.rs

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use strum::{Display, EnumString};
use tracing::{debug, warn};

/// Prefix of every environment variable read by [`ScanConfig::from_env`].
pub const ENV_PREFIX: &str = "BASTION_SCANNER_";

/// How absent DNSSEC/CAA records are judged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DnsHardeningPolicy {
    /// Absence is reported as `info` and never scored.
    #[default]
    Informational,
    /// Absence is a scored compliance warning.
    Scored,
}

/// Tunables for a single scan. Every network call takes its timeout from here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    pub dns_timeout: Duration,
    pub tls_timeout: Duration,
    /// Timeout of the first fetch attempt; retries add `retry_timeout_step`.
    pub http_timeout: Duration,
    pub retry_timeout_step: Duration,
    pub max_attempts: u32,
    /// Budget consumed by each redirect hop.
    pub redirect_hop_cost: Duration,
    pub max_body_bytes: usize,
    pub probe_timeout: Duration,
    pub existence_timeout: Duration,
    pub probe_concurrency: usize,
    pub scan_budget: Duration,
    pub evidence_preview_len: usize,
    pub dns_hardening: DnsHardeningPolicy,
    /// Lets loopback and private addresses through the resolved-address and
    /// redirect checks. Off outside of local testing.
    #[serde(default)]
    pub allow_private_targets: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            dns_timeout: Duration::from_secs(5),
            tls_timeout: Duration::from_secs(10),
            http_timeout: Duration::from_secs(10),
            retry_timeout_step: Duration::from_millis(5000),
            max_attempts: 3,
            redirect_hop_cost: Duration::from_secs(5),
            max_body_bytes: 500 * 1024,
            probe_timeout: Duration::from_secs(10),
            existence_timeout: Duration::from_secs(5),
            probe_concurrency: 6,
            scan_budget: Duration::from_secs(90),
            evidence_preview_len: 400,
            dns_hardening: DnsHardeningPolicy::Informational,
            allow_private_targets: false,
        }
    }
}

impl ScanConfig {
    /// Defaults overridden by `BASTION_SCANNER_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ScanConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let read = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        override_secs(&mut config.dns_timeout, "DNS_TIMEOUT_SECS", read("DNS_TIMEOUT_SECS"));
        override_secs(&mut config.tls_timeout, "TLS_TIMEOUT_SECS", read("TLS_TIMEOUT_SECS"));
        override_secs(&mut config.http_timeout, "HTTP_TIMEOUT_SECS", read("HTTP_TIMEOUT_SECS"));
        override_millis(&mut config.retry_timeout_step, "RETRY_TIMEOUT_STEP_MS", read("RETRY_TIMEOUT_STEP_MS"));
        override_secs(&mut config.redirect_hop_cost, "REDIRECT_HOP_COST_SECS", read("REDIRECT_HOP_COST_SECS"));
        override_parsed(&mut config.max_attempts, "MAX_ATTEMPTS", read("MAX_ATTEMPTS"));
        override_secs(&mut config.probe_timeout, "PROBE_TIMEOUT_SECS", read("PROBE_TIMEOUT_SECS"));
        override_secs(&mut config.existence_timeout, "EXISTENCE_TIMEOUT_SECS", read("EXISTENCE_TIMEOUT_SECS"));
        override_secs(&mut config.scan_budget, "SCAN_BUDGET_SECS", read("SCAN_BUDGET_SECS"));
        override_parsed(&mut config.max_body_bytes, "MAX_BODY_BYTES", read("MAX_BODY_BYTES"));
        override_parsed(&mut config.probe_concurrency, "PROBE_CONCURRENCY", read("PROBE_CONCURRENCY"));
        override_parsed(&mut config.evidence_preview_len, "EVIDENCE_PREVIEW_LEN", read("EVIDENCE_PREVIEW_LEN"));
        override_parsed(&mut config.dns_hardening, "DNS_HARDENING", read("DNS_HARDENING"));

        if config.max_attempts == 0 {
            warn!("Max attempts of 0 would never fetch, falling back to 1.");
            config.max_attempts = 1;
        }
        if config.probe_concurrency == 0 {
            warn!("Probe concurrency of 0 is not usable, falling back to 1.");
            config.probe_concurrency = 1;
        }
        config
    }
}

fn override_secs(slot: &mut Duration, name: &str, raw: Option<String>) {
    let mut secs = slot.as_secs();
    override_parsed(&mut secs, name, raw);
    *slot = Duration::from_secs(secs);
}

fn override_millis(slot: &mut Duration, name: &str, raw: Option<String>) {
    let mut millis = slot.as_millis() as u64;
    override_parsed(&mut millis, name, raw);
    *slot = Duration::from_millis(millis);
}

fn override_parsed<T: FromStr>(slot: &mut T, name: &str, raw: Option<String>) {
    let Some(raw) = raw else { return };
    match raw.trim().parse::<T>() {
        Ok(value) => {
            debug!(variable = name, value = %raw, "Config override applied.");
            *slot = value;
        }
        Err(_) => warn!(variable = name, value = %raw, "Ignoring unparsable config override."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_probe_contracts() {
        let config = ScanConfig::default();
        assert_eq!(config.tls_timeout, Duration::from_secs(10));
        assert_eq!(config.max_body_bytes, 512_000);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.evidence_preview_len, 400);
        assert_eq!(config.dns_hardening, DnsHardeningPolicy::Informational);
    }

    #[test]
    fn environment_overrides_are_applied() {
        let config = ScanConfig::from_lookup(lookup_from(&[
            ("BASTION_SCANNER_SCAN_BUDGET_SECS", "30"),
            ("BASTION_SCANNER_DNS_HARDENING", "Scored"),
            ("BASTION_SCANNER_PROBE_CONCURRENCY", "2"),
        ]));
        assert_eq!(config.scan_budget, Duration::from_secs(30));
        assert_eq!(config.dns_hardening, DnsHardeningPolicy::Scored);
        assert_eq!(config.probe_concurrency, 2);
    }

    #[test]
    fn retry_and_probe_timings_are_overridable() {
        let config = ScanConfig::from_lookup(lookup_from(&[
            ("BASTION_SCANNER_EXISTENCE_TIMEOUT_SECS", "3"),
            ("BASTION_SCANNER_RETRY_TIMEOUT_STEP_MS", "2500"),
            ("BASTION_SCANNER_REDIRECT_HOP_COST_SECS", "2"),
            ("BASTION_SCANNER_MAX_ATTEMPTS", "5"),
        ]));
        assert_eq!(config.existence_timeout, Duration::from_secs(3));
        assert_eq!(config.retry_timeout_step, Duration::from_millis(2500));
        assert_eq!(config.redirect_hop_cost, Duration::from_secs(2));
        assert_eq!(config.max_attempts, 5);
        assert!(!config.allow_private_targets);
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let config = ScanConfig::from_lookup(lookup_from(&[
            ("BASTION_SCANNER_TLS_TIMEOUT_SECS", "soon"),
            ("BASTION_SCANNER_PROBE_CONCURRENCY", "0"),
            ("BASTION_SCANNER_MAX_ATTEMPTS", "0"),
        ]));
        assert_eq!(config.tls_timeout, Duration::from_secs(10));
        assert_eq!(config.probe_concurrency, 1);
        assert_eq!(config.max_attempts, 1);
    }
}
