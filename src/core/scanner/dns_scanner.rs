// src/core/scanner/dns_scanner.rs

use tracing::{debug, info, warn};

use crate::core::config::ScanConfig;
use crate::core::models::{DnsResult, MxRecord};
use crate::core::scanner::fingerprint_scanner::{compile_table, SignatureTable};
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::TokioAsyncResolver;
use once_cell::sync::Lazy;
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

/// CDN providers recognised from NS records or the hostname. Order matters: first match wins.
static DNS_CDN_SIGNATURES: Lazy<SignatureTable> = Lazy::new(|| {
    compile_table(&[
        ("Cloudflare", &[r"(?i)\.ns\.cloudflare\.com$", r"(?i)cloudflare"]),
        ("Akamai", &[r"(?i)akam(ai)?\.net$", r"(?i)edgekey\.net$", r"(?i)edgesuite\.net$"]),
        ("Amazon CloudFront", &[r"(?i)cloudfront\.net$"]),
        ("Fastly", &[r"(?i)fastly"]),
        ("Azure CDN", &[r"(?i)azureedge\.net$", r"(?i)azurefd\.net$"]),
        ("Google Cloud CDN", &[r"(?i)googlehosted\.com$", r"(?i)googleusercontent\.com$"]),
        ("Vercel", &[r"(?i)vercel-dns\.com$", r"(?i)\.vercel\.app$"]),
        ("Netlify", &[r"(?i)nsone\.net$", r"(?i)\.netlify\.app$"]),
        ("Imperva Incapsula", &[r"(?i)incapdns\.net$", r"(?i)incapsula"]),
        ("Sucuri", &[r"(?i)sucuri"]),
        ("StackPath", &[r"(?i)stackpathdns\.com$", r"(?i)hwcdn\.net$"]),
    ])
});

/// Builds the resolver shared by the DNS and email lookups of one scan.
///
/// Every lookup is attempted exactly once with the configured timeout.
pub fn build_resolver(config: &ScanConfig) -> TokioAsyncResolver {
    let mut opts = ResolverOpts::default();
    opts.timeout = config.dns_timeout;
    opts.attempts = 1;
    TokioAsyncResolver::tokio(ResolverConfig::default(), opts)
}

/// Resolves A, AAAA, NS, MX, TXT and CAA records plus a DNSKEY presence probe.
///
/// Each record type is looked up concurrently and independently: a failing
/// lookup contributes an empty list and an entry in `errors`, nothing more.
pub async fn run_dns_scan(resolver: &TokioAsyncResolver, hostname: &str, config: &ScanConfig) -> DnsResult {
    info!(target = %hostname, "Starting DNS scan.");

    if let Ok(ip) = hostname.parse::<IpAddr>() {
        debug!("Target is an IP literal, skipping resolution.");
        let mut result = DnsResult { hostname: hostname.to_string(), resolved: true, ..Default::default() };
        match ip {
            IpAddr::V4(v4) => result.ipv4.push(v4.to_string()),
            IpAddr::V6(v6) => result.ipv6.push(v6.to_string()),
        }
        return result;
    }

    let timeout = config.dns_timeout;
    let (a, aaaa, ns, mx, txt, caa, dnskey) = tokio::join!(
        settle("A", timeout, resolver.ipv4_lookup(hostname), |l| l.iter().map(|a| a.to_string()).collect()),
        settle("AAAA", timeout, resolver.ipv6_lookup(hostname), |l| l.iter().map(|a| a.to_string()).collect()),
        settle("NS", timeout, resolver.ns_lookup(hostname), |l| {
            l.iter().map(|ns| ns.to_string().trim_end_matches('.').to_string()).collect()
        }),
        settle("MX", timeout, resolver.mx_lookup(hostname), |l| {
            l.iter()
                .map(|mx| MxRecord {
                    preference: mx.preference(),
                    exchange: mx.exchange().to_string().trim_end_matches('.').to_string(),
                })
                .collect()
        }),
        settle("TXT", timeout, resolver.txt_lookup(hostname), |l| l.iter().map(|t| t.to_string()).collect()),
        settle("CAA", timeout, resolver.lookup(hostname, RecordType::CAA), |l| {
            l.iter().map(|r| r.to_string()).collect()
        }),
        settle("DNSKEY", timeout, resolver.lookup(hostname, RecordType::DNSKEY), |l| {
            l.iter().map(|r| r.to_string()).collect::<Vec<String>>()
        }),
    );

    let mut result = DnsResult {
        hostname: hostname.to_string(),
        ipv4: a.0,
        ipv6: aaaa.0,
        ns: ns.0,
        mx: mx.0,
        txt: txt.0,
        caa: caa.0,
        // Approximation: any DNSKEY answer counts as DNSSEC being enabled.
        has_dnssec: !dnskey.0.is_empty(),
        ..Default::default()
    };
    for (record, error) in [("A", a.1), ("AAAA", aaaa.1), ("NS", ns.1), ("MX", mx.1), ("TXT", txt.1), ("CAA", caa.1), ("DNSKEY", dnskey.1)] {
        if let Some(error) = error {
            result.errors.insert(record.to_string(), error);
        }
    }
    result.resolved = !result.ipv4.is_empty() || !result.ipv6.is_empty();
    result.cdn = detect_cdn_from_dns(hostname, &result.ns);

    info!(
        resolved = result.resolved,
        ipv4 = result.ipv4.len(),
        ipv6 = result.ipv6.len(),
        cdn = ?result.cdn,
        "DNS scan finished."
    );
    result
}

/// Runs one lookup under a timeout and folds any failure into an empty list.
///
/// "No records" is not an error; anything else is returned as text for diagnostics.
async fn settle<L, T, Fut, F>(record: &'static str, timeout: Duration, lookup: Fut, extract: F) -> (Vec<T>, Option<String>)
where
    Fut: Future<Output = Result<L, ResolveError>>,
    F: FnOnce(L) -> Vec<T>,
{
    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(found)) => {
            let values = extract(found);
            debug!(record, count = values.len(), "DNS lookup succeeded.");
            (values, None)
        }
        Ok(Err(e)) if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) => {
            debug!(record, "No records found.");
            (Vec::new(), None)
        }
        Ok(Err(e)) => {
            warn!(record, error = %e, "DNS lookup failed.");
            (Vec::new(), Some(format!("DNS Error: {e}")))
        }
        Err(_) => {
            warn!(record, timeout_ms = timeout.as_millis() as u64, "DNS lookup timed out.");
            (Vec::new(), Some(format!("DNS lookup timed out after {timeout:?}")))
        }
    }
}

/// Matches NS records, then the hostname itself, against the provider table.
pub fn detect_cdn_from_dns(hostname: &str, ns: &[String]) -> Option<String> {
    let corpus = ns
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(hostname))
        .collect::<Vec<_>>();
    // Each name is tested on its own so `$` anchors apply per record.
    DNS_CDN_SIGNATURES
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|re| corpus.iter().any(|name| re.is_match(name))))
        .map(|(provider, _)| provider.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_cdn_from_nameservers() {
        let ns = vec!["lara.ns.cloudflare.com".to_string(), "greg.ns.cloudflare.com".to_string()];
        assert_eq!(detect_cdn_from_dns("example.com", &ns).as_deref(), Some("Cloudflare"));
    }

    #[test]
    fn detects_cdn_from_hostname() {
        assert_eq!(detect_cdn_from_dns("shop.example.com.edgekey.net", &[]).as_deref(), Some("Akamai"));
        assert_eq!(detect_cdn_from_dns("my-site.netlify.app", &[]).as_deref(), Some("Netlify"));
    }

    #[test]
    fn first_provider_in_table_order_wins() {
        // Matches both Cloudflare (NS) and Fastly (hostname); Cloudflare comes first.
        let ns = vec!["ada.ns.cloudflare.com".to_string()];
        assert_eq!(detect_cdn_from_dns("global.fastly.net", &ns).as_deref(), Some("Cloudflare"));
    }

    #[test]
    fn no_cdn_for_plain_hosting() {
        let ns = vec!["ns1.example-hosting.com".to_string()];
        assert_eq!(detect_cdn_from_dns("example.com", &ns), None);
    }

    #[tokio::test]
    async fn ip_literals_resolve_without_lookups() {
        let config = ScanConfig::default();
        let resolver = build_resolver(&config);
        let result = run_dns_scan(&resolver, "2001:db8::1", &config).await;
        assert!(result.resolved);
        assert!(result.ipv4.is_empty());
        assert_eq!(result.ipv6, vec!["2001:db8::1".to_string()]);
    }
}
