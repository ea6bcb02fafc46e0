// src/core/scanner/fingerprint_scanner.rs

use crate::core::models::{FingerprintResult, HeadersResult, Technology, ThirdPartyScript, VulnerableLibrary};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use tracing::{debug, info};
use url::Url;

/// Ordered `(name, patterns)` table; iteration order decides which entry wins.
pub type SignatureTable = Vec<(&'static str, Vec<Regex>)>;

/// Compiles a static signature table. Patterns are compile-time constants.
pub fn compile_table(entries: &[(&'static str, &[&str])]) -> SignatureTable {
    entries
        .iter()
        .map(|(name, patterns)| {
            let compiled = patterns.iter().filter_map(|p| Regex::new(p).ok()).collect();
            (*name, compiled)
        })
        .collect()
}

/// Name of the first entry with any pattern matching `corpus`.
pub fn first_match(table: &SignatureTable, corpus: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(corpus)))
        .map(|(name, _)| *name)
}

/// CDN signatures over serialized headers plus body.
static CDN_SIGNATURES: Lazy<SignatureTable> = Lazy::new(|| {
    compile_table(&[
        ("Cloudflare", &[r"(?im)^cf-ray:", r"(?im)^server: cloudflare", r"__cf_bm="]),
        ("Amazon CloudFront", &[r"(?im)^x-amz-cf-(id|pop):", r"(?im)^via: .*cloudfront"]),
        ("Fastly", &[r"(?im)^x-fastly-request-id:", r"(?im)^x-served-by: cache-", r"(?im)^fastly-"]),
        ("Akamai", &[r"(?im)^x-akamai-", r"(?im)^server: akamaighost", r"(?im)^x-check-cacheable:"]),
        ("Vercel", &[r"(?im)^x-vercel-(id|cache):", r"(?im)^server: vercel"]),
        ("Netlify", &[r"(?im)^x-nf-request-id:", r"(?im)^server: netlify"]),
        ("Azure CDN", &[r"(?im)^x-azure-ref:", r"(?im)^x-msedge-ref:"]),
        ("Google Cloud CDN", &[r"(?im)^via: 1\.1 google"]),
        ("BunnyCDN", &[r"(?im)^server: bunnycdn", r"(?im)^cdn-pullzone:"]),
        ("KeyCDN", &[r"(?im)^server: keycdn"]),
        ("Sucuri", &[r"(?im)^x-sucuri-id:"]),
    ])
});

/// WAF signatures over serialized headers (cookies included) only.
static WAF_SIGNATURES: Lazy<SignatureTable> = Lazy::new(|| {
    compile_table(&[
        ("Cloudflare", &[r"(?im)^cf-ray:", r"(?im)^server: cloudflare", r"(?im)^cf-mitigated:", r"__cf_bm="]),
        ("AWS WAF", &[r"(?im)^x-amzn-waf-", r"aws-waf-token="]),
        ("Akamai Kona", &[r"(?im)^server: akamaighost", r"(?im)^x-akamai-"]),
        ("Imperva Incapsula", &[r"(?im)^x-iinfo:", r"incap_ses_", r"visid_incap_", r"(?im)^x-cdn: incapsula"]),
        ("Sucuri", &[r"(?im)^x-sucuri-id:", r"(?im)^server: sucuri"]),
        ("F5 BIG-IP ASM", &[r"(?i)bigipserver", r"(?im)^x-wa-info:", r"(?i)\bTS[0-9a-f]{8,}="]),
        ("Barracuda", &[r"barra_counter_session=", r"(?i)barracuda_"]),
        ("ModSecurity", &[r"(?i)mod_security", r"(?i)modsecurity"]),
        ("FortiWeb", &[r"(?i)fortiwafsid=", r"(?im)^server: fortiweb"]),
    ])
});

/// Hosts serving unpinned, community-published code; scripts from them are elevated risk.
const HIGH_RISK_SCRIPT_HOSTS: &[&str] = &[
    "cdn.jsdelivr.net",
    "unpkg.com",
    "cdnjs.cloudflare.com",
    "rawgit.com",
    "cdn.rawgit.com",
    "raw.githubusercontent.com",
    "gitcdn.link",
    "polyfill.io",
    "cdn.polyfill.io",
];

/// Defines the different places a technology signal can be found.
enum Signal<'a> {
    /// Check for a pattern in a specific HTTP header.
    Header(&'a str, &'a Lazy<Regex>),
    /// Check for a pattern in the content of a specific meta tag.
    MetaTag(&'a str, &'a Lazy<Regex>),
    /// Check for a pattern in the HTML body.
    Body(&'a Lazy<Regex>),
    /// Check for a pattern in the `src` attribute of `<script>` tags.
    ScriptSrc(&'a Lazy<Regex>),
    /// Check for a pattern in the `href` attribute of `<link>` tags.
    LinkHref(&'a Lazy<Regex>),
    /// Check for a pattern in the `set-cookie` headers.
    Cookie(&'a Lazy<Regex>),
}

/// A rule that defines how to detect a specific technology.
struct FingerprintRule<'a> {
    tech_name: &'a str,
    category: &'a str,
    signal: Signal<'a>,
}

static RE_NGINX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)nginx(?:/([\d\.]+))?").unwrap());
static RE_NGINX_ERROR: Lazy<Regex> = Lazy::new(|| Regex::new(r"<hr><center>nginx</center>").unwrap());
static RE_APACHE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Apache(?:/([\d\.]+))?").unwrap());
static RE_APACHE_ERROR: Lazy<Regex> = Lazy::new(|| Regex::new(r"Apache Server at").unwrap());
static RE_IIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Microsoft-IIS(?:/([\d\.]+))?").unwrap());
static RE_LITESPEED: Lazy<Regex> = Lazy::new(|| Regex::new(r"LiteSpeed").unwrap());
static RE_CADDY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^caddy").unwrap());
static RE_WORDPRESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"WordPress ([\d\.]+)").unwrap());
static RE_WP_EMBED: Lazy<Regex> = Lazy::new(|| Regex::new(r"/wp-content/|/wp-includes/").unwrap());
static RE_DRUPAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"Drupal ?([\d\.]+)?").unwrap());
static RE_JOOMLA: Lazy<Regex> = Lazy::new(|| Regex::new(r"Joomla!").unwrap());
static RE_SHOPIFY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)cdn\.shopify\.com").unwrap());
static RE_MAGENTO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)mage-cache|magento").unwrap());
static RE_PHP: Lazy<Regex> = Lazy::new(|| Regex::new(r"PHP/([\d\.]+)").unwrap());
static RE_PHPSESSID: Lazy<Regex> = Lazy::new(|| Regex::new(r"PHPSESSID").unwrap());
static RE_ASPNET: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\d\.]+)").unwrap());
static RE_ASPNET_POWERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"ASP\.NET").unwrap());
static RE_EXPRESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Express").unwrap());
static RE_JSESSIONID: Lazy<Regex> = Lazy::new(|| Regex::new(r"JSESSIONID").unwrap());
static RE_DJANGO_CSRF: Lazy<Regex> = Lazy::new(|| Regex::new(r"csrftoken").unwrap());
static RE_LARAVEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"laravel_session").unwrap());
static RE_RUBY_RAILS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_rails_session").unwrap());
static RE_NEXTJS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Next\.js ?([\d\.]+)?").unwrap());
static RE_NEXTJS_SCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/_next/static/").unwrap());
static RE_NUXTJS: Lazy<Regex> = Lazy::new(|| Regex::new(r"__NUXT__").unwrap());
static RE_ANGULAR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"ng-version="([\d\.]+)""#).unwrap());
static RE_SVELTE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"class=["']svelte-"#).unwrap());
static RE_GATSBY: Lazy<Regex> = Lazy::new(|| Regex::new(r#"id=["']___gatsby["']"#).unwrap());
static RE_ASTRO: Lazy<Regex> = Lazy::new(|| Regex::new(r"Astro v([\d\.]+)").unwrap());
static RE_JQUERY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)jquery[.-]?(\d+\.\d+\.\d+)?(?:\.min|\.slim)?\.js").unwrap());
static RE_REACT: Lazy<Regex> = Lazy::new(|| Regex::new(r"react-dom|data-reactroot|react\.development").unwrap());
static RE_VUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"data-v-app|__VUE_").unwrap());
static RE_BOOTSTRAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)bootstrap(?:@|/)?(\d+\.\d+\.\d+)?(?:/dist/css/bootstrap)?(?:\.min)?\.css").unwrap());
static RE_GOOGLE_ANALYTICS: Lazy<Regex> = Lazy::new(|| Regex::new(r"google-analytics\.com/|googletagmanager\.com/").unwrap());

/// The master list of technology rules. Several rules may name the same technology.
static RULES: &[FingerprintRule] = &[
    FingerprintRule { tech_name: "Nginx", category: "Web Server", signal: Signal::Header("server", &RE_NGINX) },
    FingerprintRule { tech_name: "Nginx", category: "Web Server", signal: Signal::Body(&RE_NGINX_ERROR) },
    FingerprintRule { tech_name: "Apache", category: "Web Server", signal: Signal::Header("server", &RE_APACHE) },
    FingerprintRule { tech_name: "Apache", category: "Web Server", signal: Signal::Body(&RE_APACHE_ERROR) },
    FingerprintRule { tech_name: "IIS", category: "Web Server", signal: Signal::Header("server", &RE_IIS) },
    FingerprintRule { tech_name: "LiteSpeed", category: "Web Server", signal: Signal::Header("server", &RE_LITESPEED) },
    FingerprintRule { tech_name: "Caddy", category: "Web Server", signal: Signal::Header("server", &RE_CADDY) },
    FingerprintRule { tech_name: "WordPress", category: "CMS", signal: Signal::MetaTag("generator", &RE_WORDPRESS) },
    FingerprintRule { tech_name: "WordPress", category: "CMS", signal: Signal::Body(&RE_WP_EMBED) },
    FingerprintRule { tech_name: "Drupal", category: "CMS", signal: Signal::MetaTag("generator", &RE_DRUPAL) },
    FingerprintRule { tech_name: "Drupal", category: "CMS", signal: Signal::Header("x-generator", &RE_DRUPAL) },
    FingerprintRule { tech_name: "Joomla", category: "CMS", signal: Signal::MetaTag("generator", &RE_JOOMLA) },
    FingerprintRule { tech_name: "Shopify", category: "E-commerce", signal: Signal::Body(&RE_SHOPIFY) },
    FingerprintRule { tech_name: "Magento", category: "E-commerce", signal: Signal::Cookie(&RE_MAGENTO) },
    FingerprintRule { tech_name: "PHP", category: "Language", signal: Signal::Header("x-powered-by", &RE_PHP) },
    FingerprintRule { tech_name: "PHP", category: "Language", signal: Signal::Cookie(&RE_PHPSESSID) },
    FingerprintRule { tech_name: "ASP.NET", category: "Framework", signal: Signal::Header("x-aspnet-version", &RE_ASPNET) },
    FingerprintRule { tech_name: "ASP.NET", category: "Framework", signal: Signal::Header("x-powered-by", &RE_ASPNET_POWERED) },
    FingerprintRule { tech_name: "Express", category: "Framework", signal: Signal::Header("x-powered-by", &RE_EXPRESS) },
    FingerprintRule { tech_name: "Java", category: "Language", signal: Signal::Cookie(&RE_JSESSIONID) },
    FingerprintRule { tech_name: "Django", category: "Framework", signal: Signal::Cookie(&RE_DJANGO_CSRF) },
    FingerprintRule { tech_name: "Laravel", category: "Framework", signal: Signal::Cookie(&RE_LARAVEL) },
    FingerprintRule { tech_name: "Ruby on Rails", category: "Framework", signal: Signal::Cookie(&RE_RUBY_RAILS) },
    FingerprintRule { tech_name: "Next.js", category: "JS Framework", signal: Signal::Header("x-powered-by", &RE_NEXTJS) },
    FingerprintRule { tech_name: "Next.js", category: "JS Framework", signal: Signal::ScriptSrc(&RE_NEXTJS_SCRIPT) },
    FingerprintRule { tech_name: "Nuxt.js", category: "JS Framework", signal: Signal::Body(&RE_NUXTJS) },
    FingerprintRule { tech_name: "Angular", category: "JS Framework", signal: Signal::Body(&RE_ANGULAR) },
    FingerprintRule { tech_name: "Svelte", category: "JS Framework", signal: Signal::Body(&RE_SVELTE) },
    FingerprintRule { tech_name: "Gatsby", category: "JS Framework", signal: Signal::Body(&RE_GATSBY) },
    FingerprintRule { tech_name: "Astro", category: "JS Framework", signal: Signal::MetaTag("generator", &RE_ASTRO) },
    FingerprintRule { tech_name: "React", category: "JS Library", signal: Signal::Body(&RE_REACT) },
    FingerprintRule { tech_name: "Vue.js", category: "JS Library", signal: Signal::Body(&RE_VUE) },
    FingerprintRule { tech_name: "jQuery", category: "JS Library", signal: Signal::ScriptSrc(&RE_JQUERY) },
    FingerprintRule { tech_name: "Bootstrap", category: "UI Framework", signal: Signal::LinkHref(&RE_BOOTSTRAP) },
    FingerprintRule { tech_name: "Google Analytics", category: "Analytics", signal: Signal::ScriptSrc(&RE_GOOGLE_ANALYTICS) },
];

/// `(introduced, fixed, advisory)`; versions in `[introduced, fixed)` are affected.
type Advisory = (&'static str, &'static str, &'static str);

struct LibraryRule {
    name: &'static str,
    patterns: Vec<Regex>,
    advisories: &'static [Advisory],
}

fn rule(name: &'static str, patterns: &[&str], advisories: &'static [Advisory]) -> LibraryRule {
    LibraryRule {
        name,
        patterns: patterns.iter().filter_map(|p| Regex::new(p).ok()).collect(),
        advisories,
    }
}

static LIBRARY_RULES: Lazy<Vec<LibraryRule>> = Lazy::new(|| {
    vec![
        rule(
            "jQuery",
            &[r"(?i)jquery[.-](\d+\.\d+\.\d+)(?:\.min|\.slim)*\.js", r"(?i)/jquery/(\d+\.\d+\.\d+)/", r"(?i)jquery@(\d+\.\d+\.\d+)", r"jQuery v(\d+\.\d+\.\d+)"],
            &[("0.0.0", "3.5.0", "CVE-2020-11022/CVE-2020-11023: XSS through htmlPrefilter")],
        ),
        rule(
            "AngularJS",
            &[r"(?i)angular(?:js)?[/@-](1\.\d+\.\d+)", r"AngularJS v(1\.\d+\.\d+)"],
            &[("1.0.0", "1.8.0", "CVE-2020-7676: XSS in angular.element; AngularJS is end-of-life")],
        ),
        rule(
            "Bootstrap",
            &[r"(?i)bootstrap[/@-](\d+\.\d+\.\d+)", r"Bootstrap v(\d+\.\d+\.\d+)"],
            &[
                ("3.0.0", "3.4.1", "CVE-2018-14041/CVE-2019-8331: XSS through data attributes"),
                ("4.0.0", "4.3.1", "CVE-2019-8331: XSS in tooltip/popover data-template"),
            ],
        ),
        rule(
            "Lodash",
            &[r"(?i)lodash(?:\.js)?[/@-](\d+\.\d+\.\d+)"],
            &[("0.0.0", "4.17.21", "CVE-2021-23337: command injection through template")],
        ),
        rule(
            "Moment.js",
            &[r"(?i)moment(?:\.js)?[/@-](\d+\.\d+\.\d+)"],
            &[("0.0.0", "2.29.4", "CVE-2022-31129: ReDoS in RFC 2822 date parsing")],
        ),
    ]
});

/// Fingerprints the already-fetched page. No network access happens here.
///
/// `dns_cdn` is the provider found from DNS records, used when headers and body
/// carry no CDN signature.
pub fn run_fingerprint_scan(page: &HeadersResult, target_host: &str, dns_cdn: Option<&str>) -> FingerprintResult {
    info!(target = %target_host, "Starting fingerprint scan.");

    let header_corpus = serialize_headers(&page.headers);
    let full_corpus = format!("{header_corpus}\n{}", page.body);
    let document = Html::parse_document(&page.body);
    let page_is_https = page.final_url.as_deref().is_some_and(|u| u.starts_with("https://"));

    let cdn = first_match(&CDN_SIGNATURES, &full_corpus)
        .map(str::to_string)
        .or_else(|| dns_cdn.map(str::to_string));
    let waf = first_match(&WAF_SIGNATURES, &header_corpus).map(str::to_string);
    let technologies = detect_technologies(&page.headers, &page.body, &document, &full_corpus);
    let third_party_scripts = extract_third_party_scripts(&document, target_host);
    let vulnerable_libraries = detect_vulnerable_libraries(&document, &page.body);
    let mixed_content = if page_is_https { find_mixed_content(&document) } else { Vec::new() };

    info!(
        cdn = ?cdn,
        waf = ?waf,
        technologies = technologies.len(),
        third_party = third_party_scripts.len(),
        vulnerable = vulnerable_libraries.len(),
        "Fingerprint scan finished."
    );
    FingerprintResult { cdn, waf, technologies, third_party_scripts, vulnerable_libraries, mixed_content }
}

/// `name: value` lines, one per header value, names lowercase.
fn serialize_headers(headers: &BTreeMap<String, String>) -> String {
    headers
        .iter()
        .flat_map(|(name, value)| value.lines().map(move |v| format!("{name}: {v}")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn detect_technologies(
    headers: &BTreeMap<String, String>,
    body: &str,
    document: &Html,
    corpus: &str,
) -> Vec<Technology> {
    let cookies = headers.get("set-cookie").cloned().unwrap_or_default();
    let mut found: Vec<Technology> = Vec::new();

    debug!(total_rules = RULES.len(), "Applying fingerprinting rules.");
    for rule in RULES {
        let version = match &rule.signal {
            Signal::Header(name, re) => check_with_regex(headers.get(*name).map(String::as_str), re),
            Signal::MetaTag(name, re) => check_meta_tag(document, name, re),
            Signal::Body(re) => check_with_regex(Some(body), re),
            Signal::ScriptSrc(re) => check_attr(document, "script[src]", "src", re),
            Signal::LinkHref(re) => check_attr(document, "link[href]", "href", re),
            Signal::Cookie(re) => check_with_regex(Some(&cookies), re),
        };

        let Some(version) = version else { continue };
        let version = version.or_else(|| version_near(rule.tech_name, corpus));
        debug!(tech = %rule.tech_name, version = ?version, "Rule matched.");

        if let Some(existing) = found.iter_mut().find(|t| t.name == rule.tech_name) {
            if existing.version.is_none() && version.is_some() {
                existing.version = version;
                existing.confidence = 90;
            }
        } else {
            found.push(Technology {
                name: rule.tech_name.to_string(),
                category: rule.category.to_string(),
                confidence: if version.is_some() { 90 } else { 60 },
                version,
            });
        }
    }
    found
}

/// One `name[/-]x.y[.z]` pattern per technology named in [`RULES`].
static VERSION_NEAR: Lazy<BTreeMap<&'static str, Regex>> = Lazy::new(|| {
    RULES
        .iter()
        .filter_map(|rule| {
            let pattern = format!(r"(?i){}[/-]?v?(\d+\.\d+(?:\.\d+)?)", regex::escape(rule.tech_name));
            Regex::new(&pattern).ok().map(|re| (rule.tech_name, re))
        })
        .collect()
});

/// Opportunistic version lookup for `tech_name` anywhere in the corpus.
fn version_near(tech_name: &str, corpus: &str) -> Option<String> {
    VERSION_NEAR
        .get(tech_name)?
        .captures(corpus)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Applies a regex to an optional string slice.
///
/// `Some(Some(version))` if a version was captured, `Some(None)` if the pattern
/// matched without a version, `None` if it did not match at all.
fn check_with_regex(text_option: Option<&str>, re: &Regex) -> Option<Option<String>> {
    text_option.and_then(|text| {
        re.captures(text).map(|caps| {
            caps.get(1)
                .map(|m| m.as_str().trim_end_matches('.').to_string())
                .filter(|s| !s.is_empty())
        })
    })
}

fn check_meta_tag(doc: &Html, name: &str, re: &Regex) -> Option<Option<String>> {
    let selector = Selector::parse(&format!("meta[name='{name}']")).ok()?;
    let content = doc.select(&selector).next().and_then(|el| el.value().attr("content"));
    check_with_regex(content, re)
}

/// First element attribute matching the regex.
fn check_attr(doc: &Html, selector: &str, attr: &str, re: &Regex) -> Option<Option<String>> {
    let selector = Selector::parse(selector).ok()?;
    doc.select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .find_map(|value| check_with_regex(Some(value), re))
}

/// Absolute `https://` scripts whose host differs from the scanned host.
pub fn extract_third_party_scripts(document: &Html, target_host: &str) -> Vec<ThirdPartyScript> {
    let Ok(selector) = Selector::parse("script[src]") else { return Vec::new() };
    let mut scripts: Vec<ThirdPartyScript> = Vec::new();

    for el in document.select(&selector) {
        let Some(src) = el.value().attr("src").map(str::trim) else { continue };
        if !src.starts_with("https://") {
            continue;
        }
        let Some(host) = Url::parse(src).ok().and_then(|u| u.host_str().map(str::to_ascii_lowercase)) else {
            continue;
        };
        if host.eq_ignore_ascii_case(target_host) || scripts.iter().any(|s| s.src == src) {
            continue;
        }
        let high_risk = HIGH_RISK_SCRIPT_HOSTS.contains(&host.as_str());
        debug!(src, high_risk, "Third-party script found.");
        scripts.push(ThirdPartyScript {
            src: src.to_string(),
            host,
            high_risk,
            has_integrity: el.value().attr("integrity").is_some_and(|v| !v.trim().is_empty()),
        });
    }
    scripts
}

/// Matches script URLs and the inline body against the library advisory table.
pub fn detect_vulnerable_libraries(document: &Html, body: &str) -> Vec<VulnerableLibrary> {
    let script_srcs = Selector::parse("script[src]")
        .map(|sel| {
            document
                .select(&sel)
                .filter_map(|el| el.value().attr("src"))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();
    let corpus = format!("{script_srcs}\n{body}");

    LIBRARY_RULES
        .iter()
        .filter_map(|rule| {
            let version = rule
                .patterns
                .iter()
                .find_map(|re| re.captures(&corpus).and_then(|c| c.get(1)).map(|m| m.as_str().to_string()))?;
            let parsed = parse_version(&version)?;
            let (_, fixed, advisory) = rule.advisories.iter().find(|(introduced, fixed, _)| {
                matches!((parse_version(introduced), parse_version(fixed)), (Some(lo), Some(hi)) if parsed >= lo && parsed < hi)
            })?;
            debug!(library = rule.name, version = %version, "Vulnerable library version detected.");
            Some(VulnerableLibrary {
                name: rule.name.to_string(),
                version,
                fixed_in: fixed.to_string(),
                advisory: advisory.to_string(),
            })
        })
        .collect()
}

fn parse_version(raw: &str) -> Option<(u64, u64, u64)> {
    let mut parts = raw.split('.').map(|p| p.parse::<u64>());
    let major = parts.next()?.ok()?;
    let minor = parts.next().and_then(Result::ok).unwrap_or(0);
    let patch = parts.next().and_then(Result::ok).unwrap_or(0);
    Some((major, minor, patch))
}

/// Plain-HTTP subresources on a page served over HTTPS.
fn find_mixed_content(document: &Html) -> Vec<String> {
    let targets = [
        ("script[src]", "src"),
        ("iframe[src]", "src"),
        ("img[src]", "src"),
        ("link[rel='stylesheet'][href]", "href"),
    ];
    let mut found = Vec::new();
    for (selector, attr) in targets {
        let Ok(sel) = Selector::parse(selector) else { continue };
        for value in document.select(&sel).filter_map(|el| el.value().attr(attr)) {
            if value.trim_start().starts_with("http://") && !found.iter().any(|f: &String| f == value) {
                found.push(value.to_string());
            }
        }
    }
    found
}
