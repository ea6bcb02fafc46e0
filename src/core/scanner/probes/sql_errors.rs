// src/core/scanner/probes/sql_errors.rs

//! Error-based SQL fingerprinting: one quote character, no payloads that could write.

use crate::core::models::SqlErrorOutcome;
use crate::core::scanner::fingerprint_scanner::{compile_table, SignatureTable};
use crate::core::scanner::http_fetcher::HttpFetcher;
use crate::core::scanner::probes::{evidence_from, snippet_around};
use crate::core::validation::Target;
use once_cell::sync::Lazy;
use reqwest::Method;
use tracing::{debug, info, warn};

pub const SQL_PARAMETER: &str = "id";

/// Database error signatures. Vendor-specific entries come before the generic ones.
static SQL_ERROR_SIGNATURES: Lazy<SignatureTable> = Lazy::new(|| {
    compile_table(&[
        (
            "MySQL",
            &[
                r"(?i)you have an error in your sql syntax",
                r"(?i)check the manual that corresponds to your (mysql|mariadb) server version",
                r"(?i)warning: mysqli?_",
                r"(?i)mysql_fetch_(array|assoc|row)\(",
                r"MySqlException",
            ],
        ),
        (
            "PostgreSQL",
            &[
                r"(?i)pg_query\(\)",
                r"(?i)unterminated quoted string at or near",
                r"PSQLException",
                r"(?i)postgresql.{0,40}error",
            ],
        ),
        (
            "Microsoft SQL Server",
            &[
                r"(?i)unclosed quotation mark after the character string",
                r"(?i)microsoft ole db provider for (sql server|odbc drivers)",
                r"(?i)\[sql server\]",
                r"System\.Data\.SqlClient\.SqlException",
            ],
        ),
        ("Oracle", &[r"\bORA-\d{5}", r"(?i)oracle.{0,20}driver", r"(?i)quoted string not properly terminated"]),
        ("SQLite", &[r"(?i)sqlite3?::", r"(?i)sqlite3\.operationalerror", r"SQLITE_ERROR", r"(?i)sqlite/jdbcdriver"]),
        ("Generic SQL", &[r"(?i)sql syntax error", r"(?i)syntax error", r"(?i)unclosed quotation"]),
    ])
});

/// First matching `(engine, signature)` in table order.
pub fn match_sql_error(body: &str) -> Option<(&'static str, String)> {
    SQL_ERROR_SIGNATURES.iter().find_map(|(engine, patterns)| {
        patterns
            .iter()
            .find_map(|re| re.find(body))
            .map(|m| (*engine, m.as_str().to_string()))
    })
}

/// GETs the target with `?id='` and looks for database error text.
///
/// A signature already present in `baseline` (the unmodified page) is not
/// attributed to the injected quote.
pub async fn probe_sql_errors(fetcher: &HttpFetcher, target: &Target, baseline: &str) -> SqlErrorOutcome {
    let mut url = target.url.clone();
    url.query_pairs_mut().append_pair(SQL_PARAMETER, "'");
    let tested_url = url.to_string();
    info!(url = %tested_url, "Starting SQL error probe.");

    let mut outcome = SqlErrorOutcome {
        tested_url: tested_url.clone(),
        parameter: SQL_PARAMETER.to_string(),
        status: None,
        vulnerable: false,
        engine: None,
        signature: None,
        evidence: None,
        error: None,
    };

    let timeout = fetcher.config().probe_timeout;
    let response = match fetcher.probe(Method::GET, &tested_url, timeout, &[]).await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "SQL error probe failed.");
            outcome.error = Some(e);
            return outcome;
        }
    };
    outcome.status = Some(response.status);

    let Some((engine, signature)) = match_sql_error(&response.body) else {
        debug!(status = response.status, "No database error signature in response.");
        return outcome;
    };
    if match_sql_error(baseline).is_some_and(|(_, base)| base == signature) {
        debug!(engine, "Signature also present on the unmodified page, ignoring.");
        return outcome;
    }

    info!(engine, signature = %signature, "Database error disclosed.");
    let snippet = snippet_around(&response.body, &signature, 200);
    outcome.evidence = Some(evidence_from(
        fetcher,
        "GET",
        &response,
        &snippet,
        format!("A single quote in '{SQL_PARAMETER}' produces a {engine} error message, suggesting unparameterized SQL."),
        vec![
            format!("Open {tested_url}"),
            format!("Observe the database error text: {signature}"),
        ],
    ));
    outcome.vulnerable = true;
    outcome.engine = Some(engine.to_string());
    outcome.signature = Some(signature);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ScanConfig;
    use crate::core::test_support::{response, serve};

    #[test]
    fn vendor_signatures_win_over_generic() {
        let (engine, _) = match_sql_error("You have an error in your SQL syntax; check the manual").unwrap();
        assert_eq!(engine, "MySQL");
        let (engine, _) = match_sql_error("Unclosed quotation mark after the character string ''.").unwrap();
        assert_eq!(engine, "Microsoft SQL Server");
    }

    #[test]
    fn oracle_error_codes() {
        let (engine, signature) = match_sql_error("<b>ORA-01756: quoted string not properly terminated</b>").unwrap();
        assert_eq!(engine, "Oracle");
        assert_eq!(signature, "ORA-01756");
        assert!(match_sql_error("ORA-123").is_none());
    }

    #[test]
    fn generic_fallbacks() {
        assert_eq!(match_sql_error("near \"'\": syntax error").map(|m| m.0), Some("Generic SQL"));
        assert!(match_sql_error("<html>Welcome</html>").is_none());
    }

    #[tokio::test]
    async fn reports_engine_for_error_page() {
        let base = serve(|_, path| {
            if path.contains("id=%27") {
                response(500, &[], "Warning: pg_query(): Query failed: ERROR: unterminated quoted string at or near \"'\"")
            } else {
                response(200, &[], "<html>ok</html>")
            }
        })
        .await;
        let fetcher = HttpFetcher::new(&ScanConfig::default(), None).unwrap();
        let target = Target { url: url::Url::parse(&format!("{base}/item")).unwrap(), host: "127.0.0.1".to_string() };

        let outcome = probe_sql_errors(&fetcher, &target, "<html>ok</html>").await;

        assert!(outcome.vulnerable);
        assert_eq!(outcome.engine.as_deref(), Some("PostgreSQL"));
        assert_eq!(outcome.status, Some(500));
        assert!(outcome.evidence.is_some());
    }

    #[tokio::test]
    async fn baseline_errors_are_not_attributed() {
        let page = "<p>Docs: a syntax error is reported when...</p>";
        let base = serve(move |_, _| response(200, &[], page)).await;
        let fetcher = HttpFetcher::new(&ScanConfig::default(), None).unwrap();
        let target = Target { url: url::Url::parse(&base).unwrap(), host: "127.0.0.1".to_string() };

        let outcome = probe_sql_errors(&fetcher, &target, page).await;

        assert!(!outcome.vulnerable);
        assert!(outcome.evidence.is_none());
    }
}
