// src/core/scanner/ssl_scanner.rs

use tracing::{debug, error, info};

use crate::core::config::ScanConfig;
use crate::core::models::SslResult;
use chrono::{DateTime, Utc};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{
    AlertDescription, ClientConfig, DigitallySignedStruct, PeerIncompatible, ProtocolVersion, RootCertStore,
    SignatureScheme,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use x509_parser::prelude::*;

const TLS_PORT: u16 = 443;

/// Why a TLS inspection produced no certificate data.
#[derive(Debug)]
struct InspectError {
    message: String,
    legacy_protocol_only: bool,
}

impl From<String> for InspectError {
    fn from(message: String) -> Self {
        Self { message, legacy_protocol_only: false }
    }
}

/// Runs full WebPKI verification, remembers the verdict and accepts the
/// certificate regardless, so an invalid chain still yields certificate data.
#[derive(Debug)]
struct RecordingVerifier {
    inner: Arc<WebPkiServerVerifier>,
    outcome: Mutex<Option<Result<(), String>>>,
}

impl RecordingVerifier {
    fn new(provider: Arc<CryptoProvider>) -> Result<Self, String> {
        let roots = RootCertStore { roots: webpki_roots::TLS_SERVER_ROOTS.to_vec() };
        let inner = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider)
            .build()
            .map_err(|e| format!("Verifier Error: {e}"))?;
        Ok(Self { inner, outcome: Mutex::new(None) })
    }

    fn outcome(&self) -> Option<Result<(), String>> {
        self.outcome.lock().ok().and_then(|slot| slot.clone())
    }
}

impl ServerCertVerifier for RecordingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let verdict = self
            .inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
            .map(|_| ())
            .map_err(|e| e.to_string());
        debug!(verified = verdict.is_ok(), "Certificate chain verification recorded.");
        if let Ok(mut slot) = self.outcome.lock() {
            *slot = Some(verdict);
        }
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// Inspects the certificate and negotiated parameters on port 443.
///
/// Always returns a result: connection failures and timeouts produce
/// `valid = false` with `error` set.
pub async fn run_ssl_scan(host: &str, config: &ScanConfig) -> SslResult {
    info!(target = %host, "Starting SSL/TLS scan.");
    let result = match inspect_tls(host, TLS_PORT, config.tls_timeout).await {
        Ok(result) => result,
        Err(e) => {
            error!(target = %host, error = %e.message, legacy = e.legacy_protocol_only, "SSL/TLS scan failed.");
            SslResult { legacy_protocol_only: e.legacy_protocol_only, ..SslResult::failed(e.message) }
        }
    };
    info!(
        valid = result.valid,
        protocol = ?result.protocol,
        days_until_expiry = ?result.days_until_expiry,
        "SSL/TLS scan finished."
    );
    result
}

async fn inspect_tls(host: &str, port: u16, timeout: Duration) -> Result<SslResult, InspectError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let verifier = Arc::new(RecordingVerifier::new(provider.clone())?);

    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| format!("TLS Config Error: {e}"))?
        .dangerous()
        .with_custom_certificate_verifier(verifier.clone())
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(tls_config));
    let server_name = ServerName::try_from(host.to_string()).map_err(|e| format!("Invalid server name {host}: {e}"))?;

    let handshake = async {
        debug!(target = %host, port, "Connecting TCP stream.");
        let tcp = TcpStream::connect((host, port))
            .await
            .map_err(|e| InspectError::from(format!("TCP Connection Error: {e}")))?;
        debug!(target = %host, "Performing TLS handshake.");
        connector.connect(server_name, tcp).await.map_err(|e| {
            if refuses_modern_versions(&e) {
                InspectError {
                    message: format!("Server only offers TLS versions older than 1.2 ({e})"),
                    legacy_protocol_only: true,
                }
            } else {
                InspectError::from(format!("TLS Handshake Error: {e}"))
            }
        })
    };
    let stream = tokio::time::timeout(timeout, handshake)
        .await
        .map_err(|_| format!("TLS connection timed out after {timeout:?}"))??;

    let (_, connection) = stream.get_ref();
    let protocol = connection.protocol_version().map(protocol_label);
    let cipher = connection.negotiated_cipher_suite().map(|suite| format!("{:?}", suite.suite()));
    let leaf = connection
        .peer_certificates()
        .and_then(|chain| chain.first())
        .ok_or_else(|| "TLS connection succeeded, but no peer certificate was provided".to_string())?;

    let (_, x509) = parse_x509_certificate(leaf.as_ref()).map_err(|e| format!("X.509 Parse Error: {e}"))?;
    info!(subject = %x509.subject(), issuer = %x509.issuer(), "Successfully parsed certificate.");

    let verdict = verifier.outcome();
    let chain_verified = matches!(verdict, Some(Ok(())));
    let verification_error = match verdict {
        Some(Err(e)) => Some(e),
        None => Some("Certificate verification did not run".to_string()),
        Some(Ok(())) => None,
    };

    let validity = x509.validity();
    let not_before = asn1_time_to_chrono_utc(&validity.not_before);
    let not_after = asn1_time_to_chrono_utc(&validity.not_after);
    let now = Utc::now();
    let in_window = now >= not_before && now <= not_after;

    Ok(SslResult {
        valid: chain_verified && in_window,
        handshake_completed: true,
        chain_verified,
        verification_error,
        issuer: preferred_name(x509.issuer()),
        subject: preferred_name(x509.subject()),
        valid_from: Some(not_before),
        valid_to: Some(not_after),
        days_until_expiry: Some(days_between(now, not_after)),
        protocol,
        cipher,
        self_signed: x509.issuer().to_string() == x509.subject().to_string(),
        alt_names: dns_alt_names(&x509),
        legacy_protocol_only: false,
        error: None,
    })
}

/// Only TLS 1.2 and 1.3 are offered, so a version refusal means the server is stuck on older ones.
fn refuses_modern_versions(error: &std::io::Error) -> bool {
    let Some(tls_error) = error.get_ref().and_then(|inner| inner.downcast_ref::<rustls::Error>()) else {
        return false;
    };
    matches!(
        tls_error,
        rustls::Error::AlertReceived(AlertDescription::ProtocolVersion)
            | rustls::Error::PeerIncompatible(
                PeerIncompatible::ServerDoesNotSupportTls12Or13
                    | PeerIncompatible::ServerTlsVersionIsDisabledByOurConfig
            )
    )
}

/// `TLSv1.3` style label for a negotiated version.
fn protocol_label(version: ProtocolVersion) -> String {
    match version {
        ProtocolVersion::TLSv1_3 => "TLSv1.3".to_string(),
        ProtocolVersion::TLSv1_2 => "TLSv1.2".to_string(),
        ProtocolVersion::TLSv1_1 => "TLSv1.1".to_string(),
        ProtocolVersion::TLSv1_0 => "TLSv1.0".to_string(),
        other => format!("{other:?}"),
    }
}

/// Organization, then Common Name, then the raw distinguished name.
fn preferred_name(name: &X509Name<'_>) -> Option<String> {
    let text = |attr: Option<&AttributeTypeAndValue<'_>>| attr.and_then(|a| a.as_str().ok()).map(str::to_string);
    text(name.iter_organization().next())
        .or_else(|| text(name.iter_common_name().next()))
        .or_else(|| Some(name.to_string()).filter(|raw| !raw.is_empty()))
}

fn dns_alt_names(x509: &X509Certificate<'_>) -> Vec<String> {
    match x509.subject_alternative_name() {
        Ok(Some(san)) => san
            .value
            .general_names
            .iter()
            .filter_map(|name| match name {
                GeneralName::DNSName(dns) => Some(dns.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Whole days from `now` until `expiry`, rounded down; negative once expired.
fn days_between(now: DateTime<Utc>, expiry: DateTime<Utc>) -> i64 {
    let seconds = (expiry - now).num_seconds();
    seconds.div_euclid(86_400)
}

fn asn1_time_to_chrono_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn protocol_labels_use_dotted_versions() {
        assert_eq!(protocol_label(ProtocolVersion::TLSv1_3), "TLSv1.3");
        assert_eq!(protocol_label(ProtocolVersion::TLSv1_2), "TLSv1.2");
    }

    #[test]
    fn days_until_expiry_floors_and_goes_negative() {
        let now = Utc::now();
        assert_eq!(days_between(now, now + chrono::Duration::hours(10 * 24 + 5)), 10);
        assert_eq!(days_between(now, now + chrono::Duration::hours(23)), 0);
        assert_eq!(days_between(now, now - chrono::Duration::hours(1)), -1);
    }

    #[tokio::test]
    async fn handshake_failure_is_recorded_not_raised() {
        // A listener that accepts and immediately hangs up.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                drop(socket);
            }
        });

        let outcome = inspect_tls("127.0.0.1", port, Duration::from_secs(2)).await;

        let error = outcome.unwrap_err();
        assert!(error.message.contains("TLS Handshake Error"), "{}", error.message);
        assert!(!error.legacy_protocol_only);
        let result = SslResult::failed(error.message);
        assert!(!result.valid);
        assert!(!result.handshake_completed);
    }

    #[tokio::test]
    async fn protocol_version_alert_marks_legacy_only_server() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        // Reads the ClientHello and answers with a fatal protocol_version alert.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut hello = vec![0u8; 4096];
                let _ = socket.read(&mut hello).await;
                let _ = socket.write_all(&[0x15, 0x03, 0x01, 0x00, 0x02, 0x02, 0x46]).await;
                let _ = socket.flush().await;
            }
        });

        let error = inspect_tls("127.0.0.1", port, Duration::from_secs(2)).await.unwrap_err();

        assert!(error.legacy_protocol_only, "{}", error.message);
        assert!(error.message.contains("older than 1.2"), "{}", error.message);
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let error = inspect_tls("127.0.0.1", port, Duration::from_millis(300)).await.unwrap_err();
        assert!(error.message.contains("timed out"), "{}", error.message);
    }
}
