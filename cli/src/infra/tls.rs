//! Certificate verification for server connections.
//!
//! Chain validation runs against the webpki root set; the result, together
//! with the parsed subject and issuer, goes through the trust decision in
//! `domain::trust`. Handshake signatures are always checked.

use std::collections::HashMap;
use std::sync::Arc;

use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, WebPkiSupportedAlgorithms};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};

use crate::domain::error::TransportError;
use crate::domain::server::ServerAdminRecord;
use crate::domain::settings::TlsSettings;
use crate::domain::trust::{ChainStatus, PresentedCertificate, TrustDecision, evaluate};

#[derive(Debug)]
pub struct ShutdownCertVerifier {
    tls: TlsSettings,
    /// Lower-cased host → CN expected when TLS errors are ignored.
    expected_names: HashMap<String, String>,
    webpki: Arc<WebPkiServerVerifier>,
    algorithms: WebPkiSupportedAlgorithms,
}

impl ShutdownCertVerifier {
    /// # Errors
    ///
    /// Returns `TransportError::Tls` if the chain verifier cannot be built.
    pub fn new(
        tls: TlsSettings,
        expected_names: impl IntoIterator<Item = (String, String)>,
        provider: Arc<CryptoProvider>,
    ) -> Result<Self, TransportError> {
        let roots = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        let webpki = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider.clone())
            .build()
            .map_err(|e| TransportError::Tls(e.to_string()))?;
        Ok(Self {
            tls,
            expected_names: expected_names
                .into_iter()
                .map(|(host, cn)| (host.to_ascii_lowercase(), cn))
                .collect(),
            webpki,
            algorithms: provider.signature_verification_algorithms,
        })
    }

    fn expected_name(&self, host: &str) -> String {
        self.expected_names
            .get(&host.to_ascii_lowercase())
            .cloned()
            .unwrap_or_else(|| host.to_string())
    }
}

impl ServerCertVerifier for ShutdownCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let chain = match self.webpki.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        ) {
            Ok(_) => ChainStatus::Valid,
            Err(e) => ChainStatus::PolicyErrors(e.to_string()),
        };
        let host = server_name.to_str();
        let cert = describe_certificate(end_entity);

        match evaluate(self.tls, &self.expected_name(&host), &cert, &chain) {
            TrustDecision::Accept => {
                if self.tls.accept_any_certificate {
                    tracing::warn!(
                        server = %host,
                        subject = %cert.subject,
                        "accepting certificate without validation (AcceptAnyCertificate)"
                    );
                } else if chain != ChainStatus::Valid {
                    tracing::info!(
                        server = %host,
                        subject = %cert.subject,
                        issuer = %cert.issuer,
                        "accepted installer certificate (IgnoreSslErrors)"
                    );
                }
                Ok(ServerCertVerified::assertion())
            }
            TrustDecision::Reject { reason } => {
                tracing::warn!(server = %host, "rejected server certificate. {reason}");
                Err(rustls::Error::General(format!(
                    "certificate for {host} rejected: {}",
                    cert.subject
                )))
            }
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

/// Subject and issuer in `C=.., O=.., CN=..` form.
#[must_use]
pub fn describe_certificate(der: &CertificateDer<'_>) -> PresentedCertificate {
    match x509_parser::parse_x509_certificate(der.as_ref()) {
        Ok((_, cert)) => PresentedCertificate {
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
        },
        Err(e) => PresentedCertificate {
            subject: format!("<unparseable certificate: {e}>"),
            issuer: String::new(),
        },
    }
}

/// Client TLS configuration shared by every server connection.
///
/// # Errors
///
/// Returns `TransportError::Tls` if the provider rejects the default
/// protocol versions or the verifier cannot be built.
pub fn client_config(
    tls: TlsSettings,
    records: &[ServerAdminRecord],
) -> Result<ClientConfig, TransportError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let verifier = ShutdownCertVerifier::new(
        tls,
        records
            .iter()
            .map(|r| (r.host.clone(), r.cert_name.clone())),
        provider.clone(),
    )?;
    Ok(ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| TransportError::Tls(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth())
}
