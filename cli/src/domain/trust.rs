//! Certificate trust decision for server connections.
//!
//! The TLS layer parses the presented certificate and runs the platform
//! chain validation; this module decides what to make of the result.

use crate::domain::settings::TlsSettings;

/// Issuer of the self-signed certificates vSphere hosts ship with.
pub const VMWARE_INSTALLER_ISSUER: &str = "O=VMware Installer";

/// Subject and issuer of the certificate a server presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedCertificate {
    pub subject: String,
    pub issuer: String,
}

/// Outcome of the platform's own chain validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStatus {
    Valid,
    PolicyErrors(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustDecision {
    Accept,
    Reject { reason: String },
}

impl TrustDecision {
    #[must_use]
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Decide whether to trust a server certificate.
///
/// - `accept_any_certificate` accepts everything (explicit debug mode).
/// - With `ignore_ssl_errors`, a certificate issued by the VMware installer
///   whose subject names the expected CN is accepted regardless of chain
///   errors.
/// - Otherwise the certificate is accepted only if the chain validated.
#[must_use]
pub fn evaluate(
    tls: TlsSettings,
    expected_cn: &str,
    cert: &PresentedCertificate,
    chain: &ChainStatus,
) -> TrustDecision {
    if tls.accept_any_certificate {
        return TrustDecision::Accept;
    }
    if tls.ignore_ssl_errors && matches_installer_certificate(expected_cn, cert) {
        return TrustDecision::Accept;
    }
    match chain {
        ChainStatus::Valid => TrustDecision::Accept,
        ChainStatus::PolicyErrors(errors) => TrustDecision::Reject {
            reason: format!(
                "Details of the certificate provided by the remote party are as follows:\n\
                 Subject: {}\n\
                 Issuer: {}\n\
                 The value of the policy errors was {errors}.",
                cert.subject, cert.issuer
            ),
        },
    }
}

fn matches_installer_certificate(expected_cn: &str, cert: &PresentedCertificate) -> bool {
    !expected_cn.is_empty()
        && cert.issuer.trim().eq_ignore_ascii_case(VMWARE_INSTALLER_ISSUER)
        && cert.subject.contains(&format!("CN={expected_cn}"))
}
