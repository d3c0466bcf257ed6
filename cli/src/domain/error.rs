//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Config errors ─────────────────────────────────────────────────────────────

/// Startup errors: missing or malformed settings, unknown controller kinds.
///
/// Always fatal. Raised before any server is contacted.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {key}")]
    Missing { key: String },

    #[error("Invalid value for {key}: {value}\n\nValid values: {valid}")]
    InvalidValue {
        key: String,
        value: String,
        valid: String,
    },

    #[error("Unknown controller kind '{kind}' for server {index}. Valid kinds: {valid}")]
    UnknownControllerKind {
        index: usize,
        kind: String,
        valid: String,
    },

    #[error("Cannot read credential file {path} for server {index}: {reason}")]
    CredentialFile {
        index: usize,
        path: String,
        reason: String,
    },

    #[error("Cannot read settings from {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

// ── Credential errors ─────────────────────────────────────────────────────────

/// Errors raised while turning a stored credential into a usable secret.
///
/// Messages never contain decrypted material.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("The credentials were not correctly set. Username: '{username}' Password byte count: {blob_len}")]
    NotSet { username: String, blob_len: usize },

    #[error("Cannot decrypt credential: {0}")]
    Decrypt(String),

    #[error("Cannot encrypt credential: {0}")]
    Encrypt(String),

    #[error("Password may only contain printable ASCII characters")]
    NonPrintable,

    #[error("Server rejected the login: {0}")]
    Rejected(String),
}

// ── Transport errors ──────────────────────────────────────────────────────────

/// Network, TLS, and HTTP-level faults for one request/response round trip.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid request for {url}: {reason}")]
    InvalidRequest { url: String, reason: String },

    #[error("Response from {url} carried no usable session cookie")]
    MissingCookie { url: String },

    #[error("Response from {url} carried no {artifact}")]
    MissingArtifact { url: String, artifact: String },

    #[error("TLS client setup failed: {0}")]
    Tls(String),
}

// ── Template errors ───────────────────────────────────────────────────────────

/// A fixed request template is missing an insertion point.
///
/// Indicates a defect in the built-in templates, not a runtime input problem.
#[derive(Debug, Error)]
#[error("Template is missing the '{point}' insertion point")]
pub struct TemplateError {
    pub point: &'static str,
}

// ── Per-server shutdown errors ────────────────────────────────────────────────

/// Everything that can abort one server's shutdown attempt.
///
/// Caught at the controller boundary and converted into a failed outcome.
#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Could not reach server {server}. Aborting shutdown of server {server}")]
    Unreachable { server: String },

    #[error("Shutdown of {server} was not submitted: {reason}")]
    Incomplete { server: String, reason: String },
}

// ── Dispatch errors ───────────────────────────────────────────────────────────

/// Batch-level failures. Fatal to the whole run.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("A shutdown task failed unexpectedly: {0}")]
    Catastrophic(String),
}
