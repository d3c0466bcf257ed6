//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.
//!
//! Async ports return `Send` futures: in asynchronous mode every server's
//! shutdown runs as its own tokio task.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Output;

use anyhow::Result;
use secrecy::SecretString;

use crate::domain::cookie::SessionCookie;
use crate::domain::error::{CredentialError, TransportError};
use crate::domain::protocol::{HttpRequest, PingReply, ShutdownEvent};
use crate::domain::settings::RawSettings;

// ── Value Types ───────────────────────────────────────────────────────────────

/// What the transport hands back from one round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// Session cookie parsed from `Set-Cookie`, if the response carried one.
    pub cookie: Option<SessionCookie>,
    pub body: String,
}

impl TransportResponse {
    /// `2xx` and `3xx` complete a step; `4xx` and `5xx` are faults.
    #[must_use]
    pub fn is_fault_status(&self) -> bool {
        self.status >= 400
    }
}

// ── Configuration Port ────────────────────────────────────────────────────────

/// Abstracts where settings and credential blobs live.
pub trait ConfigStore {
    /// Load the flat key/value settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file cannot be read or parsed.
    fn load(&self) -> Result<RawSettings>;

    /// Location of the settings file.
    ///
    /// # Errors
    ///
    /// Returns an error if no location can be determined.
    fn path(&self) -> Result<PathBuf>;

    /// Read one encrypted credential blob.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn read_credential_file(&self, path: &Path) -> std::io::Result<Vec<u8>>;

    /// Write one encrypted credential blob, owner-readable only.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn write_credential_file(&self, path: &Path, blob: &[u8]) -> std::io::Result<()>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
pub trait CommandRunner: Send + Sync {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    fn run(&self, program: &str, args: &[&str]) -> impl Future<Output = Result<Output>> + Send;

    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: std::time::Duration,
    ) -> impl Future<Output = Result<Output>> + Send;
}

// ── Reachability Port ─────────────────────────────────────────────────────────

/// One network reachability probe (a single ping).
pub trait ReachabilityProbe: Send + Sync {
    /// Send one echo request to `host`.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe could not be performed at all; an
    /// unanswered ping is `Ok` with `success == false`.
    fn ping_once(&self, host: &str) -> impl Future<Output = Result<PingReply>> + Send;
}

// ── Transport Port ────────────────────────────────────────────────────────────

/// One request/response round trip with a managed server.
pub trait SessionTransport: Send + Sync {
    /// Send `request` with an optional body and return the response,
    /// whatever its HTTP status.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` when no response arrives: network or TLS
    /// faults, timeouts, or a request that cannot be built.
    fn send(
        &self,
        request: &HttpRequest,
        body: Option<&str>,
    ) -> impl Future<Output = std::result::Result<TransportResponse, TransportError>> + Send;
}

// ── Credential Port ───────────────────────────────────────────────────────────

/// Account-scoped encryption of stored passwords.
pub trait CredentialVault: Send + Sync {
    /// Decrypt a stored blob with the account key and the shared entropy.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Decrypt` if the blob is corrupt, was written
    /// by another account, or the entropy differs.
    fn decrypt(
        &self,
        blob: &[u8],
        entropy: &[u8],
    ) -> std::result::Result<SecretString, CredentialError>;

    /// Encrypt a password for storage.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Encrypt` if encryption fails.
    fn encrypt(
        &self,
        password: &SecretString,
        entropy: &[u8],
    ) -> std::result::Result<Vec<u8>, CredentialError>;
}

// ── Event Port ────────────────────────────────────────────────────────────────

/// Receives controller events; the production sink writes them to the log.
///
/// Must tolerate concurrent calls from several controllers.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &ShutdownEvent);
}
