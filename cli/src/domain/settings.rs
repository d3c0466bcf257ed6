//! Settings snapshot and the indexed server entry scan.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::error::ConfigError;

// ── Keys ─────────────────────────────────────────────────────────────────────

pub const KEY_SYNCHRONICITY: &str = "Synchronicity";
pub const KEY_CREDENTIAL_ENTROPY: &str = "CredentialEntropy";
pub const KEY_IGNORE_SSL_ERRORS: &str = "IgnoreSslErrors";
pub const KEY_ACCEPT_ANY_CERTIFICATE: &str = "AcceptAnyCertificate";
pub const KEY_LOG_FILE_PATH: &str = "LogFilePath";
pub const KEY_DEBUG: &str = "Debug";
pub const KEY_REACHABILITY_POLICY: &str = "ReachabilityPolicy";
pub const KEY_REQUEST_TIMEOUT_SECS: &str = "RequestTimeoutSecs";
pub const KEY_CREDENTIAL_KEY_FILE: &str = "CredentialKeyFile";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ── Raw key/value settings ───────────────────────────────────────────────────

/// Flat key/value settings as read from the settings file.
///
/// Empty values are indistinguishable from missing keys.
#[derive(Debug, Clone, Default)]
pub struct RawSettings {
    values: BTreeMap<String, String>,
}

impl RawSettings {
    #[must_use]
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    /// Look up a key, treating empty values as absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// All configured values, used to validate password file targets.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.values.values().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawSettings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ── Enumerated settings ──────────────────────────────────────────────────────

/// How the dispatcher runs the queue. Read once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Synchronicity {
    #[default]
    Synchronous,
    Asynchronous,
}

/// What a failed reachability precheck does to the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReachabilityPolicy {
    /// Log the failure and carry on with the protocol.
    #[default]
    Advisory,
    /// Abort the attempt for that server.
    FailFast,
}

/// Certificate trust settings consumed by the TLS verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TlsSettings {
    pub ignore_ssl_errors: bool,
    pub accept_any_certificate: bool,
}

/// Where the run log goes and how verbose it is.
///
/// Read leniently, ahead of full validation, so a malformed setting can
/// itself be logged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogTarget {
    pub file: Option<PathBuf>,
    pub debug: bool,
}

impl LogTarget {
    #[must_use]
    pub fn from_raw(raw: &RawSettings) -> Self {
        Self {
            file: raw.get(KEY_LOG_FILE_PATH).map(PathBuf::from),
            debug: parse_bool(raw, KEY_DEBUG).unwrap_or(false),
        }
    }
}

// ── Settings snapshot ────────────────────────────────────────────────────────

/// Process-wide settings, parsed once and passed explicitly.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub synchronicity: Synchronicity,
    pub reachability: ReachabilityPolicy,
    pub tls: TlsSettings,
    pub credential_entropy: Option<Vec<u8>>,
    pub credential_key_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub debug: bool,
    pub request_timeout: Duration,
}

impl Settings {
    /// Parse the non-server settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for malformed enums, booleans,
    /// numbers, or entropy lists.
    pub fn from_raw(raw: &RawSettings) -> Result<Self, ConfigError> {
        let synchronicity = match raw.get(KEY_SYNCHRONICITY) {
            None => Synchronicity::default(),
            Some(v) if v.eq_ignore_ascii_case("synchronous") => Synchronicity::Synchronous,
            Some(v) if v.eq_ignore_ascii_case("asynchronous") => Synchronicity::Asynchronous,
            Some(v) => return Err(invalid(KEY_SYNCHRONICITY, v, "Synchronous, Asynchronous")),
        };

        let reachability = match raw.get(KEY_REACHABILITY_POLICY) {
            None => ReachabilityPolicy::default(),
            Some(v) if v.eq_ignore_ascii_case("advisory") => ReachabilityPolicy::Advisory,
            Some(v) if v.eq_ignore_ascii_case("failfast") => ReachabilityPolicy::FailFast,
            Some(v) => return Err(invalid(KEY_REACHABILITY_POLICY, v, "Advisory, FailFast")),
        };

        let request_timeout = match raw.get(KEY_REQUEST_TIMEOUT_SECS) {
            None => DEFAULT_REQUEST_TIMEOUT,
            Some(v) => match v.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(invalid(KEY_REQUEST_TIMEOUT_SECS, v, "a positive number of seconds")),
            },
        };

        Ok(Self {
            synchronicity,
            reachability,
            tls: TlsSettings {
                ignore_ssl_errors: parse_bool(raw, KEY_IGNORE_SSL_ERRORS)?,
                accept_any_certificate: parse_bool(raw, KEY_ACCEPT_ANY_CERTIFICATE)?,
            },
            credential_entropy: raw
                .get(KEY_CREDENTIAL_ENTROPY)
                .map(parse_entropy)
                .transpose()?,
            credential_key_file: raw.get(KEY_CREDENTIAL_KEY_FILE).map(PathBuf::from),
            log_file: raw.get(KEY_LOG_FILE_PATH).map(PathBuf::from),
            debug: parse_bool(raw, KEY_DEBUG)?,
            request_timeout,
        })
    }

    /// The entropy value, required once any server is configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `CredentialEntropy` is not set.
    pub fn require_entropy(&self) -> Result<&[u8], ConfigError> {
        self.credential_entropy
            .as_deref()
            .ok_or_else(|| ConfigError::Missing {
                key: KEY_CREDENTIAL_ENTROPY.to_string(),
            })
    }
}

fn invalid(key: &str, value: &str, valid: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        valid: valid.to_string(),
    }
}

fn parse_bool(raw: &RawSettings, key: &str) -> Result<bool, ConfigError> {
    match raw.get(key) {
        None => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
        Some(v) => Err(invalid(key, v, "true, false")),
    }
}

/// Parse a comma-separated list of byte values, e.g. `"4,8,15,16,23,42"`.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if any element is not a `u8`.
pub fn parse_entropy(value: &str) -> Result<Vec<u8>, ConfigError> {
    value
        .split(',')
        .map(|n| {
            n.trim().parse::<u8>().map_err(|_| {
                invalid(
                    KEY_CREDENTIAL_ENTROPY,
                    value,
                    "comma-separated byte values (0-255)",
                )
            })
        })
        .collect()
}

// ── Indexed server entries ───────────────────────────────────────────────────

/// One complete `Controller{n}`…`ServerUserPwFile{n}` group, still unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEntry {
    pub index: usize,
    pub controller: String,
    pub host: String,
    pub port: String,
    pub user: String,
    pub password_file: String,
    pub cert_name: Option<String>,
}

/// Scan `Controller0`, `Server0`, … upwards and stop at the first index with
/// any required field missing. That index and everything above it is ignored.
#[must_use]
pub fn server_entries(raw: &RawSettings) -> Vec<ServerEntry> {
    let mut entries = Vec::new();
    for index in 0.. {
        let field = |prefix: &str| raw.get(&format!("{prefix}{index}")).map(str::to_string);
        let (Some(controller), Some(host), Some(port), Some(user), Some(password_file)) = (
            field("Controller"),
            field("Server"),
            field("ServerPort"),
            field("ServerUser"),
            field("ServerUserPwFile"),
        ) else {
            break;
        };
        entries.push(ServerEntry {
            index,
            controller,
            host,
            port,
            user,
            password_file,
            cert_name: field("ServerCertName"),
        });
    }
    entries
}

// ── Unit tests ───────────────────────────────────────────────────────────────
