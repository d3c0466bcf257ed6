//! Server admin records and controller kinds.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::error::ConfigError;
use crate::domain::settings::ServerEntry;

/// Accepted spellings per kind, matched case-insensitively.
const VM_SESSION_TAGS: &[&str] = &["VMServerController", "vm-session"];
const HTTP_COOKIE_TAGS: &[&str] = &["FreeNASController", "http-cookie"];

/// The vendor protocol a server is shut down with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerKind {
    /// SOAP session protocol of a vSphere host.
    VmSession,
    /// Cookie-based web form protocol of a FreeNAS appliance.
    HttpCookie,
}

impl ControllerKind {
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::VmSession => VM_SESSION_TAGS[0],
            Self::HttpCookie => HTTP_COOKIE_TAGS[0],
        }
    }

    #[must_use]
    pub fn valid_tags() -> String {
        VM_SESSION_TAGS
            .iter()
            .chain(HTTP_COOKIE_TAGS)
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ControllerKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if VM_SESSION_TAGS.iter().any(|t| t.eq_ignore_ascii_case(s)) {
            Ok(Self::VmSession)
        } else if HTTP_COOKIE_TAGS.iter().any(|t| t.eq_ignore_ascii_case(s)) {
            Ok(Self::HttpCookie)
        } else {
            Err(())
        }
    }
}

/// Immutable descriptor of one managed server.
///
/// Built once at startup; the credential bytes are the encrypted blob as
/// stored on disk, never the decrypted secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerAdminRecord {
    pub index: usize,
    /// Raw controller tag from the settings; resolved when the queue is built.
    pub controller: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub credential_file: PathBuf,
    pub credential: Vec<u8>,
    pub entropy: Vec<u8>,
    /// CN expected in the server certificate when TLS errors are ignored.
    pub cert_name: String,
}

impl ServerAdminRecord {
    /// Resolve a scanned entry into a record.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the port is not a valid `u16`.
    pub fn from_entry(
        entry: ServerEntry,
        credential: Vec<u8>,
        entropy: &[u8],
    ) -> Result<Self, ConfigError> {
        let port = entry
            .port
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue {
                key: format!("ServerPort{}", entry.index),
                value: entry.port.clone(),
                valid: "a TCP port (1-65535)".to_string(),
            })?;
        Ok(Self {
            index: entry.index,
            cert_name: entry.cert_name.unwrap_or_else(|| entry.host.clone()),
            controller: entry.controller,
            host: entry.host,
            port,
            username: entry.user,
            credential_file: PathBuf::from(entry.password_file),
            credential,
            entropy: entropy.to_vec(),
        })
    }

    /// `https://host:port`, the base every protocol path is appended to.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("https://{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ServerAdminRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerAdminRecord")
            .field("index", &self.index)
            .field("controller", &self.controller)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("credential_file", &self.credential_file)
            .field("credential", &format_args!("<{} bytes>", self.credential.len()))
            .finish_non_exhaustive()
    }
}
