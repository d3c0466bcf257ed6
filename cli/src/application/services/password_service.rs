//! Application service: credential file creation.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};

use crate::application::ports::{ConfigStore, CredentialVault};
use crate::domain::error::{ConfigError, CredentialError};
use crate::domain::settings::{RawSettings, Settings, server_entries};

/// Configured `ServerUserPwFile{n}` paths, in index order.
#[must_use]
pub fn configured_password_files(raw: &RawSettings) -> Vec<PathBuf> {
    server_entries(raw)
        .into_iter()
        .map(|e| PathBuf::from(e.password_file))
        .collect()
}

/// Find the configured password file that `target` names.
///
/// Paths are compared lexically and case-insensitively after dropping `.`
/// components and resolving `..`.
#[must_use]
pub fn match_password_file(raw: &RawSettings, target: &Path) -> Option<PathBuf> {
    let wanted = normalise(target);
    configured_password_files(raw)
        .into_iter()
        .find(|p| normalise(p) == wanted)
}

/// Reject anything outside printable ASCII (0x20..=0x7E).
///
/// # Errors
///
/// Returns `CredentialError::NonPrintable` for any other character, and
/// `CredentialError::NotSet` for an empty password.
pub fn validate_password(password: &SecretString) -> Result<(), CredentialError> {
    let value = password.expose_secret();
    if value.is_empty() {
        return Err(CredentialError::NotSet {
            username: String::new(),
            blob_len: 0,
        });
    }
    if value.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
        Ok(())
    } else {
        Err(CredentialError::NonPrintable)
    }
}

/// Encrypt `password` and write it to the configured file that `target` names.
///
/// Returns the path written.
///
/// # Errors
///
/// Returns an error if `target` is not a configured password file, the
/// entropy is missing, the password is invalid, or the write fails.
pub fn create_password_file(
    store: &impl ConfigStore,
    vault: &impl CredentialVault,
    raw: &RawSettings,
    settings: &Settings,
    target: &Path,
    password: &SecretString,
) -> Result<PathBuf> {
    let path = match_password_file(raw, target).ok_or_else(|| ConfigError::InvalidValue {
        key: "password file".to_string(),
        value: target.display().to_string(),
        valid: configured_password_files(raw)
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })?;
    let entropy = settings.require_entropy()?;
    validate_password(password)?;

    let blob = vault.encrypt(password, entropy)?;
    store
        .write_credential_file(&path, &blob)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = blob.len(), "password file written");
    Ok(path)
}

fn normalise(path: &Path) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop();
            }
            other => parts.push(other.as_os_str().to_string_lossy().to_lowercase()),
        }
    }
    parts
}
