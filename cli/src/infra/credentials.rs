//! AES-256-GCM implementation of the `CredentialVault` port.
//!
//! The key is scoped to the local account: a random 32-byte file readable
//! only by its owner. Each blob's cipher key is `SHA-256(account key ‖
//! entropy)`, so a blob only opens with both. Blob layout: 12-byte nonce,
//! then ciphertext with the GCM tag.

use std::path::{Path, PathBuf};

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::application::ports::CredentialVault;
use crate::domain::error::CredentialError;
use crate::infra::config::write_owner_only;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

pub struct AesCredentialVault {
    account_key: [u8; KEY_LEN],
}

impl AesCredentialVault {
    /// Open an existing account key.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, or not 32 bytes.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("cannot read credential key {}", path.display()))?;
        let account_key: [u8; KEY_LEN] = bytes.as_slice().try_into().map_err(|_| {
            anyhow::anyhow!(
                "credential key {} must be {KEY_LEN} bytes, found {}",
                path.display(),
                bytes.len()
            )
        })?;
        Ok(Self { account_key })
    }

    /// Open the account key, generating it (mode 0600) when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be read or written.
    pub fn open_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::open(path);
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let key = Aes256Gcm::generate_key(OsRng);
        write_owner_only(path, key.as_slice(), true)
            .with_context(|| format!("cannot write {}", path.display()))?;
        tracing::info!(path = %path.display(), "generated credential key");
        let mut account_key = [0u8; KEY_LEN];
        account_key.copy_from_slice(&key);
        Ok(Self { account_key })
    }

    /// Vault over an in-memory key.
    #[must_use]
    pub fn from_key(account_key: [u8; KEY_LEN]) -> Self {
        Self { account_key }
    }

    fn cipher(&self, entropy: &[u8]) -> Aes256Gcm {
        let digest = Sha256::new()
            .chain_update(self.account_key)
            .chain_update(entropy)
            .finalize();
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&digest))
    }
}

/// Default key location: `~/.poweroff-guests/credential.key`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_key_path() -> Result<PathBuf> {
    Ok(crate::infra::config::app_dir()?.join("credential.key"))
}

impl CredentialVault for AesCredentialVault {
    fn decrypt(&self, blob: &[u8], entropy: &[u8]) -> Result<SecretString, CredentialError> {
        if blob.len() <= NONCE_LEN {
            return Err(CredentialError::Decrypt(format!(
                "blob of {} bytes is too short",
                blob.len()
            )));
        }
        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
        let plain = self
            .cipher(entropy)
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| {
                CredentialError::Decrypt(
                    "authentication failed (wrong account key or entropy)".to_string(),
                )
            })?;
        let text = String::from_utf8(plain)
            .map_err(|_| CredentialError::Decrypt("plaintext is not UTF-8".to_string()))?;
        Ok(SecretString::from(text))
    }

    fn encrypt(&self, password: &SecretString, entropy: &[u8]) -> Result<Vec<u8>, CredentialError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher(entropy)
            .encrypt(&nonce, password.expose_secret().as_bytes())
            .map_err(|e| CredentialError::Encrypt(e.to_string()))?;
        let mut blob = nonce.to_vec();
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }
}
