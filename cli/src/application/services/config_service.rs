//! Application service: configuration use-cases.

use std::path::PathBuf;

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::error::ConfigError;
use crate::domain::server::ServerAdminRecord;
use crate::domain::settings::{RawSettings, Settings, server_entries};

/// Load and validate the flat settings.
///
/// # Errors
///
/// Returns an error if the store cannot be read or a value is malformed.
pub fn load_settings(store: &impl ConfigStore) -> Result<(RawSettings, Settings)> {
    let raw = store.load()?;
    let settings = Settings::from_raw(&raw)?;
    Ok((raw, settings))
}

/// Build one record per complete `Controller{n}` group, reading each
/// encrypted credential file.
///
/// No entries means no records, and entropy is then not required.
///
/// # Errors
///
/// Returns `ConfigError` if the entropy is missing, a port is malformed, or a
/// credential file cannot be read.
pub fn load_server_records(
    store: &impl ConfigStore,
    raw: &RawSettings,
    settings: &Settings,
) -> Result<Vec<ServerAdminRecord>, ConfigError> {
    let entries = server_entries(raw);
    if entries.is_empty() {
        tracing::warn!("no complete server entries found in settings");
        return Ok(Vec::new());
    }
    let entropy = settings.require_entropy()?;

    entries
        .into_iter()
        .map(|entry| {
            let path = PathBuf::from(&entry.password_file);
            let blob =
                store
                    .read_credential_file(&path)
                    .map_err(|e| ConfigError::CredentialFile {
                        index: entry.index,
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    })?;
            let record = ServerAdminRecord::from_entry(entry, blob, entropy)?;
            tracing::info!(
                index = record.index,
                controller = %record.controller,
                host = %record.host,
                port = record.port,
                user = %record.username,
                credential_file = %record.credential_file.display(),
                "loaded server"
            );
            Ok(record)
        })
        .collect()
}
