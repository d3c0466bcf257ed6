//! Infrastructure implementation of the `ConfigStore` port.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_yaml::Value;

use crate::application::ports::ConfigStore;
use crate::domain::error::ConfigError;
use crate::domain::settings::RawSettings;

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "POWEROFF_GUESTS_CONFIG";

/// Directory under `$HOME` holding the settings and the credential key.
pub const APP_DIR: &str = ".poweroff-guests";

/// Production `ConfigStore`: a flat YAML mapping on disk.
#[derive(Debug, Clone, Default)]
pub struct YamlConfigStore {
    explicit: Option<PathBuf>,
}

impl YamlConfigStore {
    /// Use `path` when given, else `$POWEROFF_GUESTS_CONFIG`, else
    /// `~/.poweroff-guests/config.yaml`.
    #[must_use]
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { explicit: path }
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<RawSettings> {
        let path = self.path()?;
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        parse_settings(&content).with_context(|| format!("cannot parse {}", path.display()))
    }

    fn path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.explicit {
            return Ok(path.clone());
        }
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(val));
        }
        Ok(app_dir()?.join("config.yaml"))
    }

    fn read_credential_file(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write_credential_file(&self, path: &Path, blob: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        write_owner_only(path, blob, false)
    }
}

/// Write `bytes` to a file that is mode 0600 before any byte lands.
///
/// An existing file is narrowed to 0600 before it is truncated. With
/// `create_new`, an existing file is an `AlreadyExists` error instead.
///
/// # Errors
///
/// Returns the underlying I/O error.
pub fn write_owner_only(path: &Path, bytes: &[u8], create_new: bool) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true);
    if create_new {
        options.create_new(true);
    } else {
        options.create(true).truncate(false);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(0o600);
        let mut file = options.open(path)?;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        file.set_len(0)?;
        file.write_all(bytes)?;
        file.sync_all()
    }

    #[cfg(not(unix))]
    {
        let mut file = options.truncate(true).open(path)?;
        file.write_all(bytes)?;
        file.sync_all()
    }
}

/// `~/.poweroff-guests`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn app_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.join(APP_DIR))
}

/// Parse a flat YAML mapping, normalising every scalar to a string.
///
/// `null` becomes an empty value, which reads as missing.
///
/// # Errors
///
/// Returns an error if the document is not a mapping or a value is a
/// sequence or nested mapping.
pub fn parse_settings(content: &str) -> Result<RawSettings> {
    if content.trim().is_empty() {
        return Ok(RawSettings::default());
    }
    let doc: Value = serde_yaml::from_str(content).context("invalid YAML")?;
    let Value::Mapping(map) = doc else {
        anyhow::bail!("settings must be a mapping of key to value");
    };

    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        let key = scalar(&key).ok_or_else(|| anyhow::anyhow!("setting keys must be scalars"))?;
        let value = scalar(&value).ok_or_else(|| ConfigError::InvalidValue {
            key: key.clone(),
            value: "a list or mapping".to_string(),
            valid: "a single scalar value".to_string(),
        })?;
        pairs.push((key, value));
    }
    Ok(pairs.into_iter().collect())
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Tagged(t) => scalar(&t.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}
