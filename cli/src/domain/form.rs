//! Form-encoded login payloads and page scraping for the web-form protocol.

use std::sync::LazyLock;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::error::CredentialError;

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static AUTH_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<input[^>]*name=["']authtoken["'][^>]*>"#).expect("valid authtoken pattern")
});

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static VALUE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)value=["']([^"']*)["']"#).expect("valid value pattern")
});

/// Build `username=...&password=...` with both values percent-encoded.
///
/// Username and blob are checked before `decrypt` runs.
///
/// # Errors
///
/// Returns `CredentialError::NotSet` for an empty username or blob, or any
/// error from `decrypt`.
pub fn form_login_body<F>(
    username: &str,
    credential: &[u8],
    decrypt: F,
) -> Result<String, CredentialError>
where
    F: FnOnce(&[u8]) -> Result<SecretString, CredentialError>,
{
    if username.is_empty() || credential.is_empty() {
        return Err(CredentialError::NotSet {
            username: username.to_string(),
            blob_len: credential.len(),
        });
    }
    let password = decrypt(credential)?;
    Ok(format!(
        "username={}&password={}",
        utf8_percent_encode(username, NON_ALPHANUMERIC),
        utf8_percent_encode(password.expose_secret(), NON_ALPHANUMERIC),
    ))
}

/// Pull the hidden `authtoken` field out of the shutdown page.
#[must_use]
pub fn extract_auth_token(html: &str) -> Option<String> {
    let input = AUTH_TOKEN.find(html)?;
    VALUE_ATTR
        .captures(input.as_str())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|t| !t.is_empty())
}
