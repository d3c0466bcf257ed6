//! SOAP envelope assembly.
//!
//! The skeleton has two insertion points: the closing header and body tags.
//! Fragments are spliced in front of them; the skeleton itself is never
//! modified, so filling is repeatable.

use std::borrow::Cow;

use secrecy::{ExposeSecret, SecretString};

use crate::domain::error::{CredentialError, ShutdownError, TemplateError};

const SOAP_SKELETON: &str = "<soap:Envelope xmlns:xsd='http://www.w3.org/2001/XMLSchema' \
xmlns:xsi='http://www.w3.org/2001/XMLSchema-instance' \
xmlns:soap='http://schemas.xmlsoap.org/soap/envelope/'>
    <soap:Header>
    </soap:Header>
    <soap:Body>
    </soap:Body>
</soap:Envelope>";

const HEADER_POINT: &str = "\n    </soap:Header>";
const BODY_POINT: &str = "\n    </soap:Body>";
const USERNAME_POINT: &str = "</userName>";
const PASSWORD_POINT: &str = "</password>";

/// A filled envelope, ready to be sent as a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope(String);

impl Envelope {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

/// The fixed outer envelope.
#[derive(Debug, Clone)]
pub struct EnvelopeTemplate {
    skeleton: Cow<'static, str>,
}

impl Default for EnvelopeTemplate {
    fn default() -> Self {
        Self::soap()
    }
}

impl EnvelopeTemplate {
    /// The SOAP 1.1 envelope used by the VM-session protocol.
    #[must_use]
    pub fn soap() -> Self {
        Self {
            skeleton: Cow::Borrowed(SOAP_SKELETON),
        }
    }

    /// A template over an arbitrary skeleton.
    #[must_use]
    pub fn with_skeleton(skeleton: impl Into<Cow<'static, str>>) -> Self {
        Self {
            skeleton: skeleton.into(),
        }
    }

    #[must_use]
    pub fn skeleton(&self) -> &str {
        &self.skeleton
    }

    /// Splice the header and body fragments into a copy of the skeleton.
    ///
    /// Text splicing only: the result is not parsed, so a malformed fragment
    /// yields a malformed envelope. Callers pass constant fragments or
    /// values run through [`xml_escape`].
    ///
    /// # Errors
    ///
    /// Returns `TemplateError` if either insertion point is absent.
    pub fn fill(&self, header: &str, body: &str) -> Result<Envelope, TemplateError> {
        let mut doc = self.skeleton.to_string();
        insert_before(&mut doc, HEADER_POINT, "header", header)?;
        insert_before(&mut doc, BODY_POINT, "body", body)?;
        Ok(Envelope(doc))
    }

    /// Fill a login envelope, splicing the username and decrypted password
    /// into the body's `<userName>` and `<password>` elements.
    ///
    /// The username and encrypted blob are checked before `decrypt` runs, so
    /// an empty credential never produces a credential-shaped payload.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::NotSet` for an empty username or blob, any
    /// error from `decrypt`, or a `TemplateError` for a broken template.
    pub fn fill_login<F>(
        &self,
        header: &str,
        body: &str,
        username: &str,
        credential: &[u8],
        decrypt: F,
    ) -> Result<Envelope, LoginEnvelopeError>
    where
        F: FnOnce(&[u8]) -> Result<SecretString, CredentialError>,
    {
        if username.is_empty() || credential.is_empty() {
            return Err(CredentialError::NotSet {
                username: username.to_string(),
                blob_len: credential.len(),
            }
            .into());
        }

        let mut login_body = body.to_string();
        insert_before(&mut login_body, USERNAME_POINT, "userName", &xml_escape(username))?;
        let password = decrypt(credential)?;
        insert_before(
            &mut login_body,
            PASSWORD_POINT,
            "password",
            &xml_escape(password.expose_secret()),
        )?;
        Ok(self.fill(header, &login_body)?)
    }
}

/// Error from [`EnvelopeTemplate::fill_login`].
#[derive(Debug, thiserror::Error)]
pub enum LoginEnvelopeError {
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl From<LoginEnvelopeError> for ShutdownError {
    fn from(err: LoginEnvelopeError) -> Self {
        match err {
            LoginEnvelopeError::Credential(e) => Self::Credential(e),
            LoginEnvelopeError::Template(e) => Self::Template(e),
        }
    }
}

/// Text of the first `<faultstring>` element, if the response is a SOAP fault.
#[must_use]
pub fn soap_fault(response: &str) -> Option<String> {
    let start = response.find("<faultstring>")? + "<faultstring>".len();
    let rest = &response[start..];
    let end = rest.find("</faultstring>").unwrap_or(rest.len());
    Some(rest[..end].trim().to_string())
}

fn insert_before(
    doc: &mut String,
    marker: &str,
    point: &'static str,
    fragment: &str,
) -> Result<(), TemplateError> {
    let at = doc.find(marker).ok_or(TemplateError { point })?;
    doc.insert_str(at, fragment);
    Ok(())
}

/// Escape the five XML special characters.
#[must_use]
pub fn xml_escape(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}
