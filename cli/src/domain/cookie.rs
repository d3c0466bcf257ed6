//! Session cookie captured from a `Set-Cookie` header.

use std::fmt;

/// A name/value pair replayed on every later request of one attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

impl SessionCookie {
    /// The `Cookie` request header value, `name=value`.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

// Session values are bearer tokens; keep them out of logs.
impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Extract the session cookie from a `Set-Cookie` header value.
///
/// Splits on `=`, `;` and `"`, drops empty pieces, and takes the first two
/// tokens as name and value. The value is re-quoted, which is the form both
/// vendors expect back.
#[must_use]
pub fn parse_set_cookie(header: &str) -> Option<SessionCookie> {
    let mut tokens = header
        .split(['=', ';', '"'])
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let name = tokens.next()?;
    let value = tokens.next()?;
    Some(SessionCookie {
        name: name.to_string(),
        value: format!("\"{value}\""),
    })
}
