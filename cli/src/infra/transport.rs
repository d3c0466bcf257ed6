//! `SessionTransport` over reqwest with a preconfigured rustls client.

use std::time::Duration;

use reqwest::header::SET_COOKIE;

use crate::application::ports::{SessionTransport, TransportResponse};
use crate::domain::cookie::parse_set_cookie;
use crate::domain::error::TransportError;
use crate::domain::protocol::{HttpRequest, RequestMethod};

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build the client. `timeout` bounds each whole round trip.
    ///
    /// Redirects are not followed: a `3xx` reply is handed back as is, with
    /// its `Set-Cookie`, so every step stays one round trip.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Tls` if the client cannot be built.
    pub fn new(tls: rustls::ClientConfig, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .use_preconfigured_tls(tls)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| TransportError::Tls(error_chain(&e)))?;
        Ok(Self { client })
    }
}

impl SessionTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &HttpRequest,
        body: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        let method = match request.method {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Post => reqwest::Method::POST,
        };
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(body.to_string());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                TransportError::InvalidRequest {
                    url: request.url.clone(),
                    reason: error_chain(&e),
                }
            } else {
                TransportError::Network {
                    url: request.url.clone(),
                    reason: error_chain(&e),
                }
            }
        })?;

        // Any status is a completed round trip. The step decides what a
        // fault or redirect means once it has seen the body.
        let status = response.status();
        let cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(parse_set_cookie);
        let body = response.text().await.map_err(|e| TransportError::Network {
            url: request.url.clone(),
            reason: error_chain(&e),
        })?;

        tracing::debug!(url = %request.url, status = status.as_u16(), bytes = body.len(), "response received");
        Ok(TransportResponse {
            status: status.as_u16(),
            cookie,
            body,
        })
    }
}

/// `outer: inner: root` for an error and its sources.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
