//! HTTP-cookie protocol: greet, form login, fetch the shutdown authtoken.
//!
//! The final shutdown submission is not sent. Every run ends with an
//! `Incomplete` failure once the token has been retrieved.

use crate::application::ports::{EventSink, TransportResponse};
use crate::domain::error::{ShutdownError, TransportError};
use crate::domain::form::extract_auth_token;
use crate::domain::protocol::{
    ControllerState, ProtocolStep, RequestMethod, ShutdownEvent, StepBody,
};
use crate::domain::server::ServerAdminRecord;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

pub const STEP_GREET: &str = "greet";
pub const STEP_LOGIN: &str = "login";
pub const STEP_AUTH_TOKEN: &str = "fetch authtoken";

const INCOMPLETE_REASON: &str = "the final shutdown submission is disabled \
     (a duplicate request during the greeting is unresolved); authtoken retrieved, nothing submitted";

#[derive(Debug, Clone)]
pub struct HttpCookieController {
    record: ServerAdminRecord,
    steps: Vec<ProtocolStep>,
}

impl HttpCookieController {
    #[must_use]
    pub fn new(record: ServerAdminRecord) -> Self {
        let steps = vec![
            ProtocolStep {
                name: STEP_GREET,
                path: "/",
                method: RequestMethod::Get,
                content_type: None,
                headers: vec![("Cache-Control", "max-age=0".to_string())],
                referer_path: None,
                body: StepBody::None,
                captures_cookie: true,
                reaches: ControllerState::Greeted,
            },
            ProtocolStep {
                name: STEP_LOGIN,
                path: "/login.php",
                method: RequestMethod::Post,
                content_type: Some(FORM_CONTENT_TYPE),
                headers: Vec::new(),
                referer_path: Some("/login.php"),
                body: StepBody::FormLogin,
                captures_cookie: false,
                reaches: ControllerState::Authenticated,
            },
            ProtocolStep {
                name: STEP_AUTH_TOKEN,
                path: "/shutdown.php",
                method: RequestMethod::Get,
                content_type: None,
                headers: Vec::new(),
                referer_path: Some("/index.php"),
                body: StepBody::None,
                captures_cookie: false,
                reaches: ControllerState::Authenticated,
            },
        ];
        Self { record, steps }
    }

    #[must_use]
    pub fn record(&self) -> &ServerAdminRecord {
        &self.record
    }

    #[must_use]
    pub fn steps(&self) -> &[ProtocolStep] {
        &self.steps
    }

    /// The shutdown page must carry the hidden `authtoken` field. A faulted
    /// reply is left to the status check.
    pub(super) fn inspect<E: EventSink>(
        &self,
        step: &ProtocolStep,
        response: &TransportResponse,
        events: &E,
    ) -> Result<(), ShutdownError> {
        if step.name != STEP_AUTH_TOKEN || response.is_fault_status() {
            return Ok(());
        }
        let token = extract_auth_token(&response.body).ok_or_else(|| {
            TransportError::MissingArtifact {
                url: format!("{}{}", self.record.base_url(), step.path),
                artifact: "authtoken".to_string(),
            }
        })?;
        events.emit(&ShutdownEvent::ArtifactRetrieved {
            server: self.record.host.clone(),
            artifact: "authtoken",
            len: token.len(),
        });
        Ok(())
    }

    pub(super) fn finish(&self) -> Result<(), ShutdownError> {
        Err(ShutdownError::Incomplete {
            server: self.record.host.clone(),
            reason: INCOMPLETE_REASON.to_string(),
        })
    }
}
