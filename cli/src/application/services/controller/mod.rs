//! Shutdown controllers: one per managed server.
//!
//! Both vendor protocols share one step executor ([`Session`]); the variants
//! only contribute their fixed step list and per-step response checks.

pub mod http_cookie;
pub mod vm_session;

use std::time::Instant;

use crate::application::ports::{
    CredentialVault, EventSink, ReachabilityProbe, SessionTransport, TransportResponse,
};
use crate::application::services::precheck::reachability_precheck;
use crate::domain::cookie::SessionCookie;
use crate::domain::envelope::EnvelopeTemplate;
use crate::domain::error::{ConfigError, ShutdownError, TransportError};
use crate::domain::form::form_login_body;
use crate::domain::protocol::{
    ControllerState, FailureKind, ProtocolStep, ShutdownEvent, ShutdownFailure, ShutdownOutcome,
    StepBody, build_request,
};
use crate::domain::server::{ControllerKind, ServerAdminRecord};
use crate::domain::settings::ReachabilityPolicy;

pub use http_cookie::HttpCookieController;
pub use vm_session::VmSessionController;

/// Everything a controller needs from the outside, passed explicitly.
///
/// Shared read-only between concurrently running controllers.
pub struct ShutdownContext<T, P, V, E> {
    pub transport: T,
    pub probe: P,
    pub vault: V,
    pub events: E,
    pub reachability: ReachabilityPolicy,
}

/// A vendor protocol bound to one server.
#[derive(Debug, Clone)]
pub enum ShutdownController {
    VmSession(VmSessionController),
    HttpCookie(HttpCookieController),
}

impl ShutdownController {
    /// Select the protocol variant named by the record's controller tag.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownControllerKind` for an unrecognised tag.
    pub fn for_record(record: ServerAdminRecord) -> Result<Self, ConfigError> {
        let kind = record.controller.parse::<ControllerKind>().map_err(|()| {
            ConfigError::UnknownControllerKind {
                index: record.index,
                kind: record.controller.clone(),
                valid: ControllerKind::valid_tags(),
            }
        })?;
        Ok(match kind {
            ControllerKind::VmSession => Self::VmSession(VmSessionController::new(record)),
            ControllerKind::HttpCookie => Self::HttpCookie(HttpCookieController::new(record)),
        })
    }

    #[must_use]
    pub fn kind(&self) -> ControllerKind {
        match self {
            Self::VmSession(_) => ControllerKind::VmSession,
            Self::HttpCookie(_) => ControllerKind::HttpCookie,
        }
    }

    #[must_use]
    pub fn record(&self) -> &ServerAdminRecord {
        match self {
            Self::VmSession(c) => c.record(),
            Self::HttpCookie(c) => c.record(),
        }
    }

    #[must_use]
    pub fn steps(&self) -> &[ProtocolStep] {
        match self {
            Self::VmSession(c) => c.steps(),
            Self::HttpCookie(c) => c.steps(),
        }
    }

    /// Precheck the host, then run every step in order.
    ///
    /// Never fails: per-server errors become a failed outcome and a
    /// `Failed` event. Session state lives only for this call.
    pub async fn run<T, P, V, E>(&self, ctx: &ShutdownContext<T, P, V, E>) -> ShutdownOutcome
    where
        T: SessionTransport,
        P: ReachabilityProbe,
        V: CredentialVault,
        E: EventSink,
    {
        let started = Instant::now();
        let record = self.record();
        let server = record.host.clone();

        let reachability = reachability_precheck(&ctx.probe, &ctx.events, &server).await;
        let mut session = Session::new(record, ctx);

        let result = if !reachability.reachable && ctx.reachability == ReachabilityPolicy::FailFast
        {
            Err(ShutdownError::Unreachable {
                server: server.clone(),
            })
        } else {
            self.execute(&mut session).await
        };

        let result = match result {
            Ok(()) => {
                ctx.events.emit(&ShutdownEvent::ShutdownExecuted {
                    server: server.clone(),
                    controller: self.kind(),
                });
                Ok(())
            }
            Err(e) => {
                let failure = ShutdownFailure {
                    kind: failure_kind(&e),
                    detail: e.to_string(),
                };
                ctx.events.emit(&ShutdownEvent::Failed {
                    server: server.clone(),
                    kind: failure.kind,
                    detail: failure.detail.clone(),
                });
                Err(failure)
            }
        };

        ShutdownOutcome {
            server,
            controller: self.kind(),
            reachability,
            reached: session.state,
            result,
            elapsed: started.elapsed(),
        }
    }

    async fn execute<T, P, V, E>(
        &self,
        session: &mut Session<'_, T, P, V, E>,
    ) -> Result<(), ShutdownError>
    where
        T: SessionTransport,
        P: ReachabilityProbe,
        V: CredentialVault,
        E: EventSink,
    {
        for step in self.steps() {
            let response = session.exchange(step).await?;
            // Inspected before the status check: a login fault arrives as HTTP 500.
            match self {
                Self::VmSession(c) => c.inspect(step, &response)?,
                Self::HttpCookie(c) => c.inspect(step, &response, &session.ctx.events)?,
            }
            session.accept(step, &response)?;
            session.advance(step);
        }
        match self {
            Self::VmSession(_) => Ok(()),
            Self::HttpCookie(c) => c.finish(),
        }
    }
}

fn failure_kind(err: &ShutdownError) -> FailureKind {
    match err {
        ShutdownError::Credential(_) => FailureKind::Credential,
        ShutdownError::Transport(_) => FailureKind::Transport,
        ShutdownError::Template(_) => FailureKind::Template,
        ShutdownError::Unreachable { .. } => FailureKind::Unreachable,
        ShutdownError::Incomplete { .. } => FailureKind::Incomplete,
    }
}

// ── Step executor ────────────────────────────────────────────────────────────

/// Mutable state of one shutdown attempt.
struct Session<'a, T, P, V, E> {
    record: &'a ServerAdminRecord,
    ctx: &'a ShutdownContext<T, P, V, E>,
    template: EnvelopeTemplate,
    base_url: String,
    cookie: Option<SessionCookie>,
    state: ControllerState,
}

impl<'a, T, P, V, E> Session<'a, T, P, V, E>
where
    T: SessionTransport,
    V: CredentialVault,
    E: EventSink,
{
    fn new(record: &'a ServerAdminRecord, ctx: &'a ShutdownContext<T, P, V, E>) -> Self {
        Self {
            record,
            ctx,
            template: EnvelopeTemplate::soap(),
            base_url: record.base_url(),
            cookie: None,
            state: ControllerState::Idle,
        }
    }

    fn url(&self, step: &ProtocolStep) -> String {
        format!("{}{}", self.base_url, step.path)
    }

    /// Fill and send one step's request.
    async fn exchange(&self, step: &ProtocolStep) -> Result<TransportResponse, ShutdownError> {
        self.ctx.events.emit(&ShutdownEvent::StepSending {
            server: self.record.host.clone(),
            step: step.name,
        });

        let url = self.url(step);
        let referer = step.referer_path.map(|p| format!("{}{p}", self.base_url));
        let request = build_request(
            &url,
            step.method,
            step.content_type,
            &step.headers,
            referer.as_deref(),
            self.cookie.as_ref(),
        );
        let body = self.fill(&step.body)?;
        Ok(self.ctx.transport.send(&request, body.as_deref()).await?)
    }

    /// Reject a `4xx`/`5xx` reply, then capture the cookie if the step
    /// yields one. Redirects count as completed.
    fn accept(
        &mut self,
        step: &ProtocolStep,
        response: &TransportResponse,
    ) -> Result<(), ShutdownError> {
        if response.is_fault_status() {
            return Err(TransportError::Status {
                url: self.url(step),
                status: response.status,
            }
            .into());
        }
        if step.captures_cookie {
            let cookie = response
                .cookie
                .clone()
                .ok_or_else(|| TransportError::MissingCookie { url: self.url(step) })?;
            self.cookie = Some(cookie);
        }
        Ok(())
    }

    fn fill(&self, body: &StepBody) -> Result<Option<String>, ShutdownError> {
        let record = self.record;
        let decrypt = |blob: &[u8]| self.ctx.vault.decrypt(blob, &record.entropy);
        Ok(match body {
            StepBody::None => None,
            StepBody::Envelope { header, body } => {
                Some(self.template.fill(header, body)?.into_string())
            }
            StepBody::LoginEnvelope { header, body } => Some(
                self.template
                    .fill_login(header, body, &record.username, &record.credential, decrypt)?
                    .into_string(),
            ),
            StepBody::FormLogin => Some(form_login_body(
                &record.username,
                &record.credential,
                decrypt,
            )?),
        })
    }

    fn advance(&mut self, step: &ProtocolStep) {
        self.state = step.reaches;
        self.ctx.events.emit(&ShutdownEvent::StepCompleted {
            server: self.record.host.clone(),
            step: step.name,
            state: self.state,
        });
    }
}
