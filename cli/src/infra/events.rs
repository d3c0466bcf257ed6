//! `EventSink` that turns controller events into tracing events.

use crate::application::ports::EventSink;
use crate::domain::protocol::ShutdownEvent;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &ShutdownEvent) {
        match event {
            ShutdownEvent::PrecheckStarted { server } => {
                tracing::info!(%server, "checking reachability");
            }
            ShutdownEvent::PingAttempt {
                server,
                attempt,
                of,
            } => {
                tracing::debug!(%server, "ping attempt {attempt} of {of}");
            }
            ShutdownEvent::PingError { server, error } => {
                tracing::warn!(%server, %error, "ping failed");
            }
            ShutdownEvent::Reachability { server, report } => {
                if report.reachable {
                    tracing::info!(%server, "{}", report.describe(server));
                } else {
                    tracing::warn!(
                        %server,
                        "{}\nCould not reach server {server}.",
                        report.describe(server)
                    );
                }
            }
            ShutdownEvent::StepSending { server, step } => {
                tracing::debug!(%server, step, "sending request");
            }
            ShutdownEvent::StepCompleted {
                server,
                step,
                state,
            } => {
                tracing::debug!(%server, step, %state, "step completed");
            }
            ShutdownEvent::ArtifactRetrieved {
                server,
                artifact,
                len,
            } => {
                tracing::debug!(%server, artifact, len, "{artifact} retrieved");
            }
            ShutdownEvent::ShutdownExecuted { server, controller } => {
                tracing::info!(%server, %controller, "{controller}.Shutdown on server {server} has been executed");
            }
            ShutdownEvent::Failed {
                server,
                kind,
                detail,
            } => {
                tracing::error!(%server, %kind, "shutdown failed: {detail}");
            }
        }
    }
}
