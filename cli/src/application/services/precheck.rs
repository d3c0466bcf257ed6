//! Reachability precheck run before every shutdown attempt.

use crate::application::ports::{EventSink, ReachabilityProbe};
use crate::domain::protocol::{ReachabilityReport, ShutdownEvent};

/// Pings sent before giving up on a host.
pub const PING_ATTEMPTS: u32 = 3;

/// Ping `server` up to [`PING_ATTEMPTS`] times, stopping at the first reply.
///
/// Probe errors count as failed attempts. The report is advisory; whether an
/// unreachable host aborts the attempt is the caller's policy.
pub async fn reachability_precheck(
    probe: &impl ReachabilityProbe,
    events: &impl EventSink,
    server: &str,
) -> ReachabilityReport {
    events.emit(&ShutdownEvent::PrecheckStarted {
        server: server.to_string(),
    });

    let mut report = ReachabilityReport::default();
    for attempt in 1..=PING_ATTEMPTS {
        report.attempts = attempt;
        events.emit(&ShutdownEvent::PingAttempt {
            server: server.to_string(),
            attempt,
            of: PING_ATTEMPTS,
        });
        match probe.ping_once(server).await {
            Ok(reply) => {
                let success = reply.success;
                report.last_reply = Some(reply);
                if success {
                    report.reachable = true;
                    break;
                }
            }
            Err(e) => events.emit(&ShutdownEvent::PingError {
                server: server.to_string(),
                error: format!("{e:#}"),
            }),
        }
    }

    events.emit(&ShutdownEvent::Reachability {
        server: server.to_string(),
        report: report.clone(),
    });
    report
}
