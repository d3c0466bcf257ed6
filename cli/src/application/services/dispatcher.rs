//! Dispatcher: builds the controller queue and runs it.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::application::ports::{CredentialVault, EventSink, ReachabilityProbe, SessionTransport};
use crate::application::services::controller::{ShutdownContext, ShutdownController};
use crate::domain::error::{ConfigError, DispatchError};
use crate::domain::protocol::{DispatchReport, ShutdownOutcome};
use crate::domain::server::ServerAdminRecord;
use crate::domain::settings::Synchronicity;

/// One controller per record, in record order.
///
/// # Errors
///
/// Returns `ConfigError::UnknownControllerKind` for the first record whose
/// tag names no known protocol.
pub fn build_queue(
    records: Vec<ServerAdminRecord>,
) -> Result<Vec<ShutdownController>, ConfigError> {
    records
        .into_iter()
        .map(ShutdownController::for_record)
        .collect()
}

/// Run each controller to completion before starting the next.
pub async fn run_sequential<T, P, V, E>(
    queue: &[ShutdownController],
    ctx: &ShutdownContext<T, P, V, E>,
) -> DispatchReport
where
    T: SessionTransport,
    P: ReachabilityProbe,
    V: CredentialVault,
    E: EventSink,
{
    let mut outcomes = Vec::with_capacity(queue.len());
    for controller in queue {
        outcomes.push(controller.run(ctx).await);
    }
    report(outcomes)
}

/// Start every controller as its own task and wait for all of them.
///
/// Outcomes are returned in queue order.
///
/// # Errors
///
/// Returns `DispatchError::Catastrophic` if any task panicked or was
/// cancelled. The remaining tasks still run to completion first.
pub async fn run_concurrent<T, P, V, E>(
    queue: Vec<ShutdownController>,
    ctx: Arc<ShutdownContext<T, P, V, E>>,
) -> Result<DispatchReport, DispatchError>
where
    T: SessionTransport + 'static,
    P: ReachabilityProbe + 'static,
    V: CredentialVault + 'static,
    E: EventSink + 'static,
{
    let total = queue.len();
    let mut tasks = JoinSet::new();
    for (position, controller) in queue.into_iter().enumerate() {
        let ctx = Arc::clone(&ctx);
        tasks.spawn(async move { (position, controller.run(&ctx).await) });
    }

    let mut slots: Vec<Option<ShutdownOutcome>> = (0..total).map(|_| None).collect();
    let mut faults = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((position, outcome)) => slots[position] = Some(outcome),
            Err(e) => faults.push(e.to_string()),
        }
    }

    if !faults.is_empty() {
        let message = faults.join("; ");
        tracing::error!(error = %message, "shutdown task failed unexpectedly");
        return Err(DispatchError::Catastrophic(message));
    }
    Ok(report(slots.into_iter().flatten().collect()))
}

/// Run the queue in the configured mode.
///
/// # Errors
///
/// Returns `DispatchError::Catastrophic` from asynchronous mode only.
pub async fn dispatch<T, P, V, E>(
    mode: Synchronicity,
    queue: Vec<ShutdownController>,
    ctx: Arc<ShutdownContext<T, P, V, E>>,
) -> Result<DispatchReport, DispatchError>
where
    T: SessionTransport + 'static,
    P: ReachabilityProbe + 'static,
    V: CredentialVault + 'static,
    E: EventSink + 'static,
{
    tracing::info!(mode = ?mode, servers = queue.len(), "dispatching shutdown queue");
    match mode {
        Synchronicity::Synchronous => Ok(run_sequential(&queue, &ctx).await),
        Synchronicity::Asynchronous => run_concurrent(queue, ctx).await,
    }
}

fn report(outcomes: Vec<ShutdownOutcome>) -> DispatchReport {
    let report = DispatchReport { outcomes };
    if let Some(combined) = report.combined_failure() {
        tracing::warn!("{combined}");
    }
    report
}
