//! `poweroff-guests run`: shut down every configured server.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::app::AppContext;
use crate::application::ports::ConfigStore;
use crate::application::services::config_service::load_server_records;
use crate::application::services::controller::ShutdownContext;
use crate::application::services::dispatcher::{build_queue, dispatch};
use crate::domain::protocol::DispatchReport;
use crate::domain::settings::{LogTarget, RawSettings, Settings};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::credentials::{AesCredentialVault, default_key_path};
use crate::infra::events::TracingEventSink;
use crate::infra::logging::{init_logging, level_for};
use crate::infra::ping::PingProbe;
use crate::infra::tls::client_config;
use crate::infra::transport::ReqwestTransport;

/// Run `poweroff-guests run`.
///
/// Exits with failure when any server could not be shut down.
///
/// # Errors
///
/// Returns an error for configuration problems and catastrophic dispatch
/// failures. Both are logged before they are returned.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let raw = match app.config.load() {
        Ok(raw) => raw,
        Err(e) => {
            // No log destination is known yet.
            init_logging(None, level_for(false))?;
            tracing::error!("{e:#}");
            return Err(e);
        }
    };
    let log = LogTarget::from_raw(&raw);
    init_logging(log.file.as_deref(), level_for(log.debug))?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "==================== poweroff-guests shutdown run ===================="
    );

    let report = match shut_down(app, &raw).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("{e:#}");
            return Err(e);
        }
    };

    app.renderer().render_report(&report)?;
    Ok(if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn shut_down(app: &AppContext, raw: &RawSettings) -> Result<DispatchReport> {
    let settings = Settings::from_raw(raw)?;
    let records = load_server_records(&app.config, raw, &settings)?;
    if records.is_empty() {
        return Ok(DispatchReport::default());
    }
    let tls = client_config(settings.tls, &records)?;
    let queue = build_queue(records)?;

    let key_path = match &settings.credential_key_file {
        Some(path) => path.clone(),
        None => default_key_path()?,
    };
    let vault = AesCredentialVault::open(&key_path)
        .context("credential key missing; create password files with `poweroff-guests set-password`")?;

    let ctx = Arc::new(ShutdownContext {
        transport: ReqwestTransport::new(tls, settings.request_timeout)?,
        probe: PingProbe::new(TokioCommandRunner::default()),
        vault,
        events: TracingEventSink,
        reachability: settings.reachability,
    });

    let report = dispatch(settings.synchronicity, queue, ctx).await?;
    let failed = report.failures().count();
    tracing::info!(
        servers = report.outcomes.len(),
        failed,
        "shutdown run finished"
    );
    Ok(report)
}
