//! `poweroff-guests servers`: show the shutdown queue.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::config_service::load_settings;
use crate::domain::error::ConfigError;
use crate::domain::server::ControllerKind;
use crate::domain::settings::server_entries;
use crate::output::ServerListing;

/// Run `poweroff-guests servers`.
///
/// Credential files are not read and no server is contacted.
///
/// # Errors
///
/// Returns an error if the settings are malformed or a controller kind is
/// unknown.
pub fn run(app: &AppContext) -> Result<ExitCode> {
    let (raw, _settings) = load_settings(&app.config)?;
    let servers = server_entries(&raw)
        .into_iter()
        .map(|e| {
            let controller = e.controller.parse::<ControllerKind>().map_err(|()| {
                ConfigError::UnknownControllerKind {
                    index: e.index,
                    kind: e.controller.clone(),
                    valid: ControllerKind::valid_tags(),
                }
            })?;
            Ok(ServerListing {
                index: e.index,
                controller,
                host: e.host,
                port: e.port,
                user: e.user,
                password_file: e.password_file,
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    app.renderer().render_servers(&servers)?;
    Ok(ExitCode::SUCCESS)
}
