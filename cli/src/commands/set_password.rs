//! `poweroff-guests set-password`: write an encrypted password file.

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use secrecy::SecretString;

use crate::app::AppContext;
use crate::application::services::config_service::load_settings;
use crate::application::services::password_service::{
    configured_password_files, create_password_file, match_password_file, validate_password,
};
use crate::domain::settings::RawSettings;
use crate::infra::credentials::{AesCredentialVault, default_key_path};

/// Arguments for the set-password command.
#[derive(Args)]
pub struct SetPasswordArgs {
    /// Password file to write; must be one of the configured ServerUserPwFile values
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Read the password from the first line of stdin instead of prompting
    #[arg(long)]
    pub password_stdin: bool,
}

/// Run `poweroff-guests set-password`.
///
/// # Errors
///
/// Returns an error if the target is not configured, the password is not
/// printable ASCII, or the file cannot be written.
pub fn run(app: &AppContext, args: &SetPasswordArgs) -> Result<ExitCode> {
    let ctx = &app.output;
    let (raw, settings) = load_settings(&app.config)?;
    let configured = configured_password_files(&raw);
    if configured.is_empty() {
        anyhow::bail!("no ServerUserPwFile entries are configured");
    }

    let target = match &args.file {
        Some(path) => path.clone(),
        None => prompt_target(app, &raw, &configured)?,
    };

    let password = if args.password_stdin {
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("cannot read password from stdin")?;
        SecretString::from(line.trim_end_matches(['\r', '\n']).to_string())
    } else {
        prompt_password()?
    };

    let key_path = match &settings.credential_key_file {
        Some(path) => path.clone(),
        None => default_key_path()?,
    };
    let vault = AesCredentialVault::open_or_create(&key_path)?;
    let written = create_password_file(&app.config, &vault, &raw, &settings, &target, &password)?;

    ctx.success(&format!("Password file written: {}", written.display()));
    Ok(ExitCode::SUCCESS)
}

fn prompt_target(
    app: &AppContext,
    raw: &RawSettings,
    configured: &[PathBuf],
) -> Result<PathBuf> {
    let hint = configured
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    loop {
        let input: String = dialoguer::Input::new()
            .with_prompt(format!("Password file ({hint})"))
            .interact_text()?;
        if let Some(path) = match_password_file(raw, &PathBuf::from(input.trim())) {
            return Ok(path);
        }
        app.output
            .error(&format!("Not a configured password file. Expected one of: {hint}"));
    }
}

fn prompt_password() -> Result<SecretString> {
    let password = dialoguer::Password::new()
        .with_prompt("Password")
        .with_confirmation("Confirm password", "Passwords do not match, try again")
        .validate_with(|input: &String| {
            validate_password(&SecretString::from(input.clone())).map_err(|e| e.to_string())
        })
        .interact()?;
    Ok(SecretString::from(password))
}
