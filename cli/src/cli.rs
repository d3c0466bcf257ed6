//! CLI argument parsing with clap derive

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, OutputFlags};
use crate::commands;

/// Shut down virtualization hosts and storage appliances when the UPS runs on battery
#[derive(Parser)]
#[command(
    name = "poweroff-guests",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Settings file (default: ~/.poweroff-guests/config.yaml)
    #[arg(long, global = true, env = "POWEROFF_GUESTS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR", value_parser = clap::builder::FalseyValueParser::new())]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Shut down every configured server
    Run,

    /// List the configured shutdown queue without contacting any server
    Servers,

    /// Encrypt a server password into its configured password file
    SetPassword(commands::set_password::SetPasswordArgs),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            config,
            json,
            quiet,
            no_color,
            command,
        } = self;
        let app = AppContext::new(AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            config,
        });
        match command {
            Command::Run => commands::run::run(&app).await,
            Command::Servers => commands::servers::run(&app),
            Command::SetPassword(args) => commands::set_password::run(&app, &args),
            Command::Version => commands::version::run(&app),
        }
    }
}
