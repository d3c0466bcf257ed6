//! poweroff-guests: UPS-triggered shutdown of guest servers

use std::process::ExitCode;

use clap::Parser;
use poweroff_guests::cli::Cli;
use poweroff_guests::output::json::format_error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.json;
    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            match format_error(&format!("{e:#}"), "ERROR") {
                Ok(obj) if json => println!("{obj}"),
                _ => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
