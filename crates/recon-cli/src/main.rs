//! Recon CLI - Invoice reconciliation results in the terminal
//!
//! Usage:
//!   recon upload a.pdf b.png      Upload invoices and start processing
//!   recon invoices                List reconciled invoices
//!   recon invoice INV-002         Show one invoice with its discrepancies
//!   recon config                  Show the resolved configuration

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use recon_core::{FetchController, ServiceClient, UploadOrchestrator};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

// One cooperative event loop; pipeline steps never run in parallel
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::resolve_config(cli.config.as_deref(), cli.timeout, cli.mock)?;

    match cli.command {
        Commands::Invoices { status, json } => {
            let controller = FetchController::from_config(&config);
            commands::cmd_invoices(&controller, status.as_deref(), json).await
        }
        Commands::Invoice { number, json } => {
            let controller = FetchController::from_config(&config);
            commands::cmd_invoice(&controller, &number, json).await
        }
        Commands::Upload { files } => {
            let orchestrator = UploadOrchestrator::new(ServiceClient::from_config(&config));
            commands::cmd_upload(&orchestrator, &files).await
        }
        Commands::Config => commands::cmd_config(&config),
    }
}
