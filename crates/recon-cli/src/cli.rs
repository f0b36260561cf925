//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Recon - Invoice ingestion and reconciliation results
#[derive(Parser)]
#[command(name = "recon")]
#[command(about = "Upload invoices for reconciliation and review the results", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the data-dir override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Fetch timeout in seconds (overrides fetch.timeout_secs)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Use the built-in mock service instead of the configured endpoints
    #[arg(long, global = true)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List reconciled invoices
    Invoices {
        /// Only show invoices with this status (matched, pending, mismatch, exception, reconciled)
        #[arg(short, long)]
        status: Option<String>,

        /// Print normalized JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one invoice with its discrepancies and logs
    Invoice {
        /// Invoice number (e.g. INV-002)
        number: String,

        /// Print normalized JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Upload invoice documents and start reconciliation
    ///
    /// Accepted types: pdf, jpg, jpeg, png, gif, doc, docx, xls, xlsx, csv.
    Upload {
        /// Files to upload (sent as one batch)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show the resolved configuration
    Config,
}
