//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `invoices` - Result-set commands (list, show one)
//! - `upload` - Upload and start processing
//! - `config` - Resolved configuration display

pub mod config;
pub mod invoices;
pub mod upload;

// Re-export command functions for main.rs
pub use config::*;
pub use invoices::*;
pub use upload::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use recon_core::{Backend, Config, FetchData, FetchHandle};

/// Load config and apply command-line overrides
pub fn resolve_config(path: Option<&Path>, timeout_secs: Option<u64>, mock: bool) -> Result<Config> {
    let mut config = Config::load(path).context("Failed to load configuration")?;

    if let Some(secs) = timeout_secs {
        if secs == 0 {
            bail!("--timeout must be at least 1 second");
        }
        config.fetch_timeout = Duration::from_secs(secs);
    }
    if mock {
        config.backend = Backend::Mock;
    }

    Ok(config)
}

/// Run `cancel` on Ctrl-C; abort the returned task once the work is done
pub fn on_interrupt<F>(cancel: F) -> tokio::task::JoinHandle<()>
where
    F: FnOnce() + Send + 'static,
{
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel();
        }
    })
}

/// Wait for a fetch, cancelling it on Ctrl-C
pub async fn wait_interruptible(handle: FetchHandle) -> recon_core::Result<FetchData> {
    let token = handle.cancel_token();
    let interrupt = on_interrupt(move || token.cancel());

    let outcome = handle.wait().await;
    interrupt.abort();
    outcome
}

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
