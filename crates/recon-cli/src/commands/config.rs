//! Config command implementation

use anyhow::Result;
use recon_core::config::{default_config_path, RESULTS_URL_ENV};
use recon_core::Config;

pub fn cmd_config(config: &Config) -> Result<()> {
    println!();
    println!("⚙️  Recon Configuration");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Source:      {}", config.source);
    println!("   Backend:     {}", config.backend.as_str());
    println!("   Upload:      {}", config.endpoints.upload_url);
    println!("   Processing:  {}", config.endpoints.processing_url);
    if config.results_url_from_env {
        println!(
            "   Results:     {} (from {})",
            config.endpoints.results_url, RESULTS_URL_ENV
        );
    } else {
        println!("   Results:     {}", config.endpoints.results_url);
    }
    println!("   Timeout:     {}s", config.fetch_timeout.as_secs());

    if let Some(path) = default_config_path() {
        println!();
        println!("   Override file: {}", path.display());
    }
    println!();

    Ok(())
}
