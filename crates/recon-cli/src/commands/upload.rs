//! Upload command implementation

use std::path::PathBuf;

use anyhow::{Context, Result};
use recon_core::{FileHandle, UploadBatch, UploadOrchestrator};
use tracing::info;

/// Read and type-check the selected files
pub fn select_files(paths: &[PathBuf]) -> Result<Vec<FileHandle>> {
    paths
        .iter()
        .map(|path| {
            FileHandle::from_path(path).with_context(|| format!("Cannot use {}", path.display()))
        })
        .collect()
}

pub async fn cmd_upload(orchestrator: &UploadOrchestrator, paths: &[PathBuf]) -> Result<()> {
    let mut batch = UploadBatch::new();
    batch.select(select_files(paths)?);

    let total_kb: f64 = batch.files().iter().map(FileHandle::size_kb).sum();
    println!(
        "📤 Uploading {} file(s) ({:.1} KB)...",
        batch.len(),
        total_kb
    );

    let receipt = batch.submit(orchestrator).await.context("Upload failed")?;
    info!("Queued {} stored object(s) for processing", receipt.stored.len());

    println!("✅ Uploaded and queued for processing:");
    for stored in &receipt.stored {
        println!("   {} → {}", stored.key, stored.location);
    }
    println!();
    println!("   Run 'recon invoices' to see results once processing finishes.");

    Ok(())
}
