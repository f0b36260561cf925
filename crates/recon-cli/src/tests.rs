//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use recon_core::service::{MockCall, MockReply};
use recon_core::{Backend, FetchController, MockService, ReconciliationService, UploadOrchestrator};
use serde_json::json;

use crate::commands::{self, truncate};

fn controller(mock: &MockService) -> FetchController {
    FetchController::new(mock.clone().into(), Duration::from_secs(10))
}

/// Write a file with the given name into `dir`, returning its path
fn fixture(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents).unwrap();
    path
}

// ========== Invoices Command Tests ==========

#[tokio::test]
async fn test_cmd_invoices_lists_sample_set() {
    let mock = MockService::new();
    let result = commands::cmd_invoices(&controller(&mock), None, false).await;
    assert!(result.is_ok());
    assert_eq!(mock.calls(), vec![MockCall::Fetch { key: None }]);
}

#[tokio::test]
async fn test_cmd_invoices_json_with_filter() {
    let mock = MockService::new();
    let result = commands::cmd_invoices(&controller(&mock), Some("mismatch"), true).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cmd_invoices_unknown_status_filter() {
    let mock = MockService::new();
    let result = commands::cmd_invoices(&controller(&mock), Some("approved"), false).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_cmd_invoices_surfaces_fetch_error() {
    let mock = MockService::new().with_results(MockReply::Status(503, "down".into()));
    let err = commands::cmd_invoices(&controller(&mock), None, false)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Failed to load invoices");
    assert_eq!(err.root_cause().to_string(), "Fetch failed: 503 down");
}

#[tokio::test]
async fn test_cmd_invoices_empty_result_is_error() {
    let mock = MockService::new().with_results_json(json!({"invoices": []}));
    let result = commands::cmd_invoices(&controller(&mock), None, false).await;
    assert!(result.is_err());
}

#[test]
fn test_controller_from_config_carries_timeout_and_backend() {
    let config = recon_core::Config {
        fetch_timeout: Duration::from_secs(7),
        backend: Backend::Mock,
        ..Default::default()
    };
    let controller = FetchController::from_config(&config);
    assert_eq!(controller.timeout(), Duration::from_secs(7));
    assert_eq!(controller.service().name(), "mock");
}

#[test]
fn test_filter_by_status() {
    let invoices = recon_core::normalize(&recon_core::service::sample_results())
        .unwrap()
        .invoices;

    let matched = commands::filter_by_status(&invoices, Some("Matched")).unwrap();
    assert_eq!(matched.len(), 2);

    let all = commands::filter_by_status(&invoices, None).unwrap();
    assert_eq!(all.len(), invoices.len());
}

// ========== Invoice Command Tests ==========

#[tokio::test]
async fn test_cmd_invoice_detail() {
    let mock = MockService::new();
    let result = commands::cmd_invoice(&controller(&mock), "INV-003", false).await;
    assert!(result.is_ok());
    assert_eq!(
        mock.calls(),
        vec![MockCall::Fetch {
            key: Some("INV-003".to_string())
        }]
    );
}

#[tokio::test]
async fn test_cmd_invoice_json() {
    let mock = MockService::new();
    assert!(commands::cmd_invoice(&controller(&mock), "INV-002", true)
        .await
        .is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_cmd_invoice_timeout() {
    let mock = MockService::new().with_results(MockReply::Hang);
    let err = commands::cmd_invoice(&controller(&mock), "INV-001", false)
        .await
        .unwrap_err();
    assert!(err.root_cause().to_string().contains("timed out"));
}

// ========== Upload Command Tests ==========

#[tokio::test]
async fn test_cmd_upload_sends_batch() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fixture(&dir, "march.pdf", b"%PDF-1.4");
    let png = fixture(&dir, "scan.PNG", &[0x89, b'P', b'N', b'G']);

    let mock = MockService::new();
    let orchestrator = UploadOrchestrator::new(mock.clone().into());
    commands::cmd_upload(&orchestrator, &[pdf, png]).await.unwrap();

    let calls = mock.calls();
    assert_eq!(
        calls[0],
        MockCall::Upload {
            files: vec!["march.pdf".to_string(), "scan.PNG".to_string()]
        }
    );
    assert!(matches!(calls[1], MockCall::Processing { .. }));
}

#[tokio::test]
async fn test_cmd_upload_rejects_unsupported_type() {
    let dir = tempfile::tempdir().unwrap();
    let exe = fixture(&dir, "setup.exe", b"MZ");

    let mock = MockService::new();
    let orchestrator = UploadOrchestrator::new(mock.clone().into());
    let result = commands::cmd_upload(&orchestrator, &[exe]).await;

    assert!(result.is_err());
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_cmd_upload_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockService::new();
    let orchestrator = UploadOrchestrator::new(mock.clone().into());

    let result = commands::cmd_upload(&orchestrator, &[dir.path().join("gone.pdf")]).await;
    assert!(result.is_err());
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_cmd_upload_processing_failure() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fixture(&dir, "a.pdf", b"%PDF");

    let mock = MockService::new().with_processing(MockReply::Status(500, "boom".into()));
    let orchestrator = UploadOrchestrator::new(mock.into());
    let err = commands::cmd_upload(&orchestrator, &[pdf]).await.unwrap_err();
    assert_eq!(err.root_cause().to_string(), "Processing failed: 500 boom");
}

// ========== Config Tests ==========

#[test]
fn test_resolve_config_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, "recon.toml", b"[fetch]\ntimeout_secs = 30\n");

    let config = commands::resolve_config(Some(path.as_path()), Some(4), true).unwrap();
    assert_eq!(config.fetch_timeout, Duration::from_secs(4));
    assert_eq!(config.backend, Backend::Mock);

    let config = commands::resolve_config(Some(path.as_path()), None, false).unwrap();
    assert_eq!(config.fetch_timeout, Duration::from_secs(30));
}

#[test]
fn test_resolve_config_rejects_zero_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, "recon.toml", b"");
    assert!(commands::resolve_config(Some(path.as_path()), Some(0), false).is_err());
}

#[test]
fn test_resolve_config_missing_file() {
    let result = commands::resolve_config(Some(std::path::Path::new("/nope/recon.toml")), None, false);
    assert!(result.is_err());
}

#[test]
fn test_cmd_config() {
    let config = recon_core::Config::default();
    assert!(commands::cmd_config(&config).is_ok());
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("Acme Corp", 22), "Acme Corp");
    assert_eq!(truncate("Global Supplies International", 10), "Global ...");
    assert_eq!(truncate("Société Générale Paris", 8), "Socié...");
}
