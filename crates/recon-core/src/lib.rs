//! Recon Core Library
//!
//! Invoice ingestion and normalization for the recon reconciliation tool:
//! - Canonical invoice model with status and severity vocabularies
//! - Normalization of arbitrarily-shaped result-set payloads
//! - Fetch lifecycle controller with timeout and cooperative cancellation
//! - Upload orchestrator (storage, then processing)
//! - Pluggable reconciliation-service backends (HTTP, mock)
//! - Caller-side invoice state with an explicit "not loaded" state

pub mod board;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod normalize;
pub mod service;
pub mod upload;

/// Test utilities including mock reconciliation server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use board::{BoardError, InvoiceBoard, LoadState};
pub use config::{Backend, Config, ConfigSource, Endpoints};
pub use error::{Error, ErrorKind, Result};
pub use fetch::{FetchController, FetchData, FetchHandle, FetchPhase};
pub use models::{
    Discrepancy, FileHandle, Invoice, InvoiceDetail, InvoiceStatus, ProcessingRequest, Severity,
    StoredObject,
};
pub use normalize::{normalize, NormalizationWarning, Normalized, NormalizedDetail, Normalizer};
pub use service::{HttpService, MockService, ReconciliationService, ServiceClient};
pub use upload::{UploadBatch, UploadOrchestrator, UploadReceipt};
