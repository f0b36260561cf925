//! Reconciliation service abstraction
//!
//! The external reconciliation service is opaque: it stores uploaded
//! documents, runs its own matching, and serves a result set. This module
//! is the seam between the pipeline and that service.
//!
//! # Architecture
//!
//! - `ReconciliationService` trait: the three calls the pipeline makes
//! - `ServiceClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `HttpService`, `MockService`
//!
//! # Configuration
//!
//! `ServiceClient::from_config` picks the backend named by `service.backend`
//! in the config file (`http` by default, `mock` for offline use).

mod http;
mod mock;

pub use http::HttpService;
pub use mock::{sample_results, MockCall, MockReply, MockService};

use async_trait::async_trait;

use crate::config::{Backend, Config};
use crate::error::Result;
use crate::models::{FileHandle, ProcessingRequest, StoredObject};

/// Trait defining the calls the pipeline makes against the reconciliation service
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait ReconciliationService: Send + Sync {
    /// Upload a batch of files; returns one storage reference per file, in order
    async fn upload_files(&self, files: &[FileHandle]) -> Result<Vec<StoredObject>>;

    /// Ask the service to start processing previously uploaded files
    async fn start_processing(&self, requests: &[ProcessingRequest]) -> Result<()>;

    /// Fetch the raw result-set body, optionally filtered to one invoice
    async fn fetch_results(&self, key: Option<&str>) -> Result<String>;

    /// Backend name (for logging)
    fn name(&self) -> &str;
}

/// Concrete service client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum ServiceClient {
    /// HTTP endpoints
    Http(HttpService),
    /// In-memory backend for testing
    Mock(MockService),
}

impl ServiceClient {
    /// Build the backend selected in the config
    pub fn from_config(config: &Config) -> Self {
        match config.backend {
            Backend::Http => ServiceClient::Http(HttpService::new(config.endpoints.clone())),
            Backend::Mock => {
                tracing::info!("Using mock reconciliation service");
                ServiceClient::Mock(MockService::new())
            }
        }
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        ServiceClient::Mock(MockService::new())
    }
}

impl From<MockService> for ServiceClient {
    fn from(mock: MockService) -> Self {
        ServiceClient::Mock(mock)
    }
}

impl From<HttpService> for ServiceClient {
    fn from(http: HttpService) -> Self {
        ServiceClient::Http(http)
    }
}

// Implement ReconciliationService for ServiceClient by delegating to the inner backend
#[async_trait]
impl ReconciliationService for ServiceClient {
    async fn upload_files(&self, files: &[FileHandle]) -> Result<Vec<StoredObject>> {
        match self {
            ServiceClient::Http(s) => s.upload_files(files).await,
            ServiceClient::Mock(s) => s.upload_files(files).await,
        }
    }

    async fn start_processing(&self, requests: &[ProcessingRequest]) -> Result<()> {
        match self {
            ServiceClient::Http(s) => s.start_processing(requests).await,
            ServiceClient::Mock(s) => s.start_processing(requests).await,
        }
    }

    async fn fetch_results(&self, key: Option<&str>) -> Result<String> {
        match self {
            ServiceClient::Http(s) => s.fetch_results(key).await,
            ServiceClient::Mock(s) => s.fetch_results(key).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            ServiceClient::Http(s) => s.name(),
            ServiceClient::Mock(s) => s.name(),
        }
    }
}
