//! Fetch lifecycle controller
//!
//! Each `start_fetch` spawns one retrieval on the runtime and hands back a
//! [`FetchHandle`]. A fetch moves `Idle -> Loading -> {Succeeded, Failed,
//! Cancelled}` and never leaves a terminal phase. Concurrent fetches are not
//! coalesced; a caller that issues a new fetch is expected to cancel the
//! one it supersedes.
//!
//! Cancellation comes from three places and always resolves to
//! `Error::Cancelled`:
//! - the caller, through the handle or its own `CancellationToken`
//! - the implicit ceiling, applied only when the caller supplies no signal
//! - the transport, when reqwest reports a timeout

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{Invoice, InvoiceDetail};
use crate::normalize::{NormalizationWarning, Normalizer};
use crate::service::{ReconciliationService, ServiceClient};

/// Lifecycle phase of one fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    Idle,
    Loading,
    Succeeded,
    Failed,
    Cancelled,
}

impl FetchPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    fn of<T>(outcome: &Result<T>) -> Self {
        match outcome {
            Ok(_) => Self::Succeeded,
            Err(e) if e.is_cancelled() => Self::Cancelled,
            Err(_) => Self::Failed,
        }
    }
}

/// Payload of a successful fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchData {
    /// Full result set
    Batch(Vec<Invoice>),
    /// Single invoice looked up by key
    Detail(Box<InvoiceDetail>),
}

impl FetchData {
    pub fn into_batch(self) -> Option<Vec<Invoice>> {
        match self {
            Self::Batch(invoices) => Some(invoices),
            Self::Detail(_) => None,
        }
    }

    pub fn into_detail(self) -> Option<InvoiceDetail> {
        match self {
            Self::Detail(detail) => Some(*detail),
            Self::Batch(_) => None,
        }
    }
}

/// Handle to one in-flight fetch
#[derive(Debug)]
pub struct FetchHandle {
    id: u64,
    key: Option<String>,
    token: CancellationToken,
    phase: watch::Receiver<FetchPhase>,
    task: JoinHandle<Result<FetchData>>,
}

impl FetchHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Lookup key, or `None` for a batch fetch
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Request cancellation; no effect once the fetch is terminal
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token that cancels this fetch, for wiring to an external signal
    pub fn cancel_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn phase(&self) -> FetchPhase {
        *self.phase.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the phase to change (for callers rendering a loading state)
    pub async fn changed(&mut self) -> FetchPhase {
        // The sender lives until the task ends; after that the phase is final
        let _ = self.phase.changed().await;
        *self.phase.borrow_and_update()
    }

    /// Wait for the outcome
    pub async fn wait(self) -> Result<FetchData> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(Error::Cancelled("fetch task aborted".to_string())),
        }
    }
}

pub struct FetchController {
    service: ServiceClient,
    timeout: Duration,
    normalizer: Option<Normalizer>,
    next_id: AtomicU64,
}

impl FetchController {
    /// Create a controller with the given implicit ceiling
    pub fn new(service: ServiceClient, timeout: Duration) -> Self {
        Self {
            service,
            timeout,
            normalizer: None,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ServiceClient::from_config(config), config.fetch_timeout)
    }

    /// Pin the normalizer (and so the "today" date default)
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn service(&self) -> &ServiceClient {
        &self.service
    }

    /// Start a fetch bounded by the implicit ceiling
    ///
    /// A blank key is treated as a batch fetch.
    pub fn start_fetch(&self, key: Option<&str>) -> FetchHandle {
        self.spawn(key, CancellationToken::new(), Some(self.timeout))
    }

    /// Start a fetch governed only by the caller's signal
    ///
    /// Cancelling the handle does not cancel `signal` itself.
    pub fn start_fetch_with_signal(&self, key: Option<&str>, signal: CancellationToken) -> FetchHandle {
        self.spawn(key, signal.child_token(), None)
    }

    pub fn cancel(&self, handle: &FetchHandle) {
        debug!(fetch = handle.id, "Cancelling fetch");
        handle.cancel();
    }

    fn spawn(
        &self,
        key: Option<&str>,
        token: CancellationToken,
        ceiling: Option<Duration>,
    ) -> FetchHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let key = key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);
        let (phase_tx, phase_rx) = watch::channel(FetchPhase::Idle);

        let service = self.service.clone();
        let normalizer = self.normalizer;
        let task_key = key.clone();
        let task_token = token.clone();

        let task = tokio::spawn(async move {
            phase_tx.send_replace(FetchPhase::Loading);
            info!(fetch = id, key = ?task_key, backend = service.name(), "Fetch started");

            let outcome = tokio::select! {
                biased;
                _ = task_token.cancelled() => {
                    Err(Error::Cancelled("fetch cancelled by caller".to_string()))
                }
                _ = ceiling_elapsed(ceiling) => {
                    task_token.cancel();
                    Err(Error::Cancelled(format!(
                        "fetch timed out after {}s",
                        ceiling.map(|d| d.as_secs()).unwrap_or_default()
                    )))
                }
                result = run_fetch(&service, task_key.as_deref(), normalizer) => result,
            };

            match &outcome {
                Ok(_) => info!(fetch = id, "Fetch succeeded"),
                Err(e) if e.is_cancelled() => info!(fetch = id, "Fetch cancelled: {}", e),
                Err(e) => warn!(fetch = id, "Fetch failed: {}", e),
            }
            phase_tx.send_replace(FetchPhase::of(&outcome));
            outcome
        });

        FetchHandle {
            id,
            key,
            token,
            phase: phase_rx,
            task,
        }
    }
}

async fn ceiling_elapsed(ceiling: Option<Duration>) {
    match ceiling {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

async fn run_fetch(
    service: &ServiceClient,
    key: Option<&str>,
    normalizer: Option<Normalizer>,
) -> Result<FetchData> {
    let body = service.fetch_results(key).await?;
    let raw = parse_body(&body)?;
    let normalizer = normalizer.unwrap_or_else(Normalizer::today);

    match key {
        None => {
            let normalized = normalizer.normalize(&raw)?;
            log_warnings(&normalized.warnings);
            debug!(count = normalized.invoices.len(), "Normalized result set");
            Ok(FetchData::Batch(normalized.invoices))
        }
        Some(key) => {
            let normalized = normalizer.normalize_detail(&raw, key)?;
            log_warnings(&normalized.warnings);
            Ok(FetchData::Detail(Box::new(normalized.detail)))
        }
    }
}

/// Decode a result-set body, separating "nothing there" from "not JSON"
fn parse_body(body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Err(Error::EmptyResult("response body was empty".to_string()));
    }
    serde_json::from_str(body).map_err(|e| Error::Parse(format!("Invalid result-set JSON: {}", e)))
}

fn log_warnings(warnings: &[NormalizationWarning]) {
    for warning in warnings {
        debug!("Normalization: {}", warning);
    }
}
