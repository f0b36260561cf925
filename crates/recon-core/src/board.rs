//! Caller-side invoice state
//!
//! `InvoiceBoard` is what a presentation layer keeps between fetches: the
//! last good collection, the last error, and the fetch in flight. "Not yet
//! loaded" is its own state, distinct from "loaded and empty".

use std::sync::Arc;

use crate::error::{Error, ErrorKind, Result};
use crate::fetch::{FetchController, FetchData, FetchHandle, FetchPhase};
use crate::models::Invoice;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadState {
    #[default]
    NotLoaded,
    /// An immutable snapshot, replaced wholesale on each successful fetch
    Loaded(Arc<[Invoice]>),
}

impl LoadState {
    pub fn invoices(&self) -> Option<&[Invoice]> {
        match self {
            Self::NotLoaded => None,
            Self::Loaded(invoices) => Some(invoices.as_ref()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// Error summary kept for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for BoardError {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct InvoiceBoard {
    state: LoadState,
    last_error: Option<BoardError>,
    in_flight: Option<FetchHandle>,
}

impl InvoiceBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn invoices(&self) -> Option<&[Invoice]> {
        self.state.invoices()
    }

    /// Shared snapshot of the current collection
    pub fn snapshot(&self) -> Option<Arc<[Invoice]>> {
        match &self.state {
            LoadState::Loaded(invoices) => Some(Arc::clone(invoices)),
            LoadState::NotLoaded => None,
        }
    }

    pub fn last_error(&self) -> Option<&BoardError> {
        self.last_error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|h| !h.phase().is_terminal())
    }

    pub fn in_flight(&self) -> Option<&FetchHandle> {
        self.in_flight.as_ref()
    }

    /// Start a batch fetch, cancelling any fetch it supersedes
    ///
    /// Also the retry path after a failure.
    pub fn refresh(&mut self, controller: &FetchController) -> &FetchHandle {
        if let Some(stale) = self.in_flight.take() {
            controller.cancel(&stale);
        }
        self.in_flight.insert(controller.start_fetch(None))
    }

    /// Wait for the in-flight fetch and apply its outcome
    pub async fn settle(&mut self) -> Option<Result<()>> {
        let handle = self.in_flight.take()?;
        let outcome = handle.wait().await;
        Some(self.apply(outcome))
    }

    /// Apply a fetch outcome
    ///
    /// Success replaces the collection and clears the error. Any failure,
    /// including an empty result, keeps the previous collection.
    pub fn apply(&mut self, outcome: Result<FetchData>) -> Result<()> {
        match outcome {
            Ok(FetchData::Batch(invoices)) => {
                self.state = LoadState::Loaded(invoices.into());
                self.last_error = None;
                Ok(())
            }
            Ok(FetchData::Detail(_)) => {
                let err = Error::Validation("detail result applied to invoice list".to_string());
                self.last_error = Some(BoardError::from(&err));
                Err(err)
            }
            Err(err) => {
                self.last_error = Some(BoardError::from(&err));
                Err(err)
            }
        }
    }

    /// Phase of the tracked fetch, `Idle` when none
    pub fn phase(&self) -> FetchPhase {
        self.in_flight
            .as_ref()
            .map(|h| h.phase())
            .unwrap_or(FetchPhase::Idle)
    }
}
