//! Mock backend for testing and offline use
//!
//! Replies are scripted per endpoint and every call is recorded, so tests
//! can assert on exactly what the pipeline sent.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::models::{FileHandle, ProcessingRequest, StoredObject};

use super::ReconciliationService;

/// Scripted reply for one endpoint
#[derive(Debug, Clone)]
pub enum MockReply {
    /// 2xx with this body
    Body(String),
    /// Non-success status with this body
    Status(u16, String),
    /// No response at all
    Unreachable,
    /// Never completes
    Hang,
}

/// A call the mock received
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Upload { files: Vec<String> },
    Processing { requests: Vec<ProcessingRequest> },
    Fetch { key: Option<String> },
}

#[derive(Debug, Default)]
struct MockState {
    /// `None` echoes one storage reference per uploaded file
    upload: Option<MockReply>,
    processing: Option<MockReply>,
    results: Option<MockReply>,
    calls: Vec<MockCall>,
}

#[derive(Clone, Default)]
pub struct MockService {
    state: Arc<Mutex<MockState>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_upload(self, reply: MockReply) -> Self {
        self.lock().upload = Some(reply);
        self
    }

    pub fn with_processing(self, reply: MockReply) -> Self {
        self.lock().processing = Some(reply);
        self
    }

    pub fn with_results(self, reply: MockReply) -> Self {
        self.lock().results = Some(reply);
        self
    }

    /// Serve this JSON document as the result set
    pub fn with_results_json(self, body: Value) -> Self {
        self.with_results(MockReply::Body(body.to_string()))
    }

    /// Replace the result-set reply on a shared instance
    pub fn set_results(&self, reply: MockReply) {
        self.lock().results = Some(reply);
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not wedge the others
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record the call and take the reply; the guard is released before any await
    fn record(&self, call: MockCall, pick: fn(&MockState) -> Option<MockReply>) -> Option<MockReply> {
        let mut state = self.lock();
        state.calls.push(call);
        pick(&state)
    }
}

/// Resolve a scripted reply into a body or an error
async fn resolve(reply: MockReply, context: &'static str) -> Result<String> {
    match reply {
        MockReply::Body(body) => Ok(body),
        MockReply::Status(status, body) => Err(Error::HttpStatus {
            context,
            status,
            body,
        }),
        MockReply::Unreachable => Err(Error::Transport(format!(
            "{} endpoint unreachable (mock)",
            context
        ))),
        MockReply::Hang => std::future::pending().await,
    }
}

#[async_trait]
impl ReconciliationService for MockService {
    async fn upload_files(&self, files: &[FileHandle]) -> Result<Vec<StoredObject>> {
        let names: Vec<String> = files.iter().map(|f| f.name().to_string()).collect();
        let reply = self.record(MockCall::Upload { files: names.clone() }, |s| {
            s.upload.clone()
        });

        match reply {
            Some(reply) => {
                let body = resolve(reply, "Upload").await?;
                serde_json::from_str(&body)
                    .map_err(|e| Error::Parse(format!("Invalid upload response: {}", e)))
            }
            None => Ok(names
                .into_iter()
                .map(|name| StoredObject {
                    location: format!("mock://storage/{}", name),
                    key: name,
                })
                .collect()),
        }
    }

    async fn start_processing(&self, requests: &[ProcessingRequest]) -> Result<()> {
        let reply = self.record(
            MockCall::Processing {
                requests: requests.to_vec(),
            },
            |s| s.processing.clone(),
        );

        if let Some(reply) = reply {
            resolve(reply, "Processing").await?;
        }
        Ok(())
    }

    async fn fetch_results(&self, key: Option<&str>) -> Result<String> {
        let reply = self.record(
            MockCall::Fetch {
                key: key.map(str::to_string),
            },
            |s| s.results.clone(),
        );

        match reply {
            Some(reply) => resolve(reply, "Fetch").await,
            None => Ok(sample_results().to_string()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A small result set in the service's own field naming
pub fn sample_results() -> Value {
    json!([
        {
            "id": "1",
            "invoiceNumber": "INV-001",
            "vendor": "Acme Corp",
            "amount": 1500.0,
            "date": "2025-11-01",
            "status": "matched",
            "discrepancyReasons": [],
            "logs": "Invoice matched successfully"
        },
        {
            "id": "2",
            "invoiceNumber": "INV-002",
            "vendor": "Tech Solutions",
            "amount": 2500.0,
            "date": "2025-11-02",
            "status": "mismatch",
            "discrepancyReasons": [{
                "discrepancyField": "amount",
                "discrepancyType": "value_mismatch",
                "discrepancyReason": "Expected 2500.00, found 2450.00"
            }],
            "logs": "Amount mismatch detected during reconciliation"
        },
        {
            "id": "3",
            "invoiceNumber": "INV-003",
            "vendor": "Global Supplies",
            "amount": 750.5,
            "date": "2025-11-03",
            "status": "pending",
            "discrepancyReasons": [
                {
                    "discrepancyField": "date",
                    "discrepancyType": "date_mismatch",
                    "discrepancyReason": "Invoice date not yet received"
                },
                {
                    "discrepancyField": "lineItems",
                    "discrepancyType": "missing_data",
                    "discrepancyReason": "Line item details missing"
                }
            ],
            "logs": "Awaiting supporting documentation"
        },
        {
            "id": "4",
            "invoiceNumber": "INV-004",
            "vendor": "Office Depot",
            "amount": 320.0,
            "date": "2025-11-04",
            "status": "matched",
            "discrepancyReasons": [],
            "logs": "Reconciliation completed"
        },
        {
            "id": "5",
            "invoiceNumber": "INV-005",
            "vendor": "Energy Inc",
            "amount": 3200.75,
            "date": "2025-11-05",
            "status": "exception",
            "discrepancyReasons": [{
                "discrepancyField": "taxAmount",
                "discrepancyType": "calculation_error",
                "discrepancyReason": "Tax calculation differs from PO"
            }],
            "logs": "Manual review required - escalated to finance"
        }
    ])
}
