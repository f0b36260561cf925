//! Upload orchestrator
//!
//! Sends a file batch to storage, then asks the service to process what was
//! stored. The two calls are strictly sequential: processing is never
//! attempted unless storage succeeded. Nothing is retried or rolled back.

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::{FileHandle, ProcessingRequest, StoredObject};
use crate::service::{ReconciliationService, ServiceClient};

/// What a successful upload produced
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    /// Storage references, in upload order
    pub stored: Vec<StoredObject>,
}

impl UploadReceipt {
    pub fn len(&self) -> usize {
        self.stored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stored.is_empty()
    }
}

#[derive(Clone)]
pub struct UploadOrchestrator {
    service: ServiceClient,
}

impl UploadOrchestrator {
    pub fn new(service: ServiceClient) -> Self {
        Self { service }
    }

    pub async fn upload(&self, files: &[FileHandle]) -> Result<UploadReceipt> {
        if files.is_empty() {
            return Err(Error::Validation("No files selected".to_string()));
        }

        info!(count = files.len(), backend = self.service.name(), "Uploading batch");
        let stored = self.service.upload_files(files).await?;

        if stored.is_empty() {
            return Err(Error::EmptyResult(
                "storage returned no file references".to_string(),
            ));
        }
        if stored.len() != files.len() {
            warn!(
                sent = files.len(),
                stored = stored.len(),
                "Storage reference count differs from upload count"
            );
        }

        let requests: Vec<ProcessingRequest> = stored.iter().map(ProcessingRequest::from).collect();
        self.service.start_processing(&requests).await?;

        info!(count = stored.len(), "Processing started");
        Ok(UploadReceipt { stored })
    }
}

/// The caller's file selection for one upload interaction
///
/// The selection is cleared only when an upload fully succeeds, so a failed
/// attempt can be retried with the same files.
#[derive(Debug, Clone, Default)]
pub struct UploadBatch {
    files: Vec<FileHandle>,
}

impl UploadBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection
    pub fn select(&mut self, files: Vec<FileHandle>) {
        self.files = files;
    }

    pub fn add(&mut self, file: FileHandle) {
        self.files.push(file);
    }

    pub fn files(&self) -> &[FileHandle] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// Upload the selection; clears it on success only
    pub async fn submit(&mut self, orchestrator: &UploadOrchestrator) -> Result<UploadReceipt> {
        let receipt = orchestrator.upload(&self.files).await?;
        self.clear();
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::service::{MockCall, MockReply, MockService};

    fn pdf(name: &str) -> FileHandle {
        FileHandle::new(name, b"%PDF".to_vec()).unwrap()
    }

    fn orchestrator(mock: &MockService) -> UploadOrchestrator {
        UploadOrchestrator::new(mock.clone().into())
    }

    #[tokio::test]
    async fn test_empty_selection_makes_no_calls() {
        let mock = MockService::new();
        let err = orchestrator(&mock).upload(&[]).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_storage_refs_become_processing_requests() {
        let mock = MockService::new();
        let receipt = orchestrator(&mock)
            .upload(&[pdf("a.pdf"), pdf("b.pdf")])
            .await
            .unwrap();
        assert_eq!(receipt.len(), 2);

        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        match &calls[1] {
            MockCall::Processing { requests } => {
                assert_eq!(requests.len(), 2);
                assert_eq!(requests[0].invoice.invoice_url, "mock://storage/a.pdf");
                assert_eq!(requests[0].invoice.invoice_description, "a.pdf");
                assert_eq!(requests[1].invoice.invoice_description, "b.pdf");
            }
            other => panic!("expected processing call, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_storage_failure_skips_processing() {
        let mock = MockService::new().with_upload(MockReply::Status(413, "too large".into()));
        let err = orchestrator(&mock).upload(&[pdf("a.pdf")]).await.unwrap_err();

        assert_eq!(err.to_string(), "Upload failed: 413 too large");
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_storage_transport_failure_skips_processing() {
        let mock = MockService::new().with_upload(MockReply::Unreachable);
        let err = orchestrator(&mock).upload(&[pdf("a.pdf")]).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(!mock
            .calls()
            .iter()
            .any(|c| matches!(c, MockCall::Processing { .. })));
    }

    #[tokio::test]
    async fn test_no_storage_refs_is_empty_result() {
        let mock = MockService::new().with_upload(MockReply::Body("[]".into()));
        let err = orchestrator(&mock).upload(&[pdf("a.pdf")]).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::EmptyResult);
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_processing_failure_keeps_selection() {
        let mock =
            MockService::new().with_processing(MockReply::Status(500, "workflow error".into()));
        let orchestrator = orchestrator(&mock);

        let mut batch = UploadBatch::new();
        batch.select(vec![pdf("a.pdf"), pdf("b.pdf")]);

        let err = batch.submit(&orchestrator).await.unwrap_err();
        assert_eq!(err.to_string(), "Processing failed: 500 workflow error");
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn test_success_clears_selection() {
        let mock = MockService::new();
        let mut batch = UploadBatch::new();
        batch.add(pdf("a.pdf"));

        batch.submit(&orchestrator(&mock)).await.unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_retry_with_same_selection() {
        let mock = MockService::new().with_processing(MockReply::Unreachable);
        let orchestrator = orchestrator(&mock);
        let mut batch = UploadBatch::new();
        batch.add(pdf("a.pdf"));

        assert!(batch.submit(&orchestrator).await.is_err());

        let healed = MockService::new();
        let retry = UploadOrchestrator::new(healed.clone().into());
        batch.submit(&retry).await.unwrap();

        assert!(batch.is_empty());
        assert_eq!(
            healed.calls()[0],
            MockCall::Upload {
                files: vec!["a.pdf".to_string()]
            }
        );
    }
}
