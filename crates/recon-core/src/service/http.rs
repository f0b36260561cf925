//! HTTP backend implementation
//!
//! Talks to the upload, processing, and result-set endpoints configured in
//! [`Endpoints`]. Status handling is uniform: any non-2xx becomes
//! `Error::HttpStatus` carrying the response text.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use tracing::debug;

use crate::config::Endpoints;
use crate::error::{Error, Result};
use crate::models::{FileHandle, ProcessingRequest, StoredObject};

use super::ReconciliationService;

#[derive(Clone)]
pub struct HttpService {
    http_client: Client,
    endpoints: Endpoints,
}

impl HttpService {
    pub fn new(endpoints: Endpoints) -> Self {
        Self::with_client(Client::new(), endpoints)
    }

    /// Create with a preconfigured reqwest client
    pub fn with_client(http_client: Client, endpoints: Endpoints) -> Self {
        Self {
            http_client,
            endpoints,
        }
    }
}

/// Turn a non-success response into `Error::HttpStatus`
async fn check_status(response: Response, context: &'static str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::HttpStatus {
        context,
        status: status.as_u16(),
        body: body.trim().to_string(),
    })
}

#[async_trait]
impl ReconciliationService for HttpService {
    async fn upload_files(&self, files: &[FileHandle]) -> Result<Vec<StoredObject>> {
        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.bytes().to_vec())
                .file_name(file.name().to_string())
                .mime_str(file.content_type())?;
            form = form.part("files", part);
        }

        debug!(
            url = %self.endpoints.upload_url,
            count = files.len(),
            "Uploading files"
        );

        let response = self
            .http_client
            .post(&self.endpoints.upload_url)
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response, "Upload").await?;

        let body = response.text().await?;
        debug!("Upload response: {}", body);

        serde_json::from_str(&body)
            .map_err(|e| Error::Parse(format!("Invalid upload response: {}", e)))
    }

    async fn start_processing(&self, requests: &[ProcessingRequest]) -> Result<()> {
        debug!(
            url = %self.endpoints.processing_url,
            count = requests.len(),
            "Starting processing"
        );

        let response = self
            .http_client
            .post(&self.endpoints.processing_url)
            .json(requests)
            .send()
            .await?;

        // Body is not consumed
        check_status(response, "Processing").await?;
        Ok(())
    }

    async fn fetch_results(&self, key: Option<&str>) -> Result<String> {
        let mut request = self.http_client.get(&self.endpoints.results_url);
        if let Some(key) = key {
            request = request.query(&[("q", key)]);
        }

        debug!(url = %self.endpoints.results_url, key = ?key, "Fetching results");

        let response = request.send().await?;
        let response = check_status(response, "Fetch").await?;
        Ok(response.text().await?)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils::{MockReconServer, MockServerConfig};
    use serde_json::json;

    fn file(name: &str) -> FileHandle {
        FileHandle::new(name, b"%PDF-1.4 test".to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_and_parses_storage_refs() {
        let server = MockReconServer::start(MockServerConfig::default()).await;
        let service = HttpService::new(server.endpoints());

        let stored = service
            .upload_files(&[file("a.pdf"), file("b.pdf")])
            .await
            .unwrap();

        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].key, "uploads/a.pdf");
        assert!(stored[1].location.ends_with("/uploads/b.pdf"));

        let recorded = server.recorded();
        assert_eq!(recorded.uploaded_files, vec!["a.pdf", "b.pdf"]);
        assert_eq!(recorded.upload_field_names, vec!["files", "files"]);
    }

    #[tokio::test]
    async fn test_upload_status_error_carries_body() {
        let server = MockReconServer::start(MockServerConfig {
            upload_status: 500,
            ..Default::default()
        })
        .await;
        let service = HttpService::new(server.endpoints());

        let err = service.upload_files(&[file("a.pdf")]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HttpStatus);
        assert!(err.to_string().starts_with("Upload failed: 500"));
    }

    #[tokio::test]
    async fn test_processing_posts_json_array() {
        let server = MockReconServer::start(MockServerConfig::default()).await;
        let service = HttpService::new(server.endpoints());

        let stored = StoredObject {
            location: "https://bucket.example/a.pdf".to_string(),
            key: "uploads/a.pdf".to_string(),
        };
        service
            .start_processing(&[ProcessingRequest::from(&stored)])
            .await
            .unwrap();

        let recorded = server.recorded();
        assert_eq!(
            recorded.processing_payloads,
            vec![json!([{"invoice": {
                "invoiceUrl": "https://bucket.example/a.pdf",
                "invoiceDescription": "uploads/a.pdf"
            }}])]
        );
    }

    #[tokio::test]
    async fn test_processing_failure() {
        let server = MockReconServer::start(MockServerConfig {
            processing_status: 503,
            ..Default::default()
        })
        .await;
        let service = HttpService::new(server.endpoints());

        let err = service.start_processing(&[]).await.unwrap_err();
        assert!(err.to_string().starts_with("Processing failed: 503"));
    }

    #[tokio::test]
    async fn test_fetch_passes_query_key() {
        let server = MockReconServer::start(MockServerConfig {
            results: json!({"data": [{"invoiceNumber": "INV-002"}]}),
            ..Default::default()
        })
        .await;
        let service = HttpService::new(server.endpoints());

        let body = service.fetch_results(Some("INV-002")).await.unwrap();
        assert!(body.contains("INV-002"));

        service.fetch_results(None).await.unwrap();
        let recorded = server.recorded();
        assert_eq!(
            recorded.result_queries,
            vec![Some("INV-002".to_string()), None]
        );
    }

    #[tokio::test]
    async fn test_fetch_status_error() {
        let server = MockReconServer::start(MockServerConfig {
            results_status: 404,
            ..Default::default()
        })
        .await;
        let service = HttpService::new(server.endpoints());

        let err = service.fetch_results(None).await.unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_transport_timeout_is_cancelled() {
        // Accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(200))
            .build()
            .unwrap();
        let url = format!("http://{}/results", addr);
        let service = HttpService::with_client(
            client,
            Endpoints {
                upload_url: url.clone(),
                processing_url: url.clone(),
                results_url: url,
            },
        );

        let err = service.fetch_results(None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(err.to_string().contains("aborted by transport"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let service = HttpService::new(Endpoints {
            upload_url: "http://127.0.0.1:9/upload".to_string(),
            processing_url: "http://127.0.0.1:9/process".to_string(),
            results_url: "http://127.0.0.1:9/results".to_string(),
        });

        let err = service.fetch_results(None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
