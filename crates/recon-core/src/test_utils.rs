//! Test utilities for recon-core
//!
//! This module provides a mock reconciliation server emulating the upload,
//! processing, and result-set endpoints, for HTTP-level tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::config::Endpoints;
use crate::service::sample_results;

/// Scripted behavior for the mock server
#[derive(Debug, Clone)]
pub struct MockServerConfig {
    pub upload_status: u16,
    pub processing_status: u16,
    pub results_status: u16,
    /// Body served by the result-set endpoint on success
    pub results: Value,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            upload_status: 200,
            processing_status: 200,
            results_status: 200,
            results: sample_results(),
        }
    }
}

/// What the server has received so far
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub uploaded_files: Vec<String>,
    pub upload_field_names: Vec<String>,
    pub processing_payloads: Vec<Value>,
    pub result_queries: Vec<Option<String>>,
}

#[derive(Clone)]
struct ServerState {
    base_url: String,
    config: MockServerConfig,
    recorded: Arc<Mutex<Recorded>>,
}

/// Mock reconciliation server for testing
pub struct MockReconServer {
    addr: SocketAddr,
    recorded: Arc<Mutex<Recorded>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockReconServer {
    /// Start the mock server on an available port
    pub async fn start(config: MockServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let state = ServerState {
            base_url: format!("http://{}", addr),
            config,
            recorded: Arc::clone(&recorded),
        };

        let app = Router::new()
            .route("/upload", post(handle_upload))
            .route("/process", post(handle_process))
            .route("/results", get(handle_results))
            .with_state(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            recorded,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Endpoints pointing at this server
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            upload_url: format!("{}/upload", self.url()),
            processing_url: format!("{}/process", self.url()),
            results_url: format!("{}/results", self.url()),
        }
    }

    pub fn recorded(&self) -> Recorded {
        self.recorded.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockReconServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Multipart storage endpoint; echoes one storage reference per file part
async fn handle_upload(State(state): State<ServerState>, mut multipart: Multipart) -> Response {
    let mut stored = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let _ = field.bytes().await;

        stored.push(json!({
            "Location": format!("{}/uploads/{}", state.base_url, file_name),
            "key": format!("uploads/{}", file_name),
        }));

        let mut recorded = state.recorded.lock().unwrap();
        recorded.upload_field_names.push(field_name);
        recorded.uploaded_files.push(file_name);
    }

    if state.config.upload_status != 200 {
        return (status(state.config.upload_status), "upload rejected").into_response();
    }
    Json(Value::Array(stored)).into_response()
}

async fn handle_process(State(state): State<ServerState>, Json(payload): Json<Value>) -> Response {
    state
        .recorded
        .lock()
        .unwrap()
        .processing_payloads
        .push(payload);

    if state.config.processing_status != 200 {
        return (status(state.config.processing_status), "processing rejected").into_response();
    }
    Json(json!({"message": "Workflow was started"})).into_response()
}

#[derive(Debug, Deserialize)]
struct ResultsQuery {
    q: Option<String>,
}

async fn handle_results(
    State(state): State<ServerState>,
    Query(query): Query<ResultsQuery>,
) -> Response {
    state.recorded.lock().unwrap().result_queries.push(query.q);

    if state.config.results_status != 200 {
        return (status(state.config.results_status), "not found").into_response();
    }
    Json(state.config.results.clone()).into_response()
}
