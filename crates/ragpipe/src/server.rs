//! HTTP API server.
//!
//! Exposes the ingestion pipeline and the RAG engine as a JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/documents` | Ingest an uploaded document (base64 payload) |
//! | `GET`  | `/documents` | List ingested documents |
//! | `GET`  | `/documents/{id}` | Retrieve one document with its chunks |
//! | `DELETE` | `/documents/{id}` | Delete a document and its chunks |
//! | `POST` | `/search` | Vector search over indexed chunks |
//! | `POST` | `/ask` | Answer a question with citations |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error contract
//!
//! All error responses use one envelope:
//!
//! ```json
//! { "error": { "code": "not_configured", "message": "..." } }
//! ```
//!
//! A missing backend or an unreachable model endpoint is `503`, never
//! an empty result; an unknown document id is `404`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use ragpipe_core::chunk::TextChunker;
use ragpipe_core::error::RagError;
use ragpipe_core::ingest::IngestionPipeline;
use ragpipe_core::models::Document;
use ragpipe_core::rag::RagEngine;
use ragpipe_core::store::DocumentStore;

use crate::backend::create_backend;
use crate::config::Config;
use crate::db;
use crate::extract::{content_type_for, FileExtractor};
use crate::sqlite_store::SqliteStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<SqliteStore>,
    pipeline: Arc<IngestionPipeline>,
    engine: Arc<RagEngine>,
}

/// Start the HTTP server on the configured bind address.
///
/// Requires the database to be initialized first (`rgp init`). Runs
/// until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let pool = db::connect(config).await?;
    let store = Arc::new(SqliteStore::new(pool));
    let store_dyn: Arc<dyn DocumentStore> = store.clone();

    let chunker = TextChunker::new(config.chunking.chunk_size, config.chunking.overlap)?;
    let backend = create_backend(&config.backend)?;

    let mut pipeline =
        IngestionPipeline::new(Arc::new(FileExtractor), chunker).with_store(store_dyn.clone());
    let mut engine = RagEngine::new(store_dyn);
    if let Some(backend) = backend {
        pipeline = pipeline.with_embedding(backend.embedder.clone());
        engine = engine.with_backend(backend);
    }

    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        pipeline: Arc::new(pipeline),
        engine: Arc::new(engine),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/documents", post(handle_ingest).get(handle_list))
        .route("/documents/{id}", get(handle_get).delete(handle_delete))
        .route("/search", post(handle_search))
        .route("/ask", post(handle_ask))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("ragpipe API listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        let message = err.to_string();
        let (status, code) = classify(&err);
        Self::new(status, code, message)
    }
}

/// Map an error kind (following the pipeline wrapper down to its
/// cause) onto an HTTP status and machine-readable code.
fn classify(err: &RagError) -> (StatusCode, &'static str) {
    match err {
        RagError::Configuration(_) => (StatusCode::SERVICE_UNAVAILABLE, "not_configured"),
        RagError::BackendUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "backend_unavailable"),
        RagError::Extraction(_) => (StatusCode::BAD_REQUEST, "extraction_failed"),
        RagError::InvalidResponse(_) => (StatusCode::BAD_GATEWAY, "invalid_backend_response"),
        RagError::Pipeline { source, .. } => classify(source),
    }
}

// ============ Request/response shapes ============

#[derive(Deserialize)]
struct IngestRequest {
    file_name: String,
    /// Defaults to a guess from the file name's extension.
    content_type: Option<String>,
    /// Base64-encoded file content.
    content_base64: String,
}

#[derive(Serialize)]
struct DocumentSummary {
    id: String,
    file_name: String,
    status: String,
    chunk_count: usize,
    uploaded_at: String,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            file_name: doc.file_name.clone(),
            status: doc.status.to_string(),
            chunk_count: doc.chunks.len(),
            uploaded_at: doc.uploaded_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
struct ChunkDetail {
    id: String,
    chunk_index: i64,
    page_number: i64,
    text: String,
    metadata: std::collections::HashMap<String, serde_json::Value>,
}

#[derive(Serialize)]
struct DocumentDetail {
    id: String,
    file_name: String,
    content_type: String,
    file_size: u64,
    status: String,
    uploaded_at: String,
    chunks: Vec<ChunkDetail>,
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    top_k: Option<usize>,
    min_score: Option<f32>,
}

#[derive(Serialize)]
struct SearchHit {
    document_id: String,
    page_number: i64,
    chunk_index: i64,
    score: f32,
    text: String,
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    top_k: Option<usize>,
}

// ============ Handlers ============

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handle_ingest(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<DocumentSummary>, AppError> {
    if req.file_name.trim().is_empty() {
        return Err(AppError::bad_request("file_name must not be empty"));
    }
    let bytes = BASE64
        .decode(&req.content_base64)
        .map_err(|e| AppError::bad_request(format!("invalid base64 content: {e}")))?;

    let content_type = req
        .content_type
        .unwrap_or_else(|| content_type_for(&req.file_name).to_string());

    match state
        .pipeline
        .process_document(&bytes, &req.file_name, &content_type)
        .await
    {
        Ok(document) => Ok(Json(DocumentSummary::from(&document))),
        Err(err) => Err(AppError::from(err.source)),
    }
}

async fn handle_list(State(state): State<AppState>) -> Json<Vec<DocumentSummary>> {
    let documents = state.store.get_all_documents().await;
    Json(documents.iter().map(DocumentSummary::from).collect())
}

async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentDetail>, AppError> {
    let document = state
        .store
        .get_document(&id)
        .await
        .ok_or_else(|| AppError::not_found(format!("no document with id {id}")))?;

    Ok(Json(DocumentDetail {
        id: document.id.clone(),
        file_name: document.file_name.clone(),
        content_type: document.content_type.clone(),
        file_size: document.file_size,
        status: document.status.to_string(),
        uploaded_at: document.uploaded_at.to_rfc3339(),
        chunks: document
            .chunks
            .into_iter()
            .map(|c| ChunkDetail {
                id: c.id,
                chunk_index: c.chunk_index,
                page_number: c.page_number,
                text: c.text,
                metadata: c.metadata,
            })
            .collect(),
    }))
}

async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    let deleted = state.store.delete_document(&id).await;
    Json(serde_json::json!({ "id": id, "deleted": deleted }))
}

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<Vec<SearchHit>>, AppError> {
    if req.query.trim().is_empty() {
        return Err(AppError::bad_request("query must not be empty"));
    }
    let top_k = req.top_k.unwrap_or(state.config.retrieval.top_k);
    let min_score = req.min_score.unwrap_or(state.config.retrieval.min_score);

    let results = state.engine.search(&req.query, top_k, min_score).await?;
    Ok(Json(
        results
            .into_iter()
            .map(|r| SearchHit {
                document_id: r.chunk.document_id,
                page_number: r.chunk.page_number,
                chunk_index: r.chunk.chunk_index,
                score: r.score,
                text: r.chunk.text,
            })
            .collect(),
    ))
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<ragpipe_core::models::RagResponse>, AppError> {
    if req.question.trim().is_empty() {
        return Err(AppError::bad_request("question must not be empty"));
    }
    let top_k = req.top_k.unwrap_or(state.config.retrieval.top_k);
    let response = state.engine.generate_answer(&req.question, top_k).await?;
    Ok(Json(response))
}
