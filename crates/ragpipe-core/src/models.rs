//! Core data models used throughout ragpipe.
//!
//! These types represent the documents, chunks, and results that flow
//! through the ingestion and retrieval pipeline. The document store is
//! the system of record for persisted state; orchestrators only hold
//! request-scoped copies.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an ingested document.
///
/// Progression is monotonic and driven solely by the ingestion pipeline:
/// `Pending → Processing → {Completed | CompletedNoIndexing | Failed}`.
/// The three rightmost states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    /// The pipeline finished but no store was configured, so nothing
    /// was indexed.
    CompletedNoIndexing,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::CompletedNoIndexing => "completed_no_indexing",
            DocumentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DocumentStatus::Pending),
            "processing" => Ok(DocumentStatus::Processing),
            "completed" => Ok(DocumentStatus::Completed),
            "completed_no_indexing" => Ok(DocumentStatus::CompletedNoIndexing),
            "failed" => Ok(DocumentStatus::Failed),
            other => Err(format!("unknown document status: {other}")),
        }
    }
}

/// One ingested source file together with its chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Opaque unique identifier, generated at creation, immutable.
    pub id: String,
    pub file_name: String,
    pub content_type: String,
    pub file_size: u64,
    pub uploaded_at: DateTime<Utc>,
    pub status: DocumentStatus,
    /// Ordered chunk sequence, populated once at the end of a
    /// successful chunk+embed phase.
    pub chunks: Vec<DocumentChunk>,
}

impl Document {
    /// Create a fresh document in the `Pending` state.
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        file_size: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            file_size,
            uploaded_at: Utc::now(),
            status: DocumentStatus::Pending,
            chunks: Vec::new(),
        }
    }
}

/// One retrievable unit of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    /// Lookup key back to the owning document.
    pub document_id: String,
    /// Literal substring of the source page text.
    pub text: String,
    /// 0-based position within the page (page-local, not global).
    pub chunk_index: i64,
    /// Source page, 1-based; 0 when the source is not paginated.
    pub page_number: i64,
    /// Absent until the embedding phase completes for this chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Auxiliary key/value pairs; carries at least `start_index` and
    /// `end_index`, the chunk's char offsets in the page text.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Page-numbered plain text produced by an extraction backend.
///
/// Page numbers are 1-based and contiguous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContent {
    pub page_number: i64,
    pub text: String,
}

/// A chunk paired with its similarity score (higher = more similar).
///
/// Produced only by a store search call; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// An excerpt cited in a [`RagResponse`], mirroring one retrieved chunk.
#[derive(Debug, Clone, Serialize)]
pub struct SourceChunk {
    pub text: String,
    pub score: f32,
    pub document_id: String,
    pub page_number: i64,
    pub chunk_index: i64,
}

/// The answer to one RAG query. Ephemeral, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    pub question: String,
    pub answer: String,
    /// Same order as the context block fed to the generation backend.
    pub sources: Vec<SourceChunk>,
    pub tokens_used: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document_starts_pending() {
        let doc = Document::new("report.pdf", "application/pdf", 1024);
        assert_eq!(doc.status, DocumentStatus::Pending);
        assert!(doc.chunks.is_empty());
        assert!(!doc.id.is_empty());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            DocumentStatus::Pending,
            DocumentStatus::Processing,
            DocumentStatus::Completed,
            DocumentStatus::CompletedNoIndexing,
            DocumentStatus::Failed,
        ] {
            let parsed: DocumentStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("done".parse::<DocumentStatus>().is_err());
    }
}
