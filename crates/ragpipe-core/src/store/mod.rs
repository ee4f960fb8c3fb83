//! Storage abstraction for documents and their chunks.
//!
//! The [`DocumentStore`] trait defines the persistence operations the
//! ingestion pipeline and the RAG engine depend on, enabling pluggable
//! backends (SQLite, in-memory, any vector-capable store).
//!
//! # Fault conflation
//!
//! Store methods report faults through their normal return values:
//! `false`, `None`, or an empty Vec. Callers therefore cannot
//! distinguish "nothing found" from "backend fault" through this
//! contract alone, and must not treat an empty search result as
//! evidence of backend health. Implementations log the underlying
//! fault before swallowing it.

pub mod memory;

use async_trait::async_trait;

use crate::models::{Document, SearchResult};

/// Abstract store for documents, chunks, and vector search.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`save_chunks`](DocumentStore::save_chunks) | Persist every chunk of a document |
/// | [`delete_document`](DocumentStore::delete_document) | Remove all chunks for a document id |
/// | [`get_document`](DocumentStore::get_document) | Reconstruct a document from its chunks |
/// | [`get_all_documents`](DocumentStore::get_all_documents) | Group all stored chunks by document |
/// | [`search`](DocumentStore::search) | Cosine-similarity search over chunk embeddings |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist every chunk of `document`. All-or-nothing from the
    /// caller's point of view: if any chunk write fails, the whole call
    /// reports `false` and the caller treats the ingestion as failed.
    async fn save_chunks(&self, document: &Document) -> bool;

    /// Remove every chunk whose `document_id` matches. Idempotent:
    /// deleting an absent id succeeds trivially.
    async fn delete_document(&self, document_id: &str) -> bool;

    /// Collect all chunks with a matching `document_id`, ordered by
    /// page then chunk index. `None` when no chunks match.
    async fn get_document(&self, document_id: &str) -> Option<Document>;

    /// One document per distinct `document_id` found among the stored
    /// chunks. Ordering across documents is unspecified.
    async fn get_all_documents(&self) -> Vec<Document>;

    /// Up to `top_k` chunks most similar to `query_vector` under cosine
    /// similarity, restricted to `score >= min_score`, ordered by
    /// descending score. Empty (never an error) when nothing clears the
    /// threshold.
    async fn search(&self, query_vector: &[f32], top_k: usize, min_score: f32)
        -> Vec<SearchResult>;
}
