//! Ingestion pipeline orchestration.
//!
//! Drives one document through extract → chunk → embed → persist and
//! owns the document's status state machine:
//!
//! ```text
//! pending → processing → { completed | completed_no_indexing | failed }
//! ```
//!
//! Embedding and persistence are explicit pipeline stages rather than
//! nullable fields, so the three terminal outcomes stay exhaustive: a
//! pipeline without an [`IndexingStage::Persist`] store always ends in
//! `completed_no_indexing`, and a missing [`EmbeddingStage::Embed`]
//! client silently leaves chunks unembedded.
//!
//! The run is strictly sequential and non-resumable: a failure at any
//! step leaves nothing partially indexed, and the caller must resubmit
//! the whole document to retry.

use std::sync::Arc;

use thiserror::Error;

use crate::chunk::TextChunker;
use crate::embedding::EmbeddingClient;
use crate::error::RagError;
use crate::extract::PageExtractor;
use crate::models::{Document, DocumentChunk, DocumentStatus};
use crate::store::DocumentStore;

/// Whether chunk texts are embedded before persistence.
#[derive(Clone)]
pub enum EmbeddingStage {
    Embed(Arc<dyn EmbeddingClient>),
    Skip,
}

/// Whether the finished document is written to a store.
#[derive(Clone)]
pub enum IndexingStage {
    Persist(Arc<dyn DocumentStore>),
    Skip,
}

/// An ingestion failure, carrying the document in its terminal
/// `failed` state alongside the wrapped cause.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct IngestError {
    pub document: Box<Document>,
    #[source]
    pub source: RagError,
}

/// Orchestrates the document ingestion pipeline.
///
/// Construct with the required extraction and chunking capabilities,
/// then opt stages in:
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use ragpipe_core::chunk::TextChunker;
/// # use ragpipe_core::ingest::IngestionPipeline;
/// # fn demo(extractor: Arc<dyn ragpipe_core::extract::PageExtractor>,
/// #         store: Arc<dyn ragpipe_core::store::DocumentStore>) {
/// let pipeline = IngestionPipeline::new(extractor, TextChunker::default())
///     .with_store(store);
/// # }
/// ```
pub struct IngestionPipeline {
    extractor: Arc<dyn PageExtractor>,
    chunker: TextChunker,
    embedding: EmbeddingStage,
    indexing: IndexingStage,
}

impl IngestionPipeline {
    pub fn new(extractor: Arc<dyn PageExtractor>, chunker: TextChunker) -> Self {
        Self {
            extractor,
            chunker,
            embedding: EmbeddingStage::Skip,
            indexing: IndexingStage::Skip,
        }
    }

    pub fn with_embedding(mut self, client: Arc<dyn EmbeddingClient>) -> Self {
        self.embedding = EmbeddingStage::Embed(client);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.indexing = IndexingStage::Persist(store);
        self
    }

    /// Run one document through the whole pipeline.
    ///
    /// Returns the document in a terminal state. A store that reports a
    /// save failure yields `Ok` with `status == Failed` (a handled
    /// outcome); faults during extraction or embedding yield an
    /// [`IngestError`] whose document is also terminally `failed`.
    pub async fn process_document(
        &self,
        bytes: &[u8],
        file_name: &str,
        content_type: &str,
    ) -> Result<Document, IngestError> {
        let mut document = Document::new(file_name, content_type, bytes.len() as u64);
        document.status = DocumentStatus::Processing;
        tracing::info!(document_id = %document.id, file_name, "ingesting document");

        match self.run_stages(bytes, &mut document).await {
            Ok(()) => {
                tracing::info!(
                    document_id = %document.id,
                    chunks = document.chunks.len(),
                    status = %document.status,
                    "ingestion finished"
                );
                Ok(document)
            }
            Err(err) => {
                document.status = DocumentStatus::Failed;
                tracing::warn!(document_id = %document.id, error = %err, "ingestion failed");
                Err(IngestError {
                    source: RagError::pipeline(
                        format!("failed to process document '{file_name}'"),
                        err,
                    ),
                    document: Box::new(document),
                })
            }
        }
    }

    async fn run_stages(&self, bytes: &[u8], document: &mut Document) -> Result<(), RagError> {
        let pages = self
            .extractor
            .extract_pages(bytes, &document.content_type)
            .await?;
        tracing::debug!(document_id = %document.id, pages = pages.len(), "extracted text");

        let mut chunks: Vec<DocumentChunk> = Vec::new();
        for page in &pages {
            chunks.extend(
                self.chunker
                    .chunk_text(&page.text, &document.id, page.page_number),
            );
        }

        if let EmbeddingStage::Embed(client) = &self.embedding {
            if !chunks.is_empty() {
                let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
                let vectors = client.embed_batch(&texts).await?;
                if vectors.len() != chunks.len() {
                    return Err(RagError::InvalidResponse(format!(
                        "embedding backend returned {} vectors for {} chunks",
                        vectors.len(),
                        chunks.len()
                    )));
                }
                for (chunk, vector) in chunks.iter_mut().zip(vectors) {
                    chunk.embedding = Some(vector);
                }
                tracing::debug!(document_id = %document.id, chunks = chunks.len(), "embedded chunks");
            }
        }

        document.chunks = chunks;

        match &self.indexing {
            IndexingStage::Persist(store) => {
                document.status = if store.save_chunks(document).await {
                    DocumentStatus::Completed
                } else {
                    DocumentStatus::Failed
                };
            }
            IndexingStage::Skip => {
                document.status = DocumentStatus::CompletedNoIndexing;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::models::{PageContent, SearchResult};
    use crate::store::memory::InMemoryStore;

    struct FixedExtractor {
        pages: Vec<PageContent>,
    }

    #[async_trait]
    impl PageExtractor for FixedExtractor {
        async fn extract_pages(
            &self,
            _bytes: &[u8],
            _content_type: &str,
        ) -> Result<Vec<PageContent>, RagError> {
            Ok(self.pages.clone())
        }
    }

    struct BrokenExtractor;

    #[async_trait]
    impl PageExtractor for BrokenExtractor {
        async fn extract_pages(
            &self,
            _bytes: &[u8],
            _content_type: &str,
        ) -> Result<Vec<PageContent>, RagError> {
            Err(RagError::Extraction("truncated stream".into()))
        }
    }

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingClient for CountingEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| vec![t.chars().count() as f32, 1.0])
                .collect())
        }
    }

    /// Accepts nothing: simulates a store whose chunk writes fail
    /// mid-batch.
    struct RejectingStore;

    #[async_trait]
    impl DocumentStore for RejectingStore {
        async fn save_chunks(&self, _document: &Document) -> bool {
            false
        }
        async fn delete_document(&self, _document_id: &str) -> bool {
            true
        }
        async fn get_document(&self, _document_id: &str) -> Option<Document> {
            None
        }
        async fn get_all_documents(&self) -> Vec<Document> {
            Vec::new()
        }
        async fn search(&self, _q: &[f32], _k: usize, _m: f32) -> Vec<SearchResult> {
            Vec::new()
        }
    }

    fn two_pages() -> Vec<PageContent> {
        vec![
            PageContent {
                page_number: 1,
                text: "alpha ".repeat(30),
            },
            PageContent {
                page_number: 2,
                text: "beta ".repeat(10),
            },
        ]
    }

    #[tokio::test]
    async fn full_pipeline_completes_and_persists() {
        let store = Arc::new(InMemoryStore::new());
        let pipeline = IngestionPipeline::new(
            Arc::new(FixedExtractor { pages: two_pages() }),
            TextChunker::new(50, 10).unwrap(),
        )
        .with_embedding(Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        }))
        .with_store(store.clone());

        let doc = pipeline
            .process_document(b"%PDF-", "guide.pdf", "application/pdf")
            .await
            .unwrap();

        assert_eq!(doc.status, DocumentStatus::Completed);
        assert!(!doc.chunks.is_empty());
        assert!(doc.chunks.iter().all(|c| c.embedding.is_some()));

        // Round-trip: the store returns the same chunk order and text.
        let loaded = store.get_document(&doc.id).await.unwrap();
        let stored: Vec<&str> = loaded.chunks.iter().map(|c| c.text.as_str()).collect();
        let produced: Vec<&str> = doc.chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(stored, produced);
    }

    #[tokio::test]
    async fn chunk_indices_are_page_local() {
        let pipeline = IngestionPipeline::new(
            Arc::new(FixedExtractor { pages: two_pages() }),
            TextChunker::new(50, 10).unwrap(),
        );
        let doc = pipeline
            .process_document(b"%PDF-", "guide.pdf", "application/pdf")
            .await
            .unwrap();

        for page in [1, 2] {
            let indices: Vec<i64> = doc
                .chunks
                .iter()
                .filter(|c| c.page_number == page)
                .map(|c| c.chunk_index)
                .collect();
            let expected: Vec<i64> = (0..indices.len() as i64).collect();
            assert_eq!(indices, expected, "page {page} indices restart at 0");
        }
    }

    #[tokio::test]
    async fn embeddings_assigned_back_by_position() {
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let pipeline = IngestionPipeline::new(
            Arc::new(FixedExtractor { pages: two_pages() }),
            TextChunker::new(50, 10).unwrap(),
        )
        .with_embedding(embedder.clone());

        let doc = pipeline
            .process_document(b"x", "guide.txt", "text/plain")
            .await
            .unwrap();

        // One batch call for the whole document.
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
        for chunk in &doc.chunks {
            let embedding = chunk.embedding.as_ref().unwrap();
            assert_eq!(embedding[0], chunk.text.chars().count() as f32);
        }
    }

    #[tokio::test]
    async fn no_store_ends_completed_no_indexing() {
        let pipeline = IngestionPipeline::new(
            Arc::new(FixedExtractor { pages: two_pages() }),
            TextChunker::new(50, 10).unwrap(),
        );
        let doc = pipeline
            .process_document(b"x", "notes.txt", "text/plain")
            .await
            .unwrap();
        assert_eq!(doc.status, DocumentStatus::CompletedNoIndexing);
        assert!(doc.chunks.iter().all(|c| c.embedding.is_none()));
    }

    #[tokio::test]
    async fn extraction_failure_ends_failed_with_cause() {
        let pipeline =
            IngestionPipeline::new(Arc::new(BrokenExtractor), TextChunker::new(50, 10).unwrap());
        let err = pipeline
            .process_document(b"x", "broken.pdf", "application/pdf")
            .await
            .unwrap_err();

        assert_eq!(err.document.status, DocumentStatus::Failed);
        assert!(matches!(err.source, RagError::Pipeline { .. }));
        let rendered = format!("{:#}", err.source);
        assert!(rendered.contains("broken.pdf"));
    }

    #[tokio::test]
    async fn save_failure_ends_failed_without_error() {
        let pipeline = IngestionPipeline::new(
            Arc::new(FixedExtractor { pages: two_pages() }),
            TextChunker::new(50, 10).unwrap(),
        )
        .with_store(Arc::new(RejectingStore));

        let doc = pipeline
            .process_document(b"x", "guide.txt", "text/plain")
            .await
            .unwrap();
        assert_eq!(doc.status, DocumentStatus::Failed);
    }
}
