//! In-memory [`DocumentStore`] implementation.
//!
//! Backs tests and store-less deployments. State lives in `HashMap`s
//! behind `std::sync::RwLock`; vector search is brute-force cosine
//! similarity over all stored embeddings.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{Document, DocumentChunk, SearchResult};

use super::DocumentStore;

/// Provenance kept per document, separate from its chunks.
#[derive(Clone)]
struct DocRecord {
    document: Document,
}

/// In-memory store for tests and embedded use.
#[derive(Default)]
pub struct InMemoryStore {
    docs: RwLock<HashMap<String, DocRecord>>,
    chunks: RwLock<Vec<DocumentChunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn save_chunks(&self, document: &Document) -> bool {
        let mut record = document.clone();
        record.chunks = Vec::new();

        let mut docs = self.docs.write().unwrap();
        let mut chunks = self.chunks.write().unwrap();
        docs.insert(document.id.clone(), DocRecord { document: record });
        chunks.retain(|c| c.document_id != document.id);
        chunks.extend(document.chunks.iter().cloned());
        true
    }

    async fn delete_document(&self, document_id: &str) -> bool {
        let mut docs = self.docs.write().unwrap();
        let mut chunks = self.chunks.write().unwrap();
        docs.remove(document_id);
        chunks.retain(|c| c.document_id != document_id);
        true
    }

    async fn get_document(&self, document_id: &str) -> Option<Document> {
        let chunks = self.chunks.read().unwrap();
        let mut matching: Vec<DocumentChunk> = chunks
            .iter()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        if matching.is_empty() {
            return None;
        }
        matching.sort_by_key(|c| (c.page_number, c.chunk_index));

        let docs = self.docs.read().unwrap();
        let mut document = docs
            .get(document_id)
            .map(|r| r.document.clone())
            .unwrap_or_else(|| {
                let mut d = Document::new("", "", 0);
                d.id = document_id.to_string();
                d
            });
        document.chunks = matching;
        Some(document)
    }

    async fn get_all_documents(&self) -> Vec<Document> {
        let ids: Vec<String> = {
            let chunks = self.chunks.read().unwrap();
            let mut ids: Vec<String> = chunks.iter().map(|c| c.document_id.clone()).collect();
            ids.sort();
            ids.dedup();
            ids
        };

        let mut documents = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(doc) = self.get_document(&id).await {
                documents.push(doc);
            }
        }
        documents
    }

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> Vec<SearchResult> {
        let chunks = self.chunks.read().unwrap();
        let mut results: Vec<SearchResult> = chunks
            .iter()
            .filter_map(|chunk| {
                let embedding = chunk.embedding.as_ref()?;
                let score = cosine_similarity(query_vector, embedding);
                (score >= min_score).then(|| SearchResult {
                    chunk: chunk.clone(),
                    score,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::TextChunker;

    fn doc_with_embeddings(id: &str, embeddings: &[Vec<f32>]) -> Document {
        let mut doc = Document::new(format!("{id}.txt"), "text/plain", 64);
        doc.id = id.to_string();
        let chunker = TextChunker::new(20, 0).unwrap();
        let text = "x".repeat(embeddings.len() * 20);
        doc.chunks = chunker.chunk_text(&text, id, 1);
        assert_eq!(doc.chunks.len(), embeddings.len());
        for (chunk, emb) in doc.chunks.iter_mut().zip(embeddings) {
            chunk.embedding = Some(emb.clone());
        }
        doc
    }

    #[tokio::test]
    async fn save_then_get_preserves_chunk_order() {
        let store = InMemoryStore::new();
        let mut doc = Document::new("notes.txt", "text/plain", 128);
        let chunker = TextChunker::new(10, 0).unwrap();
        doc.chunks = chunker.chunk_text(&"abcdefghij".repeat(5), &doc.id, 1);
        let original: Vec<String> = doc.chunks.iter().map(|c| c.text.clone()).collect();

        assert!(store.save_chunks(&doc).await);
        let loaded = store.get_document(&doc.id).await.unwrap();
        assert_eq!(loaded.file_name, "notes.txt");
        let round_tripped: Vec<String> = loaded.chunks.iter().map(|c| c.text.clone()).collect();
        assert_eq!(round_tripped, original);
        for (i, chunk) in loaded.chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as i64);
        }
    }

    #[tokio::test]
    async fn get_document_absent_id_is_none() {
        let store = InMemoryStore::new();
        assert!(store.get_document("nope").await.is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryStore::new();
        let doc = doc_with_embeddings("d1", &[vec![1.0, 0.0]]);
        store.save_chunks(&doc).await;

        assert!(store.delete_document("d1").await);
        assert!(store.get_document("d1").await.is_none());
        // Deleting an already-absent id still succeeds.
        assert!(store.delete_document("d1").await);
    }

    #[tokio::test]
    async fn get_all_documents_groups_by_id() {
        let store = InMemoryStore::new();
        store
            .save_chunks(&doc_with_embeddings("d1", &[vec![1.0, 0.0], vec![0.5, 0.5]]))
            .await;
        store
            .save_chunks(&doc_with_embeddings("d2", &[vec![0.0, 1.0]]))
            .await;

        let all = store.get_all_documents().await;
        assert_eq!(all.len(), 2);
        let mut ids: Vec<&str> = all.iter().map(|d| d.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["d1", "d2"]);
    }

    #[tokio::test]
    async fn search_filters_sorts_and_truncates() {
        let store = InMemoryStore::new();
        // Cosine against [1, 0]: 1.0, ~0.6, 0.0
        let doc = doc_with_embeddings(
            "d1",
            &[
                vec![1.0, 0.0],
                vec![0.6, 0.8],
                vec![0.0, 1.0],
            ],
        );
        store.save_chunks(&doc).await;

        let results = store.search(&[1.0, 0.0], 5, 0.5).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
        assert!((results[0].score - 1.0).abs() < 1e-6);
        for r in &results {
            assert!(r.score >= 0.5);
        }

        let capped = store.search(&[1.0, 0.0], 1, 0.0).await;
        assert_eq!(capped.len(), 1);
    }

    #[tokio::test]
    async fn search_below_threshold_is_empty_not_an_error() {
        let store = InMemoryStore::new();
        store
            .save_chunks(&doc_with_embeddings("d1", &[vec![0.0, 1.0]]))
            .await;
        let results = store.search(&[1.0, 0.0], 5, 0.7).await;
        assert!(results.is_empty());
    }
}
