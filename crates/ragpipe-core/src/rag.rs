//! RAG engine: retrieval, augmentation, and generation.
//!
//! Answers a question in three steps:
//!
//! 1. **Retrieval**: embed the question and run a vector search
//!    against the document store.
//! 2. **Augmentation**: assemble the retrieved chunks into a labeled
//!    context block, best match first.
//! 3. **Generation**: invoke the chat backend with a fixed grounding
//!    instruction and return the answer with per-source citations.
//!
//! A missing backend is a distinct, user-visible service-unavailable
//! condition ([`RagError::Configuration`]) and is never conflated with
//! "no results found": an empty retrieval yields a fixed fallback
//! answer with zero tokens used.

use std::sync::Arc;

use crate::embedding::EmbeddingClient;
use crate::error::RagError;
use crate::generation::GenerationClient;
use crate::models::{RagResponse, SearchResult, SourceChunk};
use crate::store::DocumentStore;

/// Default number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 5;
/// Default minimum cosine similarity for a chunk to count as relevant.
pub const DEFAULT_MIN_SCORE: f32 = 0.7;

const GENERATION_TEMPERATURE: f32 = 0.7;
const GENERATION_MAX_TOKENS: u32 = 800;

const NO_CONTEXT_ANSWER: &str =
    "I couldn't find any relevant information in the documents to answer your question.";

const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on the \
provided context. Use only the information from the context to answer the question. If the \
context doesn't contain enough information to answer the question, say so. Always cite which \
source(s) you used by referencing [Source N] in your answer.";

/// The embedding + generation capabilities the engine needs to answer
/// questions. Bundled so they are either both present or both absent.
#[derive(Clone)]
pub struct RagBackend {
    pub embedder: Arc<dyn EmbeddingClient>,
    pub generator: Arc<dyn GenerationClient>,
}

/// Orchestrates retrieval-augmented generation over a document store.
pub struct RagEngine {
    store: Arc<dyn DocumentStore>,
    backend: Option<RagBackend>,
}

impl RagEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            backend: None,
        }
    }

    pub fn with_backend(mut self, backend: RagBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    fn backend(&self) -> Result<&RagBackend, RagError> {
        self.backend.as_ref().ok_or_else(|| {
            RagError::Configuration("no embedding/generation backend configured".into())
        })
    }

    /// Embed `query` and return the store's most similar chunks,
    /// ordered by descending score.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>, RagError> {
        let backend = self.backend()?;
        let query_vector = backend.embedder.embed(query).await?;
        Ok(self.store.search(&query_vector, top_k, min_score).await)
    }

    /// Answer `question` from the indexed documents, citing sources.
    pub async fn generate_answer(
        &self,
        question: &str,
        top_k: usize,
    ) -> Result<RagResponse, RagError> {
        let backend = self.backend()?;

        let results = self.search(question, top_k, DEFAULT_MIN_SCORE).await?;
        tracing::debug!(question, retrieved = results.len(), "retrieval finished");

        if results.is_empty() {
            // Valid terminal outcome, not an error.
            return Ok(RagResponse {
                question: question.to_string(),
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
                tokens_used: 0,
            });
        }

        let context = build_context_block(&results);
        let user_prompt = format!("Context:\n{context}\n\nQuestion: {question}\n\nAnswer:");

        let completion = backend
            .generator
            .complete(
                SYSTEM_PROMPT,
                &user_prompt,
                GENERATION_TEMPERATURE,
                GENERATION_MAX_TOKENS,
            )
            .await?;
        tracing::debug!(tokens_used = completion.total_tokens, "generation finished");

        let sources = results
            .iter()
            .map(|r| SourceChunk {
                text: r.chunk.text.clone(),
                score: r.score,
                document_id: r.chunk.document_id.clone(),
                page_number: r.chunk.page_number,
                chunk_index: r.chunk.chunk_index,
            })
            .collect();

        Ok(RagResponse {
            question: question.to_string(),
            answer: completion.text,
            sources,
            tokens_used: completion.total_tokens,
        })
    }
}

/// Concatenate retrieved chunks into the context block fed to the
/// generation backend: retrieval order, 1-based source labels, page
/// number, and the score to two decimals.
pub fn build_context_block(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "[Source {}] (Page {}, Score: {:.2})\n{}",
                i + 1,
                r.chunk.page_number,
                r.score,
                r.chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
