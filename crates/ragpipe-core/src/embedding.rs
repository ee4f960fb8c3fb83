//! Embedding capability trait and vector helpers.
//!
//! An [`EmbeddingClient`] turns text into fixed-dimension vectors. The
//! batch form exists purely as a rate-limit/latency optimization: for
//! every index `i`, `embed_batch(texts)[i]` must equal `embed(texts[i])`.
//!
//! Concrete clients (OpenAI, Ollama) live in the `ragpipe` app crate.
//! The free helpers here ([`cosine_similarity`], [`vec_to_blob`],
//! [`blob_to_vec`]) are shared by the store implementations.

use async_trait::async_trait;

use crate::error::RagError;

/// Capability: text(s) → vector(s).
///
/// Implementations fail with [`RagError::BackendUnavailable`] when the
/// underlying model endpoint is unreachable or misconfigured, so
/// callers can tell a dead backend apart from an empty result.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a batch of texts, order-preserving.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Embed a single text. Equivalent to a one-element batch.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| RagError::InvalidResponse("empty embedding response".into()))
    }
}

/// Encode a float vector as little-endian `f32` bytes.
///
/// Each value becomes 4 bytes, producing a BLOB of `vec.len() × 4`
/// bytes, the storage format used by the SQLite store.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB written by [`vec_to_blob`] back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity between two embedding vectors, in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty vectors, mismatched lengths, or zero-norm
/// inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
