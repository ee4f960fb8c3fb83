//! Error taxonomy for the ingestion and retrieval pipeline.
//!
//! "Not found" is deliberately absent: store lookups that match nothing
//! return `None`/empty collections, which is a normal outcome, not an
//! error condition.

use thiserror::Error;

/// Failures surfaced by the pipeline, the RAG engine, and the backends.
#[derive(Debug, Error)]
pub enum RagError {
    /// A required capability is absent or its settings are invalid.
    /// Rendered as a service-unavailable condition; never retried
    /// automatically.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The source document could not be read or parsed.
    #[error("text extraction failed: {0}")]
    Extraction(String),

    /// An unexpected fault during chunking, embedding, or persistence,
    /// wrapping the original cause.
    #[error("{message}")]
    Pipeline {
        message: String,
        #[source]
        source: Box<RagError>,
    },

    /// The embedding or generation endpoint is unreachable or refused
    /// the request. Distinct from an empty result set.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend answered with a payload we cannot interpret.
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
}

impl RagError {
    /// Wrap any error as a pipeline failure, keeping the original cause
    /// in the source chain.
    pub fn pipeline(message: impl Into<String>, source: RagError) -> Self {
        RagError::Pipeline {
            message: message.into(),
            source: Box::new(source),
        }
    }
}
