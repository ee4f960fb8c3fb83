//! Embedding and generation backend implementations.
//!
//! Two providers are supported, selected by `backend.provider`:
//!
//! - **`openai`**: `POST /v1/embeddings` and `POST /v1/chat/completions`,
//!   authenticated via the `OPENAI_API_KEY` environment variable.
//! - **`ollama`**: a local Ollama instance's `/api/embed` and
//!   `/api/chat` endpoints (default `http://localhost:11434`).
//!
//! `disabled` yields no backend; the RAG engine then reports a
//! service-unavailable condition instead of answering.
//!
//! # Retry strategy
//!
//! Transient transport errors use exponential backoff: HTTP 429 and
//! 5xx retry (1s, 2s, 4s, … capped at 2^5), other 4xx fail
//! immediately, network errors retry. Either way the caller sees a
//! [`RagError::BackendUnavailable`], never an empty result.

mod embedding;
mod generation;

pub use embedding::{OllamaEmbeddings, OpenAiEmbeddings};
pub use generation::{OllamaGeneration, OpenAiGeneration};

use std::sync::Arc;
use std::time::Duration;

use ragpipe_core::error::RagError;
use ragpipe_core::rag::RagBackend;

use crate::config::BackendConfig;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Build the configured [`RagBackend`], or `None` when the provider is
/// `disabled`.
pub fn create_backend(config: &BackendConfig) -> Result<Option<RagBackend>, RagError> {
    match config.provider.as_str() {
        "disabled" => Ok(None),
        "openai" => Ok(Some(RagBackend {
            embedder: Arc::new(OpenAiEmbeddings::new(config)?),
            generator: Arc::new(OpenAiGeneration::new(config)?),
        })),
        "ollama" => Ok(Some(RagBackend {
            embedder: Arc::new(OllamaEmbeddings::new(config)?),
            generator: Arc::new(OllamaGeneration::new(config)?),
        })),
        other => Err(RagError::Configuration(format!(
            "unknown backend provider: '{other}'"
        ))),
    }
}

pub(crate) fn http_client(config: &BackendConfig) -> Result<reqwest::Client, RagError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| RagError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// POST a JSON body and decode the JSON response, retrying 429/5xx and
/// network errors with exponential backoff.
pub(crate) async fn post_json_with_retry(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
    max_retries: u32,
) -> Result<serde_json::Value, RagError> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let mut request = client.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response.json().await.map_err(|e| {
                        RagError::InvalidResponse(format!("malformed JSON from {url}: {e}"))
                    });
                }

                let body_text = response.text().await.unwrap_or_default();
                let message = format!("{url} returned {status}: {body_text}");

                // Rate limited or server error: retryable
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(RagError::BackendUnavailable(message));
                    continue;
                }

                // Client error (not 429): not retryable
                return Err(RagError::BackendUnavailable(message));
            }
            Err(e) => {
                last_err = Some(RagError::BackendUnavailable(format!(
                    "request to {url} failed: {e}"
                )));
                continue;
            }
        }
    }

    Err(last_err
        .unwrap_or_else(|| RagError::BackendUnavailable("request failed after retries".into())))
}
