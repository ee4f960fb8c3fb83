//! Embedding clients for the OpenAI and Ollama APIs.

use async_trait::async_trait;

use ragpipe_core::embedding::EmbeddingClient;
use ragpipe_core::error::RagError;

use crate::config::BackendConfig;

use super::{http_client, post_json_with_retry, OLLAMA_BASE_URL, OPENAI_BASE_URL};

/// Embeddings via `POST {base}/v1/embeddings`.
pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_retries: u32,
}

impl OpenAiEmbeddings {
    pub fn new(config: &BackendConfig) -> Result<Self, RagError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            RagError::Configuration("OPENAI_API_KEY environment variable not set".into())
        })?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &BackendConfig, api_key: String) -> Result<Self, RagError> {
        Ok(Self {
            client: http_client(config)?,
            api_key,
            model: config.embedding_model.clone(),
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddings {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let url = format!("{}/v1/embeddings", self.base_url);
        let json = post_json_with_retry(
            &self.client,
            &url,
            Some(&self.api_key),
            &body,
            self.max_retries,
        )
        .await?;
        parse_openai_embeddings(&json)
    }
}

/// Extract `data[].embedding` arrays, in input order.
fn parse_openai_embeddings(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, RagError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| RagError::InvalidResponse("missing data array".into()))?;

    let mut embeddings = Vec::with_capacity(data.len());
    for item in data {
        let vector = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| RagError::InvalidResponse("missing embedding".into()))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        embeddings.push(vector);
    }
    Ok(embeddings)
}

/// Embeddings via a local Ollama instance's `POST {base}/api/embed`.
pub struct OllamaEmbeddings {
    client: reqwest::Client,
    model: String,
    base_url: String,
    max_retries: u32,
}

impl OllamaEmbeddings {
    pub fn new(config: &BackendConfig) -> Result<Self, RagError> {
        Ok(Self {
            client: http_client(config)?,
            model: config.embedding_model.clone(),
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddings {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let url = format!("{}/api/embed", self.base_url);
        let json = post_json_with_retry(&self.client, &url, None, &body, self.max_retries).await?;
        parse_ollama_embeddings(&json)
    }
}

fn parse_ollama_embeddings(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, RagError> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| RagError::InvalidResponse("missing embeddings array".into()))?;

    let mut result = Vec::with_capacity(embeddings.len());
    for embedding in embeddings {
        let vector = embedding
            .as_array()
            .ok_or_else(|| RagError::InvalidResponse("embedding is not an array".into()))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        result.push(vector);
    }
    Ok(result)
}
