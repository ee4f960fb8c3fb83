//! Generation clients for the OpenAI and Ollama chat APIs.

use async_trait::async_trait;

use ragpipe_core::error::RagError;
use ragpipe_core::generation::{Completion, GenerationClient};

use crate::config::BackendConfig;

use super::{http_client, post_json_with_retry, OLLAMA_BASE_URL, OPENAI_BASE_URL};

/// Chat completions via `POST {base}/v1/chat/completions`.
pub struct OpenAiGeneration {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_retries: u32,
}

impl OpenAiGeneration {
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
            model: config.chat_model.clone(),
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl GenerationClient for OpenAiGeneration {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Completion, RagError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "temperature": temperature,
            "max_tokens": max_tokens,
        });
        let url = format!("{}/v1/chat/completions", self.base_url);
        let json = post_json_with_retry(
            &self.client,
            &url,
            Some(&self.api_key),
            &body,
            self.max_retries,
        )
        .await?;
        parse_openai_completion(&json)
    }
}

/// Extract `choices[0].message.content` and `usage.total_tokens`.
fn parse_openai_completion(json: &serde_json::Value) -> Result<Completion, RagError> {
    let text = json
        .pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| RagError::InvalidResponse("missing completion content".into()))?
        .to_string();

    let total_tokens = json
        .pointer("/usage/total_tokens")
        .and_then(|t| t.as_u64())
        .unwrap_or(0) as u32;

    Ok(Completion { text, total_tokens })
}

/// Chat via a local Ollama instance's `POST {base}/api/chat`.
pub struct OllamaGeneration {
    client: reqwest::Client,
    model: String,
    base_url: String,
    max_retries: u32,
}

impl OllamaGeneration {
    pub fn new(config: &BackendConfig) -> Result<Self, RagError> {
        Ok(Self {
            client: http_client(config)?,
            model: config.chat_model.clone(),
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl GenerationClient for OllamaGeneration {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Completion, RagError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "stream": false,
            "options": {
                "temperature": temperature,
                "num_predict": max_tokens,
            },
        });
        let url = format!("{}/api/chat", self.base_url);
        let json = post_json_with_retry(&self.client, &url, None, &body, self.max_retries).await?;
        parse_ollama_completion(&json)
    }
}

/// Extract `message.content`; tokens are prompt + generation eval
/// counts.
fn parse_ollama_completion(json: &serde_json::Value) -> Result<Completion, RagError> {
    let text = json
        .pointer("/message/content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| RagError::InvalidResponse("missing message content".into()))?
        .to_string();

    let prompt_tokens = json
        .get("prompt_eval_count")
        .and_then(|t| t.as_u64())
        .unwrap_or(0);
    let completion_tokens = json.get("eval_count").and_then(|t| t.as_u64()).unwrap_or(0);

    Ok(Completion {
        text,
        total_tokens: (prompt_tokens + completion_tokens) as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn openai_completion_parses() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "The answer [Source 1]."}}],
            "usage": {"prompt_tokens": 100, "completion_tokens": 20, "total_tokens": 120}
        });
        let completion = parse_openai_completion(&json).unwrap();
        assert_eq!(completion.text, "The answer [Source 1].");
        assert_eq!(completion.total_tokens, 120);
    }

    #[test]
    fn completion_without_choices_is_invalid() {
        let json = serde_json::json!({"choices": []});
        assert!(matches!(
            parse_openai_completion(&json),
            Err(RagError::InvalidResponse(_))
        ));
    }

    #[test]
    fn ollama_completion_sums_eval_counts() {
        let json = serde_json::json!({
            "message": {"role": "assistant", "content": "Answer."},
            "prompt_eval_count": 80,
            "eval_count": 15
        });
        let completion = parse_ollama_completion(&json).unwrap();
        assert_eq!(completion.text, "Answer.");
        assert_eq!(completion.total_tokens, 95);
    }

    #[tokio::test]
    async fn openai_client_sends_both_messages() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .json_body_partial(
                        r#"{"messages": [{"role": "system", "content": "sys"}, {"role": "user", "content": "usr"}]}"#,
                    );
                then.status(200).json_body(serde_json::json!({
                    "choices": [{"message": {"role": "assistant", "content": "ok"}}],
                    "usage": {"total_tokens": 42}
                }));
            })
            .await;

        let config = BackendConfig {
            provider: "openai".to_string(),
            url: Some(server.base_url()),
            max_retries: 0,
            ..Default::default()
        };
        let client = OpenAiGeneration::with_api_key(&config, "test-key".into()).unwrap();
        let completion = client.complete("sys", "usr", 0.7, 800).await.unwrap();

        mock.assert_async().await;
        assert_eq!(completion.text, "ok");
        assert_eq!(completion.total_tokens, 42);
    }
}
