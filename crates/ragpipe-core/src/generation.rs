//! Generation (chat/completion) capability trait.

use async_trait::async_trait;

use crate::error::RagError;

/// One completed generation call.
#[derive(Debug, Clone)]
pub struct Completion {
    /// The generated answer text.
    pub text: String,
    /// Total tokens consumed (prompt + completion), as reported by the
    /// backend.
    pub total_tokens: u32,
}

/// Capability: prompt → generated text + token count.
///
/// Implementations fail with [`RagError::BackendUnavailable`] when the
/// model endpoint is unreachable or misconfigured.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Completion, RagError>;
}
