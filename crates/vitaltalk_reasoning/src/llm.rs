use crate::api_types::{Completion, Message};
use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Sampling parameters for one call. Each pipeline role has its own.
#[derive(Debug, Clone)]
pub struct CompletionParams {
    /// Maximum tokens to generate (will be clamped to provider limits)
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a chat completion request.
    async fn complete(
        &self,
        system: &str,
        messages: Vec<Message>,
        params: CompletionParams,
    ) -> Result<Completion>;

    /// Model identifier, for logs.
    fn model(&self) -> &str;
}

/// Single-prompt convenience: one user message in, trimmed text out.
pub async fn ask(
    client: &dyn LlmClient,
    system: &str,
    user: String,
    params: CompletionParams,
) -> Result<String> {
    let completion = client.complete(system, vec![Message::user(user)], params).await?;
    Ok(completion.text.trim().to_string())
}

/// Bound a stage by `limit`; elapsing counts as that stage's failure.
pub async fn with_timeout<T, F>(limit: Duration, stage: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => anyhow::bail!("{} timed out after {:?}", stage, limit),
    }
}
