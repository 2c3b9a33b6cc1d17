pub mod mock;
pub mod openai;

pub use mock::MockProvider;
pub use openai::OpenAiClient;

use crate::llm::LlmClient;
use anyhow::Result;
use std::sync::Arc;
use vitaltalk_core::config::LlmConfig;

/// Build the client named by `config.provider` for `model`.
pub fn build_client(config: &LlmConfig, model: &str) -> Result<Arc<dyn LlmClient>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiClient::new(model, config.base_url.as_deref())?)),
        "mock" => Ok(Arc::new(MockProvider::new(model))),
        other => anyhow::bail!("Unknown LLM provider '{}' (expected openai or mock)", other),
    }
}

/// The turn-pipeline client and the coach client. The coach uses its own
/// model when one is configured.
pub fn build_clients(config: &LlmConfig) -> Result<(Arc<dyn LlmClient>, Arc<dyn LlmClient>)> {
    let main = build_client(config, &config.model)?;
    let coach = match &config.roles.coach_model {
        Some(model) if model != &config.model => build_client(config, model)?,
        _ => main.clone(),
    };
    Ok((main, coach))
}
