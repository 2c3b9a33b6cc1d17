//! Response Generator: the family member's in-character reply.

use crate::llm::{ask, with_timeout, CompletionParams, LlmClient};
use crate::prompts;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use vitaltalk_core::{recent_turns, EmotionalState, Scenario, Turn, VitalConfig};

pub struct ResponseGenerator {
    client: Arc<dyn LlmClient>,
    params: CompletionParams,
    window: usize,
    timeout: Duration,
}

impl ResponseGenerator {
    pub fn new(client: Arc<dyn LlmClient>, config: &VitalConfig) -> Self {
        Self {
            client,
            params: CompletionParams {
                max_tokens: config.llm.max_tokens,
                temperature: config.llm.roles.generator_temperature,
            },
            window: config.pipeline.history_window,
            timeout: config.pipeline.stage_timeout(),
        }
    }

    /// Generate a reply conditioned on `state`, which must already be the
    /// post-transition state. Only the last `history_window` entries are sent.
    ///
    /// Errors (call failure, timeout, empty reply) are fatal to the turn.
    pub async fn generate(
        &self,
        user_message: &str,
        state: EmotionalState,
        scenario: &Scenario,
        history: &[Turn],
    ) -> Result<String> {
        let system = prompts::generator_system(state, scenario);
        let input = prompts::generator_input(recent_turns(history, self.window), user_message);

        let reply = with_timeout(
            self.timeout,
            "generator",
            ask(self.client.as_ref(), &system, input, self.params.clone()),
        )
        .await?;

        if reply.is_empty() {
            anyhow::bail!("model {} returned an empty reply", self.client.model());
        }
        tracing::debug!("Generated {} chars in state {}", reply.len(), state);
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::Stage;
    use crate::providers::MockProvider;
    use vitaltalk_core::{ScenarioCatalog, ScenarioProvider};

    #[tokio::test]
    async fn test_generate_trims_reply() {
        let mock = Arc::new(MockProvider::new("m"));
        mock.script(Stage::Generator, "  Why didn't anyone tell us sooner?  \n");
        let generator = ResponseGenerator::new(mock, &VitalConfig::default());
        let scenario = ScenarioCatalog::builtin().get_or_default(1);

        let reply = generator
            .generate("The cancer has spread.", EmotionalState::Anger, &scenario, &[])
            .await
            .unwrap();
        assert_eq!(reply, "Why didn't anyone tell us sooner?");
    }

    #[tokio::test]
    async fn test_empty_reply_is_error() {
        let mock = Arc::new(MockProvider::new("m"));
        mock.script(Stage::Generator, "   ");
        let generator = ResponseGenerator::new(mock, &VitalConfig::default());
        let scenario = ScenarioCatalog::builtin().get_or_default(1);

        assert!(generator
            .generate("hello", EmotionalState::Denial, &scenario, &[])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_call_failure_is_error() {
        let mock = Arc::new(MockProvider::new("m"));
        mock.fail(Stage::Generator, "connection reset");
        let generator = ResponseGenerator::new(mock, &VitalConfig::default());
        let scenario = ScenarioCatalog::builtin().get_or_default(1);

        let err = generator
            .generate("hello", EmotionalState::Denial, &scenario, &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }
}
