//! Output side of the Safety Gate: a model-backed review of each generated
//! reply, failing closed to the state's fallback line.

use crate::llm::{ask, with_timeout, CompletionParams, LlmClient};
use crate::parse::{parse_safety_verdict, SafetyVerdict};
use crate::prompts;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use vitaltalk_core::{fallback_reply, EmotionalState, Scenario, VitalConfig};

/// Outcome of reviewing one reply. `output_text` is what gets persisted and
/// shown; `issues` are advisory and hold at most three entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputCheck {
    pub safe: bool,
    pub issues: Vec<String>,
    pub output_text: String,
}

impl OutputCheck {
    fn passed(text: &str) -> Self {
        Self {
            safe: true,
            issues: Vec::new(),
            output_text: text.to_string(),
        }
    }

    fn replaced(state: EmotionalState, issues: Vec<String>) -> Self {
        Self {
            safe: false,
            issues,
            output_text: fallback_reply(state).to_string(),
        }
    }
}

pub struct SafetyJudge {
    client: Arc<dyn LlmClient>,
    params: CompletionParams,
    timeout: Duration,
}

impl SafetyJudge {
    pub fn new(client: Arc<dyn LlmClient>, config: &VitalConfig) -> Self {
        Self {
            client,
            params: CompletionParams {
                max_tokens: config.llm.max_tokens.min(256),
                temperature: config.llm.roles.safety_temperature,
            },
            timeout: config.pipeline.stage_timeout(),
        }
    }

    /// Review `text` produced while in `state`. Anything other than a clear
    /// SAFE verdict replaces the reply with the fallback for `state`.
    pub async fn check_generated_response(
        &self,
        text: &str,
        state: EmotionalState,
        scenario: &Scenario,
    ) -> OutputCheck {
        let system = prompts::safety_system();
        let input = prompts::safety_input(text, state, scenario);

        let answer = match with_timeout(
            self.timeout,
            "safety judge",
            ask(self.client.as_ref(), &system, input, self.params.clone()),
        )
        .await
        {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Safety judge unavailable, using fallback reply: {:#}", e);
                return OutputCheck::replaced(state, vec![format!("safety review unavailable: {}", e)]);
            }
        };

        match parse_safety_verdict(&answer) {
            Ok(SafetyVerdict::Safe) => OutputCheck::passed(text),
            Ok(SafetyVerdict::Unsafe { issues }) => {
                tracing::warn!("Generated reply judged unsafe: {:?}", issues);
                OutputCheck::replaced(state, issues)
            }
            Err(e) => {
                tracing::warn!("Safety verdict unparseable, using fallback reply: {}", e);
                OutputCheck::replaced(state, vec![format!("unreadable safety verdict: {}", e)])
            }
        }
    }
}
