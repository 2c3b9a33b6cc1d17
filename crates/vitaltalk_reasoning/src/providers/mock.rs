//! Mock LLM provider: deterministic, stage-aware responses for tests and
//! offline sessions without an API key.
//!
//! Each call is attributed to a pipeline stage from its system prompt. A
//! scripted answer queued for that stage is used first; otherwise a canned
//! default that the stage can decode is returned.

use crate::api_types::{Completion, Message};
use crate::llm::{CompletionParams, LlmClient};
use crate::prompts::Stage;
use anyhow::Result;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

type Scripted = std::result::Result<String, String>;

#[derive(Debug, Default)]
pub struct MockProvider {
    model: String,
    scripts: Mutex<HashMap<Stage, VecDeque<Scripted>>>,
    latency: Mutex<HashMap<Stage, Duration>>,
    calls: Mutex<Vec<Stage>>,
}

impl MockProvider {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..Self::default()
        }
    }

    /// Queue a text answer for the next call of `stage`.
    pub fn script(&self, stage: Stage, text: impl Into<String>) -> &Self {
        self.push(stage, Ok(text.into()))
    }

    /// Queue a failure for the next call of `stage`.
    pub fn fail(&self, stage: Stage, message: impl Into<String>) -> &Self {
        self.push(stage, Err(message.into()))
    }

    /// Delay every call of `stage` by `delay`.
    pub fn with_latency(&self, stage: Stage, delay: Duration) -> &Self {
        if let Ok(mut latency) = self.latency.lock() {
            latency.insert(stage, delay);
        }
        self
    }

    /// Stages called so far, in order.
    pub fn calls(&self) -> Vec<Stage> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self, stage: Stage) -> usize {
        self.calls().into_iter().filter(|s| *s == stage).count()
    }

    fn push(&self, stage: Stage, item: Scripted) -> &Self {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.entry(stage).or_default().push_back(item);
        }
        self
    }

    fn next_scripted(&self, stage: Stage) -> Option<Scripted> {
        self.scripts
            .lock()
            .ok()
            .and_then(|mut s| s.get_mut(&stage).and_then(VecDeque::pop_front))
    }

    fn canned(&self, stage: Option<Stage>) -> String {
        match stage {
            Some(Stage::Evaluator) => {
                r#"{"new_state": "acceptance", "intensity": 5, "reasoning": "offline evaluation"}"#.to_string()
            }
            Some(Stage::Generator) => format!("(Mock {}) I hear you, Doctor. Please go on.", self.model),
            Some(Stage::SafetyJudge) => "SAFE".to_string(),
            Some(Stage::Coach) => r#"{
                "empathy_score": 7.0, "clarity_score": 7.0, "emotional_alignment_score": 7.0,
                "ethical_appropriateness_score": 8.0, "cultural_sensitivity_score": 7.5,
                "overall_score": 7.3,
                "strengths": ["Completed the session"],
                "areas_for_improvement": ["Connect a real model for detailed feedback"],
                "suggested_responses": [],
                "summary": "Offline evaluation."
            }"#
            .to_string(),
            Some(Stage::Hint) => "GOOD: (offline) Keep acknowledging the family's feelings.".to_string(),
            None => format!("(Mock {} Response) I received your prompt.", self.model),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for MockProvider {
    async fn complete(
        &self,
        system: &str,
        _messages: Vec<Message>,
        _params: CompletionParams,
    ) -> Result<Completion> {
        let stage = Stage::of(system);
        if let Some(stage) = stage {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(stage);
            }
            let delay = self.latency.lock().ok().and_then(|l| l.get(&stage).copied());
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(scripted) = self.next_scripted(stage) {
                return scripted
                    .map(Completion::text)
                    .map_err(|e| anyhow::anyhow!("mock {} failure: {}", stage, e));
            }
        }
        Ok(Completion::text(self.canned(stage)))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
