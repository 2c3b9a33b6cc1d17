//! Emotion Transition Evaluator.
//!
//! The model proposes a next state, a style and an intensity. The proposal is
//! then forced through the transition table and the intensity step bound, so
//! the result is always a valid state no matter what the model said.

use crate::llm::{ask, with_timeout, CompletionParams, LlmClient};
use crate::parse::{parse_transition, TransitionJudgment};
use crate::prompts;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use vitaltalk_core::{
    classify_style, clamp_transition, recent_turns, EmotionalState, Intensity, ResponseStyle, Turn,
    VitalConfig,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub previous: EmotionalState,
    pub new_state: EmotionalState,
    pub intensity: Intensity,
    pub style: ResponseStyle,
    pub reasoning: String,
    /// The model's suggestion was outside the allowed set and was replaced.
    pub clamped: bool,
    /// Evaluation failed and the state was kept with default intensity.
    pub fallback: bool,
}

/// Apply a decoded judgment to the current state.
///
/// The style comes from the judgment when present, otherwise from the
/// keyword heuristic. A missing intensity keeps the current one.
pub fn apply_judgment(
    current: EmotionalState,
    intensity: Intensity,
    user_message: &str,
    judgment: TransitionJudgment,
    max_step: u8,
) -> Transition {
    let style = judgment.style.unwrap_or_else(|| classify_style(user_message));
    let new_state = clamp_transition(current, style, judgment.new_state);
    let clamped = new_state != judgment.new_state;
    if clamped {
        tracing::debug!(
            "Clamped suggested transition {} -> {} ({}) to {}",
            current,
            judgment.new_state,
            style,
            new_state
        );
    }

    let intensity = match judgment.intensity {
        Some(raw) => intensity.step_toward(Intensity::clamped(raw), max_step),
        None => intensity,
    };

    Transition {
        previous: current,
        new_state,
        intensity,
        style,
        reasoning: judgment.reasoning,
        clamped,
        fallback: false,
    }
}

/// Result when no usable judgment exists: same state, intensity 5.
pub fn failure_policy(current: EmotionalState, user_message: &str, cause: impl fmt::Display) -> Transition {
    Transition {
        previous: current,
        new_state: current,
        intensity: Intensity::DEFAULT,
        style: classify_style(user_message),
        reasoning: format!("Evaluation failed: {}", cause),
        clamped: false,
        fallback: true,
    }
}

pub struct TransitionEvaluator {
    client: Arc<dyn LlmClient>,
    params: CompletionParams,
    window: usize,
    max_step: u8,
    timeout: Duration,
}

impl TransitionEvaluator {
    pub fn new(client: Arc<dyn LlmClient>, config: &VitalConfig) -> Self {
        Self {
            client,
            params: CompletionParams {
                max_tokens: config.llm.max_tokens.min(256),
                temperature: config.llm.roles.evaluator_temperature,
            },
            window: config.pipeline.evaluator_window,
            max_step: config.pipeline.max_intensity_step,
            timeout: config.pipeline.stage_timeout(),
        }
    }

    /// Never fails: call errors, timeouts and undecodable output all resolve
    /// through [`failure_policy`].
    pub async fn evaluate(
        &self,
        current: EmotionalState,
        intensity: Intensity,
        user_message: &str,
        history: &[Turn],
    ) -> Transition {
        let input = prompts::evaluator_input(
            current,
            user_message,
            recent_turns(history, self.window),
            history.len(),
        );
        let system = prompts::evaluator_system();

        let text = match with_timeout(
            self.timeout,
            "evaluator",
            ask(self.client.as_ref(), &system, input, self.params.clone()),
        )
        .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Transition evaluation call failed: {:#}", e);
                return failure_policy(current, user_message, e);
            }
        };

        match parse_transition(&text) {
            Ok(judgment) => apply_judgment(current, intensity, user_message, judgment, self.max_step),
            Err(e) => {
                tracing::warn!("Transition evaluation unparseable: {}", e);
                failure_policy(current, user_message, e)
            }
        }
    }
}
