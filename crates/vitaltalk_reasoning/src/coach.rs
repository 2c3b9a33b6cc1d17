//! Coach/Feedback Evaluator: end-of-session scoring and mid-session hints.
//!
//! Both operations are best-effort. Scoring falls back to a fixed neutral
//! report and hints fall back to an "unavailable" label; neither returns an
//! error.

use crate::llm::{ask, with_timeout, CompletionParams, LlmClient};
use crate::parse::{extract_json, parse_hint};
use crate::prompts;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use vitaltalk_core::{EmotionalState, Scenario, Turn, VitalConfig};

// Dimension weights, in percent.
pub const WEIGHT_EMPATHY: f64 = 25.0;
pub const WEIGHT_CLARITY: f64 = 20.0;
pub const WEIGHT_ALIGNMENT: f64 = 20.0;
pub const WEIGHT_ETHICS: f64 = 20.0;
pub const WEIGHT_CULTURE: f64 = 15.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedResponse {
    pub situation: String,
    pub better_response: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub empathy_score: f64,
    pub clarity_score: f64,
    pub emotional_alignment_score: f64,
    pub ethical_appropriateness_score: f64,
    pub cultural_sensitivity_score: f64,
    /// Weighted sum of the five dimensions, one decimal.
    pub overall_score: f64,
    /// The overall score the model itself gave, if any.
    pub reported_overall: Option<f64>,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub suggested_responses: Vec<SuggestedResponse>,
    pub summary: String,
    /// True when this is the fixed fallback report.
    pub is_default: bool,
}

fn clamp_score(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 10.0)
    } else {
        0.0
    }
}

pub fn weighted_overall(
    empathy: f64,
    clarity: f64,
    alignment: f64,
    ethics: f64,
    culture: f64,
) -> f64 {
    // Summed in hundredths so half-tenths round predictably.
    let hundredths = empathy * WEIGHT_EMPATHY
        + clarity * WEIGHT_CLARITY
        + alignment * WEIGHT_ALIGNMENT
        + ethics * WEIGHT_ETHICS
        + culture * WEIGHT_CULTURE;
    (hundredths / 10.0).round() / 10.0
}

impl ScoreReport {
    /// Neutral report used whenever scoring cannot be produced.
    pub fn default_report() -> Self {
        let (e, c, a, x, k) = (7.0, 7.0, 7.0, 8.0, 7.5);
        Self {
            empathy_score: e,
            clarity_score: c,
            emotional_alignment_score: a,
            ethical_appropriateness_score: x,
            cultural_sensitivity_score: k,
            overall_score: weighted_overall(e, c, a, x, k),
            reported_overall: None,
            strengths: vec!["Maintained professional demeanor".to_string()],
            areas_for_improvement: vec!["Could provide more emotional support".to_string()],
            suggested_responses: Vec::new(),
            summary: "Adequate performance with room for improvement.".to_string(),
            is_default: true,
        }
    }
}

#[derive(Deserialize)]
struct RawReport {
    empathy_score: f64,
    clarity_score: f64,
    emotional_alignment_score: f64,
    ethical_appropriateness_score: f64,
    cultural_sensitivity_score: f64,
    #[serde(default)]
    overall_score: Option<f64>,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    areas_for_improvement: Vec<String>,
    #[serde(default)]
    suggested_responses: Vec<SuggestedResponse>,
    #[serde(default)]
    summary: String,
}

impl From<RawReport> for ScoreReport {
    fn from(raw: RawReport) -> Self {
        let e = clamp_score(raw.empathy_score);
        let c = clamp_score(raw.clarity_score);
        let a = clamp_score(raw.emotional_alignment_score);
        let x = clamp_score(raw.ethical_appropriateness_score);
        let k = clamp_score(raw.cultural_sensitivity_score);
        Self {
            empathy_score: e,
            clarity_score: c,
            emotional_alignment_score: a,
            ethical_appropriateness_score: x,
            cultural_sensitivity_score: k,
            overall_score: weighted_overall(e, c, a, x, k),
            reported_overall: raw.overall_score,
            strengths: raw.strengths,
            areas_for_improvement: raw.areas_for_improvement,
            suggested_responses: raw.suggested_responses,
            summary: raw.summary,
            is_default: false,
        }
    }
}

// ============================================================================
// Hints
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintQuality {
    Good,
    NeedsWork,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingHint {
    pub feedback: String,
    pub quality: HintQuality,
}

impl CoachingHint {
    fn unavailable(feedback: &str) -> Self {
        Self {
            feedback: feedback.to_string(),
            quality: HintQuality::Unavailable,
        }
    }
}

// ============================================================================
// Evaluator
// ============================================================================

pub struct CoachEvaluator {
    client: Arc<dyn LlmClient>,
    params: CompletionParams,
    timeout: Duration,
}

impl CoachEvaluator {
    pub fn new(client: Arc<dyn LlmClient>, config: &VitalConfig) -> Self {
        Self {
            client,
            params: CompletionParams {
                max_tokens: config.llm.max_tokens,
                temperature: config.llm.roles.coach_temperature,
            },
            timeout: config.pipeline.stage_timeout(),
        }
    }

    /// Score the full transcript.
    pub async fn evaluate(&self, history: &[Turn], scenario: &Scenario) -> ScoreReport {
        let system = prompts::coach_system();
        let input = prompts::coach_input(history, scenario);

        let text = match with_timeout(
            self.timeout,
            "coach",
            ask(self.client.as_ref(), &system, input, self.params.clone()),
        )
        .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Coach evaluation failed, returning default report: {:#}", e);
                return ScoreReport::default_report();
            }
        };

        match extract_json::<RawReport>(&text) {
            Ok(raw) => {
                let report = ScoreReport::from(raw);
                if let Some(reported) = report.reported_overall {
                    if (reported - report.overall_score).abs() > 0.5 {
                        tracing::debug!(
                            "Coach reported overall {} differs from weighted {}",
                            reported,
                            report.overall_score
                        );
                    }
                }
                report
            }
            Err(e) => {
                tracing::warn!("Coach output unparseable, returning default report: {}", e);
                ScoreReport::default_report()
            }
        }
    }

    /// Brief feedback on the last history entry. `None` means no messages yet.
    pub async fn evaluate_single(
        &self,
        last: Option<&Turn>,
        state: EmotionalState,
        scenario: &Scenario,
    ) -> CoachingHint {
        let Some(last) = last else {
            return CoachingHint::unavailable("No messages yet. Start the conversation to get a hint.");
        };

        let system = prompts::hint_system();
        let input = prompts::hint_input(last, state, scenario);
        let params = CompletionParams {
            max_tokens: self.params.max_tokens.min(256),
            ..self.params.clone()
        };

        match with_timeout(
            self.timeout,
            "hint",
            ask(self.client.as_ref(), &system, input, params),
        )
        .await
        {
            Ok(text) if !text.is_empty() => {
                let (good, feedback) = parse_hint(&text);
                CoachingHint {
                    feedback,
                    quality: match good {
                        Some(false) => HintQuality::NeedsWork,
                        _ => HintQuality::Good,
                    },
                }
            }
            Ok(_) => CoachingHint::unavailable("Coaching hint is unavailable right now."),
            Err(e) => {
                tracing::warn!("Coaching hint failed: {:#}", e);
                CoachingHint::unavailable("Coaching hint is unavailable right now.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::Stage;
    use crate::providers::MockProvider;
    use vitaltalk_core::{ScenarioCatalog, ScenarioProvider, TurnRole};

    fn coach(mock: Arc<MockProvider>) -> CoachEvaluator {
        CoachEvaluator::new(mock, &VitalConfig::default())
    }

    #[test]
    fn test_default_report() {
        let r = ScoreReport::default_report();
        assert_eq!(r.overall_score, 7.3);
        assert_eq!(r.strengths.len(), 1);
        assert_eq!(r.areas_for_improvement.len(), 1);
        assert!(r.is_default);
        for s in [
            r.empathy_score,
            r.clarity_score,
            r.emotional_alignment_score,
            r.ethical_appropriateness_score,
            r.cultural_sensitivity_score,
        ] {
            assert!((7.0..=8.0).contains(&s));
        }
    }

    #[test]
    fn test_weighted_overall() {
        assert_eq!(weighted_overall(10.0, 10.0, 10.0, 10.0, 10.0), 10.0);
        assert_eq!(weighted_overall(8.0, 6.0, 7.0, 9.0, 5.0), 7.2);
    }

    #[tokio::test]
    async fn test_report_enforces_weighted_sum_and_keeps_reported() {
        let mock = Arc::new(MockProvider::new("m"));
        mock.script(
            Stage::Coach,
            r#"```json
            {"empathy_score": 12, "clarity_score": 6, "emotional_alignment_score": 7,
             "ethical_appropriateness_score": 9, "cultural_sensitivity_score": 5,
             "overall_score": 9.9, "strengths": ["warm"], "areas_for_improvement": [],
             "suggested_responses": [{"situation": "when she cried", "better_response": "pause"}],
             "summary": "ok"}
            ```"#,
        );
        let scenario = ScenarioCatalog::builtin().get_or_default(1);
        let report = coach(mock).evaluate(&[], &scenario).await;

        assert!(!report.is_default);
        assert_eq!(report.empathy_score, 10.0);
        assert_eq!(report.overall_score, weighted_overall(10.0, 6.0, 7.0, 9.0, 5.0));
        assert_eq!(report.reported_overall, Some(9.9));
        assert_eq!(report.suggested_responses.len(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_report_falls_back() {
        let mock = Arc::new(MockProvider::new("m"));
        mock.script(Stage::Coach, "Great job overall!");
        let scenario = ScenarioCatalog::builtin().get_or_default(1);
        assert_eq!(coach(mock).evaluate(&[], &scenario).await, ScoreReport::default_report());
    }

    #[tokio::test]
    async fn test_hint_quality_labels() {
        let scenario = ScenarioCatalog::builtin().get_or_default(1);
        let turn = Turn::new(TurnRole::User, "The results are bad.", EmotionalState::Denial);

        let mock = Arc::new(MockProvider::new("m"));
        mock.script(Stage::Hint, "NEEDS WORK: Acknowledge her fear first.");
        let hint = coach(mock)
            .evaluate_single(Some(&turn), EmotionalState::Denial, &scenario)
            .await;
        assert_eq!(hint.quality, HintQuality::NeedsWork);
        assert_eq!(hint.feedback, "Acknowledge her fear first.");

        let mock = Arc::new(MockProvider::new("m"));
        mock.fail(Stage::Hint, "down");
        let hint = coach(mock)
            .evaluate_single(Some(&turn), EmotionalState::Denial, &scenario)
            .await;
        assert_eq!(hint.quality, HintQuality::Unavailable);
    }

    #[tokio::test]
    async fn test_hint_without_history_skips_model() {
        let mock = Arc::new(MockProvider::new("m"));
        let scenario = ScenarioCatalog::builtin().get_or_default(1);
        let hint = coach(mock.clone())
            .evaluate_single(None, EmotionalState::Denial, &scenario)
            .await;
        assert_eq!(hint.quality, HintQuality::Unavailable);
        assert!(mock.calls().is_empty());
    }
}
