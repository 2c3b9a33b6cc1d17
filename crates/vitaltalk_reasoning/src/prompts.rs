//! Prompt text for every model-backed stage.
//!
//! Each system prompt opens with a fixed first line so that a call can be
//! attributed to its stage from the prompt alone (see [`Stage::of`]).

use std::fmt;
use vitaltalk_core::state::format_transcript;
use vitaltalk_core::{EmotionalState, Scenario, Turn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Evaluator,
    Generator,
    SafetyJudge,
    Coach,
    Hint,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Evaluator,
        Stage::Generator,
        Stage::SafetyJudge,
        Stage::Coach,
        Stage::Hint,
    ];

    fn preamble(&self) -> &'static str {
        match self {
            Stage::Evaluator => EVALUATOR_PREAMBLE,
            Stage::Generator => GENERATOR_PREAMBLE,
            Stage::SafetyJudge => SAFETY_PREAMBLE,
            Stage::Coach => COACH_PREAMBLE,
            Stage::Hint => HINT_PREAMBLE,
        }
    }

    /// Which stage produced `system`.
    pub fn of(system: &str) -> Option<Stage> {
        Self::ALL.into_iter().find(|s| system.starts_with(s.preamble()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Evaluator => "evaluator",
            Stage::Generator => "generator",
            Stage::SafetyJudge => "safety_judge",
            Stage::Coach => "coach",
            Stage::Hint => "hint",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const EVALUATOR_PREAMBLE: &str = "You track the emotional state of a family member in a medical conversation simulation.";
const GENERATOR_PREAMBLE: &str = "You are role-playing a family member in an end-of-life conversation.";
const SAFETY_PREAMBLE: &str = "You review replies in a medical conversation simulation for safety and ethics.";
const COACH_PREAMBLE: &str = "You are an expert coach for physicians holding end-of-life conversations.";
const HINT_PREAMBLE: &str = "You are a communication coach giving a physician a brief hint mid-conversation.";

// ============================================================================
// Emotion Transition Evaluator
// ============================================================================

pub fn evaluator_system() -> String {
    format!(
        r#"{EVALUATOR_PREAMBLE}

Decide whether the family member's emotional state changes in response to the doctor's latest message.

States:
- denial: refuses to accept the situation
- anger: frustration, blame, raised emotions
- bargaining: looks for alternatives, "what if" thinking
- sadness: grief, tears, despair
- acceptance: coming to terms, focus on practical next steps

Classify the doctor's message as one style:
- empathetic: acknowledges feelings, gives space, gentle pacing
- factual: clinical information without emotional acknowledgement
- dismissive: brushes off concerns, rushes, or blames

People do not jump from anger to acceptance in one exchange. Change intensity gradually.

Reply with JSON only:
{{"style": "empathetic|factual|dismissive", "new_state": "state_name", "intensity": 1-10, "reasoning": "one sentence"}}"#
    )
}

pub fn evaluator_input(
    current: EmotionalState,
    user_message: &str,
    recent: &[Turn],
    history_len: usize,
) -> String {
    let history = if recent.is_empty() {
        "(none)".to_string()
    } else {
        format_transcript(recent)
    };
    format!(
        "Current emotional state: {}\nHistory entries so far: {}\n\nRecent history:\n{}\n\nDoctor's latest message:\n{}",
        current, history_len, history, user_message
    )
}

// ============================================================================
// Response Generator
// ============================================================================

pub fn generator_system(state: EmotionalState, scenario: &Scenario) -> String {
    format!(
        r#"{GENERATOR_PREAMBLE}

Scenario:
- Patient: {condition}
- Your relationship: {relationship}
- Background: {background}

Current emotional state: {state}
{behaviour}

Guidelines:
- Stay in character for your emotional state
- React to what the doctor actually said
- Show emotion through your words instead of naming it
- Keep replies to two or three sentences

You are a real person in crisis, not a textbook example."#,
        condition = scenario.patient_condition,
        relationship = scenario.family_relationship,
        background = scenario.family_background,
        state = state,
        behaviour = state.behaviour(),
    )
}

pub fn generator_input(recent: &[Turn], user_message: &str) -> String {
    let history = if recent.is_empty() {
        "Beginning of conversation.".to_string()
    } else {
        format_transcript(recent)
    };
    format!(
        "{}\n\nDoctor: {}\n\nRespond as the family member:",
        history, user_message
    )
}

// ============================================================================
// Safety Judge
// ============================================================================

pub fn safety_system() -> String {
    format!(
        r#"{SAFETY_PREAMBLE}

Check the family member's reply for:
1. Medical inaccuracy or invented treatments
2. Ethical violations (autonomy, beneficence, non-maleficence)
3. Breaches of professional boundaries
4. Culturally insensitive or offensive content
5. Cruel or needlessly harsh language

Answer with exactly one of:
SAFE
UNSAFE: <reason>
List additional reasons on their own lines as "Issue: <reason>"."#
    )
}

pub fn safety_input(reply: &str, state: EmotionalState, scenario: &Scenario) -> String {
    format!(
        "Scenario: {}\nEmotional state: {}\n\nReply under review:\n{}\n\nIs this reply safe and appropriate?",
        scenario.title, state, reply
    )
}

// ============================================================================
// Coach
// ============================================================================

pub fn coach_system() -> String {
    format!(
        r#"{COACH_PREAMBLE}

Score the physician from 0 to 10 on:
1. empathy (25%): acknowledges emotions, empathetic language, space for feelings
2. clarity (20%): clear facts, no jargon, checks understanding
3. emotional alignment (20%): matches the family's state, paces information
4. ethical appropriateness (20%): respects autonomy, presents options fairly
5. cultural sensitivity (15%): respects family dynamics and cultural norms

Reply with JSON only:
{{
  "empathy_score": 0-10,
  "clarity_score": 0-10,
  "emotional_alignment_score": 0-10,
  "ethical_appropriateness_score": 0-10,
  "cultural_sensitivity_score": 0-10,
  "overall_score": 0-10,
  "strengths": ["..."],
  "areas_for_improvement": ["..."],
  "suggested_responses": [{{"situation": "when ...", "better_response": "you could say ..."}}],
  "summary": "two or three sentences"
}}"#
    )
}

pub fn coach_input(history: &[Turn], scenario: &Scenario) -> String {
    let transcript = if history.is_empty() {
        "(no messages exchanged)".to_string()
    } else {
        format_transcript(history)
    };
    format!(
        "Scenario: {}\n\nTranscript:\n{}\n\nEvaluate this physician.",
        scenario.description, transcript
    )
}

pub fn hint_system() -> String {
    format!(
        r#"{HINT_PREAMBLE}

Start your answer with "GOOD:" if the physician is on track, or "NEEDS WORK:" if not, then give two or three sentences of feedback."#
    )
}

pub fn hint_input(last: &Turn, state: EmotionalState, scenario: &Scenario) -> String {
    format!(
        "Scenario: {}\nFamily member's emotional state: {}\n\nLast message ({}): {}",
        scenario.title,
        state,
        last.role.speaker(),
        last.content
    )
}
