//! Decoding of model judgments into typed values.
//!
//! Every decoder returns `Result<_, ParseError>`; what to do on failure is
//! decided by the caller, never here.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use vitaltalk_core::{EmotionalState, ResponseStyle};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("empty model output")]
    Empty,

    #[error("no JSON object in model output")]
    NoJson,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("unknown emotional state: {0}")]
    UnknownState(String),

    #[error("unrecognized verdict: {0}")]
    Unrecognized(String),
}

/// Parse a JSON object out of model text, tolerating prose or code fences
/// around it.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Ok(v) = serde_json::from_str::<T>(trimmed) {
        return Ok(v);
    }

    let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) else {
        return Err(ParseError::NoJson);
    };
    if end < start {
        return Err(ParseError::NoJson);
    }
    serde_json::from_str::<T>(&trimmed[start..=end]).map_err(|e| ParseError::InvalidJson(e.to_string()))
}

// ============================================================================
// Transition judgment
// ============================================================================

/// What the evaluator model proposed, before the transition table is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionJudgment {
    pub new_state: EmotionalState,
    pub intensity: Option<i64>,
    pub style: Option<ResponseStyle>,
    pub reasoning: String,
}

#[derive(Deserialize)]
struct RawJudgment {
    new_state: String,
    #[serde(default)]
    intensity: Option<serde_json::Value>,
    #[serde(default)]
    style: Option<String>,
    #[serde(default)]
    reasoning: String,
}

pub fn parse_transition(text: &str) -> Result<TransitionJudgment, ParseError> {
    let raw: RawJudgment = extract_json(text)?;
    let new_state = raw
        .new_state
        .parse::<EmotionalState>()
        .map_err(|_| ParseError::UnknownState(raw.new_state.clone()))?;

    // Models send 7, 7.5 or "7"; anything else counts as absent.
    let intensity = raw.intensity.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    });

    let style = raw.style.and_then(|s| s.parse::<ResponseStyle>().ok());

    Ok(TransitionJudgment {
        new_state,
        intensity,
        style,
        reasoning: raw.reasoning,
    })
}

// ============================================================================
// Safety verdict
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SafetyVerdict {
    Safe,
    Unsafe { issues: Vec<String> },
}

pub const MAX_ISSUES: usize = 3;

/// Decode the output judge's answer. Any mention of "unsafe" or
/// "inappropriate" wins over a leading "SAFE".
pub fn parse_safety_verdict(text: &str) -> Result<SafetyVerdict, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let lower = trimmed.to_lowercase();
    if lower.contains("unsafe") || lower.contains("inappropriate") {
        let issues = trimmed
            .lines()
            .filter_map(|line| line.split_once(':').map(|(_, reason)| reason.trim()))
            .filter(|reason| !reason.is_empty())
            .take(MAX_ISSUES)
            .map(str::to_string)
            .collect();
        return Ok(SafetyVerdict::Unsafe { issues });
    }

    if lower.starts_with("safe") {
        return Ok(SafetyVerdict::Safe);
    }

    Err(ParseError::Unrecognized(trimmed.chars().take(80).collect()))
}

// ============================================================================
// Hint
// ============================================================================

/// Split a hint answer into its quality prefix and the feedback text.
/// Returns `None` for the quality when no recognised prefix is present.
pub fn parse_hint(text: &str) -> (Option<bool>, String) {
    let trimmed = text.trim();
    for (prefix, good) in [("NEEDS WORK:", false), ("NEEDS_WORK:", false), ("GOOD:", true)] {
        if let Some(head) = trimmed.get(..prefix.len()) {
            if head.eq_ignore_ascii_case(prefix) {
                return (Some(good), trimmed[prefix.len()..].trim().to_string());
            }
        }
    }
    (None, trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_direct_json() {
        let j = parse_transition(
            r#"{"style": "empathetic", "new_state": "Sadness", "intensity": 6, "reasoning": "felt heard"}"#,
        )
        .unwrap();
        assert_eq!(j.new_state, EmotionalState::Sadness);
        assert_eq!(j.intensity, Some(6));
        assert_eq!(j.style, Some(ResponseStyle::Empathetic));
        assert_eq!(j.reasoning, "felt heard");
    }

    #[test]
    fn test_transition_in_code_fence() {
        let text = "Here you go:\n```json\n{\"new_state\": \"anger\", \"intensity\": \"8\"}\n```";
        let j = parse_transition(text).unwrap();
        assert_eq!(j.new_state, EmotionalState::Anger);
        assert_eq!(j.intensity, Some(8));
        assert_eq!(j.style, None);
    }

    #[test]
    fn test_transition_float_intensity_and_style_suffix() {
        let j = parse_transition(
            r#"{"new_state": "denial", "intensity": 6.6, "style": "dismissive_response"}"#,
        )
        .unwrap();
        assert_eq!(j.intensity, Some(7));
        assert_eq!(j.style, Some(ResponseStyle::Dismissive));
    }

    #[test]
    fn test_transition_errors() {
        assert_eq!(parse_transition("   "), Err(ParseError::Empty));
        assert_eq!(parse_transition("I think sadness"), Err(ParseError::NoJson));
        assert!(matches!(parse_transition("{oops}"), Err(ParseError::InvalidJson(_))));
        assert_eq!(
            parse_transition(r#"{"new_state": "furious"}"#),
            Err(ParseError::UnknownState("furious".into()))
        );
    }

    #[test]
    fn test_safety_verdicts() {
        assert_eq!(parse_safety_verdict("SAFE"), Ok(SafetyVerdict::Safe));
        assert_eq!(parse_safety_verdict("safe - looks fine"), Ok(SafetyVerdict::Safe));

        let v = parse_safety_verdict(
            "UNSAFE: promises a cure\nIssue: invented treatment\nIssue: false hope\nIssue: fourth",
        )
        .unwrap();
        match v {
            SafetyVerdict::Unsafe { issues } => {
                assert_eq!(issues.len(), MAX_ISSUES);
                assert_eq!(issues[0], "promises a cure");
            }
            SafetyVerdict::Safe => panic!("expected unsafe"),
        }

        assert!(matches!(
            parse_safety_verdict("This seems inappropriate"),
            Ok(SafetyVerdict::Unsafe { .. })
        ));
        assert_eq!(parse_safety_verdict(""), Err(ParseError::Empty));
        assert!(matches!(parse_safety_verdict("Maybe?"), Err(ParseError::Unrecognized(_))));
    }

    #[test]
    fn test_hint_prefixes() {
        assert_eq!(parse_hint("GOOD: Nice pacing."), (Some(true), "Nice pacing.".to_string()));
        assert_eq!(
            parse_hint("Needs work: slow down."),
            (Some(false), "slow down.".to_string())
        );
        assert_eq!(parse_hint("Try pausing."), (None, "Try pausing.".to_string()));
    }
}
