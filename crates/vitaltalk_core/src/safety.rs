use crate::config::SafetyConfig;
use crate::emotion::EmotionalState;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

// ============================================================================
// Input screen
// ============================================================================

/// Result of screening the doctor's message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum InputVerdict {
    Safe,
    Unsafe {
        rejection_message: String,
        matched: String,
    },
}

impl InputVerdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, Self::Safe)
    }
}

/// Deterministic side of the Safety Gate.
///
/// Keywords match case-insensitively at the start of a word, so inflected
/// forms ("harmful", "killing") are caught while embedded substrings
/// ("pharmacy", "skill") are not.
#[derive(Debug, Clone)]
pub struct SafetyGate {
    pattern: Option<Regex>,
    rejection_message: String,
}

impl SafetyGate {
    pub fn new(config: &SafetyConfig) -> Self {
        let alternatives: Vec<String> = config
            .blocked_keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(regex::escape)
            .collect();

        let pattern = if alternatives.is_empty() {
            None
        } else {
            RegexBuilder::new(&format!(r"\b(?:{})", alternatives.join("|")))
                .case_insensitive(true)
                .build()
                .map_err(|e| tracing::error!("Invalid safety denylist pattern: {}", e))
                .ok()
        };

        Self {
            pattern,
            rejection_message: config.rejection_message.clone(),
        }
    }

    pub fn check_user_input(&self, text: &str) -> InputVerdict {
        let Some(pattern) = &self.pattern else {
            return InputVerdict::Safe;
        };
        match pattern.find(text) {
            Some(m) => InputVerdict::Unsafe {
                rejection_message: self.rejection_message.clone(),
                matched: m.as_str().to_lowercase(),
            },
            None => InputVerdict::Safe,
        }
    }
}

impl Default for SafetyGate {
    fn default() -> Self {
        Self::new(&SafetyConfig::default())
    }
}

// ============================================================================
// Output fallback
// ============================================================================

/// Canned in-character line that replaces a generated reply judged unsafe.
/// Selected solely by the emotional state in effect for the turn.
pub fn fallback_reply(state: EmotionalState) -> &'static str {
    match state {
        EmotionalState::Denial => {
            "I hear what you're saying, Doctor. I just need some time to process this."
        }
        EmotionalState::Anger => "I'm feeling overwhelmed right now. Can we take a moment?",
        EmotionalState::Sadness => {
            "This is very difficult to hear. Thank you for being honest with me."
        }
        EmotionalState::Acceptance => "I understand. What should we do next?",
        EmotionalState::Bargaining => "Is there anything else we can try?",
        EmotionalState::Neutral => "I need a moment to think about this.",
    }
}
