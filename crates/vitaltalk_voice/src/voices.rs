//! Emotional state -> synthesis voice.

use vitaltalk_core::EmotionalState;

pub const DEFAULT_VOICE: &str = "nova";

pub fn voice_for_state(state: EmotionalState) -> &'static str {
    match state {
        EmotionalState::Neutral => "nova",
        EmotionalState::Denial => "alloy",
        EmotionalState::Anger => "onyx",
        EmotionalState::Bargaining => "shimmer",
        EmotionalState::Sadness => "echo",
        EmotionalState::Acceptance => "fable",
    }
}

/// Lookup by wire label. Unknown labels get [`DEFAULT_VOICE`].
pub fn voice_for_label(label: &str) -> &'static str {
    label
        .trim()
        .to_ascii_lowercase()
        .parse::<EmotionalState>()
        .map(voice_for_state)
        .unwrap_or(DEFAULT_VOICE)
}
