//! Grief-model emotional states and the advisory intensity attached to them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Affect of the simulated family member.
///
/// The five grief states form the transition graph; `Neutral` is a bootstrap
/// value that is left on the first evaluated turn and never re-entered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalState {
    Denial,
    Anger,
    Bargaining,
    Sadness,
    Acceptance,
    #[default]
    Neutral,
}

impl EmotionalState {
    /// The five states that make up the transition graph.
    pub const GRIEF: [EmotionalState; 5] = [
        EmotionalState::Denial,
        EmotionalState::Anger,
        EmotionalState::Bargaining,
        EmotionalState::Sadness,
        EmotionalState::Acceptance,
    ];

    /// Every member of the enumeration, bootstrap value included.
    pub const ALL: [EmotionalState; 6] = [
        EmotionalState::Denial,
        EmotionalState::Anger,
        EmotionalState::Bargaining,
        EmotionalState::Sadness,
        EmotionalState::Acceptance,
        EmotionalState::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Denial => "denial",
            Self::Anger => "anger",
            Self::Bargaining => "bargaining",
            Self::Sadness => "sadness",
            Self::Acceptance => "acceptance",
            Self::Neutral => "neutral",
        }
    }

    pub fn is_grief(&self) -> bool {
        !matches!(self, Self::Neutral)
    }

    /// Role-play instruction handed to the response generator.
    pub fn behaviour(&self) -> &'static str {
        match self {
            Self::Denial => "You are in denial about the severity of the situation. You keep insisting there must be another option, another treatment. You interrupt with hope-seeking questions. You may become agitated when faced with bad news.",
            Self::Anger => "You are angry and frustrated. You may raise your voice, blame others, or question the competence of the medical team. You feel helpless and express that through anger.",
            Self::Bargaining => "You are trying to negotiate. You ask 'what if' questions, propose alternative timelines, and seek any possible way to change the outcome. You're willing to try anything.",
            Self::Sadness => "You are deeply sad and grieving. You speak slowly, may cry, and express feelings of loss and hopelessness. You need emotional support and understanding.",
            Self::Acceptance => "You are coming to terms with the situation. You ask practical questions about next steps, comfort care, and how to make the patient comfortable. You're more receptive to information.",
            Self::Neutral => "You are uncertain and seeking information. You're processing what's happening and need clarity from the doctor.",
        }
    }
}

impl fmt::Display for EmotionalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownState(pub String);

impl fmt::Display for UnknownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown emotional state '{}'", self.0)
    }
}

impl std::error::Error for UnknownState {}

impl FromStr for EmotionalState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "denial" => Ok(Self::Denial),
            "anger" => Ok(Self::Anger),
            "bargaining" => Ok(Self::Bargaining),
            "sadness" => Ok(Self::Sadness),
            "acceptance" => Ok(Self::Acceptance),
            "neutral" => Ok(Self::Neutral),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

// ============================================================================
// Intensity
// ============================================================================

/// Magnitude of the current state, always within `[1, 10]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Intensity(u8);

impl Intensity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;
    /// Used at conversation start and whenever an evaluation fails.
    pub const DEFAULT: Intensity = Intensity(5);

    /// Build an intensity, clamping out-of-range values.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Move toward `target`, by at most `max_step` per turn.
    pub fn step_toward(self, target: Intensity, max_step: u8) -> Intensity {
        let current = self.0 as i64;
        let delta = (target.0 as i64 - current).clamp(-(max_step as i64), max_step as i64);
        Self::clamped(current + delta)
    }
}

impl Default for Intensity {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<Intensity> for u8 {
    fn from(i: Intensity) -> u8 {
        i.0
    }
}

impl TryFrom<i64> for Intensity {
    type Error = String;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&v) {
            Ok(Self(v as u8))
        } else {
            Err(format!("intensity {} outside [1, 10]", v))
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
