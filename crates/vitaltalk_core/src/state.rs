//! The single mutable record kept per conversation.

use crate::emotion::{EmotionalState, Intensity};
use crate::scenario::Scenario;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// The physician in training.
    User,
    /// The simulated family member.
    Agent,
    System,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
            Self::System => "system",
        }
    }

    /// Label used when a transcript is rendered into a prompt.
    pub fn speaker(&self) -> &'static str {
        match self {
            Self::User => "Doctor",
            Self::Agent => "Family",
            Self::System => "System",
        }
    }
}

/// One history entry. The emotional state is the one in effect when the
/// entry was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub emotional_state: EmotionalState,
    /// Unix timestamp (seconds)
    pub timestamp: i64,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>, emotional_state: EmotionalState) -> Self {
        Self {
            role,
            content: content.into(),
            emotional_state,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    #[default]
    InProgress,
    Paused,
    Completed,
    Abandoned,
}

impl ConversationStatus {
    /// Whether new turns may still be taken.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::InProgress | Self::Paused)
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InProgress => "in_progress",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        })
    }
}

/// Full per-conversation state, persisted wholesale after every turn.
///
/// The checkpoint slot lives beside it in the store (see `vitaltalk_memory`),
/// not inside it, so that a snapshot never nests another snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub conversation_id: String,
    /// Copied in at creation and never re-fetched.
    pub scenario: Scenario,
    pub emotional_state: EmotionalState,
    pub emotional_intensity: Intensity,
    pub history: Vec<Turn>,
    pub turn_count: u32,
    pub status: ConversationStatus,
    /// Unix timestamp (seconds) of the last committed mutation
    pub updated_at: i64,
}

impl ConversationState {
    pub fn new(conversation_id: impl Into<String>, scenario: Scenario) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            emotional_state: scenario.initial_emotional_state,
            scenario,
            emotional_intensity: Intensity::DEFAULT,
            history: Vec::new(),
            turn_count: 0,
            status: ConversationStatus::InProgress,
            updated_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.history.last()
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp();
    }
}

/// Render turns as `Speaker: text` lines.
pub fn format_transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| format!("{}: {}", t.role.speaker(), t.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The most recent `n` entries of `history`, oldest first.
pub fn recent_turns(history: &[Turn], n: usize) -> &[Turn] {
    &history[history.len().saturating_sub(n)..]
}
