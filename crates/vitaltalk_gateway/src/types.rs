use serde::{Deserialize, Serialize};
use vitaltalk_core::{ConversationState, ConversationStatus, EmotionalState, Intensity, GREETING};
use vitaltalk_reasoning::{HintQuality, TurnOutcome};

// ============================================================================
// HTTP bodies
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRequest {
    #[serde(default = "default_scenario_id")]
    pub scenario_id: u32,
    /// Caller-chosen id. A UUID v4 is generated when absent.
    #[serde(default)]
    pub conversation_id: Option<String>,
}

fn default_scenario_id() -> u32 {
    1
}

/// Compact view returned by lifecycle endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub scenario_id: u32,
    pub status: ConversationStatus,
    pub current_emotional_state: EmotionalState,
    pub turn_count: u32,
}

impl From<&ConversationState> for ConversationSummary {
    fn from(state: &ConversationState) -> Self {
        Self {
            id: state.conversation_id.clone(),
            scenario_id: state.scenario.id,
            status: state.status,
            current_emotional_state: state.emotional_state,
            turn_count: state.turn_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsRequest {
    pub text: String,
    /// Emotional state label selecting the voice.
    #[serde(default = "default_emotion")]
    pub emotion: String,
}

fn default_emotion() -> String {
    EmotionalState::Neutral.as_str().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    pub text: String,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioHealth {
    pub status: String,
    pub whisper_available: bool,
    pub tts_available: bool,
}

// ============================================================================
// Channel frames
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    #[default]
    Message,
    Redo,
    Hint,
}

/// Client -> server frame. A missing `type` means a plain message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundFrame {
    #[serde(rename = "type", default)]
    pub kind: FrameKind,
    #[serde(default)]
    pub content: String,
}

/// Server -> client frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    Message {
        role: String,
        content: String,
        emotional_state: EmotionalState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        emotional_intensity: Option<Intensity>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        turn_count: Option<u32>,
    },
    /// Input screen rejection; nothing was recorded.
    Rejected { content: String },
    System {
        content: String,
        status: ConversationStatus,
        emotional_state: EmotionalState,
        turn_count: u32,
    },
    Hint { content: String, quality: HintQuality },
    Error { code: String, message: String },
}

impl OutboundFrame {
    /// First frame on every connection. Not part of the history.
    pub fn greeting() -> Self {
        Self::Message {
            role: "agent".to_string(),
            content: GREETING.to_string(),
            emotional_state: EmotionalState::Neutral,
            emotional_intensity: None,
            turn_count: None,
        }
    }

    pub fn from_outcome(outcome: TurnOutcome) -> Self {
        match outcome {
            TurnOutcome::Reply(r) => Self::Message {
                role: "agent".to_string(),
                content: r.response,
                emotional_state: r.emotional_state,
                emotional_intensity: Some(r.emotional_intensity),
                turn_count: Some(r.turn_count),
            },
            TurnOutcome::Rejected { message } => Self::Rejected { content: message },
        }
    }

    pub fn rewound(state: &ConversationState) -> Self {
        Self::System {
            content: format!("Conversation rewound to turn {}", state.turn_count),
            status: state.status,
            emotional_state: state.emotional_state,
            turn_count: state.turn_count,
        }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_frame_defaults_to_message() {
        let frame: InboundFrame = serde_json::from_str(r#"{"content":"Hello"}"#).unwrap();
        assert_eq!(frame.kind, FrameKind::Message);
        assert_eq!(frame.content, "Hello");

        let frame: InboundFrame = serde_json::from_str(r#"{"type":"redo"}"#).unwrap();
        assert_eq!(frame.kind, FrameKind::Redo);
        assert!(frame.content.is_empty());
    }

    #[test]
    fn test_unknown_frame_type_rejected() {
        assert!(serde_json::from_str::<InboundFrame>(r#"{"type":"dance"}"#).is_err());
    }

    #[test]
    fn test_greeting_shape() {
        let json = serde_json::to_value(OutboundFrame::greeting()).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["role"], "agent");
        assert_eq!(json["emotional_state"], "neutral");
        assert_eq!(json["content"], GREETING);
        assert!(json.get("turn_count").is_none());
    }

    #[test]
    fn test_start_request_defaults() {
        let req: StartRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.scenario_id, 1);
        assert!(req.conversation_id.is_none());
    }

    #[test]
    fn test_tts_request_default_emotion() {
        let req: TtsRequest = serde_json::from_str(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(req.emotion, "neutral");
    }
}
