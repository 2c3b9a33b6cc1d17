//! Caller-visible failures of conversation operations.
//!
//! Unsafe input, unsafe output and unparseable evaluations are not errors:
//! they are recovered inside the pipeline and never reach this type.

use crate::state::ConversationStatus;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConversationError>;

#[derive(Error, Debug)]
pub enum ConversationError {
    /// No stored state for this id (never created, or expired)
    #[error("Conversation not found: {0}")]
    NotFound(String),

    #[error("Conversation already exists: {0}")]
    AlreadyExists(String),

    /// Redo requested with nothing to restore
    #[error("No checkpoint available for conversation {0}")]
    NoCheckpoint(String),

    /// Turn attempted on a completed or abandoned conversation
    #[error("Conversation {id} is {status}")]
    Closed {
        id: String,
        status: ConversationStatus,
    },

    /// Response generation failed or timed out; the turn was not applied
    #[error("Response generation failed: {0}")]
    Generation(String),

    #[error("State store error: {0}")]
    Store(String),
}

impl ConversationError {
    /// Stable machine-readable code for API and channel payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::NoCheckpoint(_) => "no_checkpoint",
            Self::Closed { .. } => "closed",
            Self::Generation(_) => "generation_failed",
            Self::Store(_) => "store_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_and_codes() {
        let err = ConversationError::NoCheckpoint("abc".into());
        assert_eq!(err.to_string(), "No checkpoint available for conversation abc");
        assert_eq!(err.code(), "no_checkpoint");

        let err = ConversationError::Closed {
            id: "abc".into(),
            status: ConversationStatus::Completed,
        };
        assert_eq!(err.to_string(), "Conversation abc is completed");
    }
}
