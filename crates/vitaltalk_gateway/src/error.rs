//! HTTP mapping of caller-visible failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use vitaltalk_core::ConversationError;

#[derive(Debug)]
pub enum ApiError {
    Conversation(ConversationError),
    NotFound(String),
    BadRequest(String),
    /// A collaborator (e.g. the voice backend) is not configured.
    Unavailable(String),
    /// A collaborator call failed.
    Upstream(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Conversation(e) => match e {
                ConversationError::NotFound(_) => StatusCode::NOT_FOUND,
                ConversationError::AlreadyExists(_)
                | ConversationError::NoCheckpoint(_)
                | ConversationError::Closed { .. } => StatusCode::CONFLICT,
                ConversationError::Generation(_) => StatusCode::BAD_GATEWAY,
                ConversationError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Conversation(e) => e.code(),
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Unavailable(_) => "unavailable",
            Self::Upstream(_) => "upstream_error",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Conversation(e) => e.to_string(),
            Self::NotFound(m) | Self::BadRequest(m) | Self::Unavailable(m) | Self::Upstream(m) => {
                m.clone()
            }
        }
    }
}

impl From<ConversationError> for ApiError {
    fn from(e: ConversationError) -> Self {
        Self::Conversation(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{} {}: {}", status.as_u16(), self.code(), self.message());
        }
        let body = serde_json::json!({
            "error": self.code(),
            "message": self.message(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitaltalk_core::ConversationStatus;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ConversationError::NotFound("a".into()), StatusCode::NOT_FOUND),
            (ConversationError::AlreadyExists("a".into()), StatusCode::CONFLICT),
            (ConversationError::NoCheckpoint("a".into()), StatusCode::CONFLICT),
            (
                ConversationError::Closed {
                    id: "a".into(),
                    status: ConversationStatus::Completed,
                },
                StatusCode::CONFLICT,
            ),
            (ConversationError::Generation("x".into()), StatusCode::BAD_GATEWAY),
            (ConversationError::Store("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_code_passthrough() {
        let err = ApiError::from(ConversationError::NoCheckpoint("a".into()));
        assert_eq!(err.code(), "no_checkpoint");
        assert_eq!(ApiError::Unavailable("tts".into()).status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
