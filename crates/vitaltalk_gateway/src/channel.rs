//! Per-conversation message channel over WebSocket.
//!
//! The greeting goes out before any inbound frame is read. Frames are handled
//! one at a time, in arrival order. When the socket closes or errors the
//! conversation is paused so it can be resumed later.

use crate::types::{FrameKind, InboundFrame, OutboundFrame};
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use vitaltalk_core::ConversationError;
use vitaltalk_reasoning::Orchestrator;

type WsSink = SplitSink<WebSocket, Message>;

async fn send_frame(tx: &mut WsSink, frame: &OutboundFrame) -> bool {
    let json = match serde_json::to_string(frame) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to encode channel frame: {}", e);
            return true;
        }
    };
    tx.send(Message::Text(json)).await.is_ok()
}

fn error_frame(e: &ConversationError) -> OutboundFrame {
    OutboundFrame::error(e.code(), e.to_string())
}

async fn handle_frame(orchestrator: &Orchestrator, conversation_id: &str, frame: InboundFrame) -> OutboundFrame {
    match frame.kind {
        FrameKind::Message => {
            if frame.content.trim().is_empty() {
                return OutboundFrame::error("bad_request", "Message content is empty");
            }
            match orchestrator.process_message(conversation_id, &frame.content).await {
                Ok(outcome) => OutboundFrame::from_outcome(outcome),
                Err(e) => error_frame(&e),
            }
        }
        FrameKind::Redo => match orchestrator.redo_last_turn(conversation_id).await {
            Ok(state) => OutboundFrame::rewound(&state),
            Err(e) => error_frame(&e),
        },
        FrameKind::Hint => match orchestrator.get_coaching_hint(conversation_id).await {
            Ok(hint) => OutboundFrame::Hint {
                content: hint.feedback,
                quality: hint.quality,
            },
            Err(e) => error_frame(&e),
        },
    }
}

pub async fn handle_socket(socket: WebSocket, orchestrator: Arc<Orchestrator>, conversation_id: String) {
    tracing::info!("Channel opened for conversation {}", conversation_id);
    let (mut ws_tx, mut ws_rx) = socket.split();

    if send_frame(&mut ws_tx, &OutboundFrame::greeting()).await {
        while let Some(Ok(msg)) = ws_rx.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            let reply = match serde_json::from_str::<InboundFrame>(&text) {
                Ok(frame) => handle_frame(&orchestrator, &conversation_id, frame).await,
                Err(e) => OutboundFrame::error("bad_request", format!("Invalid JSON: {}", e)),
            };
            if !send_frame(&mut ws_tx, &reply).await {
                break;
            }
        }
    }

    match orchestrator.pause(&conversation_id).await {
        Ok(_) => tracing::info!("Channel closed, conversation {} paused", conversation_id),
        Err(e) => tracing::debug!("Channel closed, conversation {} not paused: {}", conversation_id, e),
    }
}
