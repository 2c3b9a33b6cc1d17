use crate::channel;
use crate::error::ApiError;
use crate::types::{
    AudioHealth, ConversationSummary, MessageRequest, StartRequest, TranscriptionResponse, TtsRequest,
};
use axum::{
    body::Bytes,
    extract::{Path, State, WebSocketUpgrade},
    http::{header, HeaderMap},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use uuid::Uuid;
use vitaltalk_core::{ConversationState, Scenario, ScenarioSummary};
use vitaltalk_reasoning::{CoachingHint, Orchestrator, ScoreReport, TurnOutcome};
use vitaltalk_voice::{voice_for_label, AudioFormat, SpeechToText, TextToSpeech};

/// Shared state for the gateway handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// `None` when no speech backend is configured.
    pub stt: Option<Arc<dyn SpeechToText>>,
    pub tts: Option<Arc<dyn TextToSpeech>>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            stt: None,
            tts: None,
        }
    }

    pub fn with_voice(
        mut self,
        stt: Option<Arc<dyn SpeechToText>>,
        tts: Option<Arc<dyn TextToSpeech>>,
    ) -> Self {
        self.stt = stt;
        self.tts = tts;
        self
    }
}

/// The gateway HTTP + WebSocket server.
///
/// - `/scenarios` catalog reads
/// - `/conversations/...` lifecycle, turns and coaching
/// - `/conversations/:id/ws` per-conversation message channel
/// - `/audio/...` transcription and synthesis
pub struct GatewayServer {
    state: AppState,
    host: String,
    port: u16,
}

impl GatewayServer {
    pub fn new(state: AppState, host: &str, port: u16) -> Self {
        Self {
            state,
            host: host.to_string(),
            port,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Bind and serve until the process is stopped.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| anyhow::anyhow!("Gateway failed to bind {}: {}", addr, e))?;
        tracing::info!("Gateway listening on {}", addr);
        axum::serve(listener, router(self.state)).await?;
        Ok(())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/scenarios", get(list_scenarios))
        .route("/scenarios/:id", get(get_scenario))
        .route("/conversations/start", post(start_conversation))
        .route("/conversations/:id", get(get_conversation))
        .route("/conversations/:id/message", post(send_message))
        .route("/conversations/:id/pause", post(pause_conversation))
        .route("/conversations/:id/resume", post(resume_conversation))
        .route("/conversations/:id/complete", post(complete_conversation))
        .route("/conversations/:id/redo", post(redo_last_turn))
        .route("/conversations/:id/hint", get(coaching_hint))
        .route("/conversations/:id/feedback", get(final_feedback))
        .route("/conversations/:id/ws", get(ws_upgrade))
        .route("/audio/text-to-speech", post(text_to_speech))
        .route("/audio/speech-to-text", post(speech_to_text))
        .route("/audio/health", get(audio_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Route handlers
// ============================================================================

async fn health() -> &'static str {
    "ok"
}

async fn list_scenarios(State(state): State<AppState>) -> Json<Vec<ScenarioSummary>> {
    Json(state.orchestrator.scenarios().list())
}

async fn get_scenario(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<Scenario>, ApiError> {
    state
        .orchestrator
        .scenarios()
        .get(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Scenario not found: {}", id)))
}

async fn start_conversation(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> Result<Json<ConversationSummary>, ApiError> {
    let id = match req.conversation_id {
        Some(id) if !id.trim().is_empty() => id,
        _ => Uuid::new_v4().to_string(),
    };
    let conversation = state.orchestrator.start(&id, req.scenario_id).await?;
    Ok(Json(ConversationSummary::from(&conversation)))
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationState>, ApiError> {
    Ok(Json(state.orchestrator.get_state(&id).await?))
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<TurnOutcome>, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::BadRequest("Message content is empty".to_string()));
    }
    Ok(Json(state.orchestrator.process_message(&id, &req.content).await?))
}

async fn pause_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationSummary>, ApiError> {
    let conversation = state.orchestrator.pause(&id).await?;
    Ok(Json(ConversationSummary::from(&conversation)))
}

async fn resume_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationSummary>, ApiError> {
    let conversation = state.orchestrator.resume(&id).await?;
    Ok(Json(ConversationSummary::from(&conversation)))
}

async fn complete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationSummary>, ApiError> {
    let conversation = state.orchestrator.complete(&id).await?;
    Ok(Json(ConversationSummary::from(&conversation)))
}

async fn redo_last_turn(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationSummary>, ApiError> {
    let conversation = state.orchestrator.redo_last_turn(&id).await?;
    Ok(Json(ConversationSummary::from(&conversation)))
}

async fn coaching_hint(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CoachingHint>, ApiError> {
    Ok(Json(state.orchestrator.get_coaching_hint(&id).await?))
}

async fn final_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ScoreReport>, ApiError> {
    Ok(Json(state.orchestrator.get_final_feedback(&id).await?))
}

/// GET /conversations/:id/ws — unknown ids are refused before the upgrade.
async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.orchestrator.get_state(&id).await?;
    Ok(ws.on_upgrade(move |socket| channel::handle_socket(socket, state.orchestrator, id)))
}

// ============================================================================
// Audio
// ============================================================================

async fn text_to_speech(
    State(state): State<AppState>,
    Json(req): Json<TtsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tts = state
        .tts
        .ok_or_else(|| ApiError::Unavailable("Text-to-speech is not configured".to_string()))?;
    if req.text.trim().is_empty() {
        return Err(ApiError::BadRequest("Text is empty".to_string()));
    }

    let voice = voice_for_label(&req.emotion);
    let audio = tts
        .synthesize(&req.text, voice)
        .await
        .map_err(|e| ApiError::Upstream(format!("TTS generation failed: {:#}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, tts.content_type()),
            (header::CONTENT_DISPOSITION, "attachment; filename=response.mp3"),
        ],
        audio,
    ))
}

/// Raw request body is the recording; `Content-Type` names its container.
async fn speech_to_text(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TranscriptionResponse>, ApiError> {
    let stt = state
        .stt
        .ok_or_else(|| ApiError::Unavailable("Speech-to-text is not configured".to_string()))?;
    if body.is_empty() {
        return Err(ApiError::BadRequest("No audio received".to_string()));
    }

    let format = AudioFormat::from_content_type(
        headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
    );
    let text = stt
        .transcribe(&body, format)
        .await
        .map_err(|e| ApiError::Upstream(format!("Transcription failed: {:#}", e)))?;

    Ok(Json(TranscriptionResponse {
        text,
        success: true,
    }))
}

async fn audio_health(State(state): State<AppState>) -> Json<AudioHealth> {
    let whisper_available = state.stt.is_some();
    let tts_available = state.tts.is_some();
    Json(AudioHealth {
        status: if whisper_available && tts_available {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        whisper_available,
        tts_available,
    })
}
