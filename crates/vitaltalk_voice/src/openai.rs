//! OpenAI audio backend: `/audio/transcriptions` for STT and
//! `/audio/speech` for TTS.

use crate::stt::{AudioFormat, SpeechToText};
use crate::tts::TextToSpeech;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::env;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiVoice {
    client: Client,
    api_key: String,
    base_url: String,
    stt_model: String,
    tts_model: String,
    language: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

impl OpenAiVoice {
    /// Key from `OPENAI_API_KEY`, base URL from `OPENAI_BASE_URL` or the
    /// public endpoint.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
        let base_url = env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::with_credentials(&base_url, &api_key)
    }

    pub fn with_credentials(base_url: &str, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(60)).build()?,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            stt_model: "whisper-1".to_string(),
            tts_model: "tts-1".to_string(),
            language: Some("en".to_string()),
        })
    }

    pub fn with_models(mut self, stt_model: &str, tts_model: &str) -> Self {
        self.stt_model = stt_model.to_string();
        self.tts_model = tts_model.to_string();
        self
    }

    /// Transcription language hint; `None` lets the API detect it.
    pub fn with_language(mut self, language: Option<&str>) -> Self {
        self.language = language.map(str::to_string);
        self
    }
}

async fn ensure_success(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    anyhow::bail!("{} API error {}: {}", what, status, body)
}

#[async_trait]
impl SpeechToText for OpenAiVoice {
    async fn transcribe(&self, audio: &[u8], format: AudioFormat) -> Result<String> {
        if audio.is_empty() {
            anyhow::bail!("No audio received");
        }
        let part = Part::bytes(audio.to_vec())
            .file_name(format.file_name())
            .mime_str(format.mime_type())?;
        let mut form = Form::new()
            .part("file", part)
            .text("model", self.stt_model.clone());
        if let Some(lang) = &self.language {
            form = form.text("language", lang.clone());
        }

        let url = format!("{}/audio/transcriptions", self.base_url);
        tracing::debug!("Transcribing {} bytes of {}", audio.len(), format.mime_type());
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .context("Transcription request failed")?;
        let resp = ensure_success(resp, "Transcription").await?;
        let parsed: TranscriptionResponse = resp
            .json()
            .await
            .context("Failed to parse transcription response")?;
        Ok(parsed.text.trim().to_string())
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

#[async_trait]
impl TextToSpeech for OpenAiVoice {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        let text = text.trim();
        if text.is_empty() {
            anyhow::bail!("Nothing to synthesize");
        }
        let body = serde_json::json!({
            "model": self.tts_model,
            "input": text,
            "voice": voice,
            "response_format": "mp3",
            "speed": 1.0,
        });

        let url = format!("{}/audio/speech", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Speech request failed")?;
        let resp = ensure_success(resp, "Speech").await?;
        let bytes = resp.bytes().await.context("Failed to read speech audio")?;
        tracing::debug!("Synthesized {} bytes with voice {}", bytes.len(), voice);
        Ok(bytes.to_vec())
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
