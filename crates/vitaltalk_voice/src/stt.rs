//! Speech-to-Text (STT) trait definition

use anyhow::Result;
use async_trait::async_trait;

/// Audio containers accepted for transcription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFormat {
    /// Browser MediaRecorder default
    #[default]
    Webm,
    Wav,
    Mp3,
    Ogg,
    M4a,
}

impl AudioFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Webm => "audio/webm",
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Ogg => "audio/ogg",
            Self::M4a => "audio/mp4",
        }
    }

    /// File name sent with the upload; the transcription API infers the
    /// container from its extension.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Webm => "audio.webm",
            Self::Wav => "audio.wav",
            Self::Mp3 => "audio.mp3",
            Self::Ogg => "audio.ogg",
            Self::M4a => "audio.m4a",
        }
    }

    /// Resolve a request `Content-Type`. Parameters such as `;codecs=opus`
    /// are ignored and anything unrecognised is treated as webm.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let essence = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();
        match essence.as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" => Self::Wav,
            "audio/mpeg" | "audio/mp3" => Self::Mp3,
            "audio/ogg" | "application/ogg" => Self::Ogg,
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" => Self::M4a,
            _ => Self::Webm,
        }
    }
}

/// Speech-to-Text trait for transcribing the doctor's recorded speech
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe audio data to text
    ///
    /// # Arguments
    /// * `audio` - Raw audio bytes
    /// * `format` - Container of the input
    ///
    /// # Returns
    /// Transcribed text, trimmed
    async fn transcribe(&self, audio: &[u8], format: AudioFormat) -> Result<String>;

    /// Get the name of this STT provider
    fn provider_name(&self) -> &'static str;
}
