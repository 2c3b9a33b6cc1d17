//! Text-to-Speech (TTS) trait definition

use anyhow::Result;
use async_trait::async_trait;
use vitaltalk_core::EmotionalState;

/// Text-to-Speech trait for voicing the family member's replies
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Synthesize text to audio
    ///
    /// # Arguments
    /// * `text` - Text to synthesize
    /// * `voice` - Provider voice identifier, usually from [`crate::voice_for_state`]
    ///
    /// # Returns
    /// Raw audio bytes in [`TextToSpeech::content_type`]
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>>;

    /// Synthesize with the voice the table assigns to `state`.
    async fn synthesize_for_state(&self, text: &str, state: EmotionalState) -> Result<Vec<u8>> {
        self.synthesize(text, crate::voice_for_state(state)).await
    }

    /// MIME type of the returned audio
    fn content_type(&self) -> &'static str {
        "audio/mpeg"
    }

    /// Get the name of this TTS provider
    fn provider_name(&self) -> &'static str;
}
