//! Speech boundary for VitalTalk.
//!
//! Provides Speech-to-Text (STT) and Text-to-Speech (TTS) abstractions, an
//! OpenAI-backed implementation of both, and the fixed table that picks a
//! synthesis voice from the family member's emotional state.

mod openai;
mod stt;
mod tts;
mod voices;

pub use openai::OpenAiVoice;
pub use stt::{AudioFormat, SpeechToText};
pub use tts::TextToSpeech;
pub use voices::{voice_for_label, voice_for_state, DEFAULT_VOICE};
