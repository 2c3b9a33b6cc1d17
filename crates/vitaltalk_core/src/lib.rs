//! Core domain for the VitalTalk end-of-life conversation simulator.
//!
//! Everything here is pure data and deterministic policy: the grief-model
//! emotional states and their transition table, the conversation record,
//! the scenario catalog, the input side of the Safety Gate and the
//! configuration shared by the other crates.

pub mod config;
pub mod emotion;
pub mod error;
pub mod safety;
pub mod scenario;
pub mod state;
pub mod style;
pub mod transitions;

pub use config::VitalConfig;
pub use emotion::{EmotionalState, Intensity};
pub use error::{ConversationError, Result};
pub use safety::{fallback_reply, InputVerdict, SafetyGate};
pub use scenario::{Difficulty, Scenario, ScenarioCatalog, ScenarioProvider, ScenarioSummary};
pub use state::{recent_turns, ConversationState, ConversationStatus, Turn, TurnRole};
pub use style::{classify_style, ResponseStyle};
pub use transitions::{allowed_next, clamp_transition};

/// Opening line delivered on every new message channel, before any client
/// message is processed. Never written to history.
pub const GREETING: &str =
    "Doctor... thank you for taking the time to speak with me. I know you're busy.";
