//! Model-backed pipeline stages and the orchestrator that sequences them.

pub mod api_types;
pub mod coach;
pub mod evaluator;
pub mod generator;
pub mod judge;
pub mod llm;
pub mod orchestrator;
pub mod parse;
pub mod prompts;
pub mod providers;
pub mod retry;

pub use coach::{CoachEvaluator, CoachingHint, HintQuality, ScoreReport, SuggestedResponse};
pub use evaluator::{Transition, TransitionEvaluator};
pub use generator::ResponseGenerator;
pub use judge::{OutputCheck, SafetyJudge};
pub use llm::{CompletionParams, LlmClient};
pub use orchestrator::{Orchestrator, TurnOutcome, TurnResult};
pub use parse::ParseError;
pub use prompts::Stage;
