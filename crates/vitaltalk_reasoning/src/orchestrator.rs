//! Per-conversation state machine and turn pipeline.
//!
//! Every mutating operation holds the conversation's own async lock for its
//! whole duration, so turns on one id are strictly sequential while
//! different ids run independently.

use crate::coach::{CoachEvaluator, CoachingHint, ScoreReport};
use crate::evaluator::TransitionEvaluator;
use crate::generator::ResponseGenerator;
use crate::judge::SafetyJudge;
use crate::llm::LlmClient;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::Instrument;
use vitaltalk_core::{
    ConversationError, ConversationState, ConversationStatus, EmotionalState, InputVerdict,
    Intensity, ResponseStyle, Result, SafetyGate, ScenarioProvider, Turn, TurnRole, VitalConfig,
};
use vitaltalk_memory::ConversationStore;

/// Prune idle lock entries once the table grows past this.
const LOCK_TABLE_SOFT_LIMIT: usize = 1024;

// ============================================================================
// Results
// ============================================================================

/// A committed turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnResult {
    pub conversation_id: String,
    /// The reply as persisted: the generated text, or its fallback.
    pub response: String,
    pub previous_state: EmotionalState,
    pub emotional_state: EmotionalState,
    pub emotional_intensity: Intensity,
    pub style: ResponseStyle,
    pub turn_count: u32,
    /// False when the generated reply was replaced by a fallback.
    pub response_safe: bool,
    pub safety_issues: Vec<String>,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnOutcome {
    Reply(TurnResult),
    /// The input screen rejected the message. Nothing was written.
    Rejected { message: String },
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct Orchestrator {
    store: ConversationStore,
    scenarios: Arc<dyn ScenarioProvider>,
    gate: SafetyGate,
    evaluator: TransitionEvaluator,
    generator: ResponseGenerator,
    judge: SafetyJudge,
    coach: CoachEvaluator,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Orchestrator {
    /// All stages share `llm`, except scoring and hints which use `coach_llm`.
    pub fn new(
        config: &VitalConfig,
        llm: Arc<dyn LlmClient>,
        coach_llm: Arc<dyn LlmClient>,
        store: ConversationStore,
        scenarios: Arc<dyn ScenarioProvider>,
    ) -> Self {
        Self {
            store,
            scenarios,
            gate: SafetyGate::new(&config.safety),
            evaluator: TransitionEvaluator::new(llm.clone(), config),
            generator: ResponseGenerator::new(llm.clone(), config),
            judge: SafetyJudge::new(llm, config),
            coach: CoachEvaluator::new(coach_llm, config),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn scenarios(&self) -> &dyn ScenarioProvider {
        self.scenarios.as_ref()
    }

    async fn lock(&self, conversation_id: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut locks = self.locks.lock().await;
            if locks.len() > LOCK_TABLE_SOFT_LIMIT {
                locks.retain(|_, l| Arc::strong_count(l) > 1);
            }
            locks
                .entry(conversation_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }

    async fn load_existing(&self, conversation_id: &str) -> Result<ConversationState> {
        self.store
            .load(conversation_id)
            .await?
            .ok_or_else(|| ConversationError::NotFound(conversation_id.to_string()))
    }

    fn ensure_open(state: &ConversationState) -> Result<()> {
        if state.status.is_open() {
            Ok(())
        } else {
            Err(ConversationError::Closed {
                id: state.conversation_id.clone(),
                status: state.status,
            })
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a conversation from a scenario. Unknown scenario ids resolve to
    /// the default scenario; an id already in use is rejected.
    pub async fn start(&self, conversation_id: &str, scenario_id: u32) -> Result<ConversationState> {
        let _guard = self.lock(conversation_id).await;
        if self.store.load(conversation_id).await?.is_some() {
            return Err(ConversationError::AlreadyExists(conversation_id.to_string()));
        }

        let scenario = self.scenarios.get_or_default(scenario_id);
        let state = ConversationState::new(conversation_id, scenario);
        self.store.save(&state).await?;
        tracing::info!(
            "Started conversation {} (scenario {}, state {})",
            conversation_id,
            state.scenario.id,
            state.emotional_state
        );
        Ok(state)
    }

    /// Read-only snapshot.
    pub async fn get_state(&self, conversation_id: &str) -> Result<ConversationState> {
        self.load_existing(conversation_id).await
    }

    /// Mark paused. Pausing a paused conversation is a no-op success.
    pub async fn pause(&self, conversation_id: &str) -> Result<ConversationState> {
        self.set_status(conversation_id, ConversationStatus::Paused).await
    }

    pub async fn resume(&self, conversation_id: &str) -> Result<ConversationState> {
        self.set_status(conversation_id, ConversationStatus::InProgress).await
    }

    /// Move to the terminal `completed` status. Idempotent.
    pub async fn complete(&self, conversation_id: &str) -> Result<ConversationState> {
        let _guard = self.lock(conversation_id).await;
        let mut state = self.load_existing(conversation_id).await?;
        match state.status {
            ConversationStatus::Completed => return Ok(state),
            ConversationStatus::Abandoned => Self::ensure_open(&state)?,
            _ => {}
        }
        state.status = ConversationStatus::Completed;
        state.touch();
        self.store.save(&state).await?;
        tracing::info!("Completed conversation {} after {} turns", conversation_id, state.turn_count);
        Ok(state)
    }

    async fn set_status(&self, conversation_id: &str, status: ConversationStatus) -> Result<ConversationState> {
        let _guard = self.lock(conversation_id).await;
        let mut state = self.load_existing(conversation_id).await?;
        Self::ensure_open(&state)?;
        if state.status == status {
            return Ok(state);
        }
        state.status = status;
        state.touch();
        self.store.save(&state).await?;
        tracing::info!("Conversation {} is now {}", conversation_id, status);
        Ok(state)
    }

    // ========================================================================
    // Turn pipeline
    // ========================================================================

    /// Run one doctor -> family exchange.
    ///
    /// Either the whole turn commits (both history entries, new state,
    /// incremented count) or nothing but the checkpoint is written.
    pub async fn process_message(&self, conversation_id: &str, user_message: &str) -> Result<TurnOutcome> {
        let span = tracing::info_span!("turn", conversation_id = %conversation_id);
        self.process_message_inner(conversation_id, user_message)
            .instrument(span)
            .await
    }

    async fn process_message_inner(&self, conversation_id: &str, user_message: &str) -> Result<TurnOutcome> {
        let _guard = self.lock(conversation_id).await;
        let state = self.load_existing(conversation_id).await?;
        Self::ensure_open(&state)?;

        // 1. Input screen: reject before anything is written.
        if let InputVerdict::Unsafe {
            rejection_message,
            matched,
        } = self.gate.check_user_input(user_message)
        {
            tracing::info!("User input rejected by denylist ({})", matched);
            return Ok(TurnOutcome::Rejected {
                message: rejection_message,
            });
        }

        // 2. Checkpoint the pre-turn state.
        self.store.save_checkpoint(&state).await?;

        // 3. Transition.
        let transition = self
            .evaluator
            .evaluate(
                state.emotional_state,
                state.emotional_intensity,
                user_message,
                &state.history,
            )
            .await;
        tracing::debug!(
            "Transition {} -> {} (style {}, intensity {})",
            transition.previous,
            transition.new_state,
            transition.style,
            transition.intensity
        );

        // 4. Generate in the new state. Failure leaves the stored state as is.
        let candidate = self
            .generator
            .generate(user_message, transition.new_state, &state.scenario, &state.history)
            .await
            .map_err(|e| {
                tracing::error!("Response generation failed: {:#}", e);
                ConversationError::Generation(format!("{:#}", e))
            })?;

        // 5. Output review, the last rewrite before persisting.
        let check = self
            .judge
            .check_generated_response(&candidate, transition.new_state, &state.scenario)
            .await;

        // 6. Commit.
        let mut next = state;
        next.history.push(Turn::new(TurnRole::User, user_message, transition.previous));
        next.history.push(Turn::new(TurnRole::Agent, check.output_text.clone(), transition.new_state));
        next.emotional_state = transition.new_state;
        next.emotional_intensity = transition.intensity;
        next.turn_count += 1;
        next.status = ConversationStatus::InProgress;
        next.touch();
        self.store.save(&next).await?;

        tracing::info!(
            "Turn {} committed: {} -> {}",
            next.turn_count,
            transition.previous,
            transition.new_state
        );

        Ok(TurnOutcome::Reply(TurnResult {
            conversation_id: next.conversation_id,
            response: check.output_text,
            previous_state: transition.previous,
            emotional_state: transition.new_state,
            emotional_intensity: transition.intensity,
            style: transition.style,
            turn_count: next.turn_count,
            response_safe: check.safe,
            safety_issues: check.issues,
            reasoning: transition.reasoning,
        }))
    }

    /// Restore the state saved before the last turn and drop the checkpoint.
    /// Only one level is kept, so a second redo reports `NoCheckpoint`.
    ///
    /// The checkpoint is removed only after the restored state is written; a
    /// failed write leaves both keys as they were.
    pub async fn redo_last_turn(&self, conversation_id: &str) -> Result<ConversationState> {
        let _guard = self.lock(conversation_id).await;
        let current = self.load_existing(conversation_id).await?;
        Self::ensure_open(&current)?;

        let restored = self
            .store
            .load_checkpoint(conversation_id)
            .await?
            .ok_or_else(|| ConversationError::NoCheckpoint(conversation_id.to_string()))?;
        self.store.save(&restored).await?;
        // A leftover checkpoint equals the restored state, so a repeated redo is a no-op.
        if let Err(e) = self.store.discard_checkpoint(conversation_id).await {
            tracing::warn!("Redo on {} restored state but kept checkpoint: {}", conversation_id, e);
        }

        tracing::info!(
            "Redo on {}: turn {} -> {}, state {}",
            conversation_id,
            current.turn_count,
            restored.turn_count,
            restored.emotional_state
        );
        Ok(restored)
    }

    // ========================================================================
    // Coaching (read-only)
    // ========================================================================

    pub async fn get_coaching_hint(&self, conversation_id: &str) -> Result<CoachingHint> {
        let state = self.load_existing(conversation_id).await?;
        Ok(self
            .coach
            .evaluate_single(state.last_turn(), state.emotional_state, &state.scenario)
            .await)
    }

    /// Score the whole transcript. Callable at any point in the lifecycle.
    pub async fn get_final_feedback(&self, conversation_id: &str) -> Result<ScoreReport> {
        let state = self.load_existing(conversation_id).await?;
        Ok(self.coach.evaluate(&state.history, &state.scenario).await)
    }
}
