//! Conversation records on top of a [`KeyValueStore`].
//!
//! Each conversation owns two keys: its current state and at most one
//! checkpoint. Both are whole-record JSON snapshots; the checkpoint lives on a
//! shorter TTL than the state.

use crate::kv::{KeyValueStore, MemoryStore};
use crate::sqlite::SqliteStore;
use std::sync::Arc;
use std::time::Duration;
use vitaltalk_core::config::{StoreBackend, StoreConfig};
use vitaltalk_core::{ConversationError, ConversationState, Result};

pub fn state_key(conversation_id: &str) -> String {
    format!("conversation:{}:state", conversation_id)
}

pub fn checkpoint_key(conversation_id: &str) -> String {
    format!("conversation:{}:checkpoint", conversation_id)
}

fn store_err(e: anyhow::Error) -> ConversationError {
    ConversationError::Store(format!("{:#}", e))
}

#[derive(Clone)]
pub struct ConversationStore {
    backend: Arc<dyn KeyValueStore>,
    state_ttl: Duration,
    checkpoint_ttl: Duration,
}

impl ConversationStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, state_ttl: Duration, checkpoint_ttl: Duration) -> Self {
        Self {
            backend,
            state_ttl,
            checkpoint_ttl,
        }
    }

    /// In-memory store with the default 24h / 1h lifetimes.
    pub fn in_memory() -> Self {
        let cfg = StoreConfig::default();
        Self::new(Arc::new(MemoryStore::new()), cfg.state_ttl(), cfg.checkpoint_ttl())
    }

    /// Build the backend named in config.
    pub async fn from_config(config: &StoreConfig) -> anyhow::Result<Self> {
        let backend: Arc<dyn KeyValueStore> = match config.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Sqlite => {
                tracing::info!("Opening SQLite state store at {}", config.sqlite_path.display());
                Arc::new(SqliteStore::new(&config.sqlite_path).await?)
            }
        };
        Ok(Self::new(backend, config.state_ttl(), config.checkpoint_ttl()))
    }

    pub async fn load(&self, conversation_id: &str) -> Result<Option<ConversationState>> {
        self.read(&state_key(conversation_id)).await
    }

    /// Write the state and renew its lifetime.
    pub async fn save(&self, state: &ConversationState) -> Result<()> {
        self.write(&state_key(&state.conversation_id), state, self.state_ttl)
            .await
    }

    /// Overwrite the checkpoint slot with `state`.
    pub async fn save_checkpoint(&self, state: &ConversationState) -> Result<()> {
        self.write(&checkpoint_key(&state.conversation_id), state, self.checkpoint_ttl)
            .await
    }

    pub async fn load_checkpoint(&self, conversation_id: &str) -> Result<Option<ConversationState>> {
        self.read(&checkpoint_key(conversation_id)).await
    }

    /// Empty the checkpoint slot. Returns whether a live checkpoint was there.
    pub async fn discard_checkpoint(&self, conversation_id: &str) -> Result<bool> {
        self.backend
            .delete(&checkpoint_key(conversation_id))
            .await
            .map_err(store_err)
    }

    async fn read(&self, key: &str) -> Result<Option<ConversationState>> {
        let Some(raw) = self.backend.get(key).await.map_err(store_err)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| ConversationError::Store(format!("Corrupt record at {}: {}", key, e)))
    }

    async fn write(&self, key: &str, state: &ConversationState, ttl: Duration) -> Result<()> {
        let raw = serde_json::to_string(state)
            .map_err(|e| ConversationError::Store(format!("Failed to encode {}: {}", key, e)))?;
        self.backend
            .set_with_ttl(key, &raw, ttl)
            .await
            .map_err(store_err)
    }
}
