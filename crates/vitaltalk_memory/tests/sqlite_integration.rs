//! Integration tests for the SQLite-backed conversation store.
//!
//! Uses tempfile::TempDir for isolated database files.

use std::sync::Arc;
use std::time::Duration;
use vitaltalk_core::config::{StoreBackend, StoreConfig};
use vitaltalk_core::{ConversationState, EmotionalState, ScenarioCatalog, ScenarioProvider, Turn, TurnRole};
use vitaltalk_memory::{ConversationStore, KeyValueStore, SqliteStore};

fn sample_state(id: &str) -> ConversationState {
    let mut state = ConversationState::new(id, ScenarioCatalog::builtin().get_or_default(2));
    state
        .history
        .push(Turn::new(TurnRole::User, "I have some difficult news.", EmotionalState::Anger));
    state
        .history
        .push(Turn::new(TurnRole::Agent, "What do you mean?", EmotionalState::Sadness));
    state.emotional_state = EmotionalState::Sadness;
    state.turn_count = 1;
    state
}

/// State written by one store instance is visible after reopening the file.
#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = StoreConfig {
        backend: StoreBackend::Sqlite,
        sqlite_path: dir.path().join("state.db"),
        ..StoreConfig::default()
    };

    let state = sample_state("persisted");
    {
        let store = ConversationStore::from_config(&config).await.unwrap();
        store.save(&state).await.unwrap();
        store.save_checkpoint(&state).await.unwrap();
    }

    let reopened = ConversationStore::from_config(&config).await.unwrap();
    assert_eq!(reopened.load("persisted").await.unwrap(), Some(state.clone()));
    assert_eq!(reopened.load_checkpoint("persisted").await.unwrap(), Some(state));
    assert!(reopened.discard_checkpoint("persisted").await.unwrap());
    assert!(reopened.load_checkpoint("persisted").await.unwrap().is_none());
}

/// Expired entries are purged when the database is opened again.
#[tokio::test]
async fn test_expired_entries_purged_on_open() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("kv.db");

    {
        let kv = SqliteStore::new(&path).await.unwrap();
        kv.set_with_ttl("gone", "x", Duration::ZERO).await.unwrap();
        kv.set_with_ttl("kept", "y", Duration::from_secs(3600)).await.unwrap();
    }

    let kv = SqliteStore::new(&path).await.unwrap();
    assert_eq!(kv.purge_expired().await.unwrap(), 0);
    assert_eq!(kv.get("kept").await.unwrap().as_deref(), Some("y"));
    assert_eq!(kv.get("gone").await.unwrap(), None);
}

/// Concurrent writers to distinct conversations do not interfere.
#[tokio::test]
async fn test_concurrent_distinct_conversations() {
    let dir = tempfile::TempDir::new().unwrap();
    let kv = Arc::new(SqliteStore::new(dir.path().join("c.db")).await.unwrap());
    let store = ConversationStore::new(kv, Duration::from_secs(600), Duration::from_secs(60));

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let state = sample_state(&format!("c{}", i));
            store.save(&state).await.unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    for i in 0..8 {
        assert!(store.load(&format!("c{}", i)).await.unwrap().is_some());
    }
}
