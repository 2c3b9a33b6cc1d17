//! State Store: keyed persistence with expiry for conversation records.

pub mod conversation_store;
pub mod kv;
pub mod sqlite;

pub use conversation_store::{checkpoint_key, state_key, ConversationStore};
pub use kv::{KeyValueStore, MemoryStore};
pub use sqlite::SqliteStore;
