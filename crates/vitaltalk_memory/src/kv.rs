//! Keyed string store with per-key expiry.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// The narrow surface the conversation store needs from a backend.
///
/// `expire` on a missing key is a no-op returning `false`. A `set` clears any
/// expiry previously attached to the key. Backends should override
/// `set_with_ttl` so the value and its deadline land in one write.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    async fn delete(&self, key: &str) -> Result<bool>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.set(key, value).await?;
        self.expire(key, ttl).await?;
        Ok(())
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |t| now < t)
    }
}

/// Minimum spacing between full sweeps of expired entries.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Entries {
    map: HashMap<String, Entry>,
    last_sweep: Instant,
}

impl Entries {
    /// Drop every expired entry if the last sweep is old enough.
    fn maybe_sweep(&mut self, now: Instant) {
        if now.duration_since(self.last_sweep) < SWEEP_INTERVAL {
            return;
        }
        let before = self.map.len();
        self.map.retain(|_, e| e.is_live(now));
        self.last_sweep = now;
        let swept = before - self.map.len();
        if swept > 0 {
            tracing::debug!("Swept {} expired entries", swept);
        }
    }

    fn insert(&mut self, key: &str, value: &str, expires_at: Option<Instant>, now: Instant) {
        self.maybe_sweep(now);
        self.map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
    }
}

/// Process-local backend. Expired entries are dropped on access, and writes
/// sweep the whole map at most once per [`SWEEP_INTERVAL`].
pub struct MemoryStore {
    entries: RwLock<Entries>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Entries {
                map: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().await.map.values().filter(|e| e.is_live(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.map.get(key) {
                None => return Ok(None),
                Some(e) if e.is_live(now) => return Ok(Some(e.value.clone())),
                Some(_) => {}
            }
        }
        // Expired: evict under the write lock, rechecking in case it was rewritten.
        let mut entries = self.entries.write().await;
        if entries.map.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.map.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = Instant::now();
        self.entries.write().await.insert(key, value, None, now);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.maybe_sweep(now);
        match entries.map.get_mut(key) {
            Some(e) if e.is_live(now) => {
                e.expires_at = Some(now + ttl);
                Ok(true)
            }
            Some(_) => {
                entries.map.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .write()
            .await
            .map
            .remove(key)
            .is_some_and(|e| e.is_live(now)))
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        self.entries
            .write()
            .await
            .insert(key, value, Some(now + ttl), now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "v1").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v1"));

        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));

        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_expire_missing_key_is_noop() {
        let store = MemoryStore::new();
        assert!(!store.expire("nope", Duration::from_secs(5)).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let store = MemoryStore::new();
        store
            .set_with_ttl("short", "a", Duration::from_secs(60))
            .await
            .unwrap();
        store
            .set_with_ttl("long", "b", Duration::from_secs(600))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(store.get("short").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.get("short").await.unwrap(), None);
        assert_eq!(store.get("long").await.unwrap().as_deref(), Some("b"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_clears_previous_expiry() {
        let store = MemoryStore::new();
        store
            .set_with_ttl("k", "a", Duration::from_secs(10))
            .await
            .unwrap();
        store.set("k", "b").await.unwrap();

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_sweep_expired_entries() {
        let store = MemoryStore::new();
        for i in 0..1000 {
            store
                .set_with_ttl(&format!("k{}", i), "v", Duration::from_secs(10))
                .await
                .unwrap();
        }
        assert_eq!(store.entries.read().await.map.len(), 1000);

        tokio::time::advance(Duration::from_secs(3600)).await;
        store
            .set_with_ttl("fresh", "v", Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.entries.read().await.map.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_is_rate_limited() {
        let store = MemoryStore::new();
        tokio::time::advance(SWEEP_INTERVAL).await;
        store.set_with_ttl("a", "v", Duration::from_secs(1)).await.unwrap();

        // Expired, but the previous sweep ran less than an interval ago.
        tokio::time::advance(Duration::from_secs(2)).await;
        store.set("b", "v").await.unwrap();
        assert_eq!(store.entries.read().await.map.len(), 2);

        tokio::time::advance(SWEEP_INTERVAL).await;
        store.expire("b", Duration::from_secs(600)).await.unwrap();
        assert_eq!(store.entries.read().await.map.len(), 1);
    }
}
