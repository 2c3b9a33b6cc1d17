use crate::kv::KeyValueStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Minimum spacing between purges triggered by writes.
pub const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Durable backend on a single SQLite table.
///
/// Expiry is stored as an absolute wall-clock deadline in milliseconds, so
/// entries survive restarts with their remaining lifetime intact. Expired rows
/// are purged on open and by `set_with_ttl` at most once per purge interval.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    purge_interval: Duration,
    last_purge_ms: Arc<AtomicI64>,
}

impl SqliteStore {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePoolOptions::new()
            .connect(&db_url)
            .await
            .context("Failed to connect to SQLite database")?;

        let store = Self {
            pool,
            purge_interval: PURGE_INTERVAL,
            last_purge_ms: Arc::new(AtomicI64::new(now_millis())),
        };
        store.migrate().await?;
        let purged = store.purge_expired().await?;
        if purged > 0 {
            tracing::info!("Purged {} expired entries on open", purged);
        }
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create kv_entries table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_kv_expires ON kv_entries(expires_at)")
            .execute(&self.pool)
            .await
            .context("Failed to create kv_entries expiry index")?;

        Ok(())
    }

    pub fn with_purge_interval(mut self, interval: Duration) -> Self {
        self.purge_interval = interval;
        self
    }

    /// Purge if the interval has elapsed and no other writer claimed it first.
    async fn maybe_purge(&self) -> Result<()> {
        let now = now_millis();
        let last = self.last_purge_ms.load(Ordering::Relaxed);
        if now.saturating_sub(last) < millis(self.purge_interval) {
            return Ok(());
        }
        if self
            .last_purge_ms
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return Ok(());
        }
        let purged = self.purge_expired().await?;
        if purged > 0 {
            tracing::debug!("Purged {} expired entries", purged);
        }
        Ok(())
    }

    /// Delete every entry whose deadline has passed. Returns the number removed.
    pub async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM kv_entries WHERE expires_at IS NOT NULL AND expires_at <= ?")
            .bind(now_millis())
            .execute(&self.pool)
            .await
            .context("Failed to purge expired entries")?;
        Ok(result.rows_affected())
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn millis(d: Duration) -> i64 {
    d.as_millis().min(i64::MAX as u128) as i64
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query(
            "SELECT value FROM kv_entries WHERE key = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(key)
        .bind(now_millis())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to read key {}", key))?;

        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value, expires_at, updated_at)
            VALUES (?, ?, NULL, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = NULL,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now_millis())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to write key {}", key))?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = now_millis();
        let deadline = now.saturating_add(millis(ttl));
        let result = sqlx::query(
            "UPDATE kv_entries SET expires_at = ? WHERE key = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(deadline)
        .bind(key)
        .bind(now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to set expiry on key {}", key))?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let now = now_millis();
        sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value, expires_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now.saturating_add(millis(ttl)))
        .bind(now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to write key {}", key))?;

        self.maybe_purge().await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM kv_entries WHERE key = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(key)
        .bind(now_millis())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to delete key {}", key))?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_overwrite() {
        let store = SqliteStore::new(":memory:").await.expect("Failed to open store");
        assert_eq!(store.get("a").await.unwrap(), None);

        store.set("a", "one").await.unwrap();
        store.set("a", "two").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_zero_ttl_expires_immediately() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        store.set("a", "v").await.unwrap();
        assert!(store.expire("a", Duration::ZERO).await.unwrap());

        assert_eq!(store.get("a").await.unwrap(), None);
        assert!(!store.delete("a").await.unwrap());
        assert_eq!(store.purge_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_expire_missing_key() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        assert!(!store.expire("missing", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_clears_expiry() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        store.set_with_ttl("a", "v", Duration::ZERO).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);

        store.set("a", "fresh").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("fresh"));
    }

    async fn row_count(store: &SqliteStore) -> i64 {
        sqlx::query("SELECT COUNT(*) AS n FROM kv_entries")
            .fetch_one(&store.pool)
            .await
            .unwrap()
            .get::<i64, _>("n")
    }

    #[tokio::test]
    async fn test_set_with_ttl_writes_deadline_in_one_row() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        store
            .set_with_ttl("a", "v", Duration::from_secs(60))
            .await
            .unwrap();

        let row = sqlx::query("SELECT expires_at, updated_at FROM kv_entries WHERE key = 'a'")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        let expires_at: Option<i64> = row.get("expires_at");
        let updated_at: i64 = row.get("updated_at");
        assert_eq!(expires_at, Some(updated_at + 60_000));
    }

    #[tokio::test]
    async fn test_writes_purge_expired_rows() {
        let store = SqliteStore::new(":memory:")
            .await
            .unwrap()
            .with_purge_interval(Duration::ZERO);
        for i in 0..50 {
            store
                .set_with_ttl(&format!("old{}", i), "v", Duration::ZERO)
                .await
                .unwrap();
        }
        store
            .set_with_ttl("fresh", "v", Duration::from_secs(3600))
            .await
            .unwrap();

        assert_eq!(row_count(&store).await, 1);
        assert_eq!(store.get("fresh").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_purge_waits_for_interval() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        store.set_with_ttl("old", "v", Duration::ZERO).await.unwrap();
        store.set_with_ttl("new", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(row_count(&store).await, 2);
    }
}
