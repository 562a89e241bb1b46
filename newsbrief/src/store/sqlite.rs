use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::{expiry_after, KeyValueStore};
use crate::clock::{Clock, SystemClock};
use crate::error::Result;

/// Durable store on SQLite. Any sqlx failure surfaces as `StoreUnavailable`.
pub struct SqliteStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteStore {
    /// Wrap an existing pool, creating the tables if needed.
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        Self::with_clock(pool, Arc::new(SystemClock)).await
    }

    pub async fn with_clock(pool: SqlitePool, clock: Arc<dyn Clock>) -> Result<Self> {
        ensure_schema(&pool).await?;
        Ok(Self { pool, clock })
    }

    fn now_millis(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }
}

/// Create the key-value tables if they do not exist.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS kv_scalar (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            expires_at INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS kv_hash (
            key TEXT NOT NULL,
            field TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (key, field)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[async_trait::async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query_as::<_, (String, Option<i64>)>(
            "SELECT value, expires_at FROM kv_scalar WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let Some((value, expires_at)) = row else {
            return Ok(None);
        };

        let now = self.now_millis();
        if expires_at.map_or(false, |at| at <= now) {
            debug!(key, "expired entry, removing");
            // Guard on expires_at so a concurrent fresh write is not deleted.
            sqlx::query("DELETE FROM kv_scalar WHERE key = ? AND expires_at <= ?")
                .bind(key)
                .bind(now)
                .execute(&self.pool)
                .await?;
            return Ok(None);
        }

        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: String, ttl_seconds: Option<u64>) -> Result<()> {
        let expires_at = ttl_seconds
            .and_then(|ttl| expiry_after(self.clock.now(), ttl))
            .map(|at| at.timestamp_millis());

        sqlx::query("INSERT OR REPLACE INTO kv_scalar (key, value, expires_at) VALUES (?, ?, ?)")
            .bind(key)
            .bind(value)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>(
            "SELECT value FROM kv_hash WHERE key = ? AND field = ?",
        )
        .bind(key)
        .bind(field)
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn hash_set_many(&self, key: &str, mapping: HashMap<String, String>) -> Result<()> {
        // One transaction so readers never observe a partial write.
        let mut tx = self.pool.begin().await?;
        for (field, value) in mapping {
            sqlx::query("INSERT OR REPLACE INTO kv_hash (key, field, value) VALUES (?, ?, ?)")
                .bind(key)
                .bind(field)
                .bind(value)
                .execute(&mut tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM kv_hash WHERE key = ? AND field = ?")
            .bind(key)
            .bind(field)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT field, value FROM kv_hash WHERE key = ?",
        )
        .bind(key)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }
}
