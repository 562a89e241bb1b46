use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

use crate::error::{NewsError, Result};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Key-value capability backing the caches and the bookmark hashes.
///
/// Every operation is atomic for a single key. Expired scalar keys read as
/// absent; there is no background sweep.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite `key`. With `ttl_seconds` the entry expires at now + ttl,
    /// otherwise it never expires.
    async fn set(&self, key: &str, value: String, ttl_seconds: Option<u64>) -> Result<()>;

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>>;

    async fn hash_set(&self, key: &str, field: &str, value: String) -> Result<()> {
        let mut mapping = HashMap::with_capacity(1);
        mapping.insert(field.to_string(), value);
        self.hash_set_many(key, mapping).await
    }

    /// Upsert all fields at once, creating the hash if needed.
    async fn hash_set_many(&self, key: &str, mapping: HashMap<String, String>) -> Result<()>;

    /// Returns true iff the field existed.
    async fn hash_delete(&self, key: &str, field: &str) -> Result<bool>;

    /// Empty map when the hash does not exist.
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>>;
}

/// Expiry instant for a TTL starting at `now`. A TTL too large to represent
/// is treated as no expiry.
pub(crate) fn expiry_after(now: DateTime<Utc>, ttl_seconds: u64) -> Option<DateTime<Utc>> {
    let expires_at = i64::try_from(ttl_seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl));
    if expires_at.is_none() {
        warn!(ttl_seconds, "ttl out of range, entry will not expire");
    }
    expires_at
}

/// Read a JSON value. Undecodable entries are logged and treated as a miss
/// so the caller recomputes and overwrites them.
pub async fn get_json<T, S>(store: &S, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key, error = %e, "discarding undecodable cache entry");
            Ok(None)
        }
    }
}

pub async fn set_json<T, S>(store: &S, key: &str, value: &T, ttl_seconds: Option<u64>) -> Result<()>
where
    T: Serialize + Sync,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value)
        .map_err(|e| NewsError::store(format!("failed to encode value for {}: {}", key, e)))?;
    store.set(key, raw, ttl_seconds).await
}
