use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{expiry_after, KeyValueStore};
use crate::clock::{Clock, SystemClock};
use crate::error::Result;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |at| at <= now)
    }
}

#[derive(Debug, Default)]
struct Inner {
    scalars: HashMap<String, CacheEntry>,
    hashes: HashMap<String, HashMap<String, String>>,
}

/// In-process store. Scalars and hashes live in separate key spaces.
///
/// The mutex is only held inside synchronous sections, never across an await.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave a half-written entry,
        // every mutation is a single insert/remove.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = self.clock.now();
        let mut inner = self.lock();
        if inner.scalars.get(key).map_or(false, |entry| entry.is_expired(now)) {
            inner.scalars.remove(key);
            return Ok(None);
        }
        Ok(inner.scalars.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl_seconds: Option<u64>) -> Result<()> {
        let expires_at = ttl_seconds.and_then(|ttl| expiry_after(self.clock.now(), ttl));
        self.lock()
            .scalars
            .insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        Ok(self
            .lock()
            .hashes
            .get(key)
            .and_then(|hash| hash.get(field))
            .cloned())
    }

    async fn hash_set_many(&self, key: &str, mapping: HashMap<String, String>) -> Result<()> {
        self.lock()
            .hashes
            .entry(key.to_string())
            .or_default()
            .extend(mapping);
        Ok(())
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<bool> {
        let mut inner = self.lock();
        let Some(hash) = inner.hashes.get_mut(key) else {
            return Ok(false);
        };
        let existed = hash.remove(field).is_some();
        if hash.is_empty() {
            inner.hashes.remove(key);
        }
        Ok(existed)
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        Ok(self.lock().hashes.get(key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{get_json, set_json};

    fn store_with_clock() -> (MemoryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (MemoryStore::with_clock(clock.clone()), clock)
    }

    #[tokio::test]
    async fn get_missing_key_is_absent() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_without_ttl_never_expires() {
        let (store, clock) = store_with_clock();
        store.set("k", "v".into(), None).await.unwrap();
        clock.advance_secs(10 * 365 * 86_400);
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn ttl_expiry_is_lazy_on_read() {
        let (store, clock) = store_with_clock();
        store.set("k", "v".into(), Some(900)).await.unwrap();

        clock.advance_secs(899);
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        clock.advance_secs(1);
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_overwrites_and_resets_ttl() {
        let (store, clock) = store_with_clock();
        store.set("k", "old".into(), Some(10)).await.unwrap();
        clock.advance_secs(5);
        store.set("k", "new".into(), Some(10)).await.unwrap();
        clock.advance_secs(7);
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn oversized_ttl_never_expires() {
        let (store, clock) = store_with_clock();
        store.set("huge", "v".into(), Some(1_000_000_000_000_000)).await.unwrap();
        store.set("max", "v".into(), Some(u64::MAX)).await.unwrap();
        clock.advance_secs(10 * 365 * 86_400);
        assert_eq!(store.get("huge").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.get("max").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn hash_operations() {
        let store = MemoryStore::new();
        assert!(store.hash_get_all("h").await.unwrap().is_empty());

        store.hash_set("h", "a", "1".into()).await.unwrap();
        let mut many = HashMap::new();
        many.insert("b".to_string(), "2".to_string());
        many.insert("a".to_string(), "3".to_string());
        store.hash_set_many("h", many).await.unwrap();

        assert_eq!(store.hash_get("h", "a").await.unwrap().as_deref(), Some("3"));
        assert_eq!(store.hash_get("h", "b").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.hash_get_all("h").await.unwrap().len(), 2);

        assert!(store.hash_delete("h", "a").await.unwrap());
        assert!(!store.hash_delete("h", "a").await.unwrap());
        assert!(!store.hash_delete("missing", "a").await.unwrap());
        assert_eq!(store.hash_get("h", "a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn json_helpers_treat_garbage_as_miss() {
        let store = MemoryStore::new();
        store.set("bad", "{not json".into(), None).await.unwrap();
        let value: Option<Vec<u32>> = get_json(&store, "bad").await.unwrap();
        assert!(value.is_none());

        set_json(&store, "good", &vec![1u32, 2, 3], None).await.unwrap();
        let value: Option<Vec<u32>> = get_json(&store, "good").await.unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
    }
}
