use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{NewsError, Result};
use crate::models::{Article, BookmarkRecord};
use crate::store::KeyValueStore;

pub const DEFAULT_USER: &str = "demo";

/// Per-user saved articles, kept in one store hash keyed by article url.
///
/// Store failures propagate: there is no fallback for bookmarks.
pub struct BookmarkStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    hash_key: String,
}

impl BookmarkStore {
    /// Bookmarks of the fixed single-tenant user.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::for_user(store, DEFAULT_USER)
    }

    pub fn for_user(store: Arc<dyn KeyValueStore>, user_id: &str) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            hash_key: format!("user:{}:bookmarks", user_id),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn is_bookmarked(&self, url: &str) -> Result<bool> {
        Ok(self.store.hash_get(&self.hash_key, url).await?.is_some())
    }

    /// Flip membership of `article` and return the new state.
    ///
    /// Check-then-act without isolation; concurrent toggles of the same
    /// article may lose an update.
    pub async fn toggle_bookmark(&self, article: &Article) -> Result<bool> {
        if self.is_bookmarked(&article.url).await? {
            self.store.hash_delete(&self.hash_key, &article.url).await?;
            info!(url = %article.url, "bookmark removed");
            return Ok(false);
        }

        let record = BookmarkRecord {
            article: Article {
                summary: None,
                sentiment: None,
                ..article.clone()
            },
            bookmarked_at: self.clock.now(),
        };
        let encoded = serde_json::to_string(&record)
            .map_err(|e| NewsError::store(format!("failed to encode bookmark: {}", e)))?;

        let mut mapping = HashMap::with_capacity(1);
        mapping.insert(article.url.clone(), encoded);
        self.store.hash_set_many(&self.hash_key, mapping).await?;
        info!(url = %article.url, "bookmark added");
        Ok(true)
    }

    /// Most recently bookmarked first. Undecodable records are skipped.
    pub async fn list_bookmarks(&self) -> Result<Vec<BookmarkRecord>> {
        let raw = self.store.hash_get_all(&self.hash_key).await?;

        let mut records: Vec<BookmarkRecord> = raw
            .into_iter()
            .filter_map(|(url, value)| match serde_json::from_str(&value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(%url, error = %e, "skipping undecodable bookmark");
                    None
                }
            })
            .collect();

        records.sort_by(|a, b| {
            b.bookmarked_at
                .cmp(&a.bookmarked_at)
                .then_with(|| a.article.url.cmp(&b.article.url))
        });
        Ok(records)
    }
}
