use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{NewsError, Result};
use crate::models::{NewsQuery, NewsResult};
use crate::store::{get_json, set_json, KeyValueStore};

pub mod fallback;
pub mod provider;

pub const NEWS_CACHE_TTL_SECONDS: u64 = 900;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// What an upstream news API is asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsRequest {
    pub category: String,
    pub query: String,
    pub page_size: u32,
}

/// Upstream news source. Implementations report failures with the
/// `Upstream*` error kinds; the fetcher recovers from all of them.
#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    async fn fetch(&self, request: &NewsRequest) -> Result<NewsResult>;
}

/// Cache-aside news listing: store first, then upstream, then synthetic data.
pub struct ContentFetcher {
    store: Arc<dyn KeyValueStore>,
    provider: Option<Arc<dyn NewsProvider>>,
    clock: Arc<dyn Clock>,
    cache_ttl: u64,
    page_size: u32,
}

impl ContentFetcher {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            provider: None,
            clock: Arc::new(SystemClock),
            cache_ttl: NEWS_CACHE_TTL_SECONDS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_provider(mut self, provider: Option<Arc<dyn NewsProvider>>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cache_ttl(mut self, ttl_seconds: u64) -> Self {
        self.cache_ttl = ttl_seconds;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Resolve a category/query pair to a listing.
    ///
    /// Upstream problems never fail this call; only store errors do.
    pub async fn fetch_news(&self, category: &str, query: &str) -> Result<NewsResult> {
        let query = NewsQuery::new(category, query);
        let cache_key = query.cache_key();

        if let Some(cached) = get_json::<NewsResult, _>(&*self.store, &cache_key).await? {
            debug!(key = %cache_key, "news cache hit");
            return Ok(cached);
        }

        let result = match self.fetch_upstream(&query).await {
            Ok(result) => {
                info!(
                    key = %cache_key,
                    articles = result.articles.len(),
                    "fetched news from provider"
                );
                result
            }
            Err(NewsError::UpstreamUnavailable(reason)) => {
                info!(key = %cache_key, %reason, "no news provider configured, serving fallback news");
                fallback::fallback_news(&query, self.clock.now())
            }
            Err(e) if e.is_upstream() => {
                warn!(key = %cache_key, error = %e, "news provider failed, serving fallback news");
                fallback::fallback_news(&query, self.clock.now())
            }
            Err(e) => return Err(e),
        };

        set_json(&*self.store, &cache_key, &result, Some(self.cache_ttl)).await?;
        Ok(result)
    }

    async fn fetch_upstream(&self, query: &NewsQuery) -> Result<NewsResult> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| NewsError::unavailable("news API key not configured"))?;

        let request = NewsRequest {
            category: query.category.clone(),
            query: query.query.clone(),
            page_size: self.page_size,
        };
        provider.fetch(&request).await
    }
}
