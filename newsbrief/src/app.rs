use anyhow::{Context, Result};
use common::{Config, LlmConfig, NewsConfig};
use std::sync::Arc;
use tracing::info;

use crate::bookmarks::BookmarkStore;
use crate::llm::remote::RemoteLlmProvider;
use crate::llm::summarizer::Summarizer;
use crate::llm::LlmProvider;
use crate::news::provider::{HttpNewsProvider, ProviderFlavor};
use crate::news::{ContentFetcher, NewsProvider, DEFAULT_PAGE_SIZE};
use crate::store::{KeyValueStore, MemoryStore, SqliteStore};

const DEFAULT_LLM_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// The three request-scoped components sharing one injected store.
pub struct NewsService {
    pub fetcher: ContentFetcher,
    pub summarizer: Summarizer,
    pub bookmarks: BookmarkStore,
}

impl NewsService {
    /// No upstream providers: every listing and summary uses the fallbacks.
    pub fn offline(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            fetcher: ContentFetcher::new(store.clone()),
            summarizer: Summarizer::new(store.clone()),
            bookmarks: BookmarkStore::new(store),
        }
    }

    pub fn from_config(config: &Config, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let fetcher = ContentFetcher::new(store.clone())
            .with_provider(news_provider_from_config(&config.news)?)
            .with_cache_ttl(config.news_cache_ttl())
            .with_page_size(config.news.page_size.unwrap_or(DEFAULT_PAGE_SIZE));

        let mut summarizer = Summarizer::new(store.clone())
            .with_provider(llm_provider_from_config(&config.llm)?)
            .with_cache_ttl(config.summary_cache_ttl());
        if let Some(max_tokens) = config.llm.max_tokens {
            summarizer = summarizer.with_max_tokens(max_tokens);
        }

        Ok(Self {
            fetcher,
            summarizer,
            bookmarks: BookmarkStore::for_user(store, config.bookmark_user()),
        })
    }
}

/// Open the configured backing store (`memory` unless told otherwise).
pub async fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    let backend = config.store.backend.as_deref().unwrap_or("memory");
    match backend {
        "memory" => {
            info!("using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        "sqlite" => {
            let path = config.store.path.as_deref().unwrap_or("data/newsbrief.db");
            let pool = common::init_db_pool(path).await?;
            let store = SqliteStore::new(pool)
                .await
                .with_context(|| format!("failed to prepare sqlite store at {}", path))?;
            info!(path, "using sqlite store");
            Ok(Arc::new(store))
        }
        other => anyhow::bail!("Unknown store backend: {}", other),
    }
}

/// Build the news provider, or `None` when its API key is not set.
pub fn news_provider_from_config(cfg: &NewsConfig) -> Result<Option<Arc<dyn NewsProvider>>> {
    let flavor: ProviderFlavor = cfg
        .provider
        .as_deref()
        .unwrap_or("gnews")
        .parse()
        .map_err(anyhow::Error::msg)?;

    let api_key_env = cfg.api_key_env.as_deref().unwrap_or(match flavor {
        ProviderFlavor::GNews => "GNEWS_API_KEY",
        ProviderFlavor::NewsApi => "NEWS_API_KEY",
    });

    let Some(api_key) = common::resolve_api_key(Some(api_key_env)) else {
        info!(env = api_key_env, "news API key not set, serving fallback news");
        return Ok(None);
    };

    let mut provider = HttpNewsProvider::new(flavor, api_key)
        .with_timeout(cfg.timeout_seconds.unwrap_or(10));
    if let Some(api_url) = &cfg.api_url {
        provider = provider.with_base_url(api_url.clone());
    }
    info!(?flavor, "news provider initialized");
    Ok(Some(Arc::new(provider) as Arc<dyn NewsProvider>))
}

/// Build the summarization model client, or `None` when disabled or unkeyed.
pub fn llm_provider_from_config(cfg: &LlmConfig) -> Result<Option<Arc<dyn LlmProvider>>> {
    let adapter = cfg.adapter.as_deref().unwrap_or("remote");
    match adapter {
        "none" => {
            info!("LLM adapter disabled, summaries use the local fallback");
            Ok(None)
        }
        "remote" => {
            let api_key_env = cfg.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY");
            let Some(api_key) = common::resolve_api_key(Some(api_key_env)) else {
                info!(env = api_key_env, "LLM API key not set, summaries use the local fallback");
                return Ok(None);
            };

            let api_url = cfg.api_url.clone().unwrap_or_else(|| DEFAULT_LLM_URL.to_string());
            let model = cfg.model.clone().unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string());
            let provider = RemoteLlmProvider::new(api_url.clone(), api_key, model).with_defaults(
                cfg.timeout_seconds.unwrap_or(30),
                cfg.max_tokens.unwrap_or(150),
                0.7,
            );
            info!(model = provider.model(), %api_url, "LLM provider initialized");
            Ok(Some(Arc::new(provider) as Arc<dyn LlmProvider>))
        }
        other => anyhow::bail!("Unknown LLM adapter type: {}", other),
    }
}
