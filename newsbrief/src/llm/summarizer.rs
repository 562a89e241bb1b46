// Summarizer module
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{LlmProvider, MAX_SUMMARY_CHARS};
use crate::error::{NewsError, Result};
use crate::models::{truncate_chars, Article, Sentiment, SummaryResult};
use crate::store::{get_json, set_json, KeyValueStore};

pub const SUMMARY_CACHE_TTL_SECONDS: u64 = 86_400;

const POSITIVE_WORDS: &[&str] = &[
    "success",
    "breakthrough",
    "win",
    "positive",
    "good",
    "great",
    "excellent",
];
const NEGATIVE_WORDS: &[&str] = &[
    "failure", "crisis", "loss", "negative", "bad", "terrible", "disaster",
];

/// Cache-aside article summaries, with a local extractive fallback.
pub struct Summarizer {
    store: Arc<dyn KeyValueStore>,
    provider: Option<Arc<dyn LlmProvider>>,
    cache_ttl: u64,
    max_tokens: usize,
}

impl Summarizer {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            provider: None,
            cache_ttl: SUMMARY_CACHE_TTL_SECONDS,
            max_tokens: 150,
        }
    }

    pub fn with_provider(mut self, provider: Option<Arc<dyn LlmProvider>>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_cache_ttl(mut self, ttl_seconds: u64) -> Self {
        self.cache_ttl = ttl_seconds;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Summary and sentiment for `article`, keyed by its url.
    ///
    /// Repeated calls within the TTL never reach the model again.
    pub async fn summarize_article(&self, article: &Article) -> Result<SummaryResult> {
        let cache_key = format!("summary:{}", article.url);

        if let Some(cached) = get_json::<SummaryResult, _>(&*self.store, &cache_key).await? {
            debug!(key = %cache_key, "summary cache hit");
            return Ok(cached);
        }

        let result = match self.summarize_upstream(article).await {
            Ok(result) => {
                info!(url = %article.url, sentiment = %result.sentiment, "LLM summarization successful");
                result
            }
            Err(NewsError::UpstreamUnavailable(reason)) => {
                debug!(url = %article.url, %reason, "no LLM configured, using local summary");
                local_summary(article)
            }
            Err(e) if e.is_upstream() => {
                warn!(url = %article.url, error = %e, "LLM summarization failed, falling back to local summary");
                local_summary(article)
            }
            Err(e) => return Err(e),
        };

        set_json(&*self.store, &cache_key, &result, Some(self.cache_ttl)).await?;
        Ok(result)
    }

    async fn summarize_upstream(&self, article: &Article) -> Result<SummaryResult> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| NewsError::unavailable("LLM API key not configured"))?;
        provider.summarize(article, self.max_tokens).await
    }
}

/// Fallback summary: title plus the first sentence of the description,
/// sentiment from fixed keyword lists.
pub fn local_summary(article: &Article) -> SummaryResult {
    let first_sentence = article
        .description
        .split('.')
        .next()
        .unwrap_or_default()
        .trim();

    let summary = format!(
        "{}. {}. This article provides information about {}'s coverage of this topic.",
        article.title,
        first_sentence,
        article.source.name
    );

    SummaryResult {
        summary: truncate_chars(&summary, MAX_SUMMARY_CHARS),
        sentiment: keyword_sentiment(&article.title, &article.description),
    }
}

fn keyword_sentiment(title: &str, description: &str) -> Sentiment {
    let text = format!("{} {}", title, description).to_lowercase();
    if POSITIVE_WORDS.iter().any(|word| text.contains(word)) {
        Sentiment::Positive
    } else if NEGATIVE_WORDS.iter().any(|word| text.contains(word)) {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}
