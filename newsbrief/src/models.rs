use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Publisher of an article
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
}

/// Normalized news article. `url` is the identity key everywhere:
/// summary cache keys, bookmark hash fields and deduplication.
///
/// Only `url` is required when decoding; clients may send `null` or omit
/// any other field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    pub url: String,
    /// `None` when the provider has no image, never an empty string
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "Utc::now", deserialize_with = "null_as_now")]
    pub published_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_now<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<DateTime<Utc>>::deserialize(deserializer)?.unwrap_or_else(Utc::now))
}

/// Cache partition for a news listing. Empty `query` means browse by category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NewsQuery {
    pub category: String,
    pub query: String,
}

impl NewsQuery {
    pub const DEFAULT_CATEGORY: &'static str = "general";

    /// Normalizes the category (trimmed, lower-cased, `general` when empty)
    /// and trims the query.
    pub fn new(category: &str, query: &str) -> Self {
        let category = category.trim().to_lowercase();
        let category = if category.is_empty() {
            Self::DEFAULT_CATEGORY.to_string()
        } else {
            category
        };
        Self {
            category,
            query: query.trim().to_string(),
        }
    }

    pub fn is_search(&self) -> bool {
        !self.query.is_empty()
    }

    pub fn cache_key(&self) -> String {
        format!("news:{}:{}", self.category, self.query)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResult {
    pub total_articles: usize,
    pub articles: Vec<Article>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Case-insensitive scan of free text; "positive" wins over "negative".
    pub fn detect(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("positive") {
            Sentiment::Positive
        } else if lower.contains("negative") {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary: String,
    pub sentiment: Sentiment,
}

/// Article saved by a user, stored as JSON under the article url.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRecord {
    #[serde(flatten)]
    pub article: Article,
    pub bookmarked_at: DateTime<Utc>,
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
