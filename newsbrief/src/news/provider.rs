use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{NewsProvider, NewsRequest};
use crate::error::{NewsError, Result};
use crate::models::{Article, NewsResult, Source};

pub const MISSING_DESCRIPTION: &str = "No description available";
pub const UNTITLED: &str = "Untitled";

/// Which upstream API shape to speak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFlavor {
    GNews,
    NewsApi,
}

impl ProviderFlavor {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderFlavor::GNews => "https://gnews.io/api/v4",
            ProviderFlavor::NewsApi => "https://newsapi.org/v2",
        }
    }
}

impl FromStr for ProviderFlavor {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gnews" => Ok(ProviderFlavor::GNews),
            "newsapi" => Ok(ProviderFlavor::NewsApi),
            other => Err(format!("unknown news provider: {}", other)),
        }
    }
}

/// News provider speaking the GNews or NewsAPI HTTP protocol
pub struct HttpNewsProvider {
    flavor: ProviderFlavor,
    base_url: String,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpNewsProvider {
    pub fn new(flavor: ProviderFlavor, api_key: impl Into<String>) -> Self {
        Self {
            flavor,
            base_url: flavor.default_base_url().to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Build the request URL. The NewsAPI key travels in a header instead.
    pub fn request_url(&self, request: &NewsRequest) -> Result<Url> {
        let page_size = request.page_size.to_string();
        let url = match (self.flavor, request.query.is_empty()) {
            (ProviderFlavor::GNews, true) => Url::parse_with_params(
                &self.endpoint("top-headlines"),
                &[
                    ("category", request.category.as_str()),
                    ("lang", "en"),
                    ("country", "us"),
                    ("max", page_size.as_str()),
                    ("apikey", self.api_key.as_str()),
                ],
            ),
            (ProviderFlavor::GNews, false) => Url::parse_with_params(
                &self.endpoint("search"),
                &[
                    ("q", request.query.as_str()),
                    ("lang", "en"),
                    ("country", "us"),
                    ("max", page_size.as_str()),
                    ("apikey", self.api_key.as_str()),
                ],
            ),
            (ProviderFlavor::NewsApi, true) => Url::parse_with_params(
                &self.endpoint("top-headlines"),
                &[
                    ("category", request.category.as_str()),
                    ("language", "en"),
                    ("pageSize", page_size.as_str()),
                ],
            ),
            (ProviderFlavor::NewsApi, false) => Url::parse_with_params(
                &self.endpoint("everything"),
                &[
                    ("q", request.query.as_str()),
                    ("language", "en"),
                    ("pageSize", page_size.as_str()),
                ],
            ),
        };
        url.map_err(|e| NewsError::request_failed(format!("invalid news API url {}: {}", self.base_url, e)))
    }
}

#[async_trait::async_trait]
impl NewsProvider for HttpNewsProvider {
    async fn fetch(&self, request: &NewsRequest) -> Result<NewsResult> {
        let url = self.request_url(request)?;
        debug!(flavor = ?self.flavor, category = %request.category, query = %request.query, "requesting news");

        let mut builder = self.client.get(url).timeout(self.timeout);
        if self.flavor == ProviderFlavor::NewsApi {
            builder = builder.header("X-Api-Key", &self.api_key);
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NewsError::request_failed(format!(
                "news API error {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        let payload: RawNewsPayload = serde_json::from_str(&body)
            .map_err(|e| NewsError::malformed(format!("failed to parse news payload: {}", e)))?;

        if payload.status.as_deref() == Some("error") {
            return Err(NewsError::request_failed(format!(
                "news API reported error: {}",
                payload.message.unwrap_or_default()
            )));
        }

        Ok(payload.normalize(Utc::now()))
    }
}

/// Union of the GNews and NewsAPI response shapes
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNewsPayload {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "totalResults")]
    pub total_articles: Option<usize>,
    #[serde(default)]
    pub articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawArticle {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    #[serde(alias = "urlToImage")]
    pub image: Option<String>,
    pub published_at: Option<String>,
    pub source: Option<RawSource>,
}

#[derive(Debug, Deserialize)]
pub struct RawSource {
    pub name: Option<String>,
    pub url: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl RawNewsPayload {
    /// Map provider records into articles, filling documented placeholders.
    /// Records without a url have no identity and are dropped, as are
    /// repeats of a url already seen (first occurrence wins).
    pub fn normalize(self, now: DateTime<Utc>) -> NewsResult {
        let mut seen = HashSet::new();
        let articles: Vec<Article> = self
            .articles
            .into_iter()
            .filter_map(|raw| raw.into_article(now))
            .filter(|article| {
                let fresh = seen.insert(article.url.clone());
                if !fresh {
                    debug!(url = %article.url, "skipping duplicate upstream article");
                }
                fresh
            })
            .collect();

        NewsResult {
            total_articles: self.total_articles.unwrap_or(articles.len()),
            articles,
        }
    }
}

impl RawArticle {
    fn into_article(self, now: DateTime<Utc>) -> Option<Article> {
        let Some(url) = non_empty(self.url) else {
            debug!(title = ?self.title, "skipping upstream article without url");
            return None;
        };

        let published_at = self
            .published_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or(now);

        let (source_name, source_url) = match self.source {
            Some(source) => (non_empty(source.name), non_empty(source.url)),
            None => (None, None),
        };

        Some(Article {
            title: non_empty(self.title).unwrap_or_else(|| UNTITLED.to_string()),
            description: non_empty(self.description)
                .unwrap_or_else(|| MISSING_DESCRIPTION.to_string()),
            content: self.content.unwrap_or_default(),
            url,
            image: non_empty(self.image),
            published_at,
            source: Source {
                name: source_name.unwrap_or_else(|| "Unknown".to_string()),
                url: source_url.unwrap_or_default(),
            },
            summary: None,
            sentiment: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(category: &str, query: &str) -> NewsRequest {
        NewsRequest {
            category: category.to_string(),
            query: query.to_string(),
            page_size: 10,
        }
    }

    #[test]
    fn gnews_urls() {
        let provider = HttpNewsProvider::new(ProviderFlavor::GNews, "k3y");
        let url = provider.request_url(&request("sports", "")).unwrap();
        assert_eq!(url.path(), "/api/v4/top-headlines");
        assert!(url.query().unwrap().contains("category=sports"));
        assert!(url.query().unwrap().contains("apikey=k3y"));

        let url = provider.request_url(&request("sports", "world cup")).unwrap();
        assert_eq!(url.path(), "/api/v4/search");
        assert!(url.query().unwrap().contains("q=world+cup"));
    }

    #[test]
    fn newsapi_urls_keep_key_out_of_query() {
        let provider = HttpNewsProvider::new(ProviderFlavor::NewsApi, "k3y")
            .with_base_url("http://localhost:1234/v2/");
        let url = provider.request_url(&request("business", "")).unwrap();
        assert_eq!(url.as_str().split('?').next(), Some("http://localhost:1234/v2/top-headlines"));
        assert!(!url.as_str().contains("k3y"));

        let url = provider.request_url(&request("business", "rates")).unwrap();
        assert_eq!(url.path(), "/v2/everything");
    }

    #[test]
    fn flavor_from_str() {
        assert_eq!("GNews".parse::<ProviderFlavor>(), Ok(ProviderFlavor::GNews));
        assert_eq!("newsapi".parse::<ProviderFlavor>(), Ok(ProviderFlavor::NewsApi));
        assert!("bing".parse::<ProviderFlavor>().is_err());
    }

    #[test]
    fn normalize_fills_placeholders() {
        let json = r#"{
            "totalResults": 2,
            "articles": [
                {
                    "title": "Rates hold",
                    "description": null,
                    "url": "https://news.example/rates",
                    "urlToImage": "",
                    "publishedAt": "2024-05-01T12:00:00Z",
                    "source": {"id": null, "name": "Wire"}
                },
                {"title": "No link", "url": null}
            ]
        }"#;
        let now = Utc::now();
        let payload: RawNewsPayload = serde_json::from_str(json).unwrap();
        let result = payload.normalize(now);

        assert_eq!(result.total_articles, 2);
        assert_eq!(result.articles.len(), 1);
        let article = &result.articles[0];
        assert_eq!(article.description, MISSING_DESCRIPTION);
        assert_eq!(article.image, None);
        assert_eq!(article.content, "");
        assert_eq!(article.source.name, "Wire");
        assert_eq!(article.source.url, "");
        assert_eq!(article.published_at.to_rfc3339(), "2024-05-01T12:00:00+00:00");
    }

    #[test]
    fn normalize_drops_repeated_urls() {
        let json = r#"{"articles": [
            {"title": "a", "url": "https://d"},
            {"title": "other", "url": "https://e"},
            {"title": "b", "url": " https://d "}
        ]}"#;
        let result = serde_json::from_str::<RawNewsPayload>(json)
            .unwrap()
            .normalize(Utc::now());

        let titles: Vec<_> = result.articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "other"]);
        assert_eq!(result.total_articles, 2);
    }

    #[test]
    fn normalize_counts_articles_when_total_missing() {
        let json = r#"{"articles": [{"title": "t", "url": "https://a", "publishedAt": "garbage"}]}"#;
        let now = Utc::now();
        let result = serde_json::from_str::<RawNewsPayload>(json).unwrap().normalize(now);
        assert_eq!(result.total_articles, 1);
        assert_eq!(result.articles[0].published_at, now);
        assert_eq!(result.articles[0].source.name, "Unknown");
    }

    #[test]
    fn payload_without_articles_is_rejected() {
        assert!(serde_json::from_str::<RawNewsPayload>(r#"{"totalArticles": 3}"#).is_err());
    }
}
