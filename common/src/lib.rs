/*!
common/src/lib.rs

Shared configuration types and DB helper functions for newsbrief.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader that merges a default and an override TOML file
- A helper to initialize an SQLite pool for the persistent key-value store
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_NEWS_CACHE_TTL_SECONDS: u64 = 900;
pub const DEFAULT_SUMMARY_CACHE_TTL_SECONDS: u64 = 86_400;

/// HTTP server section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: Option<String>,
    pub port: Option<u16>,
}

/// Backing store for the key-value cache (`memory` or `sqlite`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: Option<String>,
    /// Path to the sqlite database file (e.g. "data/newsbrief.db")
    pub path: Option<String>,
}

/// Upstream news provider config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsConfig {
    /// "gnews" or "newsapi"
    pub provider: Option<String>,
    pub api_url: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    pub page_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
    pub cache_ttl_seconds: Option<u64>,
}

/// Language model used for summaries (OpenAI-compatible endpoint)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    pub adapter: Option<String>, // "remote", "none"
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_tokens: Option<usize>,
    pub cache_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookmarksConfig {
    /// User namespace for bookmarks; single-tenant, so one fixed value
    pub user: Option<String>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub bookmarks: BookmarksConfig,
}

impl Config {
    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    pub fn news_cache_ttl(&self) -> u64 {
        self.news.cache_ttl_seconds.unwrap_or(DEFAULT_NEWS_CACHE_TTL_SECONDS)
    }

    pub fn summary_cache_ttl(&self) -> u64 {
        self.llm.cache_ttl_seconds.unwrap_or(DEFAULT_SUMMARY_CACHE_TTL_SECONDS)
    }

    pub fn bookmark_user(&self) -> &str {
        self.bookmarks.user.as_deref().unwrap_or("demo")
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Read an API key from the environment variable named in config.
///
/// Missing or blank variables yield `None`: an unconfigured credential selects
/// the local fallback path instead of failing startup.
pub fn resolve_api_key(api_key_env: Option<&str>) -> Option<String> {
    let name = api_key_env?;
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Initialize an SQLite connection pool.
///
/// Creates the parent directory if necessary and returns a WAL-mode `SqlitePool`.
/// Schema creation is left to the caller (the store owns its tables).
///
/// Example:
///   let pool = init_db_pool("data/newsbrief.db").await?;
pub async fn init_db_pool(path: &str) -> Result<SqlitePool> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create DB parent directory: {}", parent.display())
            })?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    // Modest pool size; the store does short single-key statements.
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to sqlite database at path: {}", path))?;

    Ok(pool)
}
