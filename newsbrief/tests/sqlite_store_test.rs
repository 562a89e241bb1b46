use chrono::Utc;
use common::{Config, StoreConfig};
use newsbrief::app::{open_store, NewsService};
use newsbrief::models::{Article, Source};
use newsbrief::store::KeyValueStore;

fn config_for(dir: &tempfile::TempDir) -> Config {
    let path = dir.path().join("nested").join("newsbrief.db");
    Config {
        store: StoreConfig {
            backend: Some("sqlite".to_string()),
            path: Some(path.to_string_lossy().into_owned()),
        },
        ..Default::default()
    }
}

fn article() -> Article {
    Article {
        title: "Markets close higher".to_string(),
        description: "Stocks posted a good day. Bonds were flat.".to_string(),
        content: String::new(),
        url: "https://news.example/markets".to_string(),
        image: None,
        published_at: Utc::now(),
        source: Source {
            name: "Finance Desk".to_string(),
            url: String::new(),
        },
        summary: None,
        sentiment: None,
    }
}

#[tokio::test]
async fn bookmarks_and_caches_survive_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_for(&dir);

    {
        let service = NewsService::offline(open_store(&config).await.expect("open store"));
        assert!(service.bookmarks.toggle_bookmark(&article()).await.unwrap());
        let listing = service.fetcher.fetch_news("business", "").await.unwrap();
        assert_eq!(listing.total_articles, 10);
        service.summarizer.summarize_article(&article()).await.unwrap();
    }

    let store = open_store(&config).await.expect("reopen store");
    let service = NewsService::offline(store.clone());

    let saved = service.bookmarks.list_bookmarks().await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].article.url, "https://news.example/markets");

    assert!(store.get("news:business:").await.unwrap().is_some());
    assert!(store
        .get("summary:https://news.example/markets")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn unknown_backend_is_rejected() {
    let config = Config {
        store: StoreConfig {
            backend: Some("redis".to_string()),
            path: None,
        },
        ..Default::default()
    };
    assert!(open_store(&config).await.is_err());
}
