use anyhow::{anyhow, Result};
use rocket::figment::Figment;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{get, post, routes, Build, Rocket, State};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::app::NewsService;
use crate::error::NewsError;
use crate::models::{Article, NewsResult, SummaryResult};
use crate::stats::{self, Stats};

type ApiError = (Status, Json<Value>);
type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

fn bad_request(message: &str) -> ApiError {
    (Status::BadRequest, Json(json!({ "error": message })))
}

fn internal_error(context: &str, err: NewsError) -> ApiError {
    error!(error = %err, "{}", context);
    (Status::InternalServerError, Json(json!({ "error": context })))
}

/// Pull `article` out of a request body; it must carry a url.
fn article_from_body(body: Value) -> std::result::Result<Article, ApiError> {
    let article = body
        .get("article")
        .cloned()
        .ok_or_else(|| bad_request("Missing article"))?;
    let article: Article =
        serde_json::from_value(article).map_err(|_| bad_request("Missing article data"))?;
    if article.url.trim().is_empty() {
        return Err(bad_request("Missing article data"));
    }
    Ok(article)
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}

#[get("/api/news?<category>&<query>")]
async fn news(
    state: &State<NewsService>,
    category: Option<&str>,
    query: Option<&str>,
) -> ApiResult<NewsResult> {
    state
        .fetcher
        .fetch_news(category.unwrap_or_default(), query.unwrap_or_default())
        .await
        .map(Json)
        .map_err(|e| internal_error("Failed to fetch news", e))
}

#[post("/api/summarize", data = "<body>")]
async fn summarize(state: &State<NewsService>, body: Json<Value>) -> ApiResult<SummaryResult> {
    let article = article_from_body(body.into_inner())?;
    state
        .summarizer
        .summarize_article(&article)
        .await
        .map(Json)
        .map_err(|e| internal_error("Failed to summarize", e))
}

/// Membership check when `url` is given, otherwise the full list.
#[get("/api/bookmarks?<url>")]
async fn bookmarks(state: &State<NewsService>, url: Option<String>) -> ApiResult<Value> {
    if let Some(url) = url {
        let status = state
            .bookmarks
            .is_bookmarked(&url)
            .await
            .map_err(|e| internal_error("Failed to read bookmarks", e))?;
        return Ok(Json(json!({ "isBookmarked": status })));
    }

    let list = state
        .bookmarks
        .list_bookmarks()
        .await
        .map_err(|e| internal_error("Failed to read bookmarks", e))?;
    Ok(Json(json!({ "articles": list })))
}

#[post("/api/bookmarks", data = "<body>")]
async fn toggle_bookmark(state: &State<NewsService>, body: Json<Value>) -> ApiResult<Value> {
    let article = article_from_body(body.into_inner())?;
    let status = state
        .bookmarks
        .toggle_bookmark(&article)
        .await
        .map_err(|e| internal_error("Failed to toggle bookmark", e))?;
    Ok(Json(json!({ "ok": true, "isBookmarked": status })))
}

#[get("/api/stats")]
async fn stats_summary() -> Json<Stats> {
    Json(stats::stats())
}

/// Assemble the Rocket instance with managed state and routes.
pub fn build_rocket(figment: Figment, service: NewsService) -> Rocket<Build> {
    rocket::custom(figment).manage(service).mount(
        "/",
        routes![
            health,
            news,
            summarize,
            bookmarks,
            toggle_bookmark,
            stats_summary,
        ],
    )
}

/// Build and launch the HTTP server; returns when Rocket shuts down.
pub async fn launch_rocket(service: NewsService, address: &str, port: u16) -> Result<()> {
    let figment = rocket::Config::figment()
        .merge(("address", address.to_string()))
        .merge(("port", port));

    info!(%address, port, "Starting Rocket HTTP server");
    build_rocket(figment, service)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    info!("Rocket HTTP server has shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::store::testing::FailingStore;
    use rocket::http::ContentType;
    use rocket::local::asynchronous::Client;
    use std::sync::Arc;

    async fn client() -> Client {
        let service = NewsService::offline(Arc::new(MemoryStore::new()));
        Client::tracked(build_rocket(rocket::Config::figment(), service))
            .await
            .expect("valid rocket instance")
    }

    fn article_body(slug: &str) -> String {
        json!({
            "article": {
                "title": format!("Story {}", slug),
                "description": "Great news for everyone.",
                "url": format!("https://example.com/{}", slug),
                "publishedAt": "2024-03-01T10:00:00Z",
                "source": {"name": "Wire", "url": ""}
            }
        })
        .to_string()
    }

    #[rocket::async_test]
    async fn news_defaults_to_general_fallback() {
        let client = client().await;
        let response = client.get("/api/news").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let body: NewsResult = response.into_json().await.expect("news json");
        assert_eq!(body.total_articles, 10);
        assert_eq!(body.articles[0].title, "General News Article 1");
    }

    #[rocket::async_test]
    async fn news_search_narrows() {
        let client = client().await;
        let response = client
            .get("/api/news?category=technology&query=ai")
            .dispatch()
            .await;
        let body: NewsResult = response.into_json().await.expect("news json");
        assert_eq!(body.articles.len(), 5);
    }

    #[rocket::async_test]
    async fn summarize_requires_article() {
        let client = client().await;
        let response = client
            .post("/api/summarize")
            .header(ContentType::JSON)
            .body("{}")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let response = client
            .post("/api/summarize")
            .header(ContentType::JSON)
            .body(r#"{"article": {"title": "no url"}}"#)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let response = client
            .post("/api/summarize")
            .header(ContentType::JSON)
            .body(article_body("s"))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let summary: SummaryResult = response.into_json().await.expect("summary json");
        assert_eq!(summary.sentiment.as_str(), "positive");
    }

    #[rocket::async_test]
    async fn bookmark_toggle_and_list() {
        let client = client().await;

        let response = client
            .post("/api/bookmarks")
            .header(ContentType::JSON)
            .body(article_body("a"))
            .dispatch()
            .await;
        let body: Value = response.into_json().await.expect("toggle json");
        assert_eq!(body["isBookmarked"], true);

        let response = client
            .get("/api/bookmarks?url=https%3A%2F%2Fexample.com%2Fa")
            .dispatch()
            .await;
        let body: Value = response.into_json().await.expect("status json");
        assert_eq!(body["isBookmarked"], true);

        let response = client.get("/api/bookmarks").dispatch().await;
        let body: Value = response.into_json().await.expect("list json");
        assert_eq!(body["articles"].as_array().map(Vec::len), Some(1));
        assert!(body["articles"][0]["bookmarkedAt"].is_string());

        let response = client
            .post("/api/bookmarks")
            .header(ContentType::JSON)
            .body(article_body("a"))
            .dispatch()
            .await;
        let body: Value = response.into_json().await.expect("toggle json");
        assert_eq!(body["isBookmarked"], false);
    }

    #[rocket::async_test]
    async fn stats_stub() {
        let client = client().await;
        let response = client.get("/api/stats").dispatch().await;
        let body: Value = response.into_json().await.expect("stats json");
        assert_eq!(body["keywords"][0]["name"], "Technology");
        assert_eq!(body["sources"].as_array().map(Vec::len), Some(5));
    }

    #[rocket::async_test]
    async fn url_only_article_is_accepted() {
        let client = client().await;
        let body = r#"{"article": {"url": "https://x.example/a", "description": null, "source": {"name": "S"}}}"#;

        let response = client
            .post("/api/bookmarks")
            .header(ContentType::JSON)
            .body(body)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let toggled: Value = response.into_json().await.expect("toggle json");
        assert_eq!(toggled["isBookmarked"], true);

        let response = client
            .post("/api/summarize")
            .header(ContentType::JSON)
            .body(r#"{"article": {"url": "https://x.example/b", "source": {"url": "u"}}}"#)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
    }

    #[rocket::async_test]
    async fn store_failures_are_internal_errors() {
        let service = NewsService::offline(Arc::new(FailingStore));
        let client = Client::tracked(build_rocket(rocket::Config::figment(), service))
            .await
            .expect("valid rocket instance");

        let response = client.get("/api/news").dispatch().await;
        assert_eq!(response.status(), Status::InternalServerError);
        let body: Value = response.into_json().await.expect("error json");
        assert_eq!(body["error"], "Failed to fetch news");

        let response = client.get("/api/bookmarks").dispatch().await;
        assert_eq!(response.status(), Status::InternalServerError);
    }
}
