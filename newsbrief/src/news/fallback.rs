// Synthetic articles served when no news provider is configured or it fails.
use chrono::{DateTime, Duration, Utc};

use crate::models::{Article, NewsQuery, NewsResult, Source};

pub const FALLBACK_ARTICLE_COUNT: usize = 10;
/// Searches keep only the first few synthetic articles.
pub const FALLBACK_SEARCH_COUNT: usize = 5;

const CATEGORY_DESCRIPTIONS: &[(&str, &str)] = &[
    ("general", "General news about various topics"),
    ("technology", "Technology news about AI, software, and hardware"),
    ("business", "Business news about companies and markets"),
    ("entertainment", "Entertainment news about movies, music, and celebrities"),
    ("health", "Health news about medical research and wellness"),
    ("science", "Science news about discoveries and research"),
    ("sports", "Sports news about games, players, and teams"),
];

/// Unknown categories borrow the `general` text.
pub fn category_description(category: &str) -> &'static str {
    CATEGORY_DESCRIPTIONS
        .iter()
        .find(|(name, _)| *name == category)
        .or_else(|| CATEGORY_DESCRIPTIONS.first())
        .map(|(_, desc)| *desc)
        .unwrap_or_default()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Deterministic listing for `query`: sequential titles and urls, newest
/// article stamped `now`, each following one an hour older.
pub fn fallback_news(query: &NewsQuery, now: DateTime<Utc>) -> NewsResult {
    let category = query.category.as_str();
    let label = capitalize(category);
    let description = category_description(category);
    let query_text = if query.is_search() {
        format!(" related to \"{}\"", query.query)
    } else {
        String::new()
    };

    let take = if query.is_search() {
        FALLBACK_SEARCH_COUNT
    } else {
        FALLBACK_ARTICLE_COUNT
    };

    let articles: Vec<Article> = (0..FALLBACK_ARTICLE_COUNT)
        .map(|i| {
            let index = i + 1;
            Article {
                title: format!("{} News Article {}{}", label, index, query_text),
                description: format!(
                    "This is a sample description for a {} news article{}. {}.",
                    category, query_text, description
                ),
                content: format!(
                    "This is the full content of the article about {}{}. It contains more detailed information than the description.",
                    category, query_text
                ),
                url: format!("https://example.com/article-{}-{}", category, index),
                image: Some(format!(
                    "/placeholder.svg?height=400&width=600&text={}+{}",
                    category.to_uppercase(),
                    index
                )),
                published_at: now - Duration::hours(i as i64),
                source: Source {
                    name: format!("{} News Source", label),
                    url: format!("https://example.com/{}-source", category),
                },
                summary: None,
                sentiment: None,
            }
        })
        .take(take)
        .collect();

    NewsResult {
        total_articles: articles.len(),
        articles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browse_returns_ten_sequential_articles() {
        let now = Utc::now();
        let result = fallback_news(&NewsQuery::new("technology", ""), now);

        assert_eq!(result.total_articles, 10);
        assert_eq!(result.articles.len(), 10);
        for (i, article) in result.articles.iter().enumerate() {
            let n = i + 1;
            assert_eq!(article.title, format!("Technology News Article {}", n));
            assert!(article.url.ends_with(&format!("/article-technology-{}", n)));
            assert_eq!(article.published_at, now - Duration::hours(i as i64));
            assert_eq!(article.source.name, "Technology News Source");
        }
    }

    #[test]
    fn search_keeps_first_five() {
        let now = Utc::now();
        let browse = fallback_news(&NewsQuery::new("technology", ""), now);
        let search = fallback_news(&NewsQuery::new("technology", "ai"), now);

        assert_eq!(search.total_articles, 5);
        let urls: Vec<_> = search.articles.iter().map(|a| a.url.as_str()).collect();
        let first_five: Vec<_> = browse.articles.iter().take(5).map(|a| a.url.as_str()).collect();
        assert_eq!(urls, first_five);
        assert_eq!(search.articles[0].title, "Technology News Article 1 related to \"ai\"");
    }

    #[test]
    fn unknown_category_uses_general_description() {
        let result = fallback_news(&NewsQuery::new("astrology", ""), Utc::now());
        assert!(result.articles[0]
            .description
            .ends_with("General news about various topics."));
        assert_eq!(result.articles[0].source.name, "Astrology News Source");
    }
}
