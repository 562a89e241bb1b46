use serde::Deserialize;

use crate::error::{NewsError, Result};
use crate::models::{truncate_chars, Article, Sentiment, SummaryResult};

pub mod remote;
pub mod summarizer;

/// Longest summary kept, from upstream or the local fallback
pub const MAX_SUMMARY_CHARS: usize = 300;

/// Language model behind the summarizer
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate completion for a given prompt
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse>;

    /// Ask for a short summary plus sentiment label and parse the reply.
    async fn summarize(&self, article: &Article, max_tokens: usize) -> Result<SummaryResult> {
        let request = LlmRequest {
            prompt: summary_prompt(article),
            max_tokens: Some(max_tokens),
            temperature: Some(0.3), // Low temperature keeps the JSON shape stable
            timeout_seconds: None,
        };
        let response = self.generate(request).await?;
        parse_summary_reply(&response.content)
    }
}

/// Request structure for LLM generation
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

/// Response from LLM generation
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: UsageMetadata,
    pub model: String,
}

/// Token usage metadata
#[derive(Debug, Clone, Default)]
pub struct UsageMetadata {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

pub fn summary_prompt(article: &Article) -> String {
    format!(
        r#"You summarize news articles and judge their sentiment.

Summarize the article below in 2-3 sentences and classify its sentiment as positive, negative, or neutral.

OUTPUT FORMAT (strict JSON):
{{
  "summary": "short summary",
  "sentiment": "positive | negative | neutral"
}}

Title: {}
Description: {}
Content: {}
"#,
        article.title, article.description, article.content
    )
}

#[derive(Debug, Deserialize)]
struct SummaryJson {
    summary: String,
    #[serde(default)]
    sentiment: Option<String>,
}

/// Parse a model reply, preferring JSON. Free text falls back to the first
/// line as summary and a keyword scan for the sentiment.
pub fn parse_summary_reply(text: &str) -> Result<SummaryResult> {
    if text.trim().is_empty() {
        return Err(NewsError::malformed("LLM returned an empty reply"));
    }

    if let Some(parsed) = extract_json_from_text(text)
        .and_then(|json| serde_json::from_str::<SummaryJson>(&json).ok())
        .filter(|parsed| !parsed.summary.trim().is_empty())
    {
        let sentiment = parsed
            .sentiment
            .as_deref()
            .map(Sentiment::detect)
            .unwrap_or(Sentiment::Neutral);
        return Ok(SummaryResult {
            summary: truncate_chars(parsed.summary.trim(), MAX_SUMMARY_CHARS),
            sentiment,
        });
    }

    let summary = text
        .lines()
        .map(strip_labels)
        .find(|line| !line.is_empty())
        .ok_or_else(|| NewsError::malformed("LLM reply has no summary text"))?;

    Ok(SummaryResult {
        summary: truncate_chars(summary, MAX_SUMMARY_CHARS),
        sentiment: Sentiment::detect(text),
    })
}

/// Drop a leading "Summary:" and anything from "Sentiment:" onwards.
/// Markdown fence lines carry no text.
fn strip_labels(line: &str) -> &str {
    let mut line = line.trim();
    if line.starts_with("```") {
        return "";
    }
    // ASCII lowering keeps byte offsets aligned with the original line.
    let lower = line.to_ascii_lowercase();
    if let Some(idx) = lower.find("sentiment:") {
        line = &line[..idx];
    }
    if line.to_ascii_lowercase().starts_with("summary:") {
        line = &line["summary:".len()..];
    }
    line.trim()
}

/// Helper to extract JSON from text that might contain markdown backticks or preamble
pub fn extract_json_from_text(text: &str) -> Option<String> {
    // 1. Try to find content between ```json and ```
    if let Some(start) = text.find("```json") {
        let rest = &text[start + 7..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }

    // 2. Try to find content between ``` and ```
    if let Some(start) = text.find("```") {
        let rest = &text[start + 3..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }

    // 3. Try to find the first '{' and last '}'
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return Some(text[start..=end].to_string());
        }
    }

    None
}
