//! Exa web research.
//!
//! `search` uses the answer endpoint, which runs a live search and returns a
//! synthesized answer with citations. `read_page` uses the contents endpoint;
//! `fresh` forces a live crawl instead of the cached copy.

use async_trait::async_trait;
use cogito_abstraction::{ModelError, PageContent, SearchAnswer, WebResearch};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::openrouter::{status_error, transport_error};

/// Default Exa API root.
pub const DEFAULT_BASE_URL: &str = "https://api.exa.ai";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "EXA_API_KEY";

/// Exa-backed search and page extraction.
#[derive(Debug, Clone)]
pub struct ExaResearch {
    api_key: String,
    base_url: String,
    client: Client,
}

impl ExaResearch {
    /// Creates a client with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), base_url: DEFAULT_BASE_URL.to_string(), client: Client::new() }
    }

    /// Targets another API root (used by tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Uses a preconfigured HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ModelError>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error("exa", &e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error("exa", status, error_text));
        }

        response.json().await.map_err(|e| {
            error!(error = %e, path, "Failed to parse Exa response");
            ModelError::SerializationError(format!("Failed to parse response: {}", e))
        })
    }
}

#[async_trait]
impl WebResearch for ExaResearch {
    /// `/answer` always runs a live search, so `fresh` needs no request field.
    async fn search(&self, query: &str, fresh: bool) -> Result<SearchAnswer, ModelError> {
        debug!(query = %query, fresh, "Exa answer request");
        let body = AnswerRequest { query, text: false };
        let answer: AnswerResponse = self.post("/answer", &body).await?;

        let mut sources: Vec<String> = Vec::new();
        for citation in answer.citations {
            if !sources.contains(&citation.url) {
                sources.push(citation.url);
            }
        }
        Ok(SearchAnswer { answer: answer.answer, sources })
    }

    async fn read_page(&self, url: &str, fresh: bool) -> Result<PageContent, ModelError> {
        debug!(url = %url, fresh, "Exa contents request");
        let body = ContentsRequest {
            urls: [url],
            text: true,
            livecrawl: if fresh { "always" } else { "fallback" },
        };
        let contents: ContentsResponse = self.post("/contents", &body).await?;

        let page = contents.results.into_iter().next().ok_or_else(|| {
            let reason = contents
                .statuses
                .iter()
                .find_map(|s| s.error.as_ref().and_then(|e| e.tag.clone()))
                .unwrap_or_else(|| "no content returned".to_string());
            ModelError::ModelResponseError(format!("Could not read {url}: {reason}"))
        })?;

        Ok(PageContent {
            content: page.text.unwrap_or_default(),
            url: page.url,
            title: page.title.filter(|t| !t.trim().is_empty()),
        })
    }
}

// Exa request/response structures

#[derive(Debug, Serialize)]
struct AnswerRequest<'a> {
    query: &'a str,
    text: bool,
}

#[derive(Debug, Deserialize)]
struct AnswerResponse {
    answer: String,
    #[serde(default)]
    citations: Vec<Citation>,
}

#[derive(Debug, Deserialize)]
struct Citation {
    url: String,
}

#[derive(Debug, Serialize)]
struct ContentsRequest<'a> {
    urls: [&'a str; 1],
    text: bool,
    livecrawl: &'static str,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    #[serde(default)]
    results: Vec<ContentsResult>,
    #[serde(default)]
    statuses: Vec<ContentsStatus>,
}

#[derive(Debug, Deserialize)]
struct ContentsResult {
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentsStatus {
    #[serde(default)]
    error: Option<ContentsStatusError>,
}

#[derive(Debug, Deserialize)]
struct ContentsStatusError {
    #[serde(default)]
    tag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contents_request_shape() {
        let body = ContentsRequest { urls: ["https://a.b"], text: true, livecrawl: "always" };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "urls": ["https://a.b"], "text": true, "livecrawl": "always" }));
    }

    #[test]
    fn test_answer_request_has_no_freshness_field() {
        let json = serde_json::to_value(AnswerRequest { query: "q", text: false }).unwrap();
        assert_eq!(json, serde_json::json!({ "query": "q", "text": false }));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let exa = ExaResearch::new("k").with_base_url("http://localhost:1234/");
        assert_eq!(exa.base_url, "http://localhost:1234");
    }
}
