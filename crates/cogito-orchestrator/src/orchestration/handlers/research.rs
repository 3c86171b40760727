//! Web search and page reading.
//!
//! Both tools always ask the provider for fresh results: their purpose is to
//! reach past the model's training data, so cached answers are never wanted.

use async_trait::async_trait;
use cogito_abstraction::WebResearch;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

use crate::error::{OrchestrationError, Result};
use crate::orchestration::context::ConversationState;
use crate::orchestration::tool::{ToolArguments, ToolHandler};

/// `web_search`: synthesized answer plus sources
pub struct WebSearchHandler {
    research: Arc<dyn WebResearch>,
}

impl WebSearchHandler {
    /// Create a handler backed by `research`
    pub fn new(research: Arc<dyn WebResearch>) -> Self {
        Self { research }
    }
}

#[async_trait]
impl ToolHandler for WebSearchHandler {
    async fn execute(&self, args: &ToolArguments, _state: &mut ConversationState) -> Result<Value> {
        let query = args.require_text("query")?;
        debug!(query = %query, "Running web search");

        let answer = self.research.search(&query, true).await?;
        Ok(json!({
            "answer": answer.answer,
            "sources": answer.sources,
            "query": query,
        }))
    }
}

/// `read_url`: readable page content
pub struct ReadUrlHandler {
    research: Arc<dyn WebResearch>,
    max_chars: usize,
}

impl ReadUrlHandler {
    /// Create a handler keeping at most `max_chars` characters of content
    pub fn new(research: Arc<dyn WebResearch>, max_chars: usize) -> Self {
        Self { research, max_chars }
    }
}

#[async_trait]
impl ToolHandler for ReadUrlHandler {
    async fn execute(&self, args: &ToolArguments, _state: &mut ConversationState) -> Result<Value> {
        let url = args.require_text("url")?;
        let scheme = url.split_once("://").map(|(scheme, _)| scheme.to_ascii_lowercase());
        if !matches!(scheme.as_deref(), Some("http" | "https")) {
            return Err(OrchestrationError::InvalidToolArguments {
                tool: args.tool.clone(),
                reason: format!("'{}' is not an http(s) URL", url),
            });
        }
        debug!(url = %url, "Reading page");

        let page = self.research.read_page(&url, true).await?;
        let resolved_url = if page.url.is_empty() { url } else { page.url };
        let mut result = json!({
            "content": truncate_chars(&page.content, self.max_chars),
            "url": resolved_url,
        });
        if let Some(title) = page.title {
            result["title"] = Value::String(title);
        }
        Ok(result)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}\n\n[content truncated after {} characters]", &text[..cut], max_chars),
        None => text.to_string(),
    }
}
