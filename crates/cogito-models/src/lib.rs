//! Collaborator implementations for Cogito.
//!
//! This crate provides concrete implementations of the contracts in
//! `cogito-abstraction`.
//!
//! # Supported Providers
//!
//! - **Mock**: Scripted replies for tests and development
//! - **OpenRouter**: Any OpenAI-compatible chat completions endpoint with function calling
//! - **Exa**: Web search answers and live page extraction
//! - **Images**: OpenAI-compatible image generation
//! - **Video**: Job-based video generation with a model-driven director step

pub mod exa;
pub mod images;
pub mod openrouter;
pub mod video;

use async_trait::async_trait;
use cogito_abstraction::{
    Model, ModelError, ModelRequest, ModelResponse, ModelUsage, Role, ToolCall,
};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

pub use exa::ExaResearch;
pub use images::OpenAiImageGenerator;
pub use openrouter::OpenRouterModel;
pub use video::{DirectedVideoGenerator, VideoConfig};

/// A scripted implementation of the `Model` trait for testing and demonstration.
///
/// Replies are served in the order they were queued. Once the script is
/// exhausted the model echoes the latest user message.
#[derive(Debug, Default)]
pub struct MockModel {
    id: String,
    script: Mutex<VecDeque<Result<ModelResponse, ModelError>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl MockModel {
    /// Creates a new `MockModel` with the given ID and an empty script.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }

    /// Queues a plain text reply.
    #[must_use]
    pub fn with_reply(self, content: impl Into<String>) -> Self {
        self.push(Ok(ModelResponse { content: content.into(), ..ModelResponse::default() }));
        self
    }

    /// Queues a reply that calls tools.
    #[must_use]
    pub fn with_tool_calls(self, tool_calls: Vec<ToolCall>) -> Self {
        self.push(Ok(ModelResponse { tool_calls, ..ModelResponse::default() }));
        self
    }

    /// Queues a fully specified reply.
    #[must_use]
    pub fn with_response(self, response: ModelResponse) -> Self {
        self.push(Ok(response));
        self
    }

    /// Queues a failure.
    #[must_use]
    pub fn with_error(self, error: ModelError) -> Self {
        self.push(Err(error));
        self
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of scripted replies not yet served.
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn push(&self, entry: Result<ModelResponse, ModelError>) {
        self.script.lock().unwrap_or_else(PoisonError::into_inner).push_back(entry);
    }

    fn echo(&self, request: &ModelRequest) -> ModelResponse {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map_or("", |m| m.content.as_str());
        ModelResponse { content: format!("Mock response for: {last_user}"), ..ModelResponse::default() }
    }
}

#[async_trait]
impl Model for MockModel {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.id,
            message_count = request.messages.len(),
            tool_count = request.tools.len(),
            "MockModel generating reply"
        );
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(request.clone());

        let next = self.script.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        let mut response = match next {
            Some(entry) => entry?,
            None => self.echo(request),
        };

        if response.usage.is_none() {
            let prompt_tokens = request.messages.iter().map(|m| count_tokens(&m.content)).sum::<u32>();
            let completion_tokens = count_tokens(&response.content);
            response.usage = Some(ModelUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            });
        }
        response.model_id.get_or_insert_with(|| self.id.clone());
        Ok(response)
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Count tokens in a string (simplified: word count).
#[allow(clippy::cast_possible_truncation)]
fn count_tokens(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}
