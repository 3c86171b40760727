//! Job-based video generation with a director step.
//!
//! A chat model first decides the cinematography for the requested clip
//! (camera movement, pacing, framing). The decision is appended to the prompt,
//! a job is submitted to `{base_url}/videos`, and the job is polled until it
//! completes, fails or runs out of attempts.

use async_trait::async_trait;
use cogito_abstraction::{
    ChatMessage, GeneratedVideo, Model, ModelError, ModelParameters, ModelRequest, ToolChoice,
    VideoGenerator, VideoRequest,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::openrouter::{status_error, transport_error};

const DIRECTOR_PROMPT: &str = "You are a film director planning a short generated video clip. \
Given the scene description and duration, decide the camera movement, shot framing, pacing and \
lighting in two or three sentences. Reply with the direction only.";

/// Settings for the video provider and its director step.
#[derive(Debug, Clone)]
pub struct VideoConfig {
    /// API root of the video provider.
    pub base_url: String,
    /// Video model used when a request names none.
    pub default_model: String,
    /// Chat model that writes the direction.
    pub director_model: String,
    /// Delay between status polls.
    pub poll_interval: Duration,
    /// Status polls before giving up.
    pub max_polls: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            default_model: "sora-2".to_string(),
            director_model: "openai/gpt-4o-mini".to_string(),
            poll_interval: Duration::from_secs(5),
            max_polls: 120,
        }
    }
}

/// Video generator that plans the shot with a chat model before rendering.
pub struct DirectedVideoGenerator {
    api_key: String,
    director: Arc<dyn Model>,
    config: VideoConfig,
    client: Client,
}

impl DirectedVideoGenerator {
    /// Creates a generator.
    pub fn new(api_key: impl Into<String>, director: Arc<dyn Model>, config: VideoConfig) -> Self {
        let config = VideoConfig { base_url: config.base_url.trim_end_matches('/').to_string(), ..config };
        Self { api_key: api_key.into(), director, config, client: Client::new() }
    }

    /// Uses a preconfigured HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    async fn direct(&self, request: &VideoRequest) -> Result<String, ModelError> {
        let director_request = ModelRequest {
            model: self.config.director_model.clone(),
            messages: vec![
                ChatMessage::system(DIRECTOR_PROMPT),
                ChatMessage::user(format!(
                    "Scene: {}\nDuration: {} seconds",
                    request.prompt, request.duration_seconds
                )),
            ],
            tools: Vec::new(),
            tool_choice: ToolChoice::None,
            parameters: ModelParameters { temperature: Some(0.8), max_tokens: Some(300) },
        };
        let reply = self.director.generate(&director_request).await?;
        let decision = reply.content.trim().to_string();
        if decision.is_empty() {
            return Err(ModelError::ModelResponseError("Director returned no direction".to_string()));
        }
        Ok(decision)
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ModelError> {
        let response = builder
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| transport_error("video", &e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error("video", status, error_text));
        }
        response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse video job response");
            ModelError::SerializationError(format!("Failed to parse response: {}", e))
        })
    }

    async fn poll(&self, mut job: VideoJob) -> Result<String, ModelError> {
        let url = format!("{}/videos/{}", self.config.base_url, job.id);
        for attempt in 0..=self.config.max_polls {
            match job.state() {
                JobState::Done(reference) => return Ok(reference),
                JobState::Failed(reason) => {
                    return Err(ModelError::ModelResponseError(format!("Video job {} failed: {reason}", job.id)));
                }
                JobState::Pending if attempt == self.config.max_polls => break,
                JobState::Pending => {}
            }
            debug!(job_id = %job.id, status = %job.status, attempt, "Video job pending");
            tokio::time::sleep(self.config.poll_interval).await;
            job = self.send_json(self.client.get(&url)).await?;
        }
        Err(ModelError::Timeout(format!(
            "Video job {} did not finish after {} polls",
            job.id, self.config.max_polls
        )))
    }
}

#[async_trait]
impl VideoGenerator for DirectedVideoGenerator {
    async fn generate(&self, request: &VideoRequest) -> Result<GeneratedVideo, ModelError> {
        let decision = self.direct(request).await?;
        let model = request.model.clone().unwrap_or_else(|| self.config.default_model.clone());
        debug!(model = %model, decision = %decision, "Submitting video job");

        let body = JobRequest {
            model: &model,
            prompt: format!("{}\n\nDirection: {}", request.prompt, decision),
            seconds: request.duration_seconds,
        };
        let url = format!("{}/videos", self.config.base_url);
        let job: VideoJob = self.send_json(self.client.post(&url).json(&body)).await?;
        info!(job_id = %job.id, "Video job submitted");

        let reference = self.poll(job).await?;
        Ok(GeneratedVideo { reference, model, decision })
    }
}

impl std::fmt::Debug for DirectedVideoGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectedVideoGenerator")
            .field("director", &self.director.provider_name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// Video job request/response structures

#[derive(Debug, Serialize)]
struct JobRequest<'a> {
    model: &'a str,
    prompt: String,
    seconds: u32,
}

#[derive(Debug, Deserialize)]
struct VideoJob {
    id: String,
    status: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

enum JobState {
    Pending,
    Done(String),
    Failed(String),
}

impl VideoJob {
    fn state(&self) -> JobState {
        match self.status.to_ascii_lowercase().as_str() {
            "completed" | "succeeded" => match self.url.as_deref().filter(|u| !u.is_empty()) {
                Some(url) => JobState::Done(url.to_string()),
                None => JobState::Failed("completed without a video url".to_string()),
            },
            "failed" | "cancelled" | "canceled" => {
                JobState::Failed(self.error.clone().unwrap_or_else(|| self.status.clone()))
            }
            _ => JobState::Pending,
        }
    }
}
