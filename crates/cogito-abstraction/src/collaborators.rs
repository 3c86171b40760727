//! Contracts for the capability providers behind the tools.
//!
//! The engine never talks to a search or generation API directly; it goes
//! through these traits so providers can be swapped or faked.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ModelError;

/// A synthesized answer to a web query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchAnswer {
    /// The provider's answer text.
    pub answer: String,
    /// Source URLs backing the answer.
    pub sources: Vec<String>,
}

/// Text extracted from a web page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    /// Extracted page text.
    pub content: String,
    /// The URL that was read (after redirects when the provider reports it).
    pub url: String,
    /// Page title, when known.
    pub title: Option<String>,
}

/// Search and page-extraction provider.
#[async_trait]
pub trait WebResearch: Send + Sync {
    /// Answers `query` from the live web.
    ///
    /// `fresh` asks the provider to bypass any cached results.
    async fn search(&self, query: &str, fresh: bool) -> Result<SearchAnswer, ModelError>;

    /// Extracts readable content from `url`.
    async fn read_page(&self, url: &str, fresh: bool) -> Result<PageContent, ModelError>;
}

/// Image generation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    /// Full natural-language description of the image.
    pub prompt: String,
    /// Width override in pixels.
    pub width: Option<u32>,
    /// Height override in pixels.
    pub height: Option<u32>,
    /// Aspect ratio such as "3:4", used when no explicit size is given.
    pub aspect_ratio: Option<String>,
    /// Model override.
    pub model: Option<String>,
}

/// Result of an image generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// URL or data URI of the image.
    pub reference: String,
    /// Model that actually produced the image.
    pub model: String,
}

/// Image generation provider.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generates one image.
    async fn generate(&self, request: &ImageRequest) -> Result<GeneratedImage, ModelError>;
}

/// Video generation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRequest {
    /// Full natural-language description of the clip.
    pub prompt: String,
    /// Requested clip length in seconds.
    pub duration_seconds: u32,
    /// Model override.
    pub model: Option<String>,
}

/// Result of a video generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedVideo {
    /// URL of the rendered clip.
    pub reference: String,
    /// Model that actually produced the clip.
    pub model: String,
    /// The provider's own cinematography decision.
    pub decision: String,
}

/// Video generation provider.
///
/// Implementations may run their own reasoning step and poll a job API;
/// callers simply await the combined result.
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    /// Generates one clip.
    async fn generate(&self, request: &VideoRequest) -> Result<GeneratedVideo, ModelError>;
}
