//! Image and video generation.

use async_trait::async_trait;
use cogito_abstraction::{ImageGenerator, ImageRequest, VideoGenerator, VideoRequest};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::orchestration::context::ConversationState;
use crate::orchestration::tool::{ToolArguments, ToolHandler};

/// `generate_image`: forwards the model-authored description as-is
pub struct GenerateImageHandler {
    images: Arc<dyn ImageGenerator>,
}

impl GenerateImageHandler {
    /// Create a handler backed by `images`
    pub fn new(images: Arc<dyn ImageGenerator>) -> Self {
        Self { images }
    }
}

#[async_trait]
impl ToolHandler for GenerateImageHandler {
    async fn execute(&self, args: &ToolArguments, _state: &mut ConversationState) -> Result<Value> {
        let request = ImageRequest {
            prompt: args.require_text("prompt")?,
            width: args.get_u32("width")?,
            height: args.get_u32("height")?,
            aspect_ratio: None,
            model: args.get_text("model"),
        };
        debug!(prompt_len = request.prompt.len(), "Generating image");

        let image = self.images.generate(&request).await?;
        let mut metadata = json!({ "model": image.model });
        if let Some(width) = request.width {
            metadata["width"] = json!(width);
        }
        if let Some(height) = request.height {
            metadata["height"] = json!(height);
        }

        Ok(json!({
            "imageReference": image.reference,
            "prompt": request.prompt,
            "metadata": metadata,
        }))
    }
}

/// `generate_video`: the provider decides cinematography itself
pub struct GenerateVideoHandler {
    videos: Arc<dyn VideoGenerator>,
    default_duration: u32,
}

impl GenerateVideoHandler {
    /// Create a handler using `default_duration` seconds when none is given
    pub fn new(videos: Arc<dyn VideoGenerator>, default_duration: u32) -> Self {
        Self { videos, default_duration }
    }
}

#[async_trait]
impl ToolHandler for GenerateVideoHandler {
    async fn execute(&self, args: &ToolArguments, _state: &mut ConversationState) -> Result<Value> {
        let request = VideoRequest {
            prompt: args.require_text("prompt")?,
            duration_seconds: args.get_u32("duration")?.unwrap_or(self.default_duration),
            model: args.get_text("model"),
        };
        debug!(duration = request.duration_seconds, "Generating video");

        let video = self.videos.generate(&request).await?;
        Ok(json!({
            "videoReference": video.reference,
            "prompt": request.prompt,
            "duration": request.duration_seconds,
            "aiDecision": video.decision,
            "model": video.model,
        }))
    }
}
