//! OpenAI-compatible image generation.
//!
//! Posts to `{base_url}/images/generations`. Providers answer with either a
//! hosted URL or inline base64; inline images become `data:` URIs.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use cogito_abstraction::{GeneratedImage, ImageGenerator, ImageRequest, ModelError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::openrouter::{status_error, transport_error};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Environment variable holding the media API key.
pub const API_KEY_ENV: &str = "MEDIA_API_KEY";

/// Longest edge used when only an aspect ratio is requested.
const LONG_EDGE: u32 = 1024;

/// Image generator for `/images/generations` endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiImageGenerator {
    api_key: String,
    base_url: String,
    default_model: String,
    client: Client,
}

impl OpenAiImageGenerator {
    /// Creates a generator using `default_model` when a request names none.
    #[must_use]
    pub fn new(api_key: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: default_model.into(),
            client: Client::new(),
        }
    }

    /// Targets another OpenAI-compatible endpoint.
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
}

/// Resolve the `size` field from explicit dimensions or an aspect ratio.
///
/// Dimensions win when both are given. A ratio such as `"3:4"` is scaled so
/// the longer edge is 1024 pixels, rounded down to a multiple of 64.
fn size_for(request: &ImageRequest) -> Option<String> {
    if let (Some(width), Some(height)) = (request.width, request.height) {
        return Some(format!("{width}x{height}"));
    }
    let (w, h) = request.aspect_ratio.as_deref()?.split_once(':')?;
    let (w, h) = (w.trim().parse::<u32>().ok()?, h.trim().parse::<u32>().ok()?);
    if w == 0 || h == 0 {
        return None;
    }
    let (width, height) = if w >= h {
        (LONG_EDGE, (LONG_EDGE * h / w) / 64 * 64)
    } else {
        ((LONG_EDGE * w / h) / 64 * 64, LONG_EDGE)
    };
    Some(format!("{}x{}", width.max(64), height.max(64)))
}

/// Turn inline base64 image data into a `data:` URI
fn data_uri(b64: &str) -> Result<String, ModelError> {
    let bytes = STANDARD
        .decode(b64.trim())
        .map_err(|e| ModelError::SerializationError(format!("Invalid base64 image data: {e}")))?;
    let mime = match bytes.as_slice() {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "application/octet-stream",
    };
    Ok(format!("data:{mime};base64,{}", b64.trim()))
}

#[async_trait]
impl ImageGenerator for OpenAiImageGenerator {
    async fn generate(&self, request: &ImageRequest) -> Result<GeneratedImage, ModelError> {
        let model = request.model.clone().unwrap_or_else(|| self.default_model.clone());
        let body = GenerationRequest { model: &model, prompt: &request.prompt, n: 1, size: size_for(request) };
        debug!(model = %model, size = ?body.size, prompt_len = request.prompt.len(), "Image generation request");

        let url = format!("{}/images/generations", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("images", &e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error("images", status, error_text));
        }

        let wire: GenerationResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse image generation response");
            ModelError::SerializationError(format!("Failed to parse response: {}", e))
        })?;

        let image = wire
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::ModelResponseError("No image in API response".to_string()))?;
        let reference = match (image.url, image.b64_json) {
            (Some(url), _) if !url.is_empty() => url,
            (_, Some(b64)) => data_uri(&b64)?,
            _ => return Err(ModelError::ModelResponseError("Image has neither url nor data".to_string())),
        };

        Ok(GeneratedImage { reference, model })
    }
}

// Image generation request/response structures

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedData>,
}

#[derive(Debug, Deserialize)]
struct GeneratedData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(width: Option<u32>, height: Option<u32>, aspect_ratio: Option<&str>) -> ImageRequest {
        ImageRequest {
            prompt: "p".to_string(),
            width,
            height,
            aspect_ratio: aspect_ratio.map(str::to_string),
            model: None,
        }
    }

    #[test]
    fn test_size_for() {
        assert_eq!(size_for(&request(Some(512), Some(512), Some("3:4"))).as_deref(), Some("512x512"));
        assert_eq!(size_for(&request(None, None, Some("3:4"))).as_deref(), Some("768x1024"));
        assert_eq!(size_for(&request(None, None, Some("16:9"))).as_deref(), Some("1024x576"));
        assert_eq!(size_for(&request(Some(512), None, None)), None);
        assert_eq!(size_for(&request(None, None, Some("wide"))), None);
    }

    #[test]
    fn test_data_uri_sniffs_png() {
        let png = STANDARD.encode([0x89, b'P', b'N', b'G', 0x0D, 0x0A]);
        assert!(data_uri(&png).unwrap().starts_with("data:image/png;base64,"));
        assert!(data_uri("%%%").is_err());
    }
}
