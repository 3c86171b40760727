//! OpenRouter model implementation.
//!
//! This module provides an implementation of the `Model` trait for
//! OpenAI-compatible chat completions endpoints with function calling.
//! OpenRouter is the default endpoint; `with_base_url` targets any other
//! compatible server.

use async_trait::async_trait;
use cogito_abstraction::{
    ChatMessage, Model, ModelError, ModelRequest, ModelResponse, ModelUsage, ToolCall,
    ToolChoice, ToolSpec,
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Default OpenRouter API root.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// OpenAI-compatible chat model with tool calling.
#[derive(Debug, Clone)]
pub struct OpenRouterModel {
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the API, without a trailing slash.
    base_url: String,
    /// Sent as `X-Title` so requests are attributed to the application.
    app_name: Option<String>,
    /// HTTP client for making requests.
    client: Client,
}

impl OpenRouterModel {
    /// Creates a new `OpenRouterModel` using `OPENROUTER_API_KEY`.
    ///
    /// # Errors
    /// Returns a `ModelError` if the API key is not set.
    #[allow(clippy::disallowed_methods)] // env::var is needed for API key loading
    pub fn from_env() -> Result<Self, ModelError> {
        let api_key = env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ModelError::UnsupportedModelProvider(format!("{API_KEY_ENV} environment variable not set"))
            })?;
        Ok(Self::with_api_key(api_key))
    }

    /// Creates a new `OpenRouterModel` with a custom API key.
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            app_name: None,
            client: Client::new(),
        }
    }

    /// Targets another OpenAI-compatible endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the application name reported to the provider.
    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    /// Uses a preconfigured HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn to_wire_message(message: &ChatMessage) -> WireMessage {
        let tool_calls = (!message.tool_calls.is_empty()).then(|| {
            message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: Some(call.id.clone()),
                    call_type: "function".to_string(),
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: Value::String(call.arguments.to_string()),
                    },
                })
                .collect()
        });
        // Assistant messages that only call tools carry `null` content.
        let content = if message.content.is_empty() && tool_calls.is_some() {
            None
        } else {
            Some(message.content.clone())
        };

        WireMessage {
            role: message.role.to_string(),
            content,
            tool_calls,
            tool_call_id: message.tool_call_id.clone(),
        }
    }

    fn to_wire_tool(spec: &ToolSpec) -> WireTool {
        WireTool {
            tool_type: "function".to_string(),
            function: WireFunction {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.parameters.clone(),
            },
        }
    }

    fn build_request(request: &ModelRequest) -> WireRequest {
        let tools: Vec<WireTool> = request.tools.iter().map(Self::to_wire_tool).collect();
        let has_tools = !tools.is_empty();
        WireRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(Self::to_wire_message).collect(),
            tool_choice: has_tools.then(|| match request.tool_choice {
                ToolChoice::Auto => "auto".to_string(),
                ToolChoice::None => "none".to_string(),
            }),
            tools: has_tools.then_some(tools),
            temperature: request.parameters.temperature,
            max_tokens: request.parameters.max_tokens,
        }
    }

    /// Parses tool calls, tolerating missing ids and malformed arguments.
    ///
    /// Arguments that are not valid JSON are passed through as a string so the
    /// dispatcher reports them as a failed call instead of failing the turn.
    fn parse_tool_calls(tool_calls: Vec<WireToolCall>) -> Vec<ToolCall> {
        tool_calls
            .into_iter()
            .map(|tc| {
                let arguments = match tc.function.arguments {
                    Value::String(raw) if raw.trim().is_empty() => Value::Object(Map::new()),
                    Value::String(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                        warn!(tool = %tc.function.name, error = %e, "Tool arguments are not valid JSON");
                        Value::String(raw)
                    }),
                    Value::Null => Value::Object(Map::new()),
                    other => other,
                };
                let id = tc
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple()));

                ToolCall { id, name: tc.function.name, arguments }
            })
            .collect()
    }
}

/// Maps a non-success HTTP status to a `ModelError`.
pub(crate) fn status_error(provider: &str, status: StatusCode, error_text: String) -> ModelError {
    error!(provider, status = %status, error = %error_text, "Provider returned error status");
    if status == StatusCode::PAYMENT_REQUIRED || status == StatusCode::TOO_MANY_REQUESTS {
        return ModelError::QuotaExceeded { provider: provider.to_string(), message: Some(error_text) };
    }
    ModelError::ModelResponseError(format!("API error ({}): {}", status, error_text))
}

/// Maps a transport failure to a `ModelError`.
pub(crate) fn transport_error(provider: &str, e: &reqwest::Error) -> ModelError {
    error!(provider, error = %e, "Failed to send request");
    if e.is_timeout() {
        ModelError::Timeout(format!("{provider} request timed out: {e}"))
    } else {
        ModelError::RequestError(format!("Network error: {e}"))
    }
}

#[async_trait]
impl Model for OpenRouterModel {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %request.model,
            message_count = request.messages.len(),
            tool_count = request.tools.len(),
            parameters = ?request.parameters,
            "OpenRouterModel generating chat completion"
        );

        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::build_request(request);

        let mut http = self.client.post(&url).bearer_auth(&self.api_key).json(&body);
        if let Some(app_name) = &self.app_name {
            http = http.header("X-Title", app_name);
        }
        let response = http.send().await.map_err(|e| transport_error("openrouter", &e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error("openrouter", status, error_text));
        }

        let wire: WireResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse chat completion response");
            ModelError::SerializationError(format!("Failed to parse response: {}", e))
        })?;

        let choice = wire.choices.into_iter().next().ok_or_else(|| {
            error!("No choices in chat completion response");
            ModelError::ModelResponseError("No choices in API response".to_string())
        })?;

        let usage = wire.usage.map(|u| ModelUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ModelResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls: Self::parse_tool_calls(choice.message.tool_calls.unwrap_or_default()),
            model_id: Some(wire.model.unwrap_or_else(|| request.model.clone())),
            usage,
        })
    }

    fn provider_name(&self) -> &'static str {
        "openrouter"
    }
}

// Chat completions request/response structures

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)] // Matches API naming
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assistant_call_message_has_null_content() {
        let message = ChatMessage::assistant_with_calls(
            "",
            vec![ToolCall { id: "call_1".to_string(), name: "web_search".to_string(), arguments: json!({ "query": "x" }) }],
        );
        let wire = serde_json::to_value(OpenRouterModel::to_wire_message(&message)).unwrap();

        assert_eq!(wire["role"], "assistant");
        assert!(wire["content"].is_null());
        assert_eq!(wire["tool_calls"][0]["function"]["arguments"], r#"{"query":"x"}"#);
    }

    #[test]
    fn test_tool_message_carries_call_id() {
        let wire = serde_json::to_value(OpenRouterModel::to_wire_message(&ChatMessage::tool("call_9", "{}"))).unwrap();
        assert_eq!(wire["role"], "tool");
        assert_eq!(wire["tool_call_id"], "call_9");
    }

    #[test]
    fn test_parse_tool_calls_tolerates_provider_quirks() {
        let calls = OpenRouterModel::parse_tool_calls(vec![
            WireToolCall {
                id: None,
                call_type: "function".to_string(),
                function: WireFunctionCall { name: "save_thought".to_string(), arguments: json!("") },
            },
            WireToolCall {
                id: Some("call_2".to_string()),
                call_type: "function".to_string(),
                function: WireFunctionCall { name: "web_search".to_string(), arguments: json!({ "query": "q" }) },
            },
            WireToolCall {
                id: Some("call_3".to_string()),
                call_type: "function".to_string(),
                function: WireFunctionCall { name: "read_url".to_string(), arguments: json!("{not json") },
            },
        ]);

        assert!(calls[0].id.starts_with("call_"));
        assert_eq!(calls[0].arguments, json!({}));
        assert_eq!(calls[1].arguments["query"], "q");
        assert_eq!(calls[2].arguments, json!("{not json"));
    }

    #[test]
    fn test_request_omits_tool_choice_without_tools() {
        let request = ModelRequest {
            model: "m".to_string(),
            messages: vec![ChatMessage::user("hi")],
            tools: Vec::new(),
            tool_choice: ToolChoice::Auto,
            parameters: cogito_abstraction::ModelParameters::default(),
        };
        let wire = serde_json::to_value(OpenRouterModel::build_request(&request)).unwrap();
        assert!(wire.get("tools").is_none());
        assert!(wire.get("tool_choice").is_none());
        assert_eq!(wire["max_tokens"], 4096);
    }
}
