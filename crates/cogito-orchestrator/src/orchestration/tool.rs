// Tool abstractions for orchestration
//
// Handlers implement one capability each. The dispatcher owns validation and
// outcome wrapping, so a handler only has to turn arguments into output.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::context::ConversationState;
use crate::error::{OrchestrationError, Result};

pub use cogito_abstraction::ToolCall;

/// Arguments passed to tool handler
#[derive(Debug, Clone)]
pub struct ToolArguments {
    /// Tool the arguments belong to
    pub tool: String,
    /// Parsed arguments as JSON value
    pub args: Value,
}

impl ToolArguments {
    /// Create new tool arguments
    pub fn new(tool: impl Into<String>, args: Value) -> Self {
        Self { tool: tool.into(), args }
    }

    /// Get argument as string
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.args.get(key)?.as_str().map(str::to_string)
    }

    /// Get a non-blank string argument, trimmed
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.get_string(key).map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    }

    /// Get argument as u32, accepting numeric strings
    ///
    /// Absent and null arguments are `Ok(None)`; anything else that is not a
    /// non-negative whole number is an error.
    pub fn get_u32(&self, key: &str) -> Result<Option<u32>> {
        let parsed = match self.args.get(key) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
            Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
            Some(_) => None,
        };
        parsed.map(Some).ok_or_else(|| OrchestrationError::InvalidToolArguments {
            tool: self.tool.clone(),
            reason: format!("'{}' must be a non-negative whole number", key),
        })
    }

    /// Get a required string argument
    pub fn require_text(&self, key: &str) -> Result<String> {
        self.get_text(key).ok_or_else(|| OrchestrationError::InvalidToolArguments {
            tool: self.tool.clone(),
            reason: format!("'{}' must be a non-empty string", key),
        })
    }
}

/// Outcome record of one dispatched tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Turn the call was made in
    pub turn: u32,
    /// Tool name as requested
    pub tool: String,
    /// Identifier of the call that produced this result
    pub call_id: String,
    /// Arguments as requested
    pub input: Value,
    /// Handler output, or `{"error": message}` on failure
    pub output: Value,
    /// Whether execution succeeded
    pub success: bool,
    /// When the outcome was recorded
    pub timestamp: DateTime<Utc>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(turn: u32, call: &ToolCall, output: Value) -> Self {
        Self::build(turn, call, output, true)
    }

    /// Create a failed result carrying the error message
    pub fn failure(turn: u32, call: &ToolCall, error: impl Into<String>) -> Self {
        Self::build(turn, call, json!({ "error": error.into() }), false)
    }

    fn build(turn: u32, call: &ToolCall, output: Value, success: bool) -> Self {
        Self {
            turn,
            tool: call.name.clone(),
            call_id: call.id.clone(),
            input: call.arguments.clone(),
            output,
            success,
            timestamp: Utc::now(),
        }
    }

    /// Error message of a failed result
    pub fn error_message(&self) -> Option<&str> {
        if self.success {
            return None;
        }
        self.output.get("error").and_then(Value::as_str)
    }

    /// Content of the tool message sent back to the model
    pub fn to_message_content(&self) -> String {
        self.output.to_string()
    }
}

/// Handler for tool execution
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute the tool with validated arguments
    ///
    /// Errors are converted into failed `ToolResult`s by the dispatcher and
    /// never abort the run.
    async fn execute(&self, args: &ToolArguments, state: &mut ConversationState) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call() -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: "web_search".to_string(),
            arguments: json!({ "query": "paris weather" }),
        }
    }

    #[test]
    fn test_tool_arguments_getters() {
        let args = ToolArguments::new(
            "generate_image",
            json!({ "prompt": "  a fox  ", "width": 512, "height": "768", "blank": " " }),
        );

        assert_eq!(args.get_string("prompt"), Some("  a fox  ".to_string()));
        assert_eq!(args.get_text("prompt"), Some("a fox".to_string()));
        assert_eq!(args.get_text("blank"), None);
        assert_eq!(args.get_u32("width").unwrap(), Some(512));
        assert_eq!(args.get_u32("height").unwrap(), Some(768));
        assert_eq!(args.get_u32("missing").unwrap(), None);
    }

    #[test]
    fn test_tool_arguments_rejects_bad_numbers() {
        let args = ToolArguments::new("generate_image", json!({ "width": -3, "height": "tall" }));
        assert!(args.get_u32("width").is_err());
        let err = args.get_u32("height").unwrap_err();
        assert!(err.to_string().contains("'height'"));
    }

    #[test]
    fn test_tool_result_success() {
        let result = ToolResult::success(2, &call(), json!({ "answer": "sunny" }));
        assert!(result.success);
        assert_eq!(result.turn, 2);
        assert_eq!(result.call_id, "call_1");
        assert_eq!(result.input["query"], "paris weather");
        assert_eq!(result.error_message(), None);
    }

    #[test]
    fn test_tool_result_failure() {
        let result = ToolResult::failure(1, &call(), "provider down");
        assert!(!result.success);
        assert_eq!(result.error_message(), Some("provider down"));
        assert_eq!(result.to_message_content(), r#"{"error":"provider down"}"#);
    }
}
