// Error types for orchestration

use std::time::Duration;

use cogito_abstraction::ModelError;
use thiserror::Error;

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

/// Orchestration errors
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// The model asked for a tool that does not exist or is not offered in this run
    #[error("Unknown tool '{name}'. Valid tools: {valid}")]
    UnknownTool {
        /// Requested tool name
        name: String,
        /// Comma-separated list of tools the model may call
        valid: String,
    },

    /// A required parameter was absent or null
    #[error("Missing required parameter '{parameter}' for tool '{tool}'")]
    MissingParameter {
        /// Tool name
        tool: String,
        /// Name of the first missing parameter
        parameter: String,
    },

    /// Invalid tool arguments
    #[error("Invalid tool arguments for '{tool}': {reason}")]
    InvalidToolArguments {
        /// Tool name
        tool: String,
        /// Reason why arguments are invalid
        reason: String,
    },

    /// Tool execution failed
    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    /// Collaborator error (text generation, search, media)
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// The model replied with neither content nor tool calls
    #[error("Model returned an empty reply on turn {0}")]
    EmptyReply(u32),

    /// The caller cancelled the run
    #[error("run cancelled")]
    Cancelled,

    /// The run deadline passed
    #[error("run deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    /// Invalid engine configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
