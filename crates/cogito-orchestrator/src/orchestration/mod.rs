// Orchestration module - Deep Thought delegation engine
//
// The engine offers the model a filtered tool catalog, dispatches the calls it
// makes and decides turn by turn whether to keep working or to answer.

pub mod catalog;
pub mod classify;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod engine;
pub mod handlers;
pub mod prompt;
pub mod tool;

use cogito_abstraction::{ChatMessage, ModelUsage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use self::tool::ToolResult;
use crate::progress::ProgressObserver;

/// Turn budget used when the caller does not pick one
pub const DEFAULT_MAX_TURNS: u32 = 5;

/// Reasons why a run finished
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// A reply was classified as the final answer
    Answered,
    /// The model called `finish`
    FinishTool,
    /// The turn budget ran out; the answer is best-effort
    MaxTurns,
    /// Cancelled by the caller or the deadline
    Cancelled,
    /// Model failure or empty reply
    Error,
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Answered => write!(f, "answered"),
            Self::FinishTool => write!(f, "finish_tool"),
            Self::MaxTurns => write!(f, "max_turns"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Input of one Deep Thought run
#[derive(Clone)]
pub struct RunRequest {
    /// The question to answer
    pub user_query: String,
    /// Requested turn budget, clamped by the engine
    pub max_turns: u32,
    /// Model identifier passed to the text-generation collaborator
    pub model: String,
    /// Replaces the base system prompt; the tool appendix is kept
    pub system_prompt_override: Option<String>,
    /// Receives phase transitions
    pub on_progress: Option<Arc<dyn ProgressObserver>>,
    /// Caller-owned cancellation
    pub cancel: Option<CancellationToken>,
    /// Wall-clock limit for the whole run
    pub deadline: Option<Duration>,
}

impl RunRequest {
    /// Create a request with the default turn budget
    pub fn new(user_query: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            user_query: user_query.into(),
            max_turns: DEFAULT_MAX_TURNS,
            model: model.into(),
            system_prompt_override: None,
            on_progress: None,
            cancel: None,
            deadline: None,
        }
    }

    /// Set the turn budget
    #[must_use]
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Replace the base system prompt
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt_override = Some(prompt.into());
        self
    }

    /// Attach a progress observer
    #[must_use]
    pub fn with_progress(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.on_progress = Some(observer);
        self
    }

    /// Attach a cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Limit the run's wall-clock time
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

impl fmt::Debug for RunRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunRequest")
            .field("user_query", &self.user_query)
            .field("max_turns", &self.max_turns)
            .field("model", &self.model)
            .field("system_prompt_override", &self.system_prompt_override.is_some())
            .field("on_progress", &self.on_progress.is_some())
            .field("cancel", &self.cancel.is_some())
            .field("deadline", &self.deadline)
            .finish()
    }
}

/// Outcome of one Deep Thought run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Answer text; empty when the run failed
    pub final_response: String,
    /// Notes joined with newlines
    pub thinking_process: String,
    /// Every dispatched call in execution order
    pub tool_results: Vec<ToolResult>,
    /// Model round-trips made
    pub turns_used: u32,
    /// Whether an answer was produced
    pub success: bool,
    /// Failure description when `success` is false
    pub error: Option<String>,
    /// How the run ended
    pub finish_reason: FinishReason,
    /// Messages exchanged, system prompt first
    pub transcript: Vec<ChatMessage>,
    /// Token usage summed over all turns
    pub usage: ModelUsage,
}

impl RunResult {
    /// Number of tool calls that failed
    pub fn failed_tool_calls(&self) -> usize {
        self.tool_results.iter().filter(|r| !r.success).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_reason_display() {
        assert_eq!(FinishReason::Answered.to_string(), "answered");
        assert_eq!(FinishReason::FinishTool.to_string(), "finish_tool");
        assert_eq!(FinishReason::MaxTurns.to_string(), "max_turns");
        assert_eq!(FinishReason::Cancelled.to_string(), "cancelled");
        assert_eq!(FinishReason::Error.to_string(), "error");
    }

    #[test]
    fn test_run_request_builders() {
        let request = RunRequest::new("why is the sky blue?", "openai/gpt-4o")
            .with_max_turns(8)
            .with_system_prompt("Be brief.")
            .with_deadline(Duration::from_secs(30));

        assert_eq!(request.max_turns, 8);
        assert_eq!(request.system_prompt_override.as_deref(), Some("Be brief."));
        assert_eq!(request.deadline, Some(Duration::from_secs(30)));
        assert!(request.on_progress.is_none());
        assert!(format!("{request:?}").contains("openai/gpt-4o"));
    }

    #[test]
    fn test_default_turn_budget() {
        assert_eq!(RunRequest::new("q", "m").max_turns, DEFAULT_MAX_TURNS);
    }
}
