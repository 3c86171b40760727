// Per-run conversation state
//
// `ConversationState` is created at run start, owned by exactly one engine
// invocation and dropped when the run ends. `Transcript` is the append-only
// message log sent to the model each turn.

use cogito_abstraction::{ChatMessage, Role};
use serde::Serialize;

use super::tool::ToolResult;

/// Mutable state of one Deep Thought run
#[derive(Debug, Clone, Serialize)]
pub struct ConversationState {
    max_turns: u32,
    current_turn: u32,
    user_query: String,
    notes: Vec<String>,
    tool_results: Vec<ToolResult>,
}

impl ConversationState {
    /// Create the state for a new run
    pub fn new(user_query: impl Into<String>, max_turns: u32) -> Self {
        Self {
            max_turns,
            current_turn: 0,
            user_query: user_query.into(),
            notes: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    /// Turn budget for this run
    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    /// Current turn, 0 before the first model call
    pub fn current_turn(&self) -> u32 {
        self.current_turn
    }

    /// The question being answered
    pub fn user_query(&self) -> &str {
        &self.user_query
    }

    /// Scratchpad notes in insertion order
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Tool outcomes in execution order
    pub fn tool_results(&self) -> &[ToolResult] {
        &self.tool_results
    }

    /// Move to the next turn, returning its number, or `None` once the budget is spent
    pub fn begin_turn(&mut self) -> Option<u32> {
        if self.current_turn >= self.max_turns {
            return None;
        }
        self.current_turn += 1;
        Some(self.current_turn)
    }

    /// Append a note labelled with the current turn
    pub fn push_note(&mut self, thought: &str) -> usize {
        self.notes.push(format!("[Turn {}] {}", self.current_turn, thought.trim()));
        self.notes.len()
    }

    /// Append a tool outcome
    pub(crate) fn record(&mut self, result: ToolResult) {
        debug_assert!(
            self.tool_results.last().is_none_or(|last| last.turn <= result.turn),
            "tool results must be recorded in turn order"
        );
        self.tool_results.push(result);
    }

    /// Notes joined into the thinking process shown to the user
    pub fn thinking_process(&self) -> String {
        self.notes.join("\n")
    }
}

/// Append-only ordered message log
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    /// Create an empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Messages in order
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing has been appended
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent non-empty assistant content
    pub fn last_assistant_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.content.trim())
            .find(|c| !c.is_empty())
    }

    /// Consume into the message list
    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turns_never_exceed_budget() {
        let mut state = ConversationState::new("weather in Paris?", 2);
        assert_eq!(state.user_query(), "weather in Paris?");
        assert_eq!(state.current_turn(), 0);
        assert_eq!(state.begin_turn(), Some(1));
        assert_eq!(state.begin_turn(), Some(2));
        assert_eq!(state.begin_turn(), None);
        assert_eq!(state.current_turn(), 2);
    }

    #[test]
    fn test_notes_are_turn_labelled() {
        let mut state = ConversationState::new("q", 3);
        state.begin_turn();
        assert_eq!(state.push_note("  check the forecast "), 1);
        state.begin_turn();
        state.push_note("compare sources");

        assert_eq!(state.notes()[0], "[Turn 1] check the forecast");
        assert_eq!(state.thinking_process(), "[Turn 1] check the forecast\n[Turn 2] compare sources");
    }

    #[test]
    fn test_last_assistant_content_skips_empty() {
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::user("hi"));
        transcript.push(ChatMessage::assistant("first draft"));
        transcript.push(ChatMessage::assistant_with_calls("", vec![]));
        transcript.push(ChatMessage::tool("call_1", "{}"));

        assert_eq!(transcript.last_assistant_content(), Some("first draft"));
        assert_eq!(transcript.len(), 4);
    }
}
