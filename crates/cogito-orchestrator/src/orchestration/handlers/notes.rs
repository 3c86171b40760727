//! `save_thought`: the model's private scratchpad.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::Result;
use crate::orchestration::context::ConversationState;
use crate::orchestration::tool::{ToolArguments, ToolHandler};

/// Appends a turn-labelled note to the run's notes. Makes no external call.
#[derive(Debug, Default)]
pub struct SaveThoughtHandler;

#[async_trait]
impl ToolHandler for SaveThoughtHandler {
    async fn execute(&self, args: &ToolArguments, state: &mut ConversationState) -> Result<Value> {
        // Presence is checked at dispatch; other JSON values are kept as text
        let thought = match args.args.get("thought") {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let total = state.push_note(&thought);
        Ok(json!({ "saved": true, "totalNotes": total }))
    }
}
