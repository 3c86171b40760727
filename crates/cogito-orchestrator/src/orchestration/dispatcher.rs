// Tool dispatcher
//
// Executes exactly one tool call and always returns a `ToolResult`. Validation
// failures, provider errors and cancellation all become failed results at this
// boundary; nothing a handler does can abort the run.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    catalog::{self, CapabilityKeys, ToolDescriptor},
    config::EngineConfig,
    context::ConversationState,
    handlers::{
        Collaborators, GenerateImageHandler, GenerateSelfieHandler, GenerateVideoHandler,
        ReadUrlHandler, SaveThoughtHandler, WebSearchHandler,
    },
    tool::{ToolArguments, ToolCall, ToolHandler, ToolResult},
};
use crate::error::{OrchestrationError, Result};

/// Per-run dispatch context
#[derive(Debug, Clone)]
pub struct DispatchScope {
    /// Authorization snapshot taken at run start
    pub keys: CapabilityKeys,
    /// Cancels in-flight handlers
    pub cancel: CancellationToken,
}

impl DispatchScope {
    /// Create a scope for one run
    pub fn new(keys: CapabilityKeys, cancel: CancellationToken) -> Self {
        Self { keys, cancel }
    }
}

/// Registry of tool handlers keyed by catalog name
#[derive(Clone, Default)]
pub struct ToolDispatcher {
    handlers: HashMap<&'static str, Arc<dyn ToolHandler>>,
}

impl ToolDispatcher {
    /// Create an empty dispatcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every standard handler whose provider is present
    pub fn standard(collaborators: &Collaborators, config: &EngineConfig) -> Self {
        let mut dispatcher = Self::new();
        dispatcher.insert(catalog::SAVE_THOUGHT, Arc::new(SaveThoughtHandler));

        if let Some(research) = &collaborators.research {
            dispatcher.insert(catalog::WEB_SEARCH, Arc::new(WebSearchHandler::new(Arc::clone(research))));
            dispatcher.insert(
                catalog::READ_URL,
                Arc::new(ReadUrlHandler::new(Arc::clone(research), config.read_url_max_chars)),
            );
        }
        if let Some(images) = &collaborators.images {
            dispatcher
                .insert(catalog::GENERATE_IMAGE, Arc::new(GenerateImageHandler::new(Arc::clone(images))));
            dispatcher.insert(
                catalog::GENERATE_SELFIE,
                Arc::new(GenerateSelfieHandler::new(Arc::clone(images), config.persona.clone())),
            );
        }
        if let Some(videos) = &collaborators.videos {
            dispatcher.insert(
                catalog::GENERATE_VIDEO,
                Arc::new(GenerateVideoHandler::new(Arc::clone(videos), config.video_default_duration)),
            );
        }
        dispatcher
    }

    /// Bind a handler to a catalog tool, replacing any previous binding
    ///
    /// # Errors
    /// Returns an error when `name` is not in the catalog.
    pub fn register(&mut self, name: &str, handler: Arc<dyn ToolHandler>) -> Result<()> {
        let descriptor = catalog::find(name).ok_or_else(|| OrchestrationError::UnknownTool {
            name: name.to_string(),
            valid: catalog_names(catalog::catalog()),
        })?;
        self.insert(descriptor.name, handler);
        Ok(())
    }

    fn insert(&mut self, name: &'static str, handler: Arc<dyn ToolHandler>) {
        self.handlers.insert(name, handler);
    }

    /// Whether a handler is bound to `name`
    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Names with a bound handler, sorted
    pub fn registered(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Execute one call and record its outcome in `state`
    pub async fn execute(
        &self,
        call: &ToolCall,
        state: &mut ConversationState,
        scope: &DispatchScope,
    ) -> ToolResult {
        let turn = state.current_turn();
        let result = match self.validate(call, scope) {
            Err(e) => ToolResult::failure(turn, call, e.to_string()),
            Ok(handler) => {
                let args = ToolArguments::new(call.name.clone(), call.arguments.clone());
                debug!(tool = %call.name, call_id = %call.id, turn, "Dispatching tool call");

                let outcome = tokio::select! {
                    biased;
                    () = scope.cancel.cancelled() => Err(OrchestrationError::Cancelled),
                    outcome = handler.execute(&args, state) => outcome,
                };
                match outcome {
                    Ok(output) => ToolResult::success(turn, call, output),
                    Err(OrchestrationError::Cancelled) => ToolResult::failure(turn, call, "cancelled"),
                    Err(e) => ToolResult::failure(turn, call, e.to_string()),
                }
            }
        };

        match result.error_message() {
            None => info!(tool = %result.tool, turn, "Tool call succeeded"),
            Some(error) => warn!(tool = %result.tool, turn, error = %error, "Tool call failed"),
        }
        state.record(result.clone());
        result
    }

    fn validate(&self, call: &ToolCall, scope: &DispatchScope) -> Result<Arc<dyn ToolHandler>> {
        let offered: Vec<&ToolDescriptor> = catalog::catalog()
            .iter()
            .filter(|d| scope.keys.allows(d.auth) && self.has_handler(d.name))
            .collect();

        let Some(descriptor) = offered.iter().find(|d| d.name == call.name) else {
            return Err(OrchestrationError::UnknownTool {
                name: call.name.clone(),
                valid: offered.iter().map(|d| d.name).collect::<Vec<_>>().join(", "),
            });
        };

        for parameter in descriptor.required_parameters() {
            let supplied = match call.arguments.get(parameter.name) {
                None | Some(Value::Null) => false,
                Some(Value::String(text)) => !text.trim().is_empty(),
                Some(_) => true,
            };
            if !supplied {
                return Err(OrchestrationError::MissingParameter {
                    tool: call.name.clone(),
                    parameter: parameter.name.to_string(),
                });
            }
        }

        self.handlers.get(descriptor.name).cloned().ok_or_else(|| {
            OrchestrationError::ToolExecutionFailed(format!("no handler bound to '{}'", call.name))
        })
    }
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher").field("handlers", &self.registered()).finish()
    }
}

fn catalog_names(descriptors: &[ToolDescriptor]) -> String {
    descriptors.iter().map(|d| d.name).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};

    struct FailingHandler;

    #[async_trait]
    impl ToolHandler for FailingHandler {
        async fn execute(&self, _args: &ToolArguments, _state: &mut ConversationState) -> Result<Value> {
            Err(OrchestrationError::ToolExecutionFailed("upstream 503".to_string()))
        }
    }

    struct PendingHandler;

    #[async_trait]
    impl ToolHandler for PendingHandler {
        async fn execute(&self, _args: &ToolArguments, _state: &mut ConversationState) -> Result<Value> {
            std::future::pending::<()>().await;
            Ok(Value::Null)
        }
    }

    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        async fn execute(&self, args: &ToolArguments, _state: &mut ConversationState) -> Result<Value> {
            Ok(json!({ "echo": args.args }))
        }
    }

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall { id: format!("call_{name}"), name: name.to_string(), arguments }
    }

    fn scope(keys: CapabilityKeys) -> DispatchScope {
        DispatchScope::new(keys, CancellationToken::new())
    }

    fn started_state() -> ConversationState {
        let mut state = ConversationState::new("q", 5);
        state.begin_turn();
        state
    }

    #[tokio::test]
    async fn test_unknown_tool_lists_valid_names() {
        let dispatcher = ToolDispatcher::standard(&Collaborators::new(), &EngineConfig::default());
        let mut state = started_state();

        let result = dispatcher
            .execute(&call("launch_rocket", json!({})), &mut state, &scope(CapabilityKeys::all()))
            .await;

        assert!(!result.success);
        let error = result.error_message().unwrap();
        assert!(error.contains("launch_rocket"));
        assert!(error.contains("save_thought"));
        assert_eq!(state.tool_results().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_parameter_is_named() {
        let dispatcher = ToolDispatcher::standard(&Collaborators::new(), &EngineConfig::default());
        let mut state = started_state();

        let result = dispatcher
            .execute(&call("save_thought", json!({ "thought": null })), &mut state, &scope(CapabilityKeys::none()))
            .await;

        assert!(!result.success);
        assert!(result.error_message().unwrap().contains("'thought'"));
        assert_eq!(state.tool_results().len(), 1);
        assert!(state.notes().is_empty());
    }

    #[tokio::test]
    async fn test_blank_required_text_is_missing() {
        let dispatcher = ToolDispatcher::standard(&Collaborators::new(), &EngineConfig::default());
        let mut state = started_state();

        let result = dispatcher
            .execute(&call("save_thought", json!({ "thought": "   " })), &mut state, &scope(CapabilityKeys::none()))
            .await;

        assert!(!result.success);
        assert!(result.error_message().unwrap().contains("Missing required parameter 'thought'"));
        assert!(state.notes().is_empty());

        let result = dispatcher
            .execute(&call("save_thought", json!({ "thought": 42 })), &mut state, &scope(CapabilityKeys::none()))
            .await;
        assert!(result.success);
        assert_eq!(state.notes(), ["[Turn 1] 42".to_string()]);
        assert_eq!(state.tool_results().len(), 2);
    }

    #[tokio::test]
    async fn test_unauthorized_tool_is_rejected() {
        let mut dispatcher = ToolDispatcher::new();
        dispatcher.register("web_search", Arc::new(EchoHandler)).unwrap();
        let mut state = started_state();

        let result = dispatcher
            .execute(&call("web_search", json!({ "query": "x" })), &mut state, &scope(CapabilityKeys::none()))
            .await;

        assert!(!result.success);
        assert!(result.error_message().unwrap().starts_with("Unknown tool 'web_search'"));
    }

    #[tokio::test]
    async fn test_handler_error_becomes_failed_result() {
        let mut dispatcher = ToolDispatcher::new();
        dispatcher.register("web_search", Arc::new(FailingHandler)).unwrap();
        let mut state = started_state();

        let result = dispatcher
            .execute(&call("web_search", json!({ "query": "x" })), &mut state, &scope(CapabilityKeys::all()))
            .await;

        assert!(!result.success);
        assert!(result.error_message().unwrap().contains("upstream 503"));
        assert_eq!(result.call_id, "call_web_search");
        assert_eq!(state.tool_results()[0], result);
    }

    #[tokio::test]
    async fn test_success_is_recorded_in_order() {
        let mut dispatcher = ToolDispatcher::standard(&Collaborators::new(), &EngineConfig::default());
        dispatcher.register("read_url", Arc::new(EchoHandler)).unwrap();
        let mut state = started_state();
        let scope = scope(CapabilityKeys::all());

        dispatcher.execute(&call("save_thought", json!({ "thought": "one" })), &mut state, &scope).await;
        state.begin_turn();
        let second = dispatcher
            .execute(&call("read_url", json!({ "url": "https://a.b" })), &mut state, &scope)
            .await;

        assert!(second.success);
        assert_eq!(second.output["echo"]["url"], "https://a.b");
        let turns: Vec<u32> = state.tool_results().iter().map(|r| r.turn).collect();
        assert_eq!(turns, vec![1, 2]);
        assert_eq!(state.notes().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_handler_is_recorded() {
        let mut dispatcher = ToolDispatcher::new();
        dispatcher.register("generate_video", Arc::new(PendingHandler)).unwrap();
        let mut state = started_state();
        let scope = scope(CapabilityKeys::all());
        scope.cancel.cancel();

        let result = dispatcher
            .execute(&call("generate_video", json!({ "prompt": "x" })), &mut state, &scope)
            .await;

        assert_eq!(result.error_message(), Some("cancelled"));
        assert_eq!(state.tool_results().len(), 1);
    }

    #[test]
    fn test_register_rejects_unknown_name() {
        let mut dispatcher = ToolDispatcher::new();
        assert!(dispatcher.register("teleport", Arc::new(EchoHandler)).is_err());
        assert!(dispatcher.registered().is_empty());
    }

    #[test]
    fn test_standard_registers_only_backed_tools() {
        let dispatcher = ToolDispatcher::standard(&Collaborators::new(), &EngineConfig::default());
        assert_eq!(dispatcher.registered(), vec!["save_thought"]);
    }
}
