// Deep Thought engine
//
// Runs the bounded multi-turn loop: ask the model, classify the reply, dispatch
// tool calls, repeat until an answer, the turn budget, or cancellation ends the
// run. `run` never fails; every failure becomes an unsuccessful `RunResult`
// carrying whatever notes and tool results were produced.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use cogito_abstraction::{
    ChatMessage, Model, ModelParameters, ModelRequest, ModelResponse, ModelUsage, ToolCall,
    ToolChoice, ToolSpec,
};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::{
    FinishReason, RunRequest, RunResult,
    catalog::{CapabilityKeys, KeyStore, ToolDescriptor, list_available},
    classify::{TurnPhase, classify},
    config::EngineConfig,
    context::{ConversationState, Transcript},
    dispatcher::{DispatchScope, ToolDispatcher},
    prompt::{PromptContext, build_system_prompt},
};
use crate::error::{OrchestrationError, Result};
use crate::progress::{ProgressObserver, ProgressUpdate};

/// Name of the built-in function that ends a run with an answer
pub const FINISH_TOOL: &str = "finish";

/// Declaration of the `finish` function offered alongside the catalog
pub fn finish_tool_spec() -> ToolSpec {
    ToolSpec {
        name: FINISH_TOOL.to_string(),
        description: "End the session and deliver your complete final answer to the user."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "answer": {
                    "type": "string",
                    "description": "The complete final answer, formatted for the user",
                },
            },
            "required": ["answer"],
        }),
    }
}

/// How a run that produced an answer ended
#[derive(Debug)]
struct Completion {
    final_response: String,
    finish_reason: FinishReason,
}

/// Everything one run mutates
struct Session {
    state: ConversationState,
    transcript: Transcript,
    usage: ModelUsage,
    scope: DispatchScope,
    tools: Vec<ToolSpec>,
    observer: Option<Arc<dyn ProgressObserver>>,
    caller_cancel: CancellationToken,
    deadline: Option<Duration>,
}

impl Session {
    fn report(&self, phase: TurnPhase, status: impl Into<String>, intermediate: Option<&str>) {
        let Some(observer) = &self.observer else {
            return;
        };
        observer.on_progress(&ProgressUpdate {
            current_turn: self.state.current_turn(),
            max_turns: self.state.max_turns(),
            phase,
            status: status.into(),
            intermediate: intermediate.map(str::to_string),
        });
    }

    /// Error describing why the run token fired
    fn interruption(&self) -> OrchestrationError {
        match self.deadline {
            Some(limit) if !self.caller_cancel.is_cancelled() => {
                OrchestrationError::DeadlineExceeded(limit)
            }
            _ => OrchestrationError::Cancelled,
        }
    }
}

/// The multi-turn conversation orchestrator
pub struct DeepThought {
    model: Arc<dyn Model>,
    dispatcher: ToolDispatcher,
    keys: Arc<dyn KeyStore>,
    config: EngineConfig,
}

impl DeepThought {
    /// Create an engine
    pub fn new(
        model: Arc<dyn Model>,
        dispatcher: ToolDispatcher,
        keys: Arc<dyn KeyStore>,
        config: EngineConfig,
    ) -> Self {
        Self { model, dispatcher, keys, config }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registered tool handlers
    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    /// Answer `request.user_query`, delegating to tools across several turns
    pub async fn run(&self, request: RunRequest) -> RunResult {
        let run_id = Uuid::new_v4();
        self.run_inner(request).instrument(info_span!("deep_thought", run_id = %run_id)).await
    }

    async fn run_inner(&self, request: RunRequest) -> RunResult {
        let keys = CapabilityKeys::snapshot(self.keys.as_ref());
        let max_turns = self.config.clamp_turns(request.max_turns);
        if max_turns != request.max_turns {
            warn!(
                requested = request.max_turns,
                clamped = max_turns,
                limit = self.config.max_turns_limit,
                "Turn budget out of range, clamping"
            );
        }

        let caller_cancel = request.cancel.clone().unwrap_or_default();
        let run_cancel = caller_cancel.child_token();
        let timer = request.deadline.map(|limit| spawn_deadline(limit, run_cancel.clone()));

        let offered = self.offered_tools(keys);
        let mut tools: Vec<ToolSpec> = offered.iter().map(ToolDescriptor::to_spec).collect();
        if self.config.finish_tool {
            tools.push(finish_tool_spec());
        }

        let prompt_ctx = PromptContext {
            tools: &offered,
            max_turns,
            finish_tool: self.config.finish_tool,
            today: Local::now().date_naive(),
        };
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::system(build_system_prompt(
            &prompt_ctx,
            request.system_prompt_override.as_deref(),
        )));
        transcript.push(ChatMessage::user(request.user_query.clone()));

        let mut session = Session {
            state: ConversationState::new(request.user_query.clone(), max_turns),
            transcript,
            usage: ModelUsage::default(),
            scope: DispatchScope::new(keys, run_cancel),
            tools,
            observer: request.on_progress.clone(),
            caller_cancel,
            deadline: request.deadline,
        };

        info!(
            model = %request.model,
            query_chars = session.state.user_query().chars().count(),
            max_turns,
            tools = ?offered.iter().map(|d| d.name).collect::<Vec<_>>(),
            "Starting Deep Thought run"
        );

        let outcome = self.try_run(&request.model, &mut session).await;
        if let Some(timer) = timer {
            timer.abort();
        }

        let Session { state, transcript, usage, .. } = session;
        let (final_response, finish_reason, error) = match outcome {
            Ok(completion) => (completion.final_response, completion.finish_reason, None),
            Err(e) => {
                let reason = match e {
                    OrchestrationError::Cancelled | OrchestrationError::DeadlineExceeded(_) => {
                        FinishReason::Cancelled
                    }
                    _ => FinishReason::Error,
                };
                warn!(error = %e, turn = state.current_turn(), "Deep Thought run failed");
                (String::new(), reason, Some(e.to_string()))
            }
        };

        info!(
            turns_used = state.current_turn(),
            tool_calls = state.tool_results().len(),
            finish_reason = %finish_reason,
            "Deep Thought run finished"
        );

        RunResult {
            final_response,
            thinking_process: state.thinking_process(),
            tool_results: state.tool_results().to_vec(),
            turns_used: state.current_turn(),
            success: error.is_none(),
            error,
            finish_reason,
            transcript: transcript.into_messages(),
            usage,
        }
    }

    /// Catalog entries allowed by `keys` that also have a bound handler
    fn offered_tools(&self, keys: CapabilityKeys) -> Vec<ToolDescriptor> {
        let availability = list_available(keys);
        for reason in &availability.unavailable {
            debug!(reason = %reason, "Tool withheld");
        }
        availability
            .available
            .into_iter()
            .filter(|d| {
                let bound = self.dispatcher.has_handler(d.name);
                if !bound {
                    debug!(tool = d.name, "Tool authorized but no provider configured");
                }
                bound
            })
            .collect()
    }

    async fn try_run(&self, model: &str, session: &mut Session) -> Result<Completion> {
        loop {
            if session.scope.cancel.is_cancelled() {
                return Err(session.interruption());
            }
            let Some(turn) = session.state.begin_turn() else {
                break;
            };

            let request = ModelRequest {
                model: model.to_string(),
                messages: session.transcript.messages().to_vec(),
                tools: session.tools.clone(),
                tool_choice: ToolChoice::Auto,
                parameters: ModelParameters {
                    temperature: Some(self.config.temperature),
                    max_tokens: Some(self.config.max_tokens_per_turn),
                },
            };
            debug!(turn, messages = request.messages.len(), "Requesting model reply");

            let cancel = session.scope.cancel.clone();
            let response = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(session.interruption()),
                response = self.model.generate(&request) => response?,
            };
            if let Some(usage) = &response.usage {
                session.usage.accumulate(usage);
            }
            if response.is_empty() {
                return Err(OrchestrationError::EmptyReply(turn));
            }

            if !response.tool_calls.is_empty() {
                if let Some(completion) = self.work(session, response).await {
                    return Ok(completion);
                }
                continue;
            }

            let content = response.content.trim().to_string();
            let phase = classify(
                &content,
                false,
                turn,
                session.state.max_turns(),
                &self.config.heuristics,
            );
            debug!(turn, phase = %phase, chars = content.chars().count(), "Classified reply");
            session.transcript.push(ChatMessage::assistant(content.clone()));

            match phase {
                TurnPhase::Final => {
                    session.report(phase, "Answer ready", None);
                    return Ok(Completion { final_response: content, finish_reason: FinishReason::Answered });
                }
                TurnPhase::Ack => session.report(phase, "Getting started", Some(content.as_str())),
                TurnPhase::Think | TurnPhase::Work => {
                    session.report(TurnPhase::Think, "Thinking", Some(content.as_str()));
                }
            }
            session.transcript.push(ChatMessage::user(self.config.continue_prompt.clone()));
        }

        warn!(max_turns = session.state.max_turns(), "Turn budget exhausted without a final answer");
        let final_response = session
            .transcript
            .last_assistant_content()
            .map_or_else(|| budget_fallback(&session.state), str::to_string);
        Ok(Completion { final_response, finish_reason: FinishReason::MaxTurns })
    }

    /// Handle a reply with tool calls; returns a completion when it called `finish`
    async fn work(&self, session: &mut Session, response: ModelResponse) -> Option<Completion> {
        let ModelResponse { content, mut tool_calls, .. } = response;
        let finish_at = self
            .config
            .finish_tool
            .then(|| tool_calls.iter().position(|c| c.name == FINISH_TOOL))
            .flatten();
        if let Some(index) = finish_at {
            tool_calls.truncate(index + 1);
        }

        let content = content.trim().to_string();
        session.transcript.push(ChatMessage::assistant_with_calls(content.clone(), tool_calls.clone()));

        let finish_call = finish_at.and_then(|_| tool_calls.pop());
        if !tool_calls.is_empty() {
            let names: Vec<&str> = tool_calls.iter().map(|c| c.name.as_str()).collect();
            let intermediate = (!content.is_empty()).then_some(content.as_str());
            session.report(TurnPhase::Work, format!("Using {}", names.join(", ")), intermediate);
        }

        for call in &tool_calls {
            let result = self.dispatcher.execute(call, &mut session.state, &session.scope).await;
            session.transcript.push(ChatMessage::tool(call.id.clone(), result.to_message_content()));
        }

        let finish_call = finish_call?;
        let final_response = finish_answer(&finish_call)
            .or_else(|| (!content.is_empty()).then(|| content.clone()))
            .or_else(|| session.transcript.last_assistant_content().map(str::to_string))
            .unwrap_or_else(|| budget_fallback(&session.state));
        info!(turn = session.state.current_turn(), "Model called finish");
        session.report(TurnPhase::Final, "Answer ready", None);
        Some(Completion { final_response, finish_reason: FinishReason::FinishTool })
    }
}

fn finish_answer(call: &ToolCall) -> Option<String> {
    call.arguments
        .get("answer")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
}

/// Answer used when the model never wrote any text
fn budget_fallback(state: &ConversationState) -> String {
    let mut response = format!(
        "I ran out of time before writing a final answer. I made {} tool call(s) and saved {} note(s).",
        state.tool_results().len(),
        state.notes().len()
    );
    if !state.notes().is_empty() {
        response.push_str("\n\nMy notes so far:\n");
        response.push_str(&state.thinking_process());
    }
    response
}

fn spawn_deadline(limit: Duration, token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            () = tokio::time::sleep(limit) => {
                debug!(?limit, "Run deadline reached");
                token.cancel();
            }
            () = token.cancelled() => {}
        }
    })
}

impl std::fmt::Debug for DeepThought {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepThought")
            .field("model", &self.model.provider_name())
            .field("dispatcher", &self.dispatcher)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
