//! Deep Thought delegation engine for Cogito.
//!
//! This crate holds the tool catalog with capability gating, the tool
//! dispatcher and the multi-turn orchestrator that decides when to answer.

pub mod error;
pub mod orchestration;
pub mod progress;

pub use orchestration::{
    DEFAULT_MAX_TURNS, FinishReason, RunRequest, RunResult,
    catalog::{
        AuthClass, Availability, CapabilityKeys, KeyStore, ParamType, ParameterSpec,
        ToolDescriptor, catalog, list_available,
    },
    classify::{TurnPhase, classify},
    config::{EngineConfig, Persona, TurnHeuristics},
    context::{ConversationState, Transcript},
    dispatcher::{DispatchScope, ToolDispatcher},
    engine::{DeepThought, FINISH_TOOL, finish_tool_spec},
    handlers::Collaborators,
    tool::{ToolArguments, ToolCall, ToolHandler, ToolResult},
};
pub use progress::{BroadcastProgress, ProgressObserver, ProgressUpdate};

// Re-export orchestration error separately to avoid conflicts
pub use error::{OrchestrationError, Result};
