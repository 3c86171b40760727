// Deep Thought engine configuration
//
// Tuned constants (classification thresholds, closing phrases, token budgets)
// live here rather than in the engine so they can be adjusted from TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{OrchestrationError, Result};

/// Heuristics used to classify replies without tool calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnHeuristics {
    /// A turn-1 reply shorter than this (in characters) is an acknowledgement
    pub ack_max_chars: usize,
    /// A reply longer than this (in characters) is treated as the final answer
    pub final_min_chars: usize,
    /// Case-insensitive phrases that mark a reply as conclusive
    pub closing_phrases: Vec<String>,
}

impl Default for TurnHeuristics {
    fn default() -> Self {
        Self {
            ack_max_chars: 200,
            final_min_chars: 300,
            closing_phrases: [
                "in summary",
                "based on my research",
                "in conclusion",
                "to summarize",
                "final answer",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
        }
    }
}

/// Appearance of the persona used for selfies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Persona {
    /// Display name
    pub name: String,
    /// Physical description prepended to every selfie prompt
    pub appearance: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            name: "Aria".to_string(),
            appearance: "A photorealistic selfie of a friendly woman in her late twenties with \
                         shoulder-length wavy auburn hair, green eyes and light freckles"
                .to_string(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound applied to the caller's `max_turns`
    pub max_turns_limit: u32,
    /// Output token ceiling for each model call
    pub max_tokens_per_turn: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Reply classification thresholds
    pub heuristics: TurnHeuristics,
    /// Offer the built-in `finish` function to the model
    pub finish_tool: bool,
    /// User message appended after an acknowledgement or thinking turn
    pub continue_prompt: String,
    /// Characters of page content kept by `read_url`
    pub read_url_max_chars: usize,
    /// Clip length used when `generate_video` gets no duration
    pub video_default_duration: u32,
    /// Persona used by `generate_selfie`
    pub persona: Persona,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_turns_limit: 20,
            max_tokens_per_turn: 4096,
            temperature: 0.7,
            heuristics: TurnHeuristics::default(),
            finish_tool: true,
            continue_prompt: "Continue working on my request. Use your tools if they help, \
                              otherwise give your complete final answer."
                .to_string(),
            read_url_max_chars: 20_000,
            video_default_duration: 5,
            persona: Persona::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the upper bound for turns per run
    #[must_use]
    pub fn with_max_turns_limit(mut self, limit: u32) -> Self {
        self.max_turns_limit = limit;
        self
    }

    /// Set the per-turn output token ceiling
    #[must_use]
    pub fn with_max_tokens_per_turn(mut self, tokens: u32) -> Self {
        self.max_tokens_per_turn = tokens;
        self
    }

    /// Replace the classification heuristics
    #[must_use]
    pub fn with_heuristics(mut self, heuristics: TurnHeuristics) -> Self {
        self.heuristics = heuristics;
        self
    }

    /// Enable or disable the built-in `finish` function
    #[must_use]
    pub fn with_finish_tool(mut self, enabled: bool) -> Self {
        self.finish_tool = enabled;
        self
    }

    /// Set the selfie persona
    #[must_use]
    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = persona;
        self
    }

    /// Clamp a caller-supplied turn budget into `1..=max_turns_limit`
    pub fn clamp_turns(&self, requested: u32) -> u32 {
        requested.clamp(1, self.max_turns_limit.max(1))
    }

    /// Check that the values make sense
    pub fn validate(&self) -> Result<()> {
        if self.max_turns_limit == 0 {
            return Err(OrchestrationError::Config("max_turns_limit must be at least 1".to_string()));
        }
        if self.max_tokens_per_turn == 0 {
            return Err(OrchestrationError::Config(
                "max_tokens_per_turn must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(OrchestrationError::Config(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        if self.read_url_max_chars == 0 {
            return Err(OrchestrationError::Config(
                "read_url_max_chars must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load_from_toml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from TOML string
    ///
    /// The content may be a bare engine config or a document with a
    /// `[deep_thought]` section.
    ///
    /// # Errors
    /// Returns error if TOML cannot be parsed or the values are invalid
    pub fn from_toml_str(toml_content: &str) -> Result<Self> {
        let toml: toml::Value = toml::from_str(toml_content)
            .map_err(|e| OrchestrationError::Config(format!("Failed to parse TOML: {}", e)))?;

        let config_value = match toml.get("deep_thought") {
            Some(section) => section.clone(),
            None => toml,
        };

        let config: Self = config_value.try_into().map_err(|e: toml::de::Error| {
            OrchestrationError::Config(format!("Failed to deserialize engine config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }
}
