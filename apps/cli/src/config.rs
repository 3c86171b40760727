//! CLI configuration file support.
//!
//! Configuration precedence:
//! 1. CLI arguments (handled by clap)
//! 2. `--config <path>` when given, otherwise
//! 3. Local config file (./.cogitorc) over
//! 4. Global config file (~/.cogito/config.toml)
//! 5. Defaults
//!
//! The `[deep_thought]` section of the same file configures the engine.

use anyhow::{Context, Result, bail};
use cogito_orchestrator::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Chat provider behind the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions (OpenRouter by default)
    #[default]
    Openrouter,
    /// Offline echo model
    Mock,
}

/// Provider endpoints and model defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Chat provider
    pub kind: ProviderKind,
    /// Chat model used when `--model` is not given
    pub model: String,
    /// Chat completions API root
    pub chat_base_url: Option<String>,
    /// Search API root
    pub research_base_url: Option<String>,
    /// Image and video API root
    pub media_base_url: Option<String>,
    /// Image model
    pub image_model: String,
    /// Video model
    pub video_model: String,
    /// Chat model that plans video shots
    pub director_model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            model: "openai/gpt-4o".to_string(),
            chat_base_url: None,
            research_base_url: None,
            media_base_url: None,
            image_model: "gpt-image-1".to_string(),
            video_model: "sora-2".to_string(),
            director_model: "openai/gpt-4o-mini".to_string(),
        }
    }
}

/// CLI configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Log level used when `--log-level` is not given
    #[serde(default)]
    pub log_level: Option<String>,

    /// Always print the run result as JSON
    #[serde(default)]
    pub json: bool,

    /// Turn budget used when `--max-turns` is not given
    #[serde(default)]
    pub max_turns: Option<u32>,

    /// Providers
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Engine settings from `[deep_thought]`
    #[serde(skip)]
    pub engine: EngineConfig,
}

impl CliConfig {
    /// Parse a configuration document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).context("Failed to parse configuration")?;
        let document: toml::Value = toml::from_str(content)?;
        if document.get("deep_thought").is_some() {
            config.engine = EngineConfig::from_toml_str(content)?;
        }
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Configuration file not found: {}", path.display());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Get default global configuration file path.
    pub fn default_global_path() -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".cogito").join("config.toml")
    }

    /// Get default local configuration file path.
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".cogitorc")
    }

    /// Discover and load configuration files.
    ///
    /// The first of the local and global files that exists wins. A file that
    /// exists but does not parse is an error.
    pub fn discover_and_load() -> Result<Self> {
        for path in [Self::default_local_path(), Self::default_global_path()] {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load `explicit` when given, otherwise discover.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from_file(path),
            None => Self::discover_and_load(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.provider.kind, ProviderKind::Openrouter);
        assert_eq!(config.provider.model, "openai/gpt-4o");
        assert!(!config.json);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_full_document() {
        let toml = r#"
            log_level = "debug"
            max_turns = 7

            [provider]
            kind = "mock"
            model = "anthropic/claude-sonnet-4"
            research_base_url = "http://localhost:9000"

            [deep_thought]
            max_turns_limit = 9
            finish_tool = false
        "#;

        let config = CliConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.max_turns, Some(7));
        assert_eq!(config.provider.kind, ProviderKind::Mock);
        assert_eq!(config.provider.model, "anthropic/claude-sonnet-4");
        assert_eq!(config.provider.research_base_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.provider.video_model, "sora-2");
        assert_eq!(config.engine.max_turns_limit, 9);
        assert!(!config.engine.finish_tool);
    }

    #[test]
    fn test_without_engine_section() {
        let config = CliConfig::from_toml_str("json = true").unwrap();
        assert!(config.json);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_invalid_engine_section() {
        let toml = "[deep_thought]\ntemperature = 5.0\n";
        assert!(CliConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[provider]\nkind = \"mock\"").unwrap();

        let config = CliConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Mock);
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = CliConfig::resolve(Some(Path::new("/nonexistent/cogito.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
