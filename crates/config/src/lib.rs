//! Configuration loading, validation, and management for Folio.
//!
//! Loads configuration from `folio.toml` with environment variable
//! overrides. Validates all settings at startup — a missing credential for
//! the selected backend is fatal before any traffic is served.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which inference backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Ollama on this machine.
    Local,
    /// OpenRouter.
    Remote,
}

/// The root configuration structure.
///
/// Maps directly to `folio.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which inference backend to use
    #[serde(default = "default_mode")]
    pub mode: Mode,

    /// OpenRouter API key (usually supplied via OPENROUTER_API_KEY)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Remote backend settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Local backend settings
    #[serde(default)]
    pub local: LocalConfig,

    /// Embedding model used for the knowledge index
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Per-role sampling temperatures
    #[serde(default)]
    pub temperatures: TemperatureConfig,

    /// Knowledge store settings
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Path of the unanswered-questions database
    #[serde(default = "default_questions_db")]
    pub questions_db: PathBuf,

    /// Path of the system instruction file
    #[serde(default = "default_prompt_path")]
    pub prompt_path: PathBuf,
}

fn default_mode() -> Mode {
    Mode::Remote
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_questions_db() -> PathBuf {
    PathBuf::from("data/questions/unanswered_questions.db")
}
fn default_prompt_path() -> PathBuf {
    PathBuf::from("prompts/system_prompt.md")
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("mode", &self.mode)
            .field("api_key", &redact(&self.api_key))
            .field("remote", &self.remote)
            .field("local", &self.local)
            .field("embedding_model", &self.embedding_model)
            .field("temperatures", &self.temperatures)
            .field("knowledge", &self.knowledge)
            .field("questions_db", &self.questions_db)
            .field("prompt_path", &self.prompt_path)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_remote_url")]
    pub api_url: String,

    #[serde(default = "default_remote_model")]
    pub chat_model: String,
}

fn default_remote_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_remote_model() -> String {
    "google/gemini-2.0-flash-lite-001".into()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_url: default_remote_url(),
            chat_model: default_remote_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    #[serde(default = "default_local_url")]
    pub api_url: String,

    /// The Ollama model to chat with. No default — running locally without
    /// naming a model is a configuration error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_model: Option<String>,
}

fn default_local_url() -> String {
    "http://localhost:11434/v1".into()
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            api_url: default_local_url(),
            chat_model: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureConfig {
    #[serde(default = "default_router_temperature")]
    pub router: f32,

    #[serde(default = "default_grader_temperature")]
    pub grader: f32,

    #[serde(default = "default_generator_temperature")]
    pub generator: f32,
}

fn default_router_temperature() -> f32 {
    0.0
}
fn default_grader_temperature() -> f32 {
    0.5
}
fn default_generator_temperature() -> f32 {
    0.7
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            router: default_router_temperature(),
            grader: default_grader_temperature(),
            generator: default_generator_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Directory of source documents to index
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Directory holding the persisted embedding index
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    /// How many chunks a lookup returns
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("data/source")
}
fn default_index_dir() -> PathBuf {
    PathBuf::from("data/vectordb")
}
fn default_top_k() -> usize {
    5
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            index_dir: default_index_dir(),
            top_k: default_top_k(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `folio.toml` in the working directory.
    ///
    /// Environment overrides (highest priority):
    /// - `OPENROUTER_API_KEY` — remote credentials
    /// - `FOLIO_MODE` — `local` or `remote`
    /// - `OLLAMA_MODEL` — local chat model
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(Path::new("folio.toml"))?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("OPENROUTER_API_KEY").ok();
        }

        if let Ok(mode) = std::env::var("FOLIO_MODE") {
            config.mode = match mode.to_lowercase().as_str() {
                "local" => Mode::Local,
                "remote" => Mode::Remote,
                other => {
                    return Err(ConfigError::ValidationError(format!(
                        "FOLIO_MODE must be 'local' or 'remote', got '{other}'"
                    )));
                }
            };
        }

        if let Ok(model) = std::env::var("OLLAMA_MODEL") {
            config.local.chat_model = Some(model);
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate value ranges.
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, t) in [
            ("router", self.temperatures.router),
            ("grader", self.temperatures.grader),
            ("generator", self.temperatures.generator),
        ] {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} temperature must be between 0.0 and 2.0"
                )));
            }
        }

        if self.knowledge.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "knowledge.top_k must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Check that the selected backend has the credentials/identifiers it
    /// needs. Fatal at startup — the engine must not serve traffic without
    /// them.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        match self.mode {
            Mode::Remote => {
                if self.api_key.as_deref().unwrap_or("").is_empty() {
                    return Err(ConfigError::MissingCredentials(
                        "OPENROUTER_API_KEY not set; cannot run in remote mode".into(),
                    ));
                }
            }
            Mode::Local => {
                if self.local.chat_model.as_deref().unwrap_or("").is_empty() {
                    return Err(ConfigError::MissingCredentials(
                        "OLLAMA_MODEL not set; cannot run in local mode".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// The chat model for the selected mode.
    ///
    /// Call `require_credentials()` first; in local mode an unset model
    /// falls back to an empty string here.
    pub fn chat_model(&self) -> &str {
        match self.mode {
            Mode::Remote => &self.remote.chat_model,
            Mode::Local => self.local.chat_model.as_deref().unwrap_or(""),
        }
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            api_key: None,
            remote: RemoteConfig::default(),
            local: LocalConfig::default(),
            embedding_model: default_embedding_model(),
            temperatures: TemperatureConfig::default(),
            knowledge: KnowledgeConfig::default(),
            questions_db: default_questions_db(),
            prompt_path: default_prompt_path(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}
