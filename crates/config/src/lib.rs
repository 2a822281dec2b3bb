//! Configuration loading, validation, and management for newsbrief.
//!
//! Loads configuration from `~/.newsbrief/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.newsbrief/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// LLM API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL for the OpenAI-compatible endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Embedding model used for chunk similarity
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Microsoft Graph mailbox settings
    #[serde(default)]
    pub graph: GraphConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Agent run configuration
    #[serde(default)]
    pub agent: AgentConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_temperature() -> f32 {
    0.0
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("embedding_model", &self.embedding_model)
            .field("default_temperature", &self.default_temperature)
            .field("graph", &self.graph)
            .field("storage", &self.storage)
            .field("agent", &self.agent)
            .finish()
    }
}

/// Microsoft Graph credentials and mailbox settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Azure AD application (client) ID
    #[serde(default)]
    pub client_id: String,

    /// Azure AD client secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Azure AD tenant ID
    #[serde(default)]
    pub tenant_id: String,

    /// Mailbox user to fetch from and send as
    #[serde(default)]
    pub user_id: String,

    /// Where the synthesized digest is delivered
    #[serde(default)]
    pub receiver_email: String,

    /// Newsletter senders to filter on
    #[serde(default)]
    pub senders: Vec<String>,
}

impl std::fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("tenant_id", &self.tenant_id)
            .field("user_id", &self.user_id)
            .field("receiver_email", &self.receiver_email)
            .field("senders", &self.senders)
            .finish()
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            tenant_id: String::new(),
            user_id: String::new(),
            receiver_email: String::new(),
            senders: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path for email metadata (":memory:" for ephemeral)
    #[serde(default = "default_db_path")]
    pub database_path: String,

    /// Chunk size for stored email text
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between adjacent chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_db_path() -> String {
    "sqlite://newsbrief.db".into()
}
fn default_chunk_size() -> usize {
    512
}
fn default_chunk_overlap() -> usize {
    50
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Safety bound on total state-machine transitions per run
    #[serde(default = "default_max_transitions")]
    pub max_transitions: u32,
}

fn default_max_transitions() -> u32 {
    20
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_transitions: default_max_transitions(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.newsbrief/config.toml).
    ///
    /// Also checks environment variables for secrets:
    /// - `NEWSBRIEF_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `GRAPH_CLIENT_SECRET`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("NEWSBRIEF_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if config.graph.client_secret.is_none() {
            config.graph.client_secret = std::env::var("GRAPH_CLIENT_SECRET").ok();
        }

        if let Ok(model) = std::env::var("NEWSBRIEF_MODEL") {
            config.default_model = model;
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

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".newsbrief")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_transitions == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_transitions must be at least 1".into(),
            ));
        }

        if self.storage.chunk_overlap >= self.storage.chunk_size {
            return Err(ConfigError::ValidationError(
                "storage.chunk_overlap must be smaller than storage.chunk_size".into(),
            ));
        }

        Ok(())
    }

    /// Check if an LLM API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Check if Graph credentials are complete enough to authenticate.
    pub fn has_graph_credentials(&self) -> bool {
        !self.graph.client_id.is_empty()
            && self.graph.client_secret.is_some()
            && !self.graph.tenant_id.is_empty()
            && !self.graph.user_id.is_empty()
    }

    /// The default run objective, rendered from the configured mailbox.
    pub fn default_objective(&self) -> String {
        format!(
            "Generate a newsletter digest from emails received today from the following senders: {} \
             and then send it to the following email address: {}",
            self.graph.senders.join(", "),
            self.graph.receiver_email
        )
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            default_model: default_model(),
            embedding_model: default_embedding_model(),
            default_temperature: default_temperature(),
            graph: GraphConfig::default(),
            storage: StorageConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
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
}
