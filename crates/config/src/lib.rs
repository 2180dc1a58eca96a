//! Configuration loading, validation, and management for the Bixso
//! Orchestrator.
//!
//! Loads configuration from `bixso.toml` (or a path given via
//! `BIXSO_CONFIG`) with environment variable overrides. Validates all
//! settings at startup. Missing credentials are reported loudly but do
//! not halt the process — the server starts degraded and callers see
//! provider errors instead.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `bixso.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the default provider (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider ("openai", "gemini", or any OpenAI-compatible name)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default)]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Which persona drives the /chat route: "chat" or "orchestrator"
    #[serde(default = "default_chat_persona")]
    pub chat_persona: String,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Document store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_chat_persona() -> String {
    "chat".into()
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
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("chat_persona", &self.chat_persona)
            .field("gateway", &self.gateway)
            .field("store", &self.store)
            .field("providers", &self.providers)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "0.0.0.0".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Document store configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Which backend to use: "firestore" or "memory"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// Firestore project id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Path to service-account credentials (informational; the REST client
    /// authenticates with `access_token`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<String>,

    /// Pre-fetched OAuth bearer token (empty for the emulator)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Override the Firestore base URL (e.g., an emulator endpoint)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_store_backend() -> String {
    "firestore".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            project_id: None,
            credentials_path: None,
            access_token: None,
            base_url: None,
        }
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("backend", &self.backend)
            .field("project_id", &self.project_id)
            .field("credentials_path", &self.credentials_path)
            .field("access_token", &redact(&self.access_token))
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path with env-var overrides.
    ///
    /// Environment variables consulted:
    /// - `BIXSO_CONFIG` — config file path (default `bixso.toml`)
    /// - `BIXSO_API_KEY`, `OPENAI_API_KEY`, `GOOGLE_API_KEY` — API key
    /// - `BIXSO_PROVIDER`, `BIXSO_MODEL` — provider/model overrides
    /// - `PORT` — listening port
    /// - `FIRESTORE_PROJECT_ID`, `GOOGLE_APPLICATION_CREDENTIALS`,
    ///   `FIRESTORE_ACCESS_TOKEN`, `FIRESTORE_EMULATOR_HOST` — store settings
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("BIXSO_CONFIG").unwrap_or_else(|_| "bixso.toml".into());
        let mut config = Self::load_from(Path::new(&path))?;
        config.apply_env_overrides();
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

    /// Apply environment variable overrides (highest priority).
    pub fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("BIXSO_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .or_else(|| std::env::var("GOOGLE_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("BIXSO_PROVIDER") {
            self.default_provider = provider;
        }

        if let Ok(model) = std::env::var("BIXSO_MODEL") {
            self.default_model = model;
        }

        if let Ok(port) = std::env::var("PORT")
            && let Ok(port) = port.parse()
        {
            self.gateway.port = port;
        }

        if self.store.project_id.is_none() {
            self.store.project_id = std::env::var("FIRESTORE_PROJECT_ID").ok();
        }
        if self.store.credentials_path.is_none() {
            self.store.credentials_path = std::env::var("GOOGLE_APPLICATION_CREDENTIALS").ok();
        }
        if self.store.access_token.is_none() {
            self.store.access_token = std::env::var("FIRESTORE_ACCESS_TOKEN").ok();
        }
        if self.store.base_url.is_none()
            && let Ok(host) = std::env::var("FIRESTORE_EMULATOR_HOST")
        {
            self.store.base_url = Some(format!("http://{host}/v1"));
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        match self.chat_persona.as_str() {
            "chat" | "orchestrator" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "chat_persona must be 'chat' or 'orchestrator', got '{other}'"
                )));
            }
        }

        match self.store.backend.as_str() {
            "firestore" | "memory" => Ok(()),
            other => Err(ConfigError::ValidationError(format!(
                "store.backend must be 'firestore' or 'memory', got '{other}'"
            ))),
        }
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Log startup warnings for missing credentials.
    ///
    /// Deliberately does not fail: the server starts degraded and requests
    /// surface provider/store errors instead.
    pub fn warn_if_degraded(&self) {
        if !self.has_api_key() {
            tracing::error!(
                provider = %self.default_provider,
                "No API key configured — the agent will not work until one is set"
            );
        }

        if self.store.backend == "firestore" {
            if self.store.project_id.is_none() {
                tracing::error!(
                    "FIRESTORE_PROJECT_ID is not set — store queries will fail"
                );
            }
            match &self.store.credentials_path {
                Some(path) if !Path::new(path).exists() => {
                    tracing::warn!(path = %path, "Store credentials file not found");
                }
                None => {
                    tracing::warn!("No store credentials path configured");
                }
                _ => {}
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: 0.0,
            default_max_tokens: default_max_tokens(),
            chat_persona: default_chat_persona(),
            gateway: GatewayConfig::default(),
            store: StoreConfig::default(),
            providers: HashMap::new(),
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
}
