//! envx configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Project-local config file name
pub const LOCAL_CONFIG_FILE: &str = ".envx.yml";

/// Errors loading configuration or resolving values a run cannot start without
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API key not found (checked --api-key, ${env_var}, and llm.api-key in the config file)")]
    MissingApiKey { env_var: String },

    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Main envx configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Host tool configuration
    pub executor: ExecutorConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// 1. explicit `--config` path
    /// 2. `./.envx.yml`
    /// 3. `~/.config/envx/envx.yml`
    /// 4. defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self, ConfigError> {
        // If explicit config path provided, it must load
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(user_config) = Self::user_config_path() {
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Errors are swallowed; the full load reports them once logging is up.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    /// `~/.config/envx/envx.yml` (platform equivalent)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("envx").join("envx.yml"))
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(?path, "Config::load_from_file: called");
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        // An empty file is an all-defaults config
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Serialize the effective configuration, with the API key redacted
    pub fn to_redacted_yaml(&self) -> Result<String> {
        let mut redacted = self.clone();
        if redacted.llm.api_key.is_some() {
            redacted.llm.api_key = Some("<redacted>".to_string());
        }
        serde_yaml::to_string(&redacted).context("Failed to serialize config")
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (only "openai"-compatible endpoints are supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API key persisted in the config file (lowest priority source)
    #[serde(rename = "api-key", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Retries for transient transport failures (never for bad responses)
    #[serde(rename = "max-retries")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "deepseek-chat".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            base_url: "https://api.deepseek.com".to_string(),
            max_tokens: 4096,
            temperature: 0.0,
            timeout_ms: 120_000,
            max_retries: 2,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key: explicit value > environment variable > config file
    pub fn resolve_api_key(&self, explicit: Option<&str>) -> Result<String, ConfigError> {
        debug!(api_key_env = %self.api_key_env, explicit = explicit.is_some(), "resolve_api_key: called");
        if let Some(key) = explicit.map(str::trim).filter(|k| !k.is_empty()) {
            debug!("resolve_api_key: using explicit key");
            return Ok(key.to_string());
        }

        if let Ok(key) = std::env::var(&self.api_key_env) {
            let key = key.trim();
            if !key.is_empty() {
                debug!("resolve_api_key: using environment variable");
                return Ok(key.to_string());
            }
        }

        if let Some(key) = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            debug!("resolve_api_key: using config file key");
            return Ok(key.to_string());
        }

        debug!("resolve_api_key: no key found");
        Err(ConfigError::MissingApiKey {
            env_var: self.api_key_env.clone(),
        })
    }

    /// Combine with a resolved API key into what the client needs
    pub fn resolve(&self, api_key: String) -> ResolvedLlmConfig {
        ResolvedLlmConfig {
            provider: self.provider.clone(),
            model: self.model.clone(),
            api_key,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout_ms: self.timeout_ms,
            max_retries: self.max_retries,
        }
    }
}

/// Fully resolved LLM settings, including the credential
#[derive(Clone)]
pub struct ResolvedLlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_ms: u64,
    pub max_retries: u32,
}

impl std::fmt::Debug for ResolvedLlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedLlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_ms", &self.timeout_ms)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Host tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Ambient Python interpreter used when no conda env is active
    pub python: String,

    /// conda executable
    pub conda: String,

    /// docker executable
    pub docker: String,

    /// Per-command timeout in milliseconds
    #[serde(rename = "command-timeout-ms")]
    pub command_timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            conda: "conda".to_string(),
            docker: "docker".to_string(),
            command_timeout_ms: 1_800_000,
        }
    }
}
