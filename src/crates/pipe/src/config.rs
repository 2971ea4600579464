//! Settings for the pipe and the loader that reads them.
//!
//! Loads configuration from:
//! 1. Default values
//! 2. An optional TOML file (`[pipe]` and `[logging]` tables)
//!
//! String values written as `${VAR_NAME}` in `api_keys` and `base_url` are
//! expanded from the environment after loading.

use crate::error::{PipeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

/// Upper bound accepted by the Responses API for `max_output_tokens`.
pub const MAX_OUTPUT_TOKENS_LIMIT: u32 = 32768;

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipeConfig {
    /// Pipe settings handed to the adapter
    #[serde(default)]
    pub pipe: Settings,

    /// Logging configuration used by the host binary
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Adapter settings.
///
/// Immutable for the lifetime of a [`Pipe`](crate::Pipe); request handling
/// never writes to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Prefix added before model names in the model listing.
    pub name_prefix: String,

    /// Base URL for the Responses API.
    pub base_url: String,

    /// API keys, comma separated. Used round-robin.
    pub api_keys: String,

    /// Reasoning effort: low, medium, high.
    pub thinking_effort: String,

    /// Display token usage statistics with each response.
    pub show_token_stats: bool,

    /// Show cumulative cost for the entire conversation.
    pub show_cumulative_cost: bool,

    /// Maximum number of output tokens (clamped to 1-32768 at use time).
    pub max_output_tokens: i64,

    /// Request timeout in seconds.
    pub timeout_seconds: u64,

    /// Log raw response details and conversation bookkeeping at info level.
    pub debug_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name_prefix: "OpenAI: ".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_keys: String::new(),
            thinking_effort: "medium".to_string(),
            show_token_stats: true,
            show_cumulative_cost: true,
            max_output_tokens: 3200,
            timeout_seconds: 600,
            debug_mode: false,
        }
    }
}

impl Settings {
    /// Set the API keys.
    pub fn with_api_keys(mut self, api_keys: impl Into<String>) -> Self {
        self.api_keys = api_keys.into();
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request timeout in seconds.
    pub fn with_timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Set the maximum number of output tokens.
    pub fn with_max_output_tokens(mut self, max_output_tokens: i64) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// `max_output_tokens` clamped to the range the API accepts.
    pub fn clamped_max_output_tokens(&self) -> u32 {
        self.max_output_tokens.clamp(1, MAX_OUTPUT_TOKENS_LIMIT as i64) as u32
    }

    /// Reasoning effort with surrounding whitespace removed.
    pub fn reasoning_effort(&self) -> &str {
        self.thinking_effort.trim()
    }

    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Endpoint for the Responses API.
    pub fn responses_url(&self) -> String {
        format!("{}/responses", self.base_url.trim_end_matches('/'))
    }

    /// Validate settings that cannot be fixed up at use time.
    pub fn validate(&self) -> Result<()> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(PipeError::Config("base_url must not be empty".to_string()));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(PipeError::Config(format!(
                "base_url must be an http(s) URL, got {}",
                base_url
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(PipeError::Config(
                "timeout_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Expand `${VAR}` references from the environment.
    pub fn resolve_env_vars(&mut self) {
        self.api_keys = expand_env_var(&self.api_keys);
        self.base_url = expand_env_var(&self.base_url);
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,

    /// Log format: "compact", "pretty", "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl PipeConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PipeError::Config(format!("Failed to parse config: {}", e)))
    }
}

/// Expand an environment variable reference.
///
/// Supports `${VAR_NAME}` syntax; anything else is returned unchanged, as is
/// a reference to an unset variable.
fn expand_env_var(value: &str) -> String {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).unwrap_or_else(|_| value.to_string())
    } else {
        value.to_string()
    }
}

/// Loads [`PipeConfig`] from an optional file on top of the defaults.
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Loader that only uses defaults.
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Loader that reads the given file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Configured file path, if any.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Load, resolve and validate the configuration.
    ///
    /// A configured file that does not exist is an error; a loader without a
    /// path yields validated defaults.
    pub async fn load(&self) -> Result<PipeConfig> {
        let mut config = match &self.config_path {
            Some(path) => {
                let config = Self::load_from_path(path).await?;
                debug!(path = %path.display(), "Loaded pipe config");
                config
            }
            None => {
                debug!("No config file given, using defaults");
                PipeConfig::default()
            }
        };

        config.pipe.resolve_env_vars();
        config.pipe.validate()?;

        info!(
            base_url = %config.pipe.base_url,
            effort = %config.pipe.reasoning_effort(),
            "Configuration loaded successfully"
        );
        Ok(config)
    }

    async fn load_from_path(path: &Path) -> Result<PipeConfig> {
        if !path.exists() {
            return Err(PipeError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PipeError::Config(format!("Failed to read config: {}", e)))?;

        PipeConfig::from_toml_str(&content)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
