//! TOML Configuration File Support
//!
//! Centralized configuration loading for forge, backed by an optional TOML
//! file at `~/.config/forge/forge.toml`.
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! output_dir = "./generated"
//!
//! [backend]
//! endpoint = "http://localhost:3000/api/generate"
//! model = "coder-large"
//! temperature = 0.7
//! max_tokens = 4000
//! timeout_secs = 120
//!
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 1000
//!
//! [render]
//! chunk_size = 15
//! chunk_delay_ms = 20
//! stage_timing = true
//!
//! [transcript]
//! path = "~/.local/share/forge/transcript.json"
//! max_messages = 100
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::GenerationOptions;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// Configuration Sections
// =============================================================================

/// `[backend]` section
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Generation endpoint URL
    pub endpoint: String,
    /// Model identifier passed through to the backend
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Per-request transport timeout
    pub timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/api/generate".to_string(),
            model: "default".to_string(),
            temperature: 0.7,
            max_tokens: 4000,
            timeout_secs: 120,
        }
    }
}

impl BackendSettings {
    /// Options sent with every request
    #[must_use]
    pub fn options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            model: self.model.clone(),
        }
    }
}

/// `[retry]` section
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts, first one included
    pub max_attempts: u32,
    /// Delay unit; attempt `n` failing waits `n × base_delay_ms`
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetrySettings {
    /// Delay before the attempt after `failed_attempt` (1-indexed)
    #[must_use]
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(u64::from(failed_attempt)))
    }
}

/// `[render]` section
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Characters revealed per step
    pub chunk_size: usize,
    /// Pause between steps
    pub chunk_delay_ms: u64,
    /// Whether stages advance on their simulated timer
    pub stage_timing: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            chunk_size: 15,
            chunk_delay_ms: 20,
            stage_timing: true,
        }
    }
}

/// `[transcript]` section
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// Where the transcript is persisted; `None` keeps it in memory
    pub path: Option<PathBuf>,
    /// Most recent messages kept when persisting
    pub max_messages: usize,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            path: default_transcript_path(),
            max_messages: 100,
        }
    }
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// Directory generated files are written under
    pub output_dir: PathBuf,
    /// Backend section
    pub backend: BackendSettings,
    /// Retry section
    pub retry: RetrySettings,
    /// Render section
    pub render: RenderSettings,
    /// Transcript section
    pub transcript: TranscriptSettings,
    /// Path to the config file that was loaded (if any)
    #[serde(skip)]
    pub config_file_path: Option<PathBuf>,
    /// Highest-priority source that contributed a value
    #[serde(skip, default = "default_source")]
    source: ConfigSource,
}

fn default_source() -> ConfigSource {
    ConfigSource::Default
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated"),
            backend: BackendSettings::default(),
            retry: RetrySettings::default(),
            render: RenderSettings::default(),
            transcript: TranscriptSettings::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ForgeConfig {
    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check values that would make the pipeline misbehave
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.render.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "render.chunk_size must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.backend.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "backend.temperature must be within 0.0..=2.0, got {}",
                self.backend.temperature
            )));
        }
        if self.backend.endpoint.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "backend.endpoint must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply CLI overrides (highest priority)
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        let mut touched = false;
        if let Some(ref endpoint) = overrides.endpoint {
            self.backend.endpoint.clone_from(endpoint);
            touched = true;
        }
        if let Some(ref model) = overrides.model {
            self.backend.model.clone_from(model);
            touched = true;
        }
        if let Some(ref dir) = overrides.output_dir {
            self.output_dir.clone_from(dir);
            touched = true;
        }
        if let Some(ref path) = overrides.transcript_path {
            self.transcript.path = Some(path.clone());
            touched = true;
        }
        if let Some(delay) = overrides.chunk_delay_ms {
            self.render.chunk_delay_ms = delay;
            touched = true;
        }
        if touched {
            self.source = ConfigSource::Cli;
        }
    }
}

/// Values supplied on the command line
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Backend endpoint
    pub endpoint: Option<String>,
    /// Model identifier
    pub model: Option<String>,
    /// Output directory
    pub output_dir: Option<PathBuf>,
    /// Transcript file
    pub transcript_path: Option<PathBuf>,
    /// Reveal pacing
    pub chunk_delay_ms: Option<u64>,
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/forge/forge.toml` or
/// `~/.config/forge/forge.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("forge").join("forge.toml"))
}

/// Default transcript location under the XDG data directory
#[must_use]
pub fn default_transcript_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("forge").join("transcript.json"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<ForgeConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ForgeConfig, ConfigError> {
    let mut config = ForgeConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            config = toml::from_str(&toml_content)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    match value.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value, "Ignoring unparseable environment override");
            None
        }
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut ForgeConfig, lookup: impl Fn(&str) -> Option<String>) {
    let mut touched = false;

    if let Some(endpoint) = lookup("FORGE_ENDPOINT") {
        config.backend.endpoint = endpoint;
        touched = true;
    }
    if let Some(model) = lookup("FORGE_MODEL") {
        config.backend.model = model;
        touched = true;
    }
    if let Some(v) = lookup("FORGE_TEMPERATURE").and_then(|v| parse_env("FORGE_TEMPERATURE", &v)) {
        config.backend.temperature = v;
        touched = true;
    }
    if let Some(v) = lookup("FORGE_MAX_TOKENS").and_then(|v| parse_env("FORGE_MAX_TOKENS", &v)) {
        config.backend.max_tokens = v;
        touched = true;
    }
    if let Some(v) = lookup("FORGE_TIMEOUT_SECS").and_then(|v| parse_env("FORGE_TIMEOUT_SECS", &v))
    {
        config.backend.timeout_secs = v;
        touched = true;
    }
    if let Some(v) = lookup("FORGE_MAX_ATTEMPTS").and_then(|v| parse_env("FORGE_MAX_ATTEMPTS", &v))
    {
        config.retry.max_attempts = v;
        touched = true;
    }
    if let Some(v) =
        lookup("FORGE_RETRY_DELAY_MS").and_then(|v| parse_env("FORGE_RETRY_DELAY_MS", &v))
    {
        config.retry.base_delay_ms = v;
        touched = true;
    }
    if let Some(v) = lookup("FORGE_CHUNK_SIZE").and_then(|v| parse_env("FORGE_CHUNK_SIZE", &v)) {
        config.render.chunk_size = v;
        touched = true;
    }
    if let Some(v) =
        lookup("FORGE_CHUNK_DELAY_MS").and_then(|v| parse_env("FORGE_CHUNK_DELAY_MS", &v))
    {
        config.render.chunk_delay_ms = v;
        touched = true;
    }
    if let Some(path) = lookup("FORGE_TRANSCRIPT") {
        config.transcript.path = Some(PathBuf::from(path));
        touched = true;
    }
    if let Some(dir) = lookup("FORGE_OUTPUT_DIR") {
        config.output_dir = PathBuf::from(dir);
        touched = true;
    }

    if touched {
        config.source = ConfigSource::Env;
    }
}
