//! CLI configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via --config or TABLEFSM_CONFIG)
//! 3. Environment variables
//! 4. Command-line flags

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tablefsm_core::{LexerOptions, RunLimits, ERROR_LABEL};
use thiserror::Error;

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine configuration.
    pub engine: EngineConfig,
    /// Output configuration.
    pub output: OutputConfig,
    /// Logging configuration.
    pub log: LogConfig,
}

impl Config {
    /// Loads configuration from `path`, if any, then applies environment
    /// variable overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Applies overrides looked up by environment variable name.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.engine.apply_env_overrides(&lookup);
        self.output.apply_env_overrides(&lookup);
        self.log.apply_env_overrides(&lookup);
    }

    /// Applies command-line flags, then re-validates.
    pub fn apply_cli_overrides(&mut self, overrides: &CliOverrides) -> Result<(), ConfigError> {
        if overrides.json {
            self.output.format = OutputFormat::Json;
        }
        if overrides.no_color {
            self.output.color = false;
        }
        if let Some(steps) = overrides.max_steps {
            self.engine.max_steps = Some(steps);
        }
        self.validate()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.error_label.is_empty() {
            return Err(ConfigError::Validation(
                "engine.error_label must not be empty".to_string(),
            ));
        }
        if self.engine.max_steps == Some(0) {
            return Err(ConfigError::Validation(
                "engine.max_steps must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_yaml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Ok(())
    }

    /// Renders the configuration as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(PathBuf::new(), e.to_string()))
    }
}

/// Command-line flags that override file and environment settings.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub json: bool,
    pub no_color: bool,
    pub max_steps: Option<u64>,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Step budget per tokenizer/extractor run. Unlimited when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u64>,
    /// Label given to runs that end in a non-final state.
    pub error_label: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: None,
            error_label: ERROR_LABEL.to_string(),
        }
    }
}

impl EngineConfig {
    fn apply_env_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(steps) = lookup("TABLEFSM_MAX_STEPS") {
            if let Ok(n) = steps.parse() {
                self.max_steps = Some(n);
            }
        }

        if let Some(label) = lookup("TABLEFSM_ERROR_LABEL") {
            if !label.is_empty() {
                self.error_label = label;
            }
        }
    }

    /// Returns the run limits for the engines.
    pub fn limits(&self) -> RunLimits {
        RunLimits {
            max_steps: self.max_steps,
        }
    }

    /// Returns the tokenizer options.
    pub fn lexer_options(&self) -> LexerOptions {
        LexerOptions {
            error_label: self.error_label.clone(),
            limits: self.limits(),
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Result format.
    pub format: OutputFormat,
    /// Colorize text output.
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
        }
    }
}

impl OutputConfig {
    fn apply_env_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(format) = lookup("TABLEFSM_OUTPUT") {
            match format.to_lowercase().as_str() {
                "json" => self.format = OutputFormat::Json,
                "text" => self.format = OutputFormat::Text,
                _ => {}
            }
        }

        if let Some(color) = lookup("TABLEFSM_COLOR") {
            self.color = color == "1" || color.to_lowercase() == "true";
        }

        // https://no-color.org
        if lookup("NO_COLOR").is_some_and(|v| !v.is_empty()) {
            self.color = false;
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default `tracing` filter directive; RUST_LOG takes precedence.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl LogConfig {
    fn apply_env_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(filter) = lookup("TABLEFSM_LOG") {
            if !filter.is_empty() {
                self.filter = filter;
            }
        }
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),

    #[error("failed to parse config file '{}': {}", .0.display(), .1)]
    Parse(PathBuf, String),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}
