//! Application configuration management
//!
//! Handles config loading, validation, and environment variable processing
//! following the precedence: defaults -> .env -> env vars -> CLI args.

use crate::primitives::*;
use clap::Parser;
use serde::Deserialize;

/// Default configuration values
pub mod defaults {
    pub const LOG_LEVEL: &str = "0"; // Error-only logging by default
    pub const LOG_FORMAT: &str = "text";
    pub const LOG_OUTPUT: &str = "stderr";
    pub const COLOR: &str = "auto";
    pub const CONCURRENT_REQUEST_LIMIT: &str = "4";
}

/// Default value functions for configuration fields
mod default_fns {
    use super::*;

    pub fn log_level() -> u8 {
        0
    }

    pub fn log_format() -> LogFormat {
        LogFormat::Text
    }

    pub fn log_output() -> LogOutput {
        LogOutput::Stderr
    }

    pub fn color() -> ColorIntent {
        ColorIntent::Auto
    }

    pub fn concurrent_request_limit() -> usize {
        4
    }
}

/// Application configuration structure
#[derive(Debug, Clone, PartialEq, Parser, Deserialize)]
pub struct AppConfig {
    /// Maximum number of create requests in flight at once
    #[arg(
        short = 'j',
        long,
        env = "COFFEE_CONCURRENT_REQUEST_LIMIT",
        default_value = defaults::CONCURRENT_REQUEST_LIMIT
    )]
    #[serde(default = "default_fns::concurrent_request_limit")]
    pub concurrent_request_limit: usize,

    /// Verbosity level (0=error, 1=warn, 2=info, 3=debug, 4=trace)
    #[arg(long, env = "COFFEE_LOG_LEVEL", default_value = defaults::LOG_LEVEL)]
    #[serde(default = "default_fns::log_level")]
    pub log_level: u8,

    /// Log format (text, json, yaml)
    #[arg(long, env = "COFFEE_LOG_FORMAT", default_value = defaults::LOG_FORMAT)]
    #[serde(default = "default_fns::log_format")]
    pub log_format: LogFormat,

    /// Log output stream (stderr, stdout)
    #[arg(long, env = "COFFEE_LOG_OUTPUT", default_value = defaults::LOG_OUTPUT)]
    #[serde(default = "default_fns::log_output")]
    pub log_output: LogOutput,

    /// Color output control (auto, always, never)
    #[arg(long, env = "COFFEE_COLOR", default_value = defaults::COLOR)]
    #[serde(default = "default_fns::color")]
    pub color: ColorIntent,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            concurrent_request_limit: default_fns::concurrent_request_limit(),
            log_level: default_fns::log_level(),
            log_format: default_fns::log_format(),
            log_output: default_fns::log_output(),
            color: default_fns::color(),
        }
    }
}

impl AppConfig {
    /// Logger settings, with `auto` colour decided by the stderr terminal
    pub fn to_logger_config(&self) -> LoggerConfig {
        LoggerConfig {
            level: LogLevel::from_verbosity(self.log_level),
            format: self.log_format,
            output: self.log_output,
            color: self.color.resolve(console::colors_enabled_stderr()),
        }
    }

    /// Merge this config with another, taking non-default values from other
    pub fn merge_with(mut self, other: Self) -> Self {
        if other.log_level != default_fns::log_level() {
            self.log_level = other.log_level;
        }
        if other.concurrent_request_limit != default_fns::concurrent_request_limit() {
            self.concurrent_request_limit = other.concurrent_request_limit;
        }

        if !matches!(other.log_format, LogFormat::Text) {
            self.log_format = other.log_format;
        }
        if !matches!(other.log_output, LogOutput::Stderr) {
            self.log_output = other.log_output;
        }
        if !matches!(other.color, ColorIntent::Auto) {
            self.color = other.color;
        }

        self
    }

    /// Validate the final configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrent_request_limit == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "concurrent request limit must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}
