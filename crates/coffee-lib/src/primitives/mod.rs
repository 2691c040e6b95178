//! coffee primitives - shared enums, logger config, and errors
//!
//! Small types used by both the application layer and the logger. Config
//! values parse through clap so CLI flags, environment variables, and `.env`
//! files accept the same spellings.

use clap::ValueEnum;
use std::str::FromStr;
use thiserror::Error;

// Shared macros and patterns
mod shared;
use shared::impl_fromstr_for_value_enum;

/// Available log output streams
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// STDERR
    Stderr,
    /// STDOUT
    Stdout,
}

/// Log levels for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

/// Output formats for structured logging
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// TEXT
    /// alias: text, txt, plain
    Text,

    /// JSON
    /// alias: json
    Json,

    /// Multi-line human readable output
    /// alias: yaml, yml, pretty
    Yaml,
}

/// Whether to colour output
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorIntent {
    /// Colour when stderr is a capable terminal
    /// alias: auto, automatic, detect, default
    Auto,

    /// alias: always, force, on
    Always,

    /// alias: never, off
    Never,
}

impl ColorIntent {
    /// Final on/off decision given what the terminal supports
    pub fn resolve(self, terminal_supports_color: bool) -> bool {
        match self {
            ColorIntent::Auto => terminal_supports_color,
            ColorIntent::Always => true,
            ColorIntent::Never => false,
        }
    }
}

// ============================================================================
// LOGGER CONFIGURATION TYPES
// ============================================================================

/// Logger configuration derived from the application config
#[derive(Debug, Clone, PartialEq)]
pub struct LoggerConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// ANSI colour in text output
    pub color: bool,
}

// ============================================================================
// STRUCTURED ERROR TYPES
// ============================================================================

/// Application configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load environment file '{file}': {source}")]
    EnvFileError {
        file: String,
        source: dotenvy::Error,
    },

    #[error("Global configuration already initialized")]
    AlreadyInitialized,

    #[error("Failed to parse environment variables: {source}")]
    EnvironmentParsingFailed {
        #[from]
        source: envy::Error,
    },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Failed to parse configuration value '{value}': {reason}")]
    ParseError { value: String, reason: String },
}

/// Logger initialization errors
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Failed to initialize tracing subscriber: {reason}")]
    InitializationFailed { reason: String },

    #[error("Logger already initialized")]
    AlreadyInitialized,
}

impl LogLevel {
    /// Convert verbosity level from AppConfig to LogLevel
    pub fn from_verbosity(verbosity: u8) -> Self {
        match verbosity {
            0 => LogLevel::Error,
            1 => LogLevel::Warning,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            4.. => LogLevel::Trace,
        }
    }

    /// Check if this log level should be displayed given current verbosity
    pub fn should_log(&self, current_level: LogLevel) -> bool {
        *self <= current_level
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warning => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl ValueEnum for LogLevel {
    fn value_variants<'a>() -> &'a [Self] {
        &[
            Self::Error,
            Self::Warning,
            Self::Info,
            Self::Debug,
            Self::Trace,
        ]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Error => Some(
                clap::builder::PossibleValue::new("error")
                    .alias("err")
                    .alias("fatal"),
            ),
            Self::Warning => Some(clap::builder::PossibleValue::new("warn").alias("warning")),
            Self::Info => Some(clap::builder::PossibleValue::new("info")),
            Self::Debug => Some(clap::builder::PossibleValue::new("debug")),
            Self::Trace => Some(
                clap::builder::PossibleValue::new("trace").alias("verbose"),
            ),
        }
    }
}

impl ValueEnum for LogFormat {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Text, Self::Json, Self::Yaml]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Text => Some(
                clap::builder::PossibleValue::new("text")
                    .alias("txt")
                    .alias("plain"),
            ),
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Yaml => Some(
                clap::builder::PossibleValue::new("yaml")
                    .alias("yml")
                    .alias("pretty"),
            ),
        }
    }
}

impl ValueEnum for ColorIntent {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Auto, Self::Always, Self::Never]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Auto => Some(
                clap::builder::PossibleValue::new("auto")
                    .alias("automatic")
                    .alias("detect")
                    .alias("default"),
            ),
            Self::Always => Some(
                clap::builder::PossibleValue::new("always")
                    .alias("force")
                    .alias("on"),
            ),
            Self::Never => Some(clap::builder::PossibleValue::new("never").alias("off")),
        }
    }
}

// Generate FromStr implementations for all ValueEnum types
impl_fromstr_for_value_enum!(LogLevel, "invalid log level");
impl_fromstr_for_value_enum!(LogFormat, "invalid log format");
impl_fromstr_for_value_enum!(LogOutput, "invalid log output stream");
impl_fromstr_for_value_enum!(ColorIntent, "invalid color intent");

#[cfg(test)]
mod tests {
    include!("mod.test.rs");
}
