use crate::primitives::*;
use std::sync::OnceLock;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Global logger instance - ensures single initialization
static GLOBAL_LOGGER: OnceLock<Logger> = OnceLock::new();

/// Crates whose spans and events follow the configured level
const OWN_TARGETS: [&str; 2] = ["coffee_lib", "coffee"];

/// Tracing subscriber with indicatif progress bars
#[derive(Debug)]
pub struct Logger {
    config: LoggerConfig,
}

impl Logger {
    /// Initialize the global logger
    ///
    /// `RUST_LOG` takes precedence over the configured level when set.
    pub fn init(config: LoggerConfig) -> Result<&'static Self, LoggerError> {
        if GLOBAL_LOGGER.get().is_some() {
            return Err(LoggerError::AlreadyInitialized);
        }

        let indicatif_layer = IndicatifLayer::new();

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(filter_directives(config.level)));

        let fmt_layer = match (config.output, config.format) {
            (LogOutput::Stderr, LogFormat::Text) => fmt::layer()
                .with_writer(indicatif_layer.get_stderr_writer())
                .with_ansi(config.color)
                .compact()
                .boxed(),
            (LogOutput::Stderr, LogFormat::Json) => fmt::layer()
                .with_writer(indicatif_layer.get_stderr_writer())
                .with_ansi(false)
                .json()
                .boxed(),
            (LogOutput::Stderr, LogFormat::Yaml) => fmt::layer()
                .with_writer(indicatif_layer.get_stderr_writer())
                .with_ansi(config.color)
                .pretty()
                .boxed(),
            (LogOutput::Stdout, LogFormat::Text) => fmt::layer()
                .with_writer(indicatif_layer.get_stdout_writer())
                .with_ansi(config.color)
                .compact()
                .boxed(),
            (LogOutput::Stdout, LogFormat::Json) => fmt::layer()
                .with_writer(indicatif_layer.get_stdout_writer())
                .with_ansi(false)
                .json()
                .boxed(),
            (LogOutput::Stdout, LogFormat::Yaml) => fmt::layer()
                .with_writer(indicatif_layer.get_stdout_writer())
                .with_ansi(config.color)
                .pretty()
                .boxed(),
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(indicatif_layer)
            .try_init()
            .map_err(|e| LoggerError::InitializationFailed {
                reason: e.to_string(),
            })?;

        tracing::debug!(
            level = ?config.level,
            format = ?config.format,
            output = ?config.output,
            color = config.color,
            "Logger initialized"
        );

        let logger = GLOBAL_LOGGER.get_or_init(|| Logger { config });
        Ok(logger)
    }

    /// Get reference to the global logger instance
    pub fn global() -> Option<&'static Self> {
        GLOBAL_LOGGER.get()
    }

    pub fn is_initialized() -> bool {
        GLOBAL_LOGGER.get().is_some()
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }
}

/// `EnvFilter` directives: our crates at `level`, everything else at warn
pub fn filter_directives(level: LogLevel) -> String {
    let mut directives: Vec<String> = OWN_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level.as_filter()))
        .collect();
    directives.push(format!("tokio=warn,{}", LogLevel::Warning.min(level).as_filter()));
    directives.join(",")
}

/// Create a span for operations that should show progress bars
#[macro_export]
macro_rules! progress_span {
    ($operation:expr) => {
        tracing::info_span!("progress", operation = $operation)
    };
    ($operation:expr, total = $total:expr) => {
        tracing::info_span!("progress", operation = $operation, total = $total)
    };
}

#[cfg(test)]
mod tests {
    include!("mod.test.rs");
}
