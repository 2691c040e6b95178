//! Configuration loading
//!
//! Coordinates loading configuration from `.env` files, the environment, and
//! the command line.

use crate::primitives::ConfigError;
use clap::Parser;
use tracing::trace;

use super::{
    cli::{Cli, Commands},
    config::AppConfig,
    env::EnvironmentConfig,
};

/// Env files read before the command line is parsed, first one wins per key
pub const ENV_FILES: [&str; 2] = [".env.local", ".env"];

/// Resolved configuration plus the command to run
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub app_config: AppConfig,
    pub command: Option<Commands>,
}

impl CliConfig {
    /// Load config: defaults -> .env -> env vars -> CLI
    pub fn load() -> Result<Self, ConfigError> {
        load_env_files()?;
        let environment = EnvironmentConfig::load()?;
        Self::from_cli(Cli::parse(), &environment)
    }

    /// Layer parsed CLI values over defaults and standard environment variables
    pub fn from_cli(cli: Cli, environment: &EnvironmentConfig) -> Result<Self, ConfigError> {
        let mut config = AppConfig::default();
        config.color = environment.apply_color_config(config.color);
        config = config.merge_with(cli.config);
        config.validate()?;

        Ok(Self {
            app_config: config,
            command: cli.command,
        })
    }
}

/// Populate the process environment from `.env.local` and `.env`
///
/// Missing files are fine; unreadable or malformed ones are errors. Variables
/// already set in the environment are never overridden.
pub fn load_env_files() -> Result<(), ConfigError> {
    for env_file in ENV_FILES {
        match dotenvy::from_filename(env_file) {
            Ok(path) => trace!("Loaded {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => {
                return Err(ConfigError::EnvFileError {
                    file: env_file.to_string(),
                    source: e,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    include!("loader.test.rs");
}
