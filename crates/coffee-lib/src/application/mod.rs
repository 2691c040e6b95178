//! Application layer modules
//!
//! CLI interface, configuration loading, and command execution.

pub mod cli;
pub mod commands;
pub mod config;
pub mod env;
pub mod loader;

pub use cli::{BatchArgs, Cli, Commands, OutputFormat};
pub use commands::{execute_command, execute_command_with_writer};
pub use config::AppConfig;
pub use env::EnvironmentConfig;
pub use loader::*;
