//! # coffee Library
//!
//! Dependency-ordered bulk creation of resources in a JSON:API business-data
//! service. Batches of constant properties reference each other through
//! formulas; the resolver orders them so every property is created after the
//! ones it references, and the workflow layer submits them level by level.
//!
//! ## Core Modules
//!
//! - [`resolver`] - Dependency graph, cycle detection, and execution plans
//! - [`calc`] - Formula references and constant-property batch files
//! - [`api`] - JSON:API documents and resource handlers
//! - [`workflow`] - Plan execution with bounded concurrency
//! - [`primitives`] - Shared enums, logger config, and errors
//! - [`logger`] - Structured logging with progress tracking
//! - [`application`] - CLI interface and configuration management
//!
//! ## Quick Start
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! coffee_lib::main().await
//! # }
//! ```

pub mod api;
pub mod application;
pub mod calc;
pub mod logger;
pub mod primitives;
pub mod resolver;
pub mod workflow;

// Re-export commonly used types for convenience
pub use application::{AppConfig, Cli, CliConfig, Commands, execute_command};
pub use logger::Logger;
pub use primitives::{ColorIntent, ConfigError, LogFormat, LogLevel, LogOutput, LoggerError};
pub use resolver::{Entity, ExecutionPlan, ResolveError, resolve};

use anyhow::Result;

pub async fn main() -> Result<()> {
    let config = CliConfig::load()?;
    execute_command(config).await
}
