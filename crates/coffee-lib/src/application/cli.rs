use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::HashSet;
use std::path::PathBuf;

use super::config::AppConfig;

/// coffee CLI - dependency-ordered bulk creation
#[derive(Debug, Clone, Parser)]
#[command(name = "coffee")]
#[command(about = "Order and create batches of interdependent business-data resources")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Global configuration options
    #[command(flatten)]
    pub config: AppConfig,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available coffee commands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Print the creation order for a constant-property batch
    Plan {
        #[command(flatten)]
        batch: BatchArgs,

        /// Group the order into levels that can be created concurrently
        #[arg(long)]
        levels: bool,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Validate a batch: no cycles and no unknown references
    Check {
        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Split a batch into its calculation tree and independent rows
    Split {
        /// Batch file (.json, .yaml, .yml, .toml)
        file: PathBuf,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Bulk-create a batch against an in-memory API and report the outcome
    Simulate {
        #[command(flatten)]
        batch: BatchArgs,

        /// Make creating this constant property fail (repeatable)
        #[arg(long = "fail", value_name = "NAME")]
        fail: Vec<String>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Show version information
    Version,
}

/// Batch file plus the names that already exist remotely
#[derive(Debug, Clone, Args)]
pub struct BatchArgs {
    /// Batch file (.json, .yaml, .yml, .toml)
    pub file: PathBuf,

    /// Name of a constant property that already exists (repeatable)
    #[arg(short, long = "existing", value_name = "NAME")]
    pub existing: Vec<String>,
}

impl BatchArgs {
    pub fn known_existing(&self) -> HashSet<String> {
        self.existing.iter().cloned().collect()
    }
}

/// Command output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            command: None,
        }
    }
}

#[cfg(test)]
mod tests {
    include!("cli.test.rs");
}
