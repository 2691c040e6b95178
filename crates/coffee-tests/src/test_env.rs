//! Isolated environment for end-to-end command tests
//!
//! Batch files go into a private temporary directory and command output is
//! captured in memory instead of going to stdout.

use anyhow::Result;
use coffee_lib::application::{AppConfig, Commands, execute_command_with_writer};
use std::path::PathBuf;
use tempfile::TempDir;

use crate::fixtures::{BatchFormat, BatchRow};

/// Temporary workspace plus the configuration commands run with
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub config: AppConfig,
}

/// What a command printed and how it ended
#[derive(Debug)]
pub struct CommandOutput {
    pub result: Result<()>,
    pub stdout: String,
}

impl CommandOutput {
    pub fn lines(&self) -> Vec<&str> {
        self.stdout.lines().collect()
    }

    /// Full error chain, empty on success
    pub fn error_chain(&self) -> String {
        match &self.result {
            Ok(()) => String::new(),
            Err(e) => format!("{e:#}"),
        }
    }
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
            config: AppConfig::default(),
        })
    }

    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.config.concurrent_request_limit = limit;
        self
    }

    /// Write `rows` as `<stem>.<ext>` and return the path
    pub fn write_batch(&self, stem: &str, format: BatchFormat, rows: &[BatchRow]) -> Result<PathBuf> {
        self.write_raw(&format!("{}.{}", stem, format.extension()), &format.render(rows))
    }

    /// Write arbitrary file content and return the path
    pub fn write_raw(&self, file_name: &str, content: &str) -> Result<PathBuf> {
        let path = self.temp_dir.path().join(file_name);
        std::fs::write(&path, content)?;
        Ok(path)
    }

    pub async fn run(&self, command: Commands) -> CommandOutput {
        let mut buffer = Vec::new();
        let result = execute_command_with_writer(command, &self.config, &mut buffer).await;
        CommandOutput {
            result,
            stdout: String::from_utf8_lossy(&buffer).into_owned(),
        }
    }
}
