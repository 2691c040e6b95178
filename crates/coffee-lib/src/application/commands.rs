//! Command execution handlers
//!
//! Every handler writes its report to an injected writer so tests can capture
//! output; logging goes through tracing to stderr or stdout separately.

use crate::api::{InMemoryResourceHandler, ResourceType};
use crate::application::cli::{BatchArgs, Commands, OutputFormat};
use crate::application::{AppConfig, CliConfig};
use crate::calc::{load_batch, partition_calculation_tree, to_entities};
use crate::logger::Logger;
use crate::primitives::LoggerError;
use crate::resolver::{ExecutionPlan, resolve};
use crate::workflow::{ConstantPropertyWorkflow, ExecutionReport, Outcome};
use anyhow::{Context, Result};
use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Execute CLI commands, writing results to stdout
pub async fn execute_command(config: CliConfig) -> Result<()> {
    let CliConfig {
        app_config,
        command,
    } = config;

    accept_logger_init(Logger::init(app_config.to_logger_config()))?;

    let mut stdout = std::io::stdout();
    let Some(command) = command else {
        writeln!(stdout, "coffee - dependency-ordered bulk creation")?;
        writeln!(stdout, "Run 'coffee --help' for usage information")?;
        return Ok(());
    };

    execute_command_with_writer(command, &app_config, &mut stdout).await
}

/// A logger installed earlier in the process is kept; any other failure aborts
fn accept_logger_init(result: Result<&'static Logger, LoggerError>) -> Result<()> {
    match result {
        Ok(_) | Err(LoggerError::AlreadyInitialized) => Ok(()),
        Err(e) => Err(e).context("Failed to initialize logging"),
    }
}

/// Execute a specific command against a provided writer (for testing)
pub async fn execute_command_with_writer<W: Write>(
    command: Commands,
    config: &AppConfig,
    out: &mut W,
) -> Result<()> {
    debug!("Executing {:?}", command);
    match command {
        Commands::Plan {
            batch,
            levels,
            output,
        } => handle_plan(&batch, levels, output, out),
        Commands::Check { batch } => handle_check(&batch, out),
        Commands::Split { file, output } => handle_split(&file, output, out),
        Commands::Simulate {
            batch,
            fail,
            output,
        } => handle_simulate(&batch, fail, output, config, out).await,
        Commands::Version => handle_version(out),
    }
}

fn load_plan(batch: &BatchArgs) -> Result<ExecutionPlan> {
    let rows = load_batch(&batch.file)?;
    let entities = to_entities(rows);
    resolve(&entities, &batch.known_existing())
        .with_context(|| format!("Cannot order batch {}", batch.file.display()))
}

fn handle_plan<W: Write>(
    batch: &BatchArgs,
    levels: bool,
    output: OutputFormat,
    out: &mut W,
) -> Result<()> {
    let plan = load_plan(batch)?;

    match (output, levels) {
        (OutputFormat::Json, false) => {
            writeln!(out, "{}", serde_json::to_string_pretty(&plan)?)?;
        }
        (OutputFormat::Json, true) => {
            let document = json!({
                "levels": plan.levels(),
                "external": plan.external_references(),
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&document)?)?;
        }
        (OutputFormat::Text, false) => {
            for (index, id) in plan.order().iter().enumerate() {
                writeln!(out, "{}. {}", index + 1, id)?;
            }
            write_external(&plan, out)?;
        }
        (OutputFormat::Text, true) => {
            for (level, ids) in plan.levels().iter().enumerate() {
                writeln!(out, "Level {}: {}", level, ids.join(", "))?;
            }
            write_external(&plan, out)?;
        }
    }

    Ok(())
}

fn write_external<W: Write>(plan: &ExecutionPlan, out: &mut W) -> Result<()> {
    if !plan.external_references().is_empty() {
        writeln!(out, "Existing: {}", plan.external_references().join(", "))?;
    }
    Ok(())
}

fn handle_check<W: Write>(batch: &BatchArgs, out: &mut W) -> Result<()> {
    let plan = load_plan(batch)?;
    writeln!(
        out,
        "Batch OK: {} constant properties in {} levels",
        plan.len(),
        plan.depth()
    )?;
    Ok(())
}

fn handle_split<W: Write>(file: &Path, output: OutputFormat, out: &mut W) -> Result<()> {
    let rows = load_batch(file)?;
    let (in_tree, independent) = partition_calculation_tree(rows);
    let tree_names: Vec<&str> = in_tree.iter().map(|row| row.name.as_str()).collect();
    let independent_names: Vec<&str> = independent.iter().map(|row| row.name.as_str()).collect();

    match output {
        OutputFormat::Json => {
            let document = json!({
                "calculation_tree": tree_names,
                "independent": independent_names,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&document)?)?;
        }
        OutputFormat::Text => {
            writeln!(out, "Calculation tree ({}):", tree_names.len())?;
            for name in &tree_names {
                writeln!(out, "  {}", name)?;
            }
            writeln!(out, "Independent ({}):", independent_names.len())?;
            for name in &independent_names {
                writeln!(out, "  {}", name)?;
            }
        }
    }

    Ok(())
}

async fn handle_simulate<W: Write>(
    batch: &BatchArgs,
    fail: Vec<String>,
    output: OutputFormat,
    config: &AppConfig,
    out: &mut W,
) -> Result<()> {
    let rows = load_batch(&batch.file)?;

    let mut handler = InMemoryResourceHandler::new(ResourceType::ConstantProperty);
    for name in &batch.existing {
        handler = handler.with_existing(name.clone());
    }
    for name in fail {
        handler = handler.with_failure(name, "simulated failure");
    }

    let workflow = ConstantPropertyWorkflow::new(Arc::new(handler), config.concurrent_request_limit)?;
    let report = workflow
        .bulk_create(rows)
        .await
        .with_context(|| format!("Cannot create batch {}", batch.file.display()))?;

    match output {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?,
        OutputFormat::Text => write_report(&report, out)?,
    }

    if !report.is_complete() {
        anyhow::bail!(
            "{} of {} constant properties were not created",
            report.outcomes.len() - report.created_count(),
            report.outcomes.len()
        );
    }
    Ok(())
}

fn write_report<W: Write>(report: &ExecutionReport, out: &mut W) -> Result<()> {
    for entry in &report.outcomes {
        match &entry.outcome {
            Outcome::Created { resource } => {
                writeln!(out, "created  {} ({})", entry.id, resource.id)?
            }
            Outcome::Updated { resource } => {
                writeln!(out, "updated  {} ({})", entry.id, resource.id)?
            }
            Outcome::Deleted => writeln!(out, "deleted  {}", entry.id)?,
            Outcome::Failed { error } => writeln!(out, "failed   {}: {}", entry.id, error)?,
            Outcome::Skipped { blocked_by } => {
                writeln!(out, "skipped  {} (blocked by {})", entry.id, blocked_by)?
            }
        }
    }

    writeln!(
        out,
        "Created {}, failed {}, skipped {}",
        report.created_count(),
        report.failed().len(),
        report.skipped().len()
    )?;
    Ok(())
}

fn handle_version<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "coffee {}", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    include!("commands.test.rs");
}
