//! # Workflows
//!
//! Turning resolved plans into remote resources.
//!
//! - [`executor`] - Level-by-level plan execution with bounded concurrency
//! - [`constant_property`] - Constant-property create, patch, delete, and bulk variants
//! - [`series`] - Series create, patch, delete, and bulk create
//! - [`link`] - Link resources between two existing resources

pub mod constant_property;
pub mod executor;
pub mod link;
pub mod series;

use crate::api::{HandlerError, PayloadError, ResourceHandler, ResourceType};
use crate::calc::batch::BatchError;
use crate::resolver::ResolveError;
use thiserror::Error;

pub use constant_property::ConstantPropertyWorkflow;
pub use executor::{
    CreateSpec, EntityOutcome, ExecutionReport, ExecutorError, Outcome, PlanExecutor,
};
pub use link::{LinkKind, LinkRequest, LinkWorkflow};
pub use series::{SeriesRow, SeriesWorkflow};

/// Workflow errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Workflow needs a {expected} handler, got {actual}")]
    WrongHandler {
        expected: ResourceType,
        actual: ResourceType,
    },

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

pub(crate) fn ensure_handler<H: ResourceHandler>(
    expected: ResourceType,
    handler: &H,
) -> Result<(), WorkflowError> {
    let actual = handler.resource_type();
    if actual != expected {
        return Err(WorkflowError::WrongHandler { expected, actual });
    }
    Ok(())
}

pub(crate) fn ensure_limit(concurrent_request_limit: usize) -> Result<(), WorkflowError> {
    if concurrent_request_limit == 0 {
        return Err(ExecutorError::InvalidLimit {
            count: concurrent_request_limit,
        }
        .into());
    }
    Ok(())
}
