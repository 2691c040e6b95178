//! Plan execution against a resource handler
//!
//! Replays an [`ExecutionPlan`] level by level. Entities inside a level never
//! depend on each other, so they are submitted as concurrent tasks bounded by
//! a semaphore. Levels run strictly one after another.

use crate::api::{
    HandlerError, PayloadError, RemoteResource, ResourceDocument, ResourceHandler, ResourceRef,
};
use crate::resolver::{Entity, ExecutionPlan};
use indicatif::ProgressStyle;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{Instrument, Span, debug, info, trace, warn};
use tracing_indicatif::span_ext::IndicatifSpanExt;

/// Executor errors
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Invalid concurrent request limit: {count} (must be > 0)")]
    InvalidLimit { count: usize },

    #[error("Plan schedules '{id}' but no entity with that identifier was supplied")]
    MissingEntity { id: String },

    #[error("'{entity}' links to '{target}', which has no remote id")]
    UnresolvedLink { entity: String, target: String },

    #[error("Invalid document: {0}")]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error("Task join error: {source}")]
    TaskJoinError {
        #[from]
        source: tokio::task::JoinError,
    },

    #[error("Semaphore acquire error: {source}")]
    SemaphoreError {
        #[from]
        source: tokio::sync::AcquireError,
    },
}

/// What to create: attributes plus relationships to other identifiers
///
/// Link targets are batch identifiers or known-existing names; the executor
/// swaps them for remote ids at submission time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateSpec {
    pub attributes: Map<String, Value>,
    /// Relationship name -> target identifier
    pub links: BTreeMap<String, String>,
}

impl CreateSpec {
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self {
            attributes,
            links: BTreeMap::new(),
        }
    }

    pub fn with_link(mut self, relationship: impl Into<String>, target: impl Into<String>) -> Self {
        self.links.insert(relationship.into(), target.into());
        self
    }

    /// Wrap in an entity that depends on every link target
    pub fn into_entity(self, id: impl Into<String>) -> Entity<CreateSpec> {
        let targets: Vec<String> = self.links.values().cloned().collect();
        Entity::new(id, self).with_dependencies(targets)
    }
}

/// Result of one scheduled entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Created { resource: RemoteResource },
    Updated { resource: RemoteResource },
    Deleted,
    Failed { error: String },
    /// Not submitted because a dependency did not get created
    Skipped { blocked_by: String },
}

impl Outcome {
    pub fn is_created(&self) -> bool {
        matches!(self, Outcome::Created { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Outcome::Created { .. } | Outcome::Updated { .. } | Outcome::Deleted
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityOutcome {
    pub id: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Per-entity outcomes in plan order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionReport {
    pub outcomes: Vec<EntityOutcome>,
}

impl ExecutionReport {
    pub fn get(&self, id: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.outcome)
    }

    pub fn remote_id(&self, id: &str) -> Option<&str> {
        match self.get(id)? {
            Outcome::Created { resource } => Some(resource.id.as_str()),
            _ => None,
        }
    }

    pub fn created_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|entry| entry.outcome.is_created())
            .count()
    }

    pub fn failed(&self) -> Vec<&EntityOutcome> {
        self.outcomes
            .iter()
            .filter(|entry| matches!(entry.outcome, Outcome::Failed { .. }))
            .collect()
    }

    pub fn skipped(&self) -> Vec<&EntityOutcome> {
        self.outcomes
            .iter()
            .filter(|entry| matches!(entry.outcome, Outcome::Skipped { .. }))
            .collect()
    }

    /// Every scheduled entity succeeded
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|entry| entry.outcome.is_success())
    }
}

/// Submits plans to a handler with bounded concurrency
pub struct PlanExecutor<H> {
    handler: Arc<H>,
    semaphore: Arc<Semaphore>,
}

impl<H> PlanExecutor<H>
where
    H: ResourceHandler + 'static,
{
    pub fn new(handler: Arc<H>, concurrent_request_limit: usize) -> Result<Self, ExecutorError> {
        if concurrent_request_limit == 0 {
            return Err(ExecutorError::InvalidLimit {
                count: concurrent_request_limit,
            });
        }

        Ok(Self {
            handler,
            semaphore: Arc::new(Semaphore::new(concurrent_request_limit)),
        })
    }

    /// Create every planned entity, dependencies first
    ///
    /// `external` maps known-existing identifiers to their remote resources so
    /// links to them can be filled in. A failed create is not retried; its
    /// dependents are skipped while unrelated entities carry on. A task that
    /// panics counts as a failed create, and every task of a level is awaited
    /// before the next level starts.
    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        entities: Vec<Entity<CreateSpec>>,
        external: &HashMap<String, ResourceRef>,
    ) -> Result<ExecutionReport, ExecutorError> {
        let mut pending: HashMap<String, Entity<CreateSpec>> = entities
            .into_iter()
            .map(|entity| (entity.id.clone(), entity))
            .collect();

        if let Some(step) = plan.steps().iter().find(|step| !pending.contains_key(&step.id)) {
            return Err(ExecutorError::MissingEntity {
                id: step.id.clone(),
            });
        }

        let span = crate::progress_span!("create", total = plan.len());
        span.pb_set_style(&ProgressStyle::default_bar());
        span.pb_set_length(plan.len() as u64);

        let outcomes = self
            .run_levels(plan, &mut pending, external, &span)
            .instrument(span.clone())
            .await?;

        let report = ExecutionReport {
            outcomes: plan
                .steps()
                .iter()
                .filter_map(|step| {
                    outcomes.get(&step.id).map(|outcome| EntityOutcome {
                        id: step.id.clone(),
                        outcome: outcome.clone(),
                    })
                })
                .collect(),
        };

        info!(
            created = report.created_count(),
            failed = report.failed().len(),
            skipped = report.skipped().len(),
            "Plan execution finished"
        );
        Ok(report)
    }

    /// Run `operation` once per item under the same request limit
    ///
    /// Items are independent of each other, so there is no ordering. Outcomes
    /// keep input order; a failed or panicking operation only fails its item.
    pub async fn for_each<T, F, Fut>(&self, items: Vec<(String, T)>, operation: F) -> ExecutionReport
    where
        T: Send + 'static,
        F: Fn(Arc<H>, T) -> Fut,
        Fut: Future<Output = Result<Outcome, HandlerError>> + Send + 'static,
    {
        let span = crate::progress_span!("apply", total = items.len());
        span.pb_set_style(&ProgressStyle::default_bar());
        span.pb_set_length(items.len() as u64);

        let mut tasks = Vec::with_capacity(items.len());
        for (id, item) in items {
            let semaphore = self.semaphore.clone();
            let pending = operation(self.handler.clone(), item);
            let task = tokio::spawn(
                async move {
                    let _permit = semaphore.acquire().await?;
                    Ok::<Outcome, ExecutorError>(pending.await?)
                }
                .instrument(span.clone()),
            );
            tasks.push((id, task));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (id, task) in tasks {
            let outcome = match task.await.unwrap_or_else(|e| Err(ExecutorError::from(e))) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("{} failed: {}", id, e);
                    Outcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            span.pb_inc(1);
            outcomes.push(EntityOutcome { id, outcome });
        }

        let report = ExecutionReport { outcomes };
        info!(
            succeeded = report.outcomes.iter().filter(|e| e.outcome.is_success()).count(),
            failed = report.failed().len(),
            "Batch operation finished"
        );
        report
    }

    async fn run_levels(
        &self,
        plan: &ExecutionPlan,
        pending: &mut HashMap<String, Entity<CreateSpec>>,
        external: &HashMap<String, ResourceRef>,
        progress: &Span,
    ) -> Result<HashMap<String, Outcome>, ExecutorError> {
        let mut outcomes: HashMap<String, Outcome> = HashMap::with_capacity(plan.len());
        let mut created: HashMap<String, RemoteResource> = HashMap::new();

        for (level_index, level) in plan.levels().into_iter().enumerate() {
            debug!("Submitting level {} ({} entities)", level_index, level.len());
            let mut tasks = Vec::with_capacity(level.len());

            for id in level {
                let Some(entity) = pending.remove(id) else {
                    return Err(ExecutorError::MissingEntity { id: id.to_string() });
                };

                let blocker = entity
                    .depends_on
                    .iter()
                    .find(|dep| outcomes.get(*dep).is_some_and(|outcome| !outcome.is_created()));
                if let Some(blocker) = blocker {
                    trace!("Skipping {}: blocked by {}", entity.id, blocker);
                    outcomes.insert(
                        entity.id.clone(),
                        Outcome::Skipped {
                            blocked_by: blocker.clone(),
                        },
                    );
                    progress.pb_inc(1);
                    continue;
                }

                let document = match self.build_document(&entity, &created, external) {
                    Ok(document) => document,
                    Err(e) => {
                        warn!("Cannot submit {}: {}", entity.id, e);
                        outcomes.insert(entity.id, Outcome::Failed { error: e.to_string() });
                        progress.pb_inc(1);
                        continue;
                    }
                };

                let handler = self.handler.clone();
                let semaphore = self.semaphore.clone();
                let id = entity.id;

                let task = tokio::spawn(async move {
                    // Acquire semaphore permit to control concurrency
                    let _permit = semaphore.acquire().await?;
                    Ok::<RemoteResource, ExecutorError>(handler.create(document).await?)
                });
                tasks.push((id, task));
            }

            for (id, task) in tasks {
                let result = task.await.unwrap_or_else(|e| Err(ExecutorError::from(e)));
                match result {
                    Ok(resource) => {
                        trace!("Created {} as {}", id, resource.id);
                        created.insert(id.clone(), resource.clone());
                        outcomes.insert(id, Outcome::Created { resource });
                    }
                    Err(e) => {
                        warn!("Failed to create {}: {}", id, e);
                        outcomes.insert(id, Outcome::Failed { error: e.to_string() });
                    }
                }
                progress.pb_inc(1);
            }
        }

        Ok(outcomes)
    }

    /// Swap link identifiers for remote references and assemble the document
    fn build_document(
        &self,
        entity: &Entity<CreateSpec>,
        created: &HashMap<String, RemoteResource>,
        external: &HashMap<String, ResourceRef>,
    ) -> Result<ResourceDocument, ExecutorError> {
        let mut relationships = BTreeMap::new();
        for (relationship, target) in &entity.payload.links {
            let reference = created
                .get(target)
                .map(RemoteResource::reference)
                .or_else(|| external.get(target).cloned())
                .ok_or_else(|| ExecutorError::UnresolvedLink {
                    entity: entity.id.clone(),
                    target: target.clone(),
                })?;
            relationships.insert(relationship.clone(), reference);
        }

        Ok(ResourceDocument::new(
            self.handler.resource_type(),
            entity.payload.attributes.clone(),
            relationships,
        )?)
    }
}

#[cfg(test)]
mod tests {
    include!("executor.test.rs");
}
