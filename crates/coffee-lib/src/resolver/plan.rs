//! Execution plans produced by the resolver

use super::entity::Entity;
use serde::Serialize;
use std::collections::HashMap;

/// A single scheduled entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    pub id: String,
    /// 0 for entities without in-batch dependencies, else 1 + deepest dependency
    pub level: usize,
}

/// Dependency-respecting creation order for one batch
///
/// Every dependency of an entity appears strictly before it, and in a strictly
/// lower level. Entities sharing a level never depend on each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    steps: Vec<PlannedStep>,
    /// Known-existing identifiers the batch relies on but does not create
    external: Vec<String>,
}

impl ExecutionPlan {
    pub(crate) fn new(steps: Vec<PlannedStep>, external: Vec<String>) -> Self {
        Self { steps, external }
    }

    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    /// Identifiers in submission order
    pub fn order(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.id == id)
    }

    pub fn level_of(&self, id: &str) -> Option<usize> {
        self.steps
            .iter()
            .find(|step| step.id == id)
            .map(|step| step.level)
    }

    /// Number of levels (0 for an empty plan)
    pub fn depth(&self) -> usize {
        self.steps
            .iter()
            .map(|step| step.level + 1)
            .max()
            .unwrap_or(0)
    }

    /// Identifiers grouped by level; inside a level they keep plan order
    pub fn levels(&self) -> Vec<Vec<&str>> {
        let mut levels: Vec<Vec<&str>> = vec![Vec::new(); self.depth()];
        for step in &self.steps {
            levels[step.level].push(step.id.as_str());
        }
        levels
    }

    pub fn external_references(&self) -> &[String] {
        &self.external
    }

    /// Reorder a batch to match the plan
    ///
    /// Entities whose identifier is not part of the plan are dropped.
    pub fn arrange<P>(&self, entities: Vec<Entity<P>>) -> Vec<Entity<P>> {
        let mut by_id: HashMap<String, Entity<P>> = entities
            .into_iter()
            .map(|entity| (entity.id.clone(), entity))
            .collect();

        self.steps
            .iter()
            .filter_map(|step| by_id.remove(&step.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    include!("plan.test.rs");
}
