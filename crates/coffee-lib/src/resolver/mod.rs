//! # Resolver
//!
//! Orders a batch of entities that reference each other so each one is created
//! only after everything it depends on.
//!
//! - [`entity`] - Batch input type
//! - [`dependency_graph`] - Graph construction, validation, and ordering
//! - [`plan`] - The resulting execution plan
//!
//! ```
//! use coffee_lib::resolver::{Entity, resolve};
//! use std::collections::HashSet;
//!
//! let batch = vec![
//!     Entity::bare("TOTAL").with_dependencies(["A", "B"]),
//!     Entity::bare("A"),
//!     Entity::bare("B").with_dependency("A"),
//! ];
//!
//! let plan = resolve(&batch, &HashSet::new()).unwrap();
//! assert_eq!(plan.order(), vec!["A", "B", "TOTAL"]);
//! ```

pub mod dependency_graph;
pub mod entity;
pub mod plan;

pub use dependency_graph::{DependencyGraph, ResolveError};
pub use entity::Entity;
pub use plan::{ExecutionPlan, PlannedStep};

use std::collections::HashSet;
use tracing::debug;

/// Compute a dependency-respecting creation order for `entities`
///
/// `known_existing` names resources that already exist remotely; references to
/// them are accepted but never scheduled. The whole batch is validated before
/// anything is returned, so a failed call never yields a partial plan.
pub fn resolve<P>(
    entities: &[Entity<P>],
    known_existing: &HashSet<String>,
) -> Result<ExecutionPlan, ResolveError> {
    if entities.is_empty() {
        return Ok(ExecutionPlan::default());
    }

    let graph = DependencyGraph::build(entities, known_existing)?;
    let order = graph.topological_order()?;
    let levels = graph.assign_levels(&order);

    let steps = order
        .iter()
        .map(|&idx| PlannedStep {
            id: graph.id(idx).to_string(),
            level: levels[idx.index()],
        })
        .collect();
    let external = graph.external_references().map(str::to_string).collect();

    let plan = ExecutionPlan::new(steps, external);
    debug!(
        entities = plan.len(),
        levels = plan.depth(),
        "Resolved execution plan"
    );
    Ok(plan)
}
