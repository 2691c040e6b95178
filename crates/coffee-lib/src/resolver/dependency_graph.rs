//! Entity dependency graph with referential validation and cycle detection
//!
//! Nodes are batch entities in input order; an edge runs from a dependency to
//! its dependent, so incoming edges of a node are the things it needs first.
//! References to resources that already exist remotely are validated against
//! the caller's known-existing set and kept out of the graph.

use super::entity::Entity;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, trace};

/// Errors that stop a batch from being planned
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Circular dependency detected: {}", format_cycle(.cycle))]
    Cycle { cycle: Vec<String> },

    #[error("Unknown reference: '{entity}' depends on '{reference}', which is neither in the batch nor known to exist")]
    UnknownReference { entity: String, reference: String },

    #[error("Duplicate identifier in batch: {id}")]
    DuplicateEntity { id: String },
}

impl ResolveError {
    /// Identifiers forming the loop, if this is a cycle error
    pub fn cycle(&self) -> Option<&[String]> {
        match self {
            ResolveError::Cycle { cycle } => Some(cycle),
            _ => None,
        }
    }
}

fn format_cycle(cycle: &[String]) -> String {
    match cycle.first() {
        Some(first) => {
            let mut path: Vec<&str> = cycle.iter().map(String::as_str).collect();
            path.push(first);
            path.join(" → ")
        }
        None => "unknown".to_string(),
    }
}

/// Traversal state tag per node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

/// Dependency graph built once per resolution call
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
    /// Known-existing identifiers that the batch actually references
    external: BTreeSet<String>,
}

impl DependencyGraph {
    /// Build the graph, rejecting duplicate identifiers and unknown references
    pub fn build<P>(
        entities: &[Entity<P>],
        known_existing: &HashSet<String>,
    ) -> Result<Self, ResolveError> {
        let mut graph = DiGraph::with_capacity(entities.len(), entities.len());
        let mut node_map = HashMap::with_capacity(entities.len());

        for entity in entities {
            if node_map.contains_key(&entity.id) {
                return Err(ResolveError::DuplicateEntity {
                    id: entity.id.clone(),
                });
            }
            let idx = graph.add_node(entity.id.clone());
            node_map.insert(entity.id.clone(), idx);
        }

        let mut external = BTreeSet::new();
        for entity in entities {
            let dependent = node_map[&entity.id];

            for reference in &entity.depends_on {
                if let Some(&dependency) = node_map.get(reference) {
                    // update_edge keeps repeated references from doubling up
                    graph.update_edge(dependency, dependent, ());
                } else if known_existing.contains(reference) {
                    trace!("{} references existing resource {}", entity.id, reference);
                    external.insert(reference.clone());
                } else {
                    return Err(ResolveError::UnknownReference {
                        entity: entity.id.clone(),
                        reference: reference.clone(),
                    });
                }
            }
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            external = external.len(),
            "Built dependency graph"
        );

        Ok(Self {
            graph,
            node_map,
            external,
        })
    }

    /// In-batch dependencies of a node, in input order
    fn dependency_indices(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut deps: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .collect();
        deps.sort_unstable();
        deps
    }

    /// Depth-first post-order over the graph
    ///
    /// Roots are taken in input order and each node's dependencies in input
    /// order, so the result only depends on the order of the batch. Uses an
    /// explicit work stack; each frame is a node plus a cursor into its
    /// dependency list.
    pub fn topological_order(&self) -> Result<Vec<NodeIndex>, ResolveError> {
        let adjacency: Vec<Vec<NodeIndex>> = self
            .graph
            .node_indices()
            .map(|idx| self.dependency_indices(idx))
            .collect();

        let mut state = vec![VisitState::Unvisited; self.graph.node_count()];
        let mut order = Vec::with_capacity(self.graph.node_count());
        let mut stack: Vec<(NodeIndex, usize)> = Vec::new();

        for root in self.graph.node_indices() {
            if state[root.index()] != VisitState::Unvisited {
                continue;
            }

            state[root.index()] = VisitState::InProgress;
            stack.push((root, 0));

            while let Some(&(node, cursor)) = stack.last() {
                match adjacency[node.index()].get(cursor).copied() {
                    Some(dependency) => {
                        if let Some(frame) = stack.last_mut() {
                            frame.1 += 1;
                        }

                        match state[dependency.index()] {
                            VisitState::Unvisited => {
                                state[dependency.index()] = VisitState::InProgress;
                                stack.push((dependency, 0));
                            }
                            VisitState::InProgress => {
                                return Err(ResolveError::Cycle {
                                    cycle: self.cycle_from_stack(&stack, dependency),
                                });
                            }
                            VisitState::Done => {}
                        }
                    }
                    None => {
                        state[node.index()] = VisitState::Done;
                        order.push(node);
                        stack.pop();
                    }
                }
            }
        }

        Ok(order)
    }

    /// Extract the loop closed by a back-edge onto `reentered`
    fn cycle_from_stack(&self, stack: &[(NodeIndex, usize)], reentered: NodeIndex) -> Vec<String> {
        let start = stack
            .iter()
            .position(|&(idx, _)| idx == reentered)
            .unwrap_or(0);

        stack[start..]
            .iter()
            .map(|&(idx, _)| self.graph[idx].clone())
            .collect()
    }

    /// Level per node: 0 without in-batch dependencies, else 1 + deepest dependency
    ///
    /// `order` must be a dependency-respecting order of every node.
    pub fn assign_levels(&self, order: &[NodeIndex]) -> Vec<usize> {
        let mut levels = vec![0usize; self.graph.node_count()];
        for &node in order {
            levels[node.index()] = self
                .dependency_indices(node)
                .iter()
                .map(|dep| levels[dep.index()] + 1)
                .max()
                .unwrap_or(0);
        }
        levels
    }

    /// Identifier stored at a node
    pub fn id(&self, node: NodeIndex) -> &str {
        &self.graph[node]
    }

    /// Direct in-batch dependencies of an entity
    pub fn dependencies(&self, id: &str) -> Option<Vec<&str>> {
        let idx = self.node_map.get(id)?;
        Some(
            self.dependency_indices(*idx)
                .into_iter()
                .map(|dep| self.id(dep))
                .collect(),
        )
    }

    /// Known-existing identifiers referenced by the batch, sorted
    pub fn external_references(&self) -> impl Iterator<Item = &str> {
        self.external.iter().map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_map.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    include!("dependency_graph.test.rs");
}

#[cfg(test)]
mod cycle_tests {
    include!("cycle_detection.test.rs");
}
