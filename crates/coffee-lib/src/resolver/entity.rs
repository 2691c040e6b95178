//! Batch entities submitted to the resolver

use serde::{Deserialize, Serialize};

/// One remote resource waiting to be created
///
/// The resolver only reads `id` and `depends_on`; the payload travels with the
/// entity untouched so callers can reorder their own data by the resulting plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity<P> {
    /// Identifier, unique within a batch (usually the resource name)
    pub id: String,
    /// Fields to submit to the remote API
    pub payload: P,
    /// Identifiers that must exist before this entity can be created
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl<P> Entity<P> {
    /// Create an entity without dependencies
    pub fn new(id: impl Into<String>, payload: P) -> Self {
        Self {
            id: id.into(),
            payload,
            depends_on: Vec::new(),
        }
    }

    /// Add a single dependency reference
    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.depends_on.push(dependency.into());
        self
    }

    /// Add several dependency references, keeping their order
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    pub fn has_dependencies(&self) -> bool {
        !self.depends_on.is_empty()
    }
}

impl Entity<()> {
    /// Entity that carries nothing but its identity and references
    pub fn bare(id: impl Into<String>) -> Self {
        Self::new(id, ())
    }
}
