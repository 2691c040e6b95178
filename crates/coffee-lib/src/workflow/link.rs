//! Link resources
//!
//! A link resource has no attributes of its own. It relates two resources that
//! already exist, e.g. a constant property and the component type it applies
//! to. Both ends are looked up by name before anything is created.

use super::executor::{CreateSpec, ExecutionReport, PlanExecutor};
use super::{WorkflowError, ensure_handler, ensure_limit};
use crate::api::{
    HandlerError, RemoteResource, ResourceDocument, ResourceHandler, ResourceRef, ResourceType,
    link_key,
};
use crate::resolver::{Entity, resolve};
use serde::Deserialize;
use serde_json::Map;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Shape of one link resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkKind {
    pub link_type: ResourceType,
    pub left: (&'static str, ResourceType),
    pub right: (&'static str, ResourceType),
}

impl LinkKind {
    pub const CONSTANT_PROPERTY_COMPONENT_TYPE: LinkKind = LinkKind {
        link_type: ResourceType::ConstantPropertyComponentType,
        left: ("constant_property", ResourceType::ConstantProperty),
        right: ("component_type", ResourceType::ComponentType),
    };

    pub const CONSTANT_PROPERTY_EVENT_TYPE: LinkKind = LinkKind {
        link_type: ResourceType::ConstantPropertyEventType,
        left: ("constant_property", ResourceType::ConstantProperty),
        right: ("event_type", ResourceType::EventType),
    };

    pub const SERIES_COMPONENT: LinkKind = LinkKind {
        link_type: ResourceType::SeriesComponent,
        left: ("series", ResourceType::Series),
        right: ("component", ResourceType::Component),
    };

    /// Plan identifier of a link target; ends live in separate namespaces
    fn left_target(&self, name: &str) -> String {
        format!("{}:{}", self.left.0, name)
    }

    fn right_target(&self, name: &str) -> String {
        format!("{}:{}", self.right.0, name)
    }
}

/// Names of the two resources to link
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LinkRequest {
    pub left: String,
    pub right: String,
}

impl LinkRequest {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    /// Identifier of the link in reports
    pub fn id(&self) -> String {
        format!("{}/{}", self.left, self.right)
    }
}

/// Create and remove links of one [`LinkKind`]
///
/// `links` manages the link resources; `left` and `right` resolve the names
/// at each end.
pub struct LinkWorkflow<L, A, B> {
    kind: LinkKind,
    links: Arc<L>,
    left: Arc<A>,
    right: Arc<B>,
    concurrent_request_limit: usize,
}

impl<L, A, B> LinkWorkflow<L, A, B>
where
    L: ResourceHandler + 'static,
    A: ResourceHandler,
    B: ResourceHandler,
{
    pub fn new(
        kind: LinkKind,
        links: Arc<L>,
        left: Arc<A>,
        right: Arc<B>,
        concurrent_request_limit: usize,
    ) -> Result<Self, WorkflowError> {
        ensure_handler(kind.link_type, links.as_ref())?;
        ensure_handler(kind.left.1, left.as_ref())?;
        ensure_handler(kind.right.1, right.as_ref())?;
        ensure_limit(concurrent_request_limit)?;

        Ok(Self {
            kind,
            links,
            left,
            right,
            concurrent_request_limit,
        })
    }

    /// Link two existing resources
    pub async fn link(&self, left: &str, right: &str) -> Result<RemoteResource, WorkflowError> {
        let relationships = self.relationships(left, right).await?;
        let document = ResourceDocument::new(self.kind.link_type, Map::new(), relationships)?;
        let link = self.links.create(document).await?;
        info!("Linked {} to {} as {} {}", left, right, link.resource_type, link.id);
        Ok(link)
    }

    /// Remove the link between two resources
    pub async fn unlink(&self, left: &str, right: &str) -> Result<(), WorkflowError> {
        let relationships = self.relationships(left, right).await?;
        self.links.delete(&link_key(&relationships)).await?;
        info!("Unlinked {} from {}", left, right);
        Ok(())
    }

    /// Create every requested link
    ///
    /// Ends are looked up once per distinct name. A request naming a resource
    /// that does not exist rejects the whole batch before anything is created.
    pub async fn bulk_link(
        &self,
        requests: Vec<LinkRequest>,
    ) -> Result<ExecutionReport, WorkflowError> {
        let (known, external) = self.lookup_ends(&requests).await?;

        let entities: Vec<Entity<CreateSpec>> = requests
            .iter()
            .map(|request| {
                CreateSpec::default()
                    .with_link(self.kind.left.0, self.kind.left_target(&request.left))
                    .with_link(self.kind.right.0, self.kind.right_target(&request.right))
                    .into_entity(request.id())
            })
            .collect();

        let plan = resolve(&entities, &known)?;
        info!("Creating {} {} links", plan.len(), self.kind.link_type);

        let executor = PlanExecutor::new(self.links.clone(), self.concurrent_request_limit)?;
        Ok(executor.execute(&plan, entities, &external).await?)
    }

    async fn relationships(
        &self,
        left: &str,
        right: &str,
    ) -> Result<BTreeMap<String, ResourceRef>, WorkflowError> {
        let left = find(self.left.as_ref(), left).await?;
        let right = find(self.right.as_ref(), right).await?;

        Ok(BTreeMap::from([
            (self.kind.left.0.to_string(), left.reference()),
            (self.kind.right.0.to_string(), right.reference()),
        ]))
    }

    async fn lookup_ends(
        &self,
        requests: &[LinkRequest],
    ) -> Result<(HashSet<String>, HashMap<String, ResourceRef>), WorkflowError> {
        let mut found = HashMap::new();

        let lefts: BTreeSet<&str> = requests.iter().map(|r| r.left.as_str()).collect();
        for name in lefts {
            if let Some(resource) = self.left.get_by_name(name).await? {
                found.insert(self.kind.left_target(name), resource.reference());
            }
        }

        let rights: BTreeSet<&str> = requests.iter().map(|r| r.right.as_str()).collect();
        for name in rights {
            if let Some(resource) = self.right.get_by_name(name).await? {
                found.insert(self.kind.right_target(name), resource.reference());
            }
        }

        debug!("Resolved {} link ends", found.len());
        Ok((found.keys().cloned().collect(), found))
    }
}

async fn find<H: ResourceHandler>(handler: &H, name: &str) -> Result<RemoteResource, WorkflowError> {
    handler
        .get_by_name(name)
        .await?
        .ok_or_else(|| {
            HandlerError::NotFound {
                resource_type: handler.resource_type(),
                name: name.to_string(),
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    include!("link.test.rs");
}
