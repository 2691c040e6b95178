//! Resource handlers
//!
//! One capability set (create, read, update, delete) shared by every resource
//! type. The remote transport, authentication, and retries live behind
//! implementations of [`ResourceHandler`]; callers only see documents going in
//! and [`RemoteResource`]s coming out.

use super::payload::{PayloadError, ResourceDocument, ResourceRef, ResourceType};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// Handler errors
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{resource_type} '{name}' not found")]
    NotFound {
        resource_type: ResourceType,
        name: String,
    },

    #[error("A {resource_type} with name '{name}' already exists")]
    AlreadyExists {
        resource_type: ResourceType,
        name: String,
    },

    #[error("{resource_type} request rejected: {reason}")]
    Rejected {
        resource_type: ResourceType,
        reason: String,
    },

    #[error("Handler for {expected} received a {actual} document")]
    WrongResourceType {
        expected: ResourceType,
        actual: ResourceType,
    },

    #[error("{resource_type} document has neither a name attribute nor relationships")]
    MissingName { resource_type: ResourceType },

    #[error("Invalid document: {0}")]
    Payload(#[from] PayloadError),
}

/// A resource as known to the remote API
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteResource {
    pub id: String,
    pub resource_type: ResourceType,
    pub name: String,
    pub attributes: Map<String, Value>,
}

impl RemoteResource {
    pub fn reference(&self) -> ResourceRef {
        ResourceRef::new(self.resource_type, self.id.clone())
    }
}

/// CRUD operations for one resource type
pub trait ResourceHandler: Send + Sync {
    /// Resource type this handler manages
    fn resource_type(&self) -> ResourceType;

    /// Create a resource from a complete document
    fn create(
        &self,
        document: ResourceDocument,
    ) -> impl Future<Output = Result<RemoteResource, HandlerError>> + Send;

    /// Fetch a resource by name; `None` when it does not exist
    fn get_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<RemoteResource>, HandlerError>> + Send;

    /// Patch attributes of the named resource
    ///
    /// A `name` attribute renames the resource.
    fn update(
        &self,
        name: &str,
        attributes: Map<String, Value>,
    ) -> impl Future<Output = Result<RemoteResource, HandlerError>> + Send;

    fn delete(&self, name: &str) -> impl Future<Output = Result<(), HandlerError>> + Send;

    /// Whether a resource with this name exists remotely
    fn exists(&self, name: &str) -> impl Future<Output = Result<bool, HandlerError>> + Send {
        async move { Ok(self.get_by_name(name).await?.is_some()) }
    }
}

#[derive(Debug, Default)]
struct InMemoryState {
    resources: BTreeMap<String, RemoteResource>,
    failures: HashMap<String, String>,
    submitted: Vec<ResourceDocument>,
    next_id: u64,
}

impl InMemoryState {
    fn allocate_id(&mut self, resource_type: ResourceType) -> String {
        self.next_id += 1;
        format!("{}-{}", resource_type, self.next_id)
    }
}

/// In-process handler backed by a map
///
/// Stands in for the remote API in dry runs and tests. Supports pre-existing
/// resources, injected per-name failures, and artificial latency.
pub struct InMemoryResourceHandler {
    resource_type: ResourceType,
    state: Mutex<InMemoryState>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl InMemoryResourceHandler {
    pub fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            state: Mutex::new(InMemoryState::default()),
            latency: None,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Seed a resource that already exists remotely
    pub fn with_existing(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let resource_type = self.resource_type;
        let state = self.state.get_mut();
        let id = state.allocate_id(resource_type);
        let mut attributes = Map::new();
        attributes.insert("name".to_string(), Value::String(name.clone()));
        state.resources.insert(
            name.clone(),
            RemoteResource {
                id,
                resource_type,
                name,
                attributes,
            },
        );
        self
    }

    /// Make every create for `name` fail with `reason`
    pub fn with_failure(mut self, name: impl Into<String>, reason: impl Into<String>) -> Self {
        self.state.get_mut().failures.insert(name.into(), reason.into());
        self
    }

    /// Delay every create by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Documents accepted by `create`, in submission order
    pub async fn submitted(&self) -> Vec<ResourceDocument> {
        self.state.lock().await.submitted.clone()
    }

    /// Names of every stored resource, sorted
    pub async fn names(&self) -> Vec<String> {
        self.state.lock().await.resources.keys().cloned().collect()
    }

    /// Highest number of creates observed running at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn create_inner(&self, document: ResourceDocument) -> Result<RemoteResource, HandlerError> {
        if document.resource_type() != self.resource_type {
            return Err(HandlerError::WrongResourceType {
                expected: self.resource_type,
                actual: document.resource_type(),
            });
        }

        let name = document.key().ok_or(HandlerError::MissingName {
            resource_type: self.resource_type,
        })?;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock().await;

        if let Some(reason) = state.failures.get(&name) {
            return Err(HandlerError::Rejected {
                resource_type: self.resource_type,
                reason: reason.clone(),
            });
        }

        if state.resources.contains_key(&name) {
            return Err(HandlerError::AlreadyExists {
                resource_type: self.resource_type,
                name,
            });
        }

        let id = state.allocate_id(self.resource_type);
        let resource = RemoteResource {
            id,
            resource_type: self.resource_type,
            name: name.clone(),
            attributes: document.attributes().clone(),
        };
        state.resources.insert(name, resource.clone());
        state.submitted.push(document);

        trace!("Stored {} {} as {}", resource.resource_type, resource.name, resource.id);
        Ok(resource)
    }
}

impl ResourceHandler for InMemoryResourceHandler {
    fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    async fn create(&self, document: ResourceDocument) -> Result<RemoteResource, HandlerError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let result = self.create_inner(document).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<RemoteResource>, HandlerError> {
        Ok(self.state.lock().await.resources.get(name).cloned())
    }

    async fn update(
        &self,
        name: &str,
        attributes: Map<String, Value>,
    ) -> Result<RemoteResource, HandlerError> {
        let mut state = self.state.lock().await;
        let mut resource = state
            .resources
            .get(name)
            .cloned()
            .ok_or_else(|| HandlerError::NotFound {
                resource_type: self.resource_type,
                name: name.to_string(),
            })?;

        for (key, value) in attributes {
            resource.attributes.insert(key, value);
        }
        if let Some(new_name) = resource.attributes.get("name").and_then(Value::as_str) {
            resource.name = new_name.to_string();
        }

        if resource.name != name && state.resources.contains_key(&resource.name) {
            return Err(HandlerError::AlreadyExists {
                resource_type: self.resource_type,
                name: resource.name,
            });
        }

        debug!("Updated {} {}", self.resource_type, resource.name);
        state.resources.remove(name);
        state.resources.insert(resource.name.clone(), resource.clone());
        Ok(resource)
    }

    async fn delete(&self, name: &str) -> Result<(), HandlerError> {
        let mut state = self.state.lock().await;
        state
            .resources
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| HandlerError::NotFound {
                resource_type: self.resource_type,
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    include!("handler.test.rs");
}
