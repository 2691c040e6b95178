//! # API Module
//!
//! Boundary to the remote JSON:API service.
//!
//! ## Modules
//!
//! - [`payload`] - Resource types and create documents
//! - [`handler`] - CRUD handler trait and the in-memory implementation

pub mod handler;
pub mod payload;

pub use handler::{HandlerError, InMemoryResourceHandler, RemoteResource, ResourceHandler};
pub use payload::{PayloadError, ResourceDocument, ResourceRef, ResourceType, link_key};
