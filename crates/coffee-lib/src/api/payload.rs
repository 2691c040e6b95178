//! JSON:API create documents
//!
//! Builds the request body for creating a resource:
//!
//! ```json
//! {
//!   "data": {
//!     "type": "constant_property",
//!     "attributes": { "name": "TOTAL" },
//!     "relationships": {
//!       "component_type": { "data": { "type": "component_type", "id": "42" } }
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors raised while assembling a document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("'{name}' is not a recognised relationship name")]
    UnrecognisedRelationship { name: String },

    #[error("Relationship '{name}' expects a {expected} but was given a {actual}")]
    MismatchedRelationship {
        name: String,
        expected: ResourceType,
        actual: ResourceType,
    },
}

/// Resource types exposed by the remote API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Series,
    SeriesComponent,
    ConstantProperty,
    ConstantPropertyComponentType,
    ConstantPropertyEventType,
    ComponentType,
    EventType,
    Account,
    Component,
    Process,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Series => "series",
            ResourceType::SeriesComponent => "series_component",
            ResourceType::ConstantProperty => "constant_property",
            ResourceType::ConstantPropertyComponentType => "constant_property_component_type",
            ResourceType::ConstantPropertyEventType => "constant_property_event_type",
            ResourceType::ComponentType => "component_type",
            ResourceType::EventType => "event_type",
            ResourceType::Account => "account",
            ResourceType::Component => "component",
            ResourceType::Process => "process",
        }
    }

    /// Resource type targeted by a relationship name
    pub fn for_relationship(name: &str) -> Option<Self> {
        match name {
            "collation_series" | "series" | "weighted_average_series" => {
                Some(ResourceType::Series)
            }
            "constant_property" | "time_constant_property" => Some(ResourceType::ConstantProperty),
            "constant_property_component_type" => {
                Some(ResourceType::ConstantPropertyComponentType)
            }
            "constant_property_event_type" => Some(ResourceType::ConstantPropertyEventType),
            "component_type" => Some(ResourceType::ComponentType),
            "event_type" => Some(ResourceType::EventType),
            "account" => Some(ResourceType::Account),
            "component" => Some(ResourceType::Component),
            "process" => Some(ResourceType::Process),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed pointer to a remote resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub id: String,
}

impl ResourceRef {
    pub fn new(resource_type: ResourceType, id: impl Into<String>) -> Self {
        Self {
            resource_type,
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct RelationshipData {
    data: ResourceRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ResourceData {
    #[serde(rename = "type")]
    resource_type: ResourceType,
    #[serde(skip_serializing_if = "Map::is_empty")]
    attributes: Map<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    relationships: BTreeMap<String, RelationshipData>,
}

/// Body of a create request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceDocument {
    data: ResourceData,
}

impl ResourceDocument {
    /// Assemble a document, checking every relationship name and target type
    pub fn new(
        resource_type: ResourceType,
        attributes: Map<String, Value>,
        relationships: BTreeMap<String, ResourceRef>,
    ) -> Result<Self, PayloadError> {
        let mut checked = BTreeMap::new();
        for (name, target) in relationships {
            let expected = ResourceType::for_relationship(&name)
                .ok_or_else(|| PayloadError::UnrecognisedRelationship { name: name.clone() })?;

            if expected != target.resource_type {
                return Err(PayloadError::MismatchedRelationship {
                    name,
                    expected,
                    actual: target.resource_type,
                });
            }
            checked.insert(name, RelationshipData { data: target });
        }

        Ok(Self {
            data: ResourceData {
                resource_type,
                attributes,
                relationships: checked,
            },
        })
    }

    pub fn resource_type(&self) -> ResourceType {
        self.data.resource_type
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.data.attributes
    }

    /// The `name` attribute, if the document carries one
    pub fn name(&self) -> Option<&str> {
        self.data.attributes.get("name").and_then(Value::as_str)
    }

    /// Identity within its resource type: the name, or for link resources the
    /// relationship targets
    pub fn key(&self) -> Option<String> {
        if let Some(name) = self.name() {
            return Some(name.to_string());
        }
        if self.data.relationships.is_empty() {
            return None;
        }

        let targets: BTreeMap<String, ResourceRef> = self
            .data
            .relationships
            .iter()
            .map(|(name, rel)| (name.clone(), rel.data.clone()))
            .collect();
        Some(link_key(&targets))
    }

    /// Target of a relationship, if present
    pub fn relationship(&self, name: &str) -> Option<&ResourceRef> {
        self.data.relationships.get(name).map(|rel| &rel.data)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Key of a link resource: `relationship=id` pairs in relationship order
pub fn link_key(targets: &BTreeMap<String, ResourceRef>) -> String {
    targets
        .iter()
        .map(|(name, target)| format!("{}={}", name, target.id))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    include!("payload.test.rs");
}
