//! Constant properties: single operations and whole batches

use super::executor::{CreateSpec, ExecutionReport, Outcome, PlanExecutor};
use super::{WorkflowError, ensure_handler, ensure_limit};
use crate::api::{RemoteResource, ResourceDocument, ResourceHandler, ResourceRef, ResourceType};
use crate::calc::batch::{ConstantPropertyRow, external_references, validate_rows};
use crate::resolver::{Entity, resolve};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Create, patch, and delete constant properties, one at a time or in bulk
pub struct ConstantPropertyWorkflow<H> {
    handler: Arc<H>,
    concurrent_request_limit: usize,
}

impl<H> ConstantPropertyWorkflow<H>
where
    H: ResourceHandler + 'static,
{
    pub fn new(handler: Arc<H>, concurrent_request_limit: usize) -> Result<Self, WorkflowError> {
        ensure_handler(ResourceType::ConstantProperty, handler.as_ref())?;
        ensure_limit(concurrent_request_limit)?;

        Ok(Self {
            handler,
            concurrent_request_limit,
        })
    }

    pub async fn create(&self, row: &ConstantPropertyRow) -> Result<RemoteResource, WorkflowError> {
        let document = ResourceDocument::new(
            ResourceType::ConstantProperty,
            create_attributes(row),
            BTreeMap::new(),
        )?;
        let created = self.handler.create(document).await?;
        info!("Created constant property {}", created.name);
        Ok(created)
    }

    /// Update the property named `row.name`; `new_name` renames it
    pub async fn patch(&self, row: &ConstantPropertyRow) -> Result<RemoteResource, WorkflowError> {
        let patched = self.handler.update(&row.name, patch_attributes(row)).await?;
        info!("Patched constant property {}", patched.name);
        Ok(patched)
    }

    pub async fn delete(&self, name: &str) -> Result<(), WorkflowError> {
        self.handler.delete(name).await?;
        info!("Deleted constant property {}", name);
        Ok(())
    }

    /// Create a whole batch, formulas after the properties they reference
    ///
    /// References outside the batch are looked up remotely first. Any that do
    /// not exist, or any cycle, rejects the batch before anything is created.
    pub async fn bulk_create(
        &self,
        rows: Vec<ConstantPropertyRow>,
    ) -> Result<ExecutionReport, WorkflowError> {
        validate_rows(&rows)?;

        let (known_existing, external) = self.lookup_external(&rows).await?;

        let entities: Vec<Entity<CreateSpec>> = rows
            .iter()
            .map(|row| {
                Entity::new(row.name.clone(), CreateSpec::new(create_attributes(row)))
                    .with_dependencies(row.references())
            })
            .collect();

        let plan = resolve(&entities, &known_existing)?;
        info!(
            "Creating {} constant properties in {} levels",
            plan.len(),
            plan.depth()
        );

        let executor = PlanExecutor::new(self.handler.clone(), self.concurrent_request_limit)?;
        Ok(executor.execute(&plan, entities, &external).await?)
    }

    /// Patch every row's property; rows are independent and run concurrently
    pub async fn bulk_patch(
        &self,
        rows: Vec<ConstantPropertyRow>,
    ) -> Result<ExecutionReport, WorkflowError> {
        validate_rows(&rows)?;

        let items = rows.into_iter().map(|row| (row.name.clone(), row)).collect();
        let executor = PlanExecutor::new(self.handler.clone(), self.concurrent_request_limit)?;
        Ok(executor
            .for_each(items, |handler, row: ConstantPropertyRow| async move {
                let resource = handler.update(&row.name, patch_attributes(&row)).await?;
                Ok(Outcome::Updated { resource })
            })
            .await)
    }

    /// Delete every named property; a missing one fails only its own entry
    pub async fn bulk_delete(&self, names: Vec<String>) -> Result<ExecutionReport, WorkflowError> {
        let items = names.into_iter().map(|name| (name.clone(), name)).collect();
        let executor = PlanExecutor::new(self.handler.clone(), self.concurrent_request_limit)?;
        Ok(executor
            .for_each(items, |handler, name: String| async move {
                handler.delete(&name).await?;
                Ok(Outcome::Deleted)
            })
            .await)
    }

    /// Query the handler for every reference the batch does not define
    async fn lookup_external(
        &self,
        rows: &[ConstantPropertyRow],
    ) -> Result<(HashSet<String>, HashMap<String, ResourceRef>), WorkflowError> {
        let mut known = HashSet::new();
        let mut references = HashMap::new();

        for name in external_references(rows) {
            match self.handler.get_by_name(&name).await? {
                Some(resource) => {
                    debug!("{} already exists as {}", name, resource.id);
                    references.insert(name.clone(), resource.reference());
                    known.insert(name);
                }
                None => debug!("{} not found remotely", name),
            }
        }

        Ok((known, references))
    }
}

fn insert_lowercase(attributes: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        attributes.insert(key.to_string(), Value::String(value.to_lowercase()));
    }
}

/// Attributes sent when creating a constant property
///
/// `is_calculation` is only sent when true and `name_formula` only when
/// non-blank. `data_type` and `aggregation` are lowercased.
pub fn create_attributes(row: &ConstantPropertyRow) -> Map<String, Value> {
    let mut attributes = Map::new();
    attributes.insert("name".to_string(), Value::String(row.name.clone()));

    if let Some(description) = &row.description {
        attributes.insert("description".to_string(), Value::String(description.clone()));
    }
    insert_lowercase(&mut attributes, "data_type", row.data_type.as_deref());
    if let Some(is_drop_down_list) = row.is_drop_down_list {
        attributes.insert("is_drop_down_list".to_string(), Value::Bool(is_drop_down_list));
    }
    if row.is_calculation() {
        attributes.insert("is_calculation".to_string(), Value::Bool(true));
    }
    if let Some(formula) = row.name_formula.as_deref().filter(|f| !f.trim().is_empty()) {
        attributes.insert("name_formula".to_string(), Value::String(formula.to_string()));
    }
    if let Some(json) = &row.json {
        attributes.insert("json".to_string(), json.clone());
    }
    insert_lowercase(&mut attributes, "aggregation", row.aggregation.as_deref());

    attributes
}

/// Attributes sent when patching: only the columns that are set
pub fn patch_attributes(row: &ConstantPropertyRow) -> Map<String, Value> {
    let mut attributes = Map::new();

    if let Some(new_name) = &row.new_name {
        attributes.insert("name".to_string(), Value::String(new_name.clone()));
    }
    if let Some(description) = &row.description {
        attributes.insert("description".to_string(), Value::String(description.clone()));
    }
    insert_lowercase(&mut attributes, "data_type", row.data_type.as_deref());
    if let Some(is_drop_down_list) = row.is_drop_down_list {
        attributes.insert("is_drop_down_list".to_string(), Value::Bool(is_drop_down_list));
    }
    if let Some(is_calculation) = row.is_calculation {
        attributes.insert("is_calculation".to_string(), Value::Bool(is_calculation));
    }
    if let Some(formula) = &row.name_formula {
        attributes.insert("name_formula".to_string(), Value::String(formula.clone()));
    }
    if let Some(json) = &row.json {
        attributes.insert("json".to_string(), json.clone());
    }
    insert_lowercase(&mut attributes, "aggregation", row.aggregation.as_deref());

    attributes
}

#[cfg(test)]
mod tests {
    include!("constant_property.test.rs");
}
