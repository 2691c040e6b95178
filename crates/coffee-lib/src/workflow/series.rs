//! Series workflows
//!
//! A series may be weighted by another series. Within a batch that makes the
//! weighting series a dependency, so batches go through the resolver and the
//! weighting relationship is filled in with the id created earlier in the run.

use super::executor::{CreateSpec, ExecutionReport, PlanExecutor};
use super::{WorkflowError, ensure_handler, ensure_limit};
use crate::api::{
    HandlerError, RemoteResource, ResourceDocument, ResourceHandler, ResourceRef, ResourceType,
};
use crate::resolver::{Entity, resolve};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

const WEIGHTING: &str = "weighted_average_series";
const DEFAULT_AGGREGATION: &str = "mean";
const DEFAULT_FILL_METHOD: &str = "backfill";

/// One series in a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesRow {
    pub name: String,
    /// Rename target, only meaningful for patches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_calculation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialised_function: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_series: Option<String>,
    /// Name of the series this one is weighted by
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weighted_average_series: Option<String>,
    /// Further attributes passed through as-is
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SeriesRow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn weighted_by(mut self, series: impl Into<String>) -> Self {
        self.weighted_average_series = Some(series.into());
        self
    }

    fn to_create_spec(&self) -> CreateSpec {
        let create = CreateSpec::new(create_attributes(self));
        match &self.weighted_average_series {
            Some(weighting) => create.with_link(WEIGHTING, weighting.clone()),
            None => create,
        }
    }
}

/// Create, patch, delete, and bulk-create series
pub struct SeriesWorkflow<H> {
    handler: Arc<H>,
    concurrent_request_limit: usize,
}

impl<H> SeriesWorkflow<H>
where
    H: ResourceHandler + 'static,
{
    pub fn new(handler: Arc<H>, concurrent_request_limit: usize) -> Result<Self, WorkflowError> {
        ensure_handler(ResourceType::Series, handler.as_ref())?;
        ensure_limit(concurrent_request_limit)?;

        Ok(Self {
            handler,
            concurrent_request_limit,
        })
    }

    /// Create one series; its weighting series must already exist
    pub async fn create(&self, row: &SeriesRow) -> Result<RemoteResource, WorkflowError> {
        let mut relationships = BTreeMap::new();
        if let Some(weighting) = &row.weighted_average_series {
            let resource = self.handler.get_by_name(weighting).await?.ok_or_else(|| {
                HandlerError::NotFound {
                    resource_type: ResourceType::Series,
                    name: weighting.clone(),
                }
            })?;
            relationships.insert(WEIGHTING.to_string(), resource.reference());
        }

        let document =
            ResourceDocument::new(ResourceType::Series, create_attributes(row), relationships)?;
        let created = self.handler.create(document).await?;
        info!("Created series {}", created.name);
        Ok(created)
    }

    /// Update the series named `row.name`; `new_name` renames it
    pub async fn patch(&self, row: &SeriesRow) -> Result<RemoteResource, WorkflowError> {
        let patched = self.handler.update(&row.name, patch_attributes(row)).await?;
        info!("Patched series {}", patched.name);
        Ok(patched)
    }

    pub async fn delete(&self, name: &str) -> Result<(), WorkflowError> {
        self.handler.delete(name).await?;
        info!("Deleted series {}", name);
        Ok(())
    }

    /// Create a batch of series, weighting series first
    pub async fn bulk_create(&self, rows: Vec<SeriesRow>) -> Result<ExecutionReport, WorkflowError> {
        let names: HashSet<&str> = rows.iter().map(|row| row.name.as_str()).collect();
        let outside: BTreeSet<&str> = rows
            .iter()
            .filter_map(|row| row.weighted_average_series.as_deref())
            .filter(|weighting| !names.contains(weighting))
            .collect();

        let mut known = HashSet::new();
        let mut external: HashMap<String, ResourceRef> = HashMap::new();
        for name in outside {
            if let Some(resource) = self.handler.get_by_name(name).await? {
                debug!("Weighting series {} already exists as {}", name, resource.id);
                external.insert(name.to_string(), resource.reference());
                known.insert(name.to_string());
            }
        }

        let entities: Vec<Entity<CreateSpec>> = rows
            .iter()
            .map(|row| row.to_create_spec().into_entity(row.name.clone()))
            .collect();

        let plan = resolve(&entities, &known)?;
        info!("Creating {} series in {} levels", plan.len(), plan.depth());

        let executor = PlanExecutor::new(self.handler.clone(), self.concurrent_request_limit)?;
        Ok(executor.execute(&plan, entities, &external).await?)
    }
}

fn lowercase_or(value: Option<&str>, default: &str) -> Value {
    Value::String(value.unwrap_or(default).to_lowercase())
}

/// Attributes sent when creating a series
///
/// Aggregation defaults to `mean` and fill method to `backfill`, both
/// lowercased. The two flags default to false. Extra columns pass through.
pub fn create_attributes(row: &SeriesRow) -> Map<String, Value> {
    let mut attributes: Map<String, Value> = row
        .extra
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    attributes.insert("name".to_string(), Value::String(row.name.clone()));
    attributes.insert(
        "aggregation".to_string(),
        lowercase_or(row.aggregation.as_deref(), DEFAULT_AGGREGATION),
    );
    attributes.insert(
        "fill_method".to_string(),
        lowercase_or(row.fill_method.as_deref(), DEFAULT_FILL_METHOD),
    );
    attributes.insert(
        "is_calculation".to_string(),
        Value::Bool(row.is_calculation.unwrap_or(false)),
    );
    attributes.insert(
        "specialised_function".to_string(),
        Value::Bool(row.specialised_function.unwrap_or(false)),
    );

    for (key, value) in [
        ("description", &row.description),
        ("sample_period", &row.sample_period),
        ("name_formula", &row.name_formula),
        ("series_type", &row.series_type),
        ("source_series", &row.source_series),
    ] {
        if let Some(value) = value {
            attributes.insert(key.to_string(), Value::String(value.clone()));
        }
    }

    attributes
}

/// Attributes sent when patching: only the columns that are set
pub fn patch_attributes(row: &SeriesRow) -> Map<String, Value> {
    let mut attributes = Map::new();

    for (key, value) in [
        ("name", &row.new_name),
        ("description", &row.description),
        ("sample_period", &row.sample_period),
        ("name_formula", &row.name_formula),
        ("series_type", &row.series_type),
        ("source_series", &row.source_series),
    ] {
        if let Some(value) = value {
            attributes.insert(key.to_string(), Value::String(value.clone()));
        }
    }
    for (key, value) in [("aggregation", &row.aggregation), ("fill_method", &row.fill_method)] {
        if let Some(value) = value {
            attributes.insert(key.to_string(), Value::String(value.to_lowercase()));
        }
    }
    for (key, value) in [
        ("is_calculation", row.is_calculation),
        ("specialised_function", row.specialised_function),
    ] {
        if let Some(value) = value {
            attributes.insert(key.to_string(), Value::Bool(value));
        }
    }

    attributes
}

#[cfg(test)]
mod tests {
    include!("series.test.rs");
}
