//! Bulk constant-property batches
//!
//! A batch is a table of constant properties to create or patch. Rows may be
//! calculations whose formula references other rows, so the batch has to be
//! ordered before submission.

use super::formula::{formula_references, is_blank};
use crate::resolver::{Entity, ResolveError, resolve};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while loading or ordering a batch
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Failed to read batch file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse JSON batch {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to parse YAML batch {}: {reason}", .path.display())]
    Yaml { path: PathBuf, reason: String },

    #[error("Failed to parse TOML batch {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Unsupported batch format: {} (expected .json, .yaml, .yml or .toml)", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Received more formula columns than expected: {columns:?}")]
    MultipleFormulaColumns { columns: Vec<String> },

    #[error("Row {row} has no name")]
    MissingName { row: usize },

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// One constant property in a bulk batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantPropertyRow {
    pub name: String,
    /// Rename target, only meaningful for patches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_drop_down_list: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_calculation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_formula: Option<String>,
    /// Columns outside the known set
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ConstantPropertyRow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            new_name: None,
            description: None,
            data_type: None,
            is_drop_down_list: None,
            is_calculation: None,
            json: None,
            aggregation: None,
            name_formula: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.name_formula = Some(formula.into());
        self
    }

    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    /// Explicit flag wins; otherwise any non-blank formula makes a calculation
    pub fn is_calculation(&self) -> bool {
        self.is_calculation
            .unwrap_or_else(|| !is_blank(self.name_formula.as_deref()))
    }

    /// Constant properties this row's formula needs
    pub fn references(&self) -> Vec<String> {
        match (&self.name_formula, self.is_calculation()) {
            (Some(formula), true) => formula_references(formula),
            _ => Vec::new(),
        }
    }
}

/// Supported batch file encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchFormat {
    Json,
    Yaml,
    Toml,
}

impl BatchFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Batch files hold either a bare list of rows or a `rows` table
#[derive(Deserialize)]
#[serde(untagged)]
enum BatchDocument {
    Rows(Vec<ConstantPropertyRow>),
    Table { rows: Vec<ConstantPropertyRow> },
}

impl BatchDocument {
    fn into_rows(self) -> Vec<ConstantPropertyRow> {
        match self {
            BatchDocument::Rows(rows) | BatchDocument::Table { rows } => rows,
        }
    }
}

/// Read, parse, and validate a batch file
pub fn load_batch(path: &Path) -> Result<Vec<ConstantPropertyRow>, BatchError> {
    let format = BatchFormat::from_path(path).ok_or_else(|| BatchError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;

    let content = std::fs::read_to_string(path).map_err(|e| BatchError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let rows = parse_batch(&content, format, path)?;
    validate_rows(&rows)?;

    debug!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Parse batch content in the given format; `path` is only used for errors
pub fn parse_batch(
    content: &str,
    format: BatchFormat,
    path: &Path,
) -> Result<Vec<ConstantPropertyRow>, BatchError> {
    let document: BatchDocument = match format {
        BatchFormat::Json => serde_json::from_str(content).map_err(|e| BatchError::Json {
            path: path.to_path_buf(),
            source: e,
        })?,
        BatchFormat::Yaml => serde_saphyr::from_str(content).map_err(|e| BatchError::Yaml {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?,
        BatchFormat::Toml => toml::from_str(content).map_err(|e| BatchError::Toml {
            path: path.to_path_buf(),
            source: e,
        })?,
    };

    let mut rows = document.into_rows();
    adopt_formula_column(&mut rows);
    Ok(rows)
}

/// Formula columns present in the batch; `name_formula` counts only when a row sets it
fn formula_columns(rows: &[ConstantPropertyRow]) -> Vec<String> {
    let mut columns: BTreeSet<String> = BTreeSet::new();
    for row in rows {
        columns.extend(
            row.extra
                .keys()
                .filter(|column| column.contains("formula"))
                .cloned(),
        );
    }

    let mut found = Vec::with_capacity(columns.len() + 1);
    if rows.iter().any(|row| row.name_formula.is_some()) {
        found.push("name_formula".to_string());
    }
    found.extend(columns);
    found
}

/// A batch whose only formula column has another name (e.g. `formula`) uses it as `name_formula`
fn adopt_formula_column(rows: &mut [ConstantPropertyRow]) {
    let columns = formula_columns(rows);
    let [column] = columns.as_slice() else {
        return;
    };
    if column == "name_formula" {
        return;
    }

    debug!("Using column '{}' as the formula column", column);
    for row in rows.iter_mut() {
        row.name_formula = match row.extra.remove(column) {
            Some(serde_json::Value::String(formula)) => Some(formula),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
    }
}

/// Check names and columns before any ordering happens
pub fn validate_rows(rows: &[ConstantPropertyRow]) -> Result<(), BatchError> {
    let mut unknown_columns: BTreeSet<&str> = BTreeSet::new();

    for (index, row) in rows.iter().enumerate() {
        if row.name.trim().is_empty() {
            return Err(BatchError::MissingName { row: index });
        }

        unknown_columns.extend(
            row.extra
                .keys()
                .map(String::as_str)
                .filter(|column| !column.contains("formula")),
        );
    }

    let columns = formula_columns(rows);
    if columns.len() > 1 {
        return Err(BatchError::MultipleFormulaColumns { columns });
    }

    if !unknown_columns.is_empty() {
        warn!("Ignoring unrecognised batch columns: {:?}", unknown_columns);
    }

    Ok(())
}

/// One entity per row, identified by name, depending on its formula references
pub fn to_entities(rows: Vec<ConstantPropertyRow>) -> Vec<Entity<ConstantPropertyRow>> {
    rows.into_iter()
        .map(|row| {
            let references = row.references();
            Entity::new(row.name.clone(), row).with_dependencies(references)
        })
        .collect()
}

/// Formula references that no row in the batch defines, sorted
pub fn external_references(rows: &[ConstantPropertyRow]) -> BTreeSet<String> {
    let names: HashSet<&str> = rows.iter().map(|row| row.name.as_str()).collect();
    rows.iter()
        .flat_map(|row| row.references())
        .filter(|reference| !names.contains(reference.as_str()))
        .collect()
}

/// Reorder rows so every formula comes after the properties it references
pub fn sort_rows(
    rows: Vec<ConstantPropertyRow>,
    known_existing: &HashSet<String>,
) -> Result<Vec<ConstantPropertyRow>, BatchError> {
    let entities = to_entities(rows);
    let plan = resolve(&entities, known_existing)?;
    Ok(plan
        .arrange(entities)
        .into_iter()
        .map(|entity| entity.payload)
        .collect())
}

/// Split rows into those inside a calculation tree and independent ones
///
/// A row is in the tree when it is a calculation or is referenced by one.
/// Both halves keep input order.
pub fn partition_calculation_tree(
    rows: Vec<ConstantPropertyRow>,
) -> (Vec<ConstantPropertyRow>, Vec<ConstantPropertyRow>) {
    let referenced: HashSet<String> = rows.iter().flat_map(|row| row.references()).collect();

    rows.into_iter()
        .partition(|row| row.is_calculation() || referenced.contains(&row.name))
}

#[cfg(test)]
mod tests {
    include!("batch.test.rs");
}
