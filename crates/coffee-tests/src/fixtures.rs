//! Batch fixtures for end-to-end tests
//!
//! Rows are described once and rendered into any supported batch format, so
//! the same scenario can be exercised through JSON, YAML, and TOML files.

use serde_json::{Map, Value, json};

/// One constant-property row of a fixture batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRow {
    pub name: String,
    pub formula: Option<String>,
    pub data_type: Option<String>,
}

impl BatchRow {
    pub fn plain(name: &str) -> Self {
        Self {
            name: name.to_string(),
            formula: None,
            data_type: Some("float".to_string()),
        }
    }

    pub fn calculated(name: &str, formula: &str) -> Self {
        Self {
            name: name.to_string(),
            formula: Some(formula.to_string()),
            data_type: Some("float".to_string()),
        }
    }

    fn to_json(&self) -> Value {
        let mut row = Map::new();
        row.insert("name".to_string(), json!(self.name));
        if let Some(formula) = &self.formula {
            row.insert("name_formula".to_string(), json!(formula));
        }
        if let Some(data_type) = &self.data_type {
            row.insert("data_type".to_string(), json!(data_type));
        }
        Value::Object(row)
    }
}

/// File formats a batch can be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchFormat {
    Json,
    Yaml,
    Toml,
}

impl BatchFormat {
    pub fn extension(self) -> &'static str {
        match self {
            BatchFormat::Json => "json",
            BatchFormat::Yaml => "yaml",
            BatchFormat::Toml => "toml",
        }
    }

    /// Render rows as file content
    pub fn render(self, rows: &[BatchRow]) -> String {
        match self {
            BatchFormat::Json => {
                let rows: Vec<Value> = rows.iter().map(BatchRow::to_json).collect();
                serde_json::to_string_pretty(&rows).unwrap_or_default()
            }
            BatchFormat::Yaml => rows
                .iter()
                .map(|row| {
                    let mut entry = format!("- name: {}\n", row.name);
                    if let Some(formula) = &row.formula {
                        entry.push_str(&format!("  name_formula: {:?}\n", formula));
                    }
                    if let Some(data_type) = &row.data_type {
                        entry.push_str(&format!("  data_type: {}\n", data_type));
                    }
                    entry
                })
                .collect(),
            BatchFormat::Toml => rows
                .iter()
                .map(|row| {
                    let mut entry = format!("[[rows]]\nname = {:?}\n", row.name);
                    if let Some(formula) = &row.formula {
                        entry.push_str(&format!("name_formula = {:?}\n", formula));
                    }
                    if let Some(data_type) = &row.data_type {
                        entry.push_str(&format!("data_type = {:?}\n", data_type));
                    }
                    entry.push('\n');
                    entry
                })
                .collect(),
        }
    }
}

/// Order totals: two calculation chains sharing SUBTOTAL, plus a loose row
///
/// `TAX_RATE` is referenced but not defined; it must be known to exist.
pub fn sales_batch() -> Vec<BatchRow> {
    vec![
        BatchRow::calculated("TOTAL", "[SUBTOTAL] + [TAX] - [DISCOUNT]"),
        BatchRow::calculated("TAX", "[SUBTOTAL] * [TAX_RATE]"),
        BatchRow::calculated("DISCOUNT", "[SUBTOTAL] * 0.05"),
        BatchRow::plain("SUBTOTAL"),
        BatchRow::plain("NOTES"),
    ]
}

/// A chain `P0 <- P1 <- ... <- P{len-1}`, listed last-first
pub fn reversed_chain(len: usize) -> Vec<BatchRow> {
    (0..len)
        .rev()
        .map(|i| {
            if i == 0 {
                BatchRow::plain("P0")
            } else {
                BatchRow::calculated(&format!("P{i}"), &format!("[P{}] + 1", i - 1))
            }
        })
        .collect()
}
