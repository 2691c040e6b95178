//! Library-level tests for bulk creation against the in-memory API

use anyhow::Result;
use coffee_lib::api::{InMemoryResourceHandler, ResourceHandler, ResourceType};
use coffee_lib::calc::{ConstantPropertyRow, load_batch};
use coffee_lib::workflow::{ConstantPropertyWorkflow, WorkflowError};
use coffee_tests::{BatchFormat, TestEnvironment, sales_batch};
use std::sync::Arc;
use std::time::Duration;

fn handler() -> InMemoryResourceHandler {
    InMemoryResourceHandler::new(ResourceType::ConstantProperty)
}

#[tokio::test]
async fn every_formula_is_created_after_its_references() -> Result<()> {
    let env = TestEnvironment::new()?;
    let rows = load_batch(&env.write_batch("sales", BatchFormat::Yaml, &sales_batch())?)?;

    let handler = Arc::new(handler().with_existing("TAX_RATE"));
    let workflow = ConstantPropertyWorkflow::new(handler.clone(), 4)?;
    let report = workflow.bulk_create(rows.clone()).await?;
    assert!(report.is_complete());

    let submitted: Vec<String> = handler
        .submitted()
        .await
        .iter()
        .filter_map(|doc| doc.name().map(str::to_string))
        .collect();
    let position = |name: &str| submitted.iter().position(|n| n == name);

    for row in &rows {
        for reference in row.references() {
            if let Some(reference_position) = position(&reference) {
                assert!(
                    reference_position < position(&row.name).unwrap_or_default(),
                    "{} submitted before {}",
                    row.name,
                    reference
                );
            }
        }
    }
    Ok(())
}

#[tokio::test]
async fn concurrency_limit_is_respected() -> Result<()> {
    let rows: Vec<ConstantPropertyRow> = (0..24)
        .map(|i| ConstantPropertyRow::new(format!("INPUT_{i}")).with_data_type("float"))
        .chain(std::iter::once(
            ConstantPropertyRow::new("SUM").with_formula("[INPUT_0] + [INPUT_23]"),
        ))
        .collect();

    let handler = Arc::new(handler().with_latency(Duration::from_millis(10)));
    let workflow = ConstantPropertyWorkflow::new(handler.clone(), 3)?;
    let report = workflow.bulk_create(rows).await?;

    assert_eq!(report.created_count(), 25);
    assert!(handler.peak_in_flight() <= 3);
    assert!(handler.peak_in_flight() >= 1);
    Ok(())
}

#[tokio::test]
async fn remote_lookup_decides_known_references() -> Result<()> {
    let rows = vec![ConstantPropertyRow::new("PRICE_EUR").with_formula("[PRICE_USD] * [FX_RATE]")];

    let missing = ConstantPropertyWorkflow::new(Arc::new(handler().with_existing("PRICE_USD")), 2)?
        .bulk_create(rows.clone())
        .await
        .unwrap_err();
    assert!(matches!(missing, WorkflowError::Resolve(_)));
    assert!(missing.to_string().contains("FX_RATE"));

    let handler = Arc::new(handler().with_existing("PRICE_USD").with_existing("FX_RATE"));
    let report = ConstantPropertyWorkflow::new(handler.clone(), 2)?
        .bulk_create(rows)
        .await?;
    assert!(report.is_complete());
    assert!(handler.exists("PRICE_EUR").await?);
    Ok(())
}

#[tokio::test]
async fn single_row_lifecycle() -> Result<()> {
    let handler = Arc::new(handler());
    let workflow = ConstantPropertyWorkflow::new(handler.clone(), 1)?;

    let mut row = ConstantPropertyRow::new("MARGIN").with_data_type("FLOAT");
    row.aggregation = Some("Mean".to_string());
    let created = workflow.create(&row).await?;
    assert_eq!(created.attributes["aggregation"], serde_json::json!("mean"));

    row.new_name = Some("GROSS_MARGIN".to_string());
    row.description = Some("Gross margin".to_string());
    let patched = workflow.patch(&row).await?;
    assert_eq!(patched.name, "GROSS_MARGIN");
    assert_eq!(patched.attributes["description"], serde_json::json!("Gross margin"));

    workflow.delete("GROSS_MARGIN").await?;
    assert!(!handler.exists("GROSS_MARGIN").await?);
    Ok(())
}
