//! E2E tests for the plan, check, and split commands
//!
//! Batches are written to real files in every supported format and read back
//! through the same path the CLI uses.

use anyhow::Result;
use coffee_lib::application::{BatchArgs, Commands, OutputFormat};
use coffee_lib::resolver::ResolveError;
use coffee_tests::fixtures::reversed_chain;
use coffee_tests::{BatchFormat, BatchRow, TestEnvironment, sales_batch};
use std::path::PathBuf;

fn batch(file: PathBuf, existing: &[&str]) -> BatchArgs {
    BatchArgs {
        file,
        existing: existing.iter().map(|s| s.to_string()).collect(),
    }
}

fn plan(file: PathBuf, existing: &[&str], levels: bool, output: OutputFormat) -> Commands {
    Commands::Plan {
        batch: batch(file, existing),
        levels,
        output,
    }
}

#[tokio::test]
async fn plan_order_is_identical_across_formats() -> Result<()> {
    let env = TestEnvironment::new()?;

    for format in [BatchFormat::Json, BatchFormat::Yaml, BatchFormat::Toml] {
        let file = env.write_batch("sales", format, &sales_batch())?;
        let output = env
            .run(plan(file, &["TAX_RATE"], false, OutputFormat::Text))
            .await;

        assert!(output.result.is_ok(), "{:?}: {}", format, output.error_chain());
        assert_eq!(
            output.lines(),
            vec![
                "1. SUBTOTAL",
                "2. TAX",
                "3. DISCOUNT",
                "4. TOTAL",
                "5. NOTES",
                "Existing: TAX_RATE"
            ],
            "format {:?}",
            format
        );
    }
    Ok(())
}

#[tokio::test]
async fn plan_levels_group_independent_rows() -> Result<()> {
    let env = TestEnvironment::new()?;
    let file = env.write_batch("sales", BatchFormat::Yaml, &sales_batch())?;

    let output = env
        .run(plan(file, &["TAX_RATE"], true, OutputFormat::Text))
        .await;

    assert!(output.result.is_ok(), "{}", output.error_chain());
    assert_eq!(
        output.lines(),
        vec![
            "Level 0: SUBTOTAL, NOTES",
            "Level 1: TAX, DISCOUNT",
            "Level 2: TOTAL",
            "Existing: TAX_RATE"
        ]
    );
    Ok(())
}

#[tokio::test]
async fn plan_json_lists_steps_with_levels() -> Result<()> {
    let env = TestEnvironment::new()?;
    let file = env.write_batch("sales", BatchFormat::Json, &sales_batch())?;

    let output = env
        .run(plan(file, &["TAX_RATE"], false, OutputFormat::Json))
        .await;
    assert!(output.result.is_ok(), "{}", output.error_chain());

    let value: serde_json::Value = serde_json::from_str(&output.stdout)?;
    assert_eq!(value["steps"][0], serde_json::json!({"id": "SUBTOTAL", "level": 0}));
    assert_eq!(value["steps"][3], serde_json::json!({"id": "TOTAL", "level": 2}));
    assert_eq!(value["external"], serde_json::json!(["TAX_RATE"]));
    Ok(())
}

#[tokio::test]
async fn long_reversed_chain_is_reordered() -> Result<()> {
    let env = TestEnvironment::new()?;
    let file = env.write_batch("chain", BatchFormat::Toml, &reversed_chain(200))?;

    let output = env.run(plan(file, &[], false, OutputFormat::Text)).await;
    assert!(output.result.is_ok(), "{}", output.error_chain());

    let lines = output.lines();
    assert_eq!(lines.len(), 200);
    assert_eq!(lines[0], "1. P0");
    assert_eq!(lines[199], "200. P199");
    Ok(())
}

#[tokio::test]
async fn check_names_missing_reference() -> Result<()> {
    let env = TestEnvironment::new()?;
    let file = env.write_batch("sales", BatchFormat::Json, &sales_batch())?;

    let output = env
        .run(Commands::Check {
            batch: batch(file, &[]),
        })
        .await;

    let err = output.result.as_ref().unwrap_err();
    assert_eq!(
        err.downcast_ref::<ResolveError>(),
        Some(&ResolveError::UnknownReference {
            entity: "TAX".to_string(),
            reference: "TAX_RATE".to_string(),
        })
    );
    assert!(output.stdout.is_empty());
    Ok(())
}

#[tokio::test]
async fn check_reports_cycle_path() -> Result<()> {
    let env = TestEnvironment::new()?;
    let rows = vec![
        BatchRow::plain("BASE"),
        BatchRow::calculated("A", "[BASE] + [C]"),
        BatchRow::calculated("B", "[A] * 2"),
        BatchRow::calculated("C", "[B] / 2"),
    ];
    let file = env.write_batch("loop", BatchFormat::Yaml, &rows)?;

    let output = env
        .run(Commands::Check {
            batch: batch(file, &[]),
        })
        .await;

    let err = output.result.as_ref().unwrap_err();
    let resolve_error = err.downcast_ref::<ResolveError>().expect("resolve error");
    assert_eq!(
        resolve_error.cycle(),
        Some(&["A".to_string(), "C".to_string(), "B".to_string()][..])
    );
    assert!(output.error_chain().contains("A → C → B → A"));
    Ok(())
}

#[tokio::test]
async fn check_accepts_empty_batch() -> Result<()> {
    let env = TestEnvironment::new()?;
    let file = env.write_raw("empty.json", "[]")?;

    let output = env
        .run(Commands::Check {
            batch: batch(file, &[]),
        })
        .await;

    assert!(output.result.is_ok(), "{}", output.error_chain());
    assert_eq!(output.stdout, "Batch OK: 0 constant properties in 0 levels\n");
    Ok(())
}

#[tokio::test]
async fn unsupported_extension_is_rejected() -> Result<()> {
    let env = TestEnvironment::new()?;
    let file = env.write_raw("batch.csv", "name\nA\n")?;

    let output = env
        .run(Commands::Check {
            batch: batch(file, &[]),
        })
        .await;

    assert!(output.error_chain().contains("Unsupported batch format"));
    Ok(())
}

#[tokio::test]
async fn split_separates_calculation_tree() -> Result<()> {
    let env = TestEnvironment::new()?;
    let file = env.write_batch("sales", BatchFormat::Toml, &sales_batch())?;

    let output = env
        .run(Commands::Split {
            file,
            output: OutputFormat::Json,
        })
        .await;
    assert!(output.result.is_ok(), "{}", output.error_chain());

    let value: serde_json::Value = serde_json::from_str(&output.stdout)?;
    assert_eq!(
        value,
        serde_json::json!({
            "calculation_tree": ["TOTAL", "TAX", "DISCOUNT", "SUBTOTAL"],
            "independent": ["NOTES"]
        })
    );
    Ok(())
}
