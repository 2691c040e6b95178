//! E2E tests for the simulate command

use anyhow::Result;
use coffee_lib::application::{BatchArgs, Commands, OutputFormat};
use coffee_tests::{BatchFormat, TestEnvironment, sales_batch};

fn simulate(file: std::path::PathBuf, fail: &[&str], output: OutputFormat) -> Commands {
    Commands::Simulate {
        batch: BatchArgs {
            file,
            existing: vec!["TAX_RATE".to_string()],
        },
        fail: fail.iter().map(|s| s.to_string()).collect(),
        output,
    }
}

#[tokio::test]
async fn simulate_creates_batch_in_plan_order() -> Result<()> {
    let env = TestEnvironment::new()?;
    let file = env.write_batch("sales", BatchFormat::Json, &sales_batch())?;

    let output = env.run(simulate(file, &[], OutputFormat::Text)).await;

    assert!(output.result.is_ok(), "{}", output.error_chain());
    let created: Vec<&str> = output
        .lines()
        .iter()
        .filter_map(|line| line.strip_prefix("created  "))
        .map(|rest| rest.split_whitespace().next().unwrap_or_default())
        .collect();
    assert_eq!(created, vec!["SUBTOTAL", "TAX", "DISCOUNT", "TOTAL", "NOTES"]);
    assert_eq!(output.lines().last(), Some(&"Created 5, failed 0, skipped 0"));
    Ok(())
}

#[tokio::test]
async fn simulate_outcomes_do_not_depend_on_concurrency() -> Result<()> {
    let mut reports = Vec::new();

    for limit in [1, 2, 8] {
        let env = TestEnvironment::new()?.with_concurrency(limit);
        let file = env.write_batch("sales", BatchFormat::Yaml, &sales_batch())?;
        let output = env.run(simulate(file, &["TAX"], OutputFormat::Json)).await;

        let value: serde_json::Value = serde_json::from_str(&output.stdout)?;
        let statuses: Vec<(String, String)> = value["outcomes"]
            .as_array()
            .map(|outcomes| {
                outcomes
                    .iter()
                    .map(|o| (o["id"].to_string(), o["status"].to_string()))
                    .collect()
            })
            .unwrap_or_default();
        reports.push(statuses);
    }

    assert_eq!(reports[0].len(), 5);
    assert_eq!(reports[0], reports[1]);
    assert_eq!(reports[1], reports[2]);
    Ok(())
}

#[tokio::test]
async fn simulate_failure_blocks_only_dependents() -> Result<()> {
    let env = TestEnvironment::new()?;
    let file = env.write_batch("sales", BatchFormat::Toml, &sales_batch())?;

    let output = env.run(simulate(file, &["DISCOUNT"], OutputFormat::Text)).await;

    assert_eq!(
        output.error_chain(),
        "2 of 5 constant properties were not created"
    );
    let lines = output.lines();
    assert!(lines.contains(&"failed   DISCOUNT: constant_property request rejected: simulated failure"));
    assert!(lines.contains(&"skipped  TOTAL (blocked by DISCOUNT)"));
    assert!(lines.iter().any(|line| line.starts_with("created  TAX")));
    assert!(lines.iter().any(|line| line.starts_with("created  NOTES")));
    assert_eq!(lines.last(), Some(&"Created 3, failed 1, skipped 1"));
    Ok(())
}

#[tokio::test]
async fn simulate_rejects_existing_names_in_batch() -> Result<()> {
    let env = TestEnvironment::new()?;
    let file = env.write_batch("sales", BatchFormat::Json, &sales_batch())?;

    let output = env
        .run(Commands::Simulate {
            batch: BatchArgs {
                file,
                existing: vec!["TAX_RATE".to_string(), "NOTES".to_string()],
            },
            fail: Vec::new(),
            output: OutputFormat::Text,
        })
        .await;

    assert!(output.error_chain().contains("1 of 5"));
    assert!(
        output
            .stdout
            .contains("failed   NOTES: A constant_property with name 'NOTES' already exists")
    );
    Ok(())
}
