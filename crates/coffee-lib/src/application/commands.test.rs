use super::*;
use crate::resolver::ResolveError;
use std::path::PathBuf;
use tempfile::TempDir;

const SALES_BATCH: &str = r#"[
    {"name": "TOTAL", "name_formula": "[SUBTOTAL] + [TAX]"},
    {"name": "TAX", "name_formula": "[SUBTOTAL] * [TAX_RATE]"},
    {"name": "SUBTOTAL", "data_type": "FLOAT"},
    {"name": "NOTES", "data_type": "string"}
]"#;

fn write_batch(dir: &TempDir, file_name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(file_name);
    std::fs::write(&path, content).unwrap();
    path
}

fn batch_args(file: PathBuf, existing: &[&str]) -> BatchArgs {
    BatchArgs {
        file,
        existing: existing.iter().map(|s| s.to_string()).collect(),
    }
}

async fn run(command: Commands) -> (Result<()>, String) {
    let mut out = Vec::new();
    let result = execute_command_with_writer(command, &AppConfig::default(), &mut out).await;
    (result, String::from_utf8(out).unwrap())
}

mod handle_plan_tests {
    use super::*;

    #[tokio::test]
    async fn it_prints_numbered_order() {
        let dir = TempDir::new().unwrap();
        let file = write_batch(&dir, "sales.json", SALES_BATCH);

        let (result, output) = run(Commands::Plan {
            batch: batch_args(file, &["TAX_RATE"]),
            levels: false,
            output: OutputFormat::Text,
        })
        .await;

        result.unwrap();
        assert_eq!(
            output,
            "1. SUBTOTAL\n2. TAX\n3. TOTAL\n4. NOTES\nExisting: TAX_RATE\n"
        );
    }

    #[tokio::test]
    async fn it_prints_levels() {
        let dir = TempDir::new().unwrap();
        let file = write_batch(&dir, "sales.json", SALES_BATCH);

        let (result, output) = run(Commands::Plan {
            batch: batch_args(file, &["TAX_RATE"]),
            levels: true,
            output: OutputFormat::Text,
        })
        .await;

        result.unwrap();
        assert_eq!(
            output,
            "Level 0: SUBTOTAL, NOTES\nLevel 1: TAX\nLevel 2: TOTAL\nExisting: TAX_RATE\n"
        );
    }

    #[tokio::test]
    async fn it_prints_json_levels() {
        let dir = TempDir::new().unwrap();
        let file = write_batch(&dir, "sales.json", SALES_BATCH);

        let (result, output) = run(Commands::Plan {
            batch: batch_args(file, &["TAX_RATE"]),
            levels: true,
            output: OutputFormat::Json,
        })
        .await;

        result.unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            value,
            json!({
                "levels": [["SUBTOTAL", "NOTES"], ["TAX"], ["TOTAL"]],
                "external": ["TAX_RATE"]
            })
        );
    }

    #[tokio::test]
    async fn it_reports_unknown_reference() {
        let dir = TempDir::new().unwrap();
        let file = write_batch(&dir, "sales.json", SALES_BATCH);

        let (result, output) = run(Commands::Plan {
            batch: batch_args(file, &[]),
            levels: false,
            output: OutputFormat::Text,
        })
        .await;

        let err = result.unwrap_err();
        assert!(output.is_empty());
        assert_eq!(
            err.downcast_ref::<ResolveError>(),
            Some(&ResolveError::UnknownReference {
                entity: "TAX".to_string(),
                reference: "TAX_RATE".to_string(),
            })
        );
    }
}

mod handle_check_tests {
    use super::*;

    #[tokio::test]
    async fn it_accepts_valid_batch() {
        let dir = TempDir::new().unwrap();
        let file = write_batch(&dir, "sales.json", SALES_BATCH);

        let (result, output) = run(Commands::Check {
            batch: batch_args(file, &["TAX_RATE"]),
        })
        .await;

        result.unwrap();
        assert_eq!(output, "Batch OK: 4 constant properties in 3 levels\n");
    }

    #[tokio::test]
    async fn it_rejects_cycles() {
        let dir = TempDir::new().unwrap();
        let file = write_batch(
            &dir,
            "loop.yaml",
            "- name: A\n  name_formula: \"[B] + 1\"\n- name: B\n  name_formula: \"[A] - 1\"\n",
        );

        let (result, _) = run(Commands::Check {
            batch: batch_args(file, &[]),
        })
        .await;

        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("Circular dependency detected: A → B → A"));
    }

    #[tokio::test]
    async fn it_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let (result, _) = run(Commands::Check {
            batch: batch_args(dir.path().join("absent.json"), &[]),
        })
        .await;

        assert!(result.unwrap_err().to_string().contains("absent.json"));
    }
}

mod handle_split_tests {
    use super::*;

    #[tokio::test]
    async fn it_partitions_rows() {
        let dir = TempDir::new().unwrap();
        let file = write_batch(&dir, "sales.json", SALES_BATCH);

        let (result, output) = run(Commands::Split {
            file,
            output: OutputFormat::Text,
        })
        .await;

        result.unwrap();
        assert_eq!(
            output,
            "Calculation tree (3):\n  TOTAL\n  TAX\n  SUBTOTAL\nIndependent (1):\n  NOTES\n"
        );
    }

    #[tokio::test]
    async fn it_prints_json() {
        let dir = TempDir::new().unwrap();
        let file = write_batch(&dir, "sales.json", SALES_BATCH);

        let (result, output) = run(Commands::Split {
            file,
            output: OutputFormat::Json,
        })
        .await;

        result.unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["independent"], json!(["NOTES"]));
    }
}

mod handle_simulate_tests {
    use super::*;

    #[tokio::test]
    async fn it_creates_every_row() {
        let dir = TempDir::new().unwrap();
        let file = write_batch(&dir, "sales.json", SALES_BATCH);

        let (result, output) = run(Commands::Simulate {
            batch: batch_args(file, &["TAX_RATE"]),
            fail: Vec::new(),
            output: OutputFormat::Text,
        })
        .await;

        result.unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("created  SUBTOTAL (constant_property-"));
        assert!(lines[2].starts_with("created  TOTAL"));
        assert_eq!(lines[4], "Created 4, failed 0, skipped 0");
    }

    #[tokio::test]
    async fn it_fails_when_rows_are_not_created() {
        let dir = TempDir::new().unwrap();
        let file = write_batch(&dir, "sales.json", SALES_BATCH);

        let (result, output) = run(Commands::Simulate {
            batch: batch_args(file, &["TAX_RATE"]),
            fail: vec!["SUBTOTAL".to_string()],
            output: OutputFormat::Text,
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "3 of 4 constant properties were not created");
        assert!(output.contains("failed   SUBTOTAL: constant_property request rejected: simulated failure"));
        assert!(output.contains("skipped  TAX (blocked by SUBTOTAL)"));
        assert!(output.contains("skipped  TOTAL (blocked by SUBTOTAL)"));
        assert!(output.contains("Created 1, failed 1, skipped 2"));
    }

    #[tokio::test]
    async fn it_prints_json_report() {
        let dir = TempDir::new().unwrap();
        let file = write_batch(&dir, "single.json", r#"[{"name": "ONLY"}]"#);

        let (result, output) = run(Commands::Simulate {
            batch: batch_args(file, &[]),
            fail: Vec::new(),
            output: OutputFormat::Json,
        })
        .await;

        result.unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["outcomes"][0]["id"], json!("ONLY"));
        assert_eq!(value["outcomes"][0]["status"], json!("created"));
    }
}

#[tokio::test]
async fn test_version_output() {
    let (result, output) = run(Commands::Version).await;
    result.unwrap();
    assert!(output.starts_with("coffee "));
}

#[test]
fn test_logger_already_initialized_is_accepted() {
    accept_logger_init(Err(LoggerError::AlreadyInitialized)).unwrap();
}

#[test]
fn test_logger_initialization_failure_propagates() {
    let err = accept_logger_init(Err(LoggerError::InitializationFailed {
        reason: "global default already set".to_string(),
    }))
    .unwrap_err();

    assert_eq!(err.to_string(), "Failed to initialize logging");
    assert!(matches!(
        err.downcast_ref::<LoggerError>(),
        Some(LoggerError::InitializationFailed { .. })
    ));
}
