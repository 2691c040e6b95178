// Tests for batch loading, validation, and ordering

use super::*;
use std::fs;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

fn write_batch(dir: &TempDir, filename: &str, content: &str) -> PathBuf {
    let path = dir.path().join(filename);
    fs::write(&path, content).unwrap();
    path
}

fn row(name: &str) -> ConstantPropertyRow {
    ConstantPropertyRow::new(name).with_data_type("float")
}

fn calc(name: &str, formula: &str) -> ConstantPropertyRow {
    row(name).with_formula(formula)
}

fn names(rows: &[ConstantPropertyRow]) -> Vec<&str> {
    rows.iter().map(|row| row.name.as_str()).collect()
}

// ============================================================================
// Row Semantics
// ============================================================================

#[test]
fn test_formula_makes_row_a_calculation() {
    assert!(calc("TOTAL", "[A] + [B]").is_calculation());
    assert!(!row("A").is_calculation());
    assert!(!calc("BLANK", "  ").is_calculation());
}

#[test]
fn test_explicit_flag_overrides_formula() {
    let mut disabled = calc("TOTAL", "[A] + [B]");
    disabled.is_calculation = Some(false);
    assert!(!disabled.is_calculation());
    assert!(disabled.references().is_empty());
}

#[test]
fn test_references_come_from_formula() {
    assert_eq!(calc("TOTAL", "[A] * [B] + [A]").references(), vec!["A", "B"]);
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_json_list() {
    let dir = TempDir::new().unwrap();
    let path = write_batch(
        &dir,
        "batch.json",
        r#"[
            {"name": "PRICE", "data_type": "float"},
            {"name": "TOTAL", "data_type": "float", "name_formula": "[PRICE] * 2"}
        ]"#,
    );

    let rows = load_batch(&path).unwrap();
    assert_eq!(names(&rows), vec!["PRICE", "TOTAL"]);
    assert_eq!(rows[1].references(), vec!["PRICE"]);
}

#[test]
fn test_load_yaml_rows_table() {
    let dir = TempDir::new().unwrap();
    let path = write_batch(
        &dir,
        "batch.yml",
        "rows:\n  - name: PRICE\n    description: Unit price\n  - name: TOTAL\n    name_formula: \"[PRICE] * [QTY]\"\n  - name: QTY\n",
    );

    let rows = load_batch(&path).unwrap();
    assert_eq!(names(&rows), vec!["PRICE", "TOTAL", "QTY"]);
    assert_eq!(rows[0].description.as_deref(), Some("Unit price"));
}

#[test]
fn test_load_toml_rows() {
    let dir = TempDir::new().unwrap();
    let path = write_batch(
        &dir,
        "batch.toml",
        r#"
[[rows]]
name = "TOTAL"
name_formula = "[PRICE] + 1"

[[rows]]
name = "PRICE"
is_drop_down_list = false
"#,
    );

    let rows = load_batch(&path).unwrap();
    assert_eq!(names(&rows), vec!["TOTAL", "PRICE"]);
    assert_eq!(rows[1].is_drop_down_list, Some(false));
}

#[test]
fn test_unsupported_extension_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_batch(&dir, "batch.csv", "name\nPRICE\n");
    assert!(matches!(
        load_batch(&path),
        Err(BatchError::UnsupportedFormat { .. })
    ));
}

#[test]
fn test_missing_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");
    let err = load_batch(&path).unwrap_err();
    assert!(matches!(err, BatchError::Read { .. }));
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn test_malformed_json_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_batch(&dir, "broken.json", "[{\"name\": ");
    assert!(matches!(load_batch(&path), Err(BatchError::Json { .. })));
}

#[test]
fn test_second_formula_column_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_batch(
        &dir,
        "batch.json",
        r#"[{"name": "TOTAL", "name_formula": "[A]", "formula": "[B]"}]"#,
    );

    match load_batch(&path) {
        Err(BatchError::MultipleFormulaColumns { columns }) => {
            assert_eq!(columns, vec!["name_formula", "formula"]);
        }
        other => panic!("Expected multiple formula columns error, got {:?}", other),
    }
}

#[test]
fn test_single_formula_column_used_as_formula() {
    let rows = parse_batch(
        r#"[{"name": "A"}, {"name": "B", "formula": "[A] * 2"}]"#,
        BatchFormat::Json,
        Path::new("batch.json"),
    )
    .unwrap();

    validate_rows(&rows).unwrap();
    assert_eq!(rows[1].name_formula.as_deref(), Some("[A] * 2"));
    assert!(rows[1].extra.is_empty());
    assert_eq!(rows[1].references(), vec!["A"]);
    assert_eq!(rows[0].name_formula, None);
}

#[test]
fn test_two_foreign_formula_columns_rejected() {
    let rows = parse_batch(
        r#"[{"name": "A", "formula": "[B]"}, {"name": "B", "alt_formula": "1"}]"#,
        BatchFormat::Json,
        Path::new("batch.json"),
    )
    .unwrap();

    match validate_rows(&rows) {
        Err(BatchError::MultipleFormulaColumns { columns }) => {
            assert_eq!(columns, vec!["alt_formula", "formula"]);
        }
        other => panic!("Expected multiple formula columns error, got {:?}", other),
    }
}

#[test]
fn test_unset_name_formula_is_not_counted() {
    let mut rows = vec![row("A"), row("B")];
    rows[1]
        .extra
        .insert("formula".to_string(), serde_json::json!("[A]"));
    validate_rows(&rows).unwrap();
}

#[test]
fn test_unknown_columns_are_kept() {
    let dir = TempDir::new().unwrap();
    let path = write_batch(&dir, "batch.json", r#"[{"name": "A", "owner": "ops"}]"#);
    let rows = load_batch(&path).unwrap();
    assert_eq!(rows[0].extra.get("owner"), Some(&serde_json::json!("ops")));
}

#[test]
fn test_blank_name_rejected() {
    let rows = vec![row("A"), row("  ")];
    assert!(matches!(
        validate_rows(&rows),
        Err(BatchError::MissingName { row: 1 })
    ));
}

// ============================================================================
// Ordering and Partitioning
// ============================================================================

#[test]
fn test_sort_rows_orders_formulas_after_inputs() {
    let rows = vec![
        calc("TOTAL", "[SUBTOTAL] + [TAX]"),
        calc("TAX", "[SUBTOTAL] * [RATE]"),
        calc("SUBTOTAL", "[PRICE] * [QTY]"),
        row("PRICE"),
        row("QTY"),
        row("RATE"),
    ];

    let sorted = sort_rows(rows, &HashSet::new()).unwrap();
    assert_eq!(
        names(&sorted),
        vec!["PRICE", "QTY", "SUBTOTAL", "RATE", "TAX", "TOTAL"]
    );
}

#[test]
fn test_sort_rows_rejects_unknown_formula_reference() {
    let rows = vec![calc("TOTAL", "[MISSING] + 1")];
    let err = sort_rows(rows, &HashSet::new()).unwrap_err();
    assert!(matches!(
        err,
        BatchError::Resolve(ResolveError::UnknownReference { .. })
    ));
}

#[test]
fn test_sort_rows_accepts_existing_reference() {
    let rows = vec![calc("TOTAL", "[REMOTE] + 1"), row("LOCAL")];
    let known: HashSet<String> = ["REMOTE".to_string()].into_iter().collect();
    let sorted = sort_rows(rows, &known).unwrap();
    assert_eq!(names(&sorted), vec!["TOTAL", "LOCAL"]);
}

#[test]
fn test_sort_rows_reports_formula_cycle() {
    let rows = vec![calc("A", "[B]"), calc("B", "[A]")];
    let err = sort_rows(rows, &HashSet::new()).unwrap_err();
    assert!(err.to_string().contains("A → B → A"));
}

#[test]
fn test_external_references_excludes_batch_names() {
    let rows = vec![calc("TOTAL", "[A] + [REMOTE_2] + [REMOTE_1]"), row("A")];
    let external: Vec<String> = external_references(&rows).into_iter().collect();
    assert_eq!(external, vec!["REMOTE_1", "REMOTE_2"]);
}

#[test]
fn test_partition_calculation_tree() {
    let rows = vec![
        row("LONE"),
        row("PRICE"),
        calc("TOTAL", "[PRICE] * 2"),
        row("OTHER"),
    ];

    let (in_tree, independent) = partition_calculation_tree(rows);
    assert_eq!(names(&in_tree), vec!["PRICE", "TOTAL"]);
    assert_eq!(names(&independent), vec!["LONE", "OTHER"]);
}

#[test]
fn test_to_entities_carries_rows() {
    let entities = to_entities(vec![calc("TOTAL", "[A]"), row("A")]);
    assert_eq!(entities[0].id, "TOTAL");
    assert_eq!(entities[0].depends_on, vec!["A"]);
    assert_eq!(entities[1].payload.name, "A");
    assert!(!entities[1].has_dependencies());
}
