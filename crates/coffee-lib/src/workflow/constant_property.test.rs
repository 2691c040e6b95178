use super::*;
use crate::api::{HandlerError, InMemoryResourceHandler};
use crate::calc::batch::BatchError;
use crate::resolver::ResolveError;
use crate::workflow::ExecutorError;
use serde_json::json;

fn cp_handler() -> InMemoryResourceHandler {
    InMemoryResourceHandler::new(ResourceType::ConstantProperty)
}

fn workflow(handler: InMemoryResourceHandler) -> (Arc<InMemoryResourceHandler>, ConstantPropertyWorkflow<InMemoryResourceHandler>) {
    let handler = Arc::new(handler);
    let workflow = ConstantPropertyWorkflow::new(handler.clone(), 4).unwrap();
    (handler, workflow)
}

async fn submitted_names(handler: &InMemoryResourceHandler) -> Vec<String> {
    handler
        .submitted()
        .await
        .iter()
        .filter_map(|doc| doc.name().map(str::to_string))
        .collect()
}

#[test]
fn test_rejects_wrong_handler_type() {
    let handler = Arc::new(InMemoryResourceHandler::new(ResourceType::Series));
    let err = ConstantPropertyWorkflow::new(handler, 4).err().unwrap();
    assert!(matches!(err, WorkflowError::WrongHandler { .. }));
}

#[test]
fn test_rejects_zero_limit() {
    let err = ConstantPropertyWorkflow::new(Arc::new(cp_handler()), 0).err().unwrap();
    assert!(matches!(
        err,
        WorkflowError::Executor(ExecutorError::InvalidLimit { count: 0 })
    ));
}

#[test]
fn test_create_attributes_lowercase_and_omit_defaults() {
    let mut row = ConstantPropertyRow::new("PRICE").with_data_type("FLOAT");
    row.aggregation = Some("SUM".to_string());
    row.description = Some("Unit price".to_string());
    row.new_name = Some("IGNORED".to_string());

    let attributes = create_attributes(&row);
    assert_eq!(
        Value::Object(attributes),
        json!({
            "name": "PRICE",
            "description": "Unit price",
            "data_type": "float",
            "aggregation": "sum"
        })
    );
}

#[test]
fn test_create_attributes_for_calculation() {
    let row = ConstantPropertyRow::new("TOTAL").with_formula("[PRICE] * [QTY]");
    let attributes = create_attributes(&row);
    assert_eq!(attributes["is_calculation"], json!(true));
    assert_eq!(attributes["name_formula"], json!("[PRICE] * [QTY]"));

    let blank = ConstantPropertyRow::new("PLAIN").with_formula("   ");
    let attributes = create_attributes(&blank);
    assert!(!attributes.contains_key("is_calculation"));
    assert!(!attributes.contains_key("name_formula"));
}

#[test]
fn test_patch_attributes_rename() {
    let mut row = ConstantPropertyRow::new("OLD");
    row.new_name = Some("NEW".to_string());
    row.is_calculation = Some(false);

    let attributes = patch_attributes(&row);
    assert_eq!(
        Value::Object(attributes),
        json!({"name": "NEW", "is_calculation": false})
    );
}

#[tokio::test]
async fn test_create_patch_delete() {
    let (handler, workflow) = workflow(cp_handler());

    let created = workflow
        .create(&ConstantPropertyRow::new("RATE").with_data_type("Float"))
        .await
        .unwrap();
    assert_eq!(created.name, "RATE");
    assert_eq!(created.attributes["data_type"], json!("float"));

    let mut patch = ConstantPropertyRow::new("RATE");
    patch.new_name = Some("RATE_V2".to_string());
    let patched = workflow.patch(&patch).await.unwrap();
    assert_eq!(patched.name, "RATE_V2");
    assert_eq!(patched.id, created.id);

    workflow.delete("RATE_V2").await.unwrap();
    assert!(handler.names().await.is_empty());

    let err = workflow.delete("RATE_V2").await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Handler(HandlerError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_bulk_create_orders_formulas_after_inputs() {
    let (handler, workflow) = workflow(cp_handler());
    let rows = vec![
        ConstantPropertyRow::new("TOTAL").with_formula("[SUBTOTAL] + [TAX]"),
        ConstantPropertyRow::new("TAX").with_formula("[SUBTOTAL] * 0.2"),
        ConstantPropertyRow::new("SUBTOTAL"),
        ConstantPropertyRow::new("NOTES"),
    ];

    let report = workflow.bulk_create(rows).await.unwrap();

    assert!(report.is_complete());
    let order: Vec<&str> = report.outcomes.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(order, vec!["SUBTOTAL", "TAX", "TOTAL", "NOTES"]);

    let submitted = submitted_names(&handler).await;
    let position = |name: &str| submitted.iter().position(|n| n == name).unwrap();
    assert!(position("SUBTOTAL") < position("TAX"));
    assert!(position("TAX") < position("TOTAL"));
    assert_eq!(submitted.len(), 4);
}

#[tokio::test]
async fn test_bulk_create_accepts_remote_references() {
    let (handler, workflow) = workflow(cp_handler().with_existing("EXCHANGE_RATE"));
    let rows = vec![ConstantPropertyRow::new("PRICE_EUR").with_formula("[PRICE_USD] * [EXCHANGE_RATE]"),
        ConstantPropertyRow::new("PRICE_USD")];

    let report = workflow.bulk_create(rows).await.unwrap();

    assert!(report.is_complete());
    assert!(report.get("EXCHANGE_RATE").is_none());
    assert_eq!(
        handler.names().await,
        vec!["EXCHANGE_RATE", "PRICE_EUR", "PRICE_USD"]
    );
}

#[tokio::test]
async fn test_bulk_create_unknown_reference_creates_nothing() {
    let (handler, workflow) = workflow(cp_handler());
    let rows = vec![
        ConstantPropertyRow::new("A"),
        ConstantPropertyRow::new("B").with_formula("[MISSING] + [A]"),
    ];

    let err = workflow.bulk_create(rows).await.unwrap_err();
    match err {
        WorkflowError::Resolve(ResolveError::UnknownReference { entity, reference }) => {
            assert_eq!(entity, "B");
            assert_eq!(reference, "MISSING");
        }
        other => panic!("expected unknown reference, got {other:?}"),
    }
    assert!(handler.submitted().await.is_empty());
}

#[tokio::test]
async fn test_bulk_create_cycle_creates_nothing() {
    let (handler, workflow) = workflow(cp_handler());
    let rows = vec![
        ConstantPropertyRow::new("A").with_formula("[B]"),
        ConstantPropertyRow::new("B").with_formula("[A]"),
    ];

    let err = workflow.bulk_create(rows).await.unwrap_err();
    match err {
        WorkflowError::Resolve(e) => assert_eq!(e.cycle(), Some(&["A".to_string(), "B".to_string()][..])),
        other => panic!("expected cycle, got {other:?}"),
    }
    assert!(handler.submitted().await.is_empty());
}

#[tokio::test]
async fn test_bulk_create_multiple_formula_columns_rejected() {
    let (_, workflow) = workflow(cp_handler());
    let mut row = ConstantPropertyRow::new("A").with_formula("[C]");
    row.extra
        .insert("other_formula".to_string(), json!("[B]"));

    let err = workflow.bulk_create(vec![row]).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Batch(BatchError::MultipleFormulaColumns { .. })
    ));
}

#[tokio::test]
async fn test_bulk_create_failure_skips_dependents() {
    let (handler, workflow) =
        workflow(cp_handler().with_failure("BASE", "NotNullViolation on data_type"));
    let rows = vec![
        ConstantPropertyRow::new("DERIVED").with_formula("[BASE] * 2"),
        ConstantPropertyRow::new("BASE"),
        ConstantPropertyRow::new("OTHER"),
    ];

    let report = workflow.bulk_create(rows).await.unwrap();

    match report.get("BASE").unwrap() {
        Outcome::Failed { error } => assert!(error.contains("NotNullViolation")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(
        report.get("DERIVED"),
        Some(&Outcome::Skipped {
            blocked_by: "BASE".to_string()
        })
    );
    assert!(report.get("OTHER").unwrap().is_created());
    assert_eq!(handler.names().await, vec!["OTHER"]);
}

#[tokio::test]
async fn test_bulk_create_empty_batch() {
    let (handler, workflow) = workflow(cp_handler());
    let report = workflow.bulk_create(Vec::new()).await.unwrap();
    assert!(report.outcomes.is_empty());
    assert!(handler.submitted().await.is_empty());
}

#[tokio::test]
async fn test_bulk_patch_updates_each_row() {
    let (handler, workflow) = workflow(cp_handler().with_existing("RATE").with_existing("PRICE"));

    let mut rename = ConstantPropertyRow::new("RATE");
    rename.new_name = Some("TAX_RATE".to_string());
    let describe = ConstantPropertyRow::new("PRICE").with_data_type("FLOAT");

    let report = workflow.bulk_patch(vec![rename, describe]).await.unwrap();

    assert!(report.is_complete());
    let ids: Vec<&str> = report.outcomes.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["RATE", "PRICE"]);
    match report.get("PRICE") {
        Some(Outcome::Updated { resource }) => {
            assert_eq!(resource.attributes["data_type"], json!("float"))
        }
        other => panic!("expected update, got {other:?}"),
    }
    assert_eq!(handler.names().await, vec!["PRICE", "TAX_RATE"]);
}

#[tokio::test]
async fn test_bulk_patch_missing_row_fails_alone() {
    let (_, workflow) = workflow(cp_handler().with_existing("PRICE"));
    let mut missing = ConstantPropertyRow::new("GHOST");
    missing.description = Some("never created".to_string());

    let report = workflow
        .bulk_patch(vec![missing, ConstantPropertyRow::new("PRICE")])
        .await
        .unwrap();

    assert!(!report.is_complete());
    assert!(matches!(report.get("GHOST"), Some(Outcome::Failed { .. })));
    assert!(matches!(report.get("PRICE"), Some(Outcome::Updated { .. })));
}

#[tokio::test]
async fn test_bulk_delete() {
    let (handler, workflow) = workflow(cp_handler().with_existing("A").with_existing("B"));

    let report = workflow
        .bulk_delete(vec!["A".to_string(), "MISSING".to_string(), "B".to_string()])
        .await
        .unwrap();

    assert_eq!(report.get("A"), Some(&Outcome::Deleted));
    assert_eq!(report.get("B"), Some(&Outcome::Deleted));
    match report.get("MISSING") {
        Some(Outcome::Failed { error }) => assert!(error.contains("not found")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(handler.names().await.is_empty());
}
