use super::*;
use crate::api::InMemoryResourceHandler;
use crate::resolver::ResolveError;
use crate::workflow::{LinkKind, LinkWorkflow, Outcome};
use serde_json::json;

fn series_handler() -> Arc<InMemoryResourceHandler> {
    Arc::new(InMemoryResourceHandler::new(ResourceType::Series))
}

#[test]
fn test_create_attributes_defaults() {
    let attributes = create_attributes(&SeriesRow::new("FLOW"));

    assert_eq!(attributes["name"], json!("FLOW"));
    assert_eq!(attributes["aggregation"], json!("mean"));
    assert_eq!(attributes["fill_method"], json!("backfill"));
    assert_eq!(attributes["is_calculation"], json!(false));
    assert_eq!(attributes["specialised_function"], json!(false));
    assert!(!attributes.contains_key("description"));
}

#[test]
fn test_create_attributes_lowercased_and_extras_kept() {
    let mut row = SeriesRow::new("FLOW");
    row.aggregation = Some("Sum".to_string());
    row.fill_method = Some("ForwardFill".to_string());
    row.sample_period = Some("hour".to_string());
    row.extra.insert("units".to_string(), json!("m3/h"));

    let attributes = create_attributes(&row);

    assert_eq!(attributes["aggregation"], json!("sum"));
    assert_eq!(attributes["fill_method"], json!("forwardfill"));
    assert_eq!(attributes["sample_period"], json!("hour"));
    assert_eq!(attributes["units"], json!("m3/h"));
}

#[test]
fn test_patch_attributes_only_set_columns() {
    let mut row = SeriesRow::new("FLOW");
    row.new_name = Some("FLOW_RATE".to_string());
    row.aggregation = Some("MAX".to_string());

    let attributes = patch_attributes(&row);

    assert_eq!(attributes.len(), 2);
    assert_eq!(attributes["name"], json!("FLOW_RATE"));
    assert_eq!(attributes["aggregation"], json!("max"));
}

#[test]
fn test_rows_deserialize_with_extra_columns() {
    let row: SeriesRow = serde_json::from_value(json!({
        "name": "FLOW",
        "weighted_average_series": "MASS",
        "units": "t"
    }))
    .unwrap();

    assert_eq!(row.weighted_average_series.as_deref(), Some("MASS"));
    assert_eq!(row.extra.get("units"), Some(&json!("t")));
}

#[test]
fn test_wrong_handler_rejected() {
    let handler = Arc::new(InMemoryResourceHandler::new(ResourceType::ConstantProperty));
    assert!(matches!(
        SeriesWorkflow::new(handler, 4),
        Err(WorkflowError::WrongHandler {
            expected: ResourceType::Series,
            ..
        })
    ));
}

#[tokio::test]
async fn test_create_links_existing_weighting_series() {
    let handler = Arc::new(InMemoryResourceHandler::new(ResourceType::Series).with_existing("MASS"));
    let workflow = SeriesWorkflow::new(handler.clone(), 4).unwrap();

    workflow
        .create(&SeriesRow::new("GRADE").weighted_by("MASS"))
        .await
        .unwrap();

    let mass = handler.get_by_name("MASS").await.unwrap().unwrap();
    let submitted = handler.submitted().await;
    assert_eq!(
        submitted[0].relationship("weighted_average_series"),
        Some(&mass.reference())
    );
}

#[tokio::test]
async fn test_create_missing_weighting_series_is_not_found() {
    let handler = series_handler();
    let workflow = SeriesWorkflow::new(handler.clone(), 4).unwrap();

    let err = workflow
        .create(&SeriesRow::new("GRADE").weighted_by("MASS"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::Handler(HandlerError::NotFound { ref name, .. }) if name == "MASS"
    ));
    assert!(handler.submitted().await.is_empty());
}

#[tokio::test]
async fn test_patch_and_delete() {
    let handler = Arc::new(InMemoryResourceHandler::new(ResourceType::Series).with_existing("FLOW"));
    let workflow = SeriesWorkflow::new(handler.clone(), 4).unwrap();

    let mut row = SeriesRow::new("FLOW");
    row.new_name = Some("FLOW_RATE".to_string());
    let patched = workflow.patch(&row).await.unwrap();
    assert_eq!(patched.name, "FLOW_RATE");

    workflow.delete("FLOW_RATE").await.unwrap();
    assert!(handler.names().await.is_empty());
}

#[tokio::test]
async fn test_bulk_create_orders_weighting_first() {
    let handler = Arc::new(InMemoryResourceHandler::new(ResourceType::Series).with_existing("TONNES"));
    let workflow = SeriesWorkflow::new(handler.clone(), 4).unwrap();

    let rows = vec![
        SeriesRow::new("GRADE").weighted_by("MASS"),
        SeriesRow::new("MASS").weighted_by("TONNES"),
        SeriesRow::new("FLOW"),
    ];
    let report = workflow.bulk_create(rows).await.unwrap();

    assert!(report.is_complete());
    let ids: Vec<&str> = report.outcomes.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["MASS", "GRADE", "FLOW"]);
    assert_eq!(report.get("MASS").map(Outcome::is_created), Some(true));

    let mass_id = report.remote_id("MASS").unwrap().to_string();
    let submitted = handler.submitted().await;
    let grade = submitted
        .iter()
        .find(|document| document.name() == Some("GRADE"))
        .unwrap();
    assert_eq!(
        grade.relationship("weighted_average_series").map(|r| r.id.as_str()),
        Some(mass_id.as_str())
    );
}

#[tokio::test]
async fn test_bulk_create_unknown_weighting_rejected() {
    let handler = series_handler();
    let workflow = SeriesWorkflow::new(handler.clone(), 4).unwrap();

    let err = workflow
        .bulk_create(vec![SeriesRow::new("GRADE").weighted_by("MASS")])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::Resolve(ResolveError::UnknownReference { .. })
    ));
    assert!(handler.submitted().await.is_empty());
}

#[tokio::test]
async fn test_bulk_create_failed_weighting_skips_dependent() {
    let handler = Arc::new(
        InMemoryResourceHandler::new(ResourceType::Series).with_failure("MASS", "quota exceeded"),
    );
    let workflow = SeriesWorkflow::new(handler.clone(), 4).unwrap();

    let report = workflow
        .bulk_create(vec![
            SeriesRow::new("MASS"),
            SeriesRow::new("GRADE").weighted_by("MASS"),
            SeriesRow::new("FLOW"),
        ])
        .await
        .unwrap();

    assert!(matches!(report.get("MASS"), Some(Outcome::Failed { .. })));
    assert_eq!(
        report.get("GRADE"),
        Some(&Outcome::Skipped {
            blocked_by: "MASS".to_string()
        })
    );
    assert!(report.get("FLOW").unwrap().is_created());
}

#[tokio::test]
async fn test_series_linked_to_component() {
    let series = series_handler();
    let workflow = SeriesWorkflow::new(series.clone(), 2).unwrap();
    workflow.create(&SeriesRow::new("FLOW")).await.unwrap();

    let links = Arc::new(InMemoryResourceHandler::new(ResourceType::SeriesComponent));
    let components =
        Arc::new(InMemoryResourceHandler::new(ResourceType::Component).with_existing("PUMP_01"));
    let linker = LinkWorkflow::new(
        LinkKind::SERIES_COMPONENT,
        links.clone(),
        series.clone(),
        components.clone(),
        2,
    )
    .unwrap();

    let link = linker.link("FLOW", "PUMP_01").await.unwrap();

    assert_eq!(link.resource_type, ResourceType::SeriesComponent);
    let submitted = links.submitted().await;
    let flow = series.get_by_name("FLOW").await.unwrap().unwrap();
    let pump = components.get_by_name("PUMP_01").await.unwrap().unwrap();
    assert_eq!(submitted[0].relationship("series"), Some(&flow.reference()));
    assert_eq!(submitted[0].relationship("component"), Some(&pump.reference()));
}
