use super::*;
use crate::api::link_key;
use serde_json::json;

fn cp_document(name: &str) -> ResourceDocument {
    let mut attributes = Map::new();
    attributes.insert("name".to_string(), json!(name));
    attributes.insert("data_type".to_string(), json!("float"));
    ResourceDocument::new(ResourceType::ConstantProperty, attributes, BTreeMap::new()).unwrap()
}

fn handler() -> InMemoryResourceHandler {
    InMemoryResourceHandler::new(ResourceType::ConstantProperty)
}

#[tokio::test]
async fn test_create_assigns_sequential_ids() {
    let handler = handler();
    let first = handler.create(cp_document("A")).await.unwrap();
    let second = handler.create(cp_document("B")).await.unwrap();

    assert_eq!(first.id, "constant_property-1");
    assert_eq!(second.id, "constant_property-2");
    assert_eq!(second.reference(), ResourceRef::new(ResourceType::ConstantProperty, "constant_property-2"));
    assert_eq!(handler.submitted().await.len(), 2);
}

#[tokio::test]
async fn test_create_duplicate_name_is_unique_violation() {
    let handler = handler().with_existing("A");
    let err = handler.create(cp_document("A")).await.unwrap_err();
    assert!(matches!(err, HandlerError::AlreadyExists { .. }));
    assert!(err.to_string().contains("already exists"));
    assert!(handler.submitted().await.is_empty());
}

#[tokio::test]
async fn test_create_rejects_other_resource_type() {
    let handler = InMemoryResourceHandler::new(ResourceType::Series);
    let err = handler.create(cp_document("A")).await.unwrap_err();
    assert!(matches!(
        err,
        HandlerError::WrongResourceType {
            expected: ResourceType::Series,
            actual: ResourceType::ConstantProperty,
        }
    ));
}

#[tokio::test]
async fn test_create_requires_name() {
    let doc = ResourceDocument::new(ResourceType::ConstantProperty, Map::new(), BTreeMap::new()).unwrap();
    let err = handler().create(doc).await.unwrap_err();
    assert!(matches!(err, HandlerError::MissingName { .. }));
}

#[tokio::test]
async fn test_injected_failure() {
    let handler = handler().with_failure("BROKEN", "NotNullViolation on data_type");
    let err = handler.create(cp_document("BROKEN")).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "constant_property request rejected: NotNullViolation on data_type"
    );
    assert!(!handler.exists("BROKEN").await.unwrap());
}

#[tokio::test]
async fn test_get_and_exists() {
    let handler = handler().with_existing("REMOTE");
    assert!(handler.exists("REMOTE").await.unwrap());
    assert!(!handler.exists("LOCAL").await.unwrap());

    let remote = handler.get_by_name("REMOTE").await.unwrap().unwrap();
    assert_eq!(remote.name, "REMOTE");
    assert_eq!(remote.resource_type, ResourceType::ConstantProperty);
}

#[tokio::test]
async fn test_update_merges_and_renames() {
    let handler = handler();
    handler.create(cp_document("OLD")).await.unwrap();

    let mut patch = Map::new();
    patch.insert("name".to_string(), json!("NEW"));
    patch.insert("description".to_string(), json!("renamed"));

    let updated = handler.update("OLD", patch).await.unwrap();
    assert_eq!(updated.name, "NEW");
    assert_eq!(updated.attributes["data_type"], json!("float"));
    assert_eq!(updated.attributes["description"], json!("renamed"));
    assert_eq!(handler.names().await, vec!["NEW"]);
}

#[tokio::test]
async fn test_update_rename_onto_existing_name_rejected() {
    let handler = handler().with_existing("A").with_existing("B");
    let mut patch = Map::new();
    patch.insert("name".to_string(), json!("B"));

    let err = handler.update("A", patch).await.unwrap_err();
    assert!(matches!(err, HandlerError::AlreadyExists { .. }));
    assert_eq!(handler.names().await, vec!["A", "B"]);
}

#[tokio::test]
async fn test_update_and_delete_missing() {
    let handler = handler();
    assert!(matches!(
        handler.update("NOPE", Map::new()).await,
        Err(HandlerError::NotFound { .. })
    ));
    assert!(matches!(
        handler.delete("NOPE").await,
        Err(HandlerError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_delete_removes_resource() {
    let handler = handler().with_existing("A");
    handler.delete("A").await.unwrap();
    assert!(!handler.exists("A").await.unwrap());
}

#[tokio::test]
async fn test_peak_in_flight_tracks_concurrency() {
    let handler = std::sync::Arc::new(handler().with_latency(Duration::from_millis(20)));

    let tasks: Vec<_> = ["A", "B", "C"]
        .into_iter()
        .map(|name| {
            let handler = handler.clone();
            tokio::spawn(async move { handler.create(cp_document(name)).await })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert!(handler.peak_in_flight() >= 1);
    assert!(handler.peak_in_flight() <= 3);
    assert_eq!(handler.names().await, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_link_resources_stored_by_targets() {
    let handler = InMemoryResourceHandler::new(ResourceType::SeriesComponent);
    let mut relationships = BTreeMap::new();
    relationships.insert("series".to_string(), ResourceRef::new(ResourceType::Series, "s-1"));
    relationships.insert("component".to_string(), ResourceRef::new(ResourceType::Component, "c-2"));
    let key = link_key(&relationships);

    let doc = ResourceDocument::new(ResourceType::SeriesComponent, Map::new(), relationships).unwrap();
    let link = handler.create(doc.clone()).await.unwrap();

    assert_eq!(link.name, "component=c-2,series=s-1");
    assert!(handler.exists(&key).await.unwrap());
    assert!(matches!(
        handler.create(doc).await,
        Err(HandlerError::AlreadyExists { .. })
    ));

    handler.delete(&key).await.unwrap();
    assert!(!handler.exists(&key).await.unwrap());
}
