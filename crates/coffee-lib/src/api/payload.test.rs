use super::*;
use serde_json::json;

fn attributes(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[test]
fn test_document_without_relationships() {
    let doc = ResourceDocument::new(
        ResourceType::ConstantProperty,
        attributes(json!({"name": "TOTAL", "data_type": "float"})),
        BTreeMap::new(),
    )
    .unwrap();

    assert_eq!(
        doc.to_json(),
        json!({
            "data": {
                "type": "constant_property",
                "attributes": {"name": "TOTAL", "data_type": "float"}
            }
        })
    );
    assert_eq!(doc.name(), Some("TOTAL"));
}

#[test]
fn test_document_with_relationships() {
    let mut relationships = BTreeMap::new();
    relationships.insert(
        "constant_property".to_string(),
        ResourceRef::new(ResourceType::ConstantProperty, "cp-1"),
    );
    relationships.insert(
        "component_type".to_string(),
        ResourceRef::new(ResourceType::ComponentType, "ct-9"),
    );

    let doc = ResourceDocument::new(
        ResourceType::ConstantPropertyComponentType,
        Map::new(),
        relationships,
    )
    .unwrap();

    assert_eq!(
        doc.to_json(),
        json!({
            "data": {
                "type": "constant_property_component_type",
                "relationships": {
                    "component_type": {"data": {"type": "component_type", "id": "ct-9"}},
                    "constant_property": {"data": {"type": "constant_property", "id": "cp-1"}}
                }
            }
        })
    );
    assert_eq!(doc.relationship("component_type").unwrap().id, "ct-9");
    assert!(doc.name().is_none());
}

#[test]
fn test_aliased_relationship_names() {
    assert_eq!(
        ResourceType::for_relationship("collation_series"),
        Some(ResourceType::Series)
    );
    assert_eq!(
        ResourceType::for_relationship("time_constant_property"),
        Some(ResourceType::ConstantProperty)
    );
    assert_eq!(ResourceType::for_relationship("widget"), None);
}

#[test]
fn test_unrecognised_relationship_rejected() {
    let mut relationships = BTreeMap::new();
    relationships.insert(
        "widget".to_string(),
        ResourceRef::new(ResourceType::Component, "1"),
    );

    let err = ResourceDocument::new(ResourceType::Series, Map::new(), relationships).unwrap_err();
    assert_eq!(
        err,
        PayloadError::UnrecognisedRelationship {
            name: "widget".to_string()
        }
    );
}

#[test]
fn test_mismatched_relationship_rejected() {
    let mut relationships = BTreeMap::new();
    relationships.insert(
        "series".to_string(),
        ResourceRef::new(ResourceType::Process, "7"),
    );

    let err = ResourceDocument::new(ResourceType::Series, Map::new(), relationships).unwrap_err();
    assert!(matches!(err, PayloadError::MismatchedRelationship { .. }));
    assert!(err.to_string().contains("expects a series"));
}

#[test]
fn test_resource_type_serde_names() {
    assert_eq!(
        serde_json::to_value(ResourceType::ConstantPropertyEventType).unwrap(),
        json!("constant_property_event_type")
    );
    let parsed: ResourceType = serde_json::from_value(json!("event_type")).unwrap();
    assert_eq!(parsed, ResourceType::EventType);
    assert_eq!(ResourceType::Series.to_string(), "series");
}

#[test]
fn test_document_key_prefers_name() {
    let mut attributes = Map::new();
    attributes.insert("name".to_string(), json!("TOTAL"));
    let doc = ResourceDocument::new(ResourceType::ConstantProperty, attributes, BTreeMap::new()).unwrap();
    assert_eq!(doc.key().as_deref(), Some("TOTAL"));
}

#[test]
fn test_link_document_keyed_by_targets() {
    let mut relationships = BTreeMap::new();
    relationships.insert(
        "event_type".to_string(),
        ResourceRef::new(ResourceType::EventType, "et-3"),
    );
    relationships.insert(
        "constant_property".to_string(),
        ResourceRef::new(ResourceType::ConstantProperty, "cp-1"),
    );

    let doc = ResourceDocument::new(
        ResourceType::ConstantPropertyEventType,
        Map::new(),
        relationships.clone(),
    )
    .unwrap();

    assert_eq!(doc.key().as_deref(), Some("constant_property=cp-1,event_type=et-3"));
    assert_eq!(doc.key(), Some(link_key(&relationships)));
    assert_eq!(
        doc.to_json(),
        json!({
            "data": {
                "type": "constant_property_event_type",
                "relationships": {
                    "constant_property": {"data": {"type": "constant_property", "id": "cp-1"}},
                    "event_type": {"data": {"type": "event_type", "id": "et-3"}}
                }
            }
        })
    );
}

#[test]
fn test_weighting_relationship_targets_series() {
    assert_eq!(
        ResourceType::for_relationship("weighted_average_series"),
        Some(ResourceType::Series)
    );
    assert_eq!(ResourceType::SeriesComponent.to_string(), "series_component");
}
