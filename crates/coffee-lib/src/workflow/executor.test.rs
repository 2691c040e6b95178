use super::*;
use crate::api::{InMemoryResourceHandler, ResourceType};
use crate::resolver::resolve;
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;

fn request(name: &str) -> CreateSpec {
    let mut attributes = Map::new();
    attributes.insert("name".to_string(), json!(name));
    CreateSpec::new(attributes)
}

fn handler() -> Arc<InMemoryResourceHandler> {
    Arc::new(InMemoryResourceHandler::new(ResourceType::ConstantProperty))
}

async fn run(
    handler: Arc<InMemoryResourceHandler>,
    limit: usize,
    entities: Vec<Entity<CreateSpec>>,
    known: &[&str],
    external: HashMap<String, ResourceRef>,
) -> ExecutionReport {
    let known: HashSet<String> = known.iter().map(|s| s.to_string()).collect();
    let plan = resolve(&entities, &known).unwrap();
    PlanExecutor::new(handler, limit)
        .unwrap()
        .execute(&plan, entities, &external)
        .await
        .unwrap()
}

#[test]
fn test_zero_limit_rejected() {
    let err = PlanExecutor::new(handler(), 0).err().unwrap();
    assert!(matches!(err, ExecutorError::InvalidLimit { count: 0 }));
}

#[test]
fn test_into_entity_depends_on_link_targets() {
    let entity = request("B")
        .with_link("time_constant_property", "A")
        .into_entity("B");
    assert_eq!(entity.depends_on, vec!["A"]);
}

#[tokio::test]
async fn test_empty_plan_empty_report() {
    let report = run(handler(), 4, Vec::new(), &[], HashMap::new()).await;
    assert!(report.outcomes.is_empty());
    assert!(report.is_complete());
}

#[tokio::test]
async fn test_links_resolved_to_created_ids() {
    let handler = handler();
    let entities = vec![
        request("B").with_link("time_constant_property", "A").into_entity("B"),
        request("A").into_entity("A"),
    ];

    let report = run(handler.clone(), 4, entities, &[], HashMap::new()).await;

    assert!(report.is_complete());
    let ids: Vec<&str> = report.outcomes.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);

    let a_id = report.remote_id("A").unwrap().to_string();
    let submitted = handler.submitted().await;
    let b_doc = submitted.iter().find(|doc| doc.name() == Some("B")).unwrap();
    assert_eq!(b_doc.relationship("time_constant_property").unwrap().id, a_id);
}

#[tokio::test]
async fn test_links_resolved_to_external_refs() {
    let handler = Arc::new(
        InMemoryResourceHandler::new(ResourceType::ConstantProperty).with_existing("REMOTE"),
    );
    let remote = handler.get_by_name("REMOTE").await.unwrap().unwrap();
    let mut external = HashMap::new();
    external.insert("REMOTE".to_string(), remote.reference());

    let entities = vec![
        request("LOCAL")
            .with_link("time_constant_property", "REMOTE")
            .into_entity("LOCAL"),
    ];
    let report = run(handler.clone(), 4, entities, &["REMOTE"], external).await;

    assert!(report.is_complete());
    let submitted = handler.submitted().await;
    assert_eq!(
        submitted[0].relationship("time_constant_property").unwrap().id,
        remote.id
    );
}

#[tokio::test]
async fn test_known_link_without_ref_fails_entity() {
    let entities = vec![
        request("LOCAL")
            .with_link("time_constant_property", "REMOTE")
            .into_entity("LOCAL"),
    ];
    let report = run(handler(), 4, entities, &["REMOTE"], HashMap::new()).await;

    match report.get("LOCAL").unwrap() {
        Outcome::Failed { error } => assert!(error.contains("no remote id")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failure_skips_dependents_only() {
    let handler = Arc::new(
        InMemoryResourceHandler::new(ResourceType::ConstantProperty)
            .with_failure("A", "NotNullViolation"),
    );
    let entities = vec![
        request("A").into_entity("A"),
        Entity::new("B", request("B")).with_dependency("A"),
        Entity::new("C", request("C")).with_dependency("B"),
        request("D").into_entity("D"),
    ];

    let report = run(handler.clone(), 2, entities, &[], HashMap::new()).await;

    assert!(matches!(report.get("A"), Some(Outcome::Failed { .. })));
    assert_eq!(
        report.get("B"),
        Some(&Outcome::Skipped {
            blocked_by: "A".to_string()
        })
    );
    assert_eq!(
        report.get("C"),
        Some(&Outcome::Skipped {
            blocked_by: "B".to_string()
        })
    );
    assert!(report.get("D").unwrap().is_created());

    assert!(!report.is_complete());
    assert_eq!(report.created_count(), 1);
    assert_eq!(report.failed().len(), 1);
    assert_eq!(report.skipped().len(), 2);
    assert_eq!(handler.names().await, vec!["D"]);
}

#[tokio::test]
async fn test_concurrency_bounded_by_limit() {
    let handler = Arc::new(
        InMemoryResourceHandler::new(ResourceType::ConstantProperty)
            .with_latency(Duration::from_millis(20)),
    );
    let entities: Vec<_> = (0..10)
        .map(|i| {
            let name = format!("P{i}");
            request(&name).into_entity(name)
        })
        .collect();

    let report = run(handler.clone(), 3, entities, &[], HashMap::new()).await;

    assert_eq!(report.created_count(), 10);
    assert!(handler.peak_in_flight() <= 3);
}

#[tokio::test]
async fn test_wide_limit_runs_level_concurrently() {
    let handler = Arc::new(
        InMemoryResourceHandler::new(ResourceType::ConstantProperty)
            .with_latency(Duration::from_millis(20)),
    );
    let entities: Vec<_> = (0..10)
        .map(|i| {
            let name = format!("P{i}");
            request(&name).into_entity(name)
        })
        .collect();

    run(handler.clone(), 10, entities, &[], HashMap::new()).await;

    assert!(handler.peak_in_flight() > 3);
}

#[tokio::test]
async fn test_levels_never_overlap() {
    let handler = Arc::new(
        InMemoryResourceHandler::new(ResourceType::ConstantProperty)
            .with_latency(Duration::from_millis(5)),
    );
    let entities = vec![
        Entity::new("TOTAL", request("TOTAL")).with_dependencies(["X", "Y"]),
        request("X").into_entity("X"),
        request("Y").into_entity("Y"),
    ];

    run(handler.clone(), 4, entities, &[], HashMap::new()).await;

    let submitted: Vec<String> = handler
        .submitted()
        .await
        .iter()
        .filter_map(|doc| doc.name().map(str::to_string))
        .collect();
    assert_eq!(submitted.last().map(String::as_str), Some("TOTAL"));
    assert_eq!(submitted.len(), 3);
}

#[tokio::test]
async fn test_missing_entity_is_error() {
    let entities = vec![request("A").into_entity("A")];
    let plan = resolve(&entities, &HashSet::new()).unwrap();

    let err = PlanExecutor::new(handler(), 4)
        .unwrap()
        .execute(&plan, Vec::new(), &HashMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutorError::MissingEntity { id } if id == "A"));
}

#[test]
fn test_report_serializes_with_status_tag() {
    let report = ExecutionReport {
        outcomes: vec![EntityOutcome {
            id: "B".to_string(),
            outcome: Outcome::Skipped {
                blocked_by: "A".to_string(),
            },
        }],
    };
    assert_eq!(
        serde_json::to_value(&report).unwrap(),
        json!({"outcomes": [{"id": "B", "status": "skipped", "blocked_by": "A"}]})
    );
}

/// Delegates to the in-memory handler but panics when asked to create `poisoned`
struct PanickingHandler {
    inner: InMemoryResourceHandler,
    poisoned: &'static str,
}

impl ResourceHandler for PanickingHandler {
    fn resource_type(&self) -> ResourceType {
        self.inner.resource_type()
    }

    async fn create(&self, document: ResourceDocument) -> Result<RemoteResource, HandlerError> {
        if document.name() == Some(self.poisoned) {
            panic!("connection pool poisoned");
        }
        self.inner.create(document).await
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<RemoteResource>, HandlerError> {
        self.inner.get_by_name(name).await
    }

    async fn update(
        &self,
        name: &str,
        attributes: Map<String, Value>,
    ) -> Result<RemoteResource, HandlerError> {
        self.inner.update(name, attributes).await
    }

    async fn delete(&self, name: &str) -> Result<(), HandlerError> {
        self.inner.delete(name).await
    }
}

#[tokio::test]
async fn test_panicking_create_keeps_rest_of_level() {
    let handler = Arc::new(PanickingHandler {
        inner: InMemoryResourceHandler::new(ResourceType::ConstantProperty)
            .with_latency(Duration::from_millis(5)),
        poisoned: "B",
    });
    let entities = vec![
        request("A").into_entity("A"),
        request("B").into_entity("B"),
        request("C").into_entity("C"),
        Entity::new("D", request("D")).with_dependency("B"),
    ];
    let plan = resolve(&entities, &HashSet::new()).unwrap();

    let report = PlanExecutor::new(handler.clone(), 2)
        .unwrap()
        .execute(&plan, entities, &HashMap::new())
        .await
        .unwrap();

    assert!(report.get("A").unwrap().is_created());
    assert!(report.get("C").unwrap().is_created());
    match report.get("B") {
        Some(Outcome::Failed { error }) => assert!(error.contains("panicked"), "{error}"),
        other => panic!("expected B to fail, got {other:?}"),
    }
    assert_eq!(
        report.get("D"),
        Some(&Outcome::Skipped {
            blocked_by: "B".to_string()
        })
    );

    let mut names = handler.inner.names().await;
    names.sort();
    assert_eq!(names, vec!["A", "C"]);
}
