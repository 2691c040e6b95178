use super::*;
use crate::api::InMemoryResourceHandler;
use crate::resolver::ResolveError;
use crate::workflow::Outcome;

type CpctWorkflow =
    LinkWorkflow<InMemoryResourceHandler, InMemoryResourceHandler, InMemoryResourceHandler>;

struct Fixture {
    links: Arc<InMemoryResourceHandler>,
    properties: Arc<InMemoryResourceHandler>,
    component_types: Arc<InMemoryResourceHandler>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            links: Arc::new(InMemoryResourceHandler::new(
                ResourceType::ConstantPropertyComponentType,
            )),
            properties: Arc::new(
                InMemoryResourceHandler::new(ResourceType::ConstantProperty)
                    .with_existing("RATE")
                    .with_existing("CAPACITY"),
            ),
            component_types: Arc::new(
                InMemoryResourceHandler::new(ResourceType::ComponentType)
                    .with_existing("PUMP")
                    .with_existing("TANK"),
            ),
        }
    }

    fn workflow(&self) -> CpctWorkflow {
        LinkWorkflow::new(
            LinkKind::CONSTANT_PROPERTY_COMPONENT_TYPE,
            self.links.clone(),
            self.properties.clone(),
            self.component_types.clone(),
            4,
        )
        .unwrap()
    }
}

#[test]
fn test_handler_types_checked() {
    let fixture = Fixture::new();
    let err = LinkWorkflow::new(
        LinkKind::CONSTANT_PROPERTY_EVENT_TYPE,
        fixture.links.clone(),
        fixture.properties.clone(),
        fixture.component_types.clone(),
        4,
    )
    .err()
    .unwrap();

    assert!(matches!(
        err,
        WorkflowError::WrongHandler {
            expected: ResourceType::ConstantPropertyEventType,
            actual: ResourceType::ConstantPropertyComponentType,
        }
    ));
}

#[tokio::test]
async fn test_link_relates_existing_resources() {
    let fixture = Fixture::new();
    let link = fixture.workflow().link("RATE", "PUMP").await.unwrap();

    assert_eq!(link.resource_type, ResourceType::ConstantPropertyComponentType);

    let submitted = fixture.links.submitted().await;
    assert_eq!(submitted.len(), 1);
    let rate = fixture.properties.get_by_name("RATE").await.unwrap().unwrap();
    let pump = fixture.component_types.get_by_name("PUMP").await.unwrap().unwrap();
    assert_eq!(submitted[0].relationship("constant_property"), Some(&rate.reference()));
    assert_eq!(submitted[0].relationship("component_type"), Some(&pump.reference()));
    assert!(submitted[0].attributes().is_empty());
}

#[tokio::test]
async fn test_link_missing_end_is_not_found() {
    let fixture = Fixture::new();
    let err = fixture.workflow().link("RATE", "VALVE").await.unwrap_err();

    match err {
        WorkflowError::Handler(HandlerError::NotFound { resource_type, name }) => {
            assert_eq!(resource_type, ResourceType::ComponentType);
            assert_eq!(name, "VALVE");
        }
        other => panic!("expected not found, got {other:?}"),
    }
    assert!(fixture.links.submitted().await.is_empty());
}

#[tokio::test]
async fn test_unlink_removes_link() {
    let fixture = Fixture::new();
    let workflow = fixture.workflow();
    workflow.link("RATE", "PUMP").await.unwrap();
    workflow.link("RATE", "TANK").await.unwrap();

    workflow.unlink("RATE", "PUMP").await.unwrap();

    assert_eq!(fixture.links.names().await.len(), 1);
    assert!(matches!(
        workflow.unlink("RATE", "PUMP").await,
        Err(WorkflowError::Handler(HandlerError::NotFound { .. }))
    ));
}

#[tokio::test]
async fn test_bulk_link_substitutes_remote_ids() {
    let fixture = Fixture::new();
    let requests = vec![
        LinkRequest::new("RATE", "PUMP"),
        LinkRequest::new("RATE", "TANK"),
        LinkRequest::new("CAPACITY", "TANK"),
    ];

    let report = fixture.workflow().bulk_link(requests).await.unwrap();

    assert!(report.is_complete());
    let ids: Vec<&str> = report.outcomes.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["RATE/PUMP", "RATE/TANK", "CAPACITY/TANK"]);

    let tank = fixture.component_types.get_by_name("TANK").await.unwrap().unwrap();
    match report.get("CAPACITY/TANK") {
        Some(Outcome::Created { resource }) => {
            assert!(resource.name.contains(&format!("component_type={}", tank.id)))
        }
        other => panic!("expected link, got {other:?}"),
    }
    assert_eq!(fixture.links.names().await.len(), 3);
}

#[tokio::test]
async fn test_bulk_link_unknown_end_creates_nothing() {
    let fixture = Fixture::new();
    let requests = vec![
        LinkRequest::new("RATE", "PUMP"),
        LinkRequest::new("MISSING", "PUMP"),
    ];

    let err = fixture.workflow().bulk_link(requests).await.unwrap_err();

    match err {
        WorkflowError::Resolve(ResolveError::UnknownReference { entity, reference }) => {
            assert_eq!(entity, "MISSING/PUMP");
            assert_eq!(reference, "constant_property:MISSING");
        }
        other => panic!("expected unknown reference, got {other:?}"),
    }
    assert!(fixture.links.submitted().await.is_empty());
}

#[tokio::test]
async fn test_bulk_link_existing_link_fails_alone() {
    let fixture = Fixture::new();
    let workflow = fixture.workflow();
    workflow.link("RATE", "PUMP").await.unwrap();

    let report = workflow
        .bulk_link(vec![
            LinkRequest::new("RATE", "PUMP"),
            LinkRequest::new("CAPACITY", "PUMP"),
        ])
        .await
        .unwrap();

    match report.get("RATE/PUMP") {
        Some(Outcome::Failed { error }) => assert!(error.contains("already exists")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(report.get("CAPACITY/PUMP").unwrap().is_created());
}

#[tokio::test]
async fn test_event_type_links() {
    let links = Arc::new(InMemoryResourceHandler::new(
        ResourceType::ConstantPropertyEventType,
    ));
    let workflow = LinkWorkflow::new(
        LinkKind::CONSTANT_PROPERTY_EVENT_TYPE,
        links.clone(),
        Arc::new(InMemoryResourceHandler::new(ResourceType::ConstantProperty).with_existing("RATE")),
        Arc::new(InMemoryResourceHandler::new(ResourceType::EventType).with_existing("SHUTDOWN")),
        2,
    )
    .unwrap();

    let report = workflow
        .bulk_link(vec![LinkRequest::new("RATE", "SHUTDOWN")])
        .await
        .unwrap();

    assert!(report.is_complete());
    let submitted = links.submitted().await;
    assert_eq!(
        submitted[0].relationship("event_type").map(|r| r.resource_type),
        Some(ResourceType::EventType)
    );
}
