use super::*;
use crate::resolver::{ResolveError, resolve};
use std::collections::HashSet;

fn entity(id: &str, deps: &[&str]) -> Entity<()> {
    Entity::bare(id).with_dependencies(deps.iter().copied())
}

fn none() -> HashSet<String> {
    HashSet::new()
}

fn diamond() -> Vec<Entity<()>> {
    vec![
        entity("A", &[]),
        entity("B", &["A"]),
        entity("C", &["A"]),
        entity("D", &["B", "C"]),
    ]
}

#[test]
fn test_empty_input_gives_empty_plan() {
    let batch: Vec<Entity<()>> = Vec::new();
    let plan = resolve(&batch, &none()).unwrap();
    assert!(plan.is_empty());
    assert_eq!(plan.depth(), 0);
    assert!(plan.levels().is_empty());
}

#[test]
fn test_diamond_levels() {
    let plan = resolve(&diamond(), &none()).unwrap();
    assert_eq!(plan.level_of("A"), Some(0));
    assert_eq!(plan.level_of("B"), Some(1));
    assert_eq!(plan.level_of("C"), Some(1));
    assert_eq!(plan.level_of("D"), Some(2));
    assert_eq!(plan.levels(), vec![vec!["A"], vec!["B", "C"], vec!["D"]]);
    assert_eq!(plan.depth(), 3);
}

#[test]
fn test_levels_never_share_a_dependency_edge() {
    let batch = vec![
        entity("E", &["D", "A"]),
        entity("D", &["B", "C"]),
        entity("C", &["A"]),
        entity("B", &["A"]),
        entity("A", &[]),
        entity("F", &[]),
    ];
    let plan = resolve(&batch, &none()).unwrap();

    for item in &batch {
        let level = plan.level_of(&item.id).unwrap();
        for dep in &item.depends_on {
            assert!(plan.level_of(dep).unwrap() < level);
        }
    }
    assert_eq!(plan.levels()[0], vec!["A", "F"]);
}

#[test]
fn test_resolve_is_deterministic() {
    let batch = vec![
        entity("TOTAL", &["X", "Y", "Z"]),
        entity("Z", &["Y"]),
        entity("Y", &[]),
        entity("X", &["Y"]),
        entity("LONE", &[]),
    ];
    let first = resolve(&batch, &none()).unwrap();
    for _ in 0..10 {
        assert_eq!(resolve(&batch, &none()).unwrap(), first);
    }
    assert_eq!(first.order(), vec!["Y", "Z", "X", "TOTAL", "LONE"]);
}

#[test]
fn test_sorted_input_is_unchanged() {
    let batch = vec![
        entity("RATE", &[]),
        entity("PRICE", &[]),
        entity("SUBTOTAL", &["PRICE"]),
        entity("TAX", &["SUBTOTAL", "RATE"]),
        entity("TOTAL", &["SUBTOTAL", "TAX"]),
    ];
    let plan = resolve(&batch, &none()).unwrap();
    assert_eq!(
        plan.order(),
        vec!["RATE", "PRICE", "SUBTOTAL", "TAX", "TOTAL"]
    );

    // Feeding the plan back in is a fixed point
    let resorted = plan.arrange(batch);
    let again = resolve(&resorted, &none()).unwrap();
    assert_eq!(again, plan);
}

#[test]
fn test_known_existing_dependency_not_scheduled() {
    let batch = vec![entity("X", &["Y"])];
    let known: HashSet<String> = ["Y".to_string()].into_iter().collect();
    let plan = resolve(&batch, &known).unwrap();

    assert_eq!(plan.order(), vec!["X"]);
    assert_eq!(plan.position("Y"), None);
    assert_eq!(plan.level_of("X"), Some(0));
    assert_eq!(plan.external_references(), ["Y".to_string()]);
}

#[test]
fn test_failed_resolution_returns_no_plan() {
    let batch = vec![entity("A", &[]), entity("B", &["C"]), entity("C", &["B"])];
    let err = resolve(&batch, &none()).unwrap_err();
    assert_eq!(err.cycle().unwrap(), ["B".to_string(), "C".to_string()]);

    let batch = vec![entity("X", &["Y"])];
    let err = resolve(&batch, &none()).unwrap_err();
    assert!(matches!(err, ResolveError::UnknownReference { .. }));
}

#[test]
fn test_arrange_reorders_payloads() {
    let batch = vec![
        Entity::new("B", 2).with_dependency("A"),
        Entity::new("A", 1),
    ];
    let plan = resolve(&batch, &none()).unwrap();
    let arranged = plan.arrange(batch);
    let payloads: Vec<i32> = arranged.iter().map(|e| e.payload).collect();
    assert_eq!(payloads, vec![1, 2]);
}

#[test]
fn test_plan_serializes_steps() {
    let plan = resolve(&diamond(), &none()).unwrap();
    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(json["steps"][0]["id"], "A");
    assert_eq!(json["steps"][3]["level"], 2);
}
