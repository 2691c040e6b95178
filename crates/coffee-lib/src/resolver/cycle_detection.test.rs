// Tests for dependency cycle detection

use super::*;

fn entity(id: &str, deps: &[&str]) -> Entity<()> {
    Entity::bare(id).with_dependencies(deps.iter().copied())
}

fn cycle_of(batch: &[Entity<()>]) -> Vec<String> {
    let graph = DependencyGraph::build(batch, &HashSet::new()).unwrap();
    match graph.topological_order() {
        Err(ResolveError::Cycle { cycle }) => cycle,
        other => panic!("Expected cycle error, got {:?}", other),
    }
}

#[test]
fn test_detect_simple_cycle_two_nodes() {
    let cycle = cycle_of(&[entity("A", &["B"]), entity("B", &["A"])]);
    assert_eq!(cycle, vec!["A", "B"]);
}

#[test]
fn test_cycle_follows_traversal_start() {
    let cycle = cycle_of(&[entity("B", &["A"]), entity("A", &["B"])]);
    assert_eq!(cycle, vec!["B", "A"]);
}

#[test]
fn test_detect_self_reference() {
    let cycle = cycle_of(&[entity("A", &[]), entity("LOOP", &["LOOP"])]);
    assert_eq!(cycle, vec!["LOOP"]);
}

#[test]
fn test_detect_three_node_cycle() {
    let cycle = cycle_of(&[
        entity("A", &["B"]),
        entity("B", &["C"]),
        entity("C", &["A"]),
    ]);
    assert_eq!(cycle, vec!["A", "B", "C"]);
}

#[test]
fn test_cycle_excludes_acyclic_prefix() {
    // ROOT leads into the loop but is not part of it
    let cycle = cycle_of(&[
        entity("ROOT", &["X"]),
        entity("X", &["Y"]),
        entity("Y", &["Z"]),
        entity("Z", &["X"]),
    ]);
    assert_eq!(cycle, vec!["X", "Y", "Z"]);
}

#[test]
fn test_cycle_behind_completed_branch() {
    let cycle = cycle_of(&[
        entity("A", &[]),
        entity("B", &["A"]),
        entity("C", &["B", "D"]),
        entity("D", &["C"]),
    ]);
    assert_eq!(cycle, vec!["C", "D"]);
}

#[test]
fn test_shared_dependency_is_not_a_cycle() {
    let batch = vec![
        entity("A", &[]),
        entity("B", &["A"]),
        entity("C", &["A", "B"]),
    ];
    let graph = DependencyGraph::build(&batch, &HashSet::new()).unwrap();
    assert!(graph.topological_order().is_ok());
}

#[test]
fn test_cycle_error_message_closes_loop() {
    let err = ResolveError::Cycle {
        cycle: vec!["A".to_string(), "B".to_string()],
    };
    assert_eq!(err.to_string(), "Circular dependency detected: A → B → A");
    assert_eq!(err.cycle().unwrap(), ["A".to_string(), "B".to_string()]);
}

#[test]
fn test_non_cycle_error_has_no_cycle() {
    let err = ResolveError::DuplicateEntity { id: "A".to_string() };
    assert!(err.cycle().is_none());
}
