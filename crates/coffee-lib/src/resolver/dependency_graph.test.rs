// Tests for dependency graph construction and ordering

use super::*;

// ============================================================================
// Test Utilities
// ============================================================================

fn entity(id: &str, deps: &[&str]) -> Entity<()> {
    Entity::bare(id).with_dependencies(deps.iter().copied())
}

fn known(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

fn ordered_ids(graph: &DependencyGraph) -> Vec<String> {
    graph
        .topological_order()
        .unwrap()
        .into_iter()
        .map(|idx| graph.id(idx).to_string())
        .collect()
}

// ============================================================================
// Graph Construction
// ============================================================================

#[test]
fn test_empty_batch_builds_empty_graph() {
    let batch: Vec<Entity<()>> = Vec::new();
    let graph = DependencyGraph::build(&batch, &HashSet::new()).unwrap();
    assert_eq!(graph.node_count(), 0);
    assert_eq!(graph.edge_count(), 0);
    assert!(graph.topological_order().unwrap().is_empty());
}

#[test]
fn test_nodes_and_edges_counted() {
    let batch = vec![
        entity("A", &[]),
        entity("B", &["A"]),
        entity("C", &["A", "B"]),
    ];
    let graph = DependencyGraph::build(&batch, &HashSet::new()).unwrap();
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 3);
    assert!(graph.contains("C"));
    assert!(!graph.contains("D"));
}

#[test]
fn test_repeated_reference_is_single_edge() {
    let batch = vec![entity("A", &[]), entity("B", &["A", "A"])];
    let graph = DependencyGraph::build(&batch, &HashSet::new()).unwrap();
    assert_eq!(graph.edge_count(), 1);
}

#[test]
fn test_duplicate_identifier_rejected() {
    let batch = vec![entity("A", &[]), entity("B", &[]), entity("A", &["B"])];
    let err = DependencyGraph::build(&batch, &HashSet::new())
        .err()
        .unwrap();
    assert_eq!(err, ResolveError::DuplicateEntity { id: "A".to_string() });
}

#[test]
fn test_dependencies_lookup() {
    let batch = vec![
        entity("A", &[]),
        entity("B", &["A"]),
        entity("C", &["A"]),
        entity("D", &["C", "B"]),
    ];
    let graph = DependencyGraph::build(&batch, &HashSet::new()).unwrap();

    assert_eq!(graph.dependencies("D").unwrap(), vec!["B", "C"]);
    assert!(graph.dependencies("A").unwrap().is_empty());
    assert!(graph.dependencies("missing").is_none());
}

// ============================================================================
// Referential Integrity
// ============================================================================

#[test]
fn test_unknown_reference_names_entity_and_reference() {
    let batch = vec![entity("X", &["Y"])];
    let err = DependencyGraph::build(&batch, &HashSet::new())
        .err()
        .unwrap();
    assert_eq!(
        err,
        ResolveError::UnknownReference {
            entity: "X".to_string(),
            reference: "Y".to_string(),
        }
    );
    let message = err.to_string();
    assert!(message.contains("'X'"));
    assert!(message.contains("'Y'"));
}

#[test]
fn test_known_existing_reference_accepted() {
    let batch = vec![entity("X", &["Y"])];
    let graph = DependencyGraph::build(&batch, &known(&["Y"])).unwrap();
    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(graph.external_references().collect::<Vec<_>>(), vec!["Y"]);
}

#[test]
fn test_unused_known_existing_not_reported() {
    let batch = vec![entity("X", &[])];
    let graph = DependencyGraph::build(&batch, &known(&["Y", "Z"])).unwrap();
    assert_eq!(graph.external_references().count(), 0);
}

#[test]
fn test_batch_entity_wins_over_known_existing() {
    let batch = vec![entity("X", &["Y"]), entity("Y", &[])];
    let graph = DependencyGraph::build(&batch, &known(&["Y"])).unwrap();
    assert_eq!(graph.edge_count(), 1);
    assert_eq!(graph.external_references().count(), 0);
    assert_eq!(ordered_ids(&graph), vec!["Y", "X"]);
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_order_places_dependencies_first() {
    let batch = vec![
        entity("TOTAL", &["SUBTOTAL", "TAX"]),
        entity("SUBTOTAL", &["PRICE", "QTY"]),
        entity("TAX", &["SUBTOTAL", "RATE"]),
        entity("PRICE", &[]),
        entity("QTY", &[]),
        entity("RATE", &[]),
    ];
    let graph = DependencyGraph::build(&batch, &HashSet::new()).unwrap();
    let order = ordered_ids(&graph);

    assert_eq!(order.len(), batch.len());
    for item in &batch {
        let item_pos = order.iter().position(|id| id == &item.id).unwrap();
        for dep in &item.depends_on {
            let dep_pos = order.iter().position(|id| id == dep).unwrap();
            assert!(dep_pos < item_pos, "{} must precede {}", dep, item.id);
        }
    }
}

#[test]
fn test_independent_entities_keep_input_order() {
    let batch = vec![entity("C", &[]), entity("A", &[]), entity("B", &[])];
    let graph = DependencyGraph::build(&batch, &HashSet::new()).unwrap();
    assert_eq!(ordered_ids(&graph), vec!["C", "A", "B"]);
}

#[test]
fn test_dependencies_visited_in_input_order() {
    // D lists C before B, but B comes first in the batch
    let batch = vec![
        entity("D", &["C", "B"]),
        entity("B", &[]),
        entity("C", &[]),
    ];
    let graph = DependencyGraph::build(&batch, &HashSet::new()).unwrap();
    assert_eq!(ordered_ids(&graph), vec!["B", "C", "D"]);
}

#[test]
fn test_long_chain_does_not_overflow_stack() {
    let size = 100_000;
    let batch: Vec<Entity<()>> = (0..size)
        .map(|i| {
            let e = Entity::bare(format!("N{}", i));
            if i + 1 < size {
                e.with_dependency(format!("N{}", i + 1))
            } else {
                e
            }
        })
        .collect();

    let graph = DependencyGraph::build(&batch, &HashSet::new()).unwrap();
    let order = graph.topological_order().unwrap();
    assert_eq!(order.len(), size);
    assert_eq!(graph.id(order[0]), format!("N{}", size - 1));
    assert_eq!(graph.id(order[size - 1]), "N0");
}

#[test]
fn test_levels_for_diamond() {
    let batch = vec![
        entity("A", &[]),
        entity("B", &["A"]),
        entity("C", &["A"]),
        entity("D", &["B", "C"]),
    ];
    let graph = DependencyGraph::build(&batch, &HashSet::new()).unwrap();
    let order = graph.topological_order().unwrap();
    let levels = graph.assign_levels(&order);
    assert_eq!(levels, vec![0, 1, 1, 2]);
}
