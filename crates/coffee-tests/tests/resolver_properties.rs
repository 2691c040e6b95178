//! Ordering invariants on generated batches

use coffee_lib::resolver::{Entity, ResolveError, resolve};
use proptest::prelude::*;
use proptest::sample::Index;
use std::collections::{HashMap, HashSet};

const EXTERNAL_NAMES: usize = 3;

fn known() -> HashSet<String> {
    (0..EXTERNAL_NAMES).map(|i| format!("EXT_{i}")).collect()
}

/// Acyclic batch: entity `N{i}` only depends on lower-numbered entities or
/// on `EXT_*` names, listed in shuffled order
fn arb_batch(max_size: usize) -> impl Strategy<Value = Vec<Entity<()>>> {
    let row = (
        prop::collection::vec(any::<Index>(), 0..4),
        prop::option::weighted(0.1, 0..EXTERNAL_NAMES),
    );

    prop::collection::vec(row, 1..max_size)
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (picks, external))| {
                    let mut entity = Entity::bare(format!("N{i}"));
                    if i > 0 {
                        for pick in picks {
                            entity = entity.with_dependency(format!("N{}", pick.index(i)));
                        }
                    }
                    if let Some(external) = external {
                        entity = entity.with_dependency(format!("EXT_{external}"));
                    }
                    entity
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

/// Chain `C{i} -> C{i-1}` plus one edge from `C0` back to `C{k}`, shuffled
fn arb_closed_chain() -> impl Strategy<Value = (Vec<Entity<()>>, usize)> {
    (2usize..80, any::<Index>()).prop_flat_map(|(len, closer)| {
        let k = closer.index(len - 1) + 1;
        let chain: Vec<Entity<()>> = (0..len)
            .map(|i| match i {
                0 => Entity::bare("C0").with_dependency(format!("C{k}")),
                _ => Entity::bare(format!("C{i}")).with_dependency(format!("C{}", i - 1)),
            })
            .collect();
        (Just(chain).prop_shuffle(), Just(k))
    })
}

proptest! {
    #[test]
    fn generated_batches_satisfy_ordering_invariants(batch in arb_batch(300)) {
        let plan = resolve(&batch, &known()).expect("acyclic batch resolves");

        prop_assert_eq!(plan.len(), batch.len());
        let positions: HashMap<&str, usize> = plan
            .order()
            .into_iter()
            .enumerate()
            .map(|(index, id)| (id, index))
            .collect();

        for entity in &batch {
            let level = plan.level_of(&entity.id).unwrap_or_default();
            let mut deepest: Option<usize> = None;
            for dep in entity.depends_on.iter().filter(|dep| !dep.starts_with("EXT_")) {
                prop_assert!(positions[dep.as_str()] < positions[entity.id.as_str()]);
                let dep_level = plan.level_of(dep).unwrap_or_default();
                deepest = Some(deepest.map_or(dep_level, |d| d.max(dep_level)));
            }
            prop_assert_eq!(level, deepest.map_or(0, |d| d + 1), "level of {}", entity.id);
        }

        for id in plan.external_references() {
            prop_assert!(id.starts_with("EXT_"));
        }
    }

    #[test]
    fn resolution_is_deterministic(batch in arb_batch(500)) {
        let first = resolve(&batch, &known()).expect("resolves");
        prop_assert_eq!(resolve(&batch, &known()).expect("resolves"), first);
    }

    #[test]
    fn closing_edge_creates_cycle((batch, k) in arb_closed_chain()) {
        match resolve(&batch, &HashSet::new()) {
            Err(ResolveError::Cycle { cycle }) => {
                prop_assert_eq!(cycle.len(), k + 1);
                let members: HashSet<String> = cycle.into_iter().collect();
                let expected: HashSet<String> = (0..=k).map(|i| format!("C{i}")).collect();
                prop_assert_eq!(members, expected);
            }
            other => prop_assert!(false, "expected cycle, got {:?}", other),
        }
    }
}
