//! End-to-end verification of the archetype storage engine: chunked layout,
//! migration, empty-chunk retention, queries, and destructor accounting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use strata_core::{EcsError, Registry, CHUNK_CAPACITY};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Velocity {
    dx: f32,
    dy: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Score(u32);

/// Increments a shared counter when dropped. Relocation between chunks must
/// never run this; only genuine destruction may.
struct DropProbe {
    drops: Arc<AtomicUsize>,
}

impl Drop for DropProbe {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_chunked_population_and_query_sum() {
    let mut registry = Registry::new();

    // 130 single-component entities span exactly three 64-slot chunks.
    for i in 0..130u32 {
        let entity = registry.create_entity();
        registry.add_component(entity, Score(i)).unwrap();
    }
    assert_eq!(registry.live_count(), 130);
    assert_eq!(registry.archetypes().len(), 1);
    assert_eq!(registry.archetypes()[0].chunk_count(), 3);

    let matches = registry.query_entities::<(Score,)>();
    assert_eq!(matches.len(), 130);
    let sum: u32 = matches
        .iter()
        .map(|&e| registry.get_component::<Score>(e).unwrap().0)
        .sum();
    assert_eq!(sum, 8385);
}

#[test]
fn test_migration_preserves_values() {
    let mut registry = Registry::new();

    let entity = registry.create_entity();
    registry
        .add_component(entity, Position { x: 1.0, y: 2.0 })
        .unwrap();
    registry
        .add_component(entity, Velocity { dx: 0.5, dy: -0.5 })
        .unwrap();
    let two_sig = registry.archetype_of(entity).unwrap();

    // Adding a third component migrates the entity to a new archetype.
    registry.add_component(entity, Score(7)).unwrap();
    let three_sig = registry.archetype_of(entity).unwrap();
    assert_ne!(two_sig, three_sig);
    assert!(three_sig.is_superset_of(two_sig));

    assert_eq!(
        registry.get_component::<Position>(entity),
        Some(&Position { x: 1.0, y: 2.0 })
    );
    assert_eq!(
        registry.get_component::<Velocity>(entity),
        Some(&Velocity { dx: 0.5, dy: -0.5 })
    );
    assert_eq!(registry.get_component::<Score>(entity), Some(&Score(7)));

    // Removing it migrates back to the existing two-component archetype.
    registry.remove_component::<Score>(entity).unwrap();
    assert_eq!(registry.archetype_of(entity), Some(two_sig));
    assert_eq!(registry.get_component::<Score>(entity), None);
    assert_eq!(
        registry.get_component::<Position>(entity),
        Some(&Position { x: 1.0, y: 2.0 })
    );
}

#[test]
fn test_swap_remove_keeps_other_entities_intact() {
    let mut registry = Registry::new();

    let entities: Vec<_> = (0..10u32)
        .map(|i| {
            let e = registry.create_entity();
            registry.add_component(e, Score(i * 100)).unwrap();
            e
        })
        .collect();

    // Destroying from the middle backfills via swap-and-pop; every surviving
    // entity must still resolve to its own value.
    registry.destroy_entity(entities[3]).unwrap();
    registry.destroy_entity(entities[0]).unwrap();

    for (i, &e) in entities.iter().enumerate() {
        if i == 0 || i == 3 {
            assert!(!registry.is_live(e));
            continue;
        }
        assert_eq!(
            registry.get_component::<Score>(e),
            Some(&Score(i as u32 * 100))
        );
    }
    assert_eq!(registry.live_count(), 8);
}

#[test]
fn test_query_superset_semantics() {
    let mut registry = Registry::new();

    let lone = registry.create_entity();
    registry
        .add_component(lone, Position { x: 0.0, y: 0.0 })
        .unwrap();

    let pair = registry.create_entity();
    registry
        .add_component(pair, Position { x: 1.0, y: 1.0 })
        .unwrap();
    registry
        .add_component(pair, Velocity { dx: 1.0, dy: 0.0 })
        .unwrap();

    let homeless = registry.create_entity();

    let with_position = registry.query_entities::<(Position,)>();
    assert_eq!(with_position.len(), 2);
    assert!(with_position.contains(&lone));
    assert!(with_position.contains(&pair));
    assert!(!with_position.contains(&homeless));

    let moving = registry.query_entities::<(Position, Velocity)>();
    assert_eq!(moving, vec![pair]);

    assert!(registry.query_entities::<(Score,)>().is_empty());
}

#[test]
fn test_empty_chunk_retention_cap() {
    let mut registry = Registry::new();

    // Fill two chunks, then drain them all.
    let entities: Vec<_> = (0..(2 * CHUNK_CAPACITY as u32))
        .map(|i| {
            let e = registry.create_entity();
            registry.add_component(e, Score(i)).unwrap();
            e
        })
        .collect();
    assert_eq!(registry.archetypes()[0].chunk_count(), 2);

    for &e in &entities {
        registry.destroy_entity(e).unwrap();
    }

    // Default cap of one: a single empty chunk is retained, the other was
    // physically evicted.
    assert_eq!(registry.archetypes()[0].entity_count(), 0);
    assert_eq!(registry.archetypes()[0].chunk_count(), 1);

    // The retained chunk serves the next allocation without growing.
    let e = registry.create_entity();
    registry.add_component(e, Score(1)).unwrap();
    assert_eq!(registry.archetypes()[0].chunk_count(), 1);
}

#[test]
fn test_zero_retention_frees_everything() {
    let mut registry = Registry::with_chunk_retention(0);

    let e = registry.create_entity();
    registry.add_component(e, Score(1)).unwrap();
    assert_eq!(registry.archetypes()[0].chunk_count(), 1);

    registry.destroy_entity(e).unwrap();
    assert_eq!(registry.archetypes()[0].chunk_count(), 0);
}

#[test]
fn test_destructors_run_exactly_once() {
    let drops = Arc::new(AtomicUsize::new(0));
    let probe = |drops: &Arc<AtomicUsize>| DropProbe {
        drops: Arc::clone(drops),
    };

    let mut registry = Registry::new();

    // Migration relocates the value twice without dropping it.
    let migrated = registry.create_entity();
    registry.add_component(migrated, probe(&drops)).unwrap();
    registry
        .add_component(migrated, Position { x: 0.0, y: 0.0 })
        .unwrap();
    registry.remove_component::<Position>(migrated).unwrap();
    assert_eq!(drops.load(Ordering::SeqCst), 0);

    // Explicit removal drops once.
    registry.remove_component::<DropProbe>(migrated).unwrap();
    assert_eq!(drops.load(Ordering::SeqCst), 1);

    // In-place replacement drops the old value only.
    let replaced = registry.create_entity();
    registry.add_component(replaced, probe(&drops)).unwrap();
    registry.add_component(replaced, probe(&drops)).unwrap();
    assert_eq!(drops.load(Ordering::SeqCst), 2);

    // Entity destruction drops the live value.
    registry.destroy_entity(replaced).unwrap();
    assert_eq!(drops.load(Ordering::SeqCst), 3);

    // Registry teardown drops whatever is still stored.
    let leftover = registry.create_entity();
    registry.add_component(leftover, probe(&drops)).unwrap();
    drop(registry);
    assert_eq!(drops.load(Ordering::SeqCst), 4);
}

#[test]
fn test_stale_ids_fail_cleanly() {
    let mut registry = Registry::new();
    let entity = registry.create_entity();
    registry.add_component(entity, Score(1)).unwrap();
    registry.destroy_entity(entity).unwrap();

    assert_eq!(
        registry.destroy_entity(entity),
        Err(EcsError::NotAlive(entity))
    );
    assert!(matches!(
        registry.add_component(entity, Score(2)),
        Err(EcsError::NotAlive(_))
    ));

    // The recycled index mints a distinct id and starts clean.
    let fresh = registry.create_entity();
    assert_eq!(fresh.index(), entity.index());
    assert_ne!(fresh.generation(), entity.generation());
    assert_eq!(registry.get_component::<Score>(fresh), None);
}
