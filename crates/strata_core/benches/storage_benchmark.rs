//! # Storage Engine Benchmark
//!
//! Measures the hot paths of the archetype store:
//! 1. Entity spawn with a two-component signature
//! 2. Random-access component reads through the location table
//! 3. Migration churn (add/remove a component in a loop)

#![allow(missing_docs)]
#![allow(dead_code)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use strata_core::Registry;

const ENTITY_COUNT: usize = 100_000;

#[derive(Clone, Copy)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Clone, Copy)]
struct Velocity {
    dx: f32,
    dy: f32,
}

#[derive(Clone, Copy)]
struct Tag(u64);

/// Generate deterministic "random" indices
fn generate_random_indices(count: usize, max: usize, seed: u64) -> Vec<usize> {
    let mut indices = Vec::with_capacity(count);
    let mut state = seed;

    for _ in 0..count {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        indices.push((state as usize) % max);
    }

    indices
}

fn spawn_population(registry: &mut Registry) -> Vec<strata_core::EntityId> {
    (0..ENTITY_COUNT)
        .map(|i| {
            let e = registry.create_entity();
            registry
                .add_component(
                    e,
                    Position {
                        x: i as f32,
                        y: i as f32,
                    },
                )
                .unwrap();
            registry
                .add_component(e, Velocity { dx: 0.1, dy: 0.2 })
                .unwrap();
            e
        })
        .collect()
}

fn bench_spawn(c: &mut Criterion) {
    c.bench_function("spawn_100k_two_components", |b| {
        b.iter(|| {
            let mut registry = Registry::new();
            let entities = spawn_population(&mut registry);
            black_box(entities.len())
        });
    });
}

fn bench_random_access(c: &mut Criterion) {
    let mut registry = Registry::new();
    let entities = spawn_population(&mut registry);
    let indices = generate_random_indices(10_000, entities.len(), 0xDEAD_BEEF);

    c.bench_function("random_read_10k", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for &i in &indices {
                let pos = registry.get_component::<Position>(entities[i]).unwrap();
                sum += pos.x;
            }
            black_box(sum)
        });
    });
}

fn bench_migration_churn(c: &mut Criterion) {
    let mut registry = Registry::new();
    let entities = spawn_population(&mut registry);
    let subject = entities[ENTITY_COUNT / 2];

    c.bench_function("add_remove_component_churn", |b| {
        b.iter(|| {
            registry.add_component(subject, Tag(1)).unwrap();
            registry.remove_component::<Tag>(subject).unwrap();
            black_box(registry.live_count())
        });
    });
}

fn bench_query_scan(c: &mut Criterion) {
    let mut registry = Registry::new();
    let entities = spawn_population(&mut registry);
    // A second archetype so the scan has something to skip.
    for &e in entities.iter().take(1000) {
        registry.add_component(e, Tag(0)).unwrap();
    }

    c.bench_function("query_position_velocity_100k", |b| {
        b.iter(|| {
            let matches = registry.query_entities::<(Position, Velocity)>();
            black_box(matches.len())
        });
    });
}

criterion_group!(
    benches,
    bench_spawn,
    bench_random_access,
    bench_migration_churn,
    bench_query_scan
);
criterion_main!(benches);
