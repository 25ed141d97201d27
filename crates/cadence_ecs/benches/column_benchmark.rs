//! Column storage benchmarks.
//!
//! Run with: `cargo bench --package cadence_ecs`

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use cadence_ecs::{Component, World};

#[derive(Debug, Clone, Copy)]
struct Position([f32; 3]);

impl Component for Position {
    fn type_name() -> &'static str {
        "Position"
    }
}

#[derive(Debug, Clone, Copy)]
struct Velocity([f32; 3]);

impl Component for Velocity {
    fn type_name() -> &'static str {
        "Velocity"
    }
}

fn populated(count: usize) -> World {
    let world = World::new();
    for i in 0..count {
        let e = world.spawn();
        let f = i as f32;
        world.attach(e, Position([f, 0.0, 0.0])).ok();
        world.attach(e, Velocity([1.0, 0.5, 0.25])).ok();
    }
    world
}

fn bench_spawn_attach(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn_attach");
    for count in [1_000, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| black_box(populated(count).entity_count()));
        });
    }
    group.finish();
}

fn bench_chunk_update(c: &mut Criterion) {
    let world = populated(100_000);
    c.bench_function("chunk_update_100k", |b| {
        b.iter(|| {
            for index in 0..world.chunk_count::<Position>() {
                let Some(mut positions) = world.chunk_mut::<Position>(index) else {
                    continue;
                };
                for (_, position) in positions.iter_mut() {
                    position.0[0] += 0.016;
                }
            }
        });
    });
}

fn bench_query(c: &mut Criterion) {
    let world = populated(100_000);
    c.bench_function("query_pair_100k", |b| {
        b.iter(|| {
            let query = world.query::<(Position, Velocity)>();
            black_box(query.iter().map(|(_, (p, v))| p.0[0] + v.0[0]).sum::<f32>())
        });
    });
}

criterion_group!(benches, bench_spawn_attach, bench_chunk_update, bench_query);
criterion_main!(benches);
