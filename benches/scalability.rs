//! Scalability benchmarks for the arena simulation
//!
//! Compares spatial-index queries against a brute-force scan and measures
//! full ticks at increasing player counts against the 50ms budget.
//!
//! Run with: cargo bench --bench scalability

use arena_battle_server::config::SimulationConfig;
use arena_battle_server::game::game_loop::Simulation;
use arena_battle_server::game::spatial::{SpatialEntityId, SpatialEntry, SpatialIndex};
use arena_battle_server::game::state::PlayerInput;
use arena_battle_server::util::vec2::Vec2;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use uuid::Uuid;

const ARENA_HALF: f32 = 1000.0;
const QUERY_RADIUS: f32 = 25.0;

fn random_entries(count: usize) -> Vec<SpatialEntry> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| SpatialEntry {
            id: SpatialEntityId::Bullet(i as u64),
            position: Vec2::new(
                rng.gen_range(-ARENA_HALF..ARENA_HALF),
                rng.gen_range(-ARENA_HALF..ARENA_HALF),
            ),
        })
        .collect()
}

fn brute_force(entries: &[SpatialEntry], center: Vec2, radius: f32) -> usize {
    let radius_sq = radius * radius;
    entries
        .iter()
        .filter(|e| e.position.distance_sq_to(center) <= radius_sq)
        .count()
}

/// Create a simulation with `count` players holding random inputs
fn create_simulation(count: usize) -> Simulation {
    let mut config = SimulationConfig::default();
    config.spawn.max_players = count;
    config.spawn.max_bullets = count * 4;
    config.seed = Some(count as u64);

    let mut sim = Simulation::new(config);
    sim.start_clock(0);
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let id = Uuid::new_v4();
        if sim.join(id, format!("Player{}", i), 0).is_err() {
            continue;
        }
        sim.set_input(
            id,
            PlayerInput {
                up: rng.gen_bool(0.5),
                left: rng.gen_bool(0.5),
                right: rng.gen_bool(0.5),
                down: rng.gen_bool(0.5),
                angle: rng.gen_range(-std::f32::consts::PI..std::f32::consts::PI),
                wants_shoot: rng.gen_bool(0.5),
            },
        );
    }
    sim
}

/// Radius queries: spatial index vs scanning every entity
fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");
    group.sample_size(50);

    for count in [100, 500, 1000, 2000] {
        let entries = random_entries(count);
        let mut index = SpatialIndex::new(100.0);
        for entry in &entries {
            index.insert_at(entry.id, entry.position);
        }
        let mut buf = Vec::new();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("spatial_index", count), &count, |b, _| {
            b.iter(|| {
                let mut found = 0;
                for entry in &entries {
                    index.query_into(entry.position.x, entry.position.z, QUERY_RADIUS, &mut buf);
                    found += buf.len();
                }
                black_box(found)
            })
        });
        group.bench_with_input(BenchmarkId::new("brute_force", count), &count, |b, _| {
            b.iter(|| {
                let found: usize = entries
                    .iter()
                    .map(|e| brute_force(&entries, e.position, QUERY_RADIUS))
                    .sum();
                black_box(found)
            })
        });
    }
    group.finish();
}

/// Per-tick index rebuild cost
fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_rebuild");
    group.sample_size(50);

    for count in [100, 500, 1000, 2000] {
        let entries = random_entries(count);
        let mut index = SpatialIndex::new(100.0);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("rebuild", count), &count, |b, _| {
            b.iter(|| {
                index.clear();
                for entry in &entries {
                    index.insert_at(entry.id, entry.position);
                }
                black_box(index.len())
            })
        });
    }
    group.finish();
}

/// Full tick (all phases) at various player counts
fn bench_full_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_tick");
    group.sample_size(30);

    for count in [16, 32, 64, 128, 256] {
        let mut sim = create_simulation(count);
        let mut now = 0u64;

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("complete", count), &count, |b, _| {
            b.iter(|| {
                now += 50;
                let stats = sim.tick(now);
                sim.drain_events();
                black_box(stats)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_queries, bench_rebuild, bench_full_tick);

criterion_main!(benches);
