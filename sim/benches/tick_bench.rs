use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use ew_sim::config::BroadPhase;
use ew_sim::{Faction, SimConfig, SimWorld, UnitType};

/// Skirmish with `squads` squads per faction spread over the lanes, already
/// in contact around the midline.
fn populated(squads: usize, broad_phase: BroadPhase) -> SimWorld {
    let mut config = SimConfig::default();
    config.rng_seed = Some(9);
    config.director.enabled = false;
    config.movement.broad_phase = broad_phase;
    let mut sim = SimWorld::skirmish_with_config(config);

    for i in 0..squads {
        let lane = i % 3;
        let unit_type = UnitType::MOBILE[i % UnitType::MOBILE.len()];
        let y = sim.config().map.lane_center_y(lane);
        for k in 0..3 {
            let offset = k as f32 * 14.0;
            sim.spawn_unit_at(Faction::Player, unit_type, lane, 520.0 - offset, y + offset);
            sim.spawn_unit_at(Faction::Enemy, unit_type, lane, 680.0 + offset, y - offset);
        }
    }
    sim
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    for squads in [10usize, 40, 100] {
        group.bench_with_input(BenchmarkId::new("brute_force", squads), &squads, |b, &squads| {
            b.iter_batched(
                || populated(squads, BroadPhase::BruteForce),
                |mut sim| {
                    sim.tick();
                },
                BatchSize::SmallInput,
            )
        });
        group.bench_with_input(BenchmarkId::new("grid", squads), &squads, |b, &squads| {
            b.iter_batched(
                || populated(squads, BroadPhase::Grid { cell_size: 64.0 }),
                |mut sim| {
                    sim.tick();
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(tick_benches, bench_tick);
criterion_main!(tick_benches);
