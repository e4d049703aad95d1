//! Headless skirmish between the player and the AI director.
//!
//! Run with: cargo run --example skirmish_demo
//! Logs: RUST_LOG=ew_sim=debug cargo run --example skirmish_demo
//! Config: EW_SIM_CONFIG_PATH=path/to/config.json

use ew_sim::render_bridge::{parse_counts, snapshot_to_flatbuffer};
use ew_sim::{load_sim_config_from_env, Faction, SimWorld, UnitType};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Entropy War - Skirmish Demo ===\n");

    let mut config = load_sim_config_from_env();
    if config.rng_seed.is_none() {
        config.rng_seed = Some(2024);
    }
    let mut sim = SimWorld::skirmish_with_config(config);

    // A scripted player: one squad per lane every few seconds, rotating roles.
    let roles = UnitType::MOBILE;
    let mut order = 0usize;
    let lanes = sim.config().map.lane_count;

    for second in 1..=180 {
        if second % 4 == 0 {
            let unit_type = roles[order % roles.len()];
            let lane = order % lanes;
            if let Err(err) = sim.queue_spawn(Faction::Player, unit_type, lane) {
                eprintln!("rejected: {err}");
            }
            order += 1;
        }

        sim.step(1.0);

        if second % 15 == 0 {
            print_summary(&mut sim);
        }
        if sim.is_over() {
            break;
        }
    }

    println!("\n=== Result ===");
    match sim.outcome() {
        Some(outcome) => println!("{outcome:?} at tick {}", sim.current_tick()),
        None => println!("Undecided, dominance {}", sim.dominance().score),
    }

    let buffer = snapshot_to_flatbuffer(&sim.snapshot());
    if let Some((units, wrecks, zones)) = parse_counts(&buffer) {
        println!(
            "Render buffer: {} floats ({units} units, {wrecks} wreckage, {zones} zones)",
            buffer.len()
        );
    }
}

fn print_summary(sim: &mut SimWorld) {
    let snapshot = sim.snapshot();
    let count = |faction: Faction| {
        snapshot
            .units_of(faction)
            .filter(|u| !u.is_static)
            .count()
    };
    let stats = sim.economy_stats();
    println!(
        "t={:>5.1}s tick={:>5} player={:>3} enemy={:>3} wreckage={:>2} zones={} \
         pools=({:.0}, {:.0}) dominance={} lost=({}, {})",
        snapshot.time,
        snapshot.tick,
        count(Faction::Player),
        count(Faction::Enemy),
        snapshot.wreckage.len(),
        snapshot.zones.len(),
        snapshot.player_resources,
        snapshot.enemy_resources,
        snapshot.dominance,
        stats.units_lost[0],
        stats.units_lost[1],
    );
}
