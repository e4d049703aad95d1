//! AI director and flanking behavior.
//!
//! The director fields squads for one faction, either one free squad per
//! fixed interval or composed waves bought from an income that scales with a
//! slowly rising difficulty multiplier. Its decisions are queued as spawn
//! commands and executed at the next tick boundary, never mid-tick.
//!
//! Flanking is a per-unit decision made during the unit update pass: a unit
//! crossing a crossroad band near the opposing strongpoints retargets an
//! adjacent lane when its own lane has nothing left to attack.

use crate::components::*;
use crate::config::{DirectorMode, FlankingConfig, LaneChoice, SimConfig};
use crate::lanes::LaneLayout;
use crate::store::{SimRng, SpawnCommand, SpawnQueue};
use crate::systems::clock::SimTick;
use crate::systems::economy::ResourcePools;
use bevy_ecs::prelude::*;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

// ============================================================================
// DIRECTOR
// ============================================================================

/// Director bookkeeping.
#[derive(Resource, Debug, Clone)]
pub struct DirectorState {
    /// Tick at or after which the next decision is made.
    pub next_decision_tick: u64,
    /// Current difficulty multiplier (wave mode).
    pub difficulty: f32,
    pub squads_sent: u32,
    pub waves_sent: u32,
}

impl DirectorState {
    pub fn from_config(config: &SimConfig) -> Self {
        let first = match config.director.mode {
            DirectorMode::Interval { interval_ticks } => interval_ticks,
            DirectorMode::Wave {
                base_interval_ticks,
                ..
            } => base_interval_ticks,
        };
        Self {
            next_decision_tick: first,
            difficulty: 1.0,
            squads_sent: 0,
            waves_sent: 0,
        }
    }
}

/// Mobile unit counts per lane, split by faction and by half of the map.
#[derive(Debug, Clone, Default)]
pub struct LanePresence {
    /// Own mobile units per lane.
    pub own: Vec<u32>,
    /// Opposing mobile units past the midline into the director's half.
    pub pressure: Vec<u32>,
}

impl LanePresence {
    pub fn tally<'a>(
        layout: &LaneLayout,
        faction: Faction,
        units: impl Iterator<Item = (&'a Faction, &'a Lane, &'a Position, &'a UnitFlags)>,
    ) -> Self {
        let mut presence = Self {
            own: vec![0; layout.lane_count],
            pressure: vec![0; layout.lane_count],
        };
        let mid = layout.center_x();
        for (unit_faction, lane, pos, flags) in units {
            if !flags.is_mobile_alive() || lane.0 >= layout.lane_count {
                continue;
            }
            if *unit_faction == faction {
                presence.own[lane.0] += 1;
            } else if layout.distance_from_home(faction, pos.x) < mid {
                presence.pressure[lane.0] += 1;
            }
        }
        presence
    }
}

/// Index of the smallest value, lowest index on ties.
fn argmin(values: &[u32]) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(i, v)| (**v, *i))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Index of the largest value, lowest index on ties.
fn argmax(values: &[u32]) -> usize {
    values
        .iter()
        .enumerate()
        .max_by_key(|(i, v)| (**v, std::cmp::Reverse(*i)))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Pick the lane for the next squad.
pub fn choose_lane(
    choice: LaneChoice,
    presence: &LanePresence,
    lane_count: usize,
    rng: &mut impl Rng,
) -> usize {
    match choice {
        LaneChoice::Random => rng.gen_range(0..lane_count.max(1)),
        LaneChoice::LeastPresence => argmin(&presence.own),
        LaneChoice::Pressure => {
            if presence.pressure.iter().all(|&p| p == 0) {
                argmin(&presence.own)
            } else {
                argmax(&presence.pressure)
            }
        }
    }
}

/// Pick a mobile role by the configured weights, uniform if they are unusable.
pub fn choose_unit_type(weights: &[f32; 3], rng: &mut impl Rng) -> UnitType {
    match WeightedIndex::new(weights.iter().copied()) {
        Ok(dist) => UnitType::MOBILE[dist.sample(rng)],
        Err(_) => UnitType::MOBILE[rng.gen_range(0..UnitType::MOBILE.len())],
    }
}

/// Difficulty multiplier at `tick`.
pub fn difficulty_at(tick: u64, growth_per_tick: f32, max: f32) -> f32 {
    (1.0 + growth_per_tick * tick as f32).min(max)
}

/// System that makes the director's spawn decisions.
pub fn director_system(
    config: Res<SimConfig>,
    tick: Res<SimTick>,
    mut state: ResMut<DirectorState>,
    mut queue: ResMut<SpawnQueue>,
    mut rng: ResMut<SimRng>,
    mut pools: ResMut<ResourcePools>,
    units: Query<(&Faction, &Lane, &Position, &UnitFlags)>,
) {
    let director = &config.director;
    if !director.enabled {
        return;
    }
    let faction = director.faction;
    let now = tick.0;

    if let DirectorMode::Wave {
        income_per_tick,
        difficulty_growth_per_tick,
        max_difficulty,
        ..
    } = &director.mode
    {
        state.difficulty = difficulty_at(now, *difficulty_growth_per_tick, *max_difficulty);
        pools.credit(faction, income_per_tick * state.difficulty);
    }

    if now < state.next_decision_tick {
        return;
    }

    let presence = LanePresence::tally(&config.map, faction, units.iter());
    let lane = choose_lane(director.lane_choice, &presence, config.map.lane_count, &mut rng.0);

    match &director.mode {
        DirectorMode::Interval { interval_ticks } => {
            let unit_type = choose_unit_type(&director.unit_weights, &mut rng.0);
            let Ok(command) = SpawnCommand::new(&config, faction, unit_type, lane) else {
                return;
            };
            queue.push(command.prepaid());
            state.squads_sent += 1;
            state.next_decision_tick = now + (*interval_ticks).max(1);
            tracing::debug!(
                target: "ew_sim::director",
                tick = now,
                lane,
                unit_type = unit_type.as_str(),
                "director.squad_queued"
            );
        }
        DirectorMode::Wave {
            base_interval_ticks,
            composition,
            strike_unit,
            ..
        } => {
            let core_cost: f32 = composition.iter().map(|t| config.stats(*t).cost).sum();
            if !pools.try_spend(faction, core_cost) {
                // Keep saving; re-check next tick.
                return;
            }

            let mut wave: Vec<UnitType> = composition.clone();
            if pools.try_spend(faction, config.stats(*strike_unit).cost) {
                wave.push(*strike_unit);
            }
            for unit_type in &wave {
                if let Ok(command) = SpawnCommand::new(&config, faction, *unit_type, lane) {
                    queue.push(command.prepaid());
                    state.squads_sent += 1;
                }
            }
            state.waves_sent += 1;

            let interval = (*base_interval_ticks as f32 / state.difficulty).round() as u64;
            state.next_decision_tick = now + interval.max(1);
            tracing::info!(
                target: "ew_sim::director",
                tick = now,
                lane,
                squads = wave.len(),
                difficulty = state.difficulty,
                "director.wave_queued"
            );
        }
    }
}

// ============================================================================
// FLANKING
// ============================================================================

/// Whether `x` falls within a crossroad band around the opposing
/// strongpoint columns.
pub fn in_crossroad(config: &SimConfig, faction: Faction, x: f32) -> bool {
    let opponent = faction.opponent();
    let half = config.flanking.crossroad_half_width;
    config
        .spawn
        .strongpoint_columns
        .iter()
        .map(|col| config.map.from_home(opponent, *col))
        .any(|col_x| (x - col_x).abs() <= half)
}

/// Lane a unit should switch to, if any.
///
/// `has_target(lane)` reports whether an opposing strongpoint is still alive
/// on `lane`. Adjacent lanes are checked lower index first.
pub fn flank_lane(
    config: &SimConfig,
    faction: Faction,
    lane: usize,
    x: f32,
    switch: &LaneSwitch,
    has_target: impl Fn(usize) -> bool,
) -> Option<usize> {
    let flanking: &FlankingConfig = &config.flanking;
    if !flanking.enabled || !flanking.factions.contains(&faction) || switch.cooldown > 0 {
        return None;
    }
    if !in_crossroad(config, faction, x) || has_target(lane) {
        return None;
    }
    let lower = lane.checked_sub(1);
    let upper = (lane + 1 < config.map.lane_count).then_some(lane + 1);
    [lower, upper].into_iter().flatten().find(|l| has_target(*l))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn test_lane_choice_least_presence_and_pressure() {
        let presence = LanePresence {
            own: vec![3, 1, 1],
            pressure: vec![0, 2, 5],
        };
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(choose_lane(LaneChoice::LeastPresence, &presence, 3, &mut rng), 1);
        assert_eq!(choose_lane(LaneChoice::Pressure, &presence, 3, &mut rng), 2);

        let calm = LanePresence {
            own: vec![2, 2, 0],
            pressure: vec![0, 0, 0],
        };
        assert_eq!(choose_lane(LaneChoice::Pressure, &calm, 3, &mut rng), 2);
        for _ in 0..50 {
            assert!(choose_lane(LaneChoice::Random, &calm, 3, &mut rng) < 3);
        }
    }

    #[test]
    fn test_weighted_type_choice() {
        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..50 {
            assert_eq!(choose_unit_type(&[0.0, 0.0, 1.0], &mut rng), UnitType::Cavalry);
        }
        // All-zero weights fall back to a uniform pick.
        let t = choose_unit_type(&[0.0, 0.0, 0.0], &mut rng);
        assert!(UnitType::MOBILE.contains(&t));
    }

    #[test]
    fn test_difficulty_grows_and_caps() {
        assert_eq!(difficulty_at(0, 0.001, 3.0), 1.0);
        assert!((difficulty_at(1000, 0.001, 3.0) - 2.0).abs() < 1e-5);
        assert_eq!(difficulty_at(100_000, 0.001, 3.0), 3.0);
    }

    #[test]
    fn test_flank_when_own_lane_is_cleared() {
        let config = SimConfig::default();
        let switch = LaneSwitch::default();
        // Enemy approaching the player's x = 280 column.
        let x = 290.0;
        assert!(in_crossroad(&config, Faction::Enemy, x));
        assert!(!in_crossroad(&config, Faction::Enemy, 600.0));

        let only_lane_two = |lane: usize| lane == 2;
        assert_eq!(flank_lane(&config, Faction::Enemy, 1, x, &switch, only_lane_two), Some(2));

        let lanes_zero_two = |lane: usize| lane != 1;
        assert_eq!(flank_lane(&config, Faction::Enemy, 1, x, &switch, lanes_zero_two), Some(0));

        // Own lane still has a target.
        assert_eq!(flank_lane(&config, Faction::Enemy, 1, x, &switch, |_| true), None);
        // Outside the band.
        assert_eq!(flank_lane(&config, Faction::Enemy, 1, 600.0, &switch, only_lane_two), None);
        // On cooldown.
        let cooling = LaneSwitch {
            cooldown: 10,
            transition: 0,
        };
        assert_eq!(flank_lane(&config, Faction::Enemy, 1, x, &cooling, only_lane_two), None);
        // Player units do not flank by default.
        assert_eq!(
            flank_lane(&config, Faction::Player, 1, 910.0, &switch, only_lane_two),
            None
        );
    }

    fn director_world(config: SimConfig) -> World {
        let mut world = World::new();
        world.insert_resource(DirectorState::from_config(&config));
        world.insert_resource(ResourcePools::from_config(&config));
        world.insert_resource(SimRng::from_seed(Some(5)));
        world.insert_resource(config);
        world.insert_resource(SpawnQueue::default());
        world.insert_resource(SimTick(0));
        world
    }

    fn run_ticks(world: &mut World, ticks: u64) {
        let mut schedule = Schedule::default();
        schedule.add_systems(director_system);
        for _ in 0..ticks {
            world.resource_mut::<SimTick>().increment();
            schedule.run(world);
        }
    }

    #[test]
    fn test_interval_director_queues_free_squads() {
        let mut world = director_world(SimConfig::default());
        run_ticks(&mut world, 119);
        assert!(world.resource::<SpawnQueue>().is_empty());
        run_ticks(&mut world, 1);
        let queue = world.resource::<SpawnQueue>();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.0[0].faction, Faction::Enemy);
        assert!(!queue.0[0].charged);
        run_ticks(&mut world, 120);
        assert_eq!(world.resource::<SpawnQueue>().len(), 2);
    }

    #[test]
    fn test_wave_director_saves_then_buys() {
        let mut config = SimConfig::default();
        config.director.mode = DirectorMode::Wave {
            base_interval_ticks: 10,
            income_per_tick: 10.0,
            difficulty_growth_per_tick: 0.0,
            max_difficulty: 1.0,
            composition: vec![UnitType::Shield, UnitType::Shield, UnitType::Crossbow],
            strike_unit: UnitType::Cavalry,
        };
        let mut world = director_world(config);

        // Composition costs 350: not affordable at tick 10 (100 saved).
        run_ticks(&mut world, 10);
        assert!(world.resource::<SpawnQueue>().is_empty());

        // Tick 35 reaches 350; no funds left for the strike unit.
        run_ticks(&mut world, 25);
        let queue = world.resource::<SpawnQueue>();
        assert_eq!(queue.len(), 3);
        assert!(queue.0.iter().all(|c| c.lane == queue.0[0].lane));
        assert_eq!(world.resource::<ResourcePools>().enemy, 0.0);
        assert_eq!(world.resource::<DirectorState>().waves_sent, 1);
    }

    #[test]
    fn test_disabled_director_is_idle() {
        let mut config = SimConfig::default();
        config.director.enabled = false;
        let mut world = director_world(config);
        run_ticks(&mut world, 500);
        assert!(world.resource::<SpawnQueue>().is_empty());
    }
}
