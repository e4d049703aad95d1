//! Public API for the simulation.
//!
//! This module provides the main interface for a renderer, UI or headless
//! driver to interact with the simulation.
//!
//! ## Fixed Timestep
//!
//! The simulation uses a fixed timestep internally (default 60 Hz). When
//! `step(dt)` is called, the simulation accumulates time and runs as many
//! whole ticks as fit. `tick()` runs exactly one.
//!
//! ## Commands
//!
//! Spawn commands are validated at the boundary and queued; they execute at
//! the start of the next tick. `spawn_now` executes one immediately and is
//! meant for setup between ticks.

use crate::components::*;
use crate::config::SimConfig;
use crate::spatial::SpatialGrid;
use crate::store::{
    execute_spawn, spawn_unit_at, CommandError, NextIds, SimRng, SpawnCommand, SpawnQueue,
    TickIntents,
};
use crate::systems::*;
use crate::world::Snapshot;
use bevy_ecs::prelude::*;

/// The main simulation world container.
///
/// Holds the ECS world and schedule, providing a clean API for:
/// - Initializing a match
/// - Stepping the simulation forward
/// - Extracting state snapshots
/// - Issuing spawn commands
pub struct SimWorld {
    world: World,
    schedule: Schedule,
    time: f32,
    /// Accumulated time for fixed timestep.
    time_accumulator: f32,
}

impl SimWorld {
    /// Create a new empty simulation world.
    pub fn new() -> Self {
        Self::with_config(SimConfig::default())
    }

    /// Create a new empty simulation world with custom configuration.
    pub fn with_config(config: SimConfig) -> Self {
        let mut world = World::new();

        world.insert_resource(SpatialGrid::new(config.max_body_radius() * 2.0));
        world.insert_resource(SimTick(0));
        world.insert_resource(SimRng::from_seed(config.rng_seed));
        world.insert_resource(ResourcePools::from_config(&config));
        world.insert_resource(DirectorState::from_config(&config));
        world.insert_resource(NetworkZones::default());
        world.insert_resource(SpawnQueue::default());
        world.insert_resource(TickIntents::default());
        world.insert_resource(EconomyStats::default());
        world.insert_resource(Dominance::default());
        world.insert_resource(NextIds::default());
        world.insert_resource(config);

        Self {
            world,
            schedule: build_tick_schedule(),
            time: 0.0,
            time_accumulator: 0.0,
        }
    }

    /// Default match: strongpoints on every lane for both factions.
    pub fn new_skirmish() -> Self {
        Self::skirmish_with_config(SimConfig::default())
    }

    /// Match with strongpoints at the configured columns, mirrored for the
    /// enemy side.
    pub fn skirmish_with_config(config: SimConfig) -> Self {
        let columns = config.spawn.strongpoint_columns.clone();
        let lanes = config.map.lane_count;
        let mut sim = Self::with_config(config);
        for faction in Faction::ALL {
            for &column in &columns {
                for lane in 0..lanes {
                    sim.spawn_strongpoint(faction, lane, column);
                }
            }
        }
        tracing::debug!(
            target: "ew_sim::spawn",
            strongpoints = columns.len() * lanes * 2,
            "spawn.skirmish_ready"
        );
        sim
    }

    /// Step the simulation forward by `dt` seconds.
    ///
    /// Returns the number of ticks that ran. Leftover time carries over to
    /// the next call.
    pub fn step(&mut self, dt: f32) -> u32 {
        let fixed_dt = self.config().fixed_timestep;
        self.time_accumulator += dt;

        let mut ran = 0;
        while self.time_accumulator >= fixed_dt {
            self.time_accumulator -= fixed_dt;
            if !self.tick() {
                self.time_accumulator = 0.0;
                break;
            }
            ran += 1;
        }
        ran
    }

    /// Run exactly one tick. Does nothing once the match is decided.
    ///
    /// Returns whether the tick ran.
    pub fn tick(&mut self) -> bool {
        if self.is_over() {
            return false;
        }
        self.world.resource_mut::<SimTick>().increment();
        self.schedule.run(&mut self.world);
        self.time += self.config().fixed_timestep;
        true
    }

    /// Queue a squad for the next tick boundary.
    ///
    /// Insufficient funds is not an error; the squad is dropped silently
    /// when the command executes.
    pub fn queue_spawn(
        &mut self,
        faction: Faction,
        unit_type: UnitType,
        lane: usize,
    ) -> Result<(), CommandError> {
        let command = SpawnCommand::new(self.config(), faction, unit_type, lane)?;
        self.world.resource_mut::<SpawnQueue>().push(command);
        Ok(())
    }

    /// Field a squad immediately. Returns the number of units created.
    pub fn spawn_now(
        &mut self,
        faction: Faction,
        unit_type: UnitType,
        lane: usize,
    ) -> Result<usize, CommandError> {
        let command = SpawnCommand::new(self.config(), faction, unit_type, lane)?;
        Ok(execute_spawn(&mut self.world, command))
    }

    /// Place a strongpoint `column` units in from the faction's home edge.
    pub fn spawn_strongpoint(&mut self, faction: Faction, lane: usize, column: f32) -> u32 {
        let map = &self.config().map;
        let x = map.from_home(faction, column);
        let y = map.ideal_y(lane, x);
        spawn_unit_at(&mut self.world, faction, UnitType::Strongpoint, lane, x, y)
    }

    /// Place a single unit at an exact position, free of charge.
    pub fn spawn_unit_at(
        &mut self,
        faction: Faction,
        unit_type: UnitType,
        lane: usize,
        x: f32,
        y: f32,
    ) -> u32 {
        spawn_unit_at(&mut self.world, faction, unit_type, lane, x, y)
    }

    /// Get a snapshot of the current simulation state.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::from_world(&mut self.world, self.time)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot()
            .to_json()
            .unwrap_or_else(|_| "{}".to_string())
    }

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    pub fn resources(&self) -> ResourcePools {
        *self.world.resource::<ResourcePools>()
    }

    pub fn dominance(&self) -> Dominance {
        *self.world.resource::<Dominance>()
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.dominance().outcome
    }

    pub fn is_over(&self) -> bool {
        self.dominance().is_terminal()
    }

    /// Zones computed during the last tick.
    pub fn zones(&self) -> &[NetworkZone] {
        &self.world.resource::<NetworkZones>().0
    }

    pub fn economy_stats(&self) -> &EconomyStats {
        self.world.resource::<EconomyStats>()
    }

    pub fn director(&self) -> &DirectorState {
        self.world.resource::<DirectorState>()
    }

    /// Get the current tick number.
    pub fn current_tick(&self) -> u64 {
        self.world.resource::<SimTick>().0
    }

    /// Get the elapsed simulation time.
    pub fn current_time(&self) -> f32 {
        self.time
    }

    /// Live (not yet dead) units and strongpoints.
    pub fn unit_count(&mut self) -> usize {
        let mut query = self.world.query::<&UnitFlags>();
        query.iter(&self.world).filter(|f| !f.dead).count()
    }

    /// Uncollected wreckage.
    pub fn wreckage_count(&mut self) -> usize {
        let mut query = self.world.query::<&Wreckage>();
        query.iter(&self.world).filter(|w| !w.collected).count()
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}
