//! Simulation clock - tick counter and the per-tick system ordering.
//!
//! One tick is one pass of a single chained schedule:
//!
//! 1. `director_system` - AI spawn decisions (queued)
//! 2. `apply_spawn_queue_system` - tick-boundary spawns
//! 3. `network_zone_system` - zones and membership
//! 4. `collision_system` - pairwise separation
//! 5. `confinement_system` - lane funnel
//! 6. `unit_update_system` - flanking, targeting, combat, movement, collection
//! 7. `apply_intents_system` - wreckage, credits, strongpoint losses
//! 8. `economy_trickle_system` - passive income
//! 9. `compact_system` - remove dead units and collected wreckage
//! 10. `outcome_system` - dominance score and match result
//!
//! `chain()` inserts command flushes between stages, so entities spawned by
//! one stage are visible to the next.

use crate::store::{apply_spawn_queue_system, compact_system};
use crate::systems::ai::director_system;
use crate::systems::combat::unit_update_system;
use crate::systems::economy::{apply_intents_system, economy_trickle_system};
use crate::systems::network::network_zone_system;
use crate::systems::outcome::outcome_system;
use crate::systems::physics::{collision_system, confinement_system};
use bevy_ecs::prelude::*;

/// Global simulation tick counter. Incremented before each tick runs.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SimTick(pub u64);

impl SimTick {
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

/// Build the schedule that advances the simulation by exactly one tick.
pub fn build_tick_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            director_system,
            apply_spawn_queue_system,
            network_zone_system,
            collision_system,
            confinement_system,
            unit_update_system,
            apply_intents_system,
            economy_trickle_system,
            compact_system,
            outcome_system,
        )
            .chain(),
    );
    schedule
}
