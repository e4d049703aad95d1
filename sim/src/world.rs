//! Snapshot types.
//!
//! The `Snapshot` struct is a serializable, read-only view of the simulation
//! state handed to renderers and UI. Lists are sorted by id.

use crate::components::*;
use crate::config::SimConfig;
use crate::store::NextIds;
use crate::systems::attrition::efficiency;
use crate::systems::clock::SimTick;
use crate::systems::economy::{EconomyStats, ResourcePools};
use crate::systems::network::{NetworkZones, ZoneKind, ZoneRect};
use crate::systems::outcome::{Dominance, MatchOutcome};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Snapshot of a single unit or strongpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: u32,
    pub faction: Faction,
    pub unit_type: UnitType,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub hp: f32,
    pub hp_max: f32,
    pub radius: f32,
    pub lane: usize,
    pub in_network: bool,
    pub is_static: bool,
    /// Attrition factor at the unit's current position.
    pub efficiency: f32,
    pub attacking: bool,
}

/// Snapshot of an uncollected wreckage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WreckageSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub value: f32,
    pub radius: f32,
    pub origin: UnitType,
}

/// Snapshot of a live network zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSnapshot {
    pub faction: Faction,
    pub kind: ZoneKind,
    pub anchors: (u32, u32),
    pub rect: ZoneRect,
}

/// Complete simulation state snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current simulation tick.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    pub units: Vec<UnitSnapshot>,
    pub wreckage: Vec<WreckageSnapshot>,
    pub zones: Vec<ZoneSnapshot>,
    pub player_resources: f32,
    pub enemy_resources: f32,
    pub dominance: i64,
    pub outcome: Option<MatchOutcome>,
    /// Strongpoints lost, indexed by faction (player, enemy).
    pub strongpoints_lost: [u32; 2],
    /// Ids handed out so far, for clients that diff snapshots.
    pub next_unit_id: u32,
}

impl Snapshot {
    /// Create a snapshot from the ECS world.
    pub fn from_world(world: &mut World, time: f32) -> Self {
        let config = world.resource::<SimConfig>().clone();

        let mut units = Vec::new();
        let mut query = world.query::<(
            &UnitId,
            &Faction,
            &UnitType,
            &Lane,
            &Position,
            &Velocity,
            &Body,
            &Health,
            &CombatState,
            &UnitFlags,
        )>();
        for (id, faction, unit_type, lane, pos, vel, body, health, combat, flags) in
            query.iter(world)
        {
            if flags.dead {
                continue;
            }
            units.push(UnitSnapshot {
                id: id.0,
                faction: *faction,
                unit_type: *unit_type,
                x: pos.x,
                y: pos.y,
                vx: vel.vx,
                vy: vel.vy,
                hp: health.current,
                hp_max: health.max,
                radius: body.radius,
                lane: lane.0,
                in_network: flags.in_network,
                is_static: flags.is_static,
                efficiency: efficiency(
                    &config.map,
                    &config.attrition,
                    *faction,
                    pos.x,
                    flags.is_static,
                ),
                attacking: combat.attacking,
            });
        }
        units.sort_by_key(|u| u.id);

        let mut wreckage = Vec::new();
        let mut wreck_query = world.query::<(&WreckageId, &Position, &Body, &Wreckage)>();
        for (id, pos, body, wreck) in wreck_query.iter(world) {
            if wreck.collected {
                continue;
            }
            wreckage.push(WreckageSnapshot {
                id: id.0,
                x: pos.x,
                y: pos.y,
                value: wreck.value,
                radius: body.radius,
                origin: wreck.origin,
            });
        }
        wreckage.sort_by_key(|w| w.id);

        let zones = world
            .resource::<NetworkZones>()
            .0
            .iter()
            .map(|z| ZoneSnapshot {
                faction: z.faction,
                kind: z.kind,
                anchors: z.anchors,
                rect: z.rect,
            })
            .collect();

        let pools = *world.resource::<ResourcePools>();
        let dominance = *world.resource::<Dominance>();
        let stats = world.resource::<EconomyStats>();

        Self {
            tick: world.resource::<SimTick>().0,
            time,
            units,
            wreckage,
            zones,
            player_resources: pools.player,
            enemy_resources: pools.enemy,
            dominance: dominance.score,
            outcome: dominance.outcome,
            strongpoints_lost: stats.strongpoints_lost,
            next_unit_id: world.resource::<NextIds>().unit,
        }
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn units_of(&self, faction: Faction) -> impl Iterator<Item = &UnitSnapshot> {
        self.units.iter().filter(move |u| u.faction == faction)
    }
}
