//! Entity store: spawn commands, squad creation, the per-tick intent queue
//! and end-of-tick compaction.
//!
//! Nothing outside the tick mutates the world mid-tick. Player and director
//! spawns are queued as [`SpawnCommand`]s and drained at the start of the next
//! tick; per-unit updates emit [`Intent`]s that the tick driver applies once
//! the update pass is finished.

use crate::components::*;
use crate::config::SimConfig;
use crate::systems::economy::ResourcePools;
use bevy_ecs::prelude::*;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use thiserror::Error;

// ============================================================================
// COMMANDS
// ============================================================================

/// Request to field one squad of `unit_type` on `lane`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnCommand {
    pub faction: Faction,
    pub unit_type: UnitType,
    pub lane: usize,
    /// Whether the squad cost is taken from the faction's pool at spawn.
    pub charged: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("lane {lane} out of range (map has {lane_count} lanes)")]
    LaneOutOfRange { lane: usize, lane_count: usize },
    #[error("{0:?} cannot be fielded by a squad command")]
    NotSquadType(UnitType),
}

impl SpawnCommand {
    /// Build a command, rejecting malformed parameters at the boundary.
    pub fn new(
        config: &SimConfig,
        faction: Faction,
        unit_type: UnitType,
        lane: usize,
    ) -> Result<Self, CommandError> {
        if unit_type.is_strongpoint() {
            return Err(CommandError::NotSquadType(unit_type));
        }
        if lane >= config.map.lane_count {
            return Err(CommandError::LaneOutOfRange {
                lane,
                lane_count: config.map.lane_count,
            });
        }
        Ok(Self {
            faction,
            unit_type,
            lane,
            charged: faction == Faction::Player,
        })
    }

    /// Same command, but the caller has already paid for it.
    pub fn prepaid(self) -> Self {
        Self {
            charged: false,
            ..self
        }
    }
}

/// Spawn commands waiting for the next tick boundary.
#[derive(Resource, Debug, Default)]
pub struct SpawnQueue(pub Vec<SpawnCommand>);

impl SpawnQueue {
    pub fn push(&mut self, command: SpawnCommand) {
        self.0.push(command);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// INTENTS
// ============================================================================

/// Side effect emitted by a unit update, applied after the update pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    /// A mobile unit died; leave a wreckage at its last position.
    SpawnWreckage {
        faction: Faction,
        origin: UnitType,
        x: f32,
        y: f32,
        value: f32,
    },
    /// A unit picked up wreckage worth `amount`.
    Credit { faction: Faction, amount: f32 },
    /// A strongpoint was destroyed.
    StrongpointLost { faction: Faction, lane: usize, id: u32 },
}

#[derive(Resource, Debug, Default)]
pub struct TickIntents(pub Vec<Intent>);

impl TickIntents {
    pub fn push(&mut self, intent: Intent) {
        self.0.push(intent);
    }
}

// ============================================================================
// IDS & RNG
// ============================================================================

/// Monotonic id allocators for units and wreckage.
#[derive(Resource, Debug, Default)]
pub struct NextIds {
    pub unit: u32,
    pub wreckage: u32,
}

impl NextIds {
    pub fn next_unit(&mut self) -> u32 {
        let id = self.unit;
        self.unit += 1;
        id
    }

    pub fn next_wreckage(&mut self) -> u32 {
        let id = self.wreckage;
        self.wreckage += 1;
        id
    }
}

/// Random source for spawn jitter and director decisions.
#[derive(Resource, Debug)]
pub struct SimRng(pub SmallRng);

impl SimRng {
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self(SmallRng::seed_from_u64(seed)),
            None => Self(SmallRng::from_entropy()),
        }
    }
}

// ============================================================================
// SPAWNING
// ============================================================================

/// Field a squad. Returns the number of units created.
///
/// A charged command the pool cannot cover is dropped without side effects.
/// Only player commands are charged by default; the director pays for its
/// own waves up front.
pub fn execute_spawn(world: &mut World, command: SpawnCommand) -> usize {
    let config = world.resource::<SimConfig>().clone();
    let stats = *config.stats(command.unit_type);

    if command.charged {
        let mut pools = world.resource_mut::<ResourcePools>();
        if !pools.try_spend(command.faction, stats.cost) {
            tracing::debug!(
                target: "ew_sim::spawn",
                faction = command.faction.as_str(),
                unit_type = command.unit_type.as_str(),
                cost = stats.cost,
                available = pools.get(command.faction),
                "spawn.rejected_funds"
            );
            return 0;
        }
    }

    let home_x = config
        .map
        .from_home(command.faction, config.spawn.home_inset);
    let home_y = config.map.ideal_y(command.lane, home_x);
    let jitter = config.spawn.jitter;

    let mut created = 0;
    for _ in 0..stats.squad_size {
        let (jx, jy) = {
            let mut rng = world.resource_mut::<SimRng>();
            if jitter > 0.0 {
                (
                    rng.0.gen_range(-0.5f32..0.5) * jitter,
                    rng.0.gen_range(-0.5f32..0.5) * jitter,
                )
            } else {
                (0.0, 0.0)
            }
        };
        let id = world.resource_mut::<NextIds>().next_unit();
        world.spawn(unit_bundle(
            &config,
            id,
            command.faction,
            command.unit_type,
            command.lane,
            home_x + jx,
            home_y + jy,
        ));
        created += 1;
    }

    tracing::debug!(
        target: "ew_sim::spawn",
        faction = command.faction.as_str(),
        unit_type = command.unit_type.as_str(),
        lane = command.lane,
        count = created,
        "spawn.squad"
    );
    created
}

/// Place a single unit at an exact position, free of charge.
pub fn spawn_unit_at(
    world: &mut World,
    faction: Faction,
    unit_type: UnitType,
    lane: usize,
    x: f32,
    y: f32,
) -> u32 {
    let config = world.resource::<SimConfig>().clone();
    let id = world.resource_mut::<NextIds>().next_unit();
    world.spawn(unit_bundle(&config, id, faction, unit_type, lane, x, y));
    id
}

/// Build the component bundle for a unit from its role's baseline stats.
pub fn unit_bundle(
    config: &SimConfig,
    id: u32,
    faction: Faction,
    unit_type: UnitType,
    lane: usize,
    x: f32,
    y: f32,
) -> UnitBundle {
    let stats = config.stats(unit_type);
    let flags = if unit_type.is_strongpoint() || stats.speed <= 0.0 {
        UnitFlags::fixed()
    } else {
        UnitFlags::mobile()
    };
    UnitBundle {
        id: UnitId(id),
        faction,
        unit_type,
        lane: Lane(lane),
        position: Position::new(x, y),
        velocity: Velocity::default(),
        body: Body::new(stats.radius, stats.mass),
        health: Health::new(stats.hp),
        cooldown: AttackCooldown::default(),
        combat: CombatState {
            current_damage: stats.damage,
            attacking: false,
        },
        flags,
        lane_switch: LaneSwitch::default(),
    }
}

/// Exclusive system draining the spawn queue at the tick boundary.
pub fn apply_spawn_queue_system(world: &mut World) {
    let commands = std::mem::take(&mut world.resource_mut::<SpawnQueue>().0);
    for command in commands {
        execute_spawn(world, command);
    }
}

/// System that removes dead units and collected wreckage at tick end.
pub fn compact_system(
    mut commands: Commands,
    units: Query<(Entity, &UnitFlags)>,
    wreckage: Query<(Entity, &Wreckage)>,
) {
    for (entity, flags) in units.iter() {
        if flags.dead {
            commands.entity(entity).despawn();
        }
    }
    for (entity, wreck) in wreckage.iter() {
        if wreck.collected {
            commands.entity(entity).despawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_world(config: SimConfig) -> World {
        let mut world = World::new();
        world.insert_resource(ResourcePools::from_config(&config));
        world.insert_resource(config);
        world.insert_resource(NextIds::default());
        world.insert_resource(SimRng::from_seed(Some(3)));
        world.insert_resource(SpawnQueue::default());
        world
    }

    fn unit_count(world: &mut World) -> usize {
        world.query::<&UnitId>().iter(world).count()
    }

    #[test]
    fn test_command_validation() {
        let config = SimConfig::default();
        assert!(SpawnCommand::new(&config, Faction::Player, UnitType::Shield, 2).is_ok());
        assert_eq!(
            SpawnCommand::new(&config, Faction::Player, UnitType::Shield, 3),
            Err(CommandError::LaneOutOfRange { lane: 3, lane_count: 3 })
        );
        assert_eq!(
            SpawnCommand::new(&config, Faction::Enemy, UnitType::Strongpoint, 0),
            Err(CommandError::NotSquadType(UnitType::Strongpoint))
        );
    }

    #[test]
    fn test_player_spawn_deducts_cost_and_creates_squad() {
        let config = SimConfig::default();
        let mut world = test_world(config.clone());
        let cmd = SpawnCommand::new(&config, Faction::Player, UnitType::Crossbow, 1).unwrap();

        let created = execute_spawn(&mut world, cmd);

        assert_eq!(created, 4);
        assert_eq!(unit_count(&mut world), 4);
        assert_eq!(world.resource::<ResourcePools>().player, 800.0 - 150.0);

        // Jitter stays within half the jitter box around the home point.
        let home_y = config.map.lane_center_y(1);
        let mut q = world.query::<(&Position, &Lane)>();
        for (pos, lane) in q.iter(&world) {
            assert_eq!(lane.0, 1);
            assert!((pos.x - 40.0).abs() <= 15.0);
            assert!((pos.y - home_y).abs() <= 15.0);
        }
    }

    #[test]
    fn test_insufficient_funds_is_noop() {
        let mut config = SimConfig::default();
        config.economy.player_start = 150.0;
        let mut world = test_world(config.clone());
        let cmd = SpawnCommand::new(&config, Faction::Player, UnitType::Cavalry, 0).unwrap();

        assert_eq!(execute_spawn(&mut world, cmd), 0);
        assert_eq!(unit_count(&mut world), 0);
        assert_eq!(world.resource::<ResourcePools>().player, 150.0);
    }

    #[test]
    fn test_enemy_spawn_is_free_and_mirrored() {
        let config = SimConfig::default();
        let mut world = test_world(config.clone());
        let cmd = SpawnCommand::new(&config, Faction::Enemy, UnitType::Cavalry, 2).unwrap();

        assert_eq!(execute_spawn(&mut world, cmd), 2);
        assert_eq!(world.resource::<ResourcePools>().enemy, 0.0);
        let mut q = world.query::<&Position>();
        for pos in q.iter(&world) {
            assert!((pos.x - 1160.0).abs() <= 15.0);
        }
    }

    #[test]
    fn test_queue_drained_at_boundary() {
        let config = SimConfig::default();
        let mut world = test_world(config.clone());
        world
            .resource_mut::<SpawnQueue>()
            .push(SpawnCommand::new(&config, Faction::Enemy, UnitType::Shield, 0).unwrap());

        let mut schedule = Schedule::default();
        schedule.add_systems(apply_spawn_queue_system);
        schedule.run(&mut world);

        assert!(world.resource::<SpawnQueue>().is_empty());
        assert_eq!(unit_count(&mut world), 3);
    }

    #[test]
    fn test_compaction_removes_dead_and_collected() {
        let config = SimConfig::default();
        let mut world = test_world(config.clone());
        let alive = spawn_unit_at(&mut world, Faction::Player, UnitType::Shield, 0, 100.0, 100.0);
        spawn_unit_at(&mut world, Faction::Enemy, UnitType::Shield, 0, 200.0, 100.0);
        {
            let mut q = world.query::<(&UnitId, &mut UnitFlags)>();
            for (id, mut flags) in q.iter_mut(&mut world) {
                if id.0 != alive {
                    flags.dead = true;
                }
            }
        }
        world.spawn(WreckageBundle::new(0, 1.0, 1.0, 10.0, UnitType::Shield, 10.0, 20.0));
        let mut collected = WreckageBundle::new(1, 2.0, 2.0, 10.0, UnitType::Shield, 10.0, 20.0);
        collected.wreckage.collected = true;
        world.spawn(collected);

        let mut schedule = Schedule::default();
        schedule.add_systems(compact_system);
        schedule.run(&mut world);

        let ids: Vec<u32> = world.query::<&UnitId>().iter(&world).map(|id| id.0).collect();
        assert_eq!(ids, vec![alive]);
        let wrecks: Vec<u32> = world.query::<&WreckageId>().iter(&world).map(|id| id.0).collect();
        assert_eq!(wrecks, vec![0]);
    }
}
