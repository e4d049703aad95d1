//! Economy - resource pools, wreckage spawning and recovery, passive income.

use crate::components::*;
use crate::config::{SimConfig, UnitStats};
use crate::store::{Intent, NextIds, TickIntents};
use bevy_ecs::prelude::*;

/// Per-faction currency.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct ResourcePools {
    pub player: f32,
    pub enemy: f32,
}

impl ResourcePools {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            player: config.economy.player_start,
            enemy: config.economy.enemy_start,
        }
    }

    pub fn get(&self, faction: Faction) -> f32 {
        match faction {
            Faction::Player => self.player,
            Faction::Enemy => self.enemy,
        }
    }

    fn slot(&mut self, faction: Faction) -> &mut f32 {
        match faction {
            Faction::Player => &mut self.player,
            Faction::Enemy => &mut self.enemy,
        }
    }

    pub fn credit(&mut self, faction: Faction, amount: f32) {
        *self.slot(faction) += amount;
    }

    /// Deduct `amount` if the pool covers it. Returns whether it did.
    pub fn try_spend(&mut self, faction: Faction, amount: f32) -> bool {
        let slot = self.slot(faction);
        if *slot < amount {
            return false;
        }
        *slot -= amount;
        true
    }
}

/// Running totals for the wreckage economy.
#[derive(Resource, Debug, Clone, Default)]
pub struct EconomyStats {
    pub wreckage_spawned: u32,
    pub wreckage_value_spawned: f32,
    /// Value recovered from wreckage, indexed by [`Faction::index`].
    pub recovered: [f32; 2],
    /// Mobile units lost, indexed by [`Faction::index`].
    pub units_lost: [u32; 2],
    pub strongpoints_lost: [u32; 2],
}

/// Value of the wreckage left by one unit of this role.
pub fn wreckage_value(stats: &UnitStats, recovery_fraction: f32) -> f32 {
    stats.unit_cost() * recovery_fraction
}

/// System that applies the intents emitted by the unit update pass.
pub fn apply_intents_system(
    mut commands: Commands,
    config: Res<SimConfig>,
    mut intents: ResMut<TickIntents>,
    mut ids: ResMut<NextIds>,
    mut pools: ResMut<ResourcePools>,
    mut stats: ResMut<EconomyStats>,
) {
    for intent in intents.0.drain(..) {
        match intent {
            Intent::SpawnWreckage {
                faction,
                origin,
                x,
                y,
                value,
            } => {
                let id = ids.next_wreckage();
                commands.spawn(WreckageBundle::new(
                    id,
                    x,
                    y,
                    value,
                    origin,
                    config.economy.wreckage_radius,
                    config.economy.wreckage_mass,
                ));
                stats.wreckage_spawned += 1;
                stats.wreckage_value_spawned += value;
                stats.units_lost[faction.index()] += 1;
            }
            Intent::Credit { faction, amount } => {
                pools.credit(faction, amount);
                stats.recovered[faction.index()] += amount;
                tracing::trace!(
                    target: "ew_sim::economy",
                    faction = faction.as_str(),
                    amount,
                    "economy.wreckage_recovered"
                );
            }
            Intent::StrongpointLost { faction, lane, id } => {
                stats.strongpoints_lost[faction.index()] += 1;
                tracing::info!(
                    target: "ew_sim::combat",
                    faction = faction.as_str(),
                    lane,
                    id,
                    "combat.strongpoint_destroyed"
                );
            }
        }
    }
}

/// System that pays the player's passive income.
pub fn economy_trickle_system(config: Res<SimConfig>, mut pools: ResMut<ResourcePools>) {
    pools.credit(Faction::Player, config.economy.player_trickle);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn economy_world() -> World {
        let config = SimConfig::default();
        let mut world = World::new();
        world.insert_resource(ResourcePools::from_config(&config));
        world.insert_resource(config);
        world.insert_resource(TickIntents::default());
        world.insert_resource(NextIds::default());
        world.insert_resource(EconomyStats::default());
        world
    }

    #[test]
    fn test_try_spend() {
        let mut pools = ResourcePools { player: 100.0, enemy: 0.0 };
        assert!(!pools.try_spend(Faction::Player, 150.0));
        assert_eq!(pools.player, 100.0);
        assert!(pools.try_spend(Faction::Player, 100.0));
        assert_eq!(pools.player, 0.0);
    }

    #[test]
    fn test_wreckage_value() {
        let config = SimConfig::default();
        let v = wreckage_value(config.stats(UnitType::Cavalry), config.economy.recovery_fraction);
        assert!((v - 70.0).abs() < 1e-4);
    }

    #[test]
    fn test_intents_spawn_wreckage_and_credit() {
        let mut world = economy_world();
        {
            let mut intents = world.resource_mut::<TickIntents>();
            intents.push(Intent::SpawnWreckage {
                faction: Faction::Enemy,
                origin: UnitType::Shield,
                x: 500.0,
                y: 400.0,
                value: 23.0,
            });
            intents.push(Intent::Credit {
                faction: Faction::Enemy,
                amount: 12.5,
            });
        }

        let mut schedule = Schedule::default();
        schedule.add_systems(apply_intents_system);
        schedule.run(&mut world);

        let mut q = world.query::<(&Position, &Wreckage, &Body)>();
        let (pos, wreck, body) = q.single(&world);
        assert_eq!(*pos, Position::new(500.0, 400.0));
        assert_eq!(wreck.value, 23.0);
        assert!(!wreck.collected);
        assert_eq!(body.mass, 20.0);

        assert_eq!(world.resource::<ResourcePools>().enemy, 12.5);
        let stats = world.resource::<EconomyStats>();
        assert_eq!(stats.wreckage_spawned, 1);
        assert_eq!(stats.units_lost[Faction::Enemy.index()], 1);
        assert_eq!(stats.recovered[Faction::Enemy.index()], 12.5);
        assert!(world.resource::<TickIntents>().0.is_empty());
    }

    #[test]
    fn test_trickle_only_pays_player() {
        let mut world = economy_world();
        let mut schedule = Schedule::default();
        schedule.add_systems(economy_trickle_system);
        for _ in 0..10 {
            schedule.run(&mut world);
        }
        let pools = world.resource::<ResourcePools>();
        assert!((pools.player - 804.0).abs() < 1e-3);
        assert_eq!(pools.enemy, 0.0);
    }
}
