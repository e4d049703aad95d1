//! Combat system - the per-unit update pass.
//!
//! Each live unit, in ascending id order: ticks its timers, considers a
//! flanking lane switch, refreshes its attrition-scaled damage, picks the
//! nearest living enemy, and either fights (strike on cooldown expiry, damp
//! residual velocity) or advances along its lane. Mobile units then collect
//! any wreckage they touch.
//!
//! Network membership is re-read from the tick's zone list at the unit's
//! position when its turn starts, and again after it moves, so the flag a
//! snapshot reports always matches the published zones.
//!
//! ## Gather / Apply
//!
//! 1. **Gather** - copy every unit and every uncollected wreckage into flat
//!    records, sorted by id.
//! 2. **Update** - walk the records sequentially. Later units observe earlier
//!    units' results: a unit killed this pass is skipped, not yet removed.
//! 3. **Apply** - write the records back to their entities.
//!
//! Deaths, pickups and strongpoint losses are emitted as [`Intent`]s and
//! applied by the tick driver after this pass.

use crate::components::*;
use crate::config::SimConfig;
use crate::store::{Intent, TickIntents};
use crate::systems::ai::flank_lane;
use crate::systems::attrition::efficiency;
use crate::systems::economy::wreckage_value;
use crate::systems::movement::{advance, integrate, Advance};
use crate::systems::network::NetworkZones;
use bevy_ecs::prelude::*;

/// Flat per-unit record used during the update pass.
#[derive(Debug, Clone, Copy)]
pub struct UnitRecord {
    pub entity: Entity,
    pub id: u32,
    pub faction: Faction,
    pub unit_type: UnitType,
    pub lane: usize,
    pub pos: Position,
    pub vel: Velocity,
    pub radius: f32,
    pub health: Health,
    pub cooldown: AttackCooldown,
    pub combat: CombatState,
    pub flags: UnitFlags,
    pub switch: LaneSwitch,
}

#[derive(Debug, Clone, Copy)]
struct WreckRecord {
    entity: Entity,
    id: u32,
    pos: Position,
    radius: f32,
    value: f32,
    collected: bool,
}

/// Nearest living enemy of `me`, as `(index, distance)`.
///
/// Records are scanned in id order with a strict comparison, so equidistant
/// candidates resolve to the lowest id.
pub fn nearest_enemy(records: &[UnitRecord], me: &UnitRecord) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, other) in records.iter().enumerate() {
        if other.faction == me.faction || other.flags.dead {
            continue;
        }
        let dist = me.pos.distance_to(&other.pos);
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((idx, dist));
        }
    }
    best
}

/// Whether an alive strongpoint of `faction` stands on `lane`.
fn strongpoint_on_lane(records: &[UnitRecord], faction: Faction, lane: usize) -> bool {
    records.iter().any(|r| {
        r.faction == faction && r.unit_type.is_strongpoint() && !r.flags.dead && r.lane == lane
    })
}

/// Land one hit from `attacker` on `target`, emitting intents on a kill.
fn strike(
    config: &SimConfig,
    attacker: &UnitRecord,
    target: &mut UnitRecord,
    intents: &mut TickIntents,
) {
    let multiplier = config
        .matchups
        .multiplier(attacker.unit_type, target.unit_type);
    let damage = attacker.combat.current_damage * multiplier;
    target.health.damage(damage);

    if config.stats(attacker.unit_type).knockback && !target.flags.is_static {
        let dx = target.pos.x - attacker.pos.x;
        let dy = target.pos.y - attacker.pos.y;
        let angle = dy.atan2(dx);
        let impulse = config.combat.knockback_impulse;
        target.vel.vx += angle.cos() * impulse;
        target.vel.vy += angle.sin() * impulse;
    }

    if target.health.is_alive() {
        return;
    }

    target.flags.dead = true;
    tracing::debug!(
        target: "ew_sim::combat",
        victim = target.id,
        victim_type = target.unit_type.as_str(),
        killer = attacker.id,
        "combat.unit_killed"
    );

    if target.unit_type.is_strongpoint() {
        intents.push(Intent::StrongpointLost {
            faction: target.faction,
            lane: target.lane,
            id: target.id,
        });
    }
    if !target.flags.is_static {
        let value = wreckage_value(
            config.stats(target.unit_type),
            config.economy.recovery_fraction,
        );
        intents.push(Intent::SpawnWreckage {
            faction: target.faction,
            origin: target.unit_type,
            x: target.pos.x,
            y: target.pos.y,
            value,
        });
    }
}

/// Run one unit's update against the shared records.
fn update_unit(
    config: &SimConfig,
    zones: &NetworkZones,
    records: &mut [UnitRecord],
    wrecks: &mut [WreckRecord],
    index: usize,
    intents: &mut TickIntents,
) {
    let mut me = records[index];
    if me.flags.dead {
        return;
    }
    let stats = config.stats(me.unit_type);
    let mobile = !me.flags.is_static;

    me.cooldown.tick_down();
    if mobile {
        me.switch.cooldown = me.switch.cooldown.saturating_sub(1);
        me.switch.transition = me.switch.transition.saturating_sub(1);

        let opponent = me.faction.opponent();
        let target_lane = flank_lane(config, me.faction, me.lane, me.pos.x, &me.switch, |lane| {
            strongpoint_on_lane(records, opponent, lane)
        });
        if let Some(lane) = target_lane {
            tracing::debug!(
                target: "ew_sim::director",
                id = me.id,
                from = me.lane,
                to = lane,
                "director.flank"
            );
            me.lane = lane;
            me.switch.cooldown = config.flanking.cooldown_ticks;
            me.switch.transition = config.flanking.transition_ticks;
        }
    }

    me.flags.in_network = mobile && zones.covers(me.faction, me.pos.x, me.pos.y);

    let factor = efficiency(
        &config.map,
        &config.attrition,
        me.faction,
        me.pos.x,
        me.flags.is_static,
    );
    me.combat.current_damage = stats.damage * factor;

    let (speed_bonus, range_bonus) = if me.flags.in_network {
        (config.network.speed_bonus, config.network.range_bonus)
    } else {
        (1.0, 1.0)
    };

    let engaged = nearest_enemy(records, &me)
        .filter(|&(t, dist)| dist <= stats.range * range_bonus + records[t].radius);

    match engaged {
        Some((t, _)) => {
            me.combat.attacking = true;
            if me.cooldown.is_ready() {
                strike(config, &me, &mut records[t], intents);
                me.cooldown.reset(config.combat.attack_cooldown_ticks);
            }
            if mobile {
                me.vel.scale(config.combat.attack_damping);
                integrate(&mut me.pos, &me.vel);
            }
        }
        None => {
            me.combat.attacking = false;
            if mobile {
                let step = Advance {
                    faction: me.faction,
                    speed: stats.speed * speed_bonus,
                    ideal_y: config.map.ideal_y(me.lane, me.pos.x),
                    relaxed: me.flags.in_network || me.switch.in_transition(),
                };
                advance(&mut me.pos, &mut me.vel, &step, &config.movement);
            }
        }
    }

    if mobile {
        me.flags.in_network = zones.covers(me.faction, me.pos.x, me.pos.y);
    }

    if mobile {
        let slop = config.economy.collect_slop;
        for wreck in wrecks.iter_mut().filter(|w| !w.collected) {
            if me.pos.distance_to(&wreck.pos) < me.radius + wreck.radius + slop {
                wreck.collected = true;
                intents.push(Intent::Credit {
                    faction: me.faction,
                    amount: wreck.value,
                });
                tracing::trace!(
                    target: "ew_sim::economy",
                    collector = me.id,
                    wreckage = wreck.id,
                    "economy.wreckage_touched"
                );
            }
        }
    }

    records[index] = me;
}

/// System that runs the per-unit update pass.
pub fn unit_update_system(
    config: Res<SimConfig>,
    zones: Res<NetworkZones>,
    mut intents: ResMut<TickIntents>,
    mut units: Query<(
        Entity,
        &UnitId,
        &Faction,
        &UnitType,
        &mut Lane,
        &mut Position,
        &mut Velocity,
        &Body,
        &mut Health,
        &mut AttackCooldown,
        &mut CombatState,
        &mut UnitFlags,
        &mut LaneSwitch,
    )>,
    mut wreckage: Query<(Entity, &WreckageId, &Position, &Body, &mut Wreckage), Without<UnitId>>,
) {
    // Gather
    let mut records: Vec<UnitRecord> = units
        .iter()
        .map(
            |(entity, id, faction, unit_type, lane, pos, vel, body, health, cooldown, combat, flags, switch)| {
                UnitRecord {
                    entity,
                    id: id.0,
                    faction: *faction,
                    unit_type: *unit_type,
                    lane: lane.0,
                    pos: *pos,
                    vel: *vel,
                    radius: body.radius,
                    health: *health,
                    cooldown: *cooldown,
                    combat: *combat,
                    flags: *flags,
                    switch: *switch,
                }
            },
        )
        .collect();
    records.sort_by_key(|r| r.id);

    let mut wrecks: Vec<WreckRecord> = wreckage
        .iter()
        .filter(|(_, _, _, _, w)| !w.collected)
        .map(|(entity, id, pos, body, w)| WreckRecord {
            entity,
            id: id.0,
            pos: *pos,
            radius: body.radius,
            value: w.value,
            collected: false,
        })
        .collect();
    wrecks.sort_by_key(|w| w.id);

    // Update
    for index in 0..records.len() {
        update_unit(&config, &zones, &mut records, &mut wrecks, index, &mut intents);
    }

    // Apply
    for r in &records {
        let Ok((_, _, _, _, mut lane, mut pos, mut vel, _, mut health, mut cooldown, mut combat, mut flags, mut switch)) =
            units.get_mut(r.entity)
        else {
            continue;
        };
        lane.0 = r.lane;
        *pos = r.pos;
        *vel = r.vel;
        *health = r.health;
        *cooldown = r.cooldown;
        *combat = r.combat;
        *flags = r.flags;
        *switch = r.switch;
    }
    for w in wrecks.iter().filter(|w| w.collected) {
        if let Ok((_, _, _, _, mut wreck)) = wreckage.get_mut(w.entity) {
            wreck.collected = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::unit_bundle;
    use crate::systems::network::{NetworkZone, ZoneKind, ZoneRect};

    fn combat_world(config: SimConfig) -> World {
        let mut world = World::new();
        world.insert_resource(config);
        world.insert_resource(TickIntents::default());
        world.insert_resource(NetworkZones::default());
        world
    }

    fn spawn(
        world: &mut World,
        id: u32,
        faction: Faction,
        unit_type: UnitType,
        x: f32,
        y: f32,
    ) -> Entity {
        let config = world.resource::<SimConfig>().clone();
        let lane = config.map.lane_at(y);
        world.spawn(unit_bundle(&config, id, faction, unit_type, lane, x, y)).id()
    }

    fn run_update(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(unit_update_system);
        schedule.run(world);
    }

    fn record(id: u32, faction: Faction, x: f32, y: f32) -> UnitRecord {
        UnitRecord {
            entity: Entity::PLACEHOLDER,
            id,
            faction,
            unit_type: UnitType::Shield,
            lane: 0,
            pos: Position::new(x, y),
            vel: Velocity::default(),
            radius: 10.0,
            health: Health::new(100.0),
            cooldown: AttackCooldown::default(),
            combat: CombatState::default(),
            flags: UnitFlags::mobile(),
            switch: LaneSwitch::default(),
        }
    }

    #[test]
    fn test_nearest_enemy_ties_go_to_lowest_id() {
        let me = record(0, Faction::Player, 100.0, 100.0);
        let records = vec![
            me,
            record(1, Faction::Player, 101.0, 100.0),
            record(2, Faction::Enemy, 150.0, 100.0),
            record(3, Faction::Enemy, 50.0, 100.0),
            record(4, Faction::Enemy, 300.0, 100.0),
        ];
        assert_eq!(nearest_enemy(&records, &me).map(|(i, _)| records[i].id), Some(2));

        let mut dead_first = records.clone();
        dead_first[2].flags.dead = true;
        assert_eq!(nearest_enemy(&dead_first, &me).map(|(i, _)| dead_first[i].id), Some(3));
    }

    #[test]
    fn test_crossbow_hits_shield_for_sixty() {
        let mut world = combat_world(SimConfig::default());
        // The crossbow stands on its own home edge: attrition factor 1.0.
        spawn(&mut world, 0, Faction::Player, UnitType::Crossbow, 0.0, 400.0);
        let shield = spawn(&mut world, 1, Faction::Enemy, UnitType::Shield, 200.0, 400.0);
        run_update(&mut world);

        let health = world.get::<Health>(shield).unwrap();
        assert!((health.current - 390.0).abs() < 1e-3);
    }

    #[test]
    fn test_cooldown_gates_strikes() {
        let mut world = combat_world(SimConfig::default());
        let bow = spawn(&mut world, 0, Faction::Player, UnitType::Crossbow, 0.0, 400.0);
        let shield = spawn(&mut world, 1, Faction::Enemy, UnitType::Shield, 200.0, 400.0);
        // Keep the shield from closing in or hitting back.
        world.get_mut::<UnitFlags>(shield).unwrap().is_static = true;

        for _ in 0..60 {
            run_update(&mut world);
        }
        // Hit on the first tick, next one due on tick 61.
        assert!((world.get::<Health>(shield).unwrap().current - 390.0).abs() < 1e-3);
        assert_eq!(world.get::<AttackCooldown>(bow).unwrap().0, 1);
        run_update(&mut world);
        assert!((world.get::<Health>(shield).unwrap().current - 330.0).abs() < 1e-3);
    }

    #[test]
    fn test_kill_emits_wreckage_intent() {
        let mut world = combat_world(SimConfig::default());
        spawn(&mut world, 0, Faction::Player, UnitType::Crossbow, 0.0, 400.0);
        let victim = spawn(&mut world, 1, Faction::Enemy, UnitType::Crossbow, 150.0, 400.0);
        world.get_mut::<Health>(victim).unwrap().current = 10.0;
        run_update(&mut world);

        assert!(world.get::<UnitFlags>(victim).unwrap().dead);
        let intents = &world.resource::<TickIntents>().0;
        assert_eq!(intents.len(), 1);
        match intents[0] {
            Intent::SpawnWreckage { faction, origin, value, .. } => {
                assert_eq!(faction, Faction::Enemy);
                assert_eq!(origin, UnitType::Crossbow);
                assert!((value - 150.0 / 4.0 * 0.7).abs() < 1e-4);
            }
            other => panic!("unexpected intent {other:?}"),
        }
    }

    #[test]
    fn test_strongpoint_kill_reports_loss_without_wreckage() {
        let mut world = combat_world(SimConfig::default());
        spawn(&mut world, 0, Faction::Player, UnitType::Crossbow, 0.0, 400.0);
        let tower = spawn(&mut world, 1, Faction::Enemy, UnitType::Strongpoint, 150.0, 400.0);
        world.get_mut::<Health>(tower).unwrap().current = 1.0;
        run_update(&mut world);

        let intents = &world.resource::<TickIntents>().0;
        assert_eq!(
            intents.as_slice(),
            &[Intent::StrongpointLost {
                faction: Faction::Enemy,
                lane: 1,
                id: 1
            }]
        );
    }

    #[test]
    fn test_cavalry_knocks_back_mobile_targets() {
        let mut world = combat_world(SimConfig::default());
        spawn(&mut world, 0, Faction::Player, UnitType::Cavalry, 0.0, 400.0);
        let target = spawn(&mut world, 1, Faction::Enemy, UnitType::Shield, 40.0, 400.0);
        run_update(&mut world);

        // Pushed +x by 5, then the target's own turn damps and integrates.
        let vel = world.get::<Velocity>(target).unwrap();
        assert!((vel.vx - 4.0).abs() < 1e-4);
        assert!(world.get::<Position>(target).unwrap().x > 40.0);
    }

    #[test]
    fn test_unengaged_unit_advances() {
        let mut world = combat_world(SimConfig::default());
        let unit = spawn(&mut world, 0, Faction::Player, UnitType::Cavalry, 100.0, 400.0);
        run_update(&mut world);
        let pos = world.get::<Position>(unit).unwrap();
        assert!(pos.x > 100.0);
        assert!(!world.get::<CombatState>(unit).unwrap().attacking);
    }

    #[test]
    fn test_network_bonus_extends_range() {
        let mut world = combat_world(SimConfig::default());
        // Crossbow range 220; target radius 18 puts the plain reach at 238.
        let bow = spawn(&mut world, 0, Faction::Player, UnitType::Crossbow, 0.0, 400.0);
        let shield = spawn(&mut world, 1, Faction::Enemy, UnitType::Shield, 260.0, 400.0);
        world.get_mut::<UnitFlags>(shield).unwrap().is_static = true;
        run_update(&mut world);
        assert_eq!(world.get::<Health>(shield).unwrap().current, 450.0);

        world.get_mut::<Position>(bow).unwrap().x = 0.0;
        world.insert_resource(NetworkZones(vec![NetworkZone {
            faction: Faction::Player,
            kind: ZoneKind::Adjacency,
            anchors: (90, 91),
            rect: ZoneRect::spanning((0.0, 300.0), (0.0, 500.0), 20.0),
        }]));
        run_update(&mut world);
        assert!(world.get::<UnitFlags>(bow).unwrap().in_network);
        assert!(world.get::<Health>(shield).unwrap().current < 450.0);
    }

    #[test]
    fn test_mobile_unit_collects_touching_wreckage() {
        let mut world = combat_world(SimConfig::default());
        let unit = spawn(&mut world, 0, Faction::Enemy, UnitType::Shield, 600.0, 400.0);
        world.get_mut::<Velocity>(unit).unwrap().vx = 0.0;
        let wreck = world
            .spawn(WreckageBundle::new(0, 600.0 - 27.5, 400.0, 42.0, UnitType::Shield, 10.0, 20.0))
            .id();
        run_update(&mut world);

        assert!(world.get::<Wreckage>(wreck).unwrap().collected);
        let intents = &world.resource::<TickIntents>().0;
        assert_eq!(
            intents.as_slice(),
            &[Intent::Credit {
                faction: Faction::Enemy,
                amount: 42.0
            }]
        );
    }

    #[test]
    fn test_first_toucher_takes_shared_wreckage() {
        let mut world = combat_world(SimConfig::default());
        // Spawned out of id order; the pass still visits id 0 first.
        let late = spawn(&mut world, 1, Faction::Player, UnitType::Shield, 573.0, 400.0);
        let early = spawn(&mut world, 0, Faction::Enemy, UnitType::Shield, 627.0, 400.0);
        world.get_mut::<Velocity>(late).unwrap().vx = 0.0;
        world.get_mut::<Velocity>(early).unwrap().vx = 0.0;
        let wreck = world
            .spawn(WreckageBundle::new(0, 600.0, 400.0, 42.0, UnitType::Shield, 10.0, 20.0))
            .id();
        run_update(&mut world);

        assert!(world.get::<Wreckage>(wreck).unwrap().collected);
        let credits: Vec<Intent> = world
            .resource::<TickIntents>()
            .0
            .iter()
            .copied()
            .filter(|i| matches!(i, Intent::Credit { .. }))
            .collect();
        assert_eq!(
            credits,
            vec![Intent::Credit {
                faction: Faction::Enemy,
                amount: 42.0
            }]
        );

        // Already collected: a second pass credits nobody.
        world.resource_mut::<TickIntents>().0.clear();
        run_update(&mut world);
        assert!(world.resource::<TickIntents>().0.is_empty());
    }

    #[test]
    fn test_enemy_flanks_to_lane_with_strongpoint() {
        let mut world = combat_world(SimConfig::default());
        let config = world.resource::<SimConfig>().clone();
        let lane2_y = config.map.lane_center_y(2);
        // Player strongpoint only on lane 2, out of reach.
        spawn(&mut world, 0, Faction::Player, UnitType::Strongpoint, 100.0, lane2_y);
        let lane1_y = config.map.lane_center_y(1);
        let raider = spawn(&mut world, 1, Faction::Enemy, UnitType::Shield, 290.0, lane1_y);
        run_update(&mut world);

        assert_eq!(world.get::<Lane>(raider).unwrap().0, 2);
        let switch = world.get::<LaneSwitch>(raider).unwrap();
        assert_eq!(switch.cooldown, 240);
        assert_eq!(switch.transition, 90);
    }
}
