//! Physics - pairwise collision separation and lane/funnel confinement.
//!
//! ## Collision
//!
//! Overlapping circles are pushed apart along the contact normal. Each body
//! moves by the *other* body's share of the combined mass, so the heavier
//! party yields less. Static bodies are treated as infinitely heavy and never
//! move. Pairs are resolved sequentially in ascending id order
//! (`(lower, higher)`), which both broad phases reproduce exactly.
//!
//! ## Complexity
//!
//! The brute-force pass is O(n²) over live units plus O(n × w) for
//! unit/wreckage pairs. `BroadPhase::Grid` narrows unit pairs to
//! neighbouring cells; candidates are computed from start-of-pass positions.

use crate::components::*;
use crate::config::{BroadPhase, SimConfig};
use crate::spatial::SpatialGrid;
use crate::systems::network::NetworkZones;
use bevy_ecs::prelude::*;
use std::f32::consts::TAU;

/// Distances below this are treated as coincident.
const COINCIDENT_EPSILON: f32 = 1e-4;

/// Collision view of one body, gathered once per pass.
#[derive(Debug, Clone, Copy)]
pub struct Collider {
    pub id: u32,
    pub faction: Option<Faction>,
    pub is_static: bool,
    pub is_strongpoint: bool,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub mass: f32,
}

/// Deterministic unit normal for a coincident pair.
pub fn fallback_normal(a: u32, b: u32) -> (f32, f32) {
    let seed = a.wrapping_mul(73_856_093) ^ b.wrapping_mul(19_349_663);
    let angle = (seed % 3600) as f32 / 3600.0 * TAU;
    (angle.cos(), angle.sin())
}

/// Whether the pair is exempt from collision entirely.
#[inline]
fn ghosted(a: &Collider, b: &Collider) -> bool {
    if a.is_static && b.is_static {
        return true;
    }
    a.faction.is_some()
        && a.faction == b.faction
        && (a.is_strongpoint || b.is_strongpoint)
}

/// Separate one overlapping pair in place. Returns whether they overlapped.
///
/// `a_id`/`b_id` seed the fallback normal when the centres coincide.
pub fn separate(a: &mut Collider, b: &mut Collider, a_id: u32, b_id: u32) -> bool {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let dist = (dx * dx + dy * dy).sqrt();
    let min_dist = a.radius + b.radius;
    if dist >= min_dist {
        return false;
    }

    let (nx, ny) = if dist < COINCIDENT_EPSILON {
        fallback_normal(a_id, b_id)
    } else {
        (dx / dist, dy / dist)
    };
    let overlap = min_dist - dist;

    let (share_a, share_b) = match (a.is_static, b.is_static) {
        (true, true) => (0.0, 0.0),
        (true, false) => (0.0, 1.0),
        (false, true) => (1.0, 0.0),
        (false, false) => {
            let total = a.mass + b.mass;
            if total <= 0.0 {
                (0.5, 0.5)
            } else {
                (b.mass / total, a.mass / total)
            }
        }
    };

    a.x -= nx * overlap * share_a;
    a.y -= ny * overlap * share_a;
    b.x += nx * overlap * share_b;
    b.y += ny * overlap * share_b;
    true
}

/// Unit pairs to test, in resolution order.
fn unit_pairs(
    colliders: &[Collider],
    broad_phase: BroadPhase,
    grid: &mut SpatialGrid,
    reach: f32,
) -> Vec<(usize, usize)> {
    match broad_phase {
        BroadPhase::BruteForce => {
            let n = colliders.len();
            let mut pairs = Vec::with_capacity(n * n.saturating_sub(1) / 2);
            for i in 0..n {
                for j in i + 1..n {
                    pairs.push((i, j));
                }
            }
            pairs
        }
        BroadPhase::Grid { cell_size } => {
            grid.cell_size = cell_size.max(reach);
            grid.clear();
            for (index, c) in colliders.iter().enumerate() {
                grid.insert(index, c.x, c.y);
            }
            grid.candidate_pairs()
        }
    }
}

/// System that resolves unit/unit and unit/wreckage overlaps.
pub fn collision_system(
    config: Res<SimConfig>,
    mut grid: ResMut<SpatialGrid>,
    mut units: Query<(&UnitId, &Faction, &UnitType, &mut Position, &Body, &UnitFlags)>,
    mut wrecks: Query<(&WreckageId, &mut Position, &Body, &Wreckage), Without<UnitId>>,
) {
    let mut bodies: Vec<Collider> = units
        .iter()
        .filter(|(_, _, _, _, _, flags)| !flags.dead)
        .map(|(id, faction, unit_type, pos, body, flags)| Collider {
            id: id.0,
            faction: Some(*faction),
            is_static: flags.is_static,
            is_strongpoint: unit_type.is_strongpoint(),
            x: pos.x,
            y: pos.y,
            radius: body.radius,
            mass: body.mass,
        })
        .collect();
    bodies.sort_by_key(|c| c.id);

    let mut debris: Vec<Collider> = wrecks
        .iter()
        .filter(|(_, _, _, wreck)| !wreck.collected)
        .map(|(id, pos, body, _)| Collider {
            id: id.0,
            faction: None,
            is_static: false,
            is_strongpoint: false,
            x: pos.x,
            y: pos.y,
            radius: body.radius,
            mass: body.mass,
        })
        .collect();
    debris.sort_by_key(|c| c.id);

    let reach = 2.0 * config.max_body_radius();
    for (i, j) in unit_pairs(&bodies, config.movement.broad_phase, &mut grid, reach) {
        let (head, tail) = bodies.split_at_mut(j);
        let (a, b) = (&mut head[i], &mut tail[0]);
        if ghosted(a, b) {
            continue;
        }
        let (a_id, b_id) = (a.id, b.id);
        separate(a, b, a_id, b_id);
    }

    // Wreckage blocks movement but is itself pushed by mass share. The id
    // seed is offset so a unit and a wreckage with equal ids still get a
    // distinct fallback direction.
    for unit in bodies.iter_mut() {
        for wreck in debris.iter_mut() {
            let (u_id, w_id) = (unit.id, wreck.id.wrapping_add(0x8000_0000));
            separate(unit, wreck, u_id, w_id);
        }
    }

    for (id, _, _, mut pos, _, flags) in units.iter_mut() {
        if flags.dead || flags.is_static {
            continue;
        }
        if let Ok(idx) = bodies.binary_search_by_key(&id.0, |c| c.id) {
            pos.x = bodies[idx].x;
            pos.y = bodies[idx].y;
        }
    }
    for (id, mut pos, _, wreck) in wrecks.iter_mut() {
        if wreck.collected {
            continue;
        }
        if let Ok(idx) = debris.binary_search_by_key(&id.0, |c| c.id) {
            pos.x = debris[idx].x;
            pos.y = debris[idx].y;
        }
    }
}

/// System that keeps mobile units inside their lane's funnel.
///
/// Buffed or lane-switching units may drift laterally: they re-derive their
/// lane from their position (while buffed) and are only nudged back by a
/// fraction of the overflow. Everyone else is clamped to the bound and
/// bounced.
///
/// Membership is re-read from the zone list at the post-collision position.
pub fn confinement_system(
    config: Res<SimConfig>,
    zones: Res<NetworkZones>,
    mut units: Query<(
        &Faction,
        &mut Lane,
        &mut Position,
        &mut Velocity,
        &mut UnitFlags,
        &LaneSwitch,
    )>,
) {
    let map = &config.map;
    let movement = &config.movement;

    for (faction, mut lane, mut pos, mut vel, mut flags, switch) in units.iter_mut() {
        if !flags.is_mobile_alive() {
            continue;
        }

        pos.x = pos.x.clamp(0.0, map.width);
        flags.in_network = zones.covers(*faction, pos.x, pos.y);

        if flags.in_network {
            lane.0 = map.lane_at(pos.y);
        }

        let ideal = map.ideal_y(lane.0, pos.x);
        let spread = map.lateral_spread(pos.x);
        let deviation = pos.y - ideal;
        if deviation.abs() <= spread {
            continue;
        }

        let overflow = deviation.abs() - spread;
        let sign = deviation.signum();
        if flags.in_network || switch.in_transition() {
            pos.y -= sign * overflow * movement.relaxed_confinement;
        } else {
            pos.y = ideal + sign * spread;
            vel.vy *= -movement.wall_bounce;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::network::{NetworkZone, ZoneKind, ZoneRect};

    fn body(id: u32, x: f32, y: f32, radius: f32, mass: f32) -> Collider {
        Collider {
            id,
            faction: Some(Faction::Player),
            is_static: false,
            is_strongpoint: false,
            x,
            y,
            radius,
            mass,
        }
    }

    #[test]
    fn test_separation_follows_mass_share() {
        let mut a = body(0, 0.0, 0.0, 10.0, 30.0);
        let mut b = body(1, 15.0, 0.0, 10.0, 10.0);
        assert!(separate(&mut a, &mut b, 0, 1));

        // Overlap 5: the light body takes 3/4 of it.
        assert!((a.x - -1.25).abs() < 1e-4);
        assert!((b.x - 18.75).abs() < 1e-4);
        let dist = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
        assert!(dist >= 20.0 - 1e-4);
    }

    #[test]
    fn test_static_body_never_moves() {
        let mut wall = body(0, 0.0, 0.0, 45.0, 9999.0);
        wall.is_static = true;
        let mut unit = body(1, 50.0, 0.0, 10.0, 10.0);
        separate(&mut wall, &mut unit, 0, 1);
        assert_eq!((wall.x, wall.y), (0.0, 0.0));
        assert!((unit.x - 55.0).abs() < 1e-4);
    }

    #[test]
    fn test_coincident_bodies_get_fallback_normal() {
        let mut a = body(3, 10.0, 10.0, 10.0, 10.0);
        let mut b = body(7, 10.0, 10.0, 10.0, 10.0);
        assert!(separate(&mut a, &mut b, 3, 7));
        assert!(a.x.is_finite() && a.y.is_finite());
        let dist = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
        assert!((dist - 20.0).abs() < 1e-3);

        let (nx, ny) = fallback_normal(3, 7);
        assert!(((nx * nx + ny * ny) - 1.0).abs() < 1e-5);
        assert_eq!(fallback_normal(3, 7), fallback_normal(3, 7));
    }

    #[test]
    fn test_ghosting_rules() {
        let mut tower = body(0, 0.0, 0.0, 45.0, 9999.0);
        tower.is_static = true;
        tower.is_strongpoint = true;
        let friend = body(1, 10.0, 0.0, 10.0, 10.0);
        let mut foe = body(2, 10.0, 0.0, 10.0, 10.0);
        foe.faction = Some(Faction::Enemy);
        let mut other_tower = tower;
        other_tower.faction = Some(Faction::Enemy);

        assert!(ghosted(&tower, &friend));
        assert!(!ghosted(&tower, &foe));
        assert!(ghosted(&tower, &other_tower));
        assert!(!ghosted(&friend, &foe));
    }

    fn collision_world(broad_phase: BroadPhase) -> World {
        let mut config = SimConfig::default();
        config.movement.broad_phase = broad_phase;
        let mut world = World::new();
        world.insert_resource(config);
        world.insert_resource(SpatialGrid::default());
        world
    }

    fn spawn_unit(world: &mut World, id: u32, faction: Faction, x: f32, y: f32) -> Entity {
        world
            .spawn(UnitBundle {
                id: UnitId(id),
                faction,
                position: Position::new(x, y),
                body: Body::new(12.0, 5.0),
                ..Default::default()
            })
            .id()
    }

    fn run_collisions(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(collision_system);
        schedule.run(world);
    }

    #[test]
    fn test_collision_system_separates_units() {
        let mut world = collision_world(BroadPhase::BruteForce);
        let a = spawn_unit(&mut world, 0, Faction::Player, 500.0, 400.0);
        let b = spawn_unit(&mut world, 1, Faction::Enemy, 510.0, 400.0);
        run_collisions(&mut world);

        let pa = *world.get::<Position>(a).unwrap();
        let pb = *world.get::<Position>(b).unwrap();
        assert!(pa.distance_to(&pb) >= 24.0 - 1e-3);
        assert!((pa.x - 493.0).abs() < 1e-3);
        assert!((pb.x - 517.0).abs() < 1e-3);
    }

    #[test]
    fn test_dead_units_do_not_collide() {
        let mut world = collision_world(BroadPhase::BruteForce);
        let a = spawn_unit(&mut world, 0, Faction::Player, 500.0, 400.0);
        let b = spawn_unit(&mut world, 1, Faction::Enemy, 505.0, 400.0);
        world.get_mut::<UnitFlags>(b).unwrap().dead = true;
        run_collisions(&mut world);
        assert_eq!(world.get::<Position>(a).unwrap().x, 500.0);
        assert_eq!(world.get::<Position>(b).unwrap().x, 505.0);
    }

    #[test]
    fn test_wreckage_is_pushed_by_mass_share() {
        let mut world = collision_world(BroadPhase::BruteForce);
        let unit = spawn_unit(&mut world, 0, Faction::Player, 500.0, 400.0);
        let wreck = world
            .spawn(WreckageBundle::new(0, 520.0, 400.0, 10.0, UnitType::Shield, 10.0, 20.0))
            .id();
        run_collisions(&mut world);

        // Overlap 2; unit mass 5 vs wreckage 20.
        let pu = *world.get::<Position>(unit).unwrap();
        let pw = *world.get::<Position>(wreck).unwrap();
        assert!((pu.x - 498.4).abs() < 1e-3);
        assert!((pw.x - 520.4).abs() < 1e-3);
    }

    #[test]
    fn test_grid_matches_brute_force() {
        let layout: Vec<(u32, Faction, f32, f32)> = (0..40)
            .map(|i| {
                let faction = if i % 2 == 0 { Faction::Player } else { Faction::Enemy };
                let x = 300.0 + (i % 8) as f32 * 17.0;
                let y = 200.0 + (i / 8) as f32 * 19.0;
                (i, faction, x, y)
            })
            .collect();

        let run = |broad_phase: BroadPhase| {
            let mut world = collision_world(broad_phase);
            let entities: Vec<Entity> = layout
                .iter()
                .map(|&(id, faction, x, y)| spawn_unit(&mut world, id, faction, x, y))
                .collect();
            run_collisions(&mut world);
            entities
                .iter()
                .map(|&e| *world.get::<Position>(e).unwrap())
                .collect::<Vec<_>>()
        };

        let brute = run(BroadPhase::BruteForce);
        let grid = run(BroadPhase::Grid { cell_size: 200.0 });
        assert_eq!(brute, grid);
    }

    #[test]
    fn test_confinement_clamps_and_bounces() {
        let mut world = World::new();
        let config = SimConfig::default();
        let center = config.map.lane_center_y(1);
        let spread = config.map.lateral_spread(600.0);
        world.insert_resource(config);
        world.insert_resource(NetworkZones::default());

        let unit = world
            .spawn(UnitBundle {
                lane: Lane(1),
                position: Position::new(600.0, center + spread + 30.0),
                velocity: Velocity::new(0.0, 2.0),
                ..Default::default()
            })
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(confinement_system);
        schedule.run(&mut world);

        let pos = world.get::<Position>(unit).unwrap();
        assert!((pos.y - (center + spread)).abs() < 1e-3);
        assert!((world.get::<Velocity>(unit).unwrap().vy - -1.0).abs() < 1e-5);
    }

    #[test]
    fn test_buffed_units_are_nudged_and_switch_lanes() {
        let mut world = World::new();
        let config = SimConfig::default();
        let lane_h = config.map.lane_height();
        world.insert_resource(config);

        // Drifted into lane 0's band while inside a player zone.
        let y = lane_h - 15.0;
        world.insert_resource(NetworkZones(vec![NetworkZone {
            faction: Faction::Player,
            kind: ZoneKind::Adjacency,
            anchors: (90, 91),
            rect: ZoneRect::spanning((600.0, y - 100.0), (600.0, y + 100.0), 20.0),
        }]));
        let unit = world
            .spawn(UnitBundle {
                lane: Lane(1),
                position: Position::new(600.0, y),
                ..Default::default()
            })
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(confinement_system);
        schedule.run(&mut world);

        assert!(world.get::<UnitFlags>(unit).unwrap().in_network);
        assert_eq!(world.get::<Lane>(unit).unwrap().0, 0);
        let pos = world.get::<Position>(unit).unwrap();
        // Within lane 0's spread, so untouched.
        assert_eq!(pos.y, y);
    }
}
