//! Network zones - supply corridors between linked allied strongpoints.
//!
//! Zones are rebuilt from scratch every tick from the strongpoints that are
//! alive at the start of the tick. Membership is a pure function of the
//! current zone list and a unit's position, so losing an anchor removes the
//! buff on the very next tick. Later passes that move units call
//! [`NetworkZones::covers`] again at the new position.
//!
//! ## Parallel Feature
//!
//! With `--features parallel`, membership for all mobile units is evaluated
//! with rayon over a collected slice; writes are applied sequentially after.

use crate::components::*;
use crate::config::{LinkRule, NetworkConfig, SimConfig};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Which link rule produced a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneKind {
    /// Strongpoints on neighbouring lanes, aligned along the advance axis.
    Adjacency,
    /// Strongpoints within the maximum link distance of each other.
    Proximity,
}

/// Axis-aligned zone bounds. Membership is strict on every edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneRect {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl ZoneRect {
    /// Bounding box of two points grown by `margin` on each side.
    pub fn spanning(a: (f32, f32), b: (f32, f32), margin: f32) -> Self {
        Self {
            min_x: a.0.min(b.0) - margin,
            max_x: a.0.max(b.0) + margin,
            min_y: a.1.min(b.1) - margin,
            max_y: a.1.max(b.1) + margin,
        }
    }

    #[inline]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x > self.min_x && x < self.max_x && y > self.min_y && y < self.max_y
    }
}

/// One live corridor between two allied strongpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkZone {
    pub faction: Faction,
    pub kind: ZoneKind,
    /// Unit ids of the two anchoring strongpoints, lower id first.
    pub anchors: (u32, u32),
    pub rect: ZoneRect,
}

/// Zones computed for the current tick.
#[derive(Resource, Debug, Clone, Default)]
pub struct NetworkZones(pub Vec<NetworkZone>);

impl NetworkZones {
    /// Whether `(x, y)` lies inside any zone owned by `faction`.
    pub fn covers(&self, faction: Faction, x: f32, y: f32) -> bool {
        self.0
            .iter()
            .any(|zone| zone.faction == faction && zone.rect.contains(x, y))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Strongpoint eligible to anchor a zone.
#[derive(Debug, Clone, Copy)]
pub struct Anchor {
    pub id: u32,
    pub faction: Faction,
    pub x: f32,
    pub y: f32,
}

/// Decide whether two allied strongpoints link, and how.
pub fn link_kind(rule: &LinkRule, a: &Anchor, b: &Anchor) -> Option<ZoneKind> {
    match *rule {
        LinkRule::LaneAdjacency {
            min_lateral,
            max_lateral,
            alignment_tolerance,
        } => {
            let lateral = (a.y - b.y).abs();
            let along = (a.x - b.x).abs();
            (lateral > min_lateral && lateral < max_lateral && along < alignment_tolerance)
                .then_some(ZoneKind::Adjacency)
        }
        LinkRule::MaxDistance { max_link_distance } => {
            let dist = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
            (dist < max_link_distance).then_some(ZoneKind::Proximity)
        }
    }
}

/// Enumerate every same-faction anchor pair and keep the linked ones.
///
/// Anchors are visited in id order so the output order is stable.
pub fn evaluate_zones(anchors: &[Anchor], network: &NetworkConfig) -> Vec<NetworkZone> {
    let mut sorted: Vec<Anchor> = anchors.to_vec();
    sorted.sort_by_key(|a| a.id);

    let mut zones = Vec::new();
    for (i, a) in sorted.iter().enumerate() {
        for b in &sorted[i + 1..] {
            if a.faction != b.faction {
                continue;
            }
            if let Some(kind) = link_kind(&network.rule, a, b) {
                zones.push(NetworkZone {
                    faction: a.faction,
                    kind,
                    anchors: (a.id, b.id),
                    rect: ZoneRect::spanning((a.x, a.y), (b.x, b.y), network.zone_margin),
                });
            }
        }
    }
    zones
}

/// System that rebuilds the zone list and refreshes every unit's
/// `in_network` flag.
pub fn network_zone_system(
    config: Res<SimConfig>,
    mut zones: ResMut<NetworkZones>,
    mut units: Query<(Entity, &UnitId, &Faction, &UnitType, &Position, &mut UnitFlags)>,
) {
    let anchors: Vec<Anchor> = units
        .iter()
        .filter(|(_, _, _, unit_type, _, flags)| unit_type.is_strongpoint() && !flags.dead)
        .map(|(_, id, faction, _, pos, _)| Anchor {
            id: id.0,
            faction: *faction,
            x: pos.x,
            y: pos.y,
        })
        .collect();

    zones.0 = evaluate_zones(&anchors, &config.network);

    let members: Vec<(Entity, Faction, f32, f32, bool)> = units
        .iter()
        .map(|(entity, _, faction, _, pos, flags)| {
            (entity, *faction, pos.x, pos.y, flags.is_mobile_alive())
        })
        .collect();

    let zones = &*zones;
    let classify = |&(entity, faction, x, y, mobile): &(Entity, Faction, f32, f32, bool)| {
        (entity, mobile && zones.covers(faction, x, y))
    };

    #[cfg(feature = "parallel")]
    let membership: Vec<(Entity, bool)> = members.par_iter().map(classify).collect();
    #[cfg(not(feature = "parallel"))]
    let membership: Vec<(Entity, bool)> = members.iter().map(classify).collect();

    for (entity, in_network) in membership {
        if let Ok((_, _, _, _, _, mut flags)) = units.get_mut(entity) {
            flags.in_network = in_network;
        }
    }
}
