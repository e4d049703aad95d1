//! Render Bridge
//!
//! Converts a [`Snapshot`] into a flat `Vec<f32>` that a renderer can consume
//! without parsing JSON. The renderer reads; it never writes back.
//!
//! # Buffer Layout (Version 1.0)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ HEADER (HEADER_SIZE = 3)                                        │
//! │   [0] unit_count   [1] wreckage_count   [2] zone_count          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ UNITS (unit_count × UNIT_STRIDE)                                │
//! │   [+0]  id            [+1]  x             [+2]  y               │
//! │   [+3]  vx            [+4]  vy            [+5]  faction_id      │
//! │   [+6]  type_id       [+7]  hp            [+8]  hp_max          │
//! │   [+9]  radius        [+10] lane          [+11] in_network      │
//! │   [+12] is_static     [+13] efficiency    [+14] attacking       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ WRECKAGE (wreckage_count × WRECK_STRIDE)                        │
//! │   [+0] id  [+1] x  [+2] y  [+3] value  [+4] radius              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ ZONES (zone_count × ZONE_STRIDE)                                │
//! │   [+0] faction_id  [+1] kind_id  [+2] min_x  [+3] max_x         │
//! │   [+4] min_y       [+5] max_y    [+6] anchor_a [+7] anchor_b    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Flags are encoded as 1.0 / 0.0. Records keep the snapshot's order, which
//! is sorted by id, so the buffer is deterministic for a given snapshot.
//!
//! # Usage (renderer side, pseudo-code)
//!
//! ```text
//! units = int(buf[0]); wrecks = int(buf[1]); zones = int(buf[2])
//! for i in 0..units:
//!     o = HEADER_SIZE + i * UNIT_STRIDE
//!     draw_unit(buf[o + FIELD_X], buf[o + FIELD_Y], buf[o + FIELD_RADIUS])
//! wreck_base = HEADER_SIZE + units * UNIT_STRIDE
//! zone_base  = wreck_base + wrecks * WRECK_STRIDE
//! ```

use crate::components::{Faction, UnitType};
use crate::systems::network::ZoneKind;
use crate::world::Snapshot;

// ============================================================================
// CONSTANTS - STABLE RENDER CONTRACT
// ============================================================================

/// Number of f32 values in the buffer header.
pub const HEADER_SIZE: usize = 3;

/// Number of f32 values per unit record.
pub const UNIT_STRIDE: usize = 15;

/// Number of f32 values per wreckage record.
pub const WRECK_STRIDE: usize = 5;

/// Number of f32 values per zone record.
pub const ZONE_STRIDE: usize = 8;

pub const FACTION_PLAYER: f32 = 0.0;
pub const FACTION_ENEMY: f32 = 1.0;

pub const TYPE_SHIELD: f32 = 0.0;
pub const TYPE_CROSSBOW: f32 = 1.0;
pub const TYPE_CAVALRY: f32 = 2.0;
pub const TYPE_STRONGPOINT: f32 = 3.0;

pub const ZONE_ADJACENCY: f32 = 0.0;
pub const ZONE_PROXIMITY: f32 = 1.0;

// Unit record offsets
pub const FIELD_ID: usize = 0;
pub const FIELD_X: usize = 1;
pub const FIELD_Y: usize = 2;
pub const FIELD_VX: usize = 3;
pub const FIELD_VY: usize = 4;
pub const FIELD_FACTION: usize = 5;
pub const FIELD_TYPE: usize = 6;
pub const FIELD_HP: usize = 7;
pub const FIELD_HP_MAX: usize = 8;
pub const FIELD_RADIUS: usize = 9;
pub const FIELD_LANE: usize = 10;
pub const FIELD_IN_NETWORK: usize = 11;
pub const FIELD_IS_STATIC: usize = 12;
pub const FIELD_EFFICIENCY: usize = 13;
pub const FIELD_ATTACKING: usize = 14;

// Wreckage record offsets
pub const WRECK_FIELD_ID: usize = 0;
pub const WRECK_FIELD_X: usize = 1;
pub const WRECK_FIELD_Y: usize = 2;
pub const WRECK_FIELD_VALUE: usize = 3;
pub const WRECK_FIELD_RADIUS: usize = 4;

// Zone record offsets
pub const ZONE_FIELD_FACTION: usize = 0;
pub const ZONE_FIELD_KIND: usize = 1;
pub const ZONE_FIELD_MIN_X: usize = 2;
pub const ZONE_FIELD_MAX_X: usize = 3;
pub const ZONE_FIELD_MIN_Y: usize = 4;
pub const ZONE_FIELD_MAX_Y: usize = 5;
pub const ZONE_FIELD_ANCHOR_A: usize = 6;
pub const ZONE_FIELD_ANCHOR_B: usize = 7;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

#[inline]
pub fn faction_to_id(faction: Faction) -> f32 {
    match faction {
        Faction::Player => FACTION_PLAYER,
        Faction::Enemy => FACTION_ENEMY,
    }
}

#[inline]
pub fn unit_type_to_id(unit_type: UnitType) -> f32 {
    match unit_type {
        UnitType::Shield => TYPE_SHIELD,
        UnitType::Crossbow => TYPE_CROSSBOW,
        UnitType::Cavalry => TYPE_CAVALRY,
        UnitType::Strongpoint => TYPE_STRONGPOINT,
    }
}

#[inline]
pub fn zone_kind_to_id(kind: ZoneKind) -> f32 {
    match kind {
        ZoneKind::Adjacency => ZONE_ADJACENCY,
        ZoneKind::Proximity => ZONE_PROXIMITY,
    }
}

#[inline]
fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

// ============================================================================
// MAIN SERIALIZATION FUNCTION
// ============================================================================

/// Flatten a snapshot into the render buffer. See the module docs for the
/// layout.
pub fn snapshot_to_flatbuffer(snapshot: &Snapshot) -> Vec<f32> {
    let buffer_size = calculate_buffer_size(
        snapshot.units.len(),
        snapshot.wreckage.len(),
        snapshot.zones.len(),
    );
    let mut buffer = Vec::with_capacity(buffer_size);

    buffer.push(snapshot.units.len() as f32);
    buffer.push(snapshot.wreckage.len() as f32);
    buffer.push(snapshot.zones.len() as f32);

    for unit in &snapshot.units {
        buffer.extend_from_slice(&[
            unit.id as f32,
            unit.x,
            unit.y,
            unit.vx,
            unit.vy,
            faction_to_id(unit.faction),
            unit_type_to_id(unit.unit_type),
            unit.hp,
            unit.hp_max,
            unit.radius,
            unit.lane as f32,
            flag(unit.in_network),
            flag(unit.is_static),
            unit.efficiency,
            flag(unit.attacking),
        ]);
    }

    for wreck in &snapshot.wreckage {
        buffer.extend_from_slice(&[wreck.id as f32, wreck.x, wreck.y, wreck.value, wreck.radius]);
    }

    for zone in &snapshot.zones {
        buffer.extend_from_slice(&[
            faction_to_id(zone.faction),
            zone_kind_to_id(zone.kind),
            zone.rect.min_x,
            zone.rect.max_x,
            zone.rect.min_y,
            zone.rect.max_y,
            zone.anchors.0 as f32,
            zone.anchors.1 as f32,
        ]);
    }

    debug_assert_eq!(buffer.len(), buffer_size, "Buffer size mismatch");
    buffer
}

#[inline]
pub fn calculate_buffer_size(units: usize, wreckage: usize, zones: usize) -> usize {
    HEADER_SIZE + units * UNIT_STRIDE + wreckage * WRECK_STRIDE + zones * ZONE_STRIDE
}

/// Read `(unit_count, wreckage_count, zone_count)` from a buffer header.
///
/// Returns `None` if the header is truncated.
pub fn parse_counts(buffer: &[f32]) -> Option<(usize, usize, usize)> {
    match buffer {
        [units, wrecks, zones, ..] => Some((*units as usize, *wrecks as usize, *zones as usize)),
        _ => None,
    }
}

#[inline]
pub const fn unit_offset(index: usize) -> usize {
    HEADER_SIZE + index * UNIT_STRIDE
}

#[inline]
pub const fn wreck_offset(unit_count: usize, index: usize) -> usize {
    HEADER_SIZE + unit_count * UNIT_STRIDE + index * WRECK_STRIDE
}

#[inline]
pub const fn zone_offset(unit_count: usize, wreckage_count: usize, index: usize) -> usize {
    HEADER_SIZE + unit_count * UNIT_STRIDE + wreckage_count * WRECK_STRIDE + index * ZONE_STRIDE
}
