//! Movement - forward advance, lateral lane pull and integration.
//!
//! Velocities are in world units per tick; there is no delta-time scaling.

use crate::components::*;
use crate::config::MovementConfig;

/// Steering inputs for one unit's advance this tick.
#[derive(Debug, Clone, Copy)]
pub struct Advance {
    pub faction: Faction,
    /// Max speed after any network bonus.
    pub speed: f32,
    /// Target cross-axis position (the lane line).
    pub ideal_y: f32,
    /// Use the relaxed lateral stiffness.
    pub relaxed: bool,
}

/// Accelerate toward the enemy edge, pull toward the lane line, clamp to
/// max speed, then integrate.
pub fn advance(pos: &mut Position, vel: &mut Velocity, step: &Advance, movement: &MovementConfig) {
    let stiffness = if step.relaxed {
        movement.relaxed_lateral_stiffness
    } else {
        movement.lateral_stiffness
    };

    vel.vx += step.faction.forward_sign() * step.speed * movement.forward_accel;
    vel.vy += (step.ideal_y - pos.y) * stiffness * movement.lateral_gain;
    vel.clamp_magnitude(step.speed);
    integrate(pos, vel);
}

#[inline]
pub fn integrate(pos: &mut Position, vel: &Velocity) {
    pos.x += vel.vx;
    pos.y += vel.vy;
}
